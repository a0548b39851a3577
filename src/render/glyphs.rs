use crate::ir::{Border, Side};

pub const SHADOW: char = '▒';
pub const DISABLED_FILL: char = '░';
pub const LINE_H: char = '─';
pub const LINE_V: char = '│';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorderGlyphs {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
}

const SINGLE: BorderGlyphs = BorderGlyphs {
    top_left: '┌',
    top_right: '┐',
    bottom_left: '└',
    bottom_right: '┘',
    horizontal: '─',
    vertical: '│',
};

const DOUBLE: BorderGlyphs = BorderGlyphs {
    top_left: '╔',
    top_right: '╗',
    bottom_left: '╚',
    bottom_right: '╝',
    horizontal: '═',
    vertical: '║',
};

const BOLD: BorderGlyphs = BorderGlyphs {
    top_left: '┏',
    top_right: '┓',
    bottom_left: '┗',
    bottom_right: '┛',
    horizontal: '━',
    vertical: '┃',
};

const ROUNDED: BorderGlyphs = BorderGlyphs {
    top_left: '╭',
    top_right: '╮',
    bottom_left: '╰',
    bottom_right: '╯',
    horizontal: '─',
    vertical: '│',
};

const DASHED: BorderGlyphs = BorderGlyphs {
    top_left: '┌',
    top_right: '┐',
    bottom_left: '└',
    bottom_right: '┘',
    horizontal: '╌',
    vertical: '╎',
};

const ALL_BORDERS: [BorderGlyphs; 5] = [SINGLE, DOUBLE, BOLD, ROUNDED, DASHED];

impl BorderGlyphs {
    pub fn for_style(border: Border) -> Self {
        match border {
            Border::Single => SINGLE,
            Border::Double => DOUBLE,
            Border::Bold => BOLD,
            Border::Rounded => ROUNDED,
            Border::Dashed => DASHED,
        }
    }

    fn contains(&self, ch: char) -> bool {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
            self.horizontal,
            self.vertical,
        ]
        .contains(&ch)
    }
}

/// Border and shadow glyphs: exempt from the disabled strikethrough.
pub fn is_structural(ch: char) -> bool {
    ch == SHADOW || ALL_BORDERS.iter().any(|glyphs| glyphs.contains(ch))
}

/// Arrowhead drawn in the anchor cell of the destination side.
pub fn arrow_for(to_side: Side) -> char {
    match to_side {
        Side::Left => '▶',
        Side::Right => '◀',
        Side::Top => '▼',
        Side::Bottom => '▲',
    }
}

/// Directions a connector glyph reaches out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Arms {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

pub const HORIZONTAL: Arms = Arms {
    up: false,
    down: false,
    left: true,
    right: true,
};

pub const VERTICAL: Arms = Arms {
    up: true,
    down: true,
    left: false,
    right: false,
};

const fn arms(up: bool, down: bool, left: bool, right: bool) -> Arms {
    Arms {
        up,
        down,
        left,
        right,
    }
}

const CONNECTOR_TABLE: [(char, Arms); 11] = [
    ('─', arms(false, false, true, true)),
    ('│', arms(true, true, false, false)),
    ('┌', arms(false, true, false, true)),
    ('┐', arms(false, true, true, false)),
    ('└', arms(true, false, false, true)),
    ('┘', arms(true, false, true, false)),
    ('├', arms(true, true, false, true)),
    ('┤', arms(true, true, true, false)),
    ('┬', arms(false, true, true, true)),
    ('┴', arms(true, false, true, true)),
    ('┼', arms(true, true, true, true)),
];

impl Arms {
    /// Arms of a single-line connector glyph, `None` for anything else.
    pub fn of(ch: char) -> Option<Self> {
        CONNECTOR_TABLE
            .iter()
            .find(|(glyph, _)| *glyph == ch)
            .map(|(_, arms)| *arms)
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            up: self.up || other.up,
            down: self.down || other.down,
            left: self.left || other.left,
            right: self.right || other.right,
        }
    }

    /// Glyph for these arms; lone or missing arms fall back to a straight line.
    pub fn glyph(self) -> char {
        if let Some((glyph, _)) = CONNECTOR_TABLE.iter().find(|(_, arms)| *arms == self) {
            return *glyph;
        }
        if self.left || self.right { LINE_H } else { LINE_V }
    }

    /// Corner joining a run arriving from `from` with one leaving towards `to`.
    pub fn corner(from: Side, to: Side) -> Self {
        Self::default().with(from).with(to)
    }

    fn with(mut self, side: Side) -> Self {
        match side {
            Side::Top => self.up = true,
            Side::Bottom => self.down = true,
            Side::Left => self.left = true,
            Side::Right => self.right = true,
        }
        self
    }
}

/// A corner (┌┐└┘), tee (├┤┬┴) or cross (┼).
pub fn is_junction(ch: char) -> bool {
    matches!(ch, '┌' | '┐' | '└' | '┘' | '├' | '┤' | '┬' | '┴' | '┼')
}

/// Combine an existing connector glyph with an incoming stroke.
pub fn merge_junction(existing: char, incoming: Arms) -> char {
    match Arms::of(existing) {
        Some(current) => current.union(incoming).glyph(),
        None => incoming.glyph(),
    }
}
