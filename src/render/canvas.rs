use std::fmt;

/// Combining long stroke overlay, appended to struck-through glyphs.
pub const STRIKE_MARK: char = '\u{0336}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    glyph: char,
    struck: bool,
}

const BLANK: Cell = Cell {
    glyph: ' ',
    struck: false,
};

/// Fixed-size character grid. Every access is bounds-checked: writes outside
/// the grid are dropped and reads outside it return a space.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![BLANK; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    pub fn set(&mut self, x: i32, y: i32, ch: char) {
        if let Some(idx) = self.index(x, y) {
            self.cells[idx] = Cell {
                glyph: ch,
                struck: false,
            };
        }
    }

    pub fn get(&self, x: i32, y: i32) -> char {
        self.index(x, y)
            .map(|idx| self.cells[idx].glyph)
            .unwrap_or(' ')
    }

    pub fn write_text(&mut self, x: i32, y: i32, text: &str) {
        for (offset, ch) in text.chars().enumerate() {
            let Ok(offset) = i32::try_from(offset) else {
                break;
            };
            self.set(x.saturating_add(offset), y, ch);
        }
    }

    /// Mark a cell as struck through; the mark is dropped by the next `set`.
    pub fn strike(&mut self, x: i32, y: i32) {
        if let Some(idx) = self.index(x, y) {
            self.cells[idx].struck = true;
        }
    }

    fn row_string(&self, y: usize) -> String {
        let mut row = String::with_capacity(self.width);
        for cell in &self.cells[y * self.width..(y + 1) * self.width] {
            row.push(cell.glyph);
            if cell.struck {
                row.push(STRIKE_MARK);
            }
        }
        row.trim_end().to_string()
    }

    /// Rows with trailing whitespace trimmed and the common indent removed.
    pub fn to_text(&self) -> String {
        let rows: Vec<String> = (0..self.height).map(|y| self.row_string(y)).collect();
        let indent = rows
            .iter()
            .filter(|row| !row.is_empty())
            .map(|row| row.chars().take_while(|ch| *ch == ' ').count())
            .min()
            .unwrap_or(0);
        rows.iter()
            .map(|row| row.chars().skip(indent).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
