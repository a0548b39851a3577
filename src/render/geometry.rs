use crate::ir::{DiagramNode, Side};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// A box together with its absolute (canvas) rectangle.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedBox<'a> {
    pub node: &'a DiagramNode,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ResolvedBox<'_> {
    fn new(node: &DiagramNode, parent_abs_x: i32, parent_abs_y: i32) -> ResolvedBox<'_> {
        ResolvedBox {
            node,
            x: parent_abs_x.saturating_add(node.x.unwrap_or(0)),
            y: parent_abs_y.saturating_add(node.y.unwrap_or(0)),
            width: node.width.unwrap_or(0),
            height: node.height.unwrap_or(0),
        }
    }

    /// Doubled center, kept integral.
    pub fn center2(&self) -> Point {
        Point {
            x: self.x.saturating_mul(2).saturating_add(self.width),
            y: self.y.saturating_mul(2).saturating_add(self.height),
        }
    }

    /// Right-most column touched, shadow included.
    pub fn outer_right(&self) -> i32 {
        self.x
            .saturating_add(self.width - 1)
            .saturating_add(self.node.shadow_extent().0)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height - 1)
    }
}

/// Depth-first search for `id`; children sit one cell inside their parent's border.
pub fn resolve_box<'a>(
    id: &str,
    boxes: &'a [DiagramNode],
    parent_abs_x: i32,
    parent_abs_y: i32,
) -> Option<ResolvedBox<'a>> {
    for node in boxes {
        let resolved = ResolvedBox::new(node, parent_abs_x, parent_abs_y);
        if node.has_id(id) {
            return Some(resolved);
        }
        if let Some(found) = resolve_box(
            id,
            node.children(),
            resolved.x.saturating_add(1),
            resolved.y.saturating_add(1),
        ) {
            return Some(found);
        }
    }
    None
}

/// The cell just outside `side` of the box, centered along that side.
pub fn anchor(resolved: &ResolvedBox<'_>, side: Side) -> Point {
    let ResolvedBox {
        x,
        y,
        width,
        height,
        ..
    } = *resolved;
    match side {
        Side::Right => Point {
            x: x + width,
            y: y + height.div_euclid(2),
        },
        Side::Left => Point {
            x: x - 1,
            y: y + height.div_euclid(2),
        },
        Side::Top => Point {
            x: x + width.div_euclid(2),
            y: y - 1,
        },
        Side::Bottom => Point {
            x: x + width.div_euclid(2),
            y: y + height,
        },
    }
}

/// Center `text` in `width` cells, truncating when it does not fit.
pub fn center_text(text: &str, width: i32) -> String {
    let Ok(width) = usize::try_from(width) else {
        return String::new();
    };
    let len = text.chars().count();
    if len >= width {
        return text.chars().take(width).collect();
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(right))
}

/// Every box of a tree flattened in depth-first order, with an id lookup.
#[derive(Debug, Clone, Default)]
pub struct BoxIndex<'a> {
    boxes: Vec<ResolvedBox<'a>>,
    by_id: BTreeMap<&'a str, usize>,
}

impl<'a> BoxIndex<'a> {
    pub fn build(boxes: &'a [DiagramNode]) -> Self {
        let mut index = Self::default();
        index.collect(boxes, 0, 0);
        index
    }

    fn collect(&mut self, boxes: &'a [DiagramNode], parent_abs_x: i32, parent_abs_y: i32) {
        for node in boxes {
            let resolved = ResolvedBox::new(node, parent_abs_x, parent_abs_y);
            if let Some(id) = node.id.as_deref() {
                if self.by_id.contains_key(id) {
                    log::warn!(id; "Duplicate box id, connections use the first one");
                } else {
                    self.by_id.insert(id, self.boxes.len());
                }
            }
            self.boxes.push(resolved);
            self.collect(
                node.children(),
                resolved.x.saturating_add(1),
                resolved.y.saturating_add(1),
            );
        }
    }

    pub fn get(&self, id: &str) -> Option<ResolvedBox<'a>> {
        self.by_id.get(id).map(|idx| self.boxes[*idx])
    }

    pub fn boxes(&self) -> &[ResolvedBox<'a>] {
        &self.boxes
    }
}
