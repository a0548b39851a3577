use super::canvas::Canvas;
use super::geometry::center_text;
use super::glyphs::{BorderGlyphs, DISABLED_FILL, SHADOW, is_structural};
use crate::ir::DiagramNode;
use std::ops::Range;

/// Draw `node` with its top-left corner at the absolute cell (`x`, `y`),
/// then its children inside it.
pub fn draw_box(canvas: &mut Canvas, node: &DiagramNode, x: i32, y: i32) {
    let width = node.width.unwrap_or(0);
    let height = node.height.unwrap_or(0);
    if width < 2 || height < 2 {
        log::debug!(id:? = node.id; "Skipping box without drawable geometry");
        return;
    }
    let glyphs = BorderGlyphs::for_style(node.border);
    let right = x.saturating_add(width - 1);
    let bottom = y.saturating_add(height - 1);
    let inner_cols = cols(canvas, x.saturating_add(1), right);
    let inner_rows = rows(canvas, y.saturating_add(1), bottom);

    if node.shadow {
        for row in rows(canvas, y.saturating_add(1), bottom.saturating_add(2)) {
            canvas.set(right.saturating_add(1), row, SHADOW);
            canvas.set(right.saturating_add(2), row, SHADOW);
        }
        for col in cols(canvas, x.saturating_add(2), right.saturating_add(3)) {
            canvas.set(col, bottom.saturating_add(1), SHADOW);
        }
    }

    for col in inner_cols.clone() {
        canvas.set(col, y, glyphs.horizontal);
        canvas.set(col, bottom, glyphs.horizontal);
    }
    canvas.set(x, y, glyphs.top_left);
    canvas.set(right, y, glyphs.top_right);
    canvas.set(x, bottom, glyphs.bottom_left);
    canvas.set(right, bottom, glyphs.bottom_right);

    for row in inner_rows.clone() {
        canvas.set(x, row, glyphs.vertical);
        canvas.set(right, row, glyphs.vertical);
        for col in inner_cols.clone() {
            canvas.set(col, row, ' ');
        }
    }

    if let Some(title) = node.title.as_deref() {
        draw_title(canvas, title, x, y, width);
    }

    let lines = node.text_lines();
    if !lines.is_empty() {
        let count = i32::try_from(lines.len()).unwrap_or(i32::MAX);
        let start = y.saturating_add((height - count).div_euclid(2));
        for (offset, line) in lines.iter().enumerate() {
            let row = start.saturating_add(i32::try_from(offset).unwrap_or(i32::MAX));
            if row <= y || row >= bottom {
                continue;
            }
            canvas.write_text(x.saturating_add(2), row, &center_text(line, width - 4));
        }
    }

    for child in node.children() {
        draw_box(
            canvas,
            child,
            x.saturating_add(1).saturating_add(child.x.unwrap_or(0)),
            y.saturating_add(1).saturating_add(child.y.unwrap_or(0)),
        );
    }

    if node.disabled {
        for row in inner_rows {
            for col in inner_cols.clone() {
                if canvas.get(col, row) == ' ' {
                    canvas.set(col, row, DISABLED_FILL);
                }
            }
        }
        for col in inner_cols {
            let glyph = canvas.get(col, y);
            if glyph != ' ' && !is_structural(glyph) {
                canvas.strike(col, y);
            }
        }
    }
}

/// ` title ` set into the top border after one fill glyph.
fn draw_title(canvas: &mut Canvas, title: &str, x: i32, y: i32, width: i32) {
    let Ok(room) = usize::try_from(width - 6) else {
        return;
    };
    if room == 0 {
        return;
    }
    let shown: String = title.chars().take(room).collect();
    canvas.write_text(x.saturating_add(2), y, &format!(" {shown} "));
}

/// Columns `from..to` that fall on the canvas.
fn cols(canvas: &Canvas, from: i32, to: i32) -> Range<i32> {
    from.max(0)..to.min(i32::try_from(canvas.width()).unwrap_or(i32::MAX))
}

fn rows(canvas: &Canvas, from: i32, to: i32) -> Range<i32> {
    from.max(0)..to.min(i32::try_from(canvas.height()).unwrap_or(i32::MAX))
}
