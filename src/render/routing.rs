use super::canvas::Canvas;
use super::geometry::{BoxIndex, Point, ResolvedBox, anchor};
use super::glyphs::{
    Arms, HORIZONTAL, LINE_H, LINE_V, VERTICAL, arrow_for, is_junction, merge_junction,
};
use crate::ir::{Connection, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteShape {
    Vertical,
    UShape,
    Straight,
    LShape,
}

/// Columns `start..end` of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub row: i32,
    pub start: i32,
    pub end: i32,
}

impl Segment {
    fn new(row: i32, start: i32, end: i32) -> Self {
        Self { row, start, end }
    }

    fn len(&self) -> i32 {
        (self.end - self.start).max(0)
    }
}

/// Where a route allows its label to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSlot {
    /// Written as-is starting at a fixed cell.
    Beside { at: Point, text: String },
    /// Written over the run of one of the candidate segments, tried in order.
    Inline {
        text: String,
        candidates: Vec<Segment>,
        require_padding: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub shape: RouteShape,
    pub label: Option<LabelSlot>,
}

/// Resolved endpoints, sides and shape of one connection.
#[derive(Debug, Clone, Copy)]
struct Plan<'a> {
    from: ResolvedBox<'a>,
    to_side: Side,
    start: Point,
    end: Point,
    shape: RouteShape,
}

/// Sides picked from the relative position of the two box centers.
pub fn detect_sides(from: &ResolvedBox<'_>, to: &ResolvedBox<'_>) -> (Side, Side) {
    let a = from.center2();
    let b = to.center2();
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if dy.abs() > dx.abs() {
        if dy > 0 {
            (Side::Bottom, Side::Top)
        } else {
            (Side::Top, Side::Bottom)
        }
    } else if dx > 0 {
        (Side::Right, Side::Left)
    } else {
        (Side::Left, Side::Right)
    }
}

fn classify(from_side: Side, to_side: Side, start: Point, end: Point) -> RouteShape {
    if from_side.is_vertical() && to_side.is_vertical() {
        RouteShape::Vertical
    } else if from_side == to_side && start.y != end.y {
        RouteShape::UShape
    } else if start.y == end.y {
        RouteShape::Straight
    } else {
        RouteShape::LShape
    }
}

fn plan_connection<'a>(connection: &Connection, index: &BoxIndex<'a>) -> Option<Plan<'a>> {
    if connection.from == connection.to {
        return None;
    }
    let from = index.get(&connection.from)?;
    let to = index.get(&connection.to)?;
    let (auto_from, auto_to) = detect_sides(&from, &to);
    let from_side = connection.from_side.unwrap_or(auto_from);
    let to_side = connection.to_side.unwrap_or(auto_to);
    let start = anchor(&from, from_side);
    let end = anchor(&to, to_side);
    Some(Plan {
        from,
        to_side,
        start,
        end,
        shape: classify(from_side, to_side, start, end),
    })
}

fn non_empty_label(connection: &Connection) -> Option<&str> {
    connection.label.as_deref().filter(|label| !label.is_empty())
}

/// Draw the path and arrowhead of `connection`; the label is returned, not drawn.
///
/// `siblings` are the connections declared next to this one; those leaving
/// the same box steer the shared column of L-shaped routes.
pub fn route_connection(
    canvas: &mut Canvas,
    connection: &Connection,
    index: &BoxIndex<'_>,
    siblings: &[Connection],
) -> Option<Route> {
    let Some(plan) = plan_connection(connection, index) else {
        log::warn!(
            from = connection.from.as_str(),
            to = connection.to.as_str();
            "Skipping connection with an unresolved or identical endpoint"
        );
        return None;
    };
    log::trace!(
        from = connection.from.as_str(),
        to = connection.to.as_str(),
        shape:? = plan.shape;
        "Routing connection"
    );
    let label = non_empty_label(connection).map(str::to_string);
    let slot = match plan.shape {
        RouteShape::Vertical => draw_vertical(canvas, &plan, label),
        RouteShape::UShape => draw_u_shape(canvas, &plan, index, label),
        RouteShape::Straight => draw_straight(canvas, &plan, label),
        RouteShape::LShape => {
            let mid_x = shared_mid_x(&plan, connection, index, siblings);
            draw_l_shape(canvas, &plan, mid_x, label)
        }
    };
    Some(Route {
        shape: plan.shape,
        label: slot,
    })
}

/// Route and label a single connection.
pub fn draw_connection(
    canvas: &mut Canvas,
    connection: &Connection,
    index: &BoxIndex<'_>,
    siblings: &[Connection],
) -> Option<RouteShape> {
    let route = route_connection(canvas, connection, index, siblings)?;
    if let Some(slot) = &route.label {
        place_label(canvas, slot);
    }
    Some(route.shape)
}

fn stroke_horizontal(canvas: &mut Canvas, x: i32, y: i32) {
    let existing = canvas.get(x, y);
    let glyph = if is_junction(existing) {
        merge_junction(existing, HORIZONTAL)
    } else {
        LINE_H
    };
    canvas.set(x, y, glyph);
}

fn stroke_vertical(canvas: &mut Canvas, x: i32, y: i32) {
    let existing = canvas.get(x, y);
    let glyph = if is_junction(existing) || existing == LINE_H {
        merge_junction(existing, VERTICAL)
    } else {
        LINE_V
    };
    canvas.set(x, y, glyph);
}

fn stroke_corner(canvas: &mut Canvas, x: i32, y: i32, arms: Arms) {
    let existing = canvas.get(x, y);
    canvas.set(x, y, merge_junction(existing, arms));
}

/// Horizontal run over the columns strictly between `from` and `to`.
fn run_between(canvas: &mut Canvas, row: i32, from: i32, to: i32) {
    let step = if to >= from { 1 } else { -1 };
    let mut col = from + step;
    while (step > 0 && col < to) || (step < 0 && col > to) {
        stroke_horizontal(canvas, col, row);
        col += step;
    }
}

fn column_between(canvas: &mut Canvas, col: i32, from: i32, to: i32) {
    for row in from.min(to) + 1..from.max(to) {
        stroke_vertical(canvas, col, row);
    }
}

/// Cells of a row from `from` (inclusive) to `to` (exclusive), in either direction.
fn segment_towards(row: i32, from: i32, to: i32) -> Segment {
    if to >= from {
        Segment::new(row, from, to)
    } else {
        Segment::new(row, to + 1, from + 1)
    }
}

fn draw_vertical(canvas: &mut Canvas, plan: &Plan<'_>, label: Option<String>) -> Option<LabelSlot> {
    let x = (plan.start.x + plan.end.x + 1).div_euclid(2);
    let top = plan.start.y.min(plan.end.y);
    let bottom = plan.start.y.max(plan.end.y);
    for row in top..=bottom {
        if row != plan.end.y {
            stroke_vertical(canvas, x, row);
        }
    }
    canvas.set(x, plan.end.y, arrow_for(plan.to_side));
    label.map(|text| LabelSlot::Beside {
        at: Point {
            x: x + 2,
            y: (top + bottom).div_euclid(2),
        },
        text,
    })
}

fn draw_straight(canvas: &mut Canvas, plan: &Plan<'_>, label: Option<String>) -> Option<LabelSlot> {
    let row = plan.start.y;
    stroke_horizontal(canvas, plan.start.x, row);
    run_between(canvas, row, plan.start.x, plan.end.x);
    canvas.set(plan.end.x, row, arrow_for(plan.to_side));
    label.map(|text| LabelSlot::Inline {
        text,
        candidates: vec![segment_towards(row, plan.start.x, plan.end.x)],
        require_padding: false,
    })
}

fn draw_u_shape(
    canvas: &mut Canvas,
    plan: &Plan<'_>,
    index: &BoxIndex<'_>,
    label: Option<String>,
) -> Option<LabelSlot> {
    let (start, end) = (plan.start, plan.end);
    let extends_right = plan.to_side == Side::Right;
    // The leg clears every box on its side, not only those it passes.
    let drawn = index.boxes().iter().filter(|b| b.width > 0);
    let ext = if extends_right {
        drawn
            .map(|b| b.outer_right() + 2)
            .chain([start.x + 1, end.x + 1])
            .max()
            .unwrap_or(start.x + 1)
    } else {
        drawn
            .map(|b| b.x - 2)
            .chain([start.x - 1, end.x - 1])
            .min()
            .unwrap_or(start.x - 1)
    };
    let toward_boxes = if extends_right { Side::Left } else { Side::Right };
    let (leave, arrive) = if end.y > start.y {
        (Side::Bottom, Side::Top)
    } else {
        (Side::Top, Side::Bottom)
    };

    stroke_horizontal(canvas, start.x, start.y);
    run_between(canvas, start.y, start.x, ext);
    stroke_corner(canvas, ext, start.y, Arms::corner(toward_boxes, leave));
    column_between(canvas, ext, start.y, end.y);
    stroke_corner(canvas, ext, end.y, Arms::corner(arrive, toward_boxes));
    run_between(canvas, end.y, ext, end.x);
    canvas.set(end.x, end.y, arrow_for(plan.to_side));

    label.map(|text| {
        let source = segment_towards(start.y, start.x, ext);
        let dest = if extends_right {
            Segment::new(end.y, end.x + 1, ext)
        } else {
            Segment::new(end.y, ext + 1, end.x)
        };
        let longer = if dest.len() > source.len() { dest } else { source };
        LabelSlot::Inline {
            text,
            candidates: vec![longer],
            require_padding: false,
        }
    })
}

/// Column of the vertical leg of an L route.
///
/// Defaults to the midpoint; moves toward the source when a labeled sibling
/// leaving the same anchor needs more room on its destination segment, so
/// every sibling turns in the same column.
fn shared_mid_x(
    plan: &Plan<'_>,
    connection: &Connection,
    index: &BoxIndex<'_>,
    siblings: &[Connection],
) -> i32 {
    let (start, end) = (plan.start, plan.end);
    let forward = end.x >= start.x;
    let default = (start.x + end.x).div_euclid(2);
    let mut limit: Option<i32> = None;
    for sibling in siblings.iter().filter(|s| s.from == connection.from) {
        let Some(text) = non_empty_label(sibling) else {
            continue;
        };
        let Some(other) = plan_connection(sibling, index) else {
            continue;
        };
        if other.shape != RouteShape::LShape
            || other.start != start
            || (other.end.x >= other.start.x) != forward
        {
            continue;
        }
        let need = i32::try_from(text.chars().count()).unwrap_or(i32::MAX - 2) + 2;
        let sibling_limit = if forward {
            other.end.x - 1 - need
        } else {
            other.end.x + 1 + need
        };
        limit = Some(match limit {
            None => sibling_limit,
            Some(current) if forward => current.min(sibling_limit),
            Some(current) => current.max(sibling_limit),
        });
    }
    let mid = match limit {
        Some(limit) if forward && limit < default => limit,
        Some(limit) if !forward && limit > default => limit,
        _ => default,
    };
    if forward {
        mid.min(end.x - 1).max(start.x)
    } else {
        mid.max(end.x + 1).min(start.x)
    }
}

fn draw_l_shape(
    canvas: &mut Canvas,
    plan: &Plan<'_>,
    mid_x: i32,
    label: Option<String>,
) -> Option<LabelSlot> {
    let (start, end) = (plan.start, plan.end);
    let forward = end.x >= start.x;
    let (behind, ahead) = if forward {
        (Side::Left, Side::Right)
    } else {
        (Side::Right, Side::Left)
    };
    let (leave, arrive) = if end.y > start.y {
        (Side::Bottom, Side::Top)
    } else {
        (Side::Top, Side::Bottom)
    };

    if mid_x != start.x {
        stroke_horizontal(canvas, start.x, start.y);
        run_between(canvas, start.y, start.x, mid_x);
    }
    stroke_corner(canvas, mid_x, start.y, Arms::corner(behind, leave));
    column_between(canvas, mid_x, start.y, end.y);
    stroke_corner(canvas, mid_x, end.y, Arms::corner(arrive, ahead));
    run_between(canvas, end.y, mid_x, end.x);
    canvas.set(end.x, end.y, arrow_for(plan.to_side));
    log::trace!(mid_x, from_x = plan.from.x; "L route turned");

    label.map(|text| {
        let (dest, source) = if forward {
            (
                Segment::new(end.y, mid_x + 1, end.x),
                Segment::new(start.y, start.x, mid_x),
            )
        } else {
            (
                Segment::new(end.y, end.x + 1, mid_x),
                Segment::new(start.y, mid_x + 1, start.x + 1),
            )
        };
        LabelSlot::Inline {
            text,
            candidates: vec![dest, source],
            require_padding: true,
        }
    })
}

/// Longest run of cells in `segment` a label may cover (fill glyphs or blanks).
fn plain_run(canvas: &Canvas, segment: &Segment) -> Option<Segment> {
    let mut best: Option<Segment> = None;
    let mut run_start: Option<i32> = None;
    for col in segment.start..=segment.end {
        let plain = col < segment.end && matches!(canvas.get(col, segment.row), LINE_H | ' ');
        match (plain, run_start) {
            (true, None) => run_start = Some(col),
            (false, Some(first)) => {
                let run = Segment::new(segment.row, first, col);
                if best.is_none_or(|b| run.len() > b.len()) {
                    best = Some(run);
                }
                run_start = None;
            }
            _ => {}
        }
    }
    best
}

/// Write a label into the first slot that can hold it; labels that fit
/// nowhere are dropped rather than drawn over corners.
pub fn place_label(canvas: &mut Canvas, slot: &LabelSlot) -> bool {
    match slot {
        LabelSlot::Beside { at, text } => {
            canvas.write_text(at.x, at.y, text);
            true
        }
        LabelSlot::Inline {
            text,
            candidates,
            require_padding,
        } => {
            let len = i32::try_from(text.chars().count()).unwrap_or(i32::MAX - 2);
            for segment in candidates {
                let Some(run) = plain_run(canvas, segment) else {
                    continue;
                };
                let fits = if *require_padding {
                    len + 2 <= run.len()
                } else {
                    len <= run.len()
                };
                if fits {
                    let col = run.start + (run.len() - len) / 2;
                    canvas.write_text(col, run.row, text);
                    return true;
                }
            }
            log::debug!(label = text.as_str(); "Label omitted, no segment is long enough");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::DiagramNode;
    use crate::render::boxes::draw_box;

    fn boxed(id: &str, x: i32, y: i32, w: i32, h: i32) -> DiagramNode {
        DiagramNode::leaf(Some(id), "").with_geometry(x, y, w, h)
    }

    fn canvas_with(boxes: &[DiagramNode], width: usize, height: usize) -> Canvas {
        let mut canvas = Canvas::new(width, height);
        for node in boxes {
            draw_box(&mut canvas, node, node.x.unwrap_or(0), node.y.unwrap_or(0));
        }
        canvas
    }

    #[test]
    fn same_row_boxes_get_a_straight_arrow() {
        let boxes = vec![boxed("a", 0, 0, 5, 3), boxed("b", 15, 0, 5, 3)];
        let index = BoxIndex::build(&boxes);
        let mut canvas = canvas_with(&boxes, 24, 4);
        let shape = draw_connection(&mut canvas, &Connection::new("a", "b"), &index, &[]);
        assert_eq!(shape, Some(RouteShape::Straight));
        assert_eq!(canvas.get(14, 1), '▶');
        assert_eq!(canvas.get(6, 1), '─');
        assert_eq!(canvas.get(5, 1), '─');
    }

    #[test]
    fn offset_rows_get_an_l_route() {
        let boxes = vec![boxed("a", 0, 0, 5, 3), boxed("b", 15, 6, 5, 3)];
        let index = BoxIndex::build(&boxes);
        let mut canvas = canvas_with(&boxes, 24, 10);
        let shape = draw_connection(&mut canvas, &Connection::new("a", "b"), &index, &[]);
        assert_eq!(shape, Some(RouteShape::LShape));
        assert_eq!(canvas.get(14, 7), '▶');
        assert_eq!(canvas.get(9, 1), '┐');
        assert_eq!(canvas.get(9, 4), '│');
        assert_eq!(canvas.get(9, 7), '└');
    }

    #[test]
    fn same_side_connections_loop_around() {
        let boxes = vec![boxed("a", 5, 0, 10, 3), boxed("b", 5, 5, 10, 3)];
        let index = BoxIndex::build(&boxes);
        let mut canvas = canvas_with(&boxes, 20, 9);
        let connection = Connection::new("a", "b").with_sides(Side::Right, Side::Right);
        let shape = draw_connection(&mut canvas, &connection, &index, &[]);
        assert_eq!(shape, Some(RouteShape::UShape));
        assert_eq!(canvas.get(15, 6), '◀');
        assert_eq!(canvas.get(16, 1), '┐');
        assert_eq!(canvas.get(16, 6), '┘');
        assert_eq!(canvas.get(16, 3), '│');
    }

    #[test]
    fn left_u_routes_mirror() {
        let boxes = vec![boxed("a", 5, 0, 10, 3), boxed("b", 5, 5, 10, 3)];
        let index = BoxIndex::build(&boxes);
        let mut canvas = canvas_with(&boxes, 20, 9);
        let connection = Connection::new("b", "a").with_sides(Side::Left, Side::Left);
        draw_connection(&mut canvas, &connection, &index, &[]);
        assert_eq!(canvas.get(4, 1), '▶');
        assert_eq!(canvas.get(3, 6), '└');
        assert_eq!(canvas.get(3, 1), '┌');
    }

    #[test]
    fn u_routes_clear_boxes_outside_their_rows() {
        let boxes = vec![
            boxed("a", 5, 0, 10, 3),
            boxed("b", 5, 5, 10, 3),
            boxed("wide", 0, 12, 40, 3),
        ];
        let index = BoxIndex::build(&boxes);
        let mut canvas = canvas_with(&boxes, 48, 16);
        let connection = Connection::new("a", "b").with_sides(Side::Right, Side::Right);
        draw_connection(&mut canvas, &connection, &index, &[]);
        assert_eq!(canvas.get(15, 6), '◀');
        assert_eq!(canvas.get(41, 1), '┐');
        assert_eq!(canvas.get(41, 6), '┘');
        assert_eq!(canvas.get(16, 1), '─');
    }

    #[test]
    fn stacked_boxes_get_a_vertical_arrow_with_side_label() {
        let boxes = vec![boxed("a", 0, 0, 7, 3), boxed("b", 0, 6, 7, 3)];
        let index = BoxIndex::build(&boxes);
        let mut canvas = canvas_with(&boxes, 16, 10);
        let connection = Connection::new("a", "b").with_label("go");
        let shape = draw_connection(&mut canvas, &connection, &index, &[]);
        assert_eq!(shape, Some(RouteShape::Vertical));
        assert_eq!(canvas.get(3, 3), '│');
        assert_eq!(canvas.get(3, 5), '▼');
        assert_eq!(canvas.get(5, 4), 'g');
    }

    #[test]
    fn shared_source_row_merges_into_a_tee_in_either_order() {
        let boxes = vec![
            boxed("gateway", 0, 4, 9, 3),
            boxed("auth", 20, 4, 8, 3),
            boxed("orders", 20, 9, 8, 3),
        ];
        let index = BoxIndex::build(&boxes);
        let straight = Connection::new("gateway", "auth");
        let bent = Connection::new("gateway", "orders");
        let siblings = vec![straight.clone(), bent.clone()];

        let mut canvas = canvas_with(&boxes, 32, 14);
        draw_connection(&mut canvas, &straight, &index, &siblings);
        draw_connection(&mut canvas, &bent, &index, &siblings);
        assert_eq!(canvas.get(14, 5), '┬');

        let mut canvas = canvas_with(&boxes, 32, 14);
        draw_connection(&mut canvas, &bent, &index, &siblings);
        draw_connection(&mut canvas, &straight, &index, &siblings);
        assert_eq!(canvas.get(14, 5), '┬');
    }

    #[test]
    fn sibling_labels_pull_the_shared_column_toward_the_source() {
        let boxes = vec![
            boxed("src", 0, 0, 6, 3),
            boxed("x", 26, 4, 6, 3),
            boxed("y", 26, 9, 6, 3),
        ];
        let index = BoxIndex::build(&boxes);
        let to_x = Connection::new("src", "x").with_label("publishes");
        let to_y = Connection::new("src", "y");
        let siblings = vec![to_x.clone(), to_y.clone()];
        let mut canvas = canvas_with(&boxes, 36, 13);
        draw_connection(&mut canvas, &to_x, &index, &siblings);
        draw_connection(&mut canvas, &to_y, &index, &siblings);
        // anchors at column 6 and 25; "publishes" needs 11 cells before column 25
        assert_eq!(canvas.get(13, 1), '┐');
        assert_eq!(canvas.get(13, 5), '├');
        assert_eq!(canvas.get(13, 10), '└');
        let row: String = (14..25).map(|x| canvas.get(x, 5)).collect();
        assert_eq!(row, "─publishes─");
    }

    #[test]
    fn labels_never_cover_junctions() {
        let boxes = vec![
            boxed("gateway", 0, 4, 9, 3),
            boxed("auth", 20, 4, 8, 3),
            boxed("orders", 20, 9, 8, 3),
        ];
        let index = BoxIndex::build(&boxes);
        let straight = Connection::new("gateway", "auth").with_label("ok");
        let bent = Connection::new("gateway", "orders");
        let siblings = vec![straight.clone(), bent.clone()];
        let mut canvas = canvas_with(&boxes, 32, 14);
        let first = route_connection(&mut canvas, &straight, &index, &siblings).unwrap();
        route_connection(&mut canvas, &bent, &index, &siblings);
        assert!(place_label(&mut canvas, first.label.as_ref().unwrap()));
        assert_eq!(canvas.get(14, 5), '┬');
        let row: String = (9..15).map(|x| canvas.get(x, 5)).collect();
        assert_eq!(row, "─ok──┬");
    }

    #[test]
    fn missing_endpoints_skip_the_connection() {
        let boxes = vec![boxed("a", 0, 0, 5, 3)];
        let index = BoxIndex::build(&boxes);
        let mut canvas = canvas_with(&boxes, 10, 4);
        let before = canvas.to_text();
        assert_eq!(
            draw_connection(&mut canvas, &Connection::new("a", "ghost"), &index, &[]),
            None
        );
        assert_eq!(canvas.to_text(), before);
    }

    #[test]
    fn too_long_l_labels_are_omitted() {
        let boxes = vec![boxed("a", 0, 0, 5, 3), boxed("b", 12, 6, 5, 3)];
        let index = BoxIndex::build(&boxes);
        let mut canvas = canvas_with(&boxes, 20, 10);
        let connection = Connection::new("a", "b").with_label("a very long label");
        draw_connection(&mut canvas, &connection, &index, &[]);
        assert!(!canvas.to_text().contains("long"));
        assert_eq!(canvas.get(11, 7), '▶');
    }
}
