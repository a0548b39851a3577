//! Auto-layout: fills in missing geometry for every box of a diagram.
//!
//! Containers are laid out bottom-up first (leaf sizing, then columns or a
//! vertical stack per container), after which the top-level boxes are
//! ranked into layers from every connection in the tree and placed along
//! the root's flow direction.

mod container;
mod ranking;
mod sizing;

use crate::config::LayoutConfig;
use crate::ir::{ChildDirection, Connection, Content, DiagramNode};
use container::layout_container;
use ranking::{CyclePolicy, LayerEdge, assign_layers, group_layers, layer_gap, order_layers};
use sizing::{far_corner, size_siblings};
use std::collections::BTreeMap;

/// Grids never grow wider than this many columns.
const MAX_GRID_COLUMNS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Layers advance left to right.
    Across,
    /// Layers advance top to bottom.
    Down,
}

impl Flow {
    fn of(direction: ChildDirection) -> Self {
        match direction {
            ChildDirection::Horizontal => Flow::Across,
            ChildDirection::Vertical => Flow::Down,
        }
    }
}

/// Return a copy of `tree` in which every box has x, y, width and height,
/// and the root carries the canvas size. The input is left untouched and
/// geometry it already has is kept.
pub fn auto_layout(tree: &DiagramNode, config: &LayoutConfig) -> DiagramNode {
    let config = config.normalized();
    let mut root = tree.clone();
    if root.width.is_some()
        && root.height.is_some()
        && root.children().iter().all(DiagramNode::is_fully_placed)
    {
        log::debug!("Every box already placed, layout skipped");
        return root;
    }

    let flow = Flow::of(root.child_direction);
    let edges = top_level_edges(&root, flow);
    let connections: Vec<Connection> = root
        .connection_scopes()
        .into_iter()
        .flatten()
        .cloned()
        .collect();
    if let Content::Boxes(boxes) = &mut root.content {
        for node in boxes.iter_mut() {
            if node.is_container() {
                layout_container(node, &config);
            }
        }
        size_siblings(boxes, &config);
        if boxes.iter().all(|node| node.x.is_some() && node.y.is_some()) {
            log::debug!("Top-level boxes carry positions, layering skipped");
        } else {
            let links = top_level_links(boxes, &connections, flow);
            place_top_level(boxes, &edges, &links, flow, &config);
        }
    }
    fit_canvas(&mut root, &config);
    log::debug!(
        width = root.width.unwrap_or(0),
        height = root.height.unwrap_or(0),
        edges = edges.len();
        "Layout complete"
    );
    root
}

/// Every connection in the tree lifted to the pair of top-level boxes that
/// contain its endpoints. Pairs inside one box are dropped; repeated pairs
/// are merged keeping the longest label.
fn top_level_edges(root: &DiagramNode, flow: Flow) -> Vec<LayerEdge> {
    let boxes = root.children();
    let owner = |id: &str| boxes.iter().position(|node| node.contains_id(id));
    let mut edges: Vec<LayerEdge> = Vec::new();
    let mut seen: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for connection in root.connection_scopes().into_iter().flatten() {
        let (Some(from), Some(to)) = (owner(&connection.from), owner(&connection.to)) else {
            continue;
        };
        if from == to {
            continue;
        }
        if let Some(existing) = seen.get(&(from, to)) {
            let edge = &mut edges[*existing];
            edge.label_len = edge.label_len.max(connection.label_len());
            continue;
        }
        let sideways = match (connection.from_side, connection.to_side) {
            (Some(a), Some(b)) if a == b => true,
            (Some(a), Some(b)) => match flow {
                Flow::Across => a.is_vertical() && b.is_vertical(),
                Flow::Down => !a.is_vertical() && !b.is_vertical(),
            },
            _ => false,
        };
        seen.insert((from, to), edges.len());
        edges.push(LayerEdge {
            from,
            to,
            label_len: connection.label_len(),
            sideways,
        });
    }
    edges
}

/// A connection between two different top-level boxes. Each offset is the
/// distance, across the flow, from the owner's leading edge to the centre
/// of the endpoint it contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Link {
    from: usize,
    to: usize,
    from_offset: i32,
    to_offset: i32,
}

fn top_level_links(boxes: &[DiagramNode], connections: &[Connection], flow: Flow) -> Vec<Link> {
    let endpoint = |id: &str| {
        boxes.iter().enumerate().find_map(|(idx, node)| {
            centre_offset(node, id, flow).map(|offset| (idx, offset))
        })
    };
    connections
        .iter()
        .filter_map(|connection| {
            let (from, from_offset) = endpoint(&connection.from)?;
            let (to, to_offset) = endpoint(&connection.to)?;
            (from != to).then_some(Link {
                from,
                to,
                from_offset,
                to_offset,
            })
        })
        .collect()
}

/// Centre of box `id` across the flow, measured from the leading edge of
/// `node`, which is or contains it.
fn centre_offset(node: &DiagramNode, id: &str, flow: Flow) -> Option<i32> {
    if node.has_id(id) {
        let size = match flow {
            Flow::Across => node.height,
            Flow::Down => node.width,
        };
        return Some(size.unwrap_or(0).div_euclid(2));
    }
    node.children().iter().find_map(|child| {
        let child_start = match flow {
            Flow::Across => child.y,
            Flow::Down => child.x,
        };
        let inner = centre_offset(child, id, flow)?;
        Some(
            child_start
                .unwrap_or(0)
                .saturating_add(1)
                .saturating_add(inner),
        )
    })
}

fn place_top_level(
    boxes: &mut [DiagramNode],
    edges: &[LayerEdge],
    links: &[Link],
    flow: Flow,
    config: &LayoutConfig,
) {
    let count = boxes.len();
    if edges.is_empty() && count > MAX_GRID_COLUMNS {
        place_grid(boxes, config);
        return;
    }
    let layer_of: Vec<usize> = if edges.is_empty() {
        (0..count).collect()
    } else {
        assign_layers(count, edges, CyclePolicy::SeedLowestInDegree)
    };
    let mut layers = group_layers(&layer_of);
    order_layers(&mut layers, edges, count);
    log::trace!(layers = layers.len(), boxes = count; "Ranked top-level boxes");
    place_layers(boxes, &layers, &layer_of, edges, links, flow, config);
}

/// Extent of a box along the flow and across it, shadow included.
fn extents(node: &DiagramNode, flow: Flow) -> (i32, i32) {
    let (shadow_w, shadow_h) = node.shadow_extent();
    let width = node.width.unwrap_or(0).saturating_add(shadow_w);
    let height = node.height.unwrap_or(0).saturating_add(shadow_h);
    match flow {
        Flow::Across => (width, height),
        Flow::Down => (height, width),
    }
}

/// Lay layers out along the flow, stacking members across it; shorter
/// layers are centred against the longest one. A layer holding a single
/// box instead lines its endpoints up with their partners in the layer
/// before it.
fn place_layers(
    boxes: &mut [DiagramNode],
    layers: &[Vec<usize>],
    layer_of: &[usize],
    edges: &[LayerEdge],
    links: &[Link],
    flow: Flow,
    config: &LayoutConfig,
) {
    let (main_start, cross_start, cross_gap) = match flow {
        Flow::Across => (config.pad_left, config.pad_top, config.v_gap),
        Flow::Down => (config.pad_top, config.pad_left, config.default_h_gap),
    };
    let spans: Vec<i32> = layers
        .iter()
        .map(|members| {
            let total = members
                .iter()
                .map(|idx| extents(&boxes[*idx], flow).1)
                .fold(0i32, i32::saturating_add);
            let gaps = i32::try_from(members.len().saturating_sub(1))
                .unwrap_or(0)
                .saturating_mul(cross_gap);
            total.saturating_add(gaps)
        })
        .collect();
    let longest = spans.iter().copied().max().unwrap_or(0);

    let mut main = main_start;
    let mut shifted: Vec<usize> = Vec::new();
    for (rank, members) in layers.iter().enumerate() {
        let mut cross = cross_start.saturating_add((longest - spans[rank]).div_euclid(2));
        if let [only] = members.as_slice() {
            if let Some(aligned) = rank
                .checked_sub(1)
                .and_then(|previous| aligned_cross(boxes, links, layer_of, *only, previous, flow))
            {
                log::trace!(member = *only, cross = aligned; "Aligned single-box layer");
                cross = aligned;
            }
        }
        let mut depth = 0;
        for idx in members {
            let node = &mut boxes[*idx];
            let free = match flow {
                Flow::Across => node.y.is_none(),
                Flow::Down => node.x.is_none(),
            };
            if free {
                shifted.push(*idx);
            }
            let (x, y) = match flow {
                Flow::Across => (main, cross),
                Flow::Down => (cross, main),
            };
            node.x.get_or_insert(x);
            node.y.get_or_insert(y);
            let (along, across) = extents(node, flow);
            cross = cross.saturating_add(across).saturating_add(cross_gap);
            depth = depth.max(along);
        }
        let gap = match flow {
            Flow::Across => layer_gap(edges, layer_of, rank, config.default_h_gap, |len| {
                i32::try_from(len).unwrap_or(i32::MAX - 4) + 4
            }),
            Flow::Down => layer_gap(edges, layer_of, rank, 2, |_| 3),
        };
        main = main.saturating_add(depth).saturating_add(gap);
    }

    // Alignment may pull boxes above the padding; shift every placed box
    // back together.
    let top = shifted
        .iter()
        .filter_map(|idx| match flow {
            Flow::Across => boxes[*idx].y,
            Flow::Down => boxes[*idx].x,
        })
        .min()
        .unwrap_or(cross_start);
    if top < cross_start {
        let by = cross_start.saturating_sub(top);
        for idx in shifted {
            let coordinate = match flow {
                Flow::Across => &mut boxes[idx].y,
                Flow::Down => &mut boxes[idx].x,
            };
            if let Some(value) = coordinate {
                *value = value.saturating_add(by);
            }
        }
    }
}

/// Median cross position at which `member` meets its partners in layer
/// `previous`, or `None` when it has no link into that layer.
fn aligned_cross(
    boxes: &[DiagramNode],
    links: &[Link],
    layer_of: &[usize],
    member: usize,
    previous: usize,
    flow: Flow,
) -> Option<i32> {
    let mut wanted: Vec<i32> = links
        .iter()
        .filter_map(|link| {
            let (partner, partner_offset, own_offset) =
                if link.to == member && layer_of.get(link.from) == Some(&previous) {
                    (link.from, link.from_offset, link.to_offset)
                } else if link.from == member && layer_of.get(link.to) == Some(&previous) {
                    (link.to, link.to_offset, link.from_offset)
                } else {
                    return None;
                };
            let partner_start = match flow {
                Flow::Across => boxes.get(partner)?.y,
                Flow::Down => boxes.get(partner)?.x,
            }?;
            Some(
                partner_start
                    .saturating_add(partner_offset)
                    .saturating_sub(own_offset),
            )
        })
        .collect();
    if wanted.is_empty() {
        return None;
    }
    wanted.sort_unstable();
    let upper = wanted[wanted.len() / 2];
    let lower = wanted[(wanted.len() - 1) / 2];
    Some(lower.saturating_add(upper.saturating_sub(lower).div_euclid(2)))
}

fn grid_columns(count: usize) -> usize {
    let mut columns = 1;
    while columns * columns < count {
        columns += 1;
    }
    columns.min(MAX_GRID_COLUMNS)
}

/// Row-major grid for boxes with no connections between them.
fn place_grid(boxes: &mut [DiagramNode], config: &LayoutConfig) {
    let columns = grid_columns(boxes.len());
    let rows = boxes.len().div_ceil(columns);
    let mut column_width = vec![0; columns];
    let mut row_height = vec![0; rows];
    for (idx, node) in boxes.iter().enumerate() {
        let (width, height) = extents(node, Flow::Across);
        column_width[idx % columns] = column_width[idx % columns].max(width);
        row_height[idx / columns] = row_height[idx / columns].max(height);
    }
    let offsets = |sizes: &[i32], start: i32, gap: i32| -> Vec<i32> {
        sizes
            .iter()
            .scan(start, |cursor, size| {
                let at = *cursor;
                *cursor += size + gap;
                Some(at)
            })
            .collect()
    };
    let column_x = offsets(&column_width, config.pad_left, config.default_h_gap);
    let row_y = offsets(&row_height, config.pad_top, config.v_gap);
    for (idx, node) in boxes.iter_mut().enumerate() {
        node.x.get_or_insert(column_x[idx % columns]);
        node.y.get_or_insert(row_y[idx / columns]);
    }
    log::trace!(columns, rows; "Placed disconnected boxes on a grid");
}

/// Size the canvas to the far corner of the top-level boxes plus a margin
/// matching the leading padding.
fn fit_canvas(root: &mut DiagramNode, config: &LayoutConfig) {
    let (right, bottom) = root
        .children()
        .iter()
        .map(far_corner)
        .fold((0, 0), |(w, h), (x, y)| (w.max(x), h.max(y)));
    root.width.get_or_insert(right.saturating_add(config.pad_left));
    root.height.get_or_insert(bottom.saturating_add(config.pad_top));
}
