use super::ranking::{CyclePolicy, LayerEdge, assign_layers, group_layers, layer_gap};
use super::sizing::{far_corner, fit_container, size_siblings};
use crate::config::LayoutConfig;
use crate::ir::{ChildDirection, Connection, Content, DiagramNode};

/// Size and position the children of `node` (depth first), then size
/// `node` itself around them. Explicit geometry is never overwritten.
pub(super) fn layout_container(node: &mut DiagramNode, config: &LayoutConfig) {
    let direction = node.child_direction;
    let Content::Boxes(children) = &mut node.content else {
        return;
    };
    for child in children.iter_mut() {
        if child.is_container() {
            layout_container(child, config);
        }
    }
    size_siblings(children, config);

    let intra = intra_connections(children, &node.connections);
    match direction {
        ChildDirection::Vertical => stack_vertically(children, &intra, config),
        ChildDirection::Horizontal => place_in_columns(children, &intra, config),
    }
    let longest_label = intra.iter().map(|c| c.label_len()).max().unwrap_or(0);
    fit_container(node, longest_label, config);
}

/// Connections whose endpoints are both direct children.
fn intra_connections<'a>(
    children: &[DiagramNode],
    connections: &'a [Connection],
) -> Vec<&'a Connection> {
    connections
        .iter()
        .filter(|c| child_index(children, &c.from).is_some() && child_index(children, &c.to).is_some())
        .collect()
}

fn child_index(children: &[DiagramNode], id: &str) -> Option<usize> {
    children.iter().position(|child| child.has_id(id))
}

fn stack_vertically(children: &mut [DiagramNode], intra: &[&Connection], config: &LayoutConfig) {
    let gap = if intra.iter().any(|c| c.label_len() > 0) {
        3
    } else if !intra.is_empty() {
        2
    } else {
        config.v_gap
    };
    let mut cursor = config.pad_top;
    for child in children.iter_mut() {
        child.x.get_or_insert(config.pad_left);
        let y = *child.y.get_or_insert(cursor);
        cursor = y + child.height.unwrap_or(0) + child.shadow_extent().1 + gap;
    }
}

/// Columns from longest-path layering over the intra-container edges.
/// Children no edge reaches share the first column.
fn place_in_columns(children: &mut [DiagramNode], intra: &[&Connection], config: &LayoutConfig) {
    let edges: Vec<LayerEdge> = intra
        .iter()
        .filter_map(|c| {
            Some(LayerEdge {
                from: child_index(children, &c.from)?,
                to: child_index(children, &c.to)?,
                label_len: c.label_len(),
                sideways: matches!(
                    (c.from_side, c.to_side),
                    (Some(a), Some(b)) if a == b || (a.is_vertical() && b.is_vertical())
                ),
            })
        })
        .collect();

    let layer_of = assign_layers(children.len(), &edges, CyclePolicy::GroundAtZero);
    let layers = group_layers(&layer_of);

    let mut x = config.pad_left;
    for (rank, members) in layers.iter().enumerate() {
        let mut y = config.pad_top;
        let mut column_width = 0;
        for idx in members {
            let child = &mut children[*idx];
            child.x.get_or_insert(x);
            let top = *child.y.get_or_insert(y);
            y = top + child.height.unwrap_or(0) + child.shadow_extent().1 + config.v_gap;
            column_width = column_width.max(child.width.unwrap_or(0) + child.shadow_extent().0);
        }
        let gap = layer_gap(&edges, &layer_of, rank, config.default_h_gap, |len| {
            i32::try_from(len).unwrap_or(i32::MAX - 4) + 4
        });
        x += column_width + gap;
    }
    log::trace!(
        columns = layers.len(),
        right = children.iter().map(|c| far_corner(c).0).max().unwrap_or(0);
        "Placed container columns"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LayoutConfig {
        LayoutConfig::default()
    }

    #[test]
    fn connected_children_flow_left_to_right() {
        let mut node = DiagramNode::container(
            Some("g"),
            vec![
                DiagramNode::leaf(Some("a"), "A"),
                DiagramNode::leaf(Some("b"), "B"),
                DiagramNode::leaf(Some("c"), "C"),
            ],
        )
        .with_connection(Connection::new("a", "b"))
        .with_connection(Connection::new("b", "c"));
        layout_container(&mut node, &config());
        let xs: Vec<_> = node.children().iter().map(|c| c.x.unwrap()).collect();
        assert_eq!(xs, vec![2, 16, 30]);
        assert!(node.children().iter().all(|c| c.y == Some(1)));
        assert_eq!(node.width, Some(2 + 3 * 8 + 2 * 6 + 2 + 2));
        assert_eq!(node.height, Some(1 + 3 + 1 + 2));
    }

    #[test]
    fn unconnected_children_stack_in_one_column() {
        let mut node = DiagramNode::container(
            Some("g"),
            vec![DiagramNode::leaf(Some("a"), "A"), DiagramNode::leaf(Some("b"), "B")],
        );
        layout_container(&mut node, &config());
        let xs: Vec<_> = node.children().iter().map(|c| c.x.unwrap()).collect();
        let ys: Vec<_> = node.children().iter().map(|c| c.y.unwrap()).collect();
        assert_eq!(xs, vec![2, 2]);
        assert_eq!(ys, vec![1, 1 + 3 + 1]);
        assert_eq!(node.height, Some(1 + 3 + 1 + 3 + 1 + 2));
    }

    #[test]
    fn unconnected_siblings_of_an_edge_share_the_first_column() {
        let mut node = DiagramNode::container(
            None,
            vec![
                DiagramNode::leaf(Some("a"), "A"),
                DiagramNode::leaf(Some("b"), "B"),
                DiagramNode::leaf(Some("loner"), "L"),
            ],
        )
        .with_connection(Connection::new("a", "b"));
        layout_container(&mut node, &config());
        let loner = &node.children()[2];
        assert_eq!(loner.x, Some(2));
        assert_eq!(loner.y, Some(1 + 3 + 1));
    }

    #[test]
    fn labels_widen_the_column_gap() {
        let mut node = DiagramNode::container(
            None,
            vec![DiagramNode::leaf(Some("a"), "A"), DiagramNode::leaf(Some("b"), "B")],
        )
        .with_connection(Connection::new("a", "b").with_label("subscribes to"));
        layout_container(&mut node, &config());
        assert_eq!(node.children()[1].x, Some(2 + 8 + 13 + 4));
    }

    #[test]
    fn vertical_containers_stack_with_connection_aware_gaps() {
        let mut node = DiagramNode::container(
            None,
            vec![DiagramNode::leaf(Some("a"), "A"), DiagramNode::leaf(Some("b"), "B")],
        );
        node.child_direction = ChildDirection::Vertical;
        let mut plain = node.clone();
        layout_container(&mut plain, &config());
        assert_eq!(plain.children()[1].y, Some(1 + 3 + 1));

        let mut linked = node.clone().with_connection(Connection::new("a", "b"));
        layout_container(&mut linked, &config());
        assert_eq!(linked.children()[1].y, Some(1 + 3 + 2));

        let mut labeled = node.with_connection(Connection::new("a", "b").with_label("x"));
        layout_container(&mut labeled, &config());
        assert_eq!(labeled.children()[1].y, Some(1 + 3 + 3));
        assert!(labeled.children().iter().all(|c| c.x == Some(2)));
    }

    #[test]
    fn cycles_inside_a_container_fall_back_to_one_column() {
        let mut node = DiagramNode::container(
            None,
            vec![DiagramNode::leaf(Some("a"), "A"), DiagramNode::leaf(Some("b"), "B")],
        )
        .with_connection(Connection::new("a", "b"))
        .with_connection(Connection::new("b", "a"));
        layout_container(&mut node, &config());
        assert!(node.children().iter().all(|c| c.x == Some(2)));
        assert!(node.children()[0].y < node.children()[1].y);
    }

    #[test]
    fn nested_containers_are_sized_bottom_up() {
        let inner = DiagramNode::container(Some("inner"), vec![DiagramNode::leaf(None, "A")]);
        let mut outer = DiagramNode::container(Some("outer"), vec![inner]);
        layout_container(&mut outer, &config());
        let inner = &outer.children()[0];
        assert_eq!((inner.width, inner.height), (Some(14), Some(7)));
        assert_eq!((outer.width, outer.height), (Some(20), Some(11)));
    }

    #[test]
    fn explicit_child_positions_win() {
        let mut node = DiagramNode::container(
            None,
            vec![DiagramNode::leaf(None, "A").with_geometry(5, 4, 10, 3)],
        );
        layout_container(&mut node, &config());
        let child = &node.children()[0];
        assert_eq!((child.x, child.y), (Some(5), Some(4)));
        assert_eq!(node.width, Some(5 + 10 + 2 + 2));
    }
}
