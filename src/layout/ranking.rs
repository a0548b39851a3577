use std::collections::VecDeque;

/// What happens to nodes a cycle keeps from ever reaching in-degree zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CyclePolicy {
    /// Leave them (and everything downstream) on layer 0.
    GroundAtZero,
    /// Repeatedly release the node with the lowest remaining in-degree,
    /// ties broken by document order.
    SeedLowestInDegree,
}

/// An edge between two boxes of the same layout scope, by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct LayerEdge {
    pub from: usize,
    pub to: usize,
    pub label_len: usize,
    /// Explicit sides that do not run along the layer axis.
    pub sideways: bool,
}

/// Longest-path layering; self loops are ignored.
pub(super) fn assign_layers(count: usize, edges: &[LayerEdge], policy: CyclePolicy) -> Vec<usize> {
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut in_degree = vec![0usize; count];
    for edge in edges {
        if edge.from == edge.to || edge.from >= count || edge.to >= count {
            continue;
        }
        outgoing[edge.from].push(edge.to);
        in_degree[edge.to] += 1;
    }

    let mut layer = vec![0usize; count];
    let mut done = vec![false; count];
    let mut queue: VecDeque<usize> = (0..count).filter(|idx| in_degree[*idx] == 0).collect();
    loop {
        while let Some(node) = queue.pop_front() {
            if done[node] {
                continue;
            }
            done[node] = true;
            for &next in &outgoing[node] {
                if done[next] {
                    continue;
                }
                layer[next] = layer[next].max(layer[node] + 1);
                in_degree[next] = in_degree[next].saturating_sub(1);
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }
        match policy {
            CyclePolicy::GroundAtZero => {
                for idx in 0..count {
                    if !done[idx] {
                        layer[idx] = 0;
                    }
                }
                break;
            }
            CyclePolicy::SeedLowestInDegree => {
                let seed = (0..count)
                    .filter(|idx| !done[*idx])
                    .min_by_key(|idx| (in_degree[*idx], *idx));
                match seed {
                    Some(idx) => {
                        log::trace!(seed = idx, in_degree = in_degree[idx]; "Breaking cycle");
                        queue.push_back(idx);
                    }
                    None => break,
                }
            }
        }
    }
    layer
}

/// Buckets of node indices per layer, in document order.
pub(super) fn group_layers(layer_of: &[usize]) -> Vec<Vec<usize>> {
    let depth = layer_of.iter().copied().max().map(|max| max + 1).unwrap_or(0);
    let mut layers = vec![Vec::new(); depth];
    for (idx, layer) in layer_of.iter().enumerate() {
        layers[*layer].push(idx);
    }
    layers
}

/// Order every layer after the first by the median position of its
/// predecessors in the previous layer; members without one go last.
pub(super) fn order_layers(layers: &mut [Vec<usize>], edges: &[LayerEdge], count: usize) {
    for rank in 1..layers.len() {
        let mut position: Vec<Option<usize>> = vec![None; count];
        for (pos, node) in layers[rank - 1].iter().enumerate() {
            position[*node] = Some(pos);
        }
        let keys: Vec<(usize, f64)> = layers[rank]
            .iter()
            .map(|node| (*node, median_predecessor(*node, edges, &position)))
            .collect();
        let key_of = |node: usize| {
            keys.iter()
                .find(|(candidate, _)| *candidate == node)
                .map(|(_, key)| *key)
                .unwrap_or(f64::INFINITY)
        };
        layers[rank].sort_by(|a, b| key_of(*a).total_cmp(&key_of(*b)));
    }
}

fn median_predecessor(node: usize, edges: &[LayerEdge], position: &[Option<usize>]) -> f64 {
    let mut values: Vec<f64> = edges
        .iter()
        .filter(|edge| edge.to == node && edge.from != node)
        .filter_map(|edge| position.get(edge.from).copied().flatten())
        .map(|pos| pos as f64)
        .collect();
    if values.is_empty() {
        return f64::INFINITY;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) * 0.5
    }
}

/// Gap after `layer`: `base`, widened for labels on forward single-step edges.
pub(super) fn layer_gap(
    edges: &[LayerEdge],
    layer_of: &[usize],
    layer: usize,
    base: i32,
    labeled_gap: impl Fn(usize) -> i32,
) -> i32 {
    edges
        .iter()
        .filter(|edge| {
            edge.label_len > 0
                && !edge.sideways
                && layer_of.get(edge.from) == Some(&layer)
                && layer_of.get(edge.to) == Some(&(layer + 1))
        })
        .map(|edge| labeled_gap(edge.label_len))
        .fold(base, i32::max)
}
