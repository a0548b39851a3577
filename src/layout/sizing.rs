use crate::config::LayoutConfig;
use crate::ir::{ChildDirection, DiagramNode};

fn cells(count: usize) -> i32 {
    i32::try_from(count).unwrap_or(i32::MAX)
}

/// Fill in missing width/height of a leaf from its text.
/// Returns true when the width was computed here.
pub(super) fn size_leaf(node: &mut DiagramNode, config: &LayoutConfig) -> bool {
    let lines = node.text_lines();
    let longest = cells(
        lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0),
    );
    let line_count = cells(lines.len());
    let title = cells(node.title_len());

    let mut auto_width = false;
    if node.width.is_none() {
        node.width = Some((longest + 4).max(title + 6).max(config.min_box_width));
        auto_width = true;
    }
    if node.height.is_none() {
        node.height = Some((line_count + 2).max(config.min_box_height));
    }
    auto_width
}

/// Size every leaf among `siblings`, then pull the auto-sized ones to a
/// common width when they are already within 70% of each other.
pub(super) fn size_siblings(siblings: &mut [DiagramNode], config: &LayoutConfig) {
    let auto: Vec<bool> = siblings
        .iter_mut()
        .map(|node| !node.is_container() && size_leaf(node, config))
        .collect();

    let widths: Vec<i32> = siblings
        .iter()
        .zip(&auto)
        .filter(|(_, auto)| **auto)
        .filter_map(|(node, _)| node.width)
        .collect();
    if widths.len() < 2 {
        return;
    }
    let (Some(min), Some(max)) = (widths.iter().min(), widths.iter().max()) else {
        return;
    };
    if i64::from(*min) * 10 < i64::from(*max) * 7 {
        return;
    }
    let target = *max;
    for (node, auto) in siblings.iter_mut().zip(&auto) {
        if *auto {
            node.width = Some(target);
        }
    }
}

/// Outer extent of a positioned child, shadow included.
pub(super) fn far_corner(node: &DiagramNode) -> (i32, i32) {
    let (shadow_w, shadow_h) = node.shadow_extent();
    (
        node.x
            .unwrap_or(0)
            .saturating_add(node.width.unwrap_or(0))
            .saturating_add(shadow_w),
        node.y
            .unwrap_or(0)
            .saturating_add(node.height.unwrap_or(0))
            .saturating_add(shadow_h),
    )
}

/// Wrap a container around its already positioned children.
pub(super) fn fit_container(node: &mut DiagramNode, longest_label: usize, config: &LayoutConfig) {
    let (content_w, content_h) = node
        .children()
        .iter()
        .map(far_corner)
        .fold((0, 0), |(w, h), (cw, ch)| (w.max(cw), h.max(ch)));

    if node.width.is_none() {
        let mut interior = content_w.saturating_add(config.pad_left);
        if node.child_direction == ChildDirection::Vertical {
            let widest = node
                .children()
                .iter()
                .filter_map(|child| child.width)
                .max()
                .unwrap_or(0);
            if longest_label > 0 {
                interior = interior
                    .max(config.pad_left + widest.div_euclid(2) + 2 + cells(longest_label) + 1);
            }
        }
        let title = cells(node.title_len());
        node.width = Some(interior.saturating_add(2).max(title + 6).max(config.min_box_width));
    }
    if node.height.is_none() {
        node.height = Some(
            content_h
                .saturating_add(config.pad_top + 2)
                .max(config.min_box_height),
        );
    }
}
