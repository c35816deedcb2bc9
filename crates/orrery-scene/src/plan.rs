//! Draw ordering across bodies.

use glam::DVec3;

use crate::body::{BodyIndex, BodyTree};
use crate::render_mode::{RenderMode, RenderVisitor};
use crate::settings::RenderSettings;

/// Body indices sorted by distance from `camera_position`, nearest first.
pub fn sort_near_to_far(tree: &BodyTree, camera_position: DVec3) -> Vec<BodyIndex> {
    let mut order: Vec<(f64, BodyIndex)> = tree
        .iter()
        .map(|(index, node)| ((node.center() - camera_position).length(), index))
        .collect();
    order.sort_by(|a, b| a.0.total_cmp(&b.0));
    order.into_iter().map(|(_, index)| index).collect()
}

/// Opaque pass in `order`, then translucent pass in reverse.
pub fn draw_scene<V: RenderVisitor + ?Sized>(
    tree: &BodyTree,
    order: &[BodyIndex],
    settings: &RenderSettings,
    visitor: &mut V,
) {
    for &index in order {
        tree[index].render(RenderMode::Opaque, settings, visitor);
    }
    for &index in order.iter().rev() {
        tree[index].render(RenderMode::Translucent, settings, visitor);
    }
}

/// Every body in tree order in a single `mode`.
pub fn draw_all<V: RenderVisitor + ?Sized>(
    tree: &BodyTree,
    mode: RenderMode,
    settings: &RenderSettings,
    visitor: &mut V,
) {
    for (_, node) in tree.iter() {
        node.render(mode, settings, visitor);
    }
}
