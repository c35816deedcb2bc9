//! Screen-space size estimates that drive point/sphere level of detail.

use glam::DVec3;

use crate::body::BodyTree;

/// Pixel measurements recomputed every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenMetrics {
    /// Projected bounding radius.
    pub radius: i32,
    /// Projected distance to the parent body, or -1 for the root.
    pub distance_to_parent: i32,
}

impl Default for ScreenMetrics {
    fn default() -> Self {
        Self {
            radius: 0,
            distance_to_parent: -1,
        }
    }
}

/// Pixel size of `length` seen from `distance` through a vertical field of
/// view `vfov` (radians) on a viewport `viewport_height` pixels tall.
/// Truncates toward zero.
pub fn projected_pixels(length: f64, distance: f64, vfov: f64, viewport_height: f64) -> i32 {
    (length / ((vfov / 2.0).tan() * distance) * viewport_height) as i32
}

/// True when a body sits so close to its parent on screen that drawing it
/// would only add clutter.
pub fn hidden_by_parent(distance_to_parent: i32, threshold: f32) -> bool {
    distance_to_parent >= 0 && (distance_to_parent as f32) < threshold * 2.0
}

/// Marker alpha for a body drawn as a point: ramps from 0 at two thresholds
/// from the parent to 1 at four, and is 1 for the root.
pub fn crossfade_alpha(distance_to_parent: i32, threshold: f32) -> f32 {
    let alpha = distance_to_parent as f32 / (threshold * 2.0) - 1.0;
    if alpha > 1.0 || distance_to_parent < 0 {
        1.0
    } else {
        alpha
    }
}

impl BodyTree {
    /// Refresh every body's [`ScreenMetrics`] for the given camera.
    pub fn update_screen_metrics(&mut self, camera_position: DVec3, vfov: f64, viewport_height: f64) {
        let centers: Vec<DVec3> = self.nodes().iter().map(|n| n.center()).collect();
        for node in self.nodes_mut() {
            let center = node.center();
            let distance = (center - camera_position).length() - node.radius();
            let radius = projected_pixels(node.bounding_radius(), distance, vfov, viewport_height);

            let distance_to_parent = match node.parent() {
                Some(parent) => {
                    let parent_center = centers[parent.0];
                    let separation = (parent_center - center).length();
                    let distance = (parent_center - camera_position).length() - separation;
                    projected_pixels(separation, distance, vfov, viewport_height)
                }
                None => -1,
            };

            node.screen = ScreenMetrics {
                radius,
                distance_to_parent,
            };
        }
    }
}
