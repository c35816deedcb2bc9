//! Per-body reference frames, recomputed every tick from the root down.

use std::f64::consts::{FRAC_PI_2, TAU};

use glam::{DAffine3, DQuat, DVec3};

use crate::body::{BodyNode, BodyTree};

/// The three frames a body exposes after [`BodyTree::set_time`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frames {
    /// Full body frame including self-rotation. Used for the surface.
    pub reference: DAffine3,
    /// Parent frame rotated into the orbital plane. Used for the trail.
    pub orbit: DAffine3,
    /// Equatorial, non-spinning frame in which satellites are placed.
    pub laplace: DAffine3,
}

impl Default for Frames {
    fn default() -> Self {
        Self {
            reference: DAffine3::IDENTITY,
            orbit: DAffine3::IDENTITY,
            laplace: DAffine3::IDENTITY,
        }
    }
}

/// Self-rotation angle `rot0 + (2π/period · t) mod 2π`. A zero or
/// non-finite period contributes no spin.
pub fn spin_angle(rotation_period: f64, rot0: f64, time: f64) -> f64 {
    if rotation_period == 0.0 || !rotation_period.is_finite() {
        return rot0;
    }
    rot0 + (TAU / rotation_period * time) % TAU
}

fn rotate_z(angle: f64) -> DAffine3 {
    DAffine3::from_quat(DQuat::from_rotation_z(angle))
}

impl BodyNode {
    /// Compose this body's frames from `parent_frame` at `time`.
    pub fn set_time(&mut self, parent_frame: DAffine3, time: f64) {
        let mut frame = parent_frame;
        let mut longitude_of_periapsis = 0.0;
        let mut rot0 = 0.0;

        let orbit_frame = match self.orbit_mut() {
            Some(orbit) => {
                frame = frame * DAffine3::from_quat(orbit.orientation());
                let orbit_frame = frame;
                let position = orbit.position(time);
                orbit.set_body_position(position, time);
                frame = frame * DAffine3::from_translation(DVec3::new(position.x, position.y, 0.0));
                let elements = orbit.elements();
                longitude_of_periapsis = elements.longitude_of_periapsis();
                // Only meaningful for bodies whose epoch anomaly doubles as a
                // prime-meridian angle (Earth, Moon).
                rot0 = elements.mean_anomaly_at_epoch;
                orbit_frame
            }
            None => parent_frame,
        };

        let params = self.params();
        frame = frame * rotate_z(FRAC_PI_2 - longitude_of_periapsis);
        frame = frame * DAffine3::from_quat(DQuat::from_rotation_y(params.axial_tilt));
        let laplace = frame;
        frame = frame * rotate_z(-FRAC_PI_2 + longitude_of_periapsis);
        frame = frame * rotate_z(spin_angle(params.rotation_period, rot0, time));

        self.frames = Frames {
            reference: frame,
            orbit: orbit_frame,
            laplace,
        };
    }
}

impl BodyTree {
    /// Recompute every body at `time`, starting the root from `root_frame`.
    /// Satellites start from their parent's Laplace frame.
    pub fn set_time(&mut self, root_frame: DAffine3, time: f64) {
        let nodes = self.nodes_mut();
        for i in 0..nodes.len() {
            let start = match nodes[i].parent() {
                Some(parent) => nodes[parent.0].frames.laplace,
                None => root_frame,
            };
            nodes[i].set_time(start, time);
        }
    }
}
