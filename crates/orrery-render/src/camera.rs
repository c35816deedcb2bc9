//! Double-precision orbiting camera with eased go-to and move-to transitions.

use std::collections::VecDeque;

use glam::{DAffine3, DMat3, DMat4, DQuat, DVec3};
use orrery_config::CameraConfig;

use crate::transition::{Easing, Transition};

/// Durations of the camera's animated moves, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionTimings {
    pub go_to_orientation_ms: u64,
    pub go_to_position_ms: u64,
    pub move_to_ms: u64,
}

impl Default for TransitionTimings {
    fn default() -> Self {
        Self {
            go_to_orientation_ms: 1000,
            go_to_position_ms: 2000,
            move_to_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Orientation(Transition<DQuat>),
    /// Position expressed as an offset from the scene center, so a moving
    /// center carries the animation along.
    Offset(Transition<DVec3>),
}

impl Stage {
    fn advance(&mut self, dt: f64) -> f64 {
        match self {
            Stage::Orientation(t) => t.advance(dt),
            Stage::Offset(t) => t.advance(dt),
        }
    }

    fn is_finished(&self) -> bool {
        match self {
            Stage::Orientation(t) => t.is_finished(),
            Stage::Offset(t) => t.is_finished(),
        }
    }
}

/// Camera looking into a scene centered on a body of radius `scene_radius`.
///
/// Every mutator recomputes the view and projection eagerly. The clip planes
/// follow the scene radius: `near = k1·k2·R`, `far = |position − center| + k2·R`.
#[derive(Debug, Clone)]
pub struct Camera {
    position: DVec3,
    up: DVec3,
    orientation: DQuat,
    center: DVec3,
    fov_degrees: f64,
    aspect_ratio: f64,
    z_near: f64,
    z_far: f64,
    scene_radius: f64,
    near_coefficient: f64,
    clipping_coefficient: f64,
    model_view: DAffine3,
    projection: DMat4,
    timings: TransitionTimings,
    animation: VecDeque<Stage>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    pub fn new() -> Self {
        let mut camera = Self {
            position: DVec3::new(0.0, 1.0, 0.0),
            up: DVec3::Z,
            orientation: DQuat::IDENTITY,
            center: DVec3::ZERO,
            fov_degrees: 45.0,
            aspect_ratio: 1.0,
            z_near: 1.0e-3,
            z_far: 1.0e5,
            scene_radius: 1.0,
            near_coefficient: 1.0e-8,
            clipping_coefficient: 1.0e6,
            model_view: DAffine3::IDENTITY,
            projection: DMat4::IDENTITY,
            timings: TransitionTimings::default(),
            animation: VecDeque::new(),
        };
        camera.update_model_view();
        camera.update_projection();
        camera
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        let mut camera = Self::new();
        camera.fov_degrees = config.fov_degrees;
        camera.near_coefficient = config.near_coefficient;
        camera.clipping_coefficient = config.clipping_coefficient;
        camera.timings = TransitionTimings {
            go_to_orientation_ms: config.go_to_orientation_ms,
            go_to_position_ms: config.go_to_position_ms,
            move_to_ms: config.move_to_ms,
        };
        camera.update_projection();
        camera
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn up_vector(&self) -> DVec3 {
        self.up
    }

    pub fn orientation(&self) -> DQuat {
        self.orientation
    }

    pub fn center(&self) -> DVec3 {
        self.center
    }

    /// Vertical field of view in degrees.
    pub fn fov(&self) -> f64 {
        self.fov_degrees
    }

    pub fn vertical_fov(&self) -> f64 {
        self.fov_degrees.to_radians()
    }

    pub fn horizontal_fov(&self) -> f64 {
        2.0 * ((self.vertical_fov() / 2.0).tan() * self.aspect_ratio).atan()
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn z_near(&self) -> f64 {
        self.z_near
    }

    pub fn z_far(&self) -> f64 {
        self.z_far
    }

    pub fn scene_radius(&self) -> f64 {
        self.scene_radius
    }

    /// World to eye transform: `rotate(orientation) · translate(−position)`.
    pub fn model_view(&self) -> DAffine3 {
        self.model_view
    }

    /// OpenGL-style perspective matrix; depth is rewritten by the shaders.
    pub fn projection(&self) -> DMat4 {
        self.projection
    }

    pub fn timings(&self) -> TransitionTimings {
        self.timings
    }

    pub fn set_position(&mut self, position: DVec3) {
        self.position = position;
        self.update_model_view();
        self.update_clip_planes();
    }

    pub fn set_up_vector(&mut self, up: DVec3) {
        self.up = up;
        self.update_model_view();
    }

    pub fn set_orientation(&mut self, orientation: DQuat) {
        self.orientation = orientation;
        self.update_model_view();
    }

    pub fn set_center(&mut self, center: DVec3) {
        self.center = center;
        self.update_model_view();
        self.update_clip_planes();
    }

    pub fn set_fov(&mut self, fov_degrees: f64) {
        self.fov_degrees = fov_degrees;
        self.update_projection();
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f64) {
        self.aspect_ratio = aspect_ratio;
        self.update_projection();
    }

    pub fn set_z_near(&mut self, z_near: f64) {
        self.z_near = z_near;
        self.update_projection();
    }

    pub fn set_z_far(&mut self, z_far: f64) {
        self.z_far = z_far;
        self.update_projection();
    }

    pub fn set_scene_radius(&mut self, scene_radius: f64) {
        self.scene_radius = scene_radius;
        self.update_clip_planes();
    }

    /// Orbit position and up vector about the scene center by `q`.
    pub fn rotate_around_center(&mut self, q: DQuat) {
        self.position = self.center + q * (self.position - self.center);
        self.up = q * self.up;
        self.orientation *= q.inverse();
        self.update_model_view();
        self.update_clip_planes();
    }

    /// Turn the view in place.
    pub fn rotate(&mut self, q: DQuat) {
        self.orientation *= q;
        self.up = q.inverse() * self.up;
        self.update_model_view();
    }

    pub fn look_at(&mut self, target: DVec3) {
        self.orientation = self.look_at_quaternion(target);
        self.update_model_view();
    }

    /// Orientation facing `target` from the current position, keeping `up`.
    /// Falls back to the current orientation when the basis is degenerate.
    pub fn look_at_quaternion(&self, target: DVec3) -> DQuat {
        let w = (self.position - target).normalize_or_zero();
        let u = self.up.cross(w).normalize_or_zero();
        if w == DVec3::ZERO || u == DVec3::ZERO {
            return self.orientation;
        }
        let v = w.cross(u);
        // u, v, w are the rows of the view rotation.
        DQuat::from_mat3(&DMat3::from_cols(u, v, w).transpose()).normalize()
    }

    /// Turn towards the center, then back off until the scene radius fills
    /// the narrower field of view.
    pub fn go_to_center(&mut self) {
        let target = self.look_at_quaternion(self.center);
        let vfov = self.vertical_fov();
        let hfov = self.horizontal_fov();
        let distance = (self.scene_radius / (vfov / 2.0).sin())
            .max(self.scene_radius / (hfov / 2.0).sin());
        let offset = self.position - self.center;
        let end = offset.normalize_or_zero() * distance;

        self.animation.clear();
        self.animation.push_back(Stage::Orientation(Transition::new(
            self.orientation,
            target,
            self.timings.go_to_orientation_ms,
            Easing::OutCirc,
        )));
        self.animation.push_back(Stage::Offset(Transition::new(
            offset,
            end,
            self.timings.go_to_position_ms,
            Easing::OutCirc,
        )));
    }

    pub fn move_to(&mut self, position: DVec3) {
        self.animation.clear();
        self.animation.push_back(Stage::Offset(Transition::new(
            self.position - self.center,
            position - self.center,
            self.timings.move_to_ms,
            Easing::OutCirc,
        )));
    }

    pub fn is_animating(&self) -> bool {
        !self.animation.is_empty()
    }

    pub fn stop_animation(&mut self) {
        self.animation.clear();
    }

    /// Step running transitions by `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        let mut dt = dt;
        while let Some(stage) = self.animation.front_mut() {
            dt = stage.advance(dt);
            match stage {
                Stage::Orientation(t) => self.orientation = t.value(),
                Stage::Offset(t) => self.position = self.center + t.value(),
            }
            if !stage.is_finished() {
                break;
            }
            self.animation.pop_front();
        }
        self.update_model_view();
        self.update_clip_planes();
    }

    fn update_clip_planes(&mut self) {
        self.z_near = self.near_coefficient * self.clipping_coefficient * self.scene_radius;
        self.z_far = (self.position - self.center).length()
            + self.clipping_coefficient * self.scene_radius;
        self.update_projection();
    }

    fn update_model_view(&mut self) {
        self.orientation = self.orientation.normalize();
        self.model_view =
            DAffine3::from_quat(self.orientation) * DAffine3::from_translation(-self.position);
    }

    fn update_projection(&mut self) {
        let f = 1.0 / (self.fov_degrees.to_radians() / 2.0).tan();
        let (n, fa) = (self.z_near, self.z_far);
        self.projection = DMat4::from_cols_array(&[
            f / self.aspect_ratio,
            0.0,
            0.0,
            0.0,
            0.0,
            f,
            0.0,
            0.0,
            0.0,
            0.0,
            (fa + n) / (n - fa),
            -1.0,
            0.0,
            0.0,
            (2.0 * fa * n) / (n - fa),
            0.0,
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn assert_vec_close(a: DVec3, b: DVec3, tol: f64) {
        assert!((a - b).length() < tol, "{a} != {b}");
    }

    #[test]
    fn test_defaults() {
        let c = Camera::new();
        assert_eq!(c.position(), DVec3::new(0.0, 1.0, 0.0));
        assert_eq!(c.up_vector(), DVec3::Z);
        assert_eq!(c.fov(), 45.0);
        assert_eq!(c.aspect_ratio(), 1.0);
        assert_eq!(c.z_near(), 1.0e-3);
        assert_eq!(c.z_far(), 1.0e5);
        assert!(!c.is_animating());
    }

    #[test]
    fn test_clip_planes_follow_scene_radius() {
        let mut c = Camera::new();
        c.set_position(DVec3::new(0.0, 0.0, 500.0));
        c.set_scene_radius(10.0);
        assert!((c.z_near() - 1.0e-8 * 1.0e6 * 10.0).abs() < 1e-15);
        assert!((c.z_far() - (500.0 + 1.0e7)).abs() < 1e-6);
        c.set_position(DVec3::new(0.0, 0.0, 1000.0));
        assert!((c.z_far() - (1000.0 + 1.0e7)).abs() < 1e-6);
    }

    #[test]
    fn test_view_is_rotation_then_translation() {
        let mut c = Camera::new();
        c.set_position(DVec3::new(1.0, 2.0, 3.0));
        c.set_orientation(DQuat::from_rotation_x(FRAC_PI_2));
        let p = DVec3::new(4.0, -1.0, 7.0);
        let expected = DQuat::from_rotation_x(FRAC_PI_2) * (p - DVec3::new(1.0, 2.0, 3.0));
        assert_vec_close(c.model_view().transform_point3(p), expected, 1e-12);
    }

    #[test]
    fn test_projection_matches_gl_perspective() {
        let mut c = Camera::new();
        c.set_aspect_ratio(2.0);
        c.set_z_near(1.0);
        c.set_z_far(100.0);
        let p = c.projection();
        let f = 1.0 / (22.5_f64.to_radians()).tan();
        assert!((p.x_axis.x - f / 2.0).abs() < 1e-12);
        assert!((p.y_axis.y - f).abs() < 1e-12);
        assert_eq!(p.z_axis.w, -1.0);
        // Near plane maps to -1, far plane to +1 in GL clip space.
        let near = p * glam::DVec4::new(0.0, 0.0, -1.0, 1.0);
        let far = p * glam::DVec4::new(0.0, 0.0, -100.0, 1.0);
        assert!((near.z / near.w + 1.0).abs() < 1e-9);
        assert!((far.z / far.w - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_look_at_puts_target_on_negative_z() {
        let mut c = Camera::new();
        c.set_position(DVec3::new(3.0, -4.0, 12.0));
        let target = DVec3::new(-2.0, 1.0, 0.5);
        c.look_at(target);
        let eye = c.model_view().transform_point3(target);
        assert!(eye.x.abs() < 1e-9 && eye.y.abs() < 1e-9, "{eye}");
        assert!(eye.z < 0.0);
    }

    #[test]
    fn test_look_at_basis_rows() {
        let mut c = Camera::new();
        c.set_position(DVec3::new(0.0, 0.0, 10.0));
        c.set_up_vector(DVec3::Y);
        c.look_at(DVec3::ZERO);
        assert!(c.orientation().angle_between(DQuat::IDENTITY) < 1e-12);
    }

    #[test]
    fn test_look_at_degenerate_keeps_orientation() {
        let mut c = Camera::new();
        let before = c.orientation();
        c.look_at(c.position());
        assert_eq!(c.orientation(), before);
    }

    #[test]
    fn test_rotate_around_center_keeps_center_in_view() {
        let mut c = Camera::new();
        c.set_position(DVec3::new(0.0, 0.0, 50.0));
        c.set_center(DVec3::new(1.0, 1.0, 0.0));
        c.look_at(c.center());
        let before = c.model_view().transform_point3(c.center());
        c.rotate_around_center(DQuat::from_axis_angle(DVec3::new(1.0, 2.0, 0.5).normalize(), 0.7));
        let after = c.model_view().transform_point3(c.center());
        assert_vec_close(before, after, 1e-9);
        assert!(((c.position() - c.center()).length() - before.length()).abs() < 1e-9);
    }

    #[test]
    fn test_rotate_turns_up_vector_back() {
        let mut c = Camera::new();
        let q = DQuat::from_rotation_x(0.3);
        c.rotate(q);
        assert_vec_close(c.up_vector(), q.inverse() * DVec3::Z, 1e-12);
        assert!(c.orientation().angle_between(q) < 1e-12);
    }

    #[test]
    fn test_go_to_center_turns_then_frames_scene() {
        let mut c = Camera::new();
        c.set_position(DVec3::new(0.0, -1000.0, 0.0));
        c.set_center(DVec3::new(10.0, 0.0, 0.0));
        c.set_scene_radius(5.0);
        c.go_to_center();
        assert!(c.is_animating());

        // Halfway through the first stage only the orientation has moved.
        let start = c.position();
        c.advance(0.5);
        assert_eq!(c.position(), start);

        c.advance(0.5);
        let eye = c.model_view().transform_point3(c.center());
        assert!(eye.x.abs() < 1e-6 && eye.y.abs() < 1e-6, "{eye}");

        c.advance(2.0);
        assert!(!c.is_animating());
        let expected = 5.0 / (22.5_f64.to_radians()).sin();
        assert!(((c.position() - c.center()).length() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_go_to_center_follows_moving_center() {
        let mut c = Camera::new();
        c.set_position(DVec3::new(0.0, -1000.0, 0.0));
        c.set_scene_radius(5.0);
        c.go_to_center();
        c.advance(1.5);
        let shift = DVec3::new(0.0, 0.0, 250.0);
        c.set_position(c.position() + shift);
        c.set_center(c.center() + shift);
        c.advance(5.0);
        let expected = 5.0 / (22.5_f64.to_radians()).sin();
        assert!(((c.position() - shift).length() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_move_to_replaces_running_animation() {
        let mut c = Camera::new();
        c.set_position(DVec3::new(0.0, -1000.0, 0.0));
        c.go_to_center();
        let target = DVec3::new(0.0, -10.0, 3.0);
        c.move_to(target);
        c.advance(0.25);
        assert!(c.is_animating());
        c.advance(0.25);
        assert!(!c.is_animating());
        assert_vec_close(c.position(), target, 1e-9);
    }

    #[test]
    fn test_from_config_applies_timings() {
        let config = CameraConfig {
            move_to_ms: 100,
            ..CameraConfig::default()
        };
        let c = Camera::from_config(&config);
        assert_eq!(c.timings().move_to_ms, 100);
        assert_eq!(c.timings().go_to_position_ms, 2000);
    }
}
