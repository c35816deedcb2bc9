//! Navigation, selection and per-frame scene state shared between the event
//! handlers and the renderer.
//!
//! Everything a UI event may touch while a frame is being drawn (camera,
//! blur passes, antialiasing, render toggles, the selection and the pending
//! pick) sits behind one mutex in [`ViewState`]. Each public operation holds
//! the lock for its whole duration.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::{DAffine3, DQuat, DVec3, Vec2};
use orrery_config::{AntiAliasingMode, Config};
use orrery_render::{Camera, FrameSettings, eme2000_frame};
use orrery_scene::{BodyIndex, BodyTree};
use tracing::{debug, info, warn};

use crate::input::{DragMode, Intent, KeyAction};
use crate::timeline::Timeline;

/// Scene radius as a multiple of the selected body's radius.
pub const SCENE_RADIUS_FACTOR: f64 = 1.3;

/// Camera position at startup, before it is aimed at the root.
pub const START_POSITION: DVec3 = DVec3::new(0.0, 2.7e6, 2.7e6);
pub const START_UP: DVec3 = DVec3::new(0.0, -1.0, 1.0);

/// Something the window itself has to do in response to input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRequest {
    None,
    ToggleFullscreen,
    Close,
}

pub struct ViewState {
    pub camera: Camera,
    pub tree: BodyTree,
    pub frame: FrameSettings,
    selected: Option<BodyIndex>,
    pending_pick: Option<(u32, u32)>,
    star_frame: DAffine3,
    base_threshold: f32,
    supersample_factor: u32,
    zoom_divisor: f64,
    drag_degrees_per_pixel: f64,
}

impl ViewState {
    fn selected_node(&self) -> Option<(DVec3, f64)> {
        let node = self.tree.get(self.selected?)?;
        Some((node.center(), node.radius()))
    }

    fn select(&mut self, index: BodyIndex) -> bool {
        let Some(node) = self.tree.get(index) else {
            return false;
        };
        let (center, radius) = (node.center(), node.radius());
        info!("Selected '{}'", node.name());
        self.selected = Some(index);
        self.camera.set_center(center);
        self.camera.set_scene_radius(radius * SCENE_RADIUS_FACTOR);
        true
    }

    fn set_antialiasing(&mut self, mode: AntiAliasingMode) {
        self.frame.antialiasing = mode;
        self.frame.render.point_size_threshold =
            self.base_threshold * mode.size_coefficient(self.supersample_factor);
        info!("Antialiasing {mode:?}");
    }
}

/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Viewer {
    state: Arc<Mutex<ViewState>>,
}

impl Viewer {
    pub fn new(config: &Config) -> Self {
        let state = ViewState {
            camera: Camera::from_config(&config.camera),
            tree: BodyTree::default(),
            frame: FrameSettings::from_config(&config.render),
            selected: None,
            pending_pick: None,
            star_frame: DAffine3::IDENTITY,
            base_threshold: config.render.point_size_threshold,
            supersample_factor: config.render.supersample_factor.max(1),
            zoom_divisor: config.camera.zoom_divisor,
            drag_degrees_per_pixel: config.camera.drag_degrees_per_pixel,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take ownership of `tree`, derive the star frame from `frame_body` at
    /// J2000, then show the root at `time` from the startup viewpoint.
    pub fn add_bodies(&self, mut tree: BodyTree, frame_body: &str, time: f64) {
        tree.set_time(DAffine3::IDENTITY, 0.0);
        let reference = match tree.find(frame_body) {
            Some(index) => tree[index].frames().reference,
            None => {
                warn!("Frame body '{frame_body}' not in the tree, stars use the root frame");
                DAffine3::IDENTITY
            }
        };
        tree.set_time(DAffine3::IDENTITY, time);

        let mut state = self.lock();
        state.star_frame = eme2000_frame(&reference);
        state.tree = tree;
        state.selected = None;
        let Some(root) = state.tree.root() else {
            warn!("Empty body tree");
            return;
        };
        state.select(root);
        let center = state.tree[root].center();
        state.camera.set_position(START_POSITION);
        state.camera.set_up_vector(START_UP);
        state.camera.look_at(center);
        info!("Viewing {} bodies", state.tree.len());
    }

    pub fn star_frame(&self) -> DAffine3 {
        self.lock().star_frame
    }

    pub fn select_body(&self, index: BodyIndex) -> bool {
        self.lock().select(index)
    }

    /// Select the body called `name` and fly to it. Unknown names are ignored.
    pub fn go_to_object(&self, name: &str) -> bool {
        let mut state = self.lock();
        let Some(index) = state.tree.find(name) else {
            debug!("No body named '{name}'");
            return false;
        };
        state.select(index);
        state.camera.go_to_center();
        true
    }

    pub fn go_to_center(&self) {
        self.lock().camera.go_to_center();
    }

    pub fn selection(&self) -> Option<String> {
        let state = self.lock();
        let index = state.selected?;
        state.tree.get(index).map(|node| node.name().to_owned())
    }

    pub fn selected(&self) -> Option<BodyIndex> {
        self.lock().selected
    }

    /// Recompute the tree at `time` and carry the camera along with the
    /// selected body.
    pub fn animate(&self, time: f64) {
        let mut state = self.lock();
        let old = state.selected_node().map(|(center, _)| center);
        state.tree.set_time(DAffine3::IDENTITY, time);
        let (Some(old), Some((center, _))) = (old, state.selected_node()) else {
            return;
        };
        let position = state.camera.position() + (center - old);
        state.camera.set_position(position);
        state.camera.set_center(center);
    }

    /// Step camera transitions by `dt` seconds.
    pub fn advance_camera(&self, dt: f64) {
        let mut state = self.lock();
        if state.camera.is_animating() {
            state.camera.advance(dt);
        }
    }

    /// Step a twentieth of the camera's height above the selected body,
    /// backing away for a positive `delta` and closing in otherwise. Steps
    /// that would end inside the body are dropped.
    pub fn zoom(&self, delta: f64) {
        let mut state = self.lock();
        let Some((_, radius)) = state.selected_node() else {
            return;
        };
        let center = state.camera.center();
        let position = state.camera.position();
        let to_center = center - position;
        let mut translation = to_center - to_center.normalize_or_zero() * radius;
        if delta > 0.0 {
            translation /= state.zoom_divisor;
        } else {
            translation /= -state.zoom_divisor;
        }
        let new_position = position - translation;
        if (center - new_position).length() < radius {
            return;
        }
        state.camera.set_position(new_position);
    }

    /// Turn the camera by a screen-space drag of `(dx, dy)` pixels.
    pub fn drag(&self, dx: f32, dy: f32, mode: DragMode) {
        let tangent = DVec3::new(f64::from(dx), -f64::from(dy), 0.0);
        if tangent.length() == 0.0 {
            return;
        }
        let mut state = self.lock();
        let view_axis = tangent.cross(DVec3::Z);
        let axis = (state.camera.model_view().matrix3.inverse() * view_axis).normalize();
        let angle = (tangent.length() * state.drag_degrees_per_pixel).to_radians();
        let q = DQuat::from_axis_angle(axis, angle);
        match mode {
            DragMode::AroundCenter => state.camera.rotate_around_center(q),
            DragMode::InPlace => state.camera.rotate(q),
        }
    }

    /// Two-finger zoom: fingers moving together back away.
    pub fn pinch(&self, last: [Vec2; 2], current: [Vec2; 2]) {
        let manhattan = |v: Vec2| f64::from(v.x.abs() + v.y.abs());
        let delta = manhattan(last[0] - last[1]) - manhattan(current[0] - current[1]);
        if delta != 0.0 {
            self.zoom(delta);
        }
    }

    /// Queue a pick at viewport pixel `(x, y)`; a newer request replaces an
    /// older one that has not run yet.
    pub fn schedule_pick(&self, x: u32, y: u32) {
        self.lock().pending_pick = Some((x, y));
    }

    pub fn take_pick(&self) -> Option<(u32, u32)> {
        self.lock().pending_pick.take()
    }

    /// Select and fly to a picked body. A miss changes nothing.
    pub fn finish_pick(&self, hit: Option<BodyIndex>) {
        let Some(index) = hit else {
            debug!("Pick missed");
            return;
        };
        let mut state = self.lock();
        if state.select(index) {
            state.camera.go_to_center();
        }
    }

    pub fn antialiasing(&self) -> AntiAliasingMode {
        self.lock().frame.antialiasing
    }

    pub fn set_antialiasing(&self, mode: AntiAliasingMode) {
        self.lock().set_antialiasing(mode);
    }

    pub fn blur_passes(&self) -> u32 {
        self.lock().frame.blur_passes
    }

    pub fn set_blur_passes(&self, passes: u32) {
        self.lock().frame.blur_passes = passes;
    }

    pub fn show_axis(&self) -> bool {
        self.lock().frame.render.show_axis
    }

    pub fn set_show_axis(&self, show: bool) {
        self.lock().frame.render.show_axis = show;
    }

    pub fn show_orbits(&self) -> bool {
        self.lock().frame.render.show_orbits
    }

    pub fn set_show_orbits(&self, show: bool) {
        self.lock().frame.render.show_orbits = show;
    }

    pub fn frame_settings(&self) -> FrameSettings {
        self.lock().frame
    }

    /// Distance from the camera to the selected body's surface, in metres.
    pub fn distance_to_ground(&self) -> f64 {
        let state = self.lock();
        match state.selected_node() {
            Some((center, radius)) => {
                ((center - state.camera.position()).length() - radius) * 1000.0
            }
            None => 0.0,
        }
    }

    pub fn set_viewport(&self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.lock()
            .camera
            .set_aspect_ratio(f64::from(width) / f64::from(height));
    }

    pub fn with_camera<R>(&self, f: impl FnOnce(&mut Camera) -> R) -> R {
        f(&mut self.lock().camera)
    }

    /// Run `f` with the scene locked, e.g. to render or pick.
    pub fn with_scene<R>(
        &self,
        f: impl FnOnce(&mut BodyTree, &Camera, &FrameSettings) -> R,
    ) -> R {
        let mut guard = self.lock();
        let state = &mut *guard;
        f(&mut state.tree, &state.camera, &state.frame)
    }

    pub fn handle_key(&self, action: KeyAction, timeline: &mut Timeline) -> WindowRequest {
        match action {
            KeyAction::CycleAntialiasing => {
                let mut state = self.lock();
                let mode = state.frame.antialiasing.cycle();
                state.set_antialiasing(mode);
            }
            KeyAction::CycleAllAntialiasing => {
                let mut state = self.lock();
                let mode = state.frame.antialiasing.cycle_all();
                state.set_antialiasing(mode);
            }
            KeyAction::SpeedUp => timeline.speed_up(),
            KeyAction::SpeedDown => timeline.speed_down(),
            KeyAction::RealTime => timeline.real_time(),
            KeyAction::TogglePause => timeline.toggle_pause(),
            KeyAction::ToggleAxis => {
                let mut state = self.lock();
                state.frame.render.show_axis = !state.frame.render.show_axis;
            }
            KeyAction::ToggleOrbits => {
                let mut state = self.lock();
                state.frame.render.show_orbits = !state.frame.render.show_orbits;
            }
            KeyAction::ToggleFullscreen => return WindowRequest::ToggleFullscreen,
            KeyAction::Quit => return WindowRequest::Close,
        }
        WindowRequest::None
    }

    /// Dispatch one input intent.
    pub fn apply(&self, intent: Intent, timeline: &mut Timeline) -> WindowRequest {
        match intent {
            Intent::Drag { dx, dy, mode } => self.drag(dx, dy, mode),
            Intent::Zoom(delta) => self.zoom(delta),
            Intent::Pinch { last, current } => self.pinch(last, current),
            Intent::Pick { x, y } => {
                if x >= 0.0 && y >= 0.0 {
                    self.schedule_pick(x as u32, y as u32);
                }
            }
            Intent::GoToCenter => self.go_to_center(),
            Intent::Key(action) => return self.handle_key(action, timeline),
        }
        WindowRequest::None
    }
}
