//! Turns raw winit pointer, touch and key events into navigation intents.
//!
//! [`PointerState`] remembers just enough between events (cursor position,
//! held buttons, the previous click, active touch points) to report drags,
//! double-clicks, wheel steps and two-finger pinches.

use std::time::{Duration, Instant};

use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase};
use winit::keyboard::{Key, NamedKey};

/// Longest gap between two presses that still counts as a double-click.
pub const DOUBLE_CLICK_TIME: Duration = Duration::from_millis(400);

/// Farthest the cursor may travel between the two presses of a double-click.
pub const DOUBLE_CLICK_DISTANCE: f32 = 4.0;

/// Zoom delta of one wheel notch.
pub const WHEEL_STEP: f64 = 120.0;

/// How a drag turns the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    /// Orbit the camera about the scene center.
    AroundCenter,
    /// Turn the camera where it stands.
    InPlace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    CycleAntialiasing,
    CycleAllAntialiasing,
    SpeedUp,
    SpeedDown,
    RealTime,
    TogglePause,
    ToggleAxis,
    ToggleOrbits,
    ToggleFullscreen,
    Quit,
}

impl KeyAction {
    /// Binding for a logical key, if any.
    pub fn from_key(key: &Key) -> Option<Self> {
        match key {
            Key::Named(NamedKey::Escape) => Some(Self::Quit),
            Key::Character(c) => match c.to_lowercase().as_str() {
                "m" => Some(Self::CycleAntialiasing),
                "x" => Some(Self::CycleAllAntialiasing),
                "+" => Some(Self::SpeedUp),
                "-" => Some(Self::SpeedDown),
                "r" => Some(Self::RealTime),
                "p" => Some(Self::TogglePause),
                "a" => Some(Self::ToggleAxis),
                "o" => Some(Self::ToggleOrbits),
                "f" => Some(Self::ToggleFullscreen),
                _ => None,
            },
            _ => None,
        }
    }
}

/// One navigation request derived from input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    Drag { dx: f32, dy: f32, mode: DragMode },
    Zoom(f64),
    Pinch { last: [Vec2; 2], current: [Vec2; 2] },
    Pick { x: f32, y: f32 },
    GoToCenter,
    Key(KeyAction),
}

/// Key presses map to actions; releases and auto-repeat are ignored.
pub fn key_intent(key: &Key, state: ElementState, repeat: bool) -> Option<Intent> {
    if repeat || state != ElementState::Pressed {
        return None;
    }
    KeyAction::from_key(key).map(Intent::Key)
}

#[derive(Debug, Clone, Copy)]
struct Click {
    button: MouseButton,
    at: Instant,
    position: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct TouchPoint {
    id: u64,
    position: Vec2,
}

#[derive(Debug, Clone, Default)]
pub struct PointerState {
    position: Vec2,
    left: bool,
    right: bool,
    middle: bool,
    last_click: Option<Click>,
    touches: [Option<TouchPoint>; 2],
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor position in physical pixels.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        match button {
            MouseButton::Left => self.left,
            MouseButton::Right => self.right,
            MouseButton::Middle => self.middle,
            _ => false,
        }
    }

    /// A move with exactly the left or exactly the right button held is a drag.
    pub fn on_cursor_moved(&mut self, x: f64, y: f64) -> Option<Intent> {
        let new_pos = Vec2::new(x as f32, y as f32);
        let delta = new_pos - self.position;
        self.position = new_pos;
        if delta == Vec2::ZERO {
            return None;
        }
        let mode = match (self.left, self.right, self.middle) {
            (true, false, false) => DragMode::AroundCenter,
            (false, true, false) => DragMode::InPlace,
            _ => return None,
        };
        Some(Intent::Drag {
            dx: delta.x,
            dy: delta.y,
            mode,
        })
    }

    /// Track the button and report double-clicks: left picks, middle recenters.
    pub fn on_button(
        &mut self,
        button: MouseButton,
        state: ElementState,
        now: Instant,
    ) -> Option<Intent> {
        let pressed = state == ElementState::Pressed;
        match button {
            MouseButton::Left => self.left = pressed,
            MouseButton::Right => self.right = pressed,
            MouseButton::Middle => self.middle = pressed,
            _ => return None,
        }
        if !pressed {
            return None;
        }

        let is_double = self.last_click.is_some_and(|click| {
            click.button == button
                && now.saturating_duration_since(click.at) <= DOUBLE_CLICK_TIME
                && click.position.distance(self.position) <= DOUBLE_CLICK_DISTANCE
        });
        if !is_double {
            self.last_click = Some(Click {
                button,
                at: now,
                position: self.position,
            });
            return None;
        }

        self.last_click = None;
        match button {
            MouseButton::Left => Some(Intent::Pick {
                x: self.position.x,
                y: self.position.y,
            }),
            MouseButton::Middle => Some(Intent::GoToCenter),
            _ => None,
        }
    }

    /// One zoom step per wheel event, signed by the scroll direction.
    pub fn on_scroll(&mut self, delta: MouseScrollDelta) -> Option<Intent> {
        let lines = match delta {
            MouseScrollDelta::LineDelta(_x, y) => y,
            // ~40 pixels per line
            MouseScrollDelta::PixelDelta(pos) => (pos.y / 40.0) as f32,
        };
        if lines == 0.0 {
            return None;
        }
        Some(Intent::Zoom(if lines > 0.0 { WHEEL_STEP } else { -WHEEL_STEP }))
    }

    /// Two fingers pinch, one finger drags around the center.
    pub fn on_touch(&mut self, id: u64, x: f64, y: f64, phase: TouchPhase) -> Option<Intent> {
        let position = Vec2::new(x as f32, y as f32);
        match phase {
            TouchPhase::Started => {
                if let Some(slot) = self.touches.iter_mut().find(|t| t.is_none()) {
                    *slot = Some(TouchPoint { id, position });
                }
                None
            }
            TouchPhase::Moved => {
                let last = self.touches;
                let slot = self.touches.iter_mut().flatten().find(|t| t.id == id)?;
                let previous = slot.position;
                slot.position = position;
                match (last, self.touches) {
                    ([Some(a0), Some(b0)], [Some(a1), Some(b1)]) => Some(Intent::Pinch {
                        last: [a0.position, b0.position],
                        current: [a1.position, b1.position],
                    }),
                    _ => {
                        let delta = position - previous;
                        (delta != Vec2::ZERO).then_some(Intent::Drag {
                            dx: delta.x,
                            dy: delta.y,
                            mode: DragMode::AroundCenter,
                        })
                    }
                }
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                for slot in &mut self.touches {
                    if slot.is_some_and(|t| t.id == id) {
                        *slot = None;
                    }
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    fn press(ps: &mut PointerState, button: MouseButton, at: Instant) -> Option<Intent> {
        let intent = ps.on_button(button, ElementState::Pressed, at);
        ps.on_button(button, ElementState::Released, at);
        intent
    }

    #[test]
    fn test_left_drag_orbits_right_drag_turns() {
        let mut ps = PointerState::new();
        ps.on_cursor_moved(100.0, 100.0);
        assert_eq!(ps.on_cursor_moved(110.0, 100.0), None);

        ps.on_button(MouseButton::Left, ElementState::Pressed, Instant::now());
        assert_eq!(
            ps.on_cursor_moved(120.0, 95.0),
            Some(Intent::Drag {
                dx: 10.0,
                dy: -5.0,
                mode: DragMode::AroundCenter
            })
        );
        ps.on_button(MouseButton::Left, ElementState::Released, Instant::now());

        ps.on_button(MouseButton::Right, ElementState::Pressed, Instant::now());
        assert!(matches!(
            ps.on_cursor_moved(121.0, 95.0),
            Some(Intent::Drag {
                mode: DragMode::InPlace,
                ..
            })
        ));
    }

    #[test]
    fn test_zero_length_move_is_ignored() {
        let mut ps = PointerState::new();
        ps.on_cursor_moved(5.0, 5.0);
        ps.on_button(MouseButton::Left, ElementState::Pressed, Instant::now());
        assert_eq!(ps.on_cursor_moved(5.0, 5.0), None);
    }

    #[test]
    fn test_both_buttons_held_is_not_a_drag() {
        let mut ps = PointerState::new();
        ps.on_button(MouseButton::Left, ElementState::Pressed, Instant::now());
        ps.on_button(MouseButton::Right, ElementState::Pressed, Instant::now());
        assert_eq!(ps.on_cursor_moved(3.0, 3.0), None);
    }

    #[test]
    fn test_left_double_click_picks() {
        let mut ps = PointerState::new();
        ps.on_cursor_moved(40.0, 30.0);
        let t0 = Instant::now();
        assert_eq!(press(&mut ps, MouseButton::Left, t0), None);
        assert_eq!(
            press(&mut ps, MouseButton::Left, t0 + Duration::from_millis(150)),
            Some(Intent::Pick { x: 40.0, y: 30.0 })
        );
        // A third click starts a new pair.
        assert_eq!(press(&mut ps, MouseButton::Left, t0 + Duration::from_millis(200)), None);
    }

    #[test]
    fn test_slow_or_distant_clicks_are_single() {
        let mut ps = PointerState::new();
        let t0 = Instant::now();
        press(&mut ps, MouseButton::Left, t0);
        assert_eq!(press(&mut ps, MouseButton::Left, t0 + Duration::from_secs(1)), None);

        let t1 = t0 + Duration::from_secs(5);
        press(&mut ps, MouseButton::Left, t1);
        ps.on_cursor_moved(50.0, 50.0);
        assert_eq!(press(&mut ps, MouseButton::Left, t1 + Duration::from_millis(50)), None);
    }

    #[test]
    fn test_middle_double_click_recenters() {
        let mut ps = PointerState::new();
        let t0 = Instant::now();
        press(&mut ps, MouseButton::Middle, t0);
        assert_eq!(
            press(&mut ps, MouseButton::Middle, t0 + Duration::from_millis(100)),
            Some(Intent::GoToCenter)
        );
    }

    #[test]
    fn test_mixed_buttons_do_not_double_click() {
        let mut ps = PointerState::new();
        let t0 = Instant::now();
        press(&mut ps, MouseButton::Left, t0);
        assert_eq!(press(&mut ps, MouseButton::Middle, t0 + Duration::from_millis(50)), None);
    }

    #[test]
    fn test_wheel_steps() {
        let mut ps = PointerState::new();
        assert_eq!(
            ps.on_scroll(MouseScrollDelta::LineDelta(0.0, 1.0)),
            Some(Intent::Zoom(WHEEL_STEP))
        );
        assert_eq!(
            ps.on_scroll(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -80.0))),
            Some(Intent::Zoom(-WHEEL_STEP))
        );
        assert_eq!(ps.on_scroll(MouseScrollDelta::LineDelta(2.0, 0.0)), None);
    }

    #[test]
    fn test_two_finger_pinch() {
        let mut ps = PointerState::new();
        ps.on_touch(1, 0.0, 0.0, TouchPhase::Started);
        ps.on_touch(2, 100.0, 0.0, TouchPhase::Started);
        assert_eq!(
            ps.on_touch(2, 80.0, 0.0, TouchPhase::Moved),
            Some(Intent::Pinch {
                last: [Vec2::ZERO, Vec2::new(100.0, 0.0)],
                current: [Vec2::ZERO, Vec2::new(80.0, 0.0)],
            })
        );

        ps.on_touch(2, 80.0, 0.0, TouchPhase::Ended);
        assert_eq!(
            ps.on_touch(1, 3.0, 4.0, TouchPhase::Moved),
            Some(Intent::Drag {
                dx: 3.0,
                dy: 4.0,
                mode: DragMode::AroundCenter
            })
        );
    }

    #[test]
    fn test_unknown_touch_is_ignored() {
        let mut ps = PointerState::new();
        assert_eq!(ps.on_touch(9, 1.0, 1.0, TouchPhase::Moved), None);
    }

    #[test]
    fn test_key_bindings() {
        let key = |s: &str| Key::Character(s.into());
        assert_eq!(
            key_intent(&key("m"), ElementState::Pressed, false),
            Some(Intent::Key(KeyAction::CycleAntialiasing))
        );
        assert_eq!(
            key_intent(&key("M"), ElementState::Pressed, false),
            Some(Intent::Key(KeyAction::CycleAntialiasing))
        );
        assert_eq!(
            key_intent(&key("+"), ElementState::Pressed, false),
            Some(Intent::Key(KeyAction::SpeedUp))
        );
        assert_eq!(
            key_intent(
                &Key::Named(NamedKey::Escape),
                ElementState::Pressed,
                false
            ),
            Some(Intent::Key(KeyAction::Quit))
        );
        assert_eq!(key_intent(&key("m"), ElementState::Released, false), None);
        assert_eq!(key_intent(&key("m"), ElementState::Pressed, true), None);
        assert_eq!(key_intent(&key("z"), ElementState::Pressed, false), None);
    }
}
