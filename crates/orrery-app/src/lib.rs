//! Orrery application: the winit window and frame loop, the simulation clock,
//! input handling and the navigation/selection layer over the scene.

pub mod input;
pub mod startup;
pub mod timeline;
pub mod viewer;
pub mod window;

pub use input::{DragMode, Intent, KeyAction, PointerState};
pub use startup::{AppDirs, StartupError, load_config, load_scene};
pub use timeline::{J2000, Timeline};
pub use viewer::{Viewer, WindowRequest};
pub use window::{AppState, run};
