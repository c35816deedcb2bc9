//! Viewer settings: window, antialiasing and bloom, camera timings, clock
//! and body catalog. Stored as `config.ron`; command-line flags win over the
//! file. Unknown or missing fields fall back to defaults.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    AntiAliasingMode, CameraConfig, Config, DebugConfig, RenderConfig, SceneConfig,
    TimelineConfig, WindowConfig, default_config_dir,
};
pub use error::ConfigError;
