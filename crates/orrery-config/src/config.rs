//! Settings sections, their defaults and `config.ron` persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const APP_NAME: &str = "orrery";

/// Top-level viewer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Rendering settings.
    pub render: RenderConfig,
    /// Camera and navigation settings.
    pub camera: CameraConfig,
    /// Simulation clock settings.
    pub timeline: TimelineConfig,
    /// Body catalog settings.
    pub scene: SceneConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Start in fullscreen mode.
    pub fullscreen: bool,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    /// Window title.
    pub title: String,
}

/// Scene antialiasing strategy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum AntiAliasingMode {
    /// Render straight into the viewport-sized target.
    #[default]
    None,
    /// Multisampled target resolved into the viewport-sized target.
    Msaa,
    /// Render at a multiple of the viewport size and filter down.
    Ssaa,
    /// Viewport-sized render followed by an edge-detecting post filter.
    Fxaa,
}

impl AntiAliasingMode {
    /// Cycle order bound to the `M` key: None, Msaa, Ssaa, then back to None.
    pub fn cycle(self) -> Self {
        match self {
            Self::None => Self::Msaa,
            Self::Msaa => Self::Ssaa,
            Self::Ssaa | Self::Fxaa => Self::None,
        }
    }

    /// Cycle through every mode including FXAA.
    pub fn cycle_all(self) -> Self {
        match self {
            Self::None => Self::Msaa,
            Self::Msaa => Self::Ssaa,
            Self::Ssaa => Self::Fxaa,
            Self::Fxaa => Self::None,
        }
    }

    /// Screen-space size multiplier: 2 under supersampling, 1 otherwise.
    pub fn size_coefficient(self, supersample_factor: u32) -> f32 {
        match self {
            Self::Ssaa => supersample_factor as f32,
            _ => 1.0,
        }
    }
}

/// Rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Antialiasing mode at startup.
    pub antialiasing: AntiAliasingMode,
    /// Number of horizontal+vertical blur passes for bloom (0 disables bloom).
    pub blur_passes: u32,
    /// On-screen radius in pixels below which a body is drawn as a point.
    pub point_size_threshold: f32,
    /// Draw body axes.
    pub show_axis: bool,
    /// Draw orbit trails.
    pub show_orbits: bool,
    /// MSAA sample count.
    pub msaa_samples: u32,
    /// SSAA scale factor.
    pub supersample_factor: u32,
    /// Bloom light map is rendered at viewport / this factor.
    pub bloom_downscale: u32,
    /// Number of time samples in each orbit trail.
    pub trail_samples: usize,
    /// Number of background stars.
    pub star_count: u32,
    /// Seed for the background starfield.
    pub star_seed: u64,
}

/// Camera and navigation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_degrees: f64,
    /// Near-plane coefficient (k1).
    pub near_coefficient: f64,
    /// Clipping coefficient (k2).
    pub clipping_coefficient: f64,
    /// Duration of the go-to-center orientation phase.
    pub go_to_orientation_ms: u64,
    /// Duration of the go-to-center position phase.
    pub go_to_position_ms: u64,
    /// Duration of a move-to animation.
    pub move_to_ms: u64,
    /// Fraction of the remaining distance covered by one zoom step (1/divisor).
    pub zoom_divisor: f64,
    /// Drag rotation in degrees per pixel.
    pub drag_degrees_per_pixel: f64,
}

/// Simulation clock configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineConfig {
    /// Fixed tick interval in milliseconds.
    pub tick_ms: u32,
    /// Initial time rate multiplier.
    pub start_rate: f64,
}

/// Body catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Path to the RON body catalog.
    pub catalog: PathBuf,
    /// Name of the root body.
    pub root: String,
    /// Body whose J2000 frame orients the background stars.
    pub frame_body: String,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fullscreen: false,
            vsync: true,
            title: "Orrery".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            antialiasing: AntiAliasingMode::None,
            blur_passes: 4,
            point_size_threshold: 10.0,
            show_axis: false,
            show_orbits: true,
            msaa_samples: 4,
            supersample_factor: 2,
            bloom_downscale: 4,
            trail_samples: 360,
            star_count: 9000,
            star_seed: 2000,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near_coefficient: 1.0e-8,
            clipping_coefficient: 1.0e6,
            go_to_orientation_ms: 1000,
            go_to_position_ms: 2000,
            move_to_ms: 500,
            zoom_divisor: 20.0,
            drag_degrees_per_pixel: 0.1,
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            start_rate: 1.0,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("assets/bodies.ron"),
            root: "sun".to_string(),
            frame_body: "earth".to_string(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Platform configuration directory for the viewer.
pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

const CONFIG_FILE: &str = "config.ron";

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    ron::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_owned(),
        source,
    })
}

impl Config {
    /// Read `config.ron` from `config_dir`, writing the defaults there first
    /// when the file does not exist yet.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if !path.exists() {
            let defaults = Self::default();
            defaults.save(config_dir)?;
            log::info!("Wrote default settings to {}", path.display());
            return Ok(defaults);
        }
        let config = read_config(&path)?;
        log::info!("Settings read from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        let write_error = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(config_dir).map_err(write_error)?;

        let style = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let text = ron::ser::to_string_pretty(self, style)?;
        std::fs::write(&path, text).map_err(write_error)
    }

    /// Re-read the file; `None` when it still matches `self`.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let fresh = read_config(&config_dir.join(CONFIG_FILE))?;
        if fresh == *self {
            return Ok(None);
        }
        log::info!("Settings changed on disk");
        Ok(Some(fresh))
    }
}
