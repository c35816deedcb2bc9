//! Everything resolved before the window opens: directories, configuration
//! and the body tree.

use std::path::{Path, PathBuf};

use orrery_config::{CliArgs, Config, ConfigError, default_config_dir};
use orrery_scene::{BodyCatalog, BodyTree, SceneError};

const APP_NAME: &str = "orrery";

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Where configuration and logs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDirs {
    pub config_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppDirs {
    /// Platform directories, or `config_override` for the configuration.
    pub fn resolve(config_override: Option<&Path>) -> Result<Self, StartupError> {
        let config_dir = match config_override {
            Some(dir) => dir.to_path_buf(),
            None => default_config_dir()?,
        };
        let log_dir = dirs::cache_dir()
            .map(|base| base.join(APP_NAME).join("logs"))
            .unwrap_or_else(|| config_dir.join("logs"));
        Ok(Self {
            config_dir,
            log_dir,
        })
    }

    /// Directories rooted under `root`, for tests.
    pub fn resolve_with_root(root: &Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            config_dir: app_dir.join("config"),
            log_dir: app_dir.join("logs"),
        }
    }
}

/// Load (or create) `config.ron` and apply command-line overrides.
pub fn load_config(dirs: &AppDirs, args: &CliArgs) -> Result<Config, StartupError> {
    let mut config = Config::load_or_create(&dirs.config_dir)?;
    config.apply_cli_overrides(args);
    Ok(config)
}

/// Read the catalog and build the tree from the configured root. Also
/// returns the directory textures are resolved against, the catalog's own.
pub fn load_scene(config: &Config) -> Result<(BodyTree, PathBuf), StartupError> {
    let catalog = BodyCatalog::load(&config.scene.catalog)?;
    let tree = BodyTree::build_with_samples(
        &catalog,
        &config.scene.root,
        config.render.trail_samples,
    )?;
    let texture_root = config
        .scene
        .catalog
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok((tree, texture_root))
}
