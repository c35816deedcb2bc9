//! Command-line flags.

use std::path::PathBuf;

use clap::Parser;

use crate::{AntiAliasingMode, Config};

/// Flags left unset keep the value from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "orrery", about = "Interactive solar system viewer")]
pub struct CliArgs {
    /// Window width in logical pixels.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height in logical pixels.
    #[arg(long)]
    pub height: Option<u32>,

    /// Open borderless fullscreen.
    #[arg(long)]
    pub fullscreen: Option<bool>,

    /// Antialiasing at startup; `M` cycles it at runtime.
    #[arg(long, value_enum)]
    pub antialiasing: Option<AntiAliasingMode>,

    /// Bloom blur passes (0 disables bloom).
    #[arg(long)]
    pub blur_passes: Option<u32>,

    /// RON catalog of bodies; textures resolve next to it.
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Filter directive, e.g. `debug` or `orrery_render=trace`.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Directory holding `config.ron`, instead of the platform default.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Overwrite every setting the user passed on the command line.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }

        set(&mut self.window.width, &args.width);
        set(&mut self.window.height, &args.height);
        set(&mut self.window.fullscreen, &args.fullscreen);
        set(&mut self.render.antialiasing, &args.antialiasing);
        set(&mut self.render.blur_passes, &args.blur_passes);
        set(&mut self.scene.catalog, &args.catalog);
        set(&mut self.debug.log_level, &args.log_level);
    }
}
