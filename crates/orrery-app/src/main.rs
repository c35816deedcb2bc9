//! The orrery binary.

use clap::Parser;
use orrery_app::{AppDirs, load_config, load_scene, run};
use orrery_config::CliArgs;
use tracing::{error, info};

fn main() {
    let args = CliArgs::parse();

    let config = match AppDirs::resolve(args.config.as_deref())
        .and_then(|dirs| Ok((load_config(&dirs, &args)?, dirs)))
    {
        Ok((config, dirs)) => {
            orrery_log::init_logging(
                Some(&dirs.log_dir),
                cfg!(debug_assertions),
                Some(&config),
            );
            info!("Config directory: {}", dirs.config_dir.display());
            config
        }
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let (tree, texture_root) = match load_scene(&config) {
        Ok(scene) => scene,
        Err(e) => {
            error!("Failed to load scene: {e}");
            std::process::exit(1);
        }
    };

    run(config, tree, texture_root);
}
