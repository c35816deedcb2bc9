//! Tracing subscriber setup for the viewer.
//!
//! Human-readable lines go to stderr. Debug builds also write JSON records to
//! `orrery.log` under the log directory. Filter precedence: `RUST_LOG`, the
//! config's `debug.log_level`, then [`DEFAULT_FILTER`]. Records emitted
//! through the `log` facade by the library crates are bridged in.

use std::fs::File;
use std::path::{Path, PathBuf};

use orrery_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// GPU backends are noisy below `warn`.
pub const DEFAULT_FILTER: &str = "info,wgpu=warn,naga=warn";

pub const LOG_FILE_NAME: &str = "orrery.log";

/// Install the global subscriber. Calling it twice leaves the first one in
/// place.
///
/// ```no_run
/// let config = orrery_config::Config::default();
/// orrery_log::init_logging(Some(std::path::Path::new("logs")), true, Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| configured_filter(config));

    let console = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_timer(fmt::time::uptime());

    let log_file = log_dir.filter(|_| debug_build).and_then(open_log_file);
    let file_path = log_file.as_ref().map(|(_, path)| path.clone());
    let json = log_file.map(|(file, _)| {
        fmt::layer()
            .json()
            .with_writer(file)
            .with_ansi(false)
            .with_timer(fmt::time::uptime())
    });

    if tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(json)
        .try_init()
        .is_err()
    {
        return;
    }
    if let Some(path) = file_path {
        tracing::info!("Writing JSON log to {}", path.display());
    }
}

/// Filter from the config's `debug.log_level`, or [`DEFAULT_FILTER`] when
/// that is empty or unparsable.
pub fn configured_filter(config: Option<&Config>) -> EnvFilter {
    let directive = config
        .map(|c| c.debug.log_level.trim())
        .filter(|level| !level.is_empty())
        .unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("Ignoring log level {directive:?}: {e}");
        default_env_filter()
    })
}

pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

fn open_log_file(dir: &Path) -> Option<(File, PathBuf)> {
    let path = dir.join(LOG_FILE_NAME);
    let opened = std::fs::create_dir_all(dir).and_then(|()| File::create(&path));
    match opened {
        Ok(file) => Some((file, path)),
        Err(e) => {
            eprintln!("Cannot open {}: {e}; logging to stderr only", path.display());
            None
        }
    }
}
