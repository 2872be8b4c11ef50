//! Log setup. The terminal belongs to the TUI, so everything goes to a file.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// `RUST_LOG` wins over the configured level; an unparsable level means `info`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber. Returns false (and logs nothing) when no
/// log file can be opened.
pub fn init(settings: &Settings) -> bool {
    let Some(path) = settings.log_path() else {
        return false;
    };
    let Ok(file) = open_log_file(&path) else {
        return false;
    };

    let installed = tracing_subscriber::fmt()
        .with_env_filter(build_filter(&settings.log.level))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .is_ok();
    if installed {
        tracing::info!(path = %path.display(), "logging started");
    }
    installed
}
