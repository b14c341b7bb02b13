//! Log file setup
//!
//! All diagnostics go to `{BACKUP_HOME}/deptools.log`, appended across runs
//! with one timestamped line per event. The subscriber is built and
//! installed by `main` once settings are resolved.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "deptools.log";

/// Log filter directive
///
/// `LOG_LEVEL`, then `RUST_LOG`, then `debug` when verbose, else `info`.
pub fn log_filter<F>(verbose: bool, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("LOG_LEVEL")
        .or_else(|| lookup("RUST_LOG"))
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| {
            if verbose {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        })
}

pub fn log_path(backup_home: &Path) -> PathBuf {
    backup_home.join(LOG_FILE_NAME)
}

/// Open the log file for appending and install the global subscriber
pub fn init(backup_home: &Path, filter: &str) -> Result<PathBuf> {
    let path = log_path(backup_home);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let env_filter = EnvFilter::try_new(filter)
        .with_context(|| format!("Invalid log filter: {}", filter))?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")?;

    Ok(path)
}
