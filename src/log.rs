//! Logging setup: `tracing` events to stderr or a date-stamped log file.

use chrono::{Local, NaiveDate};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
/// Returns the log file path when logging to a file.
pub fn init(config: &LogConfig) -> Option<PathBuf> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let opened = config.directory.as_deref().and_then(open_log_file);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let (installed, path) = match opened {
        Some((path, file)) => (
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init(),
            Some(path),
        ),
        None => (builder.with_writer(std::io::stderr).try_init(), None),
    };

    if let Err(e) = installed {
        eprintln!("Warning: Failed to install log subscriber: {}", e);
        return None;
    }
    path
}

/// Open today's log file in `log_dir`, creating the directory if needed.
/// Relative paths are resolved against the current working directory.
fn open_log_file(log_dir: &str) -> Option<(PathBuf, File)> {
    let log_path = PathBuf::from(log_dir);
    let log_path = if log_path.is_absolute() {
        log_path
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&log_path))
            .unwrap_or(log_path)
    };

    if let Err(e) = fs::create_dir_all(&log_path) {
        eprintln!(
            "Warning: Failed to create log directory '{}': {}",
            log_path.display(),
            e
        );
        return None;
    }

    let path = log_file_path(&log_path, Local::now().date_naive());
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => Some((path, file)),
        Err(e) => {
            eprintln!(
                "Warning: Failed to open log file '{}': {}",
                path.display(),
                e
            );
            None
        }
    }
}

fn log_file_path(log_dir: &Path, date: NaiveDate) -> PathBuf {
    let filename = format!("{}-{}.log", env!("CARGO_PKG_NAME"), date.format("%Y%m%d"));
    log_dir.join(filename)
}
