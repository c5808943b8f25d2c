//! Run logging.
//!
//! Every run writes timestamped records to stdout and to its own log file,
//! `db_sync_YYYYmmdd_HHMMSS.log`, named after the moment the run started.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Log file name for a run started at `started`.
#[must_use]
pub fn log_file_name(started: DateTime<Local>) -> String {
    started.format("db_sync_%Y%m%d_%H%M%S.log").to_string()
}

/// Installs the global subscriber and returns the path of the run's log file.
pub fn init(log_dir: &Path, verbose: bool) -> io::Result<PathBuf> {
    let path = log_dir.join(log_file_name(Local::now()));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let level = if verbose { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(io::Error::other)?;

    Ok(path)
}
