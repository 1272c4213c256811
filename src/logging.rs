//! Logging setup
//!
//! Two sinks: a daily file under the log directory that keeps everything at
//! `file_level`, and stderr, which only shows what `console_level` lets
//! through so dispatch chatter stays out of the result tables.

use crate::error::{ChatListError, Result};
use chrono::{Local, NaiveDate};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Log file for `date`, e.g. `chatlist_2024-05-01.log`
pub fn log_file_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("chatlist_{}.log", date.format("%Y-%m-%d")))
}

/// Open today's log file for appending, creating `dir` if needed
pub fn open_log_file(dir: &Path) -> Result<(File, PathBuf)> {
    fs::create_dir_all(dir)?;
    let path = log_file_path(dir, Local::now().date_naive());
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

fn filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level)
        .map_err(|e| ChatListError::Config(format!("invalid log level '{}': {}", level, e)))
}

/// Install the global subscriber and return the log file in use
///
/// `RUST_LOG` takes precedence over `console_level` for stderr; the file
/// always uses `file_level`.
pub fn init(console_level: &str, file_level: &str, log_dir: &Path) -> Result<PathBuf> {
    let console_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => filter(console_level)?,
    };
    let file_filter = filter(file_level)?;
    let (file, path) = open_log_file(log_dir)?;

    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(console_filter);
    let file = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| ChatListError::Config(format!("failed to initialize logging: {}", e)))?;

    Ok(path)
}
