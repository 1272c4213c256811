//! Configuration Storage
//!
//! This module handles the `config.toml` file: database location, default
//! request timeout, token limit and log level.

use crate::error::{ChatListError, Result};
use crate::llm::provider::DEFAULT_MAX_TOKENS;
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file name
const CONFIG_FILE: &str = "config.toml";

/// Default per-request timeout (in seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Persistent configuration data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database file; the platform data directory is used when unset
    pub database_path: Option<PathBuf>,
    /// Per-request timeout in seconds
    pub default_timeout_secs: u64,
    /// Maximum tokens requested from each provider
    pub max_tokens: u32,
    /// Console log filter used when `RUST_LOG` is not set
    pub log_level: String,
    /// Filter for the daily log file
    pub file_log_level: String,
    /// Directory of the daily log files; `<data dir>/chatlist/logs` when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            default_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_tokens: DEFAULT_MAX_TOKENS,
            log_level: "warn".to_string(),
            file_log_level: "debug".to_string(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the configuration directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| {
                ChatListError::Config("Could not find configuration directory".to_string())
            })?
            .join("chatlist");

        fs::create_dir_all(&config_dir)?;

        Ok(config_dir)
    }

    /// Get the configuration file path
    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    /// Load configuration from `path`, falling back to defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.default_timeout_secs == 0 {
            return Err(ChatListError::Config(
                "default_timeout_secs must be greater than 0 seconds".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(ChatListError::Config(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Database file to open
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Storage::default_path(),
        }
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let data_dir = dirs::data_dir().ok_or_else(|| {
                    ChatListError::Config("Could not determine the data directory".to_string())
                })?;
                Ok(data_dir.join("chatlist").join("logs"))
            }
        }
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}

/// Parse a timeout given in whole seconds
pub fn parse_timeout_seconds(name: &str, value: &str) -> Result<Duration> {
    let parsed = value.trim().parse::<u64>().map_err(|_| {
        ChatListError::Config(format!("{} must be a positive integer in seconds", name))
    })?;
    if parsed == 0 {
        return Err(ChatListError::Config(format!(
            "{} must be greater than 0 seconds",
            name
        )));
    }
    Ok(Duration::from_secs(parsed))
}

/// Parse a positive token limit
pub fn parse_max_tokens(name: &str, value: &str) -> Result<u32> {
    match value.trim().parse::<u32>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ChatListError::Config(format!(
            "{} must be a positive integer",
            name
        ))),
    }
}
