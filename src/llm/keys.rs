//! API key lookup
//!
//! Provider configurations only name the variable holding their key. The
//! dispatcher resolves it through an `ApiKeySource` once per dispatch, which
//! keeps the process environment out of the engine and lets tests inject keys.

use crate::error::ConfigError;
use std::collections::HashMap;

/// Read-only source of API keys, shared by all branches of a dispatch
pub trait ApiKeySource: Send + Sync {
    /// Look up the key stored under `name`; `Ok(None)` when it is not set
    fn lookup(&self, name: &str) -> Result<Option<String>, ConfigError>;
}

/// Reads keys from the process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvKeySource;

impl ApiKeySource for EnvKeySource {
    fn lookup(&self, name: &str) -> Result<Option<String>, ConfigError> {
        match std::env::var(name) {
            Ok(value) if value.trim().is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(error) => Err(ConfigError::UnreadableApiKey {
                env_var: name.to_string(),
                reason: error.to_string(),
            }),
        }
    }
}

/// Fixed in-memory set of keys
#[derive(Debug, Clone, Default)]
pub struct StaticKeySource {
    keys: HashMap<String, String>,
}

impl StaticKeySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key under the given variable name
    pub fn with_key(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.keys.insert(name.into(), value.into());
        self
    }
}

impl ApiKeySource for StaticKeySource {
    fn lookup(&self, name: &str) -> Result<Option<String>, ConfigError> {
        Ok(self
            .keys
            .get(name)
            .filter(|value| !value.trim().is_empty())
            .cloned())
    }
}
