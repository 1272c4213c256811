//! Configuration module
//!
//! This module handles configuration management and the application state
//! shared by the REPL and command handlers.

pub mod storage;

use crate::cli::session::ResultSession;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::llm::keys::ApiKeySource;
use crate::storage::settings::{MAX_TOKENS, REQUEST_TIMEOUT};
use crate::storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub use storage::{parse_max_tokens, parse_timeout_seconds, Config};

/// Application state
pub struct AppState {
    /// Settings loaded from `config.toml`
    pub config: Config,
    /// Prompt, model, result and settings database
    pub storage: Storage,
    /// Fan-out engine
    pub dispatcher: Dispatcher,
    /// Latest dispatch outcome and selection
    pub session: ResultSession,
    /// Timeout applied to each provider request
    timeout: Duration,
}

impl AppState {
    /// Open the configured database and build the HTTP dispatcher
    pub async fn open(config: Config) -> Result<Self> {
        let storage = Storage::open(&config.database_path()?).await?;
        let dispatcher = Dispatcher::with_http_client()?;
        Self::with_parts(config, storage, dispatcher).await
    }

    /// Assemble the state, applying settings stored in the database over the config file
    pub async fn with_parts(config: Config, storage: Storage, dispatcher: Dispatcher) -> Result<Self> {
        let mut timeout = config.default_timeout();
        let mut dispatcher = dispatcher.with_max_tokens(config.max_tokens);

        if let Some(value) = storage.get_setting(REQUEST_TIMEOUT).await? {
            match parse_timeout_seconds(REQUEST_TIMEOUT, &value) {
                Ok(stored) => timeout = stored,
                Err(error) => warn!(%error, "ignoring stored setting"),
            }
        }
        if let Some(value) = storage.get_setting(MAX_TOKENS).await? {
            match parse_max_tokens(MAX_TOKENS, &value) {
                Ok(stored) => dispatcher.set_max_tokens(stored),
                Err(error) => warn!(%error, "ignoring stored setting"),
            }
        }

        Ok(Self {
            config,
            storage,
            dispatcher,
            session: ResultSession::new(),
            timeout,
        })
    }

    /// Key source used for dispatch, also consulted when showing models
    pub fn keys(&self) -> &dyn ApiKeySource {
        self.dispatcher.key_source()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Change the request timeout and persist it
    pub async fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.storage
            .set_setting(REQUEST_TIMEOUT, &timeout.as_secs().to_string())
            .await?;
        self.timeout = timeout;
        info!(secs = timeout.as_secs(), "request timeout updated");
        Ok(())
    }

    pub fn max_tokens(&self) -> u32 {
        self.dispatcher.max_tokens()
    }

    /// Change the token limit and persist it
    pub async fn set_max_tokens(&mut self, max_tokens: u32) -> Result<()> {
        self.storage
            .set_setting(MAX_TOKENS, &max_tokens.to_string())
            .await?;
        self.dispatcher.set_max_tokens(max_tokens);
        info!(max_tokens, "max tokens updated");
        Ok(())
    }
}

/// Shared application state
pub type SharedState = Arc<RwLock<AppState>>;

/// Wrap the state for sharing between the REPL and command handlers
pub fn create_shared_state(state: AppState) -> SharedState {
    Arc::new(RwLock::new(state))
}
