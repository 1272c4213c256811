//! Error types for ChatList
//!
//! `ChatListError` covers everything that can fail at the application level
//! (storage, configuration, CLI parsing, caller-contract violations of
//! `dispatch()`). The remaining enums describe failures of a single provider
//! branch; they are carried as data inside a `DispatchResult` and never cross
//! the dispatch boundary as errors.

use serde::Serialize;
use thiserror::Error;

/// Result type alias for ChatList
pub type Result<T> = std::result::Result<T, ChatListError>;

/// Main error type for ChatList
#[derive(Error, Debug)]
pub enum ChatListError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO-related errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP-related errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file could not be parsed
    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Config file could not be written
    #[error("Failed to serialize config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// A provider configuration was rejected outside of a dispatch
    #[error("Provider configuration error: {0}")]
    Provider(#[from] ConfigError),

    /// `dispatch()` was called with a blank prompt
    #[error("Prompt text must not be empty")]
    EmptyPrompt,

    /// `dispatch()` was called without any provider
    #[error("At least one provider is required to dispatch a prompt")]
    NoProviders,

    /// Invalid user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown `/` command
    #[error("Unknown command: {0}. Type /help for available commands")]
    UnknownCommand(String),

    /// Known command with missing or malformed arguments
    #[error("Invalid syntax for {command}. Usage: {expected}")]
    InvalidCommandSyntax { command: String, expected: String },

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Bad or missing provider configuration, detected before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConfigError {
    #[error("prompt text must not be empty")]
    EmptyPrompt,

    #[error("provider '{provider}' is not active")]
    Inactive { provider: String },

    #[error("provider '{provider}' has no endpoint URL")]
    MissingEndpoint { provider: String },

    #[error("provider '{provider}' has no model identifier")]
    MissingModel { provider: String },

    #[error("API key variable {env_var} for provider '{provider}' is not set")]
    MissingApiKey { provider: String, env_var: String },

    #[error("API key variable {env_var} could not be read: {reason}")]
    UnreadableApiKey { env_var: String, reason: String },

    #[error("provider '{provider}' uses kind '{kind}' which has no registered handler")]
    UnsupportedProviderKind { provider: String, kind: String },

    #[error("unknown provider kind '{0}' (expected openai-compatible, anthropic or custom)")]
    UnknownProviderKind(String),
}

/// Failure while talking to a provider endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransportError {
    /// The per-call deadline elapsed before a response arrived
    #[error("request timed out")]
    Timeout,

    /// The endpoint answered with a non-2xx status
    #[error("HTTP {code}: {body}")]
    HttpStatus { code: u16, body: String },

    /// DNS, connection, TLS or body-read failure
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be assembled (e.g. an API key that is not a valid header value)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// A 2xx response whose body did not have the expected shape.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NormalizeError {
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response is missing `{path}`")]
    UnexpectedShape { path: String },
}

/// Terminal failure of one provider branch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BranchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    /// The caller cancelled the dispatch while this branch was running
    #[error("cancelled")]
    Cancelled,

    /// The branch task died without reporting (panic or runtime shutdown)
    #[error("aborted: {0}")]
    Aborted(String),
}

impl BranchError {
    /// Whether this failure is a deadline expiry rather than an error
    pub fn is_timeout(&self) -> bool {
        matches!(self, BranchError::Transport(TransportError::Timeout))
    }
}
