//! Provider data model
//!
//! This module defines the provider configuration consumed by the dispatch
//! engine and the canonical result types it produces. Every provider-specific
//! payload is mapped into a `DispatchResult`, and one dispatch yields one
//! `AggregatedOutcome`.

use crate::error::{BranchError, ChatListError, ConfigError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default maximum number of tokens requested from a provider
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Wire protocol family of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Chat-completions API (OpenAI, DeepSeek, Groq, OpenRouter, ...)
    #[serde(rename = "openai-compatible")]
    OpenAiCompatible,
    /// Anthropic messages API
    Anthropic,
    /// Anything else; requires a registered custom handler
    Custom,
}

impl ProviderKind {
    /// Canonical name, as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAiCompatible => "openai-compatible",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Custom => "custom",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai-compatible" | "openai" | "openrouter" | "deepseek" | "groq" => {
                Ok(ProviderKind::OpenAiCompatible)
            }
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "custom" => Ok(ProviderKind::Custom),
            _ => Err(ConfigError::UnknownProviderKind(s.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of one provider endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Stable identifier (the model row id when loaded from storage)
    pub id: String,
    /// Human readable name shown in result tables
    pub display_name: String,
    /// Wire protocol family
    pub kind: ProviderKind,
    /// Full URL the request is POSTed to
    pub endpoint_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Model identifier sent in the payload
    pub model: String,
    /// Inactive providers are filtered out before dispatch
    pub is_active: bool,
    /// Per-provider timeout; the dispatch-wide timeout applies when absent
    #[serde(default)]
    pub timeout: Option<Duration>,
}

impl ProviderConfig {
    /// Create an active provider configuration
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        kind: ProviderKind,
        endpoint_url: impl Into<String>,
        api_key_env: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind,
            endpoint_url: endpoint_url.into(),
            api_key_env: api_key_env.into(),
            model: model.into(),
            is_active: true,
            timeout: None,
        }
    }

    /// Override the dispatch-wide timeout for this provider
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the active flag
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Check the fields an active provider must have
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !self.is_active {
            return Err(ConfigError::Inactive {
                provider: self.display_name.clone(),
            });
        }
        if self.endpoint_url.trim().is_empty() {
            return Err(ConfigError::MissingEndpoint {
                provider: self.display_name.clone(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingModel {
                provider: self.display_name.clone(),
            });
        }
        Ok(())
    }
}

/// One fan-out request, fixed at creation
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    prompt: String,
    timeout: Duration,
    max_tokens: u32,
    providers: Vec<ProviderConfig>,
}

impl DispatchRequest {
    /// Create a request, rejecting a blank prompt or an empty provider list
    pub fn new(
        prompt: impl Into<String>,
        providers: Vec<ProviderConfig>,
        timeout: Duration,
        max_tokens: u32,
    ) -> Result<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(ChatListError::EmptyPrompt);
        }
        if providers.is_empty() {
            return Err(ChatListError::NoProviders);
        }
        Ok(Self {
            prompt,
            timeout,
            max_tokens,
            providers,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    /// Effective timeout of one provider branch
    pub fn timeout_for(&self, provider: &ProviderConfig) -> Duration {
        provider.timeout.unwrap_or(self.timeout)
    }
}

/// Terminal status of one provider branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Success,
    Timeout,
    Error,
    Skipped,
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DispatchStatus::Success => "success",
            DispatchStatus::Timeout => "timeout",
            DispatchStatus::Error => "error",
            DispatchStatus::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// Canonical result of one provider within one dispatch
///
/// Fields are only reachable through accessors; the constructors guarantee
/// that `response_text` is present iff the status is `Success`, `error_detail`
/// iff `Error`, and `skip_reason` iff `Skipped`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    provider_id: String,
    display_name: String,
    status: DispatchStatus,
    response_text: Option<String>,
    token_count: Option<u32>,
    latency: Duration,
    error_detail: Option<BranchError>,
    skip_reason: Option<ConfigError>,
}

impl DispatchResult {
    fn base(provider: &ProviderConfig, status: DispatchStatus, latency: Duration) -> Self {
        Self {
            provider_id: provider.id.clone(),
            display_name: provider.display_name.clone(),
            status,
            response_text: None,
            token_count: None,
            latency,
            error_detail: None,
            skip_reason: None,
        }
    }

    /// Provider answered and the answer was normalized
    pub fn success(
        provider: &ProviderConfig,
        text: impl Into<String>,
        token_count: Option<u32>,
        latency: Duration,
    ) -> Self {
        Self {
            response_text: Some(text.into()),
            token_count,
            ..Self::base(provider, DispatchStatus::Success, latency)
        }
    }

    /// Provider did not answer before its deadline
    pub fn timed_out(provider: &ProviderConfig, latency: Duration) -> Self {
        Self::base(provider, DispatchStatus::Timeout, latency)
    }

    /// Provider branch failed; a timeout error is reported as `Timeout`
    pub fn failed(provider: &ProviderConfig, error: BranchError, latency: Duration) -> Self {
        if error.is_timeout() {
            return Self::timed_out(provider, latency);
        }
        Self {
            error_detail: Some(error),
            ..Self::base(provider, DispatchStatus::Error, latency)
        }
    }

    /// Provider never ran because its configuration was rejected
    pub fn skipped(provider: &ProviderConfig, reason: ConfigError) -> Self {
        Self {
            skip_reason: Some(reason),
            ..Self::base(provider, DispatchStatus::Skipped, Duration::ZERO)
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn status(&self) -> DispatchStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == DispatchStatus::Success
    }

    pub fn response_text(&self) -> Option<&str> {
        self.response_text.as_deref()
    }

    pub fn token_count(&self) -> Option<u32> {
        self.token_count
    }

    /// Time from dispatch start until this branch became terminal
    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn error_detail(&self) -> Option<&BranchError> {
        self.error_detail.as_ref()
    }

    pub fn skip_reason(&self) -> Option<&ConfigError> {
        self.skip_reason.as_ref()
    }

    /// One-line description of the outcome for tables and logs
    pub fn summary(&self) -> String {
        match self.status {
            DispatchStatus::Success => match self.token_count {
                Some(tokens) => format!("ok ({} tokens)", tokens),
                None => "ok".to_string(),
            },
            DispatchStatus::Timeout => "timed out".to_string(),
            DispatchStatus::Error => self
                .error_detail
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "error".to_string()),
            DispatchStatus::Skipped => self
                .skip_reason
                .as_ref()
                .map(|e| format!("skipped: {}", e))
                .unwrap_or_else(|| "skipped".to_string()),
        }
    }
}

/// Everything one dispatch produced, in provider input order
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedOutcome {
    prompt: String,
    results: Vec<DispatchResult>,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl AggregatedOutcome {
    pub(crate) fn new(
        prompt: impl Into<String>,
        results: Vec<DispatchResult>,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            results,
            started_at,
            completed_at,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn results(&self) -> &[DispatchResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<DispatchResult> {
        self.results
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Count of results with the given status
    pub fn count(&self, status: DispatchStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// Role of a chat message in a request payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Chat message as sent in both built-in payload shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;

    fn provider() -> ProviderConfig {
        ProviderConfig::new(
            "1",
            "GPT-4o",
            ProviderKind::OpenAiCompatible,
            "https://api.openai.com/v1/chat/completions",
            "OPENAI_API_KEY",
            "gpt-4o",
        )
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!(
            "openai".parse::<ProviderKind>().unwrap(),
            ProviderKind::OpenAiCompatible
        );
        assert_eq!(
            "Anthropic".parse::<ProviderKind>().unwrap(),
            ProviderKind::Anthropic
        );
        assert_eq!(
            "openai-compatible".parse::<ProviderKind>().unwrap(),
            ProviderKind::OpenAiCompatible
        );
        assert!(matches!(
            "google".parse::<ProviderKind>(),
            Err(ConfigError::UnknownProviderKind(kind)) if kind == "google"
        ));
        assert_eq!(ProviderKind::Anthropic.to_string(), "anthropic");
    }

    #[test]
    fn test_provider_validation() {
        assert!(provider().validate().is_ok());

        let inactive = provider().with_active(false);
        assert!(matches!(
            inactive.validate(),
            Err(ConfigError::Inactive { .. })
        ));

        let mut no_model = provider();
        no_model.model = "  ".to_string();
        assert!(matches!(
            no_model.validate(),
            Err(ConfigError::MissingModel { .. })
        ));

        let mut no_endpoint = provider();
        no_endpoint.endpoint_url.clear();
        assert!(matches!(
            no_endpoint.validate(),
            Err(ConfigError::MissingEndpoint { .. })
        ));
    }

    #[test]
    fn test_dispatch_request_contract() {
        let err = DispatchRequest::new("   ", vec![provider()], Duration::from_secs(1), 10)
            .unwrap_err();
        assert!(matches!(err, ChatListError::EmptyPrompt));

        let err = DispatchRequest::new("hi", Vec::new(), Duration::from_secs(1), 10).unwrap_err();
        assert!(matches!(err, ChatListError::NoProviders));

        let request = DispatchRequest::new(
            "hi",
            vec![provider(), provider().with_timeout(Duration::from_secs(2))],
            Duration::from_secs(5),
            10,
        )
        .unwrap();
        assert_eq!(
            request.timeout_for(&request.providers()[0]),
            Duration::from_secs(5)
        );
        assert_eq!(
            request.timeout_for(&request.providers()[1]),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_result_invariants() {
        let p = provider();

        let ok = DispatchResult::success(&p, "hello", Some(12), Duration::from_millis(5));
        assert_eq!(ok.status(), DispatchStatus::Success);
        assert_eq!(ok.response_text(), Some("hello"));
        assert!(ok.error_detail().is_none());
        assert_eq!(ok.summary(), "ok (12 tokens)");

        let failed = DispatchResult::failed(&p, BranchError::Cancelled, Duration::ZERO);
        assert_eq!(failed.status(), DispatchStatus::Error);
        assert!(failed.response_text().is_none());
        assert_eq!(failed.error_detail(), Some(&BranchError::Cancelled));

        let timed_out = DispatchResult::failed(
            &p,
            BranchError::Transport(TransportError::Timeout),
            Duration::from_secs(3),
        );
        assert_eq!(timed_out.status(), DispatchStatus::Timeout);
        assert!(timed_out.error_detail().is_none());

        let skipped = DispatchResult::skipped(&p, ConfigError::EmptyPrompt);
        assert_eq!(skipped.status(), DispatchStatus::Skipped);
        assert!(skipped.error_detail().is_none());
        assert_eq!(skipped.skip_reason(), Some(&ConfigError::EmptyPrompt));
        assert_eq!(skipped.latency(), Duration::ZERO);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&DispatchStatus::Timeout).unwrap();
        assert_eq!(json, "\"timeout\"");
        let json = serde_json::to_string(&ProviderKind::OpenAiCompatible).unwrap();
        assert_eq!(json, "\"openai-compatible\"");
    }

    #[test]
    fn test_kind_names_agree_with_storage() {
        for kind in [
            ProviderKind::OpenAiCompatible,
            ProviderKind::Anthropic,
            ProviderKind::Custom,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(serde_json::from_str::<ProviderKind>(&json).unwrap(), kind);
        }

        let config: ProviderConfig = serde_json::from_value(serde_json::json!({
            "id": "1",
            "display_name": "GPT-4o",
            "kind": "openai-compatible",
            "endpoint_url": "https://api.openai.com/v1/chat/completions",
            "api_key_env": "OPENAI_API_KEY",
            "model": "gpt-4o",
            "is_active": true
        }))
        .unwrap();
        assert_eq!(config.kind, ProviderKind::OpenAiCompatible);
    }
}
