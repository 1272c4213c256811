//! Request building
//!
//! Turns a prompt plus a `ProviderConfig` into the provider-specific wire
//! request. Building is a pure step: every configuration problem surfaces here
//! as a `ConfigError`, before any network call is made.

use crate::error::ConfigError;
use crate::llm::keys::ApiKeySource;
use crate::llm::provider::{ProviderConfig, ProviderKind};
use crate::llm::providers::{anthropic, openai, CustomKindHandler};
use std::fmt;
use std::sync::Arc;

/// How the API key is attached to the HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `<header>: <key>`
    Header(String),
}

/// Provider-specific request, ready to be sent by a transport
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    /// Kind that produced this request
    pub kind: ProviderKind,
    /// JSON body
    pub body: serde_json::Value,
    /// Extra headers besides content type and authentication
    pub headers: Vec<(String, String)>,
    /// Authentication header shape
    pub auth: AuthScheme,
}

impl WireRequest {
    pub fn new(kind: ProviderKind, body: serde_json::Value, auth: AuthScheme) -> Self {
        Self {
            kind,
            body,
            headers: Vec::new(),
            auth,
        }
    }

    /// Add an extra header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A wire request together with the API key resolved for it
#[derive(Clone)]
pub struct PreparedRequest {
    pub wire: WireRequest,
    api_key: String,
}

impl PreparedRequest {
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for PreparedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedRequest")
            .field("wire", &self.wire)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Builds wire requests for the built-in kinds plus an optional custom kind
#[derive(Clone, Default)]
pub struct RequestBuilder {
    custom: Option<Arc<dyn CustomKindHandler>>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler used for `ProviderKind::Custom`
    pub fn with_custom_kind(mut self, handler: Arc<dyn CustomKindHandler>) -> Self {
        self.custom = Some(handler);
        self
    }

    /// Shape the payload for `config`
    pub fn build(
        &self,
        prompt: &str,
        config: &ProviderConfig,
        max_tokens: u32,
    ) -> Result<WireRequest, ConfigError> {
        if prompt.trim().is_empty() {
            return Err(ConfigError::EmptyPrompt);
        }
        config.validate()?;

        match config.kind {
            ProviderKind::OpenAiCompatible => Ok(openai::build_request(prompt, config, max_tokens)),
            ProviderKind::Anthropic => Ok(anthropic::build_request(prompt, config, max_tokens)),
            ProviderKind::Custom => match &self.custom {
                Some(handler) => handler.build_request(prompt, config, max_tokens),
                None => Err(ConfigError::UnsupportedProviderKind {
                    provider: config.display_name.clone(),
                    kind: config.kind.to_string(),
                }),
            },
        }
    }

    /// Build the payload and resolve the provider's API key
    pub fn prepare(
        &self,
        prompt: &str,
        config: &ProviderConfig,
        keys: &dyn ApiKeySource,
        max_tokens: u32,
    ) -> Result<PreparedRequest, ConfigError> {
        let wire = self.build(prompt, config, max_tokens)?;
        let api_key = keys
            .lookup(&config.api_key_env)?
            .ok_or_else(|| ConfigError::MissingApiKey {
                provider: config.display_name.clone(),
                env_var: config.api_key_env.clone(),
            })?;

        Ok(PreparedRequest { wire, api_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NormalizeError;
    use crate::llm::keys::StaticKeySource;
    use crate::llm::normalize::Normalized;
    use serde_json::{json, Value};

    fn openai() -> ProviderConfig {
        ProviderConfig::new(
            "1",
            "GPT-4o",
            ProviderKind::OpenAiCompatible,
            "https://api.openai.com/v1/chat/completions",
            "OPENAI_API_KEY",
            "gpt-4o",
        )
    }

    fn claude() -> ProviderConfig {
        ProviderConfig::new(
            "2",
            "Claude",
            ProviderKind::Anthropic,
            "https://api.anthropic.com/v1/messages",
            "ANTHROPIC_API_KEY",
            "claude-3-5-sonnet-20241022",
        )
    }

    struct EchoKind;

    impl CustomKindHandler for EchoKind {
        fn build_request(
            &self,
            prompt: &str,
            config: &ProviderConfig,
            _max_tokens: u32,
        ) -> Result<WireRequest, ConfigError> {
            Ok(WireRequest::new(
                ProviderKind::Custom,
                json!({ "input": prompt, "engine": config.model }),
                AuthScheme::Header("x-goog-api-key".to_string()),
            ))
        }

        fn normalize(&self, body: Value) -> Result<Normalized, NormalizeError> {
            Ok(Normalized {
                text: body["output"].as_str().unwrap_or_default().to_string(),
                token_count: None,
            })
        }
    }

    #[test]
    fn test_openai_payload() {
        let wire = RequestBuilder::new().build("Hello", &openai(), 512).unwrap();

        assert_eq!(wire.kind, ProviderKind::OpenAiCompatible);
        assert_eq!(wire.auth, AuthScheme::Bearer);
        assert_eq!(wire.body["model"], "gpt-4o");
        assert_eq!(wire.body["max_tokens"], 512);
        assert_eq!(wire.body["messages"][0]["role"], "user");
        assert_eq!(wire.body["messages"][0]["content"], "Hello");
        assert!(wire.headers.is_empty());
    }

    #[test]
    fn test_anthropic_payload() {
        let wire = RequestBuilder::new().build("Hello", &claude(), 1024).unwrap();

        assert_eq!(wire.kind, ProviderKind::Anthropic);
        assert_eq!(wire.auth, AuthScheme::Header("x-api-key".to_string()));
        assert_eq!(wire.body["model"], "claude-3-5-sonnet-20241022");
        assert_eq!(wire.body["max_tokens"], 1024);
        assert_eq!(wire.body["messages"][0]["content"], "Hello");
        assert!(wire
            .headers
            .contains(&("anthropic-version".to_string(), "2023-06-01".to_string())));
    }

    #[test]
    fn test_rejects_blank_prompt_and_inactive_provider() {
        let builder = RequestBuilder::new();
        assert_eq!(
            builder.build("  \n", &openai(), 10).unwrap_err(),
            ConfigError::EmptyPrompt
        );
        assert!(matches!(
            builder.build("hi", &openai().with_active(false), 10),
            Err(ConfigError::Inactive { .. })
        ));
    }

    #[test]
    fn test_custom_kind_requires_handler() {
        let mut custom = openai();
        custom.kind = ProviderKind::Custom;

        let err = RequestBuilder::new().build("hi", &custom, 10).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedProviderKind { .. }));

        let builder = RequestBuilder::new().with_custom_kind(Arc::new(EchoKind));
        let wire = builder.build("hi", &custom, 10).unwrap();
        assert_eq!(wire.body["input"], "hi");
        assert_eq!(wire.auth, AuthScheme::Header("x-goog-api-key".to_string()));
    }

    #[test]
    fn test_prepare_resolves_key() {
        let keys = StaticKeySource::new().with_key("OPENAI_API_KEY", "sk-test");
        let builder = RequestBuilder::new();

        let prepared = builder.prepare("hi", &openai(), &keys, 10).unwrap();
        assert_eq!(prepared.api_key(), "sk-test");
        assert!(!format!("{:?}", prepared).contains("sk-test"));

        let err = builder.prepare("hi", &claude(), &keys, 10).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingApiKey {
                provider: "Claude".to_string(),
                env_var: "ANTHROPIC_API_KEY".to_string(),
            }
        );
    }
}
