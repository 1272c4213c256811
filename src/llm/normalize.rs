//! Response normalization
//!
//! Maps each provider's raw 2xx payload into the canonical answer text and
//! token count. Pure: no I/O, the raw response is only read.

use crate::error::NormalizeError;
use crate::llm::client::RawResponse;
use crate::llm::provider::{ProviderConfig, ProviderKind};
use crate::llm::providers::{anthropic, openai, CustomKindHandler};
use std::sync::Arc;

/// Success fields of a `DispatchResult`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// Generated text
    pub text: String,
    /// Token usage, when the provider reports it
    pub token_count: Option<u32>,
}

/// Per-kind response reader
#[derive(Clone, Default)]
pub struct ResponseNormalizer {
    custom: Option<Arc<dyn CustomKindHandler>>,
}

impl ResponseNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler used for `ProviderKind::Custom`
    pub fn with_custom_kind(mut self, handler: Arc<dyn CustomKindHandler>) -> Self {
        self.custom = Some(handler);
        self
    }

    pub fn normalize(
        &self,
        raw: &RawResponse,
        config: &ProviderConfig,
    ) -> Result<Normalized, NormalizeError> {
        let body: serde_json::Value = serde_json::from_str(&raw.body)
            .map_err(|e| NormalizeError::InvalidJson(e.to_string()))?;

        match config.kind {
            ProviderKind::OpenAiCompatible => openai::normalize(body),
            ProviderKind::Anthropic => anthropic::normalize(body),
            ProviderKind::Custom => match &self.custom {
                Some(handler) => handler.normalize(body),
                None => Err(NormalizeError::UnexpectedShape {
                    path: "<no handler registered for custom kind>".to_string(),
                }),
            },
        }
    }
}
