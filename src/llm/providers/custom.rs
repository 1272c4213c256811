//! Extension point for provider kinds the engine does not ship

use crate::error::{ConfigError, NormalizeError};
use crate::llm::normalize::Normalized;
use crate::llm::provider::ProviderConfig;
use crate::llm::request::WireRequest;

/// Request/response handling for `ProviderKind::Custom`
///
/// Register one with `Dispatcher::with_custom_kind`; without it, custom
/// providers are skipped with `ConfigError::UnsupportedProviderKind`.
pub trait CustomKindHandler: Send + Sync {
    /// Shape the payload for a validated, active provider
    fn build_request(
        &self,
        prompt: &str,
        config: &ProviderConfig,
        max_tokens: u32,
    ) -> Result<WireRequest, ConfigError>;

    /// Extract text and token usage from a 2xx response body
    fn normalize(&self, body: serde_json::Value) -> Result<Normalized, NormalizeError>;
}
