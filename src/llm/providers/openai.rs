//! OpenAI-compatible chat completions
//!
//! Covers every endpoint speaking the chat-completions dialect (OpenAI,
//! DeepSeek, Groq, OpenRouter, ...).

use crate::error::NormalizeError;
use crate::llm::normalize::Normalized;
use crate::llm::provider::{Message, ProviderConfig, ProviderKind};
use crate::llm::request::{AuthScheme, WireRequest};
use serde::Deserialize;
use serde_json::json;

const CONTENT_PATH: &str = "choices[0].message.content";

/// Build a chat-completion request with a single user message
pub(crate) fn build_request(prompt: &str, config: &ProviderConfig, max_tokens: u32) -> WireRequest {
    let body = json!({
        "model": config.model,
        "messages": [Message::user(prompt)],
        "max_tokens": max_tokens,
    });
    WireRequest::new(ProviderKind::OpenAiCompatible, body, AuthScheme::Bearer)
}

/// Read `choices[0].message.content` and `usage.total_tokens`
pub(crate) fn normalize(body: serde_json::Value) -> Result<Normalized, NormalizeError> {
    let response: ChatCompletionResponse =
        serde_json::from_value(body).map_err(|_| NormalizeError::UnexpectedShape {
            path: CONTENT_PATH.to_string(),
        })?;

    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| NormalizeError::UnexpectedShape {
            path: CONTENT_PATH.to_string(),
        })?;

    Ok(Normalized {
        text,
        token_count: response.usage.and_then(|usage| usage.total_tokens),
    })
}

/// Chat-completions response, reduced to the fields we read
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: Option<u32>,
}
