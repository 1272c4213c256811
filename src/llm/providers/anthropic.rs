//! Anthropic messages API
//!
//! The response carries a list of typed content blocks instead of a choices
//! array; all `text` blocks are concatenated into the answer.

use crate::error::NormalizeError;
use crate::llm::normalize::Normalized;
use crate::llm::provider::{Message, ProviderConfig, ProviderKind};
use crate::llm::request::{AuthScheme, WireRequest};
use serde::Deserialize;
use serde_json::json;

/// Anthropic API version sent with every request
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Build a messages request with a single user message
pub(crate) fn build_request(prompt: &str, config: &ProviderConfig, max_tokens: u32) -> WireRequest {
    let body = json!({
        "model": config.model,
        "max_tokens": max_tokens,
        "messages": [Message::user(prompt)],
    });
    WireRequest::new(
        ProviderKind::Anthropic,
        body,
        AuthScheme::Header("x-api-key".to_string()),
    )
    .with_header("anthropic-version", ANTHROPIC_VERSION)
}

/// Concatenate the text blocks of `content`; tokens come from `usage.output_tokens`
pub(crate) fn normalize(body: serde_json::Value) -> Result<Normalized, NormalizeError> {
    let response: MessagesResponse =
        serde_json::from_value(body).map_err(|_| NormalizeError::UnexpectedShape {
            path: "content".to_string(),
        })?;

    let blocks = response
        .content
        .ok_or_else(|| NormalizeError::UnexpectedShape {
            path: "content".to_string(),
        })?;

    let texts: Vec<String> = blocks
        .into_iter()
        .filter(|block| block.type_ == "text")
        .filter_map(|block| block.text)
        .collect();

    if texts.is_empty() {
        return Err(NormalizeError::UnexpectedShape {
            path: "content[].text".to_string(),
        });
    }

    // Token usage is best-effort; a missing count is reported as zero
    let output_tokens = response
        .usage
        .and_then(|usage| usage.output_tokens)
        .unwrap_or(0);

    Ok(Normalized {
        text: texts.concat(),
        token_count: Some(output_tokens),
    })
}

/// Anthropic API response format
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Option<Vec<ContentBlock>>,
    #[serde(default)]
    usage: Option<Usage>,
}

/// Content block in Anthropic response
#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    type_: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    output_tokens: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concatenates_text_blocks() {
        let body = json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-20241022",
            "content": [
                { "type": "text", "text": "Entanglement " },
                { "type": "tool_use", "id": "t1", "name": "lookup", "input": {} },
                { "type": "text", "text": "links particles." }
            ],
            "stop_reason": "end_turn",
            "usage": { "input_tokens": 10, "output_tokens": 4 }
        });

        let normalized = normalize(body).unwrap();
        assert_eq!(normalized.text, "Entanglement links particles.");
        assert_eq!(normalized.token_count, Some(4));
    }

    #[test]
    fn test_missing_usage_defaults_to_zero() {
        let body = json!({ "content": [{ "type": "text", "text": "hi" }] });

        let normalized = normalize(body).unwrap();
        assert_eq!(normalized.token_count, Some(0));
    }

    #[test]
    fn test_missing_content_is_unexpected_shape() {
        assert_eq!(
            normalize(json!({ "usage": { "output_tokens": 3 } })).unwrap_err(),
            NormalizeError::UnexpectedShape {
                path: "content".to_string()
            }
        );
        assert_eq!(
            normalize(json!({ "content": [] })).unwrap_err(),
            NormalizeError::UnexpectedShape {
                path: "content[].text".to_string()
            }
        );
    }

    #[test]
    fn test_request_shape() {
        let config = ProviderConfig::new(
            "c",
            "Claude",
            ProviderKind::Anthropic,
            "https://api.anthropic.com/v1/messages",
            "ANTHROPIC_API_KEY",
            "claude-3-opus",
        );
        let wire = build_request("Hello", &config, 64);

        assert_eq!(wire.body["model"], "claude-3-opus");
        assert_eq!(wire.body["messages"][0]["role"], "user");
        assert!(wire.body.get("system").is_none());
    }
}
