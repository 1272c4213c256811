//! Provider HTTP client
//!
//! This module sends one wire request to one provider endpoint. It owns
//! authentication header injection and captures the raw response body; it
//! never retries and never interprets the body.

use crate::error::{Result, TransportError};
use crate::llm::request::{AuthScheme, WireRequest};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::error::Error as _;
use std::str::FromStr;
use std::time::Duration;

/// Default connection-establishment timeout (in seconds)
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Raw 2xx response as captured from the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body, undecoded
    pub body: String,
}

/// Sends one request and returns the raw response
///
/// `ProviderClient` is the HTTP implementation; tests substitute
/// deterministic transports.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue exactly one call, bounded by `timeout`
    async fn send(
        &self,
        request: &WireRequest,
        endpoint_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> std::result::Result<RawResponse, TransportError>;
}

/// HTTP client for provider API requests
#[derive(Clone)]
pub struct ProviderClient {
    /// Reqwest HTTP client (shared connection pool)
    client: Client,
}

impl ProviderClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client })
    }

    /// Build the headers for a request: JSON content type, auth, extras
    pub fn build_headers(
        request: &WireRequest,
        api_key: &str,
    ) -> std::result::Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match &request.auth {
            AuthScheme::Bearer => {
                headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", api_key))?);
            }
            AuthScheme::Header(name) => {
                headers.insert(header_name(name)?, header_value(api_key)?);
            }
        }

        for (name, value) in &request.headers {
            headers.insert(header_name(name)?, header_value(value)?);
        }

        Ok(headers)
    }
}

#[async_trait]
impl Transport for ProviderClient {
    async fn send(
        &self,
        request: &WireRequest,
        endpoint_url: &str,
        api_key: &str,
        timeout: Duration,
    ) -> std::result::Result<RawResponse, TransportError> {
        let headers = Self::build_headers(request, api_key)?;

        let response = self
            .client
            .post(endpoint_url)
            .headers(headers)
            .timeout(timeout)
            .json(&request.body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let body = response.text().await.map_err(classify)?;

        if !status.is_success() {
            return Err(TransportError::HttpStatus {
                code: status.as_u16(),
                body,
            });
        }

        Ok(RawResponse {
            status: status.as_u16(),
            body,
        })
    }
}

fn header_name(name: &str) -> std::result::Result<HeaderName, TransportError> {
    HeaderName::from_str(name)
        .map_err(|_| TransportError::InvalidRequest(format!("invalid header name: {}", name)))
}

// The value is never echoed back: it may be an API key.
fn header_value(value: &str) -> std::result::Result<HeaderValue, TransportError> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| TransportError::InvalidRequest("invalid header value".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Map a reqwest failure onto the transport taxonomy
fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        return TransportError::Timeout;
    }

    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    TransportError::Network(message)
}
