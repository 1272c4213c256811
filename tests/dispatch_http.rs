//! Dispatch over real HTTP
//!
//! Runs the dispatcher with the reqwest-backed `ProviderClient` against local
//! mock servers.

use chatlist::error::{BranchError, ConfigError, NormalizeError, TransportError};
use chatlist::llm::{DispatchStatus, ProviderConfig, ProviderKind, StaticKeySource};
use chatlist::Dispatcher;
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

fn dispatcher() -> Dispatcher {
    Dispatcher::with_http_client().unwrap().with_key_source(Arc::new(
        StaticKeySource::new()
            .with_key("OPENAI_API_KEY", "sk-test")
            .with_key("ANTHROPIC_API_KEY", "ant-test"),
    ))
}

fn openai(id: &str, url: String) -> ProviderConfig {
    ProviderConfig::new(
        id,
        format!("GPT {}", id),
        ProviderKind::OpenAiCompatible,
        url,
        "OPENAI_API_KEY",
        "gpt-4o",
    )
}

fn anthropic(id: &str, url: String) -> ProviderConfig {
    ProviderConfig::new(
        id,
        format!("Claude {}", id),
        ProviderKind::Anthropic,
        url,
        "ANTHROPIC_API_KEY",
        "claude-3-5-sonnet-20241022",
    )
}

/// Accepts connections and never answers
async fn silent_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });
    format!("http://{}/v1/chat/completions", addr)
}

#[tokio::test]
async fn test_openai_request_shape_and_answer() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o",
            "max_tokens": 4096,
            "messages": [{ "role": "user", "content": "Summarize quantum entanglement" }]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [{ "message": { "role": "assistant", "content": "Entanglement links particles..." } }],
                "usage": { "total_tokens": 58 }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let providers = vec![openai("1", format!("{}/v1/chat/completions", server.url()))];
    let outcome = dispatcher()
        .dispatch("Summarize quantum entanglement", &providers, Duration::from_secs(5))
        .await
        .unwrap();

    mock.assert_async().await;
    let result = &outcome.results()[0];
    assert_eq!(result.status(), DispatchStatus::Success);
    assert_eq!(result.response_text(), Some("Entanglement links particles..."));
    assert_eq!(result.token_count(), Some(58));
}

#[tokio::test]
async fn test_anthropic_request_shape_and_answer() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "ant-test")
        .match_header("anthropic-version", "2023-06-01")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::PartialJson(json!({
            "model": "claude-3-5-sonnet-20241022",
            "max_tokens": 512
        })))
        .with_status(200)
        .with_body(
            json!({
                "content": [
                    { "type": "text", "text": "Part one. " },
                    { "type": "text", "text": "Part two." }
                ],
                "usage": { "input_tokens": 10, "output_tokens": 21 }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let providers = vec![anthropic("1", format!("{}/v1/messages", server.url()))];
    let outcome = dispatcher()
        .with_max_tokens(512)
        .dispatch("hello", &providers, Duration::from_secs(5))
        .await
        .unwrap();

    mock.assert_async().await;
    let result = &outcome.results()[0];
    assert_eq!(result.response_text(), Some("Part one. Part two."));
    assert_eq!(result.token_count(), Some(21));
}

#[tokio::test]
async fn test_mixed_outcomes_keep_input_order() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/broken")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;
    server
        .mock("POST", "/html")
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create_async()
        .await;
    server
        .mock("POST", "/v1/messages")
        .with_status(200)
        .with_body(json!({ "content": [{ "type": "text", "text": "fine" }] }).to_string())
        .create_async()
        .await;

    let mut keyless = openai("4", format!("{}/never", server.url()));
    keyless.api_key_env = "CHATLIST_UNSET_TEST_KEY".to_string();

    let providers = vec![
        openai("1", format!("{}/broken", server.url())),
        anthropic("2", format!("{}/v1/messages", server.url())),
        openai("3", format!("{}/html", server.url())),
        keyless,
    ];
    let outcome = dispatcher()
        .dispatch("hi", &providers, Duration::from_secs(5))
        .await
        .unwrap();

    let results = outcome.results();
    let ids: Vec<&str> = results.iter().map(|r| r.provider_id()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);

    assert_eq!(
        results[0].error_detail(),
        Some(&BranchError::Transport(TransportError::HttpStatus {
            code: 500,
            body: "internal error".to_string()
        }))
    );
    assert_eq!(results[1].status(), DispatchStatus::Success);
    assert!(matches!(
        results[2].error_detail(),
        Some(BranchError::Normalize(NormalizeError::InvalidJson(_)))
    ));
    assert_eq!(results[3].status(), DispatchStatus::Skipped);
    assert!(matches!(
        results[3].skip_reason(),
        Some(ConfigError::MissingApiKey { .. })
    ));
}

#[tokio::test]
async fn test_unresponsive_provider_times_out() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(json!({ "choices": [{ "message": { "content": "quick" } }] }).to_string())
        .create_async()
        .await;

    let providers = vec![
        openai("1", format!("{}/v1/chat/completions", server.url())),
        openai("2", silent_endpoint().await),
    ];

    let started = std::time::Instant::now();
    let outcome = dispatcher()
        .dispatch("hi", &providers, Duration::from_millis(400))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(outcome.results()[0].status(), DispatchStatus::Success);
    assert_eq!(outcome.results()[1].status(), DispatchStatus::Timeout);
    assert!(outcome.results()[1].latency() >= Duration::from_millis(350));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let providers = vec![openai("1", format!("http://{}/v1/chat/completions", addr))];
    let outcome = dispatcher()
        .dispatch("hi", &providers, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(outcome.results()[0].status(), DispatchStatus::Error);
    assert!(matches!(
        outcome.results()[0].error_detail(),
        Some(BranchError::Transport(TransportError::Network(_)))
    ));
}
