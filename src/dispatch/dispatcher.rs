//! Concurrent dispatcher
//!
//! Sends one prompt to every provider at once. Each provider runs as its own
//! task (a branch) through build -> send -> normalize; the dispatcher waits for
//! all branches and hands their outcomes to the aggregator. Every provider
//! yields exactly one `DispatchResult`, whatever happens to its branch.

use crate::dispatch::aggregator::{CompletedUnit, ResultAggregator};
use crate::error::{BranchError, Result, TransportError};
use crate::llm::client::{ProviderClient, Transport};
use crate::llm::keys::{ApiKeySource, EnvKeySource};
use crate::llm::normalize::{Normalized, ResponseNormalizer};
use crate::llm::provider::{
    AggregatedOutcome, DispatchRequest, DispatchResult, DispatchStatus, ProviderConfig,
    DEFAULT_MAX_TOKENS,
};
use crate::llm::providers::CustomKindHandler;
use crate::llm::request::{PreparedRequest, RequestBuilder};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Number of prompt characters included in debug logs
const PROMPT_PREVIEW_CHARS: usize = 200;

/// Fans a prompt out to many providers concurrently
///
/// A dispatcher holds no per-dispatch state, so one instance can serve any
/// number of sequential or concurrent dispatches.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    keys: Arc<dyn ApiKeySource>,
    builder: RequestBuilder,
    normalizer: ResponseNormalizer,
    max_tokens: u32,
}

impl Dispatcher {
    /// Create a dispatcher sending through `transport`, reading keys from the environment
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            keys: Arc::new(EnvKeySource),
            builder: RequestBuilder::new(),
            normalizer: ResponseNormalizer::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Create a dispatcher backed by the HTTP `ProviderClient`
    pub fn with_http_client() -> Result<Self> {
        Ok(Self::new(Arc::new(ProviderClient::new()?)))
    }

    /// Use a different API key source
    pub fn with_key_source(mut self, keys: Arc<dyn ApiKeySource>) -> Self {
        self.keys = keys;
        self
    }

    /// Where API keys are looked up
    pub fn key_source(&self) -> &dyn ApiKeySource {
        self.keys.as_ref()
    }

    /// Register the handler for `ProviderKind::Custom`
    pub fn with_custom_kind(mut self, handler: Arc<dyn CustomKindHandler>) -> Self {
        self.builder = self.builder.with_custom_kind(Arc::clone(&handler));
        self.normalizer = self.normalizer.with_custom_kind(handler);
        self
    }

    /// Set the maximum tokens requested from each provider
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn set_max_tokens(&mut self, max_tokens: u32) {
        self.max_tokens = max_tokens;
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Send `prompt` to every provider and wait until all of them are terminal
    ///
    /// Fails only when the prompt is blank or `providers` is empty; provider
    /// failures are reported inside the returned outcome.
    pub async fn dispatch(
        &self,
        prompt: &str,
        providers: &[ProviderConfig],
        timeout: Duration,
    ) -> Result<AggregatedOutcome> {
        self.dispatch_with_cancellation(prompt, providers, timeout, CancellationToken::new())
            .await
    }

    /// Like [`dispatch`](Self::dispatch), stopping running branches once `cancel` fires
    pub async fn dispatch_with_cancellation(
        &self,
        prompt: &str,
        providers: &[ProviderConfig],
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<AggregatedOutcome> {
        let request = DispatchRequest::new(prompt, providers.to_vec(), timeout, self.max_tokens)?;
        Ok(self.run(request, cancel).await)
    }

    /// Execute a validated request
    pub async fn run(&self, request: DispatchRequest, cancel: CancellationToken) -> AggregatedOutcome {
        let started_at = Utc::now();
        let started = Instant::now();
        let providers = request.providers();

        info!(
            target: "dispatch",
            providers = providers.len(),
            names = %providers
                .iter()
                .map(|p| p.display_name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            "dispatching prompt"
        );
        debug!(target: "dispatch", prompt = %preview(request.prompt()), "prompt text");

        let mut completed = Vec::with_capacity(providers.len());
        let mut branches = JoinSet::new();
        let mut branch_index = HashMap::new();

        for (index, config) in providers.iter().enumerate() {
            let prepared = match self.builder.prepare(
                request.prompt(),
                config,
                self.keys.as_ref(),
                request.max_tokens(),
            ) {
                Ok(prepared) => prepared,
                Err(reason) => {
                    warn!(target: "dispatch", provider = %config.display_name, %reason, "provider skipped");
                    completed.push(CompletedUnit {
                        index,
                        result: DispatchResult::skipped(config, reason),
                    });
                    continue;
                }
            };

            // Deadlines run from dispatch start so scheduling delay counts against them
            let branch = Branch {
                index,
                config: config.clone(),
                request: prepared,
                transport: Arc::clone(&self.transport),
                normalizer: self.normalizer.clone(),
                cancel: cancel.clone(),
                started,
                deadline: started + request.timeout_for(config),
            };
            let handle = branches.spawn(branch.run());
            branch_index.insert(handle.id(), index);
        }

        while let Some(joined) = branches.join_next_with_id().await {
            match joined {
                Ok((_, unit)) => completed.push(unit),
                Err(join_error) => {
                    let Some(&index) = branch_index.get(&join_error.id()) else {
                        continue;
                    };
                    let config = &providers[index];
                    warn!(target: "dispatch", provider = %config.display_name, error = %join_error, "branch aborted");
                    completed.push(CompletedUnit {
                        index,
                        result: DispatchResult::failed(
                            config,
                            BranchError::Aborted(join_error.to_string()),
                            started.elapsed(),
                        ),
                    });
                }
            }
        }

        let outcome =
            ResultAggregator::aggregate(request.prompt(), providers, completed, started_at);

        info!(
            target: "dispatch",
            elapsed_ms = started.elapsed().as_millis() as u64,
            succeeded = outcome.count(DispatchStatus::Success),
            total = outcome.len(),
            "dispatch complete"
        );

        outcome
    }
}

/// One provider's unit of work within a dispatch
struct Branch {
    index: usize,
    config: ProviderConfig,
    request: PreparedRequest,
    transport: Arc<dyn Transport>,
    normalizer: ResponseNormalizer,
    cancel: CancellationToken,
    started: Instant,
    deadline: Instant,
}

impl Branch {
    async fn run(self) -> CompletedUnit {
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BranchError::Cancelled),
            result = time::timeout_at(self.deadline, self.execute()) => {
                result.unwrap_or(Err(BranchError::Transport(TransportError::Timeout)))
            }
        };

        let latency = self.started.elapsed();
        let result = match outcome {
            Ok(normalized) => {
                info!(
                    target: "dispatch",
                    provider = %self.config.display_name,
                    tokens = normalized.token_count.unwrap_or(0),
                    latency_ms = latency.as_millis() as u64,
                    "response received"
                );
                DispatchResult::success(
                    &self.config,
                    normalized.text,
                    normalized.token_count,
                    latency,
                )
            }
            Err(error) => {
                warn!(
                    target: "dispatch",
                    provider = %self.config.display_name,
                    %error,
                    latency_ms = latency.as_millis() as u64,
                    "provider failed"
                );
                DispatchResult::failed(&self.config, error, latency)
            }
        };

        CompletedUnit {
            index: self.index,
            result,
        }
    }

    async fn execute(&self) -> std::result::Result<Normalized, BranchError> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        let raw = self
            .transport
            .send(
                &self.request.wire,
                &self.config.endpoint_url,
                self.request.api_key(),
                remaining,
            )
            .await?;

        Ok(self.normalizer.normalize(&raw, &self.config)?)
    }
}

fn preview(prompt: &str) -> String {
    let mut preview: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
    if prompt.chars().count() > PROMPT_PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}
