//! Result aggregation
//!
//! Puts branch outcomes, which arrive in completion order, back into provider
//! input order and stamps the dispatch timestamps.

use crate::error::BranchError;
use crate::llm::provider::{AggregatedOutcome, DispatchResult, ProviderConfig};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::warn;

/// Terminal outcome of one branch, tagged with its provider's input position
#[derive(Debug, Clone)]
pub struct CompletedUnit {
    pub index: usize,
    pub result: DispatchResult,
}

/// Assembles the caller-facing `AggregatedOutcome`
pub struct ResultAggregator;

impl ResultAggregator {
    /// Build the outcome; the result sequence always has one entry per provider
    pub fn aggregate(
        prompt: &str,
        providers: &[ProviderConfig],
        completed: Vec<CompletedUnit>,
        started_at: DateTime<Utc>,
    ) -> AggregatedOutcome {
        let mut slots: Vec<Option<DispatchResult>> = (0..providers.len()).map(|_| None).collect();

        for unit in completed {
            match slots.get_mut(unit.index) {
                Some(slot) if slot.is_none() => *slot = Some(unit.result),
                Some(_) => {
                    warn!(target: "dispatch", index = unit.index, "duplicate branch outcome ignored");
                }
                None => {
                    warn!(target: "dispatch", index = unit.index, "branch outcome for unknown provider ignored");
                }
            }
        }

        let results = slots
            .into_iter()
            .zip(providers)
            .map(|(slot, provider)| {
                slot.unwrap_or_else(|| {
                    DispatchResult::failed(
                        provider,
                        BranchError::Aborted("branch produced no result".to_string()),
                        Duration::ZERO,
                    )
                })
            })
            .collect();

        AggregatedOutcome::new(prompt, results, started_at, Utc::now())
    }
}
