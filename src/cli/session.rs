//! Result session
//!
//! Keeps the most recent dispatch outcome in memory so the user can pick which
//! answers to keep before anything touches the database.

use crate::error::{ChatListError, Result};
use crate::llm::provider::{AggregatedOutcome, DispatchResult};
use crate::storage::{NewResult, Storage};

/// One row of the session table
#[derive(Debug, Clone)]
pub struct SessionEntry {
    result: DispatchResult,
    selected: bool,
}

impl SessionEntry {
    pub fn result(&self) -> &DispatchResult {
        &self.result
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

/// Latest outcome plus the user's selection
#[derive(Debug, Default)]
pub struct ResultSession {
    prompt: Option<String>,
    entries: Vec<SessionEntry>,
}

impl ResultSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the session with a new outcome; nothing starts selected
    pub fn set_outcome(&mut self, outcome: AggregatedOutcome) {
        self.prompt = Some(outcome.prompt().to_string());
        self.entries = outcome
            .into_results()
            .into_iter()
            .map(|result| SessionEntry {
                result,
                selected: false,
            })
            .collect();
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&DispatchResult> {
        self.entries.get(index).map(|entry| &entry.result)
    }

    /// Flip the selection of one row and return its new state
    pub fn toggle(&mut self, index: usize) -> Result<bool> {
        let entry = self
            .entries
            .get_mut(index)
            .ok_or_else(|| ChatListError::NotFound(format!("result #{}", index + 1)))?;

        if !entry.result.is_success() {
            return Err(ChatListError::InvalidInput(format!(
                "result #{} has no answer to keep ({})",
                index + 1,
                entry.result.status()
            )));
        }

        entry.selected = !entry.selected;
        Ok(entry.selected)
    }

    /// Select every successful row, returning how many are selected
    pub fn select_all(&mut self) -> usize {
        for entry in &mut self.entries {
            entry.selected = entry.result.is_success();
        }
        self.selected().len()
    }

    pub fn deselect_all(&mut self) {
        for entry in &mut self.entries {
            entry.selected = false;
        }
    }

    /// Selected results, in provider order
    pub fn selected(&self) -> Vec<&DispatchResult> {
        self.entries
            .iter()
            .filter(|entry| entry.selected && entry.result.is_success())
            .map(|entry| &entry.result)
            .collect()
    }

    pub fn clear(&mut self) {
        self.prompt = None;
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist the selected results (and their prompt, if not stored yet)
    ///
    /// The selection is cleared afterwards so the same rows are not saved twice.
    pub async fn save(&mut self, storage: &Storage) -> Result<Vec<i64>> {
        let prompt = self
            .prompt
            .clone()
            .ok_or_else(|| ChatListError::InvalidInput("there are no results to save".to_string()))?;

        let selected = self.selected();
        if selected.is_empty() {
            return Err(ChatListError::InvalidInput(
                "no results selected; use /select first".to_string(),
            ));
        }

        let prompt_id = match storage.find_prompt_by_text(&prompt).await? {
            Some(existing) => existing.id,
            None => storage.add_prompt(&prompt, None).await?,
        };

        let rows: Vec<NewResult> = selected
            .iter()
            .filter_map(|result| {
                let response = result.response_text()?;
                Some(NewResult {
                    prompt_id: Some(prompt_id),
                    prompt_text: prompt.clone(),
                    model_id: result.provider_id().parse().ok(),
                    model_name: result.display_name().to_string(),
                    response: response.to_string(),
                    tokens: result.token_count().map(i64::from),
                })
            })
            .collect();

        let ids = storage.save_results(&rows).await?;
        self.deselect_all();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::aggregator::{CompletedUnit, ResultAggregator};
    use crate::error::BranchError;
    use crate::llm::provider::{ProviderConfig, ProviderKind};
    use chrono::Utc;
    use std::time::Duration;

    fn outcome() -> AggregatedOutcome {
        let providers: Vec<ProviderConfig> = ["GPT-4o", "Claude", "Broken"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                ProviderConfig::new(
                    (i + 1).to_string(),
                    *name,
                    ProviderKind::OpenAiCompatible,
                    "http://localhost",
                    "KEY",
                    "m",
                )
            })
            .collect();

        let completed = vec![
            CompletedUnit {
                index: 0,
                result: DispatchResult::success(&providers[0], "answer one", Some(12), Duration::ZERO),
            },
            CompletedUnit {
                index: 1,
                result: DispatchResult::success(&providers[1], "answer two", None, Duration::ZERO),
            },
            CompletedUnit {
                index: 2,
                result: DispatchResult::failed(&providers[2], BranchError::Cancelled, Duration::ZERO),
            },
        ];

        ResultAggregator::aggregate("What is Rust?", &providers, completed, Utc::now())
    }

    #[test]
    fn test_selection() {
        let mut session = ResultSession::new();
        assert!(session.is_empty());

        session.set_outcome(outcome());
        assert_eq!(session.entries().len(), 3);
        assert!(session.selected().is_empty());

        assert!(session.toggle(1).unwrap());
        assert_eq!(session.selected().len(), 1);
        assert!(!session.toggle(1).unwrap());

        assert!(matches!(session.toggle(2), Err(ChatListError::InvalidInput(_))));
        assert!(matches!(session.toggle(9), Err(ChatListError::NotFound(_))));

        assert_eq!(session.select_all(), 2);
        session.deselect_all();
        assert!(session.selected().is_empty());

        session.clear();
        assert!(session.is_empty());
        assert!(session.prompt().is_none());
    }

    #[tokio::test]
    async fn test_save_selected() {
        let storage = Storage::in_memory().await.unwrap();
        let mut session = ResultSession::new();
        session.set_outcome(outcome());

        assert!(matches!(
            session.save(&storage).await,
            Err(ChatListError::InvalidInput(_))
        ));

        session.select_all();
        let ids = session.save(&storage).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(session.selected().is_empty());

        let saved = storage.get_results(None, 10, 0).await.unwrap();
        assert_eq!(saved.len(), 2);
        assert!(saved.iter().all(|r| r.prompt_text == "What is Rust?"));
        let gpt = saved.iter().find(|r| r.model_name == "GPT-4o").unwrap();
        assert_eq!(gpt.model_id, Some(1));
        assert_eq!(gpt.tokens, Some(12));

        // The prompt is stored once even when saving again
        session.toggle(0).unwrap();
        session.save(&storage).await.unwrap();
        assert_eq!(storage.get_prompts(None, 10).await.unwrap().len(), 1);
    }
}
