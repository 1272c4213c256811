//! Configured models
//!
//! A model row describes one provider endpoint. Active rows become the
//! `ProviderConfig` list of a dispatch.

use crate::error::{ChatListError, ConfigError, Result};
use crate::llm::keys::ApiKeySource;
use crate::llm::provider::{ProviderConfig, ProviderKind};
use crate::storage::Storage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// A model as entered by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewModel {
    pub name: String,
    /// Provider kind name, see `ProviderKind::from_str`
    pub provider: String,
    pub api_url: String,
    pub api_key_env: String,
    pub model_id: String,
    pub is_active: bool,
}

impl NewModel {
    pub fn new(
        name: impl Into<String>,
        provider: impl Into<String>,
        api_url: impl Into<String>,
        api_key_env: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            api_url: api_url.into(),
            api_key_env: api_key_env.into(),
            model_id: model_id.into(),
            is_active: true,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Check that every field is filled in and the provider kind is known
    pub fn check_fields(&self) -> Result<ProviderKind> {
        let fields = [
            ("name", &self.name),
            ("provider", &self.provider),
            ("api_url", &self.api_url),
            ("api_key_env", &self.api_key_env),
            ("model_id", &self.model_id),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(ChatListError::InvalidInput(format!(
                    "model field '{}' must not be empty",
                    field
                )));
            }
        }

        Ok(self.provider.parse::<ProviderKind>()?)
    }
}

/// Validate a model, including that its API key is available
pub fn validate_model(model: &NewModel, keys: &dyn ApiKeySource) -> Result<()> {
    model.check_fields()?;

    match keys.lookup(&model.api_key_env)? {
        Some(_) => Ok(()),
        None => Err(ConfigError::MissingApiKey {
            provider: model.name.clone(),
            env_var: model.api_key_env.clone(),
        }
        .into()),
    }
}

/// A model row
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ModelRecord {
    pub id: i64,
    pub name: String,
    pub provider: String,
    pub api_url: String,
    pub api_key_env: String,
    pub model_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ModelRecord {
    /// Provider configuration for dispatch; `id` is the row id
    pub fn to_provider_config(&self) -> Result<ProviderConfig> {
        let kind = self.provider.parse::<ProviderKind>()?;
        Ok(ProviderConfig::new(
            self.id.to_string(),
            self.name.clone(),
            kind,
            self.api_url.clone(),
            self.api_key_env.clone(),
            self.model_id.clone(),
        )
        .with_active(self.is_active))
    }
}

/// Models seeded by `/defaults`
fn default_models() -> Vec<NewModel> {
    vec![
        NewModel::new(
            "GPT-4o",
            "openai",
            "https://api.openai.com/v1/chat/completions",
            "OPENAI_API_KEY",
            "gpt-4o",
        ),
        NewModel::new(
            "GPT-4o-mini",
            "openai",
            "https://api.openai.com/v1/chat/completions",
            "OPENAI_API_KEY",
            "gpt-4o-mini",
        ),
        NewModel::new(
            "Claude 3.5 Sonnet",
            "anthropic",
            "https://api.anthropic.com/v1/messages",
            "ANTHROPIC_API_KEY",
            "claude-3-5-sonnet-20241022",
        ),
        NewModel::new(
            "DeepSeek Chat",
            "deepseek",
            "https://api.deepseek.com/v1/chat/completions",
            "DEEPSEEK_API_KEY",
            "deepseek-chat",
        ),
        NewModel::new(
            "Groq Llama 3.1 70B",
            "groq",
            "https://api.groq.com/openai/v1/chat/completions",
            "GROQ_API_KEY",
            "llama-3.1-70b-versatile",
        ),
    ]
    .into_iter()
    .map(NewModel::inactive)
    .collect()
}

const MODEL_COLUMNS: &str =
    "id, name, provider, api_url, api_key_env, model_id, is_active, created_at";

impl Storage {
    /// Insert a model and return its id
    pub async fn add_model(&self, model: &NewModel) -> Result<i64> {
        let kind = model.check_fields()?;

        let id = sqlx::query(
            r#"
            INSERT INTO models (name, provider, api_url, api_key_env, model_id, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(model.name.trim())
        .bind(kind.as_str())
        .bind(model.api_url.trim())
        .bind(model.api_key_env.trim())
        .bind(model.model_id.trim())
        .bind(model.is_active)
        .bind(Utc::now())
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        info!(model = %model.name, id, "model added");
        Ok(id)
    }

    /// All models, or only the active ones, in insertion order
    pub async fn get_models(&self, active_only: bool) -> Result<Vec<ModelRecord>> {
        let sql = format!(
            "SELECT {} FROM models WHERE ?1 = 0 OR is_active = 1 ORDER BY id",
            MODEL_COLUMNS
        );
        let models = sqlx::query_as::<_, ModelRecord>(&sql)
            .bind(active_only)
            .fetch_all(self.pool())
            .await?;

        Ok(models)
    }

    pub async fn get_model(&self, id: i64) -> Result<Option<ModelRecord>> {
        let sql = format!("SELECT {} FROM models WHERE id = ?1", MODEL_COLUMNS);
        let model = sqlx::query_as::<_, ModelRecord>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(model)
    }

    pub async fn update_model(&self, id: i64, model: &NewModel) -> Result<()> {
        let kind = model.check_fields()?;

        let affected = sqlx::query(
            r#"
            UPDATE models
            SET name = ?1, provider = ?2, api_url = ?3, api_key_env = ?4, model_id = ?5, is_active = ?6
            WHERE id = ?7
            "#,
        )
        .bind(model.name.trim())
        .bind(kind.as_str())
        .bind(model.api_url.trim())
        .bind(model.api_key_env.trim())
        .bind(model.model_id.trim())
        .bind(model.is_active)
        .bind(id)
        .execute(self.pool())
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(ChatListError::NotFound(format!("model {}", id)));
        }
        Ok(())
    }

    /// Flip a model's active flag and return the new state
    pub async fn toggle_model_active(&self, id: i64) -> Result<bool> {
        let row: Option<(bool,)> = sqlx::query_as(
            "UPDATE models SET is_active = 1 - is_active WHERE id = ?1 RETURNING is_active",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(|(active,)| active)
            .ok_or_else(|| ChatListError::NotFound(format!("model {}", id)))
    }

    pub async fn delete_model(&self, id: i64) -> Result<()> {
        let affected = sqlx::query("DELETE FROM models WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(ChatListError::NotFound(format!("model {}", id)));
        }
        Ok(())
    }

    /// Provider configurations of all active models
    ///
    /// Rows whose provider kind no longer parses are logged and left out.
    pub async fn active_providers(&self) -> Result<Vec<ProviderConfig>> {
        let providers = self
            .get_models(true)
            .await?
            .iter()
            .filter_map(|model| match model.to_provider_config() {
                Ok(config) => Some(config),
                Err(error) => {
                    warn!(model = %model.name, %error, "ignoring model with invalid configuration");
                    None
                }
            })
            .collect();

        Ok(providers)
    }

    /// Insert the built-in models that are not present yet (matched by name)
    ///
    /// Returns the number of models inserted. Seeded models start inactive.
    pub async fn add_default_models(&self) -> Result<usize> {
        let existing: Vec<String> = self
            .get_models(false)
            .await?
            .into_iter()
            .map(|model| model.name)
            .collect();

        let mut added = 0;
        for model in default_models() {
            if existing.iter().any(|name| name == &model.name) {
                continue;
            }
            self.add_model(&model).await?;
            added += 1;
        }

        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::keys::StaticKeySource;

    fn gpt() -> NewModel {
        NewModel::new(
            "GPT-4o",
            "openai",
            "https://api.openai.com/v1/chat/completions",
            "OPENAI_API_KEY",
            "gpt-4o",
        )
    }

    #[test]
    fn test_validate_model() {
        let keys = StaticKeySource::new().with_key("OPENAI_API_KEY", "sk-test");
        assert!(validate_model(&gpt(), &keys).is_ok());

        let mut blank = gpt();
        blank.model_id = " ".to_string();
        assert!(matches!(
            validate_model(&blank, &keys),
            Err(ChatListError::InvalidInput(msg)) if msg.contains("model_id")
        ));

        let mut unknown = gpt();
        unknown.provider = "google".to_string();
        assert!(matches!(
            validate_model(&unknown, &keys),
            Err(ChatListError::Provider(ConfigError::UnknownProviderKind(_)))
        ));

        assert!(matches!(
            validate_model(&gpt(), &StaticKeySource::new()),
            Err(ChatListError::Provider(ConfigError::MissingApiKey { .. }))
        ));
    }

    #[tokio::test]
    async fn test_model_crud() {
        let storage = Storage::in_memory().await.unwrap();

        let id = storage.add_model(&gpt()).await.unwrap();
        let stored = storage.get_model(id).await.unwrap().unwrap();
        assert_eq!(stored.name, "GPT-4o");
        assert_eq!(stored.provider, "openai-compatible");
        assert!(stored.is_active);

        assert!(!storage.toggle_model_active(id).await.unwrap());
        assert!(storage.get_models(true).await.unwrap().is_empty());
        assert_eq!(storage.get_models(false).await.unwrap().len(), 1);
        assert!(storage.toggle_model_active(id).await.unwrap());

        let mut renamed = gpt();
        renamed.name = "GPT-4o (work)".to_string();
        storage.update_model(id, &renamed).await.unwrap();
        assert_eq!(
            storage.get_model(id).await.unwrap().unwrap().name,
            "GPT-4o (work)"
        );

        storage.delete_model(id).await.unwrap();
        assert!(storage.get_model(id).await.unwrap().is_none());
        assert!(matches!(
            storage.toggle_model_active(id).await,
            Err(ChatListError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_active_providers() {
        let storage = Storage::in_memory().await.unwrap();
        let id = storage.add_model(&gpt()).await.unwrap();
        storage
            .add_model(
                &NewModel::new("Claude", "anthropic", "https://x", "ANTHROPIC_API_KEY", "c")
                    .inactive(),
            )
            .await
            .unwrap();

        let providers = storage.active_providers().await.unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].id, id.to_string());
        assert_eq!(providers[0].kind, ProviderKind::OpenAiCompatible);
        assert_eq!(providers[0].model, "gpt-4o");
        assert!(providers[0].is_active);
    }

    #[tokio::test]
    async fn test_add_default_models_skips_existing() {
        let storage = Storage::in_memory().await.unwrap();
        storage.add_model(&gpt()).await.unwrap();

        let added = storage.add_default_models().await.unwrap();
        assert_eq!(added, 4);

        let models = storage.get_models(false).await.unwrap();
        assert_eq!(models.len(), 5);
        assert!(models.iter().skip(1).all(|m| !m.is_active));

        assert_eq!(storage.add_default_models().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejects_invalid_model() {
        let storage = Storage::in_memory().await.unwrap();
        let mut bad = gpt();
        bad.api_url.clear();

        assert!(matches!(
            storage.add_model(&bad).await,
            Err(ChatListError::InvalidInput(_))
        ));
    }
}
