//! Saved prompts

use crate::error::{ChatListError, Result};
use crate::storage::{like_pattern, Storage};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A prompt row
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PromptRecord {
    pub id: i64,
    pub text: String,
    pub tags: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Storage {
    /// Store a prompt and return its id
    pub async fn add_prompt(&self, text: &str, tags: Option<&str>) -> Result<i64> {
        if text.trim().is_empty() {
            return Err(ChatListError::InvalidInput(
                "prompt text must not be empty".to_string(),
            ));
        }

        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO prompts (text, tags, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        )
        .bind(text)
        .bind(tags)
        .bind(now)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    /// Newest prompts first, optionally filtered by text or tags
    pub async fn get_prompts(&self, search: Option<&str>, limit: i64) -> Result<Vec<PromptRecord>> {
        let prompts = sqlx::query_as::<_, PromptRecord>(
            r#"
            SELECT id, text, tags, created_at, updated_at FROM prompts
            WHERE ?1 IS NULL OR text LIKE ?1 OR tags LIKE ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            "#,
        )
        .bind(like_pattern(search))
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(prompts)
    }

    pub async fn get_prompt(&self, id: i64) -> Result<Option<PromptRecord>> {
        let prompt = sqlx::query_as::<_, PromptRecord>(
            "SELECT id, text, tags, created_at, updated_at FROM prompts WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(prompt)
    }

    /// Most recent prompt with exactly this text
    pub async fn find_prompt_by_text(&self, text: &str) -> Result<Option<PromptRecord>> {
        let prompt = sqlx::query_as::<_, PromptRecord>(
            r#"
            SELECT id, text, tags, created_at, updated_at FROM prompts
            WHERE text = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(text)
        .fetch_optional(self.pool())
        .await?;

        Ok(prompt)
    }

    pub async fn update_prompt(&self, id: i64, text: &str, tags: Option<&str>) -> Result<()> {
        let affected = sqlx::query(
            "UPDATE prompts SET text = ?1, tags = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(text)
        .bind(tags)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?
        .rows_affected();

        if affected == 0 {
            return Err(ChatListError::NotFound(format!("prompt {}", id)));
        }
        Ok(())
    }

    pub async fn delete_prompt(&self, id: i64) -> Result<()> {
        let affected = sqlx::query("DELETE FROM prompts WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(ChatListError::NotFound(format!("prompt {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prompt_lifecycle() {
        let storage = Storage::in_memory().await.unwrap();

        let id = storage
            .add_prompt("Explain ownership", Some("rust"))
            .await
            .unwrap();
        let prompt = storage.get_prompt(id).await.unwrap().unwrap();
        assert_eq!(prompt.text, "Explain ownership");
        assert_eq!(prompt.tags.as_deref(), Some("rust"));

        storage
            .update_prompt(id, "Explain borrowing", None)
            .await
            .unwrap();
        let prompt = storage.get_prompt(id).await.unwrap().unwrap();
        assert_eq!(prompt.text, "Explain borrowing");
        assert!(prompt.tags.is_none());
        assert!(prompt.updated_at >= prompt.created_at);

        storage.delete_prompt(id).await.unwrap();
        assert!(storage.get_prompt(id).await.unwrap().is_none());
        assert!(matches!(
            storage.delete_prompt(id).await,
            Err(ChatListError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_and_order() {
        let storage = Storage::in_memory().await.unwrap();
        storage.add_prompt("first question", None).await.unwrap();
        storage.add_prompt("second question", Some("tagged")).await.unwrap();
        storage.add_prompt("unrelated", None).await.unwrap();

        let all = storage.get_prompts(None, 10).await.unwrap();
        let texts: Vec<&str> = all.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["unrelated", "second question", "first question"]);

        let found = storage.get_prompts(Some("question"), 10).await.unwrap();
        assert_eq!(found.len(), 2);

        let by_tag = storage.get_prompts(Some("tagged"), 10).await.unwrap();
        assert_eq!(by_tag.len(), 1);

        let limited = storage.get_prompts(None, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_find_and_reject_empty() {
        let storage = Storage::in_memory().await.unwrap();
        let id = storage.add_prompt("same", None).await.unwrap();

        let found = storage.find_prompt_by_text("same").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(storage.find_prompt_by_text("other").await.unwrap().is_none());

        assert!(matches!(
            storage.add_prompt("  ", None).await,
            Err(ChatListError::InvalidInput(_))
        ));
    }
}
