//! Saved results

use crate::error::{ChatListError, Result};
use crate::storage::{like_pattern, Storage};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// A result the user chose to keep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResult {
    pub prompt_id: Option<i64>,
    pub prompt_text: String,
    pub model_id: Option<i64>,
    pub model_name: String,
    pub response: String,
    pub tokens: Option<i64>,
}

/// A result row
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct ResultRecord {
    pub id: i64,
    pub prompt_id: Option<i64>,
    pub prompt_text: String,
    pub model_id: Option<i64>,
    pub model_name: String,
    pub response: String,
    pub tokens: Option<i64>,
    pub created_at: DateTime<Utc>,
}

const RESULT_COLUMNS: &str =
    "id, prompt_id, prompt_text, model_id, model_name, response, tokens, created_at";

impl Storage {
    /// Store results atomically and return their ids in input order
    pub async fn save_results(&self, results: &[NewResult]) -> Result<Vec<i64>> {
        let now = Utc::now();
        let mut tx = self.pool().begin().await?;
        let mut ids = Vec::with_capacity(results.len());

        for result in results {
            let id = sqlx::query(
                r#"
                INSERT INTO results (prompt_id, prompt_text, model_id, model_name, response, tokens, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(result.prompt_id)
            .bind(&result.prompt_text)
            .bind(result.model_id)
            .bind(&result.model_name)
            .bind(&result.response)
            .bind(result.tokens)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
            ids.push(id);
        }

        tx.commit().await?;
        info!(count = ids.len(), "results saved");
        Ok(ids)
    }

    /// Newest results first, optionally filtered by prompt, model or response text
    pub async fn get_results(
        &self,
        search: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ResultRecord>> {
        let sql = format!(
            r#"
            SELECT {} FROM results
            WHERE ?1 IS NULL OR prompt_text LIKE ?1 OR model_name LIKE ?1 OR response LIKE ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2 OFFSET ?3
            "#,
            RESULT_COLUMNS
        );
        let results = sqlx::query_as::<_, ResultRecord>(&sql)
            .bind(like_pattern(search))
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await?;

        Ok(results)
    }

    pub async fn get_result(&self, id: i64) -> Result<Option<ResultRecord>> {
        let sql = format!("SELECT {} FROM results WHERE id = ?1", RESULT_COLUMNS);
        let result = sqlx::query_as::<_, ResultRecord>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(result)
    }

    pub async fn delete_result(&self, id: i64) -> Result<()> {
        let affected = sqlx::query("DELETE FROM results WHERE id = ?1")
            .bind(id)
            .execute(self.pool())
            .await?
            .rows_affected();

        if affected == 0 {
            return Err(ChatListError::NotFound(format!("result {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(model: &str, response: &str) -> NewResult {
        NewResult {
            prompt_id: None,
            prompt_text: "What is Rust?".to_string(),
            model_id: Some(1),
            model_name: model.to_string(),
            response: response.to_string(),
            tokens: Some(10),
        }
    }

    #[tokio::test]
    async fn test_save_and_fetch() {
        let storage = Storage::in_memory().await.unwrap();

        let ids = storage
            .save_results(&[
                result("GPT-4o", "A systems language"),
                result("Claude", "A language about ownership"),
            ])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids[0] < ids[1]);

        let stored = storage.get_result(ids[1]).await.unwrap().unwrap();
        assert_eq!(stored.model_name, "Claude");
        assert_eq!(stored.tokens, Some(10));

        let all = storage.get_results(None, 10, 0).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, ids[1]);

        let page = storage.get_results(None, 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, ids[0]);
    }

    #[tokio::test]
    async fn test_search() {
        let storage = Storage::in_memory().await.unwrap();
        storage
            .save_results(&[
                result("GPT-4o", "A systems language"),
                result("Claude", "About ownership"),
            ])
            .await
            .unwrap();

        assert_eq!(storage.get_results(Some("ownership"), 10, 0).await.unwrap().len(), 1);
        assert_eq!(storage.get_results(Some("gpt"), 10, 0).await.unwrap().len(), 1);
        assert_eq!(storage.get_results(Some("Rust"), 10, 0).await.unwrap().len(), 2);
        assert!(storage.get_results(Some("python"), 10, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let storage = Storage::in_memory().await.unwrap();
        let ids = storage.save_results(&[result("m", "r")]).await.unwrap();

        storage.delete_result(ids[0]).await.unwrap();
        assert!(storage.get_result(ids[0]).await.unwrap().is_none());
        assert!(matches!(
            storage.delete_result(ids[0]).await,
            Err(ChatListError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_save_nothing() {
        let storage = Storage::in_memory().await.unwrap();
        assert!(storage.save_results(&[]).await.unwrap().is_empty());
    }
}
