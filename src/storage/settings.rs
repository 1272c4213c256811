//! Runtime settings
//!
//! Key/value pairs that override the config file and survive restarts.

use crate::error::Result;
use crate::storage::Storage;
use chrono::Utc;

/// Per-request timeout in seconds
pub const REQUEST_TIMEOUT: &str = "request_timeout";

/// Maximum tokens requested from each provider
pub const MAX_TOKENS: &str = "max_tokens";

impl Storage {
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Insert or replace a setting
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// All settings, sorted by key
    pub async fn get_all_settings(&self) -> Result<Vec<(String, String)>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM settings ORDER BY key")
                .fetch_all(self.pool())
                .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert() {
        let storage = Storage::in_memory().await.unwrap();
        assert!(storage.get_setting(REQUEST_TIMEOUT).await.unwrap().is_none());

        storage.set_setting(REQUEST_TIMEOUT, "60").await.unwrap();
        storage.set_setting(REQUEST_TIMEOUT, "30").await.unwrap();
        storage.set_setting(MAX_TOKENS, "1024").await.unwrap();

        assert_eq!(
            storage.get_setting(REQUEST_TIMEOUT).await.unwrap().as_deref(),
            Some("30")
        );
        assert_eq!(
            storage.get_all_settings().await.unwrap(),
            vec![
                (MAX_TOKENS.to_string(), "1024".to_string()),
                (REQUEST_TIMEOUT.to_string(), "30".to_string()),
            ]
        );
    }
}
