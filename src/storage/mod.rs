//! Persistent storage
//!
//! SQLite database holding saved prompts, configured models, saved results
//! and runtime settings. Each table's operations live in their own module
//! as `impl Storage` blocks.

pub mod models;
pub mod prompts;
pub mod results;
pub mod settings;

pub use models::{validate_model, ModelRecord, NewModel};
pub use prompts::PromptRecord;
pub use results::{NewResult, ResultRecord};

use crate::error::{ChatListError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Database file name inside the data directory
const DATABASE_FILE: &str = "chatlist.db";

/// Schema statements, applied in order on every open
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS prompts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text TEXT NOT NULL,
        tags TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS models (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        provider TEXT NOT NULL,
        api_url TEXT NOT NULL,
        api_key_env TEXT NOT NULL,
        model_id TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        prompt_id INTEGER,
        prompt_text TEXT NOT NULL,
        model_id INTEGER,
        model_name TEXT NOT NULL,
        response TEXT NOT NULL,
        tokens INTEGER,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS settings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        key TEXT NOT NULL UNIQUE,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_prompts_created_at ON prompts(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_models_is_active ON models(is_active)",
    "CREATE INDEX IF NOT EXISTS idx_results_created_at ON results(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_results_model_id ON results(model_id)",
    "CREATE INDEX IF NOT EXISTS idx_results_prompt_id ON results(prompt_id)",
];

/// Handle to the ChatList database
#[derive(Debug, Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Open (creating if needed) the database file at `path`
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        debug!(path = %path.display(), "opened database");
        Self::with_pool(pool).await
    }

    /// Open a private in-memory database
    pub async fn in_memory() -> Result<Self> {
        // Every connection to :memory: is a separate database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Default database location: `<data dir>/chatlist/chatlist.db`
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            ChatListError::Config("Could not determine the data directory".to_string())
        })?;

        Ok(data_dir.join("chatlist").join(DATABASE_FILE))
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close all connections
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Wrap a search term for a `LIKE` match
pub(crate) fn like_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(|term| format!("%{}%", term))
}
