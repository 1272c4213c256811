//! Result export
//!
//! Renders saved results as Markdown or pretty JSON and writes them to disk.

use crate::error::{ChatListError, Result};
use crate::storage::ResultRecord;
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Export file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
}

impl FromStr for ExportFormat {
    type Err = ChatListError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "json" => Ok(ExportFormat::Json),
            other => Err(ChatListError::InvalidInput(format!(
                "unknown export format '{}' (expected md or json)",
                other
            ))),
        }
    }
}

/// Markdown document with one section per result
pub fn to_markdown(results: &[ResultRecord]) -> String {
    let mut out = String::from("# ChatList History\n\n");

    for result in results {
        // Writing into a String cannot fail
        let _ = write!(
            out,
            "## {} - {}\n\n**Prompt:**\n\n{}\n\n**Response:**\n\n{}\n\n---\n\n",
            result.model_name,
            result.created_at.format("%Y-%m-%d %H:%M:%S"),
            result.prompt_text,
            result.response,
        );
    }

    out
}

pub fn to_json(results: &[ResultRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

/// Write `results` to `path`, returning the number of exported results
pub async fn export_results(
    results: &[ResultRecord],
    format: ExportFormat,
    path: &Path,
) -> Result<usize> {
    let content = match format {
        ExportFormat::Markdown => to_markdown(results),
        ExportFormat::Json => to_json(results)?,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await?;

    info!(count = results.len(), path = %path.display(), ?format, "results exported");
    Ok(results.len())
}
