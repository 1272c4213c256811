//! Table rendering for REPL output

use crate::cli::session::ResultSession;
use crate::llm::keys::ApiKeySource;
use crate::llm::provider::{DispatchResult, DispatchStatus};
use crate::storage::{ModelRecord, PromptRecord, ResultRecord};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};

/// Characters of an answer shown in table cells
const PREVIEW_CHARS: usize = 80;

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Shorten to one line of at most `max` characters
pub fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut short: String = flat.chars().take(max.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

fn status_cell(result: &DispatchResult) -> Cell {
    let color = match result.status() {
        DispatchStatus::Success => Color::Green,
        DispatchStatus::Timeout => Color::Yellow,
        DispatchStatus::Error => Color::Red,
        DispatchStatus::Skipped => Color::DarkGrey,
    };
    Cell::new(result.status()).fg(color)
}

/// Latest dispatch with selection markers
pub fn session_table(session: &ResultSession) -> String {
    let mut table = table(vec!["#", "Keep", "Model", "Status", "Tokens", "Time", "Answer"]);

    for (i, entry) in session.entries().iter().enumerate() {
        let result = entry.result();
        let answer = match result.response_text() {
            Some(text) => preview(text, PREVIEW_CHARS),
            None => result.summary(),
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(if entry.is_selected() { "[x]" } else { "[ ]" }),
            Cell::new(result.display_name()),
            status_cell(result),
            Cell::new(
                result
                    .token_count()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(format!("{:.1}s", result.latency().as_secs_f64())),
            Cell::new(answer),
        ]);
    }

    table.to_string()
}

/// Configured models, including whether each key is available
pub fn models_table(models: &[ModelRecord], keys: &dyn ApiKeySource) -> String {
    let mut table = table(vec!["ID", "Name", "Kind", "Model", "Key variable", "Key", "Active"]);

    for model in models {
        let key_status = match keys.lookup(&model.api_key_env) {
            Ok(Some(_)) => "set",
            Ok(None) => "missing",
            Err(_) => "unreadable",
        };
        table.add_row(vec![
            Cell::new(model.id),
            Cell::new(&model.name),
            Cell::new(&model.provider),
            Cell::new(&model.model_id),
            Cell::new(&model.api_key_env),
            Cell::new(key_status),
            Cell::new(if model.is_active { "yes" } else { "no" }),
        ]);
    }

    table.to_string()
}

pub fn results_table(results: &[ResultRecord]) -> String {
    let mut table = table(vec!["ID", "Saved", "Model", "Prompt", "Response"]);

    for result in results {
        table.add_row(vec![
            Cell::new(result.id),
            Cell::new(result.created_at.format("%Y-%m-%d %H:%M")),
            Cell::new(&result.model_name),
            Cell::new(preview(&result.prompt_text, 40)),
            Cell::new(preview(&result.response, PREVIEW_CHARS)),
        ]);
    }

    table.to_string()
}

pub fn prompts_table(prompts: &[PromptRecord]) -> String {
    let mut table = table(vec!["ID", "Created", "Tags", "Prompt"]);

    for prompt in prompts {
        table.add_row(vec![
            Cell::new(prompt.id),
            Cell::new(prompt.created_at.format("%Y-%m-%d %H:%M")),
            Cell::new(prompt.tags.as_deref().unwrap_or("")),
            Cell::new(preview(&prompt.text, PREVIEW_CHARS)),
        ]);
    }

    table.to_string()
}

pub fn settings_table(rows: &[(String, String)]) -> String {
    let mut table = table(vec!["Setting", "Value"]);
    for (key, value) in rows {
        table.add_row(vec![key, value]);
    }
    table.to_string()
}
