//! Command handlers for CLI
//!
//! This module implements all `/` commands for the ChatList CLI. Any input
//! without a leading `/` is a prompt, sent to every active model.

use crate::cli::render;
use crate::config::{parse_max_tokens, parse_timeout_seconds, SharedState};
use crate::error::{ChatListError, Result};
use crate::export::{self, ExportFormat};
use crate::storage::{validate_model, NewModel};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Number of rows shown by `/history` and `/prompts`
const LIST_LIMIT: i64 = 20;

/// Upper bound of results written by `/export`
const EXPORT_LIMIT: i64 = 10_000;

/// Which session rows `/select` acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// 1-based row number as displayed
    Row(usize),
    All,
    None,
}

/// Command types
#[derive(Debug, Clone, PartialEq)]
pub enum CommandType {
    /// Send a prompt to all active models
    Prompt { text: String },
    /// List configured models
    Models,
    /// Add a model
    AddModel { model: NewModel },
    /// Enable or disable a model
    Toggle { id: i64 },
    /// Remove a model
    DeleteModel { id: i64 },
    /// Seed the built-in model list
    Defaults,
    /// Change which answers will be saved
    Select(Selection),
    /// Save the selected answers
    Save,
    /// Print one answer in full
    Show { row: usize },
    /// Drop the current results
    Clear,
    /// List saved results
    History { search: Option<String> },
    /// List saved prompts
    Prompts { search: Option<String> },
    /// Store the current prompt, optionally tagged
    SavePrompt { tags: Option<String> },
    /// Send a saved prompt again
    UsePrompt { id: i64 },
    /// Remove a saved prompt
    DeletePrompt { id: i64 },
    /// Delete a saved result
    DeleteResult { id: i64 },
    /// Write saved results to a file
    Export {
        format: ExportFormat,
        path: PathBuf,
        search: Option<String>,
    },
    /// Change the request timeout
    Timeout { timeout: Duration },
    /// Change the token limit
    MaxTokens { max_tokens: u32 },
    /// Show current settings
    Settings,
    /// Show help message
    Help,
    /// Exit the application
    Quit,
}

/// Parsed command
#[derive(Debug, Clone)]
pub struct Command {
    /// The type of command
    pub command_type: CommandType,
}

fn syntax(command: &str, expected: &str) -> ChatListError {
    ChatListError::InvalidCommandSyntax {
        command: command.to_string(),
        expected: expected.to_string(),
    }
}

fn parse_id(command: &str, expected: &str, value: Option<&str>) -> Result<i64> {
    value
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| syntax(command, expected))
}

fn parse_row(command: &str, expected: &str, value: Option<&str>) -> Result<usize> {
    value
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|row| *row > 0)
        .ok_or_else(|| syntax(command, expected))
}

fn optional_text(rest: &str) -> Option<String> {
    let rest = rest.trim();
    (!rest.is_empty()).then(|| rest.to_string())
}

impl Command {
    /// Parse a command from user input
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let Some(body) = input.strip_prefix('/') else {
            return Ok(Command {
                command_type: CommandType::Prompt {
                    text: input.to_string(),
                },
            });
        };

        let (name, rest) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
        let cmd = format!("/{}", name);
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command_type = match cmd.as_str() {
            "/models" => CommandType::Models,
            "/add-model" => {
                const USAGE: &str = "/add-model <name> <kind> <api_url> <api_key_env> <model_id>";
                if args.len() < 5 {
                    return Err(syntax(&cmd, USAGE));
                }
                // The name may contain spaces; the last four arguments never do
                let split = args.len() - 4;
                CommandType::AddModel {
                    model: NewModel::new(
                        args[..split].join(" "),
                        args[split],
                        args[split + 1],
                        args[split + 2],
                        args[split + 3],
                    ),
                }
            }
            "/toggle" => CommandType::Toggle {
                id: parse_id(&cmd, "/toggle <model_id>", args.first().copied())?,
            },
            "/delete-model" => CommandType::DeleteModel {
                id: parse_id(&cmd, "/delete-model <model_id>", args.first().copied())?,
            },
            "/defaults" => CommandType::Defaults,
            "/select" => {
                const USAGE: &str = "/select <n|all|none>";
                let selection = match args.first().copied() {
                    Some("all") => Selection::All,
                    Some("none") => Selection::None,
                    other => Selection::Row(parse_row(&cmd, USAGE, other)?),
                };
                CommandType::Select(selection)
            }
            "/save" => CommandType::Save,
            "/show" => CommandType::Show {
                row: parse_row(&cmd, "/show <n>", args.first().copied())?,
            },
            "/clear" => CommandType::Clear,
            "/history" => CommandType::History {
                search: optional_text(rest),
            },
            "/prompts" => CommandType::Prompts {
                search: optional_text(rest),
            },
            "/save-prompt" => CommandType::SavePrompt {
                tags: optional_text(rest),
            },
            "/use-prompt" => CommandType::UsePrompt {
                id: parse_id(&cmd, "/use-prompt <prompt_id>", args.first().copied())?,
            },
            "/delete-prompt" => CommandType::DeletePrompt {
                id: parse_id(&cmd, "/delete-prompt <prompt_id>", args.first().copied())?,
            },
            "/delete-result" => CommandType::DeleteResult {
                id: parse_id(&cmd, "/delete-result <result_id>", args.first().copied())?,
            },
            "/export" => {
                const USAGE: &str = "/export <md|json> <path> [search]";
                if args.len() < 2 {
                    return Err(syntax(&cmd, USAGE));
                }
                let search = args[2..].join(" ");
                CommandType::Export {
                    format: args[0].parse()?,
                    path: PathBuf::from(args[1]),
                    search: optional_text(&search),
                }
            }
            "/timeout" => {
                let value = args.first().ok_or_else(|| syntax(&cmd, "/timeout <seconds>"))?;
                CommandType::Timeout {
                    timeout: parse_timeout_seconds("timeout", value)?,
                }
            }
            "/max-tokens" => {
                let value = args.first().ok_or_else(|| syntax(&cmd, "/max-tokens <n>"))?;
                CommandType::MaxTokens {
                    max_tokens: parse_max_tokens("max tokens", value)?,
                }
            }
            "/settings" => CommandType::Settings,
            "/help" => CommandType::Help,
            "/quit" | "/exit" => CommandType::Quit,
            _ => return Err(ChatListError::UnknownCommand(cmd)),
        };

        Ok(Command { command_type })
    }
}

/// Send a prompt to every active model and show the answers
///
/// Running branches stop as soon as `cancel` fires; the partial outcome still
/// replaces the session.
pub async fn dispatch_prompt(
    text: &str,
    state: &SharedState,
    cancel: CancellationToken,
) -> Result<String> {
    let (dispatcher, providers, timeout) = {
        let state = state.read().await;
        (
            state.dispatcher.clone(),
            state.storage.active_providers().await?,
            state.timeout(),
        )
    };

    if providers.is_empty() {
        return Err(ChatListError::InvalidInput(
            "no active models; add one with /add-model or /defaults, then enable it with /toggle"
                .to_string(),
        ));
    }

    let outcome = dispatcher
        .dispatch_with_cancellation(text, &providers, timeout, cancel)
        .await?;

    let mut state = state.write().await;
    state.session.set_outcome(outcome);
    Ok(format!(
        "{}\nUse /select <n|all> then /save to keep answers, /show <n> to read one in full.",
        render::session_table(&state.session)
    ))
}

/// Text of a saved prompt
pub async fn saved_prompt_text(id: i64, state: &SharedState) -> Result<String> {
    let state = state.read().await;
    state
        .storage
        .get_prompt(id)
        .await?
        .map(|prompt| prompt.text)
        .ok_or_else(|| ChatListError::NotFound(format!("prompt {}", id)))
}

/// Handle a command and return the result message
pub async fn handle_command(command: &Command, state: SharedState) -> Result<String> {
    match &command.command_type {
        CommandType::Prompt { text } => {
            dispatch_prompt(text, &state, CancellationToken::new()).await
        }
        CommandType::Models => {
            let state = state.read().await;
            let models = state.storage.get_models(false).await?;
            if models.is_empty() {
                return Ok("No models configured. Use /add-model or /defaults.".to_string());
            }
            Ok(render::models_table(&models, state.keys()))
        }
        CommandType::AddModel { model } => {
            model.check_fields()?;
            let state = state.read().await;
            let warning = match validate_model(model, state.keys()) {
                Ok(()) => String::new(),
                Err(e) => format!("\nWarning: {}", e),
            };
            let id = state.storage.add_model(model).await?;
            Ok(format!("✓ Model '{}' added with id {}{}", model.name, id, warning))
        }
        CommandType::Toggle { id } => {
            let state = state.read().await;
            let active = state.storage.toggle_model_active(*id).await?;
            Ok(format!(
                "✓ Model {} is now {}",
                id,
                if active { "active" } else { "inactive" }
            ))
        }
        CommandType::DeleteModel { id } => {
            let state = state.read().await;
            state.storage.delete_model(*id).await?;
            Ok(format!("✓ Model {} deleted", id))
        }
        CommandType::Defaults => {
            let state = state.read().await;
            let added = state.storage.add_default_models().await?;
            Ok(format!(
                "✓ Added {} default model(s), all inactive. Enable them with /toggle <id>.",
                added
            ))
        }
        CommandType::Select(selection) => {
            let mut state = state.write().await;
            if state.session.is_empty() {
                return Err(ChatListError::InvalidInput(
                    "there are no results to select; send a prompt first".to_string(),
                ));
            }
            match selection {
                Selection::Row(row) => {
                    state.session.toggle(row - 1)?;
                }
                Selection::All => {
                    state.session.select_all();
                }
                Selection::None => state.session.deselect_all(),
            }
            Ok(render::session_table(&state.session))
        }
        CommandType::Save => {
            let mut state = state.write().await;
            let state = &mut *state;
            let ids = state.session.save(&state.storage).await?;
            Ok(format!("✓ Saved {} result(s)", ids.len()))
        }
        CommandType::Show { row } => {
            let state = state.read().await;
            let result = state
                .session
                .get(row - 1)
                .ok_or_else(|| ChatListError::NotFound(format!("result #{}", row)))?;
            let body = result
                .response_text()
                .map(str::to_string)
                .unwrap_or_else(|| result.summary());
            Ok(format!(
                "── {} ({}) ──\n{}",
                result.display_name(),
                result.status(),
                body
            ))
        }
        CommandType::Clear => {
            state.write().await.session.clear();
            Ok("✓ Results cleared".to_string())
        }
        CommandType::History { search } => {
            let state = state.read().await;
            let results = state
                .storage
                .get_results(search.as_deref(), LIST_LIMIT, 0)
                .await?;
            if results.is_empty() {
                return Ok("No saved results.".to_string());
            }
            Ok(render::results_table(&results))
        }
        CommandType::Prompts { search } => {
            let state = state.read().await;
            let prompts = state.storage.get_prompts(search.as_deref(), LIST_LIMIT).await?;
            if prompts.is_empty() {
                return Ok("No saved prompts.".to_string());
            }
            Ok(render::prompts_table(&prompts))
        }
        CommandType::SavePrompt { tags } => {
            let state = state.read().await;
            let text = state.session.prompt().ok_or_else(|| {
                ChatListError::InvalidInput("there is no prompt to save; send one first".to_string())
            })?;
            match state.storage.find_prompt_by_text(text).await? {
                Some(existing) => {
                    let tags = tags.as_deref().or(existing.tags.as_deref());
                    state.storage.update_prompt(existing.id, text, tags).await?;
                    Ok(format!("✓ Prompt {} updated", existing.id))
                }
                None => {
                    let id = state.storage.add_prompt(text, tags.as_deref()).await?;
                    Ok(format!("✓ Prompt saved with id {}", id))
                }
            }
        }
        CommandType::UsePrompt { id } => {
            let text = saved_prompt_text(*id, &state).await?;
            dispatch_prompt(&text, &state, CancellationToken::new()).await
        }
        CommandType::DeletePrompt { id } => {
            let state = state.read().await;
            state.storage.delete_prompt(*id).await?;
            Ok(format!("✓ Prompt {} deleted", id))
        }
        CommandType::DeleteResult { id } => {
            let state = state.read().await;
            state.storage.delete_result(*id).await?;
            Ok(format!("✓ Result {} deleted", id))
        }
        CommandType::Export {
            format,
            path,
            search,
        } => {
            let state = state.read().await;
            let results = state
                .storage
                .get_results(search.as_deref(), EXPORT_LIMIT, 0)
                .await?;
            let count = export::export_results(&results, *format, path).await?;
            Ok(format!("✓ Exported {} result(s) to {}", count, path.display()))
        }
        CommandType::Timeout { timeout } => {
            state.write().await.set_timeout(*timeout).await?;
            Ok(format!("✓ Request timeout set to {}s", timeout.as_secs()))
        }
        CommandType::MaxTokens { max_tokens } => {
            state.write().await.set_max_tokens(*max_tokens).await?;
            Ok(format!("✓ Max tokens set to {}", max_tokens))
        }
        CommandType::Settings => {
            let state = state.read().await;
            let database = state
                .config
                .database_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "-".to_string());
            let rows = vec![
                ("request_timeout".to_string(), format!("{}s", state.timeout().as_secs())),
                ("max_tokens".to_string(), state.max_tokens().to_string()),
                ("log_level".to_string(), state.config.log_level.clone()),
                ("database".to_string(), database),
            ];
            Ok(render::settings_table(&rows))
        }
        CommandType::Help => Ok(HELP.to_string()),
        CommandType::Quit => Ok("Goodbye!".to_string()),
    }
}

const HELP: &str = r#"
ChatList Commands

Prompts:
  <text>                 Send the text to every active model

Models:
  /models                List configured models
  /add-model <name> <kind> <api_url> <api_key_env> <model_id>
                         Add a model (kind: openai-compatible, anthropic, custom)
  /toggle <id>           Enable or disable a model
  /delete-model <id>     Remove a model
  /defaults              Add the built-in model list (inactive)

Results:
  /select <n|all|none>   Choose which answers to keep
  /save                  Save the selected answers
  /show <n>              Print answer n in full
  /clear                 Drop the current answers

History:
  /history [search]      List saved results
  /prompts [search]      List saved prompts
  /save-prompt [tags]    Save the current prompt (re-tags it if already saved)
  /use-prompt <id>       Send a saved prompt again
  /delete-prompt <id>    Delete a saved prompt
  /delete-result <id>    Delete a saved result
  /export <md|json> <path> [search]
                         Write saved results to a file

Settings:
  /timeout <seconds>     Per-request timeout
  /max-tokens <n>        Maximum tokens per answer
  /settings              Show current settings

Session:
  /help                  Show this help message
  /quit, /exit           Exit ChatList

API keys are read from the environment variable named by each model
(a .env file in the working directory is loaded at startup).
Press Ctrl-C while waiting for answers to cancel the running requests.
"#;

/// Format an error for display
pub fn format_error(error: &ChatListError) -> String {
    format!("Error: {}", error)
}
