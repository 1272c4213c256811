//! REPL implementation
//!
//! This module implements the interactive Read-Eval-Print Loop for ChatList.

use crate::cli::command_menu::{self, MenuResult};
use crate::cli::commands::{self, format_error, Command, CommandType};
use crate::config::SharedState;
use crate::error::{ChatListError, Result};
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::Context;
use rustyline::Helper;
use rustyline::{CompletionType, Config, Editor};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Exit status used when Ctrl-C ends the process
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Cancellation token of the dispatch in flight, if any
#[derive(Clone, Default)]
struct ActiveDispatch(Arc<Mutex<Option<CancellationToken>>>);

impl ActiveDispatch {
    fn begin(&self) -> CancellationToken {
        let cancel = CancellationToken::new();
        if let Ok(mut slot) = self.0.lock() {
            *slot = Some(cancel.clone());
        }
        cancel
    }

    fn finish(&self) {
        if let Ok(mut slot) = self.0.lock() {
            *slot = None;
        }
    }

    /// Cancel the running dispatch; `false` when none is running
    fn interrupt(&self) -> bool {
        let running = self.0.lock().ok().and_then(|slot| slot.clone());
        match running {
            Some(cancel) => {
                cancel.cancel();
                true
            }
            None => false,
        }
    }
}

/// Handles SIGINT for the whole session
///
/// While a dispatch runs, Ctrl-C cancels it. Outside a dispatch the process
/// exits as it would without a handler. Line editing reads Ctrl-C as a key,
/// so this only sees interrupts while a command is executing.
fn spawn_interrupt_watcher(active: ActiveDispatch) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Ctrl-C handler unavailable");
                return;
            }
            if !active.interrupt() {
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        }
    });
}

/// ChatList command completer
struct ChatListCompleter {
    commands: Vec<String>,
}

impl Completer for ChatListCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &Context<'_>,
    ) -> std::result::Result<(usize, Vec<String>), ReadlineError> {
        // Only the command word is completed; prompts are free text
        if !line.starts_with('/') || line.contains(' ') {
            return Ok((0, vec![]));
        }

        let matches = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .cloned()
            .collect();
        Ok((0, matches))
    }
}

impl Hinter for ChatListCompleter {
    type Hint = String;
}

impl Highlighter for ChatListCompleter {}

impl Validator for ChatListCompleter {}

impl Helper for ChatListCompleter {}

/// What the loop should do after reading a line
enum LineOutcome {
    Input(String),
    Skip,
    Exit,
}

/// ChatList REPL
pub struct Repl {
    /// The rustyline editor
    editor: Editor<ChatListCompleter, DefaultHistory>,
    /// Whether the REPL should continue running
    running: bool,
    /// Shared application state
    state: SharedState,
    /// Where line history is persisted
    history_path: PathBuf,
    /// Dispatch that Ctrl-C cancels
    active: ActiveDispatch,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(state: SharedState) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .build();

        let mut editor = Editor::<ChatListCompleter, DefaultHistory>::with_config(config)
            .map_err(|e| ChatListError::Config(format!("Failed to initialize editor: {}", e)))?;

        editor.set_helper(Some(ChatListCompleter {
            commands: command_menu::command_names(),
        }));

        let history_path = dirs::home_dir()
            .map(|p| p.join(".chatlist").join("history"))
            .unwrap_or_else(|| ".chatlist-history".into());

        if let Err(e) = editor.load_history(&history_path) {
            debug!(path = %history_path.display(), error = %e, "no history loaded");
        }

        Ok(Self {
            editor,
            running: true,
            state,
            history_path,
            active: ActiveDispatch::default(),
        })
    }

    /// Run the REPL loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome().await;
        spawn_interrupt_watcher(self.active.clone());

        while self.running {
            let line = match self.read_line("> ", "") {
                LineOutcome::Input(line) => line,
                LineOutcome::Skip => continue,
                LineOutcome::Exit => break,
            };

            // A lone "/" opens the command menu
            let input = if line == "/" {
                match self.pick_from_menu() {
                    Some(input) => input,
                    None => continue,
                }
            } else {
                line
            };

            self.process(&input).await;
        }

        self.save_history();
        Ok(())
    }

    fn read_line(&mut self, prompt: &str, initial: &str) -> LineOutcome {
        let read = if initial.is_empty() {
            self.editor.readline(prompt)
        } else {
            self.editor.readline_with_initial(prompt, (initial, ""))
        };

        match read {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    LineOutcome::Skip
                } else {
                    LineOutcome::Input(line.to_string())
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                LineOutcome::Skip
            }
            Err(ReadlineError::Eof) => {
                println!();
                self.running = false;
                LineOutcome::Exit
            }
            Err(err) => {
                println!("Error: {:?}", err);
                self.running = false;
                LineOutcome::Exit
            }
        }
    }

    /// Show the command menu and read the completed command line
    fn pick_from_menu(&mut self) -> Option<String> {
        let initial = match command_menu::show_command_menu() {
            Ok(MenuResult::Command(cmd)) if command_menu::needs_args(&cmd) => format!("{} ", cmd),
            Ok(MenuResult::Command(cmd)) => cmd,
            Ok(MenuResult::TextInput) => "/".to_string(),
            Ok(MenuResult::Cancelled) => {
                println!();
                return None;
            }
            Err(e) => {
                println!("Error showing menu: {}", e);
                return None;
            }
        };

        match self.read_line("> ", &initial) {
            LineOutcome::Input(line) => Some(line),
            LineOutcome::Skip | LineOutcome::Exit => None,
        }
    }

    async fn process(&mut self, input: &str) {
        let _ = self.editor.add_history_entry(input);

        let command = match Command::parse(input) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", format_error(&e));
                return;
            }
        };

        match &command.command_type {
            CommandType::Prompt { text } => self.run_prompt(text).await,
            CommandType::UsePrompt { id } => {
                match commands::saved_prompt_text(*id, &self.state).await {
                    Ok(text) => {
                        println!("> {}", text);
                        self.run_prompt(&text).await;
                    }
                    Err(e) => println!("{}", format_error(&e)),
                }
            }
            CommandType::Quit => {
                if let Ok(msg) = commands::handle_command(&command, self.state.clone()).await {
                    println!("{}", msg);
                }
                self.running = false;
            }
            _ => match commands::handle_command(&command, self.state.clone()).await {
                Ok(msg) => println!("{}", msg),
                Err(e) => println!("{}", format_error(&e)),
            },
        }
    }

    /// Dispatch a prompt; Ctrl-C stops the requests still running
    async fn run_prompt(&mut self, text: &str) {
        let cancel = self.active.begin();

        println!("Waiting for answers... (Ctrl-C to cancel)");
        let outcome = commands::dispatch_prompt(text, &self.state, cancel.clone()).await;
        self.active.finish();

        if cancel.is_cancelled() {
            println!("Cancelled: unfinished requests were stopped.");
        }
        match outcome {
            Ok(table) => println!("{}", table),
            Err(e) => println!("{}", format_error(&e)),
        }
    }

    fn save_history(&mut self) {
        if let Some(parent) = self.history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = self.editor.save_history(&self.history_path) {
            debug!(path = %self.history_path.display(), error = %e, "history not saved");
        }
    }

    /// Print welcome message with ASCII art banner
    async fn print_welcome(&self) {
        println!();
        println!("  ██████╗██╗  ██╗ █████╗ ████████╗██╗     ██╗███████╗████████╗");
        println!(" ██╔════╝██║  ██║██╔══██╗╚══██╔══╝██║     ██║██╔════╝╚══██╔══╝");
        println!(" ██║     ███████║███████║   ██║   ██║     ██║███████╗   ██║   ");
        println!(" ██║     ██╔══██║██╔══██║   ██║   ██║     ██║╚════██║   ██║   ");
        println!(" ╚██████╗██║  ██║██║  ██║   ██║   ███████╗██║███████║   ██║   ");
        println!("  ╚═════╝╚═╝  ╚═╝╚═╝  ╚═╝   ╚═╝   ╚══════╝╚═╝╚══════╝   ╚═╝   ");
        println!();
        println!(
            "One prompt, many models. v{}",
            env!("CARGO_PKG_VERSION")
        );
        println!();

        let state = self.state.read().await;
        match state.storage.get_models(true).await {
            Ok(models) if models.is_empty() => {
                println!("No active models yet. Try /defaults, then /toggle <id>.");
            }
            Ok(models) => {
                let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
                println!("Active models: {}", names.join(", "));
            }
            Err(e) => println!("{}", format_error(&e)),
        }

        println!("Type a prompt to compare answers, / for commands, or /help.");
        println!();
    }
}
