//! Command Menu (TUI popup)
//!
//! Popup list of commands shown when the user types a lone "/". Typing
//! narrows the list; Enter picks the highlighted command.

use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::{
    backend::CrosstermBackend,
    crossterm::event::{self, Event, KeyCode, KeyEventKind},
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io::{self, Stdout};

/// One entry of the menu
#[derive(Debug, Clone, Copy)]
pub struct CommandItem {
    pub name: &'static str,
    pub description: &'static str,
    pub example: &'static str,
    /// Selecting the command leaves the cursor after it for arguments
    pub takes_args: bool,
}

const fn item(
    name: &'static str,
    description: &'static str,
    example: &'static str,
    takes_args: bool,
) -> CommandItem {
    CommandItem {
        name,
        description,
        example,
        takes_args,
    }
}

const COMMANDS: &[CommandItem] = &[
    item("/models", "List configured models", "/models", false),
    item(
        "/add-model",
        "Add a model",
        "/add-model GPT-4o openai https://api.openai.com/v1/chat/completions OPENAI_API_KEY gpt-4o",
        true,
    ),
    item("/toggle", "Enable or disable a model", "/toggle 2", true),
    item("/delete-model", "Remove a model", "/delete-model 2", true),
    item("/defaults", "Add the built-in model list", "/defaults", false),
    item("/select", "Choose answers to keep", "/select all", true),
    item("/save", "Save the selected answers", "/save", false),
    item("/show", "Print one answer in full", "/show 1", true),
    item("/clear", "Drop the current answers", "/clear", false),
    item("/history", "List saved results", "/history rust", true),
    item("/prompts", "List saved prompts", "/prompts", true),
    item("/save-prompt", "Save the current prompt with tags", "/save-prompt physics", true),
    item("/use-prompt", "Send a saved prompt again", "/use-prompt 3", true),
    item("/delete-prompt", "Delete a saved prompt", "/delete-prompt 3", true),
    item("/delete-result", "Delete a saved result", "/delete-result 5", true),
    item("/export", "Export saved results", "/export md history.md", true),
    item("/timeout", "Set the request timeout", "/timeout 30", true),
    item("/max-tokens", "Set the token limit", "/max-tokens 2048", true),
    item("/settings", "Show current settings", "/settings", false),
    item("/help", "Show detailed help", "/help", false),
    item("/quit", "Exit ChatList", "/quit", false),
];

/// Commands that take arguments; selecting one pre-fills the prompt
pub fn needs_args(command: &str) -> bool {
    COMMANDS
        .iter()
        .any(|item| item.name == command && item.takes_args)
}

/// Names of all commands, for completion
pub fn command_names() -> Vec<String> {
    COMMANDS
        .iter()
        .map(|item| item.name.to_string())
        .chain(std::iter::once("/exit".to_string()))
        .collect()
}

/// Result of running the command menu
pub enum MenuResult {
    /// User selected a command
    Command(String),
    /// User cancelled (ESC)
    Cancelled,
    /// User wants to type their own input
    TextInput,
}

/// Filter text and highlighted row
#[derive(Debug, Default)]
struct MenuState {
    filter: String,
    list: ListState,
}

impl MenuState {
    fn new() -> Self {
        let mut state = Self::default();
        state.list.select(Some(0));
        state
    }

    fn visible(&self) -> Vec<&'static CommandItem> {
        let needle = self.filter.to_lowercase();
        COMMANDS
            .iter()
            .filter(|item| {
                needle.is_empty()
                    || item.name.contains(&needle)
                    || item.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    fn push(&mut self, c: char) {
        self.filter.push(c);
        self.list.select(Some(0));
    }

    fn pop(&mut self) {
        self.filter.pop();
        self.list.select(Some(0));
    }

    /// Moves the highlight, wrapping at both ends
    fn step(&mut self, forward: bool) {
        let len = self.visible().len();
        if len == 0 {
            return;
        }
        let current = self.list.selected().unwrap_or(0).min(len - 1);
        let next = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        self.list.select(Some(next));
    }

    fn chosen(&self) -> Option<&'static CommandItem> {
        let visible = self.visible();
        self.list.selected().and_then(|i| visible.get(i).copied())
    }

    /// Applies a key; `Some` ends the menu
    fn handle(&mut self, code: KeyCode) -> Option<MenuResult> {
        match code {
            KeyCode::Esc if self.filter.is_empty() => return Some(MenuResult::Cancelled),
            KeyCode::Esc => {
                self.filter.clear();
                self.list.select(Some(0));
            }
            KeyCode::Enter => {
                if let Some(item) = self.chosen() {
                    return Some(MenuResult::Command(item.name.to_string()));
                }
            }
            KeyCode::Down | KeyCode::Tab => self.step(true),
            KeyCode::Up | KeyCode::BackTab => self.step(false),
            KeyCode::Backspace => self.pop(),
            KeyCode::Char('/') if self.filter.is_empty() => return Some(MenuResult::TextInput),
            KeyCode::Char(c) if !c.is_control() => self.push(c),
            _ => {}
        }
        None
    }
}

/// Raw mode and the alternate screen for as long as it lives
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        if let Err(e) = crossterm::execute!(io::stdout(), EnterAlternateScreen) {
            let _ = terminal::disable_raw_mode();
            return Err(e);
        }
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let _ = crossterm::execute!(io::stdout(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Display the command menu and return the selected command
pub fn show_command_menu() -> io::Result<MenuResult> {
    let mut guard = TerminalGuard::enter()?;
    let mut state = MenuState::new();

    loop {
        guard.terminal.draw(|f| render(f, &mut state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(result) = state.handle(key.code) {
                return Ok(result);
            }
        }
    }
}

fn render(f: &mut Frame, state: &mut MenuState) {
    let accent = Style::default().fg(Color::Cyan);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(f.area());

    let visible = state.visible();

    let title = format!(" ⚡ ChatList  ({} of {} commands) ", visible.len(), COMMANDS.len());
    let filter = if state.filter.is_empty() {
        Span::styled("type to filter", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(
            state.filter.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )
    };
    let header = Paragraph::new(Line::from(vec![Span::raw(" / "), filter])).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(accent)
            .title(Span::styled(title, accent.add_modifier(Modifier::BOLD))),
    );
    f.render_widget(header, chunks[0]);

    let items: Vec<ListItem> = visible
        .iter()
        .map(|cmd| {
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(format!("  {:16}", cmd.name), accent),
                    Span::raw(cmd.description),
                ]),
                Line::from(format!("  {:16} e.g. {}", "", cmd.example))
                    .style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).border_style(accent))
        .highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_stateful_widget(list, chunks[1], &mut state.list);

    let help = Paragraph::new(" ↑/↓: Move  Enter: Select  Backspace: Edit filter  ESC: Clear/Cancel ")
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL).border_style(accent))
        .alignment(Alignment::Center);
    f.render_widget(help, chunks[2]);
}
