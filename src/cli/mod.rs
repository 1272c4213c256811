//! CLI module
//!
//! This module provides the command-line interface for ChatList,
//! including the REPL implementation, command handlers and the result
//! session that backs `/select` and `/save`.

pub mod command_menu;
pub mod commands;
pub mod render;
pub mod repl;
pub mod session;

// Re-exports
pub use repl::Repl;
pub use session::ResultSession;
