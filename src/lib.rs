//! ChatList Library
//!
//! Sends one prompt to many LLM providers concurrently, normalizes their
//! answers into one result table and keeps the answers worth keeping.
//! The main binary is in src/main.rs.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod llm;
pub mod logging;
pub mod storage;

pub use dispatch::Dispatcher;
pub use error::{ChatListError, Result};
