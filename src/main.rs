// ChatList: send one prompt to many LLMs and compare the answers
//
// This is the main entry point for the ChatList application.

use anyhow::{Context, Result};
use chatlist::cli::Repl;
use chatlist::config::{create_shared_state, AppState, Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; keys may come from the environment
    dotenv::dotenv().ok();

    let config = Config::load().context("failed to load configuration")?;
    let log_file = chatlist::logging::init(
        &config.log_level,
        &config.file_log_level,
        &config.log_dir()?,
    )?;
    info!(version = env!("CARGO_PKG_VERSION"), log_file = %log_file.display(), "starting ChatList");

    let state = AppState::open(config)
        .await
        .context("failed to open the ChatList database")?;
    let mut repl = Repl::new(create_shared_state(state))?;
    repl.run().await?;

    Ok(())
}
