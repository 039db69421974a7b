//! mtk - MCP toolkit server
//!
//! Registers tool modules into an in-process host and serves them over stdio.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, ConfigAction};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_store = commands::config_store(&cli);

    // stdout carries JSON-RPC, so logs go to stderr.
    let configured_level = config_store
        .try_load()
        .ok()
        .and_then(|config| config.server.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(cli.log_filter(configured_level.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        None | Some(Commands::Serve) => commands::serve::run(&cli).await?,
        Some(Commands::Status { json }) => commands::status::run(&cli, json)?,
        Some(Commands::Call {
            ref operation,
            ref args,
        }) => commands::call::run(&cli, operation, args).await?,
        Some(Commands::Config { ref action }) => match action {
            ConfigAction::Init { force } => commands::config::init(&config_store, *force)?,
            ConfigAction::Show => commands::config::show(&config_store)?,
        },
    }

    Ok(())
}
