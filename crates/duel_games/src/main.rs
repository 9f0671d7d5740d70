//! Duel - networked tic-tac-toe.
//!
//! `duel server` runs the matchmaking server; `duel client` plays one game
//! from the terminal.

#![warn(missing_docs)]

mod cli;
mod client;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use duel_server::{Server, ServerConfig};
use std::path::PathBuf;
use tracing::{info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Server { addr, config } => run_server(addr, config).await,
        Command::Client { addr } => run_client(addr).await,
    }
}

fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Run the game server until Ctrl-C.
#[instrument(skip_all)]
async fn run_server(addr: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("info,duel_server=debug"))
        .init();

    let mut config = match config_path {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(addr) = addr {
        config = config.with_listen_addr(addr);
    }
    info!(?config, "Starting duel server");

    let server = Server::bind(config).await?;
    info!(addr = %server.local_addr()?, "Server ready");

    server.serve_with_shutdown(shutdown_signal()).await?;
    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Run the terminal client.
async fn run_client(addr: String) -> Result<()> {
    // Stdout belongs to the board display.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(std::io::stderr)
        .init();

    client::run(&addr).await
}
