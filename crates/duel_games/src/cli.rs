//! Command-line interface for duel.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Duel - networked tic-tac-toe for two players
#[derive(Parser, Debug)]
#[command(name = "duel")]
#[command(about = "Networked tic-tac-toe server and terminal client", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the game server
    Server {
        /// Listen address, e.g. `:9000` or `127.0.0.1:9000` [default: :9000]
        #[arg(short, long)]
        addr: Option<String>,

        /// TOML file with server tunables
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Connect to a server and play from the terminal
    Client {
        /// Server address
        #[arg(short, long, default_value = "127.0.0.1:9000")]
        addr: String,
    },
}
