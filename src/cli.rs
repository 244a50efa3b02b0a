//! Command-line interface of the trivia board server.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Trivia Board - host-driven party trivia with a live spectator display
#[derive(Parser, Debug)]
#[command(name = "trivia-board")]
#[command(about = "Party trivia server with a live spectator feed", long_about = None)]
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
    Serve {
        /// Settings file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory of question bank files
        #[arg(short, long)]
        questions: Option<PathBuf>,

        /// Wait for the display to close animation gates
        #[arg(long)]
        no_auto_advance: bool,
    },

    /// Follow a running game from the terminal
    Watch {
        /// Live stream URL
        #[arg(default_value = "http://127.0.0.1:3000/api/game/stream")]
        url: String,
    },
}
