//! Trivia Board - server and terminal viewer
//!
//! `serve` runs the game API and the live channel; `watch` follows a running
//! game the way a spectator display does.

#![deny(missing_docs)]

mod cli;

use std::{ops::ControlFlow, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use itertools::Itertools;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trivia_board::{
    Snapshot, bank,
    game::{Event, Game},
    host::Host,
    publisher::Publisher,
    server::{self, AppState},
    settings::Settings,
    viewer::{Screen, Viewer},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,trivia_board=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            host,
            port,
            questions,
            no_auto_advance,
        } => {
            let mut settings = Settings::load(config.as_deref())?;
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            if let Some(questions) = questions {
                settings.questions_dir = questions;
            }
            if no_auto_advance {
                settings.auto_advance = false;
            }
            run_server(settings.validated()?).await
        }
        Command::Watch { url } => run_viewer(url).await,
    }
}

/// Run the game server until interrupted
async fn run_server(settings: Settings) -> Result<()> {
    let questions = bank::load_dir(&settings.questions_dir);
    info!(
        categories = questions.len(),
        types = ?bank::types_of(&questions),
        "question bank ready"
    );

    let publisher = Arc::new(Publisher::new());
    let host = Host::new(
        Game::new(questions.clone()),
        Arc::clone(&publisher),
        settings.timings(),
    );
    host.send(Event::Start).await;

    let state = AppState::new(host, questions).with_keep_alive(settings.keep_alive);
    let app = server::router(state);

    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!(%address, "trivia board listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await?;

    Ok(())
}

/// Follow a running game and print what the display would show
async fn run_viewer(url: String) -> Result<()> {
    info!(%url, "watching game");
    let mut viewer = Viewer::new(url);
    viewer.run(print_snapshot).await;
    Ok(())
}

fn print_snapshot(snapshot: Snapshot) -> ControlFlow<()> {
    let context = &snapshot.context;
    let scores = context
        .players
        .iter()
        .map(|player| format!("{} {}", player.name, player.score))
        .join(" | ");

    match Screen::of(snapshot.state) {
        Screen::Waiting => println!("waiting for the game to start"),
        Screen::BoardReveal => println!("revealing the board"),
        Screen::Board => println!(
            "[{scores}] {} clues left",
            context.board.remaining()
        ),
        Screen::Wager => println!("[{scores}] daily double!"),
        Screen::Clue { answer_shown } => {
            if let Some(cell) = context.current_cell() {
                println!("[{scores}] {} for {}", cell.question, cell.value);
                if answer_shown {
                    println!("  answer: {}", cell.answer);
                }
            }
        }
        Screen::GameOver => {
            println!("game over");
            for player in context.standings() {
                println!("  {} {}", player.name, player.score);
            }
        }
    }

    ControlFlow::Continue(())
}
