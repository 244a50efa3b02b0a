//! Display side of the live channel
//!
//! A [`Viewer`] connects to the push endpoint, decodes event-stream frames
//! and hands every snapshot to a callback. Displays render from snapshots
//! only; [`Screen`] is the rendering decision for a given state.

pub mod backoff;
pub mod decoder;

use std::ops::ControlFlow;

use futures::StreamExt;
use reqwest::{StatusCode, header::ACCEPT};
use thiserror::Error;
use tracing::{debug, info, warn};

use self::{
    backoff::{Backoff, Disconnect},
    decoder::Decoder,
};
use crate::{
    Snapshot,
    game::{QuestionState, State},
};

/// What a display shows for a given state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// The game has not started yet
    Waiting,
    /// The board reveal animation
    BoardReveal,
    /// The board with the scores
    Board,
    /// The wager animation over the board
    Wager,
    /// A clue over the board
    Clue {
        /// Whether the answer is shown under the clue
        answer_shown: bool,
    },
    /// The final standings
    GameOver,
}

impl Screen {
    /// Chooses the screen for a state
    pub fn of(state: State) -> Self {
        match state {
            State::Idle | State::SelectPlayers | State::SelectCategories => Self::Waiting,
            State::BoardAnimation => Self::BoardReveal,
            State::ShowQuestion(QuestionState::DoubleAnimation) => Self::Wager,
            State::ShowQuestion(QuestionState::QuestionRevealed) => Self::Clue {
                answer_shown: false,
            },
            State::ShowQuestion(QuestionState::AnswerRevealed) => Self::Clue { answer_shown: true },
            State::ShowBoard
            | State::CheckBoard
            | State::ShowQuestion(QuestionState::CheckDouble | QuestionState::ScoreUpdate) => {
                Self::Board
            }
            State::GameOver => Self::GameOver,
        }
    }
}

/// Errors that end a single connection attempt
#[derive(Error, Debug)]
pub enum Error {
    /// The request could not be sent
    #[error("failed to connect: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with something other than a stream
    #[error("unexpected status {0}")]
    Status(StatusCode),
}

/// A client of the push endpoint that reconnects forever
#[derive(Debug)]
pub struct Viewer {
    client: reqwest::Client,
    url: String,
    backoff: Backoff,
}

impl Viewer {
    /// Creates a viewer for the stream at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_backoff(url, Backoff::default())
    }

    /// Creates a viewer with a custom reconnect policy
    pub fn with_backoff(url: impl Into<String>, backoff: Backoff) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            backoff,
        }
    }

    /// The reconnect policy and how far it has advanced
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Follows the stream until the callback asks to stop
    ///
    /// Connection failures are never returned: a refused or failed
    /// connection is retried with exponential backoff, a stream that drops
    /// after connecting is retried after the fixed transport delay.
    ///
    /// # Arguments
    ///
    /// * `on_snapshot` - Called with every snapshot received
    pub async fn run<F>(&mut self, mut on_snapshot: F)
    where
        F: FnMut(Snapshot) -> ControlFlow<()>,
    {
        loop {
            let disconnect = match self.follow(&mut on_snapshot).await {
                Ok(ControlFlow::Break(())) => return,
                Ok(ControlFlow::Continue(())) => {
                    debug!(url = %self.url, "live stream ended");
                    Disconnect::Retrying
                }
                Err(e) => {
                    warn!(url = %self.url, error = %e, "live stream unavailable");
                    Disconnect::Closed
                }
            };

            let delay = self.backoff.delay_for(disconnect);
            info!(delay_ms = delay.as_millis() as u64, "reconnecting");
            tokio::time::sleep(delay).await;
        }
    }

    /// Runs a single connection until it ends
    async fn follow<F>(&mut self, on_snapshot: &mut F) -> Result<ControlFlow<()>, Error>
    where
        F: FnMut(Snapshot) -> ControlFlow<()>,
    {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Status(status));
        }
        info!(url = %self.url, "connected to live stream");

        let mut decoder = Decoder::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    debug!(error = %e, "live stream interrupted");
                    break;
                }
            };

            for data in decoder.feed(&chunk) {
                self.backoff.reset();
                match serde_json::from_str::<Snapshot>(&data) {
                    Ok(snapshot) => {
                        if on_snapshot(snapshot).is_break() {
                            return Ok(ControlFlow::Break(()));
                        }
                    }
                    Err(e) => warn!(error = %e, "ignoring malformed snapshot"),
                }
            }
        }

        Ok(ControlFlow::Continue(()))
    }
}
