//! Players and roster validation
//!
//! Players are supplied by the host when a game is set up. Their ids are
//! chosen by the host (for example `player-1`) and only their score changes
//! during a game.

use std::{collections::HashSet, fmt::Display};

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::constants::players::{MAX_COUNT, MIN_COUNT};

/// Host-assigned identifier of a player
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a player id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A contestant and their running score
///
/// Scores are signed and unbounded below zero: a wrong answer costs the
/// clue's value even when the player has nothing left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Host-assigned identifier
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Running score
    #[serde(default)]
    pub score: i64,
}

impl Player {
    /// Creates a player with a zero score
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: PlayerId::new(id),
            name: name.into(),
            score: 0,
        }
    }

    /// Adds `delta` to the score, saturating instead of overflowing
    pub(crate) fn award(&mut self, delta: i64) {
        self.score = self.score.saturating_add(delta);
    }
}

/// The list of players confirmed by the host
///
/// A roster is valid when it has between two and eight players and no two
/// players share an id.
#[derive(Debug, Clone, Validate)]
pub struct Roster {
    /// Players in seating order
    #[garde(length(min = MIN_COUNT, max = MAX_COUNT), custom(|v, _| unique_ids(v)))]
    players: Vec<Player>,
}

impl Roster {
    /// Wraps a player list for validation
    pub fn new(players: Vec<Player>) -> Self {
        Self { players }
    }

    /// Unwraps the player list
    pub fn into_players(self) -> Vec<Player> {
        self.players
    }
}

/// Rejects player lists in which an id appears twice
#[allow(clippy::ptr_arg)]
fn unique_ids(players: &Vec<Player>) -> garde::Result {
    let mut seen = HashSet::new();
    match players.iter().find(|p| !seen.insert(&p.id)) {
        Some(duplicate) => Err(garde::Error::new(format!(
            "player id {} is used more than once",
            duplicate.id
        ))),
        None => Ok(()),
    }
}
