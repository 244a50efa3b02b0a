//! # Trivia Board Library
//!
//! This library provides the core of a two-screen party trivia game: a host
//! screen drives the game and a spectator display mirrors it. It handles
//! board construction, the game state machine, scoring, and the real-time
//! push of game snapshots from the host to any number of displays.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

use serde::{Deserialize, Serialize};

pub mod bank;
pub mod board;
pub mod constants;
pub mod game;
pub mod host;
pub mod live;
pub mod player;
pub mod publisher;
pub mod question;
pub mod server;
pub mod settings;
pub mod viewer;

/// The record pushed to every display
///
/// A snapshot is the full game as seen from outside: the current state path
/// and the whole context. Displays render from snapshots only and never
/// compute game logic of their own.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current state, flattened to its dot-joined path on the wire
    pub state: game::State,
    /// Game data
    pub context: game::GameContext,
}

impl Snapshot {
    /// Converts the snapshot to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}
