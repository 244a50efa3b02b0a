//! Runtime settings of the server
//!
//! Settings come from an optional TOML file; every field has a default so an
//! empty file is valid. Durations are written in milliseconds. The binary
//! applies command-line overrides on top and validates the result before the
//! server starts.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    constants::{
        animation::{BOARD_REVEAL, DOUBLE_REVEAL, MAX_GATE_SECS},
        live::{KEEP_ALIVE, MAX_KEEP_ALIVE_SECS, MIN_KEEP_ALIVE_SECS},
        server::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_QUESTIONS_DIR},
    },
    host::Timings,
};

/// Errors that can occur while loading settings
#[derive(Error, Debug)]
pub enum Error {
    /// The settings file could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path of the settings file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// The settings file is not valid TOML for [`Settings`]
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range
    #[error("invalid settings: {0}")]
    Invalid(#[from] garde::Report),
}

/// Server settings
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Address to bind to
    #[garde(length(chars, min = 1))]
    pub host: String,
    /// Port to bind to
    #[garde(range(min = 1))]
    pub port: u16,
    /// Directory of question bank files
    #[garde(skip)]
    pub questions_dir: PathBuf,
    /// Interval between keep-alive frames on the live channel
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[garde(custom(validate_duration::<MIN_KEEP_ALIVE_SECS, MAX_KEEP_ALIVE_SECS>))]
    pub keep_alive: Duration,
    /// Alarm of the board reveal gate
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[garde(custom(validate_duration::<0, MAX_GATE_SECS>))]
    pub board_animation: Duration,
    /// Alarm of the wager reveal gate
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[garde(custom(validate_duration::<0, MAX_GATE_SECS>))]
    pub double_animation: Duration,
    /// Whether the host session closes animation gates on its own
    #[garde(skip)]
    pub auto_advance: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            questions_dir: PathBuf::from(DEFAULT_QUESTIONS_DIR),
            keep_alive: KEEP_ALIVE,
            board_animation: BOARD_REVEAL,
            double_animation: DOUBLE_REVEAL,
            auto_advance: true,
        }
    }
}

/// Checks that a duration lies within whole-second bounds
fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    val: &Duration,
    _ctx: &(),
) -> garde::Result {
    if (MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_SECONDS},{MAX_SECONDS}] seconds",
        )))
    }
}

impl Settings {
    /// Loads settings from a TOML file, or the defaults without one
    ///
    /// The result is not validated yet; see [`Settings::validated`].
    ///
    /// # Arguments
    ///
    /// * `path` - The settings file, if any
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let Some(path) = path else {
            debug!("no settings file, using defaults");
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_owned(),
            source,
        })?;
        let settings = Self::parse(&content)?;
        info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Parses settings from TOML text
    pub fn parse(content: &str) -> Result<Self, Error> {
        Ok(toml::from_str(content)?)
    }

    /// Checks every value and returns the settings if they are usable
    pub fn validated(self) -> Result<Self, Error> {
        self.validate()?;
        Ok(self)
    }

    /// The address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Alarm settings of the host session
    pub fn timings(&self) -> Timings {
        Timings {
            board_animation: self.board_animation,
            double_animation: self.double_animation,
            auto_advance: self.auto_advance,
        }
    }
}
