//! Reconnect policy of the viewer
//!
//! After a terminal close the viewer waits 1 s, then 2 s, 4 s and so on up
//! to 30 s. Any received message resets the sequence. While the transport is
//! still retrying on its own the backoff is left alone.

use std::time::Duration;

use crate::constants::reconnect::{INITIAL_DELAY, MAX_DELAY, TRANSPORT_RETRY};

/// How a connection to the live stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    /// The stream dropped after it was established; the transport retries
    Retrying,
    /// The connection could not be established or was refused
    Closed,
}

/// Exponential backoff with a cap
#[derive(Debug, Clone)]
pub struct Backoff {
    attempts: u32,
    initial: Duration,
    max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_DELAY, MAX_DELAY)
    }
}

impl Backoff {
    /// Creates a backoff starting at `initial` and never exceeding `max`
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            attempts: 0,
            initial,
            max,
        }
    }

    /// Number of delays handed out since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the next delay and advances the sequence
    pub fn next_delay(&mut self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempts);
        self.attempts = self.attempts.saturating_add(1);
        self.initial.saturating_mul(factor).min(self.max)
    }

    /// Starts the sequence over
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// How long to wait before reconnecting after a disconnect
    ///
    /// Only a terminal close advances the backoff; a transport retry always
    /// waits the fixed retry delay.
    pub fn delay_for(&mut self, disconnect: Disconnect) -> Duration {
        match disconnect {
            Disconnect::Retrying => TRANSPORT_RETRY,
            Disconnect::Closed => self.next_delay(),
        }
    }
}
