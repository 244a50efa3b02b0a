//! Incremental decoder for event-stream text
//!
//! Chunks arrive at arbitrary boundaries, so the decoder buffers bytes until
//! a blank line ends an event. Comment lines (starting with `:`) are dropped,
//! which is how keep-alive frames disappear before they reach the viewer.

use itertools::Itertools;
use tracing::warn;

use crate::constants::live::MAX_PENDING_BYTES;

/// Buffers event-stream bytes and yields the data of complete events
#[derive(Debug)]
pub struct Decoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already searched for an event boundary
    scanned: usize,
    /// Size above which an unfinished event is discarded
    limit: usize,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::with_limit(MAX_PENDING_BYTES)
    }
}

impl Decoder {
    /// Creates an empty decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty decoder that buffers at most `limit` bytes
    pub fn with_limit(limit: usize) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            limit,
        }
    }

    /// Feeds a chunk of the stream
    ///
    /// An unfinished event that grows past the limit is discarded.
    ///
    /// # Arguments
    ///
    /// * `chunk` - Bytes received from the transport
    ///
    /// # Returns
    ///
    /// The data of every event completed by this chunk, in order. Events
    /// without data lines, such as keep-alive comments, yield nothing.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend(chunk.iter().filter(|b| **b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = self.next_boundary() {
            let block = self.buffer.drain(..end + 2).collect_vec();
            self.scanned = 0;
            if let Some(data) = parse_event(&block[..end]) {
                events.push(data);
            }
        }

        if self.buffer.len() > self.limit {
            warn!(
                pending = self.buffer.len(),
                limit = self.limit,
                "discarding oversized event"
            );
            self.buffer.clear();
            self.scanned = 0;
        }
        events
    }

    /// Returns `true` if a partial event is buffered
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Finds the next blank line, resuming where the last search stopped
    fn next_boundary(&mut self) -> Option<usize> {
        let start = self.scanned.saturating_sub(1);
        match self.buffer[start..].windows(2).position(|w| w == b"\n\n") {
            Some(offset) => Some(start + offset),
            None => {
                self.scanned = self.buffer.len();
                None
            }
        }
    }
}

/// Joins the `data` lines of a single event
fn parse_event(block: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(block);
    let data = text
        .split('\n')
        .filter(|line| !line.starts_with(':'))
        .filter_map(|line| {
            let (field, value) = line.split_once(':').unwrap_or((line, ""));
            (field == "data").then(|| value.strip_prefix(' ').unwrap_or(value))
        })
        .collect_vec();

    (!data.is_empty()).then(|| data.join("\n"))
}
