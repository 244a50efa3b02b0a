//! Configuration constants for a trivia board session
//!
//! This module contains the fixed limits, board dimensions and default
//! timings used throughout the game, the live channel and the viewer.

/// Board dimensions and wager placement
pub mod board {
    /// Number of category columns on a board
    pub const COLUMNS: usize = 6;
    /// Maximum number of clues in a single column
    pub const ROWS: usize = 5;
    /// Number of wager ("Daily Double") cells placed on a new board
    pub const WAGER_COUNT: usize = 2;
    /// Multiplier applied to a wager clue's printed value
    pub const WAGER_MULTIPLIER: i64 = 2;
}

/// Player roster limits
pub mod players {
    /// Minimum number of players in a game
    pub const MIN_COUNT: usize = 2;
    /// Maximum number of players in a game
    pub const MAX_COUNT: usize = 8;
}

/// Question bank content limits
pub mod question {
    /// Maximum length of a clue or answer text in characters
    pub const MAX_TEXT_LENGTH: usize = 1000;
    /// Maximum length of a category name in characters
    pub const MAX_CATEGORY_NAME_LENGTH: usize = 200;
}

/// Live channel framing and keep-alive
pub mod live {
    use std::time::Duration;

    /// Interval between keep-alive comment frames
    pub const KEEP_ALIVE: Duration = Duration::from_secs(15);
    /// Text of the keep-alive comment frame
    pub const KEEP_ALIVE_COMMENT: &str = "keepalive";
    /// Shortest keep-alive interval accepted in settings
    pub const MIN_KEEP_ALIVE_SECS: u64 = 1;
    /// Longest keep-alive interval accepted in settings
    pub const MAX_KEEP_ALIVE_SECS: u64 = 120;
    /// Most bytes a viewer buffers for a single unfinished event
    pub const MAX_PENDING_BYTES: usize = 16 * 1024 * 1024;
}

/// Viewer reconnect policy
pub mod reconnect {
    use std::time::Duration;

    /// Delay before the first reconnect after a terminal close
    pub const INITIAL_DELAY: Duration = Duration::from_secs(1);
    /// Upper bound for the exponential backoff
    pub const MAX_DELAY: Duration = Duration::from_secs(30);
    /// Delay used while the transport is still retrying on its own
    pub const TRANSPORT_RETRY: Duration = Duration::from_secs(3);
}

/// Default durations of the display-side animation gates
pub mod animation {
    use std::time::Duration;

    /// Board reveal: 6 categories at 800ms, 5 rows at 600ms, plus a buffer
    pub const BOARD_REVEAL: Duration = Duration::from_secs(9);
    /// Wager reveal
    pub const DOUBLE_REVEAL: Duration = Duration::from_secs(5);
    /// Longest animation gate accepted in settings
    pub const MAX_GATE_SECS: u64 = 60;
}

/// Server defaults
pub mod server {
    /// Default bind host
    pub const DEFAULT_HOST: &str = "127.0.0.1";
    /// Default bind port
    pub const DEFAULT_PORT: u16 = 3000;
    /// Default question bank directory
    pub const DEFAULT_QUESTIONS_DIR: &str = "questions";
}
