//! Board construction and wager placement
//!
//! A board is a grid of six category columns with up to five clues each.
//! Column order follows the order in which the host selected categories and
//! row order follows the order of questions in the category, which the bank
//! keeps in ascending value order.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    constants::board::{COLUMNS, ROWS, WAGER_COUNT},
    question::{Question, QuestionCategory},
};

/// A single clue on the board
///
/// `revealed` only ever goes from `false` to `true` during a game, and
/// `is_double` is fixed once the board has been built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardCell {
    /// The clue text
    pub question: String,
    /// The expected answer
    pub answer: String,
    /// Printed value of the clue
    pub value: i64,
    /// Whether the clue has been played
    pub revealed: bool,
    /// Whether the clue is a wager clue
    pub is_double: bool,
}

impl From<&Question> for BoardCell {
    fn from(question: &Question) -> Self {
        Self {
            question: question.question.clone(),
            answer: question.answer.clone(),
            value: question.value,
            revealed: false,
            is_double: false,
        }
    }
}

/// Position of a clue on the board
///
/// This is a position, not a reference: it stays meaningful across board
/// copies and serializes as `{ "col": .., "row": .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClueRef {
    /// Column index (category)
    pub col: usize,
    /// Row index (clue within the category)
    pub row: usize,
}

impl ClueRef {
    /// Creates a clue position
    pub fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }
}

/// The scoring grid, stored column-major
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board(Vec<Vec<BoardCell>>);

impl Board {
    /// Builds a board from the selected categories
    ///
    /// The board always has six columns. Column `n` holds the first five
    /// questions of the `n`-th category; a missing category yields an empty
    /// column and a short category yields a short column. Categories past the
    /// sixth are ignored.
    ///
    /// # Arguments
    ///
    /// * `categories` - The selected categories, in selection order
    ///
    /// # Returns
    ///
    /// A board with no clue revealed and no wager placed
    pub fn build(categories: &[QuestionCategory]) -> Self {
        Self(
            (0..COLUMNS)
                .map(|col| {
                    categories
                        .get(col)
                        .map(|category| {
                            category
                                .questions
                                .iter()
                                .take(ROWS)
                                .map(BoardCell::from)
                                .collect_vec()
                        })
                        .unwrap_or_default()
                })
                .collect_vec(),
        )
    }

    /// Places the wager clues on the board
    ///
    /// Picks [`WAGER_COUNT`] distinct positions uniformly at random among all
    /// cells and flags them, clearing any earlier flag first. Boards with
    /// fewer cells get one wager per cell.
    ///
    /// # Arguments
    ///
    /// * `rng` - The random number generator used for the draw
    ///
    /// # Returns
    ///
    /// The board with exactly `min(WAGER_COUNT, cell count)` wager cells
    #[must_use]
    pub fn with_daily_doubles(mut self, rng: &mut fastrand::Rng) -> Self {
        for cell in self.0.iter_mut().flatten() {
            cell.is_double = false;
        }

        let mut positions = self.positions().collect_vec();
        let picks = WAGER_COUNT.min(positions.len());

        // partial Fisher-Yates: the first `picks` slots end up a uniform sample
        for i in 0..picks {
            let j = rng.usize(i..positions.len());
            positions.swap(i, j);
        }

        for clue in positions.into_iter().take(picks) {
            if let Some(cell) = self.cell_mut(clue) {
                cell.is_double = true;
            }
        }

        self
    }

    /// Returns `true` iff every cell has been revealed
    ///
    /// This is the only completion predicate of the game. An empty board is
    /// complete.
    pub fn is_complete(&self) -> bool {
        self.cells().all(|cell| cell.revealed)
    }

    /// Returns the columns of the board
    pub fn columns(&self) -> &[Vec<BoardCell>] {
        &self.0
    }

    /// Returns the cell at `clue`, if the position exists
    pub fn cell(&self, clue: ClueRef) -> Option<&BoardCell> {
        self.0.get(clue.col)?.get(clue.row)
    }

    fn cell_mut(&mut self, clue: ClueRef) -> Option<&mut BoardCell> {
        self.0.get_mut(clue.col)?.get_mut(clue.row)
    }

    /// Marks the cell at `clue` as revealed
    ///
    /// # Returns
    ///
    /// `true` if the position exists
    pub fn reveal(&mut self, clue: ClueRef) -> bool {
        match self.cell_mut(clue) {
            Some(cell) => {
                cell.revealed = true;
                true
            }
            None => false,
        }
    }

    /// Iterates over every position on the board, column by column
    pub fn positions(&self) -> impl Iterator<Item = ClueRef> + '_ {
        self.0
            .iter()
            .enumerate()
            .flat_map(|(col, column)| (0..column.len()).map(move |row| ClueRef::new(col, row)))
    }

    /// Iterates over every cell on the board, column by column
    pub fn cells(&self) -> impl Iterator<Item = &BoardCell> {
        self.0.iter().flatten()
    }

    /// Positions of the wager cells
    pub fn doubles(&self) -> Vec<ClueRef> {
        self.positions()
            .filter(|clue| self.cell(*clue).is_some_and(|cell| cell.is_double))
            .collect_vec()
    }

    /// Number of cells that have not been revealed yet
    pub fn remaining(&self) -> usize {
        self.cells().filter(|cell| !cell.revealed).count()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.0.iter().map(Vec::len).sum()
    }

    /// Returns `true` if the board holds no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Turns the selected categories into a board
///
/// See [`Board::build`].
pub fn create_board(categories: &[QuestionCategory]) -> Board {
    Board::build(categories)
}

/// Randomly designates the wager cells of a board
///
/// See [`Board::with_daily_doubles`].
pub fn assign_daily_doubles(board: Board, rng: &mut fastrand::Rng) -> Board {
    board.with_daily_doubles(rng)
}

/// Returns `true` iff every cell of the board is revealed
pub fn is_board_complete(board: &Board) -> bool {
    board.is_complete()
}
