//! Question bank reference data
//!
//! Questions and categories are loaded once per session and never mutated.
//! The host picks six categories from this set to build a board.

use std::fmt::Display;

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::constants::question::{MAX_CATEGORY_NAME_LENGTH, MAX_TEXT_LENGTH};

/// Identifier of a question category
///
/// Category ids come from the bank file name (without extension), so they
/// are stable across sessions and can be sent by the host as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(String);

impl CategoryId {
    /// Creates a category id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CategoryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CategoryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A single clue with its answer and printed value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Question {
    /// The clue text shown on the spectator display
    #[garde(length(chars, min = 1, max = MAX_TEXT_LENGTH))]
    pub question: String,
    /// The expected answer, revealed by the host
    #[garde(length(chars, min = 1, max = MAX_TEXT_LENGTH))]
    pub answer: String,
    /// Points won or lost on this clue
    #[garde(range(min = 0))]
    pub value: i64,
}

impl Question {
    /// Creates a question
    pub fn new(question: impl Into<String>, answer: impl Into<String>, value: i64) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            value,
        }
    }
}

/// A category of questions from the question bank
///
/// Questions are expected in ascending value order; only the first five
/// make it onto a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct QuestionCategory {
    /// Stable identifier of the category
    #[garde(skip)]
    pub id: CategoryId,
    /// Display name shown as the column header
    #[garde(length(chars, min = 1, max = MAX_CATEGORY_NAME_LENGTH))]
    pub name: String,
    /// Free-form tags used by the host to filter categories
    #[garde(skip)]
    pub types: Vec<String>,
    /// The clues of this category
    #[garde(length(min = 1), dive)]
    pub questions: Vec<Question>,
}

impl QuestionCategory {
    /// Returns `true` if the category carries the given type tag
    pub fn has_type(&self, tag: &str) -> bool {
        self.types.iter().any(|t| t == tag)
    }
}
