//! Question bank loader
//!
//! A question bank is a directory with one YAML file per category:
//!
//! ```yaml
//! name: World Rivers
//! types: [geography]
//! questions:
//!   - question: Longest river in Africa
//!     answer: The Nile
//!     value: 200
//! ```
//!
//! The category id is the file name without its extension. Loading never
//! fails as a whole: a missing directory gives an empty bank and a bad file
//! is skipped.

use std::path::{Path, PathBuf};

use garde::Validate;
use heck::ToTitleCase;
use itertools::Itertools;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::question::{CategoryId, Question, QuestionCategory};

/// Errors that can occur while loading a single category file
#[derive(Error, Debug)]
pub enum Error {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the category file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
    /// The file is not a valid category document
    #[error("failed to parse {path}: {source}")]
    Yaml {
        /// Path of the category file
        path: PathBuf,
        /// Underlying YAML error
        source: serde_yml::Error,
    },
    /// The category breaks a content rule
    #[error("invalid category {path}: {source}")]
    Invalid {
        /// Path of the category file
        path: PathBuf,
        /// Every rule that failed
        source: garde::Report,
    },
}

/// On-disk shape of a category
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoryFile {
    name: Option<String>,
    #[serde(default)]
    types: Vec<String>,
    questions: Vec<Question>,
}

fn is_category_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

/// Loads every category of a question bank directory
///
/// Files are read in name order, so the bank order is stable across runs.
///
/// # Arguments
///
/// * `dir` - The question bank directory
///
/// # Returns
///
/// The categories that loaded; an empty list if the directory is missing
pub fn load_dir(dir: &Path) -> Vec<QuestionCategory> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "question bank directory not found");
            return Vec::new();
        }
    };

    let categories = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_category_file(path))
        .sorted()
        .filter_map(|path| match load_file(&path) {
            Ok(category) => Some(category),
            Err(e) => {
                warn!(error = %e, "skipping category");
                None
            }
        })
        .collect_vec();

    info!(
        dir = %dir.display(),
        count = categories.len(),
        "question bank loaded"
    );
    categories
}

/// Loads a single category file
///
/// Questions are ordered by ascending value. A file without a `name` gets
/// its file name in title case.
///
/// # Arguments
///
/// * `path` - The category file
pub fn load_file(path: &Path) -> Result<QuestionCategory, Error> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;
    let file: CategoryFile = serde_yml::from_str(&content).map_err(|source| Error::Yaml {
        path: path.to_owned(),
        source,
    })?;

    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let category = QuestionCategory {
        name: file.name.unwrap_or_else(|| stem.to_title_case()),
        id: CategoryId::new(stem),
        types: file.types,
        questions: file
            .questions
            .into_iter()
            .sorted_by_key(|question| question.value)
            .collect_vec(),
    };

    category.validate().map_err(|source| Error::Invalid {
        path: path.to_owned(),
        source,
    })?;
    Ok(category)
}

/// Every type tag used in a bank, sorted and without duplicates
pub fn types_of(categories: &[QuestionCategory]) -> Vec<String> {
    categories
        .iter()
        .flat_map(|category| category.types.iter().cloned())
        .sorted()
        .dedup()
        .collect_vec()
}
