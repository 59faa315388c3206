//! Error type for persistence operations.

use std::path::PathBuf;

use thiserror::Error;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying filesystem failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A hit list file yielded no usable indices.
    #[error("hit list {0} contains no valid indices")]
    EmptyHitList(PathBuf),

    /// A stored map has the wrong number of values.
    #[error("expected {expected} values, found {actual}")]
    LengthMismatch {
        /// Number of values required.
        expected: usize,
        /// Number of values present.
        actual: usize,
    },

    /// A stored value could not be parsed.
    #[error("{path}:{line}: cannot parse {text:?} as a number")]
    Parse {
        /// File being read.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// Offending text.
        text: String,
    },
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;
