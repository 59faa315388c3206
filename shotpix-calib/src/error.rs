//! Error types for shotpix-calib.

use thiserror::Error;

/// Result type alias for shotpix-calib operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Calibration error types.
#[derive(Error, Debug)]
pub enum Error {
    /// The calibration source could not deliver base offsets.
    #[error("calibration source unavailable: {0}")]
    SourceUnavailable(String),

    /// Base offset arrays have inconsistent lengths.
    #[error("base offset arrays disagree in length: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}
