//! Error types for shotpix-core.

use thiserror::Error;

/// Result type alias for shotpix-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for frame and view operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A frame with zero elements was passed where data is required.
    #[error("empty frame passed to an operation that requires data")]
    EmptyFrame,

    /// Companion arrays do not have matching lengths.
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// A 2D view does not match the detector layout it claims to render.
    #[error("view dimensions ({rows}, {cols}) do not match the detector layout")]
    ViewMismatch { rows: usize, cols: usize },

    /// A flat index is outside the detector.
    #[error("pixel index {0} is out of range for this detector")]
    IndexOutOfRange(usize),

    /// Finalizing an accumulator that never saw a frame.
    #[error("cannot finalize an accumulator with zero folded frames")]
    EmptyAccumulator,

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}
