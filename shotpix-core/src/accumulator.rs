//! Running elementwise sum over accepted frames.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Frame, Result};

/// Rescaling applied to the averaged frame after finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Normalization {
    /// Plain average, no rescaling.
    #[default]
    None,
    /// Divide the average by its own mean.
    ByMean,
    /// Divide the average by its own maximum.
    ByMax,
}

/// Running sum and count over accepted frames.
///
/// Folding and finalization are strictly sequential: the count only grows
/// during accumulation and `finalize` consumes the accumulator, freezing
/// it. A multi-threaded host must serialize folds externally (one
/// accumulator per worker, merged at end of run).
#[derive(Debug, Clone)]
pub struct FrameAccumulator {
    sum: Frame,
    count: u64,
}

impl FrameAccumulator {
    /// Creates an accumulator for frames of the given length.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            sum: Frame::zeros(len),
            count: 0,
        }
    }

    /// Number of frames folded so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Read access to the running sum.
    #[must_use]
    pub fn sum(&self) -> &Frame {
        &self.sum
    }

    /// Adds one accepted frame to the running sum.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if the frame length differs; the
    /// accumulator is unchanged in that case.
    pub fn fold(&mut self, frame: &Frame) -> Result<()> {
        self.sum.add_assign(frame)?;
        self.count += 1;
        Ok(())
    }

    /// Merges another accumulator into this one (end-of-run reduction
    /// for multi-worker hosts).
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if the sums have different lengths.
    pub fn merge(&mut self, other: &FrameAccumulator) -> Result<()> {
        self.sum.add_assign(&other.sum)?;
        self.count += other.count;
        Ok(())
    }

    /// Divides the sum by the count and applies the optional rescaling.
    ///
    /// # Errors
    /// Returns [`Error::EmptyAccumulator`] if no frame was ever folded.
    pub fn finalize(self, normalization: Normalization) -> Result<Frame> {
        if self.count == 0 {
            return Err(Error::EmptyAccumulator);
        }
        let mut average = self.sum;
        average.scale(1.0 / self.count as f64);

        let divisor = match normalization {
            Normalization::None => return Ok(average),
            Normalization::ByMean => average.mean(),
            Normalization::ByMax => average.max(),
        };
        if divisor != 0.0 {
            average.scale(1.0 / divisor);
        } else {
            log::warn!("normalization divisor is zero, returning plain average");
        }
        Ok(average)
    }
}
