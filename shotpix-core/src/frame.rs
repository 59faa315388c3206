//! Flat acquisition-order detector frame and its elementwise arithmetic.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One detector readout, flattened to acquisition order.
///
/// The length is fixed at construction (normally
/// [`DetectorGeometry::total_pixels`](crate::DetectorGeometry::total_pixels));
/// all elementwise operations against another frame check the shape and
/// abort only the failing call, never the run.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frame {
    data: Vec<f64>,
}

impl Frame {
    /// Creates a zero-filled frame of the given length.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
        }
    }

    /// Creates a one-filled frame of the given length.
    #[must_use]
    pub fn ones(len: usize) -> Self {
        Self {
            data: vec![1.0; len],
        }
    }

    /// Wraps an existing intensity vector.
    #[must_use]
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self { data }
    }

    /// Number of pixels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the frame holds no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read access to the underlying intensities.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mutable access to the underlying intensities.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    fn check_shape(&self, other: &Frame) -> Result<()> {
        if self.len() == other.len() {
            Ok(())
        } else {
            Err(Error::ShapeMismatch {
                expected: self.len(),
                actual: other.len(),
            })
        }
    }

    /// Elementwise `self += other`.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if the lengths differ.
    pub fn add_assign(&mut self, other: &Frame) -> Result<()> {
        self.check_shape(other)?;
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
        Ok(())
    }

    /// Elementwise `self -= other`.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if the lengths differ.
    pub fn subtract(&mut self, other: &Frame) -> Result<()> {
        self.check_shape(other)?;
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a -= b;
        }
        Ok(())
    }

    /// Elementwise `self /= other`.
    ///
    /// Pixels with a zero divisor are left untouched and counted; the
    /// returned value is the number of such pixels.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if the lengths differ.
    pub fn divide(&mut self, other: &Frame) -> Result<usize> {
        self.check_shape(other)?;
        let mut zero_divisors = 0;
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            if *b == 0.0 {
                zero_divisors += 1;
            } else {
                *a /= b;
            }
        }
        Ok(zero_divisors)
    }

    /// Subtracts a scalar from every pixel.
    pub fn subtract_scalar(&mut self, value: f64) {
        for a in &mut self.data {
            *a -= value;
        }
    }

    /// Multiplies every pixel by a scalar.
    pub fn scale(&mut self, value: f64) {
        for a in &mut self.data {
            *a *= value;
        }
    }

    /// Arithmetic mean over all pixels (0 for an empty frame).
    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Smallest pixel value (0 for an empty frame).
    #[must_use]
    pub fn min(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest pixel value (0 for an empty frame).
    #[must_use]
    pub fn max(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Bounded histogram of the pixel values over `[min, max]`.
    ///
    /// Returns the per-bin counts together with the bin width; the last
    /// bin is closed on both ends so the maximum lands inside it.
    #[must_use]
    pub fn histogram(&self, bins: usize) -> (Vec<usize>, f64) {
        let mut counts = vec![0usize; bins.max(1)];
        if self.data.is_empty() || bins == 0 {
            return (counts, 0.0);
        }
        let lo = self.min();
        let hi = self.max();
        let width = (hi - lo) / bins as f64;
        if width == 0.0 {
            counts[0] = self.data.len();
            return (counts, 0.0);
        }
        for &v in &self.data {
            let bin = (((v - lo) / width) as usize).min(bins - 1);
            counts[bin] += 1;
        }
        (counts, width)
    }

    /// Mode of a bounded histogram of the pixel values.
    ///
    /// The value returned is the center of the most populated bin; the
    /// first such bin wins on ties. Used as the alternative hit criterion
    /// to the plain [`mean`](Self::mean).
    #[must_use]
    pub fn histogram_mode(&self, bins: usize) -> f64 {
        if self.data.is_empty() || bins == 0 {
            return 0.0;
        }
        let (counts, width) = self.histogram(bins);
        if width == 0.0 {
            return self.min();
        }
        // strict comparison so the first maximal bin wins on ties
        let mut best = 0;
        for (bin, &count) in counts.iter().enumerate() {
            if count > counts[best] {
                best = bin;
            }
        }
        self.min() + (best as f64 + 0.5) * width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_elementwise_arithmetic() {
        let mut frame = Frame::from_vec(vec![5.0, 7.0, 9.0]);
        frame.subtract(&Frame::from_vec(vec![1.0, 1.0, 1.0])).unwrap();
        let zero_divs = frame.divide(&Frame::from_vec(vec![2.0, 2.0, 2.0])).unwrap();
        assert_eq!(zero_divs, 0);
        assert_eq!(frame.as_slice(), &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_divide_counts_zero_divisors() {
        let mut frame = Frame::from_vec(vec![4.0, 6.0, 8.0]);
        let zero_divs = frame.divide(&Frame::from_vec(vec![2.0, 0.0, 4.0])).unwrap();
        assert_eq!(zero_divs, 1);
        // the zero-divisor pixel is left untouched
        assert_eq!(frame.as_slice(), &[2.0, 6.0, 2.0]);
    }

    #[test]
    fn test_shape_mismatch_is_recoverable() {
        let mut frame = Frame::from_vec(vec![1.0, 2.0]);
        let err = frame.subtract(&Frame::from_vec(vec![1.0])).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::ShapeMismatch {
                expected: 2,
                actual: 1
            }
        ));
        // the frame is unchanged after the failed call
        assert_eq!(frame.as_slice(), &[1.0, 2.0]);
    }

    #[test]
    fn test_statistics() {
        let frame = Frame::from_vec(vec![1.0, 2.0, 3.0, 6.0]);
        assert_relative_eq!(frame.mean(), 3.0);
        assert_relative_eq!(frame.min(), 1.0);
        assert_relative_eq!(frame.max(), 6.0);
    }

    #[test]
    fn test_histogram_mode() {
        // values cluster around 1.0 with one outlier at 10.0
        let frame = Frame::from_vec(vec![0.9, 1.0, 1.0, 1.1, 1.0, 10.0]);
        let mode = frame.histogram_mode(10);
        assert!(mode < 2.0, "mode {mode} should sit in the low cluster");
    }

    #[test]
    fn test_histogram_mode_tie_takes_first_bin() {
        // two bins, one value each: the lower bin center wins
        let frame = Frame::from_vec(vec![0.0, 1.0]);
        assert_relative_eq!(frame.histogram_mode(2), 0.25);
    }

    #[test]
    fn test_histogram_mode_uniform_frame() {
        let frame = Frame::from_vec(vec![3.0; 8]);
        assert_relative_eq!(frame.histogram_mode(16), 3.0);
    }
}
