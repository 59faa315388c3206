//! Correction pipeline: background, gain, polarization, mask.
//!
//! Each stage is independently enabled by supplying its map; a map with
//! the wrong length disables only that stage with a warning. Per-pixel
//! arithmetic failures (zero divisors) are counted into the
//! [`CorrectionReport`] and the frame proceeds through the remaining
//! stages; nothing here aborts the run.

use shotpix_calib::CoordinateMap;
use shotpix_core::{Error, Frame, Result};

/// Mask values below this pass threshold zero the pixel.
pub const MASK_PASS_THRESHOLD: f64 = 0.9;

/// Outcome of one correction pass over a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorrectionReport {
    /// Pixels skipped because their gain or polarization divisor was zero.
    pub zero_divisors: usize,
    /// Pixels zeroed by the mask stage.
    pub masked: usize,
}

impl CorrectionReport {
    /// True if no pixel failed during the pass (masked pixels are not
    /// failures).
    #[must_use]
    pub fn clean(&self) -> bool {
        self.zero_divisors == 0
    }
}

/// Ordered elementwise correction sequence.
///
/// Stage order is fixed: background subtraction, gain division,
/// polarization division, mask application. Stages without a map are
/// skipped.
#[derive(Debug, Clone, Default)]
pub struct CorrectionPipeline {
    n_pixels: usize,
    background: Option<Frame>,
    gain: Option<Frame>,
    polarization: Option<Frame>,
    mask: Option<Frame>,
    fault_count: u64,
}

impl CorrectionPipeline {
    /// Creates a pipeline with every stage disabled.
    #[must_use]
    pub fn new(n_pixels: usize) -> Self {
        Self {
            n_pixels,
            ..Self::default()
        }
    }

    fn checked(&self, name: &str, map: Option<Frame>) -> Option<Frame> {
        let map = map?;
        if map.len() == self.n_pixels {
            Some(map)
        } else {
            log::warn!(
                "{name} map has {} elements, expected {}; continuing without {name} correction",
                map.len(),
                self.n_pixels
            );
            None
        }
    }

    /// Enables background subtraction.
    #[must_use]
    pub fn with_background(mut self, map: Option<Frame>) -> Self {
        self.background = self.checked("background", map);
        self
    }

    /// Enables gain division.
    #[must_use]
    pub fn with_gain(mut self, map: Option<Frame>) -> Self {
        self.gain = self.checked("gain", map);
        self
    }

    /// Enables polarization division (see [`polarization_map`]).
    #[must_use]
    pub fn with_polarization(mut self, map: Option<Frame>) -> Self {
        self.polarization = self.checked("polarization", map);
        self
    }

    /// Enables mask application.
    #[must_use]
    pub fn with_mask(mut self, map: Option<Frame>) -> Self {
        self.mask = self.checked("mask", map);
        self
    }

    /// True if at least one stage is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.background.is_some()
            || self.gain.is_some()
            || self.polarization.is_some()
            || self.mask.is_some()
    }

    /// Per-pixel failures accumulated over all passes so far.
    #[must_use]
    pub fn fault_count(&self) -> u64 {
        self.fault_count
    }

    /// Runs all enabled stages over the frame, in order.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if the frame itself has the wrong
    /// length; the frame is then untouched and only this call is lost.
    pub fn apply(&mut self, frame: &mut Frame) -> Result<CorrectionReport> {
        if frame.len() != self.n_pixels {
            return Err(Error::ShapeMismatch {
                expected: self.n_pixels,
                actual: frame.len(),
            });
        }

        let mut report = CorrectionReport::default();
        if let Some(background) = &self.background {
            frame.subtract(background)?;
        }
        if let Some(gain) = &self.gain {
            report.zero_divisors += frame.divide(gain)?;
        }
        if let Some(polarization) = &self.polarization {
            report.zero_divisors += frame.divide(polarization)?;
        }
        if let Some(mask) = &self.mask {
            report.masked = mask_pass(frame, mask);
        }

        if !report.clean() {
            log::warn!(
                "correction pass skipped {} zero-divisor pixels",
                report.zero_divisors
            );
        }
        self.fault_count += report.zero_divisors as u64;
        Ok(report)
    }
}

/// Derives the per-pixel polarization correction from the coordinate map.
///
/// `pol(i) = h (1 - sin^2 phi sin^2 theta) + (1-h)(1 - cos^2 phi sin^2
/// theta)` with `h` the horizontal-polarization fraction, clamped to
/// `[0, 1]` with a warning. Built once per run, after the coordinate map.
#[must_use]
pub fn polarization_map(map: &CoordinateMap, horizontal_fraction: f64) -> Frame {
    let h = if (0.0..=1.0).contains(&horizontal_fraction) {
        horizontal_fraction
    } else {
        let clamped = horizontal_fraction.clamp(0.0, 1.0);
        log::warn!(
            "horizontal polarization fraction {horizontal_fraction} outside [0, 1], clamped to {clamped}"
        );
        clamped
    };

    let values = map
        .phi
        .iter()
        .zip(&map.two_theta)
        .map(|(&phi, &two_theta)| {
            let sin2_theta = two_theta.sin() * two_theta.sin();
            h * (1.0 - phi.sin() * phi.sin() * sin2_theta)
                + (1.0 - h) * (1.0 - phi.cos() * phi.cos() * sin2_theta)
        })
        .collect();
    Frame::from_vec(values)
}

fn mask_pass(frame: &mut Frame, mask: &Frame) -> usize {
    let mut masked = 0;
    for (value, &m) in frame.as_mut_slice().iter_mut().zip(mask.as_slice()) {
        if m < MASK_PASS_THRESHOLD {
            *value = 0.0;
            masked += 1;
        }
    }
    masked
}

/// Strict binary mask application: pixels whose mask value is below
/// [`MASK_PASS_THRESHOLD`] are set to zero.
///
/// # Errors
/// Returns [`Error::ShapeMismatch`] if the lengths differ.
pub fn apply_mask(frame: &mut Frame, mask: &Frame) -> Result<usize> {
    if frame.len() != mask.len() {
        return Err(Error::ShapeMismatch {
            expected: frame.len(),
            actual: mask.len(),
        });
    }
    Ok(mask_pass(frame, mask))
}

/// Subtracts `other` from `frame` only where the mask passes; masked-out
/// pixels are zeroed.
///
/// Returns true if any pixel tripped an error condition (a non-finite
/// result).
///
/// # Errors
/// Returns [`Error::ShapeMismatch`] if the lengths differ.
pub fn masked_subtract(frame: &mut Frame, other: &Frame, mask: &Frame) -> Result<bool> {
    masked_op(frame, other, mask, |a, b| a - b)
}

/// Divides `frame` by `other` only where the mask passes; masked-out
/// pixels are zeroed.
///
/// Returns true if any pixel tripped an error condition (zero divisor or
/// non-finite result); such pixels are zeroed as well.
///
/// # Errors
/// Returns [`Error::ShapeMismatch`] if the lengths differ.
pub fn masked_divide(frame: &mut Frame, other: &Frame, mask: &Frame) -> Result<bool> {
    masked_op(frame, other, mask, |a, b| a / b)
}

fn masked_op(
    frame: &mut Frame,
    other: &Frame,
    mask: &Frame,
    op: impl Fn(f64, f64) -> f64,
) -> Result<bool> {
    if frame.len() != other.len() {
        return Err(Error::ShapeMismatch {
            expected: frame.len(),
            actual: other.len(),
        });
    }
    if frame.len() != mask.len() {
        return Err(Error::ShapeMismatch {
            expected: frame.len(),
            actual: mask.len(),
        });
    }

    let mut faulted = false;
    for ((value, &b), &m) in frame
        .as_mut_slice()
        .iter_mut()
        .zip(other.as_slice())
        .zip(mask.as_slice())
    {
        if m < MASK_PASS_THRESHOLD {
            *value = 0.0;
            continue;
        }
        let result = op(*value, b);
        if result.is_finite() {
            *value = result;
        } else {
            *value = 0.0;
            faulted = true;
        }
    }
    Ok(faulted)
}
