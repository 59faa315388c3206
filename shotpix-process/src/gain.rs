//! Gain-map generation from a model intensity curve.
//!
//! The run average of an isotropic scatterer should follow a known 1-D
//! intensity curve in `|q|`. The per-pixel deviation from that curve is
//! the gain: `gain[i] = average[i] / model[floor(|q_i| / model_delta)]`,
//! with `|q_i|` taken from the coordinate map. The resulting map feeds
//! the gain stage of the correction pipeline.

use shotpix_calib::CoordinateMap;
use shotpix_core::{Error, Frame, Result};

/// Builds a per-pixel gain map from a 1-D model intensity curve.
#[derive(Debug, Clone)]
pub struct GainBuilder {
    model: Vec<f64>,
    model_delta: f64,
}

impl GainBuilder {
    /// Creates a builder from a model curve binned in `|q|` steps of
    /// `model_delta`.
    #[must_use]
    pub fn new(model: Vec<f64>, model_delta: f64) -> Self {
        Self { model, model_delta }
    }

    /// Rescales the model curve so its maximum matches `target_max`
    /// (normally the peak of the measured 1-D scattering curve).
    pub fn scale_model_to(&mut self, target_max: f64) {
        let model_max = self
            .model
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if model_max > 0.0 {
            let scaling = target_max / model_max;
            for value in &mut self.model {
                *value *= scaling;
            }
            log::info!("model scaled by {scaling} to a maximum of {target_max}");
        } else {
            log::warn!("model maximum {model_max} is not positive, scaling skipped");
        }
    }

    /// Derives the gain map for `average` using the `qx`/`qy` arrays of
    /// the coordinate map.
    ///
    /// Pixels whose `|q|` falls outside the model range, or whose model
    /// intensity is zero, keep a gain of 1 and are counted with a
    /// warning; they never fail the call.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for an empty model or a
    /// non-positive bin width, [`Error::ShapeMismatch`] if the average
    /// and the coordinate map disagree in length.
    pub fn build(&self, average: &Frame, map: &CoordinateMap) -> Result<Frame> {
        if self.model.is_empty() {
            return Err(Error::ConfigError("gain model curve is empty".into()));
        }
        if self.model_delta <= 0.0 {
            return Err(Error::ConfigError(format!(
                "gain model bin width {} is not positive",
                self.model_delta
            )));
        }
        if average.len() != map.len() {
            return Err(Error::ShapeMismatch {
                expected: map.len(),
                actual: average.len(),
            });
        }

        let mut gain = Frame::ones(average.len());
        let mut skipped = 0usize;
        for (index, value) in gain.as_mut_slice().iter_mut().enumerate() {
            let q_abs = map.qx[index].hypot(map.qy[index]);
            let bin = (q_abs / self.model_delta).floor() as usize;
            match self.model.get(bin) {
                Some(&model) if model != 0.0 => {
                    *value = average.as_slice()[index] / model;
                }
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            log::warn!("{skipped} pixels fell outside the model curve, gain left at 1");
        }
        Ok(gain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_bin_map() -> CoordinateMap {
        // |q| = 0.5 for the first two pixels (bin 0), 1.5 for the last
        // two (bin 1)
        CoordinateMap {
            qx: vec![0.5, 0.0, 1.5, 0.0],
            qy: vec![0.0, 0.5, 0.0, 1.5],
            x_um: vec![0.0; 4],
            y_um: vec![0.0; 4],
            ..CoordinateMap::default()
        }
    }

    #[test]
    fn test_gain_is_average_over_model() {
        let builder = GainBuilder::new(vec![2.0, 4.0], 1.0);
        let average = Frame::from_vec(vec![4.0, 6.0, 4.0, 2.0]);
        let gain = builder.build(&average, &two_bin_map()).unwrap();
        assert_eq!(gain.as_slice(), &[2.0, 3.0, 1.0, 0.5]);
    }

    #[test]
    fn test_out_of_range_and_zero_model_keep_unit_gain() {
        // bin 1 has zero model intensity, |q| beyond the curve has no bin
        let builder = GainBuilder::new(vec![2.0, 0.0], 0.5);
        let average = Frame::from_vec(vec![4.0, 4.0, 4.0, 4.0]);
        let map = CoordinateMap {
            qx: vec![0.1, 0.7, 3.0, 0.0],
            qy: vec![0.0, 0.0, 0.0, 9.0],
            x_um: vec![0.0; 4],
            y_um: vec![0.0; 4],
            ..CoordinateMap::default()
        };
        let gain = builder.build(&average, &map).unwrap();
        assert_eq!(gain.as_slice(), &[2.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_empty_model_is_a_config_error() {
        let builder = GainBuilder::new(vec![], 1.0);
        let average = Frame::from_vec(vec![1.0; 4]);
        assert!(matches!(
            builder.build(&average, &two_bin_map()),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_non_positive_delta_is_a_config_error() {
        let builder = GainBuilder::new(vec![1.0], 0.0);
        let average = Frame::from_vec(vec![1.0; 4]);
        assert!(matches!(
            builder.build(&average, &two_bin_map()),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let builder = GainBuilder::new(vec![1.0], 1.0);
        let average = Frame::from_vec(vec![1.0; 3]);
        assert!(matches!(
            builder.build(&average, &two_bin_map()),
            Err(Error::ShapeMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_model_scaling() {
        let mut builder = GainBuilder::new(vec![1.0, 2.0, 4.0], 1.0);
        builder.scale_model_to(10.0);
        let average = Frame::from_vec(vec![5.0; 4]);
        let map = CoordinateMap {
            qx: vec![0.5, 1.5, 2.5, 2.5],
            qy: vec![0.0; 4],
            x_um: vec![0.0; 4],
            y_um: vec![0.0; 4],
            ..CoordinateMap::default()
        };
        // model becomes [2.5, 5, 10]
        let gain = builder.build(&average, &map).unwrap();
        assert_relative_eq!(gain.as_slice()[0], 2.0);
        assert_relative_eq!(gain.as_slice()[1], 1.0);
        assert_relative_eq!(gain.as_slice()[2], 0.5);
    }
}
