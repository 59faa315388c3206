//! Per-pixel coordinate map derived from calibration offsets and live
//! beam geometry.
//!
//! The builder is a pure function: base offsets plus the two live
//! parameters (stage position, wavelength) in, a complete immutable
//! [`CoordinateMap`] out. There is no incremental update path; when a
//! geometry-relevant parameter changes the whole map is rebuilt and
//! swapped in atomically via [`CoordinateMapper`].

use std::sync::Arc;

use rayon::prelude::*;

use crate::{Error, Result};

/// Base per-pixel coordinates from the calibration tables, before any
/// beam-dependent processing.
///
/// Each axis comes in three unit variants: physical micrometers, integer
/// pixel index and fractional pixel index. All six arrays must have the
/// frame length.
#[derive(Debug, Clone, Default)]
pub struct BaseOffsets {
    /// X in micrometers.
    pub x_um: Vec<f64>,
    /// Y in micrometers.
    pub y_um: Vec<f64>,
    /// X as integer pixel index.
    pub x_int: Vec<f64>,
    /// Y as integer pixel index.
    pub y_int: Vec<f64>,
    /// X as fractional pixel index.
    pub x_pix: Vec<f64>,
    /// Y as fractional pixel index.
    pub y_pix: Vec<f64>,
}

impl BaseOffsets {
    /// All-zero offsets, the degraded fallback when the calibration
    /// source is unavailable.
    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self {
            x_um: vec![0.0; len],
            y_um: vec![0.0; len],
            x_int: vec![0.0; len],
            y_int: vec![0.0; len],
            x_pix: vec![0.0; len],
            y_pix: vec![0.0; len],
        }
    }

    /// Number of pixels covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x_um.len()
    }

    /// Returns true if no pixels are covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x_um.is_empty()
    }

    /// Checks that all six arrays agree in length.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] naming the first disagreeing array.
    pub fn validate(&self) -> Result<()> {
        let expected = self.x_um.len();
        for actual in [
            self.y_um.len(),
            self.x_int.len(),
            self.y_int.len(),
            self.x_pix.len(),
            self.y_pix.len(),
        ] {
            if actual != expected {
                return Err(Error::ShapeMismatch { expected, actual });
            }
        }
        Ok(())
    }
}

/// Source of base calibration offsets (stored geometry tables).
///
/// Implementors are responsible for mapping the storage convention onto
/// the beamline convention used here: `x` horizontal, `y` vertical, both
/// in the laboratory frame before the Y flip applied by the builder.
pub trait CalibrationSource {
    /// Reads the per-pixel base offsets.
    ///
    /// # Errors
    /// Returns [`Error::SourceUnavailable`] when the tables cannot be read.
    fn base_offsets(&self) -> Result<BaseOffsets>;
}

/// Static beam-geometry configuration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoordinateConfig {
    /// Fixed offset between the stage zero and the interaction point,
    /// millimeters. Added to the live stage reading to get the true
    /// sample-detector distance.
    pub stage_offset_mm: f64,
    /// Pixel pitch in micrometers (square pixels).
    pub pixel_pitch_um: f64,
    /// Manual beam-center shift in pixel units `(x, y)`. When set it
    /// replaces the automatic min/max midpoint centering; the micrometer
    /// arrays are shifted by `shift * pixel_pitch_um`, the pixel-unit
    /// arrays by `shift` directly.
    pub manual_shift: Option<(f64, f64)>,
}

impl Default for CoordinateConfig {
    fn default() -> Self {
        Self {
            // stage zero is 500 mm downstream of the sample, plus 63 mm
            // between the stage reference and the sensor surface
            stage_offset_mm: 563.0,
            pixel_pitch_um: 109.92,
            manual_shift: None,
        }
    }
}

/// Complete per-pixel coordinate map, immutable once built.
#[derive(Debug, Clone, Default)]
pub struct CoordinateMap {
    /// X in micrometers, beam-centered.
    pub x_um: Vec<f64>,
    /// Y in micrometers, beam-centered.
    pub y_um: Vec<f64>,
    /// X as integer pixel index, beam-centered.
    pub x_int: Vec<f64>,
    /// Y as integer pixel index, beam-centered.
    pub y_int: Vec<f64>,
    /// X as fractional pixel index, beam-centered.
    pub x_pix: Vec<f64>,
    /// Y as fractional pixel index, beam-centered.
    pub y_pix: Vec<f64>,
    /// Reciprocal-space qx, inverse nanometers.
    pub qx: Vec<f64>,
    /// Reciprocal-space qy, inverse nanometers.
    pub qy: Vec<f64>,
    /// Scattering angle two-theta, radians.
    pub two_theta: Vec<f64>,
    /// Azimuth phi in `[0, 2*pi)`, radians.
    pub phi: Vec<f64>,
    /// Sample-detector distance the map was built with, millimeters.
    pub det_distance_mm: f64,
    /// Wavelength the map was built with, nanometers.
    pub wavelength_nm: f64,
}

impl CoordinateMap {
    /// Number of pixels covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x_um.len()
    }

    /// Returns true if no pixels are covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x_um.is_empty()
    }
}

fn midpoint(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (min + max) / 2.0
}

fn shift_axis(values: &mut [f64], shift: f64) {
    for v in values {
        *v -= shift;
    }
}

fn negate_axis(values: &mut [f64]) {
    for v in values {
        *v = -*v;
    }
}

/// Builds the full coordinate map from base offsets and live geometry.
///
/// Steps: center each axis (min/max midpoint, or the configured manual
/// shift), flip the Y axis to the beamline convention, then derive for
/// every pixel `r = hypot(x_um, y_um)`, `two_theta = atan2(r_mm,
/// det_distance_mm)`, `phi = atan2(y, x)` wrapped into `[0, 2*pi)` and
/// `q = 2k sin(two_theta/2) (cos phi, sin phi)` with `k = 2*pi /
/// wavelength_nm`.
///
/// The two-argument arctangent is used for both angles; older variants
/// of this derivation disagreed on `atan` vs `atan2` and on the axis
/// assignment, this implementation standardizes on the quadrant-correct,
/// axis-consistent form.
///
/// A non-positive wavelength yields zero q vectors (the angles are still
/// valid); this keeps degraded runs alive per the error policy.
#[must_use]
pub fn build_coordinate_map(
    base: &BaseOffsets,
    config: &CoordinateConfig,
    stage_mm: f64,
    wavelength_nm: f64,
) -> CoordinateMap {
    let det_distance_mm = config.stage_offset_mm + stage_mm;
    let k = if wavelength_nm > 0.0 {
        2.0 * std::f64::consts::PI / wavelength_nm
    } else {
        log::warn!("non-positive wavelength {wavelength_nm} nm, q vectors will be zero");
        0.0
    };

    let mut map = CoordinateMap {
        x_um: base.x_um.clone(),
        y_um: base.y_um.clone(),
        x_int: base.x_int.clone(),
        y_int: base.y_int.clone(),
        x_pix: base.x_pix.clone(),
        y_pix: base.y_pix.clone(),
        det_distance_mm,
        wavelength_nm,
        ..CoordinateMap::default()
    };

    // center on the beam: automatic midpoint, or the manual correction
    // when the beam was not centered in the detector
    if let Some((sx, sy)) = config.manual_shift {
        shift_axis(&mut map.x_um, sx * config.pixel_pitch_um);
        shift_axis(&mut map.y_um, sy * config.pixel_pitch_um);
        shift_axis(&mut map.x_int, sx);
        shift_axis(&mut map.y_int, sy);
        shift_axis(&mut map.x_pix, sx);
        shift_axis(&mut map.y_pix, sy);
    } else {
        for axis in [
            &mut map.x_um,
            &mut map.y_um,
            &mut map.x_int,
            &mut map.y_int,
            &mut map.x_pix,
            &mut map.y_pix,
        ] {
            let mid = midpoint(axis);
            shift_axis(axis, mid);
        }
    }

    // axis-convention flip: beamline Y points up
    negate_axis(&mut map.y_um);
    negate_axis(&mut map.y_int);
    negate_axis(&mut map.y_pix);

    let polar: Vec<(f64, f64, f64, f64)> = map
        .x_um
        .par_iter()
        .zip(map.y_um.par_iter())
        .map(|(&x_um, &y_um)| {
            let r_um = x_um.hypot(y_um);
            let two_theta = (r_um / 1000.0).atan2(det_distance_mm);
            let mut phi = y_um.atan2(x_um);
            if phi < 0.0 {
                phi += 2.0 * std::f64::consts::PI;
            }
            let amplitude = 2.0 * k * (two_theta / 2.0).sin();
            (two_theta, phi, amplitude * phi.cos(), amplitude * phi.sin())
        })
        .collect();

    map.two_theta = polar.iter().map(|p| p.0).collect();
    map.phi = polar.iter().map(|p| p.1).collect();
    map.qx = polar.iter().map(|p| p.2).collect();
    map.qy = polar.iter().map(|p| p.3).collect();

    map
}

/// Owns the base offsets and the live coordinate map.
///
/// `rebuild` recomputes the whole map and swaps the shared `Arc`;
/// readers holding the old map keep a consistent view, new readers see
/// the new map. This is the only mutation path, satisfying the
/// rebuild-and-swap atomicity contract for multi-threaded hosts.
#[derive(Debug)]
pub struct CoordinateMapper {
    base: BaseOffsets,
    config: CoordinateConfig,
    current: Arc<CoordinateMap>,
    rebuilds: u64,
    last_stage_mm: f64,
    last_wavelength_nm: f64,
}

impl CoordinateMapper {
    /// Creates a mapper from a calibration source.
    ///
    /// An unavailable source degrades to all-zero base offsets: the map
    /// will be geometrically meaningless but discrimination can still
    /// run. This is surfaced loudly but is deliberately not fatal.
    #[must_use]
    pub fn from_source(
        source: &dyn CalibrationSource,
        config: CoordinateConfig,
        n_pixels: usize,
    ) -> Self {
        let base = match source.base_offsets().and_then(|base| {
            base.validate()?;
            Ok(base)
        }) {
            Ok(base) => base,
            Err(err) => {
                log::error!("calibration source failed ({err}), falling back to zero offsets");
                BaseOffsets::zeros(n_pixels)
            }
        };
        Self::new(base, config)
    }

    /// Creates a mapper from already-loaded base offsets.
    #[must_use]
    pub fn new(base: BaseOffsets, config: CoordinateConfig) -> Self {
        Self {
            base,
            config,
            current: Arc::new(CoordinateMap::default()),
            rebuilds: 0,
            last_stage_mm: 0.0,
            last_wavelength_nm: 0.0,
        }
    }

    /// The live map. Cheap to clone and read-share.
    #[must_use]
    pub fn map(&self) -> Arc<CoordinateMap> {
        Arc::clone(&self.current)
    }

    /// How many times the map has been (re)built.
    #[must_use]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Rebuilds the whole map from the given live readings and swaps it
    /// in. `None` means the reading was invalid this event; the last
    /// known value is reused.
    pub fn rebuild(&mut self, stage_mm: Option<f64>, wavelength_nm: Option<f64>) {
        match stage_mm {
            Some(value) => self.last_stage_mm = value,
            None => log::warn!(
                "detector position reading invalid, reusing {} mm",
                self.last_stage_mm
            ),
        }
        match wavelength_nm {
            Some(value) => self.last_wavelength_nm = value,
            None => log::warn!(
                "wavelength reading invalid, reusing {} nm",
                self.last_wavelength_nm
            ),
        }
        self.current = Arc::new(build_coordinate_map(
            &self.base,
            &self.config,
            self.last_stage_mm,
            self.last_wavelength_nm,
        ));
        self.rebuilds += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn cross_offsets() -> BaseOffsets {
        // four pixels on the axes around an off-center origin
        BaseOffsets {
            x_um: vec![100.0, 300.0, 200.0, 200.0],
            y_um: vec![50.0, 50.0, -50.0, 150.0],
            x_int: vec![1.0, 3.0, 2.0, 2.0],
            y_int: vec![1.0, 1.0, 0.0, 2.0],
            x_pix: vec![1.0, 3.0, 2.0, 2.0],
            y_pix: vec![1.0, 1.0, 0.0, 2.0],
        }
    }

    #[test]
    fn test_centering_and_y_flip() {
        let map = build_coordinate_map(
            &cross_offsets(),
            &CoordinateConfig::default(),
            100.0,
            0.1,
        );
        // midpoint centering puts the beam at (200, 50); Y is negated
        assert_eq!(map.x_um, vec![-100.0, 100.0, 0.0, 0.0]);
        assert_eq!(map.y_um, vec![0.0, 0.0, 100.0, -100.0]);
        assert_relative_eq!(map.det_distance_mm, 663.0);
    }

    #[test]
    fn test_manual_shift() {
        let config = CoordinateConfig {
            manual_shift: Some((1.0, 1.0)),
            pixel_pitch_um: 100.0,
            ..CoordinateConfig::default()
        };
        let map = build_coordinate_map(&cross_offsets(), &config, 0.0, 0.1);
        // micrometer arrays shift by pitch, pixel arrays by the raw value
        assert_eq!(map.x_um, vec![0.0, 200.0, 100.0, 100.0]);
        assert_eq!(map.x_int, vec![0.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_angles_and_q() {
        let base = BaseOffsets {
            x_um: vec![0.0, 2000.0],
            y_um: vec![1000.0, 1000.0],
            x_int: vec![0.0, 2.0],
            y_int: vec![1.0, 1.0],
            x_pix: vec![0.0, 2.0],
            y_pix: vec![1.0, 1.0],
        };
        let config = CoordinateConfig {
            stage_offset_mm: 1000.0,
            manual_shift: Some((0.0, 0.0)),
            ..CoordinateConfig::default()
        };
        let map = build_coordinate_map(&base, &config, 0.0, 2.0 * PI);
        // k = 1; pixel 0 sits at (0, -1000) um after the Y flip
        assert_relative_eq!(map.phi[0], 1.5 * PI, epsilon = 1e-12);
        assert_relative_eq!(map.two_theta[0], (1.0f64 / 1000.0).atan(), epsilon = 1e-12);
        let amplitude = 2.0 * (map.two_theta[0] / 2.0).sin();
        // straight down the -y axis: qx vanishes, qy = -|q|
        assert_relative_eq!(map.qx[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(map.qy[0], -amplitude, epsilon = 1e-12);
        // all phi are wrapped into [0, 2*pi)
        assert!(map.phi.iter().all(|&p| (0.0..2.0 * PI).contains(&p)));
    }

    #[test]
    fn test_zero_wavelength_degrades_to_zero_q() {
        let map = build_coordinate_map(
            &cross_offsets(),
            &CoordinateConfig::default(),
            100.0,
            0.0,
        );
        assert!(map.qx.iter().all(|&q| q == 0.0));
        assert!(map.qy.iter().all(|&q| q == 0.0));
        assert!(map.two_theta.iter().any(|&t| t > 0.0));
    }

    #[test]
    fn test_mapper_swaps_arc_on_rebuild() {
        let mut mapper = CoordinateMapper::new(cross_offsets(), CoordinateConfig::default());
        mapper.rebuild(Some(100.0), Some(0.2));
        let first = mapper.map();
        mapper.rebuild(Some(100.0), Some(0.25));
        let second = mapper.map();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(mapper.rebuild_count(), 2);
        assert_relative_eq!(first.wavelength_nm, 0.2);
        assert_relative_eq!(second.wavelength_nm, 0.25);
    }

    #[test]
    fn test_mapper_reuses_last_valid_reading() {
        let mut mapper = CoordinateMapper::new(cross_offsets(), CoordinateConfig::default());
        mapper.rebuild(Some(100.0), Some(0.2));
        mapper.rebuild(None, None);
        let map = mapper.map();
        assert_relative_eq!(map.det_distance_mm, 663.0);
        assert_relative_eq!(map.wavelength_nm, 0.2);
    }

    struct DeadSource;
    impl CalibrationSource for DeadSource {
        fn base_offsets(&self) -> Result<BaseOffsets> {
            Err(Error::SourceUnavailable("no tables".into()))
        }
    }

    #[test]
    fn test_dead_source_degrades_to_zero_map() {
        let mut mapper =
            CoordinateMapper::from_source(&DeadSource, CoordinateConfig::default(), 4);
        mapper.rebuild(Some(100.0), Some(0.2));
        let map = mapper.map();
        assert_eq!(map.len(), 4);
        assert!(map.x_um.iter().all(|&v| v == 0.0));
    }
}
