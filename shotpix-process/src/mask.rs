//! Mask generation from run-averaged detector data.
//!
//! A pixel is good when its run average lies inside the configured
//! boundaries; optionally the readout artifacts of the sensor tiles are
//! removed analytically (the frame rows/columns of each ASIC half and
//! the thirteenth-from-last row, which carry bonding and guard-ring
//! structures rather than signal).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use shotpix_core::{DetectorGeometry, Error, Frame, Result};

/// Builds a binary mask (1 = keep, 0 = reject) from a run average.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaskBuilder {
    /// Pixels averaging below this are rejected.
    pub lower_bound: f64,
    /// Pixels averaging above this are rejected.
    pub upper_bound: f64,
    /// Reject the first/last row and column of every ASIC half.
    pub exclude_asic_edges: bool,
    /// Reject the thirteenth-from-last row of every ASIC half.
    pub exclude_thirteenth_row: bool,
}

impl Default for MaskBuilder {
    fn default() -> Self {
        Self {
            lower_bound: 0.0,
            upper_bound: 1500.0,
            exclude_asic_edges: true,
            exclude_thirteenth_row: true,
        }
    }
}

impl MaskBuilder {
    /// Builds the mask for `average`, optionally starting from an
    /// existing mask (pixels already rejected there stay rejected).
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if `average` (or the existing
    /// mask) does not match the detector layout.
    pub fn build(
        &self,
        average: &Frame,
        geometry: &DetectorGeometry,
        existing: Option<&Frame>,
    ) -> Result<Frame> {
        let n = geometry.total_pixels();
        if average.len() != n {
            return Err(Error::ShapeMismatch {
                expected: n,
                actual: average.len(),
            });
        }
        let mut mask = match existing {
            Some(previous) if previous.len() == n => previous.clone(),
            Some(previous) => {
                return Err(Error::ShapeMismatch {
                    expected: n,
                    actual: previous.len(),
                })
            }
            None => Frame::ones(n),
        };

        for (index, (&avg, value)) in average
            .as_slice()
            .iter()
            .zip(mask.as_mut_slice().iter_mut())
            .enumerate()
        {
            if avg < self.lower_bound || avg > self.upper_bound {
                *value = 0.0;
                continue;
            }
            if self.exclude_asic_edges || self.exclude_thirteenth_row {
                // geometry.pixel_id is infallible for indices < n
                let id = geometry.pixel_id(index)?;
                let half = geometry.rows_per_tile / 2;
                let (row, col) = (id.row, id.col);
                if self.exclude_asic_edges
                    && (row == 0
                        || row + 1 == geometry.rows_per_tile
                        || col == 0
                        || col + 1 == geometry.cols_per_tile
                        || (half > 0 && (row == half - 1 || row == half)))
                {
                    *value = 0.0;
                } else if self.exclude_thirteenth_row
                    && half >= 13
                    && (row == half - 13 || row == 2 * half - 13)
                {
                    *value = 0.0;
                }
            }
        }
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotpix_core::PixelId;

    fn geometry() -> DetectorGeometry {
        DetectorGeometry {
            quads: 1,
            tiles_per_quad: 1,
            cols_per_tile: 4,
            rows_per_tile: 30,
        }
    }

    fn interior_index(geometry: &DetectorGeometry) -> usize {
        PixelId {
            quad: 0,
            tile: 0,
            col: 1,
            row: 5,
        }
        .flat_index(geometry)
    }

    #[test]
    fn test_bad_pixel_bounds() {
        let geom = geometry();
        let builder = MaskBuilder {
            lower_bound: 0.0,
            upper_bound: 10.0,
            exclude_asic_edges: false,
            exclude_thirteenth_row: false,
        };
        let mut average = Frame::from_vec(vec![5.0; geom.total_pixels()]);
        let hot = interior_index(&geom);
        average.as_mut_slice()[hot] = 50.0;
        let mask = builder.build(&average, &geom, None).unwrap();
        assert_eq!(mask.as_slice()[hot], 0.0);
        assert_eq!(mask.as_slice()[hot + 1], 1.0);
    }

    #[test]
    fn test_asic_edges_removed() {
        let geom = geometry();
        let builder = MaskBuilder {
            lower_bound: f64::NEG_INFINITY,
            upper_bound: f64::INFINITY,
            exclude_asic_edges: true,
            exclude_thirteenth_row: false,
        };
        let average = Frame::zeros(geom.total_pixels());
        let mask = builder.build(&average, &geom, None).unwrap();
        let at = |col: usize, row: usize| {
            mask.as_slice()[PixelId {
                quad: 0,
                tile: 0,
                col,
                row,
            }
            .flat_index(&geom)]
        };
        // half boundary sits at rows 14/15 for 30 rows per tile
        assert_eq!(at(1, 0), 0.0);
        assert_eq!(at(1, 14), 0.0);
        assert_eq!(at(1, 15), 0.0);
        assert_eq!(at(1, 29), 0.0);
        assert_eq!(at(0, 5), 0.0);
        assert_eq!(at(3, 5), 0.0);
        assert_eq!(at(1, 5), 1.0);
    }

    #[test]
    fn test_thirteenth_row_removed() {
        let geom = geometry();
        let builder = MaskBuilder {
            lower_bound: f64::NEG_INFINITY,
            upper_bound: f64::INFINITY,
            exclude_asic_edges: false,
            exclude_thirteenth_row: true,
        };
        let average = Frame::zeros(geom.total_pixels());
        let mask = builder.build(&average, &geom, None).unwrap();
        let at = |row: usize| {
            mask.as_slice()[PixelId {
                quad: 0,
                tile: 0,
                col: 1,
                row,
            }
            .flat_index(&geom)]
        };
        // rows-per-half is 15, so rows 2 and 17 are thirteenth-from-last
        assert_eq!(at(2), 0.0);
        assert_eq!(at(17), 0.0);
        assert_eq!(at(3), 1.0);
    }

    #[test]
    fn test_single_row_tiles_do_not_panic() {
        let geom = DetectorGeometry {
            quads: 1,
            tiles_per_quad: 1,
            cols_per_tile: 3,
            rows_per_tile: 1,
        };
        let builder = MaskBuilder::default();
        let average = Frame::from_vec(vec![1.0; geom.total_pixels()]);
        let mask = builder.build(&average, &geom, None).unwrap();
        // every pixel sits on a tile edge
        assert!(mask.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_existing_mask_is_preserved() {
        let geom = geometry();
        let builder = MaskBuilder {
            lower_bound: f64::NEG_INFINITY,
            upper_bound: f64::INFINITY,
            exclude_asic_edges: false,
            exclude_thirteenth_row: false,
        };
        let average = Frame::zeros(geom.total_pixels());
        let mut existing = Frame::ones(geom.total_pixels());
        let dead = interior_index(&geom);
        existing.as_mut_slice()[dead] = 0.0;
        let mask = builder.build(&average, &geom, Some(&existing)).unwrap();
        assert_eq!(mask.as_slice()[dead], 0.0);
    }
}
