//! Detector layout and flat-index arithmetic.
//!
//! A full detector is 4 quadrants of 8 sensor tiles ("2x1"s), each tile
//! 185 columns by 388 rows. Acquisition order flattens this hierarchy to
//! a single index: `idx = quad*pxPerQuad + tile*pxPerTile + col*rows + row`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of quadrants in the full detector.
pub const N_QUADS: usize = 4;
/// Number of sensor tiles (2x1 sections) per quadrant.
pub const N_TILES_PER_QUAD: usize = 8;
/// Columns per tile.
pub const N_COLS_PER_TILE: usize = 185;
/// Rows per tile (two readout halves of 194 rows each).
pub const N_ROWS_PER_TILE: usize = 388;

/// Layout of a segmented area detector.
///
/// The [`Default`] layout is the full-size detector (4 x 8 x 185 x 388,
/// 2 296 960 pixels). Smaller layouts are useful in tests and for
/// partially-read-out detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorGeometry {
    /// Number of quadrants.
    pub quads: usize,
    /// Number of tiles per quadrant.
    pub tiles_per_quad: usize,
    /// Columns per tile.
    pub cols_per_tile: usize,
    /// Rows per tile.
    pub rows_per_tile: usize,
}

impl Default for DetectorGeometry {
    fn default() -> Self {
        Self {
            quads: N_QUADS,
            tiles_per_quad: N_TILES_PER_QUAD,
            cols_per_tile: N_COLS_PER_TILE,
            rows_per_tile: N_ROWS_PER_TILE,
        }
    }
}

impl DetectorGeometry {
    /// Creates the full-size detector layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pixels in one tile.
    #[must_use]
    pub fn pixels_per_tile(&self) -> usize {
        self.cols_per_tile * self.rows_per_tile
    }

    /// Pixels in one quadrant.
    #[must_use]
    pub fn pixels_per_quad(&self) -> usize {
        self.pixels_per_tile() * self.tiles_per_quad
    }

    /// Total pixels in the detector (flat frame length).
    #[must_use]
    pub fn total_pixels(&self) -> usize {
        self.pixels_per_quad() * self.quads
    }

    /// Shape of the raw 2D view before the final transpose:
    /// quadrants stacked as super-rows, tiles side by side as super-columns.
    #[must_use]
    pub fn raw_grid_shape(&self) -> (usize, usize) {
        (
            self.quads * self.rows_per_tile,
            self.tiles_per_quad * self.cols_per_tile,
        )
    }

    /// Decomposes a flat acquisition-order index into its pixel identity.
    ///
    /// # Errors
    /// Returns [`Error::IndexOutOfRange`] if `index` is not a valid pixel.
    pub fn pixel_id(&self, index: usize) -> Result<PixelId> {
        if index >= self.total_pixels() {
            return Err(Error::IndexOutOfRange(index));
        }
        let quad = index / self.pixels_per_quad();
        let rem = index % self.pixels_per_quad();
        let tile = rem / self.pixels_per_tile();
        let rem = rem % self.pixels_per_tile();
        let col = rem / self.rows_per_tile;
        let row = rem % self.rows_per_tile;
        Ok(PixelId {
            quad,
            tile,
            col,
            row,
        })
    }
}

/// Identity of one pixel within the detector hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PixelId {
    /// Quadrant index.
    pub quad: usize,
    /// Tile (2x1 section) index within the quadrant.
    pub tile: usize,
    /// Column within the tile.
    pub col: usize,
    /// Row within the tile.
    pub row: usize,
}

impl PixelId {
    /// Flat acquisition-order index of this pixel.
    #[inline]
    #[must_use]
    pub fn flat_index(&self, geometry: &DetectorGeometry) -> usize {
        self.quad * geometry.pixels_per_quad()
            + self.tile * geometry.pixels_per_tile()
            + self.col * geometry.rows_per_tile
            + self.row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_detector_constants() {
        let geom = DetectorGeometry::default();
        assert_eq!(geom.pixels_per_tile(), 71_780);
        assert_eq!(geom.pixels_per_quad(), 574_240);
        assert_eq!(geom.total_pixels(), 2_296_960);
        assert_eq!(geom.raw_grid_shape(), (4 * 388, 8 * 185));
    }

    #[test]
    fn test_index_decomposition() {
        let geom = DetectorGeometry::default();
        let id = geom.pixel_id(574_240 + 71_780 + 388 + 1).unwrap();
        assert_eq!(
            id,
            PixelId {
                quad: 1,
                tile: 1,
                col: 1,
                row: 1
            }
        );
        assert_eq!(id.flat_index(&geom), 574_240 + 71_780 + 388 + 1);
    }

    #[test]
    fn test_index_bijection_small_layout() {
        let geom = DetectorGeometry {
            quads: 2,
            tiles_per_quad: 3,
            cols_per_tile: 4,
            rows_per_tile: 5,
        };
        for index in 0..geom.total_pixels() {
            let id = geom.pixel_id(index).unwrap();
            assert_eq!(id.flat_index(&geom), index);
        }
    }

    #[test]
    fn test_index_bijection_full_extremes() {
        let geom = DetectorGeometry::default();
        assert_eq!(
            geom.pixel_id(0).unwrap(),
            PixelId {
                quad: 0,
                tile: 0,
                col: 0,
                row: 0
            }
        );
        let last = geom.total_pixels() - 1;
        assert_eq!(
            geom.pixel_id(last).unwrap(),
            PixelId {
                quad: 3,
                tile: 7,
                col: 184,
                row: 387
            }
        );
        assert!(geom.pixel_id(geom.total_pixels()).is_err());
    }
}
