//! Raw and assembled 2D renderings of a flat frame.
//!
//! The raw view preserves quad/tile adjacency: quadrants are stacked as
//! super-rows and the eight tiles of each quadrant sit side by side as
//! super-columns.
//!
//! ```text
//!    +--+--+--+--+--+--+--+--+
//! q0 |  |  |  |  |  |  |  |  |
//!    +--+--+--+--+--+--+--+--+
//! q1 |  |  |  |  |  |  |  |  |
//!    +--+--+--+--+--+--+--+--+
//! q2 |  |  |  |  |  |  |  |  |
//!    +--+--+--+--+--+--+--+--+
//! q3 |  |  |  |  |  |  |  |  |
//!    +--+--+--+--+--+--+--+--+
//!     t0 t1 t2 t3 t4 t5 t6 t7
//! ```
//!
//! Both views end with a transpose to match the row/column convention of
//! the downstream visualization tools.

use ndarray::Array2;

use crate::{DetectorGeometry, Error, Frame, Result};

/// Renders the raw tiled 2D view of a frame.
///
/// The mapping is a deterministic reindexing; [`frame_from_raw_view`] is
/// its exact inverse and the round trip is bitwise-exact.
///
/// # Errors
/// [`Error::EmptyFrame`] for a zero-length frame, [`Error::ShapeMismatch`]
/// if the frame does not match the detector layout.
pub fn raw_view(frame: &Frame, geometry: &DetectorGeometry) -> Result<Array2<f64>> {
    if frame.is_empty() {
        return Err(Error::EmptyFrame);
    }
    if frame.len() != geometry.total_pixels() {
        return Err(Error::ShapeMismatch {
            expected: geometry.total_pixels(),
            actual: frame.len(),
        });
    }

    let (rows, cols) = geometry.raw_grid_shape();
    let mut grid = Array2::<f64>::zeros((rows, cols));
    let data = frame.as_slice();

    for quad in 0..geometry.quads {
        let super_row = quad * geometry.rows_per_tile;
        for tile in 0..geometry.tiles_per_quad {
            let super_col = tile * geometry.cols_per_tile;
            let tile_base =
                quad * geometry.pixels_per_quad() + tile * geometry.pixels_per_tile();
            for col in 0..geometry.cols_per_tile {
                for row in 0..geometry.rows_per_tile {
                    grid[(super_row + row, super_col + col)] =
                        data[tile_base + col * geometry.rows_per_tile + row];
                }
            }
        }
    }

    Ok(grid.reversed_axes())
}

/// Reconstructs the flat frame from a raw 2D view.
///
/// Exact inverse of [`raw_view`].
///
/// # Errors
/// [`Error::ViewMismatch`] if the view dimensions do not match the layout.
pub fn frame_from_raw_view(view: &Array2<f64>, geometry: &DetectorGeometry) -> Result<Frame> {
    let (rows, cols) = geometry.raw_grid_shape();
    // the stored view is transposed relative to the construction grid
    if view.dim() != (cols, rows) {
        return Err(Error::ViewMismatch {
            rows: view.dim().0,
            cols: view.dim().1,
        });
    }

    let grid = view.t();
    let mut frame = Frame::zeros(geometry.total_pixels());
    let data = frame.as_mut_slice();

    for quad in 0..geometry.quads {
        let super_row = quad * geometry.rows_per_tile;
        for tile in 0..geometry.tiles_per_quad {
            let super_col = tile * geometry.cols_per_tile;
            let tile_base =
                quad * geometry.pixels_per_quad() + tile * geometry.pixels_per_tile();
            for col in 0..geometry.cols_per_tile {
                for row in 0..geometry.rows_per_tile {
                    data[tile_base + col * geometry.rows_per_tile + row] =
                        grid[(super_row + row, super_col + col)];
                }
            }
        }
    }

    Ok(frame)
}

/// Scatters a frame onto the physically assembled canvas.
///
/// `x` and `y` give the integer pixel position of each frame element
/// (normally the `x_int`/`y_int` arrays of the coordinate map). The
/// coordinates are shifted so their minimum is zero; the shift operates
/// on a local copy, the caller's arrays are never mutated. The canvas is
/// sized `ceil(max - min) + 1` per axis. The mapping is not bijective:
/// aliasing elements overwrite each other (last write wins) and cells
/// with no contributor stay zero. No interpolation is performed.
///
/// # Errors
/// [`Error::EmptyFrame`] for a zero-length frame, [`Error::ShapeMismatch`]
/// if the coordinate arrays do not match the frame length.
pub fn assembled_view(frame: &Frame, x: &[f64], y: &[f64]) -> Result<Array2<f64>> {
    let (x, y, canvas) = shifted_coordinates(frame, x, y)?;
    scatter(frame, &x, &y, canvas)
}

/// Scatters a frame onto a fixed-size canvas `(height, width)`.
///
/// Same shift and placement rules as [`assembled_view`]; elements whose
/// shifted position falls outside the canvas are dropped, not an error.
///
/// # Errors
/// Same failure modes as [`assembled_view`].
pub fn assembled_view_on_canvas(
    frame: &Frame,
    x: &[f64],
    y: &[f64],
    canvas: (usize, usize),
) -> Result<Array2<f64>> {
    let (x, y, _) = shifted_coordinates(frame, x, y)?;
    scatter(frame, &x, &y, canvas)
}

fn shifted_coordinates(
    frame: &Frame,
    x: &[f64],
    y: &[f64],
) -> Result<(Vec<f64>, Vec<f64>, (usize, usize))> {
    if frame.is_empty() {
        return Err(Error::EmptyFrame);
    }
    if frame.len() != x.len() {
        return Err(Error::ShapeMismatch {
            expected: frame.len(),
            actual: x.len(),
        });
    }
    if frame.len() != y.len() {
        return Err(Error::ShapeMismatch {
            expected: frame.len(),
            actual: y.len(),
        });
    }

    let x_min = x.iter().copied().fold(f64::INFINITY, f64::min);
    let x_max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let y_min = y.iter().copied().fold(f64::INFINITY, f64::min);
    let y_max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let width = (x_max - x_min).ceil() as usize + 1;
    let height = (y_max - y_min).ceil() as usize + 1;

    let x: Vec<f64> = x.iter().map(|v| v - x_min).collect();
    let y: Vec<f64> = y.iter().map(|v| v - y_min).collect();
    Ok((x, y, (height, width)))
}

fn scatter(frame: &Frame, x: &[f64], y: &[f64], canvas: (usize, usize)) -> Result<Array2<f64>> {
    let (height, width) = canvas;
    let mut grid = Array2::<f64>::zeros((height, width));
    for (index, &value) in frame.as_slice().iter().enumerate() {
        let row = y[index] as usize;
        let col = x[index] as usize;
        if row < height && col < width {
            grid[(row, col)] = value;
        }
    }
    Ok(grid.reversed_axes())
}
