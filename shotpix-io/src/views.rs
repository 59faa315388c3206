//! CSV export of 2D detector views.
//!
//! Raw and assembled views are exported as comma-separated rows for
//! quick inspection in external plotting tools.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::Array2;

use crate::Result;

/// Writes a 2D view as CSV, one matrix row per line.
///
/// # Errors
/// Returns [`Error::Io`](crate::Error::Io) on any filesystem failure.
pub fn write_view_csv(path: &Path, view: &Array2<f64>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for row in view.rows() {
        let mut first = true;
        for value in row {
            if first {
                first = false;
            } else {
                write!(writer, ",")?;
            }
            write!(writer, "{value}")?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}
