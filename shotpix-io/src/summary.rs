//! Run summary persistence.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use shotpix_engine::RunSummary;

use crate::Result;

/// Writes the end-of-run summary as pretty-printed JSON.
///
/// # Errors
/// Returns [`Error::Io`](crate::Error::Io) or
/// [`Error::Json`](crate::Error::Json) on failure.
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, summary)?;
    Ok(())
}

/// Reads a previously written run summary.
///
/// # Errors
/// Returns [`Error::Io`](crate::Error::Io) or
/// [`Error::Json`](crate::Error::Json) on failure.
pub fn read_summary(path: &Path) -> Result<RunSummary> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
