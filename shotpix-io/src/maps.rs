//! Reading and writing per-pixel maps (backgrounds, gains, masks).
//!
//! Maps are stored as plain text, one value per line in flat pixel
//! order. The length is validated against the detector layout on load;
//! a truncated or padded file never reaches the correction pipeline.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use shotpix_core::Frame;

use crate::{Error, Result};

/// Loads a per-pixel map and validates its length.
///
/// # Errors
/// Returns [`Error::Parse`] on the first unparseable line and
/// [`Error::LengthMismatch`] if the file does not hold exactly
/// `expected_len` values.
pub fn read_map(path: &Path, expected_len: usize) -> Result<Frame> {
    let reader = BufReader::new(File::open(path)?);
    let mut values = Vec::with_capacity(expected_len);
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value = trimmed.parse::<f64>().map_err(|_| Error::Parse {
            path: path.to_path_buf(),
            line: number + 1,
            text: trimmed.to_owned(),
        })?;
        values.push(value);
    }
    if values.len() != expected_len {
        return Err(Error::LengthMismatch {
            expected: expected_len,
            actual: values.len(),
        });
    }
    Ok(Frame::from_vec(values))
}

/// Writes a per-pixel map, one value per line in flat pixel order.
///
/// # Errors
/// Returns [`Error::Io`] on any filesystem failure.
pub fn write_map(path: &Path, map: &Frame) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for value in map.as_slice() {
        writeln!(writer, "{value}")?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gain.txt");
        let map = Frame::from_vec(vec![1.0, 0.5, 2.25]);
        write_map(&path, &map).unwrap();
        let loaded = read_map(&path, 3).unwrap();
        assert_eq!(loaded.as_slice(), map.as_slice());
    }

    #[test]
    fn test_length_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gain.txt");
        std::fs::write(&path, "1.0\n2.0\n").unwrap();
        assert!(matches!(
            read_map(&path, 3),
            Err(Error::LengthMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_parse_error_names_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gain.txt");
        std::fs::write(&path, "1.0\noops\n3.0\n").unwrap();
        match read_map(&path, 3) {
            Err(Error::Parse { line, text, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(text, "oops");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
