//! Reading and writing hit lists.
//!
//! A hit list is a plain text file, one accepted event index per line.
//! Lines that do not parse are skipped with a warning so a hand-edited
//! list with stray comments still loads; a list with no usable index at
//! all is rejected.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use shotpix_engine::HitRecord;

use crate::{Error, Result};

/// Loads a hit list for replay.
///
/// # Errors
/// Returns [`Error::Io`] if the file cannot be read and
/// [`Error::EmptyHitList`] if no line parses as an index.
pub fn read_hit_list(path: &Path) -> Result<HitRecord> {
    let reader = BufReader::new(File::open(path)?);
    let mut record = HitRecord::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.parse::<u64>() {
            Ok(index) => record.insert(index),
            Err(_) => log::warn!(
                "{}:{}: skipping unparseable hit index {trimmed:?}",
                path.display(),
                number + 1
            ),
        }
    }
    if record.is_empty() {
        return Err(Error::EmptyHitList(path.to_path_buf()));
    }
    Ok(record)
}

/// Writes a hit list, one index per line in ascending order.
///
/// # Errors
/// Returns [`Error::Io`] on any filesystem failure.
pub fn write_hit_list(path: &Path, record: &HitRecord) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for index in record.iter() {
        writeln!(writer, "{index}")?;
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
        let path = dir.path().join("hits.txt");
        let record: HitRecord = [7, 3, 42].into_iter().collect();
        write_hit_list(&path, &record).unwrap();
        let loaded = read_hit_list(&path).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hits.txt");
        std::fs::write(&path, "3\nnot-a-number\n\n  9 \n").unwrap();
        let record = read_hit_list(&path).unwrap();
        assert_eq!(record.iter().collect::<Vec<_>>(), vec![3, 9]);
    }

    #[test]
    fn test_empty_list_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hits.txt");
        std::fs::write(&path, "garbage\n").unwrap();
        assert!(matches!(
            read_hit_list(&path),
            Err(Error::EmptyHitList(_))
        ));
    }
}
