//! CSV dataset readers for the occupation catalog and hierarchy tables.

use crate::error::{EngineError, EngineResult};
use crate::types::OccupationRecord;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// Load the authoritative occupation catalog.
///
/// Rows missing a code or title are skipped with a warning rather than
/// aborting the load. Returns the accepted records along with the number
/// of rows that were skipped.
pub fn load_occupations(path: &Path) -> EngineResult<(Vec<OccupationRecord>, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| EngineError::DatasetRead {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (row, result) in reader.deserialize::<OccupationRecord>().enumerate() {
        // Row numbering is 1-based and excludes the header line
        let row = row + 1;
        match result {
            Ok(record) if record.is_indexable() => records.push(record),
            Ok(record) => {
                warn!(
                    row,
                    code = %record.code2015,
                    "skipping occupation row with empty code or title"
                );
                skipped += 1;
            }
            Err(e) => {
                warn!(row, error = %e, "skipping malformed occupation row");
                skipped += 1;
            }
        }
    }

    Ok((records, skipped))
}

/// Load a two-column (code, name) hierarchy lookup table.
///
/// The first line is treated as a header. Rows with fewer than two
/// fields or an empty code are skipped with a warning.
pub fn load_code_table(path: &Path) -> EngineResult<HashMap<String, String>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| EngineError::DatasetRead {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

    let mut table = HashMap::new();

    for (row, result) in reader.records().enumerate() {
        let row = row + 1;
        let record = result.map_err(|e| EngineError::DatasetRead {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

        let code = record.get(0).unwrap_or("").trim();
        let name = record.get(1).unwrap_or("").trim();

        if code.is_empty() || name.is_empty() {
            warn!(row, path = %path.display(), "skipping incomplete hierarchy row");
            continue;
        }

        table.insert(code.to_string(), name.to_string());
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_occupations_skips_bad_rows() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("occupations.csv");
        fs::write(
            &path,
            "NCO2015_Code,Title,NCO2004_Code\n\
             8524.10,Tailor,743.20\n\
             ,Missing Code,111.10\n\
             7543.05,No Legacy Code,\n",
        )
        .unwrap();

        let (records, skipped) = load_occupations(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(skipped, 1);
        assert_eq!(records[0].code2015, "8524.10");
        assert_eq!(records[0].title, "Tailor");
        assert_eq!(records[1].code2004, "");
    }

    #[test]
    fn test_load_code_table() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("division.csv");
        fs::write(
            &path,
            "Code,Name\n\
             8,Plant and Machine Operators\n\
             7,Craft Workers\n\
             ,Orphan Name\n",
        )
        .unwrap();

        let table = load_code_table(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get("8").map(String::as_str),
            Some("Plant and Machine Operators")
        );
        assert!(!table.contains_key(""));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = load_occupations(&temp.path().join("nope.csv"));
        assert!(result.is_err());
    }
}
