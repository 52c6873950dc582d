// leima: Semantic typing and format validation for bioinformatics artifacts.
//
// Copyright 2025 Tommi Mäklin [tommi@maklin.fi].
//
// Copyrights in this project are retained by contributors. No copyright assignment
// is required to contribute to this project.
//
// Except as otherwise noted (below and/or in individual files), this
// project is licensed under the Apache License, Version 2.0
// <LICENSE-APACHE> or <http://www.apache.org/licenses/LICENSE-2.0> or
// the MIT license, <LICENSE-MIT> or <http://opensource.org/licenses/MIT>,
// at your option.
//

//! The immutable metadata TSV validator, a thin wrapper over the view
//! parser. At `Min` only the first 100 data rows are examined.

use std::path::Path;

use crate::view::metadata::Metadata;
use crate::Error;
use crate::ValidationLevel;

const FORMAT: &str = "ImmutableMetadataFormat";

/// Data rows examined at `Min` level.
const MIN_ROWS: usize = 100;

pub fn validate(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    log::debug!("validating {:?} as {}", path, FORMAT);
    let mut file = std::fs::File::open(path)?;
    let limit = match level {
        ValidationLevel::Min => Some(MIN_ROWS),
        ValidationLevel::Max => None,
    };
    Metadata::from_tsv(&mut file, limit).map(|_| ())
}

// Tests
#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::ValidationLevel;

    fn write(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.tsv");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn sample_metadata_validates() {
        let (_dir, path) = write("sample-id\tdepth\tsite\ns1\t3.5\tA\ns2\t4\tB\n");
        super::validate(&path, ValidationLevel::Min).unwrap();
        super::validate(&path, ValidationLevel::Max).unwrap();
    }

    #[test]
    fn unrecognised_id_header_names_the_column() {
        let (_dir, path) = write("specimen\tdepth\ns1\t3.5\n");
        let err = super::validate(&path, ValidationLevel::Max).unwrap_err();
        assert!(err.to_string().contains("column name 'specimen'"));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let (_dir, path) = write("id\tdepth\tsite\ns1\t3.5\n");
        assert!(super::validate(&path, ValidationLevel::Max).is_err());
    }
}
