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

//! BIOM feature-table validators.
//!
//! The two on-disk versions are told apart by sniffing the leading bytes:
//! `{` starts a v1.0 JSON document, `\x89HDF\r\n\x1a\n` a v2.1 HDF5 file.
//! Loading a file under the wrong version's format is fatal. At `Min` only
//! the magic is examined; at `Max` the whole table is materialised.

use std::path::Path;

use crate::hdf5;
use crate::view::table::BiomTable;
use crate::Error;
use crate::ValidationLevel;

const FORMAT_V1: &str = "BIOMV100Format";
const FORMAT_V21: &str = "BIOMV210Format";

fn first_meaningful_byte(bytes: &[u8]) -> Option<u8> {
    bytes.iter().copied().find(|b| !b.is_ascii_whitespace())
}

pub fn validate_v100(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    log::debug!("validating {:?} as {}", path, FORMAT_V1);
    let magic = super::magic(path, hdf5::SIGNATURE.len())?;
    if magic.starts_with(&hdf5::SIGNATURE) {
        return Err(Error::validation(
            FORMAT_V1,
            "The file is a BIOM v2.1.0 (HDF5) file, not a v1.0.0 JSON file",
        ));
    }
    if first_meaningful_byte(&magic) != Some(b'{') {
        return Err(Error::validation(
            FORMAT_V1,
            "The file does not start a JSON object",
        ));
    }
    match level {
        ValidationLevel::Min => Ok(()),
        ValidationLevel::Max => BiomTable::read_json_v1(path).map(|_| ()),
    }
}

pub fn validate_v210(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    log::debug!("validating {:?} as {}", path, FORMAT_V21);
    let magic = super::magic(path, hdf5::SIGNATURE.len())?;
    if !magic.starts_with(&hdf5::SIGNATURE) {
        return Err(Error::validation(
            FORMAT_V21,
            "Missing the HDF5 signature",
        ));
    }
    match level {
        ValidationLevel::Min => Ok(()),
        ValidationLevel::Max => BiomTable::read_hdf5(path).map(|_| ()),
    }
}

// Tests
#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::view::table::BiomTable;
    use crate::ValidationLevel;

    fn both_versions() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let table = BiomTable::new(
            vec!["o1".to_string()],
            vec!["s1".to_string(), "s2".to_string()],
            vec![(0, 0, 2.0), (0, 1, 4.0)],
        )
        .unwrap();

        let v1 = dir.path().join("feature-table_v100.biom");
        table.write_json_v1(&v1).unwrap();
        let v2 = dir.path().join("feature-table_v210.biom");
        table.write_hdf5(&v2).unwrap();
        (dir, v1, v2)
    }

    #[test]
    fn each_version_validates_under_its_own_format() {
        let (_dir, v1, v2) = both_versions();
        for level in [ValidationLevel::Min, ValidationLevel::Max] {
            super::validate_v100(&v1, level).unwrap();
            super::validate_v210(&v2, level).unwrap();
        }
    }

    #[test]
    fn version_mismatch_names_the_expected_format() {
        let (_dir, v1, v2) = both_versions();

        let err = super::validate_v210(&v1, ValidationLevel::Min).unwrap_err();
        assert!(err.to_string().contains("BIOMV210Format"));

        let err = super::validate_v100(&v2, ValidationLevel::Min).unwrap_err();
        assert!(err.to_string().contains("BIOMV100Format"));
    }

    #[test]
    fn truncated_json_fails_at_max_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.biom");
        std::fs::write(&path, b"{ \"format\": ").unwrap();

        assert!(super::validate_v100(&path, ValidationLevel::Min).is_ok());
        assert!(super::validate_v100(&path, ValidationLevel::Max).is_err());
    }
}
