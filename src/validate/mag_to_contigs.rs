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

//! The MAG-to-contigs mapping validator: a JSON object keyed by UUIDv4 MAG
//! identifiers with non-empty lists of contig id strings as values. At `Min`
//! only the first 100 pairs are examined.

use std::path::Path;

use crate::view::mag_map::contigs_list;
use crate::view::mag_map::parse_mag_id;
use crate::Error;
use crate::ValidationLevel;

const FORMAT: &str = "MAGtoContigsFormat";

/// Pairs examined at `Min` level.
const MIN_ENTRIES: usize = 100;

pub fn validate(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    log::debug!("validating {:?} as {}", path, FORMAT);
    let file = std::fs::File::open(path)?;
    let value: serde_json::Value = serde_json::from_reader(file)?;
    let object = value.as_object().ok_or_else(|| {
        Error::validation(FORMAT, "The top-level JSON value must be an object")
    })?;

    let bound = match level {
        ValidationLevel::Min => MIN_ENTRIES,
        ValidationLevel::Max => usize::MAX,
    };
    // serde_json's preserve_order feature keeps the document's pair order,
    // so the bound covers the first pairs as written in the file
    for (key, contigs) in object.iter().take(bound) {
        parse_mag_id(FORMAT, key)?;
        contigs_list(FORMAT, key, contigs)?;
    }
    Ok(())
}

// Tests
#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::ValidationLevel;

    fn write(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mag-to-contigs.json");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn well_formed_map_validates() {
        let (_dir, path) = write(
            r#"{ "6232c7e1-8ed7-47c8-9bdb-b94706a26931": ["contig-1", "contig-2"] }"#,
        );
        super::validate(&path, ValidationLevel::Min).unwrap();
        super::validate(&path, ValidationLevel::Max).unwrap();
    }

    #[test]
    fn min_level_examines_the_first_pairs_in_file_order() {
        use uuid::Uuid;

        // An invalid key past the first 100 pairs, placed so it would sort
        // ahead of every UUID key
        let mut doc = String::from("{\n");
        for _ in 0..100 {
            doc.push_str(&format!("\"{}\": [\"contig-1\"],\n", Uuid::new_v4()));
        }
        doc.push_str("\"0\": [\"contig-1\"]\n}\n");

        let (_dir, path) = write(&doc);
        super::validate(&path, ValidationLevel::Min).unwrap();
        let err = super::validate(&path, ValidationLevel::Max).unwrap_err();
        assert!(err.to_string().contains("Found \"0\", which is invalid."));
    }

    #[test]
    fn empty_contig_list_fails_at_max() {
        let (_dir, path) = write(r#"{ "6232c7e1-8ed7-47c8-9bdb-b94706a26931": [] }"#);
        let err = super::validate(&path, ValidationLevel::Max).unwrap_err();
        assert!(err
            .to_string()
            .contains(r#"MAG "6232c7e1-8ed7-47c8-9bdb-b94706a26931" is empty."#));
    }

    #[test]
    fn bad_uuid_key_is_reported() {
        let (_dir, path) = write(r#"{ "6232c7e1": ["contig-1"] }"#);
        let err = super::validate(&path, ValidationLevel::Max).unwrap_err();
        assert!(err.to_string().contains(r#"Found "6232c7e1", which is invalid."#));
    }
}
