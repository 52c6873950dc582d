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

//! The Newick tree validator. At `Min` only the first tree is parsed.

use std::path::Path;

use crate::view::tree::parse_newick_all;
use crate::Error;
use crate::ValidationLevel;

const FORMAT: &str = "NewickFormat";

pub fn validate(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    log::debug!("validating {:?} as {}", path, FORMAT);
    let text = std::fs::read_to_string(path)?;
    let limit = match level {
        ValidationLevel::Min => Some(1),
        ValidationLevel::Max => None,
    };
    parse_newick_all(&text, limit).map(|_| ())
}

// Tests
#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::ValidationLevel;

    fn write(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.nwk");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn rooted_tree_validates() {
        let (_dir, path) = write("((a:0.1,b:0.2):0.3,c:0.4)root;\n");
        super::validate(&path, ValidationLevel::Min).unwrap();
        super::validate(&path, ValidationLevel::Max).unwrap();
    }

    #[test]
    fn non_newick_payload_names_the_format() {
        let (_dir, path) = write("not a tree at all");
        let err = super::validate(&path, ValidationLevel::Max).unwrap_err();
        assert!(err.to_string().contains("NewickFormat"));
    }

    #[test]
    fn later_trees_are_skipped_at_min() {
        let (_dir, path) = write("(a,b);\n(c,d;\n");
        assert!(super::validate(&path, ValidationLevel::Min).is_ok());
        assert!(super::validate(&path, ValidationLevel::Max).is_err());
    }
}
