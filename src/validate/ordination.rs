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

//! Ordination and Procrustes statistics validators, thin wrappers over the
//! view parsers.

use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use crate::view::ordination::OrdinationResults;
use crate::view::ordination::ProcrustesStatistics;
use crate::Error;
use crate::ValidationLevel;

const FORMAT: &str = "OrdinationFormat";

pub fn validate(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    log::debug!("validating {:?} as {}", path, FORMAT);
    match level {
        ValidationLevel::Min => {
            // The first shape line is enough to recognise the format
            let file = std::fs::File::open(path)?;
            let first = BufReader::new(file).lines().next().transpose()?.unwrap_or_default();
            if !first.starts_with("Eigvals\t") {
                return Err(Error::validation(
                    FORMAT,
                    format!("Expected an 'Eigvals\\tR\\tC' shape line, found '{}'", first),
                ));
            }
            Ok(())
        }
        ValidationLevel::Max => OrdinationResults::read_text(path).map(|_| ()),
    }
}

/// The Procrustes file is two lines, so both levels read it whole.
pub fn validate_procrustes(path: &Path, _level: ValidationLevel) -> Result<(), Error> {
    ProcrustesStatistics::read_tsv(path).map(|_| ())
}

// Tests
#[cfg(test)]
mod tests {

    use crate::ValidationLevel;

    #[test]
    fn empty_blocks_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ordination.txt");
        let body = "Eigvals\t1\t2\n0.7\t0.3\n\nProportion explained\t0\t0\n\n\
                    Species\t0\t0\n\nSite\t0\t0\n\nBiplot\t0\t0\n";
        std::fs::write(&path, body).unwrap();

        super::validate(&path, ValidationLevel::Min).unwrap();
        super::validate(&path, ValidationLevel::Max).unwrap();
    }

    #[test]
    fn missing_leading_block_fails_at_min() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ordination.txt");
        std::fs::write(&path, "Site\t0\t0\n").unwrap();

        assert!(super::validate(&path, ValidationLevel::Min).is_err());
    }

    #[test]
    fn procrustes_single_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ProcrustesStatistics.tsv");
        std::fs::write(
            &path,
            "true M^2 value\tp-value for true M^2 value\tnumber of Monte Carlo permutations\n\
             0.125\t0.001\t999\n",
        )
        .unwrap();

        super::validate_procrustes(&path, ValidationLevel::Max).unwrap();
    }
}
