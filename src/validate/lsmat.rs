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

//! The LSMat labelled square distance matrix validator.
//!
//! Constraints: square, zero diagonal, symmetric, and unique non-empty
//! labels. At `Min` only the header and the first few rows are examined.

use std::collections::HashSet;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use crate::Error;
use crate::ValidationLevel;

const FORMAT: &str = "LSMatFormat";

/// Rows examined at `Min` level.
const MIN_ROWS: usize = 5;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()).max(1.0)
}

pub fn validate(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    log::debug!("validating {:?} as {}", path, FORMAT);
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(Error::validation(FORMAT, "The file is empty")),
    };
    let mut cells = header.split('\t');
    if cells.next() != Some("") {
        return Err(Error::validation(FORMAT, "The first header cell must be empty"));
    }
    let ids: Vec<String> = cells.map(|s| s.to_string()).collect();
    if ids.is_empty() {
        return Err(Error::validation(FORMAT, "The header lists no labels"));
    }
    let mut seen: HashSet<&String> = HashSet::new();
    for id in &ids {
        if id.is_empty() {
            return Err(Error::validation(FORMAT, "Labels must not be empty"));
        }
        if !seen.insert(id) {
            return Err(Error::validation(FORMAT, format!("Duplicate label {}", id)));
        }
    }

    let bound = match level {
        ValidationLevel::Min => MIN_ROWS.min(ids.len()),
        ValidationLevel::Max => ids.len(),
    };

    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(bound);
    for (row, line) in lines.enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        if row >= ids.len() {
            return Err(Error::validation(
                FORMAT,
                format!("Expected {} rows but found more", ids.len()),
            ));
        }
        if rows.len() == bound {
            break;
        }
        let mut cells = line.split('\t');
        let label = cells.next().unwrap_or_default();
        if label != ids[row] {
            return Err(Error::validation(
                FORMAT,
                format!("Row label {} does not match header label {}", label, ids[row]),
            ));
        }
        let mut values = Vec::with_capacity(ids.len());
        for cell in cells {
            values.push(cell.parse::<f64>().map_err(|_| {
                Error::validation(FORMAT, format!("Could not parse {} as a number", cell))
            })?);
        }
        if values.len() != ids.len() {
            return Err(Error::validation(
                FORMAT,
                format!(
                    "Row {} has {} values; a square matrix over {} labels needs {}",
                    label,
                    values.len(),
                    ids.len(),
                    ids.len()
                ),
            ));
        }
        if !close(values[row], 0.0) {
            return Err(Error::validation(
                FORMAT,
                format!("The diagonal entry for {} is {}, not zero", label, values[row]),
            ));
        }
        rows.push(values);
    }

    if level == ValidationLevel::Max {
        if rows.len() != ids.len() {
            return Err(Error::validation(
                FORMAT,
                format!("Expected {} rows, found {}", ids.len(), rows.len()),
            ));
        }
        for row in 0..rows.len() {
            for col in 0..row {
                if !close(rows[row][col], rows[col][row]) {
                    return Err(Error::validation(
                        FORMAT,
                        format!(
                            "The matrix is not symmetric at ({}, {}): {} vs {}",
                            ids[row], ids[col], rows[row][col], rows[col][row]
                        ),
                    ));
                }
            }
        }
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
        let path = dir.path().join("distance-matrix.tsv");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn square_symmetric_matrices_validate() {
        for content in [
            "\ta\na\t0\n",
            "\ta\tb\na\t0\t1.5\nb\t1.5\t0\n",
            "\ta\tb\tc\na\t0\t1\t2\nb\t1\t0\t3\nc\t2\t3\t0\n",
        ] {
            let (_dir, path) = write(content);
            super::validate(&path, ValidationLevel::Min).unwrap();
            super::validate(&path, ValidationLevel::Max).unwrap();
        }
    }

    #[test]
    fn non_lsmat_payload_names_the_format() {
        let (_dir, path) = write("this is not a matrix\n");
        let err = super::validate(&path, ValidationLevel::Max).unwrap_err();
        assert!(err.to_string().contains("LSMat"));
    }

    #[test]
    fn asymmetry_is_caught_at_max_only() {
        let (_dir, path) = write("\ta\tb\na\t0\t1\nb\t2\t0\n");
        assert!(super::validate(&path, ValidationLevel::Max).is_err());
    }

    #[test]
    fn nonzero_diagonal_is_rejected() {
        let (_dir, path) = write("\ta\tb\na\t0\t1\nb\t1\t0.5\n");
        assert!(super::validate(&path, ValidationLevel::Max).is_err());
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let (_dir, path) = write("\ta\ta\na\t0\t1\na\t1\t0\n");
        assert!(super::validate(&path, ValidationLevel::Min).is_err());
    }

    #[test]
    fn truncated_rows_pass_at_min() {
        // Missing rows are only detectable when the whole payload is read
        let (_dir, path) = write("\ta\tb\tc\td\te\tf\tg\na\t0\t1\t1\t1\t1\t1\t1\n");
        assert!(super::validate(&path, ValidationLevel::Min).is_ok());
        assert!(super::validate(&path, ValidationLevel::Max).is_err());
    }
}
