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

//! Kraken2 report, database report, and output validators.
//!
//! All three are header-less TSVs. Reports have 6 columns, or 8 when the
//! minimizer counts are present; database reports have leading `#` comment
//! lines and 6 columns; outputs have 5 columns with a `C`/`U` classification
//! flag in front. At `Min` only the first 100 lines are examined.

use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use crate::Error;
use crate::ValidationLevel;

const REPORT_FORMAT: &str = "Kraken2ReportFormat";
const DB_REPORT_FORMAT: &str = "Kraken2DBReportFormat";
const OUTPUT_FORMAT: &str = "Kraken2OutputFormat";

/// Lines examined at `Min` level.
const MIN_LINES: usize = 100;

fn bound(level: ValidationLevel) -> usize {
    match level {
        ValidationLevel::Min => MIN_LINES,
        ValidationLevel::Max => usize::MAX,
    }
}

fn check_f64(format: &str, cell: &str, column: &str) -> Result<(), Error> {
    cell.parse::<f64>().map(|_| ()).map_err(|_| {
        Error::validation(format, format!("Could not parse {} as {} (a number)", cell, column))
    })
}

fn check_u64(format: &str, cell: &str, column: &str) -> Result<(), Error> {
    cell.parse::<u64>().map(|_| ()).map_err(|_| {
        Error::validation(format, format!("Could not parse {} as {} (a count)", cell, column))
    })
}

/// The shared 6-column report row: percentage, two counts, rank, taxon id,
/// name. `columns` supplies the dtype-checked names per position.
fn check_report_row(
    format: &str,
    cells: &[&str],
    numeric_counts: &[usize],
    taxon_position: usize,
) -> Result<(), Error> {
    check_f64(format, cells[0], "the covered fraction")?;
    for &position in numeric_counts {
        check_u64(format, cells[position], "a fragment count")?;
    }
    check_u64(format, cells[taxon_position], "the taxon id")?;
    Ok(())
}

pub fn validate_report(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    log::debug!("validating {:?} as {}", path, REPORT_FORMAT);
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    for line in reader.lines().take(bound(level)) {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split('\t').collect();
        match cells.len() {
            6 => check_report_row(REPORT_FORMAT, &cells, &[1, 2], 4)?,
            8 => check_report_row(REPORT_FORMAT, &cells, &[1, 2, 3, 4], 6)?,
            n => {
                return Err(Error::validation(
                    REPORT_FORMAT,
                    format!("Length mismatch: expected 6 or 8 columns, found {}.", n),
                ))
            }
        }
    }
    Ok(())
}

pub fn validate_db_report(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    log::debug!("validating {:?} as {}", path, DB_REPORT_FORMAT);
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let mut in_body = false;
    for line in reader.lines().take(bound(level)) {
        let line = line?;
        if line.is_empty() || (!in_body && line.starts_with('#')) {
            continue;
        }
        in_body = true;
        let cells: Vec<&str> = line.split('\t').collect();
        if cells.len() != 6 {
            return Err(Error::validation(
                DB_REPORT_FORMAT,
                format!("Expected 6 columns, found {}.", cells.len()),
            ));
        }
        check_report_row(DB_REPORT_FORMAT, &cells, &[1, 2], 4)?;
    }
    Ok(())
}

pub fn validate_output(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    log::debug!("validating {:?} as {}", path, OUTPUT_FORMAT);
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    for line in reader.lines().take(bound(level)) {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split('\t').collect();
        if cells.len() != 5 {
            return Err(Error::validation(
                OUTPUT_FORMAT,
                format!("Expected 5 columns, found {}.", cells.len()),
            ));
        }
        if cells[0] != "C" && cells[0] != "U" {
            return Err(Error::validation(
                OUTPUT_FORMAT,
                format!("The classification flag must be C or U, found {}", cells[0]),
            ));
        }
    }
    Ok(())
}

// Tests
#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::ValidationLevel;

    fn write(name: &str, content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn six_and_eight_column_reports_validate() {
        let six = "99.5\t1995\t0\tU\t0\tunclassified\n0.5\t5\t5\tR\t1\troot\n";
        let (_dir, path) = write("report.txt", six);
        super::validate_report(&path, ValidationLevel::Max).unwrap();

        let eight = "99.5\t1995\t0\t120\t85\tU\t0\tunclassified\n";
        let (_dir, path) = write("report.txt", eight);
        super::validate_report(&path, ValidationLevel::Max).unwrap();
    }

    #[test]
    fn seven_column_report_is_a_length_mismatch() {
        let seven = "99.5\t1995\t0\t120\tU\t0\tunclassified\n";
        let (_dir, path) = write("report.txt", seven);
        let err = super::validate_report(&path, ValidationLevel::Max).unwrap_err();
        assert!(err
            .to_string()
            .contains("Length mismatch: expected 6 or 8 columns, found 7."));
    }

    #[test]
    fn db_report_comments_are_skipped() {
        let body = "# Database options: nucleotide db\n#\tk: 35\n\
                    100.0\t52\t52\tR\t1\troot\n";
        let (_dir, path) = write("report.txt", body);
        super::validate_db_report(&path, ValidationLevel::Max).unwrap();
    }

    #[test]
    fn output_flag_must_be_c_or_u() {
        let good = "C\tread-1\t562\t150\t562:120\nU\tread-2\t0\t151\t0:121\n";
        let (_dir, path) = write("output.txt", good);
        super::validate_output(&path, ValidationLevel::Max).unwrap();

        let bad = "X\tread-1\t562\t150\t562:120\n";
        let (_dir, path) = write("output.txt", bad);
        assert!(super::validate_output(&path, ValidationLevel::Max).is_err());
    }
}
