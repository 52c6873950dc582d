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

//! The distance matrix view and its LSMat text representation.
//!
//! LSMat is a tab-separated square matrix: the first cell of the header row
//! is empty, the rest are labels; each body row repeats its label in the
//! first cell followed by one value per label.

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use crate::Error;

const FORMAT: &str = "LSMatFormat";

/// A labelled square matrix of pairwise distances, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    ids: Vec<String>,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Builds a distance matrix from labels and a row-major value buffer.
    ///
    /// ## Errors
    ///
    /// `data` must hold exactly `ids.len()^2` values.
    pub fn new(ids: Vec<String>, data: Vec<f64>) -> Result<Self, Error> {
        if data.len() != ids.len() * ids.len() {
            return Err(Error::validation(
                FORMAT,
                format!(
                    "Expected {} values for {} labels, got {}",
                    ids.len() * ids.len(),
                    ids.len(),
                    data.len()
                ),
            ));
        }
        Ok(DistanceMatrix { ids, data })
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.ids.len() + col]
    }

    /// Reads an LSMat matrix from `conn`.
    pub fn from_lsmat<R: Read>(conn: &mut R) -> Result<Self, Error> {
        let reader = BufReader::new(conn);
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

        let mut data: Vec<f64> = Vec::with_capacity(ids.len() * ids.len());
        for (row, line) in lines.enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let mut cells = line.split('\t');
            let label = cells.next().unwrap_or_default();
            if row >= ids.len() || label != ids[row] {
                return Err(Error::validation(
                    FORMAT,
                    format!("Row label {} does not match the header", label),
                ));
            }
            for cell in cells {
                let value = cell.parse::<f64>().map_err(|_| {
                    Error::validation(FORMAT, format!("Could not parse {} as a number", cell))
                })?;
                data.push(value);
            }
        }
        DistanceMatrix::new(ids, data)
    }

    pub fn read_lsmat(path: &Path) -> Result<Self, Error> {
        let mut file = std::fs::File::open(path)?;
        Self::from_lsmat(&mut file)
    }

    /// Writes the matrix in LSMat form.
    pub fn to_lsmat<W: Write>(&self, conn: &mut W) -> Result<(), Error> {
        let mut header = String::new();
        for id in &self.ids {
            header.push('\t');
            header.push_str(id);
        }
        header.push('\n');
        conn.write_all(header.as_bytes())?;

        for (row, id) in self.ids.iter().enumerate() {
            let mut line = id.clone();
            for col in 0..self.ids.len() {
                line.push('\t');
                line.push_str(&self.get(row, col).to_string());
            }
            line.push('\n');
            conn.write_all(line.as_bytes())?;
        }
        Ok(())
    }

    pub fn write_lsmat(&self, path: &Path) -> Result<(), Error> {
        let mut file = std::fs::File::create(path)?;
        self.to_lsmat(&mut file)
    }
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn lsmat_round_trip() {
        use super::DistanceMatrix;
        use std::io::Cursor;

        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let data = vec![
            0.0, 0.5, 0.25,
            0.5, 0.0, 0.75,
            0.25, 0.75, 0.0,
        ];
        let dm = DistanceMatrix::new(ids, data).unwrap();

        let mut bytes: Cursor<Vec<u8>> = Cursor::new(Vec::new());
        dm.to_lsmat(&mut bytes).unwrap();

        let mut input = Cursor::new(bytes.into_inner());
        let got = DistanceMatrix::from_lsmat(&mut input).unwrap();
        assert_eq!(got, dm);
    }

    #[test]
    fn one_by_one_matrix_parses() {
        use super::DistanceMatrix;
        use std::io::Cursor;

        let data: Vec<u8> = b"\tsample-1\nsample-1\t0\n".to_vec();
        let got = DistanceMatrix::from_lsmat(&mut Cursor::new(data)).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got.get(0, 0), 0.0);
    }

    #[test]
    fn nonempty_first_header_cell_is_rejected() {
        use super::DistanceMatrix;
        use std::io::Cursor;

        let data: Vec<u8> = b"id\ta\na\t0\n".to_vec();
        let err = DistanceMatrix::from_lsmat(&mut Cursor::new(data)).unwrap_err();
        assert!(err.to_string().contains("LSMat"));
    }

    #[test]
    fn mismatched_row_label_is_rejected() {
        use super::DistanceMatrix;
        use std::io::Cursor;

        let data: Vec<u8> = b"\ta\tb\na\t0\t1\nc\t1\t0\n".to_vec();
        assert!(DistanceMatrix::from_lsmat(&mut Cursor::new(data)).is_err());
    }
}
