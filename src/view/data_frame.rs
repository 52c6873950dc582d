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

//! A minimal numeric data frame view.
//!
//! Rows are samples and columns are features when a frame stands in for a
//! feature table. The index is either positional or label-based; conversions
//! that need to name rows require a label index.

use crate::Error;

/// The row index of a [DataFrame].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Index {
    /// Positional `0..n` index.
    Range(usize),
    /// String labels, one per row.
    Labels(Vec<String>),
}

impl Index {
    pub fn len(&self) -> usize {
        match self {
            Index::Range(n) => *n,
            Index::Labels(labels) => labels.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A dense numeric table with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    pub index: Index,
    pub columns: Vec<String>,
    /// Row-major cells, `index.len()` rows by `columns.len()` columns.
    pub cells: Vec<f64>,
}

impl DataFrame {
    pub fn new(index: Index, columns: Vec<String>, cells: Vec<f64>) -> Result<Self, Error> {
        if cells.len() != index.len() * columns.len() {
            return Err(Error::validation(
                "DataFrame",
                format!(
                    "Expected {} cells for {} rows and {} columns, got {}",
                    index.len() * columns.len(),
                    index.len(),
                    columns.len(),
                    cells.len()
                ),
            ));
        }
        Ok(DataFrame { index, columns, cells })
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.columns.len() + col]
    }

    /// The row labels, failing when the index is positional.
    ///
    /// Conversions into BIOM formats call this; the error message names the
    /// string-based requirement.
    pub fn labels(&self) -> Result<&[String], Error> {
        match &self.index {
            Index::Labels(labels) => Ok(labels),
            Index::Range(_) => Err(Error::validation(
                "DataFrame",
                "The DataFrame index must be string-based, but a positional index was found",
            )),
        }
    }
}
