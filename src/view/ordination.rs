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

//! Ordination results, Procrustes statistics, and their text representations.
//!
//! The ordination format is five labelled blocks in fixed order, each
//! preceded by a `name\tR\tC` shape line and holding `R` rows of `C`
//! tab-separated numbers. An absent block has shape `0 0` and no rows.

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use crate::Error;

const FORMAT: &str = "OrdinationFormat";
const PROCRUSTES_FORMAT: &str = "ProcrustesStatisticsFormat";

pub const BLOCK_NAMES: [&str; 5] =
    ["Eigvals", "Proportion explained", "Species", "Site", "Biplot"];

const PROCRUSTES_HEADER: &str =
    "true M^2 value\tp-value for true M^2 value\tnumber of Monte Carlo permutations";

/// One labelled matrix block of an ordination file, row-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<f64>,
}

impl Block {
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self, Error> {
        if values.len() != rows * cols {
            return Err(Error::validation(
                FORMAT,
                format!("Expected {} values in a {}x{} block, got {}", rows * cols, rows, cols, values.len()),
            ));
        }
        Ok(Block { rows, cols, values })
    }

    pub fn empty() -> Self {
        Block::default()
    }
}

/// The result of an ordination method.
#[derive(Debug, Clone, PartialEq)]
pub struct OrdinationResults {
    pub eigvals: Block,
    pub proportion_explained: Block,
    pub species: Block,
    pub site: Block,
    pub biplot: Block,
}

impl OrdinationResults {
    fn blocks(&self) -> [&Block; 5] {
        [&self.eigvals, &self.proportion_explained, &self.species, &self.site, &self.biplot]
    }

    /// Reads the five ordination blocks in order.
    pub fn from_text<R: Read>(conn: &mut R) -> Result<Self, Error> {
        let reader = BufReader::new(conn);
        let mut lines = reader.lines().filter(|line| {
            line.as_ref().map(|l| !l.trim().is_empty()).unwrap_or(true)
        });

        let mut parsed: Vec<Block> = Vec::with_capacity(BLOCK_NAMES.len());
        for name in BLOCK_NAMES {
            let shape = match lines.next() {
                Some(line) => line?,
                None => {
                    return Err(Error::validation(
                        FORMAT,
                        format!("Missing the {} block", name),
                    ))
                }
            };
            let cells: Vec<&str> = shape.split('\t').collect();
            if cells.len() != 3 || cells[0] != name {
                return Err(Error::validation(
                    FORMAT,
                    format!("Expected a '{}\\tR\\tC' shape line, found '{}'", name, shape),
                ));
            }
            let rows = cells[1].parse::<usize>().map_err(|_| {
                Error::validation(FORMAT, format!("Could not parse row count {}", cells[1]))
            })?;
            let cols = cells[2].parse::<usize>().map_err(|_| {
                Error::validation(FORMAT, format!("Could not parse column count {}", cells[2]))
            })?;

            let mut values = Vec::with_capacity(rows * cols);
            for _ in 0..rows {
                let line = match lines.next() {
                    Some(line) => line?,
                    None => {
                        return Err(Error::validation(
                            FORMAT,
                            format!("The {} block ended early", name),
                        ))
                    }
                };
                let row: Vec<&str> = line.split('\t').collect();
                if row.len() != cols {
                    return Err(Error::validation(
                        FORMAT,
                        format!("Expected {} columns in the {} block, found {}", cols, name, row.len()),
                    ));
                }
                for cell in row {
                    values.push(cell.parse::<f64>().map_err(|_| {
                        Error::validation(
                            FORMAT,
                            format!("Could not parse {} as a number", cell),
                        )
                    })?);
                }
            }
            parsed.push(Block { rows, cols, values });
        }

        let mut blocks = parsed.into_iter();
        Ok(OrdinationResults {
            eigvals: blocks.next().unwrap(),
            proportion_explained: blocks.next().unwrap(),
            species: blocks.next().unwrap(),
            site: blocks.next().unwrap(),
            biplot: blocks.next().unwrap(),
        })
    }

    pub fn read_text(path: &Path) -> Result<Self, Error> {
        let mut file = std::fs::File::open(path)?;
        Self::from_text(&mut file)
    }

    pub fn to_text<W: Write>(&self, conn: &mut W) -> Result<(), Error> {
        for (name, block) in BLOCK_NAMES.iter().zip(self.blocks()) {
            writeln!(conn, "{}\t{}\t{}", name, block.rows, block.cols)?;
            for row in 0..block.rows {
                let cells: Vec<String> = (0..block.cols)
                    .map(|col| block.values[row * block.cols + col].to_string())
                    .collect();
                writeln!(conn, "{}", cells.join("\t"))?;
            }
            writeln!(conn)?;
        }
        Ok(())
    }

    pub fn write_text(&self, path: &Path) -> Result<(), Error> {
        let mut file = std::fs::File::create(path)?;
        self.to_text(&mut file)
    }
}

/// Summary statistics of a Procrustes analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcrustesStatistics {
    pub true_m2: f64,
    pub p_value: f64,
    pub permutations: u64,
}

impl ProcrustesStatistics {
    /// Reads the fixed-header, single-row Procrustes TSV.
    pub fn from_tsv<R: Read>(conn: &mut R) -> Result<Self, Error> {
        let reader = BufReader::new(conn);
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(Error::validation(PROCRUSTES_FORMAT, "The file is empty")),
        };
        if header != PROCRUSTES_HEADER {
            return Err(Error::validation(
                PROCRUSTES_FORMAT,
                format!("Unexpected header '{}'", header),
            ));
        }
        let row = match lines.next() {
            Some(line) => line?,
            None => return Err(Error::validation(PROCRUSTES_FORMAT, "Missing the data row")),
        };
        let cells: Vec<&str> = row.split('\t').collect();
        if cells.len() != 3 {
            return Err(Error::validation(
                PROCRUSTES_FORMAT,
                format!("Expected 3 columns, found {}", cells.len()),
            ));
        }
        let parse_err = |cell: &str| {
            Error::validation(PROCRUSTES_FORMAT, format!("Could not parse {}", cell))
        };
        Ok(ProcrustesStatistics {
            true_m2: cells[0].parse().map_err(|_| parse_err(cells[0]))?,
            p_value: cells[1].parse().map_err(|_| parse_err(cells[1]))?,
            permutations: cells[2].parse().map_err(|_| parse_err(cells[2]))?,
        })
    }

    pub fn read_tsv(path: &Path) -> Result<Self, Error> {
        let mut file = std::fs::File::open(path)?;
        Self::from_tsv(&mut file)
    }

    pub fn to_tsv<W: Write>(&self, conn: &mut W) -> Result<(), Error> {
        writeln!(conn, "{}", PROCRUSTES_HEADER)?;
        writeln!(conn, "{}\t{}\t{}", self.true_m2, self.p_value, self.permutations)?;
        Ok(())
    }

    pub fn write_tsv(&self, path: &Path) -> Result<(), Error> {
        let mut file = std::fs::File::create(path)?;
        self.to_tsv(&mut file)
    }
}
