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

//! The metadata view and its immutable TSV representation.
//!
//! The first column is the id column and its header must be one of the
//! recognised id labels. Column types are inferred: a column is numeric when
//! every non-empty cell parses as a float, categorical otherwise.

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use crate::Error;

const FORMAT: &str = "ImmutableMetadataFormat";

/// Header labels accepted for the identifier column. The first group is
/// matched case-insensitively, the second verbatim.
const ID_HEADERS_CASE_INSENSITIVE: [&str; 7] =
    ["id", "sampleid", "sample id", "sample-id", "featureid", "feature id", "feature-id"];
const ID_HEADERS_EXACT: [&str; 5] =
    ["#SampleID", "#Sample ID", "#OTUID", "#OTU ID", "sample_name"];

pub fn is_recognized_id_header(header: &str) -> bool {
    let lowered = header.to_lowercase();
    ID_HEADERS_CASE_INSENSITIVE.contains(&lowered.as_str())
        || ID_HEADERS_EXACT.contains(&header)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataColumn {
    pub name: String,
    pub kind: ColumnType,
    /// Raw cell values, one per id, in id order.
    pub values: Vec<String>,
}

/// Immutable sample or feature metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub id_header: String,
    pub ids: Vec<String>,
    pub columns: Vec<MetadataColumn>,
}

fn infer_kind(values: &[String]) -> ColumnType {
    let numeric = values
        .iter()
        .filter(|v| !v.is_empty())
        .all(|v| v.parse::<f64>().is_ok());
    if numeric {
        ColumnType::Numeric
    } else {
        ColumnType::Categorical
    }
}

impl Metadata {
    /// Reads a metadata TSV, examining at most `limit` data rows when given.
    ///
    /// ## Errors
    ///
    /// Fails when the id column header is not recognised, when a row's
    /// column count differs from the header, or on duplicate or empty ids.
    pub fn from_tsv<R: Read>(conn: &mut R, limit: Option<usize>) -> Result<Self, Error> {
        let reader = BufReader::new(conn);
        let mut lines = reader.lines();

        let header = loop {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    // Leading comment lines are not part of the table
                    if line.starts_with('#') && !line.starts_with("#Sample") && !line.starts_with("#OTU") {
                        continue;
                    }
                    break line;
                }
                None => return Err(Error::validation(FORMAT, "The file is empty")),
            }
        };

        let cells: Vec<&str> = header.split('\t').collect();
        let id_header = cells[0].to_string();
        if !is_recognized_id_header(&id_header) {
            return Err(Error::validation(
                FORMAT,
                format!(
                    "The first column must be an identifier column; column name '{}' is not recognized",
                    id_header
                ),
            ));
        }
        let names: Vec<String> = cells[1..].iter().map(|s| s.to_string()).collect();

        let mut ids: Vec<String> = Vec::new();
        let mut cells_by_column: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        for line in lines {
            if let Some(limit) = limit {
                if ids.len() == limit {
                    break;
                }
            }
            let line = line?;
            if line.is_empty() || line.starts_with("#q2:") {
                continue;
            }
            let row: Vec<&str> = line.split('\t').collect();
            if row.len() != names.len() + 1 {
                return Err(Error::validation(
                    FORMAT,
                    format!(
                        "Expected {} columns but row '{}' has {}",
                        names.len() + 1,
                        row[0],
                        row.len()
                    ),
                ));
            }
            let id = row[0].to_string();
            if id.is_empty() {
                return Err(Error::validation(FORMAT, "Identifiers must not be empty"));
            }
            if ids.contains(&id) {
                return Err(Error::validation(FORMAT, format!("Duplicate identifier {}", id)));
            }
            ids.push(id);
            for (column, cell) in cells_by_column.iter_mut().zip(&row[1..]) {
                column.push(cell.to_string());
            }
        }

        let columns = names
            .into_iter()
            .zip(cells_by_column)
            .map(|(name, values)| MetadataColumn { kind: infer_kind(&values), name, values })
            .collect();
        Ok(Metadata { id_header, ids, columns })
    }

    pub fn read_tsv(path: &Path) -> Result<Self, Error> {
        let mut file = std::fs::File::open(path)?;
        Self::from_tsv(&mut file, None)
    }

    pub fn to_tsv<W: Write>(&self, conn: &mut W) -> Result<(), Error> {
        let mut header = self.id_header.clone();
        for column in &self.columns {
            header.push('\t');
            header.push_str(&column.name);
        }
        header.push('\n');
        conn.write_all(header.as_bytes())?;

        for (row, id) in self.ids.iter().enumerate() {
            let mut line = id.clone();
            for column in &self.columns {
                line.push('\t');
                line.push_str(&column.values[row]);
            }
            line.push('\n');
            conn.write_all(line.as_bytes())?;
        }
        Ok(())
    }

    pub fn write_tsv(&self, path: &Path) -> Result<(), Error> {
        let mut file = std::fs::File::create(path)?;
        self.to_tsv(&mut file)
    }
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn tsv_round_trip() {
        use super::Metadata;
        use std::io::Cursor;

        let data: Vec<u8> =
            b"sample-id\tbody-site\tdepth\ns1\tgut\t1.5\ns2\ttongue\t2\n".to_vec();
        let md = Metadata::from_tsv(&mut Cursor::new(data.clone()), None).unwrap();
        assert_eq!(md.ids, vec!["s1", "s2"]);

        let mut bytes: Cursor<Vec<u8>> = Cursor::new(Vec::new());
        md.to_tsv(&mut bytes).unwrap();
        assert_eq!(bytes.into_inner(), data);
    }

    #[test]
    fn column_types_are_inferred() {
        use super::ColumnType;
        use super::Metadata;
        use std::io::Cursor;

        let data: Vec<u8> =
            b"id\tbody-site\tdepth\ns1\tgut\t1.5\ns2\ttongue\t2\n".to_vec();
        let md = Metadata::from_tsv(&mut Cursor::new(data), None).unwrap();
        assert_eq!(md.columns[0].kind, ColumnType::Categorical);
        assert_eq!(md.columns[1].kind, ColumnType::Numeric);
    }

    #[test]
    fn unrecognized_id_header_names_the_column() {
        use super::Metadata;
        use std::io::Cursor;

        let data: Vec<u8> = b"foo\tbar\ns1\t1\n".to_vec();
        let err = Metadata::from_tsv(&mut Cursor::new(data), None).unwrap_err();
        assert!(err.to_string().contains("column name 'foo'"));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        use super::Metadata;
        use std::io::Cursor;

        let data: Vec<u8> = b"id\ta\tb\ns1\t1\n".to_vec();
        assert!(Metadata::from_tsv(&mut Cursor::new(data), None).is_err());
    }

    #[test]
    fn hash_prefixed_id_headers_are_exact() {
        use super::is_recognized_id_header;

        assert!(is_recognized_id_header("#SampleID"));
        assert!(is_recognized_id_header("#OTU ID"));
        assert!(is_recognized_id_header("Sample-ID"));
        assert!(!is_recognized_id_header("#sampleid"));
        assert!(!is_recognized_id_header("name"));
    }
}
