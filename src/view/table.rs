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

//! The feature table view and its BIOM representations.
//!
//! A [BiomTable] is a sparse observation-by-sample matrix. It reads and
//! writes BIOM v1.0 (JSON) and BIOM v2.1 (HDF5, via the [crate::hdf5]
//! subset), and converts to the data frame and metadata views. Axis
//! metadata in the source files is accepted but not carried.

use std::io::Read;
use std::io::Write;
use std::path::Path;

use serde::Deserialize;
use uuid::Uuid;

use crate::hdf5;
use crate::hdf5::Attr;
use crate::hdf5::DataVec;
use crate::hdf5::DatasetDef;
use crate::hdf5::GroupDef;
use crate::hdf5::Hdf5File;
use crate::hdf5::NodeDef;
use crate::Error;

use super::data_frame::DataFrame;
use super::data_frame::Index;
use super::metadata::ColumnType;
use super::metadata::Metadata;
use super::metadata::MetadataColumn;

const FORMAT_V1: &str = "BIOMV100Format";
const FORMAT_V21: &str = "BIOMV210Format";

const V1_FORMAT_STRING: &str = "Biological Observation Matrix 1.0.0";
const V1_FORMAT_URL: &str = "http://biom-format.org";

/// A sparse observation-by-sample feature table.
#[derive(Debug, Clone, PartialEq)]
pub struct BiomTable {
    pub observation_ids: Vec<String>,
    pub sample_ids: Vec<String>,
    /// Non-zero entries as `(observation, sample, value)`, kept sorted
    /// row-major.
    data: Vec<(usize, usize, f64)>,
}

impl BiomTable {
    /// Builds a table, checking that every entry is in range.
    pub fn new(
        observation_ids: Vec<String>,
        sample_ids: Vec<String>,
        mut data: Vec<(usize, usize, f64)>,
    ) -> Result<Self, Error> {
        for (row, col, _) in &data {
            if *row >= observation_ids.len() || *col >= sample_ids.len() {
                return Err(Error::validation(
                    "Table",
                    format!(
                        "Entry ({}, {}) is outside the {} by {} table",
                        row,
                        col,
                        observation_ids.len(),
                        sample_ids.len()
                    ),
                ));
            }
        }
        data.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        Ok(BiomTable { observation_ids, sample_ids, data })
    }

    pub fn n_observations(&self) -> usize {
        self.observation_ids.len()
    }

    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn entries(&self) -> &[(usize, usize, f64)] {
        &self.data
    }

    pub fn get(&self, observation: usize, sample: usize) -> f64 {
        self.data
            .iter()
            .find(|(r, c, _)| *r == observation && *c == sample)
            .map(|(_, _, v)| *v)
            .unwrap_or(0.0)
    }

    /// Reads a BIOM v1.0 JSON table, accepting both sparse and dense
    /// matrices.
    ///
    /// ## Errors
    ///
    /// A file declaring any other format version is rejected outright.
    pub fn from_json_v1<R: Read>(conn: &mut R) -> Result<Self, Error> {
        let parsed: BiomJson = serde_json::from_reader(conn)?;
        if parsed.format != V1_FORMAT_STRING {
            return Err(Error::validation(
                FORMAT_V1,
                format!(
                    "The file declares format \"{}\"; expected {}",
                    parsed.format, V1_FORMAT_STRING
                ),
            ));
        }
        let [n_obs, n_samples] = parsed.shape;
        if parsed.rows.len() != n_obs || parsed.columns.len() != n_samples {
            return Err(Error::validation(
                FORMAT_V1,
                format!(
                    "The declared shape [{}, {}] does not match {} rows and {} columns",
                    n_obs,
                    n_samples,
                    parsed.rows.len(),
                    parsed.columns.len()
                ),
            ));
        }

        let mut data: Vec<(usize, usize, f64)> = Vec::new();
        match parsed.matrix_type.as_str() {
            "sparse" => {
                for entry in &parsed.data {
                    let [row, col, value] = entry.as_slice() else {
                        return Err(Error::validation(
                            FORMAT_V1,
                            "Sparse matrix entries must be [row, column, value] triples",
                        ));
                    };
                    let row = index_from_f64(FORMAT_V1, *row)?;
                    let col = index_from_f64(FORMAT_V1, *col)?;
                    data.push((row, col, *value));
                }
            }
            "dense" => {
                if parsed.data.len() != n_obs {
                    return Err(Error::validation(
                        FORMAT_V1,
                        format!(
                            "Expected {} dense rows, found {}",
                            n_obs,
                            parsed.data.len()
                        ),
                    ));
                }
                for (row, values) in parsed.data.iter().enumerate() {
                    if values.len() != n_samples {
                        return Err(Error::validation(
                            FORMAT_V1,
                            format!(
                                "Dense row {} has {} values; expected {}",
                                row,
                                values.len(),
                                n_samples
                            ),
                        ));
                    }
                    for (col, value) in values.iter().enumerate() {
                        if *value != 0.0 {
                            data.push((row, col, *value));
                        }
                    }
                }
            }
            other => {
                return Err(Error::validation(
                    FORMAT_V1,
                    format!("Unknown matrix_type \"{}\"", other),
                ))
            }
        }

        BiomTable::new(
            parsed.rows.into_iter().map(|r| r.id).collect(),
            parsed.columns.into_iter().map(|c| c.id).collect(),
            data,
        )
    }

    pub fn read_json_v1(path: &Path) -> Result<Self, Error> {
        let mut file = std::fs::File::open(path)?;
        Self::from_json_v1(&mut file)
    }

    /// Writes the table as sparse BIOM v1.0 JSON.
    pub fn to_json_v1<W: Write>(&self, conn: &mut W) -> Result<(), Error> {
        let axis = |ids: &[String]| -> Vec<serde_json::Value> {
            ids.iter()
                .map(|id| serde_json::json!({ "id": id, "metadata": null }))
                .collect()
        };
        let data: Vec<serde_json::Value> = self
            .data
            .iter()
            .map(|(row, col, value)| serde_json::json!([row, col, value]))
            .collect();
        let document = serde_json::json!({
            "id": Uuid::new_v4().to_string(),
            "format": V1_FORMAT_STRING,
            "format_url": V1_FORMAT_URL,
            "type": "OTU table",
            "generated_by": generated_by(),
            "date": iso_timestamp(),
            "matrix_type": "sparse",
            "matrix_element_type": "float",
            "shape": [self.n_observations(), self.n_samples()],
            "rows": axis(&self.observation_ids),
            "columns": axis(&self.sample_ids),
            "data": data,
        });
        serde_json::to_writer_pretty(conn, &document)?;
        Ok(())
    }

    pub fn write_json_v1(&self, path: &Path) -> Result<(), Error> {
        let mut file = std::fs::File::create(path)?;
        self.to_json_v1(&mut file)
    }

    /// Reads a BIOM v2.1 HDF5 table.
    ///
    /// ## Errors
    ///
    /// Fails on files that are not HDF5, declare a different
    /// `format-version`, or lack the observation CSR datasets.
    pub fn read_hdf5(path: &Path) -> Result<Self, Error> {
        let file = Hdf5File::open(FORMAT_V21, path)?;
        if let Some(version) = file.root_attribute("format-version")? {
            let version = version.as_u64()?;
            if version != [2, 1] {
                return Err(Error::validation(
                    FORMAT_V21,
                    format!(
                        "The file declares format-version {:?}; expected [2, 1]",
                        version
                    ),
                ));
            }
        }

        let observation_ids = file.dataset_at_path("observation/ids")?.as_strings()?;
        let sample_ids = file.dataset_at_path("sample/ids")?.as_strings()?;
        let values = file.dataset_at_path("observation/matrix/data")?.as_f64()?;
        let indices = file.dataset_at_path("observation/matrix/indices")?.as_u64()?;
        let indptr = file.dataset_at_path("observation/matrix/indptr")?.as_u64()?;

        if indptr.len() != observation_ids.len() + 1 {
            return Err(Error::validation(
                FORMAT_V21,
                format!(
                    "Expected {} index pointers for {} observations, found {}",
                    observation_ids.len() + 1,
                    observation_ids.len(),
                    indptr.len()
                ),
            ));
        }
        if values.len() != indices.len() {
            return Err(Error::validation(
                FORMAT_V21,
                "The data and indices datasets differ in length",
            ));
        }

        let mut data = Vec::with_capacity(values.len());
        for row in 0..observation_ids.len() {
            let start = indptr[row] as usize;
            let end = indptr[row + 1] as usize;
            if start > end || end > values.len() {
                return Err(Error::validation(
                    FORMAT_V21,
                    format!("The index pointers for observation {} are out of order", row),
                ));
            }
            for k in start..end {
                data.push((row, indices[k] as usize, values[k]));
            }
        }
        BiomTable::new(observation_ids, sample_ids, data)
    }

    /// Writes the table as BIOM v2.1 HDF5, with the observation axis in CSR
    /// and the sample axis in CSC order.
    pub fn write_hdf5(&self, path: &Path) -> Result<(), Error> {
        let observation = self.axis_group("observation", &self.observation_ids, false);
        let sample = self.axis_group("sample", &self.sample_ids, true);

        let root_attrs = vec![
            ("id".to_string(), Attr::Str(Uuid::new_v4().to_string())),
            ("type".to_string(), Attr::Str("OTU table".to_string())),
            ("format-url".to_string(), Attr::Str(V1_FORMAT_URL.to_string())),
            ("format-version".to_string(), Attr::IntVec(vec![2, 1])),
            ("generated-by".to_string(), Attr::Str(generated_by())),
            ("creation-date".to_string(), Attr::Str(iso_timestamp())),
            (
                "shape".to_string(),
                Attr::IntVec(vec![self.n_observations() as i32, self.n_samples() as i32]),
            ),
            ("nnz".to_string(), Attr::Int(self.nnz() as i32)),
        ];
        hdf5::write_file(
            path,
            root_attrs,
            vec![NodeDef::Group(observation), NodeDef::Group(sample)],
        )
    }

    /// Compressed-sparse group for one axis. `transpose` swaps the roles of
    /// the entry coordinates, giving CSC for the sample axis.
    fn axis_group(&self, name: &str, ids: &[String], transpose: bool) -> GroupDef {
        let mut entries: Vec<(usize, usize, f64)> = self
            .data
            .iter()
            .map(|(row, col, value)| {
                if transpose {
                    (*col, *row, *value)
                } else {
                    (*row, *col, *value)
                }
            })
            .collect();
        entries.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut values = Vec::with_capacity(entries.len());
        let mut indices = Vec::with_capacity(entries.len());
        let mut indptr = vec![0i32; ids.len() + 1];
        for (major, minor, value) in &entries {
            values.push(*value);
            indices.push(*minor as i32);
            indptr[*major + 1] += 1;
        }
        for idx in 1..indptr.len() {
            indptr[idx] += indptr[idx - 1];
        }

        GroupDef {
            name: name.to_string(),
            children: vec![
                NodeDef::Dataset(DatasetDef {
                    name: "ids".to_string(),
                    data: DataVec::strings(ids.to_vec()),
                }),
                NodeDef::Group(GroupDef {
                    name: "matrix".to_string(),
                    children: vec![
                        NodeDef::Dataset(DatasetDef {
                            name: "data".to_string(),
                            data: DataVec::F64(values),
                        }),
                        NodeDef::Dataset(DatasetDef {
                            name: "indices".to_string(),
                            data: DataVec::I32(indices),
                        }),
                        NodeDef::Dataset(DatasetDef {
                            name: "indptr".to_string(),
                            data: DataVec::I32(indptr),
                        }),
                    ],
                }),
            ],
        }
    }

    /// Densifies into a sample-by-observation frame with the sample ids as
    /// the row labels.
    pub fn to_data_frame(&self) -> DataFrame {
        let n_rows = self.n_samples();
        let n_cols = self.n_observations();
        let mut cells = vec![0.0; n_rows * n_cols];
        for (obs, sample, value) in &self.data {
            cells[sample * n_cols + obs] = *value;
        }
        DataFrame {
            index: Index::Labels(self.sample_ids.clone()),
            columns: self.observation_ids.clone(),
            cells,
        }
    }

    /// Builds a table from a sample-by-observation frame.
    ///
    /// ## Errors
    ///
    /// The frame's index must be label-based; the labels become the sample
    /// ids.
    pub fn from_data_frame(frame: &DataFrame) -> Result<Self, Error> {
        let sample_ids = frame.labels()?.to_vec();
        let observation_ids = frame.columns.clone();
        let mut data = Vec::new();
        for sample in 0..frame.n_rows() {
            for obs in 0..frame.n_columns() {
                let value = frame.get(sample, obs);
                if value != 0.0 {
                    data.push((obs, sample, value));
                }
            }
        }
        BiomTable::new(observation_ids, sample_ids, data)
    }

    /// Re-views the table as sample metadata: one numeric column per
    /// observation, indexed by sample id.
    pub fn to_metadata(&self) -> Metadata {
        let columns = self
            .observation_ids
            .iter()
            .enumerate()
            .map(|(obs, name)| MetadataColumn {
                name: name.clone(),
                kind: ColumnType::Numeric,
                values: (0..self.n_samples())
                    .map(|sample| format!("{}", self.get(obs, sample)))
                    .collect(),
            })
            .collect();
        Metadata {
            id_header: "id".to_string(),
            ids: self.sample_ids.clone(),
            columns,
        }
    }
}

fn index_from_f64(format: &str, value: f64) -> Result<usize, Error> {
    if value < 0.0 || value.fract() != 0.0 {
        return Err(Error::validation(
            format,
            format!("{} is not a valid matrix index", value),
        ));
    }
    Ok(value as usize)
}

fn generated_by() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// UTC timestamp for the creation-date fields, without pulling in a
/// calendar crate. Uses the civil-from-days algorithm.
fn iso_timestamp() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let days = secs.div_euclid(86_400);
    let rem = secs.rem_euclid(86_400);

    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if month <= 2 { year + 1 } else { year };

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        year,
        month,
        day,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

#[derive(Debug, Deserialize)]
struct BiomJson {
    format: String,
    matrix_type: String,
    shape: [usize; 2],
    data: Vec<Vec<f64>>,
    rows: Vec<AxisEntry>,
    columns: Vec<AxisEntry>,
}

#[derive(Debug, Deserialize)]
struct AxisEntry {
    id: String,
}
