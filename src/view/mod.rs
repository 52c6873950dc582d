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

//! In-memory views of payloads and the [Value] type moved along transformer
//! edges.
//!
//! A view has no on-disk identity; it only participates in the transformer
//! graph. On-disk endpoints travel as [FormatValue]s: a format tag plus a
//! path, optionally owning the scratch directory a transformer wrote into.

// View-specific representations and their readers/writers
pub mod data_frame;
pub mod distance_matrix;
pub mod hmm;
pub mod mag_map;
pub mod metadata;
pub mod ordination;
pub mod table;
pub mod tree;

use std::path::Path;
use std::path::PathBuf;

use crate::Error;

use data_frame::DataFrame;
use distance_matrix::DistanceMatrix;
use hmm::HmmFile;
use mag_map::MagToContigs;
use metadata::Metadata;
use ordination::OrdinationResults;
use ordination::ProcrustesStatistics;
use table::BiomTable;
use tree::TreeNode;

/// An opaque tag identifying a view in the transformer graph.
///
/// File formats participate under their format name; in-memory views under
/// the constants below. Subclass relationships do not exist: two tags are the
/// same view iff their names are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub &'static str);

impl std::fmt::Display for ViewId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const DISTANCE_MATRIX: ViewId = ViewId("DistanceMatrix");
pub const ORDINATION: ViewId = ViewId("OrdinationResults");
pub const PROCRUSTES: ViewId = ViewId("ProcrustesStatistics");
pub const TREE: ViewId = ViewId("TreeNode");
pub const TABLE: ViewId = ViewId("Table");
pub const DATA_FRAME: ViewId = ViewId("DataFrame");
pub const METADATA: ViewId = ViewId("Metadata");
pub const HMM_FILE: ViewId = ViewId("HmmFile");
pub const MAG_TO_CONTIGS: ViewId = ViewId("MagToContigs");

/// A file-format value: a format tag bound to a concrete path.
///
/// Transformer outputs own the scratch directory holding their file; the
/// file lives until the value is dropped.
#[derive(Debug)]
pub struct FormatValue {
    format: &'static str,
    path: PathBuf,
    scratch: Option<tempfile::TempDir>,
}

impl FormatValue {
    /// Wraps an existing payload file without taking ownership of it.
    pub fn existing(format: &'static str, path: impl Into<PathBuf>) -> Self {
        FormatValue { format, path: path.into(), scratch: None }
    }

    /// Allocates a scratch directory and points the value at `filename`
    /// inside it. The caller writes the file; the directory is removed when
    /// the value is dropped.
    pub fn scratch(format: &'static str, filename: &str) -> Result<Self, Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(filename);
        Ok(FormatValue { format, path, scratch: Some(dir) })
    }

    pub fn format(&self) -> &'static str {
        self.format
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the scratch directory without deleting it, eg. when the
    /// caller wants to keep the file.
    pub fn keep(mut self) -> PathBuf {
        if let Some(dir) = self.scratch.take() {
            let _ = dir.keep();
        }
        self.path
    }
}

/// A value moving along transformer edges: either an on-disk format value or
/// one of the in-memory views.
#[derive(Debug)]
pub enum Value {
    Format(FormatValue),
    DistanceMatrix(DistanceMatrix),
    Ordination(OrdinationResults),
    Procrustes(ProcrustesStatistics),
    Tree(TreeNode),
    Table(BiomTable),
    DataFrame(DataFrame),
    Metadata(Metadata),
    Hmm(HmmFile),
    MagMap(MagToContigs),
}

impl Value {
    /// The view tag of this value in the transformer graph.
    pub fn view_id(&self) -> ViewId {
        match self {
            Value::Format(fv) => ViewId(fv.format),
            Value::DistanceMatrix(_) => DISTANCE_MATRIX,
            Value::Ordination(_) => ORDINATION,
            Value::Procrustes(_) => PROCRUSTES,
            Value::Tree(_) => TREE,
            Value::Table(_) => TABLE,
            Value::DataFrame(_) => DATA_FRAME,
            Value::Metadata(_) => METADATA,
            Value::Hmm(_) => HMM_FILE,
            Value::MagMap(_) => MAG_TO_CONTIGS,
        }
    }

    fn wrong_view(self, expected: &str) -> Error {
        Error::WrongView { expected: expected.to_string(), found: self.view_id().to_string() }
    }

    /// Unwraps a format value carrying the expected format tag.
    pub fn into_format(self, expected: &'static str) -> Result<FormatValue, Error> {
        match self {
            Value::Format(fv) if fv.format == expected => Ok(fv),
            other => Err(other.wrong_view(expected)),
        }
    }

    pub fn into_distance_matrix(self) -> Result<DistanceMatrix, Error> {
        match self {
            Value::DistanceMatrix(dm) => Ok(dm),
            other => Err(other.wrong_view(DISTANCE_MATRIX.0)),
        }
    }

    pub fn into_ordination(self) -> Result<OrdinationResults, Error> {
        match self {
            Value::Ordination(ord) => Ok(ord),
            other => Err(other.wrong_view(ORDINATION.0)),
        }
    }

    pub fn into_procrustes(self) -> Result<ProcrustesStatistics, Error> {
        match self {
            Value::Procrustes(stats) => Ok(stats),
            other => Err(other.wrong_view(PROCRUSTES.0)),
        }
    }

    pub fn into_tree(self) -> Result<TreeNode, Error> {
        match self {
            Value::Tree(tree) => Ok(tree),
            other => Err(other.wrong_view(TREE.0)),
        }
    }

    pub fn into_table(self) -> Result<BiomTable, Error> {
        match self {
            Value::Table(table) => Ok(table),
            other => Err(other.wrong_view(TABLE.0)),
        }
    }

    pub fn into_data_frame(self) -> Result<DataFrame, Error> {
        match self {
            Value::DataFrame(df) => Ok(df),
            other => Err(other.wrong_view(DATA_FRAME.0)),
        }
    }

    pub fn into_metadata(self) -> Result<Metadata, Error> {
        match self {
            Value::Metadata(md) => Ok(md),
            other => Err(other.wrong_view(METADATA.0)),
        }
    }

    pub fn into_hmm(self) -> Result<HmmFile, Error> {
        match self {
            Value::Hmm(hmm) => Ok(hmm),
            other => Err(other.wrong_view(HMM_FILE.0)),
        }
    }

    pub fn into_mag_map(self) -> Result<MagToContigs, Error> {
        match self {
            Value::MagMap(map) => Ok(map),
            other => Err(other.wrong_view(MAG_TO_CONTIGS.0)),
        }
    }
}
