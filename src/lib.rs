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

//! leima is a catalog of scientific data types and their on-disk formats:
//!
//!   - Semantic types (what a payload means) realised as a closed lattice of
//!     parameterised type constructors, eg. `FeatureTable[Frequency]` or
//!     `ProfileHMM[MultipleDNAPressed]`.
//!   - Directory formats (what a payload on disk must look like) built from
//!     file-format leaves and directory containers, validated at two effort
//!     levels: [Min](ValidationLevel::Min) and [Max](ValidationLevel::Max).
//!   - Transformers that convert between on-disk formats and in-memory views
//!     through a directed multigraph with deterministic path lookup.
//!
//! The following format families are supported:
//!   - LSMat labelled square distance matrices
//!   - Ordination and Procrustes statistics text files
//!   - [BIOM](https://biom-format.org) feature tables, v1.0 (JSON) and v2.1 (HDF5)
//!   - Newick trees
//!   - Immutable metadata TSV files
//!   - MAG-to-contigs JSON maps keyed by UUIDv4
//!   - [HMMER3](http://hmmer.org) profile HMMs (amino/DNA/RNA, single or
//!     multiple, optionally pressed into the binary `.h3{m,i,f,p}` bundle)
//!   - [Kraken2](https://github.com/DerrickWood/kraken2) reports, outputs and
//!     databases, and [Bracken](https://github.com/jenniferlu717/Bracken)
//!     k-mer distribution databases
//!
//! ## Usage
//!
//! A host populates a [Registry](registry::Registry) once during start-up and
//! then observes it read-only:
//!
//! ```rust
//! use leima::catalog;
//! use leima::registry::Registry;
//!
//! let mut registry = Registry::new();
//! catalog::register_all(&mut registry).unwrap();
//!
//! // Resolve a semantic type to its on-disk format
//! let t = registry.lattice().apply("DistanceMatrix", &[]).unwrap();
//! let format = registry.directory_format_for(&t.into()).unwrap();
//! assert_eq!(format.name, "DistanceMatrixDirectoryFormat");
//! ```
//!
//! Payload directories are validated through
//! [BoundDirectory](format::BoundDirectory), and views are obtained by asking
//! the registry for a [Transformer](graph::Transformer) between two view tags.
//! See the module documentation for details.
//!

pub mod catalog;
pub mod format;
pub mod graph;
pub mod hdf5;
pub mod registry;
pub mod semantic;
pub mod validate;
pub mod view;

/// Effort level of a validation pass.
///
/// [Min](ValidationLevel::Min) examines a small, fixed prefix of the payload
/// and is bounded by a constant amount of work per file. [Max](ValidationLevel::Max)
/// examines the whole payload.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationLevel {
    Min,
    #[default]
    Max,
}

impl std::str::FromStr for ValidationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "min" => Ok(ValidationLevel::Min),
            "max" => Ok(ValidationLevel::Max),
            _ => Err(format!("'{}' is not a valid ValidationLevel", s)),
        }
    }
}

/// Errors reported by registration, validation, and transformer lookup.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A payload violated a rule of the named format.
    #[error("{format} is not valid: {message}")]
    Validation { format: String, message: String },

    /// The registry was asked to record something inconsistent. Fatal at
    /// host start-up.
    #[error("{0}")]
    Registration(String),

    /// No chain of registered transformers connects the two views.
    #[error("No transformer from {src} to {dst}")]
    NoTransformer { src: String, dst: String },

    /// A transformer received a value of the wrong view.
    #[error("Expected a {expected} value but got {found}")]
    WrongView { expected: String, found: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Builds a validation failure naming the violated format.
    pub fn validation(format: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation { format: format.into(), message: message.into() }
    }

    pub fn registration(message: impl Into<String>) -> Self {
        Error::Registration(message.into())
    }
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn validation_level_from_str() {
        use super::ValidationLevel;

        assert_eq!("min".parse::<ValidationLevel>().unwrap(), ValidationLevel::Min);
        assert_eq!("max".parse::<ValidationLevel>().unwrap(), ValidationLevel::Max);
        assert!("full".parse::<ValidationLevel>().is_err());
    }

    #[test]
    fn validation_error_names_the_format() {
        use super::Error;

        let err = Error::validation("LSMatFormat", "header row is missing");
        let msg = err.to_string();
        assert!(msg.contains("LSMat"));
        assert!(msg.contains("header row is missing"));
    }

    #[test]
    fn no_transformer_names_both_endpoints() {
        use super::Error;

        let err = Error::NoTransformer { src: "DataFrame".to_string(), dst: "TreeNode".to_string() };
        assert_eq!(err.to_string(), "No transformer from DataFrame to TreeNode");
    }
}
