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

//! A minimal HDF5 1.8 subset, enough for the BIOM v2.1 layout.
//!
//! Supported: superblock version 0, version-1 object headers, symbol-table
//! groups, contiguous one-dimensional datasets of `f64`, fixed-point
//! integers and fixed-length ASCII strings, and in-header attributes.
//! Variable-length strings, chunking, and filters are out; files using them
//! are reported as unsupported rather than misread.
//!
//! The writer and reader share the layout constants below so that a file
//! written here always reads back here.

pub mod read;
pub mod write;

pub use read::Hdf5File;
pub use write::write_file;

/// The 8-byte HDF5 file signature.
pub const SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', 0x0d, 0x0a, 0x1a, 0x0a];

/// The undefined address.
pub const UNDEF: u64 = u64::MAX;

// Header message types used by this subset
pub(crate) const MSG_NIL: u16 = 0x0000;
pub(crate) const MSG_DATASPACE: u16 = 0x0001;
pub(crate) const MSG_DATATYPE: u16 = 0x0003;
pub(crate) const MSG_LAYOUT: u16 = 0x0008;
pub(crate) const MSG_ATTRIBUTE: u16 = 0x000c;
pub(crate) const MSG_CONTINUATION: u16 = 0x0010;
pub(crate) const MSG_SYMBOL_TABLE: u16 = 0x0011;

/// Element type of a dataset or attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    F64,
    I32,
    U64,
    /// Fixed-length ASCII, null-padded to the given size.
    Str(usize),
}

impl Dtype {
    pub fn size(&self) -> usize {
        match self {
            Dtype::F64 => 8,
            Dtype::I32 => 4,
            Dtype::U64 => 8,
            Dtype::Str(n) => *n,
        }
    }
}

/// One-dimensional dataset contents, paired with the on-disk element type.
#[derive(Debug, Clone, PartialEq)]
pub enum DataVec {
    F64(Vec<f64>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    /// Strings stored at the given fixed size; every string must fit with a
    /// terminating NUL.
    Str(Vec<String>, usize),
}

impl DataVec {
    pub fn len(&self) -> usize {
        match self {
            DataVec::F64(v) => v.len(),
            DataVec::I32(v) => v.len(),
            DataVec::U64(v) => v.len(),
            DataVec::Str(v, _) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            DataVec::F64(_) => Dtype::F64,
            DataVec::I32(_) => Dtype::I32,
            DataVec::U64(_) => Dtype::U64,
            DataVec::Str(_, n) => Dtype::Str(*n),
        }
    }

    /// Picks a fixed string size that fits every member plus a NUL.
    pub fn strings(values: Vec<String>) -> DataVec {
        let width = values.iter().map(|s| s.len()).max().unwrap_or(0) + 1;
        DataVec::Str(values, width)
    }
}

/// An attribute value stored in an object header.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    /// Scalar fixed-length string.
    Str(String),
    /// Scalar 32-bit integer.
    Int(i32),
    /// One-dimensional 32-bit integers.
    IntVec(Vec<i32>),
}

/// A dataset to be written.
#[derive(Debug, Clone)]
pub struct DatasetDef {
    pub name: String,
    pub data: DataVec,
}

/// A group to be written.
#[derive(Debug, Clone, Default)]
pub struct GroupDef {
    pub name: String,
    pub children: Vec<NodeDef>,
}

#[derive(Debug, Clone)]
pub enum NodeDef {
    Group(GroupDef),
    Dataset(DatasetDef),
}

impl NodeDef {
    pub(crate) fn name(&self) -> &str {
        match self {
            NodeDef::Group(g) => &g.name,
            NodeDef::Dataset(d) => &d.name,
        }
    }
}
