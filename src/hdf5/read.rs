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

//! The HDF5 subset reader.
//!
//! Reads the structures the [writer](super::write) emits plus the common
//! variations needed for files produced elsewhere: version-2 dataspace
//! messages, compact data layouts, object header continuation blocks and
//! multi-level group B-trees. Everything outside the subset fails with a
//! message naming the unsupported structure instead of misreading it.

use std::path::Path;

use crate::Error;

use super::MSG_ATTRIBUTE;
use super::MSG_CONTINUATION;
use super::MSG_DATASPACE;
use super::MSG_DATATYPE;
use super::MSG_LAYOUT;
use super::MSG_NIL;
use super::MSG_SYMBOL_TABLE;
use super::SIGNATURE;

/// Element type of a dataset as found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadDtype {
    Float(usize),
    Int { size: usize, signed: bool },
    Str(usize),
}

impl ReadDtype {
    fn size(&self) -> usize {
        match self {
            ReadDtype::Float(n) => *n,
            ReadDtype::Int { size, .. } => *size,
            ReadDtype::Str(n) => *n,
        }
    }
}

/// A materialised one-dimensional dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    format: String,
    pub dims: Vec<u64>,
    dtype: ReadDtype,
    raw: Vec<u8>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.dims.iter().product::<u64>() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn element(&self, index: usize) -> &[u8] {
        let size = self.dtype.size();
        &self.raw[index * size..(index + 1) * size]
    }

    /// The values as `f64`, widening integers.
    pub fn as_f64(&self) -> Result<Vec<f64>, Error> {
        let mut out = Vec::with_capacity(self.len());
        for idx in 0..self.len() {
            let bytes = self.element(idx);
            let value = match self.dtype {
                ReadDtype::Float(8) => f64::from_le_bytes(bytes.try_into().unwrap()),
                ReadDtype::Float(4) => f32::from_le_bytes(bytes.try_into().unwrap()) as f64,
                ReadDtype::Int { .. } => self.int_at(idx) as f64,
                _ => {
                    return Err(Error::validation(
                        &self.format,
                        "Expected a numeric dataset",
                    ))
                }
            };
            out.push(value);
        }
        Ok(out)
    }

    fn int_at(&self, index: usize) -> i64 {
        let bytes = self.element(index);
        let signed = matches!(self.dtype, ReadDtype::Int { signed: true, .. });
        let mut value: u64 = 0;
        for (pos, byte) in bytes.iter().enumerate() {
            value |= (*byte as u64) << (8 * pos);
        }
        if signed && bytes.len() < 8 {
            // Sign-extend
            let shift = 64 - 8 * bytes.len();
            ((value << shift) as i64) >> shift
        } else {
            value as i64
        }
    }

    /// The values as `u64`, rejecting floats and negatives.
    pub fn as_u64(&self) -> Result<Vec<u64>, Error> {
        let mut out = Vec::with_capacity(self.len());
        for idx in 0..self.len() {
            match self.dtype {
                ReadDtype::Int { .. } => {
                    let value = self.int_at(idx);
                    if value < 0 {
                        return Err(Error::validation(
                            &self.format,
                            format!("Expected a non-negative integer, found {}", value),
                        ));
                    }
                    out.push(value as u64);
                }
                _ => {
                    return Err(Error::validation(&self.format, "Expected an integer dataset"))
                }
            }
        }
        Ok(out)
    }

    /// The values as strings, trimming the fixed-length NUL padding.
    pub fn as_strings(&self) -> Result<Vec<String>, Error> {
        let mut out = Vec::with_capacity(self.len());
        for idx in 0..self.len() {
            match self.dtype {
                ReadDtype::Str(_) => {
                    let bytes = self.element(idx);
                    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
                    let text = std::str::from_utf8(&bytes[..end]).map_err(|_| {
                        Error::validation(&self.format, "A string value is not valid UTF-8")
                    })?;
                    out.push(text.to_string());
                }
                _ => {
                    return Err(Error::validation(&self.format, "Expected a string dataset"))
                }
            }
        }
        Ok(out)
    }
}

/// An HDF5 file held in memory.
#[derive(Debug)]
pub struct Hdf5File {
    format: String,
    bytes: Vec<u8>,
}

impl Hdf5File {
    /// Opens `path`, checking the signature and superblock version.
    /// Validation errors name `format`.
    pub fn open(format: &str, path: &Path) -> Result<Self, Error> {
        let bytes = std::fs::read(path)?;
        if bytes.len() < 96 || bytes[0..8] != SIGNATURE {
            return Err(Error::validation(format, "Missing the HDF5 signature"));
        }
        if bytes[8] != 0 {
            return Err(Error::validation(
                format,
                format!("Superblock version {} is not supported", bytes[8]),
            ));
        }
        Ok(Hdf5File { format: format.to_string(), bytes })
    }

    fn fail(&self, message: impl Into<String>) -> Error {
        Error::validation(&self.format, message)
    }

    fn slice(&self, addr: u64, len: usize) -> Result<&[u8], Error> {
        let start = addr as usize;
        let end = start.checked_add(len).ok_or_else(|| self.fail("Address overflow"))?;
        if end > self.bytes.len() {
            return Err(self.fail("An address points outside the file"));
        }
        Ok(&self.bytes[start..end])
    }

    fn u16_at(&self, addr: u64) -> Result<u16, Error> {
        Ok(u16::from_le_bytes(self.slice(addr, 2)?.try_into().unwrap()))
    }

    fn u64_at(&self, addr: u64) -> Result<u64, Error> {
        Ok(u64::from_le_bytes(self.slice(addr, 8)?.try_into().unwrap()))
    }

    fn root_addr(&self) -> Result<u64, Error> {
        self.u64_at(64)
    }

    /// Collects `(type, body)` for every message of the object header at
    /// `addr`, following continuation blocks.
    fn object_messages(&self, addr: u64) -> Result<Vec<(u16, Vec<u8>)>, Error> {
        let header = self.slice(addr, 16)?;
        if header[0] != 1 {
            return Err(self.fail(format!(
                "Object header version {} is not supported",
                header[0]
            )));
        }
        let total = u16::from_le_bytes(header[2..4].try_into().unwrap()) as usize;
        let block_size = u32::from_le_bytes(header[8..12].try_into().unwrap()) as u64;

        let mut blocks: Vec<(u64, u64)> = vec![(addr + 16, block_size)];
        let mut messages = Vec::with_capacity(total);
        // NIL and continuation messages count toward the header's total
        let mut seen = 0;
        let mut block_idx = 0;
        while seen < total && block_idx < blocks.len() {
            let (start, len) = blocks[block_idx];
            let mut pos = start;
            let end = start + len;
            while seen < total && pos + 8 <= end {
                let msg_type = self.u16_at(pos)?;
                let size = self.u16_at(pos + 2)? as usize;
                let body = self.slice(pos + 8, size)?.to_vec();
                if msg_type == MSG_CONTINUATION {
                    if body.len() < 16 {
                        return Err(self.fail("Truncated continuation message"));
                    }
                    let offset = u64::from_le_bytes(body[0..8].try_into().unwrap());
                    let length = u64::from_le_bytes(body[8..16].try_into().unwrap());
                    blocks.push((offset, length));
                } else if msg_type != MSG_NIL {
                    messages.push((msg_type, body));
                }
                seen += 1;
                pos += 8 + size as u64;
            }
            block_idx += 1;
        }
        Ok(messages)
    }

    fn heap_data_addr(&self, heap_addr: u64) -> Result<u64, Error> {
        if self.slice(heap_addr, 4)? != b"HEAP" {
            return Err(self.fail("Expected a local heap"));
        }
        self.u64_at(heap_addr + 24)
    }

    fn heap_string(&self, data_addr: u64, offset: u64) -> Result<String, Error> {
        let start = (data_addr + offset) as usize;
        if start >= self.bytes.len() {
            return Err(self.fail("A heap offset points outside the file"));
        }
        let rest = &self.bytes[start..];
        let end = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| self.fail("Unterminated heap string"))?;
        std::str::from_utf8(&rest[..end])
            .map(|s| s.to_string())
            .map_err(|_| self.fail("A link name is not valid UTF-8"))
    }

    fn btree_snods(&self, addr: u64, out: &mut Vec<u64>) -> Result<(), Error> {
        if self.slice(addr, 4)? != b"TREE" {
            return Err(self.fail("Expected a B-tree node"));
        }
        let node = self.slice(addr, 8)?;
        if node[4] != 0 {
            return Err(self.fail("Expected a group B-tree node"));
        }
        let level = node[5];
        let entries = u16::from_le_bytes(node[6..8].try_into().unwrap()) as u64;
        for idx in 0..entries {
            // Keys and children alternate after the sibling pointers
            let child = self.u64_at(addr + 24 + 8 + idx * 16)?;
            if level == 0 {
                out.push(child);
            } else {
                self.btree_snods(child, out)?;
            }
        }
        Ok(())
    }

    /// The members of the group at `addr` as `(name, object header address)`.
    pub fn group(&self, addr: u64) -> Result<Vec<(String, u64)>, Error> {
        let messages = self.object_messages(addr)?;
        let stab = messages
            .iter()
            .find(|(t, _)| *t == MSG_SYMBOL_TABLE)
            .ok_or_else(|| self.fail("The object is not a group"))?;
        if stab.1.len() < 16 {
            return Err(self.fail("Truncated symbol table message"));
        }
        let btree_addr = u64::from_le_bytes(stab.1[0..8].try_into().unwrap());
        let heap_addr = u64::from_le_bytes(stab.1[8..16].try_into().unwrap());
        let data_addr = self.heap_data_addr(heap_addr)?;

        let mut snods = Vec::new();
        self.btree_snods(btree_addr, &mut snods)?;

        let mut members = Vec::new();
        for snod in snods {
            if self.slice(snod, 4)? != b"SNOD" {
                return Err(self.fail("Expected a symbol table node"));
            }
            let count = self.u16_at(snod + 6)? as u64;
            for idx in 0..count {
                let entry = snod + 8 + idx * 40;
                let name_offset = self.u64_at(entry)?;
                let oh_addr = self.u64_at(entry + 8)?;
                members.push((self.heap_string(data_addr, name_offset)?, oh_addr));
            }
        }
        Ok(members)
    }

    /// Reads the dataset whose object header is at `addr`.
    pub fn dataset(&self, addr: u64) -> Result<Dataset, Error> {
        let messages = self.object_messages(addr)?;

        let mut dims: Option<Vec<u64>> = None;
        let mut dtype: Option<ReadDtype> = None;
        let mut raw: Option<Vec<u8>> = None;

        for (msg_type, body) in &messages {
            match *msg_type {
                MSG_DATASPACE => dims = Some(self.parse_dataspace(body)?),
                MSG_DATATYPE => dtype = Some(self.parse_datatype(body)?),
                MSG_LAYOUT => raw = Some(self.parse_layout(body)?),
                _ => {}
            }
        }

        let dims = dims.ok_or_else(|| self.fail("The dataset has no dataspace"))?;
        let dtype = dtype.ok_or_else(|| self.fail("The dataset has no datatype"))?;
        let raw = raw.ok_or_else(|| self.fail("The dataset has no data layout"))?;

        let elements = dims.iter().product::<u64>() as usize;
        if elements > 0 && raw.len() < elements * dtype.size() {
            return Err(self.fail("The dataset is shorter than its dataspace"));
        }
        Ok(Dataset { format: self.format.clone(), dims, dtype, raw })
    }

    fn parse_dataspace(&self, body: &[u8]) -> Result<Vec<u64>, Error> {
        // Version and dimensionality occupy the first two bytes
        if body.len() < 2 {
            return Err(self.fail("Truncated dataspace message"));
        }
        let (rank, dims_at) = match body[0] {
            1 => (body[1] as usize, 8),
            2 => (body[1] as usize, 4),
            v => {
                return Err(self.fail(format!("Dataspace version {} is not supported", v)))
            }
        };
        let mut dims = Vec::with_capacity(rank);
        for idx in 0..rank {
            let start = dims_at + idx * 8;
            if start + 8 > body.len() {
                return Err(self.fail("Truncated dataspace message"));
            }
            dims.push(u64::from_le_bytes(body[start..start + 8].try_into().unwrap()));
        }
        Ok(dims)
    }

    fn parse_datatype(&self, body: &[u8]) -> Result<ReadDtype, Error> {
        if body.len() < 8 {
            return Err(self.fail("Truncated datatype message"));
        }
        let class = body[0] & 0x0f;
        let size = u32::from_le_bytes(body[4..8].try_into().unwrap()) as usize;
        match class {
            0 => Ok(ReadDtype::Int { size, signed: body[1] & 0x08 != 0 }),
            1 if size == 4 || size == 8 => Ok(ReadDtype::Float(size)),
            1 => Err(self.fail(format!("{}-byte floats are not supported", size))),
            3 => Ok(ReadDtype::Str(size)),
            9 => Err(self.fail(
                "Variable-length datasets are not supported; use fixed-length strings",
            )),
            n => Err(self.fail(format!("Datatype class {} is not supported", n))),
        }
    }

    fn parse_layout(&self, body: &[u8]) -> Result<Vec<u8>, Error> {
        if body.len() < 2 {
            return Err(self.fail("Truncated data layout message"));
        }
        if body[0] != 3 {
            return Err(self.fail(format!(
                "Data layout version {} is not supported",
                body[0]
            )));
        }
        match body[1] {
            0 => {
                // Compact: the data follows inline
                let size = u16::from_le_bytes(body[2..4].try_into().unwrap()) as usize;
                if 4 + size > body.len() {
                    return Err(self.fail("Truncated compact data"));
                }
                Ok(body[4..4 + size].to_vec())
            }
            1 => {
                let addr = u64::from_le_bytes(body[2..10].try_into().unwrap());
                let size = u64::from_le_bytes(body[10..18].try_into().unwrap());
                if size == 0 || addr == super::UNDEF {
                    return Ok(Vec::new());
                }
                Ok(self.slice(addr, size as usize)?.to_vec())
            }
            2 => Err(self.fail("Chunked datasets are not supported")),
            n => Err(self.fail(format!("Data layout class {} is not supported", n))),
        }
    }

    /// The attributes of the object at `addr`, each materialised like a
    /// dataset. Scalar attributes come back with a single element.
    pub fn attributes(&self, addr: u64) -> Result<Vec<(String, Dataset)>, Error> {
        let padded = |n: usize| (n + 7) / 8 * 8;
        let mut out = Vec::new();
        for (msg_type, body) in self.object_messages(addr)? {
            if msg_type != MSG_ATTRIBUTE {
                continue;
            }
            if body.len() < 8 || body[0] != 1 {
                return Err(self.fail("Unsupported attribute message"));
            }
            let name_size = u16::from_le_bytes(body[2..4].try_into().unwrap()) as usize;
            let dt_size = u16::from_le_bytes(body[4..6].try_into().unwrap()) as usize;
            let ds_size = u16::from_le_bytes(body[6..8].try_into().unwrap()) as usize;

            let mut pos = 8;
            let end = pos + name_size;
            if end > body.len() {
                return Err(self.fail("Truncated attribute message"));
            }
            let name_bytes = &body[pos..end];
            let stop = name_bytes.iter().position(|b| *b == 0).unwrap_or(name_bytes.len());
            let name = std::str::from_utf8(&name_bytes[..stop])
                .map_err(|_| self.fail("An attribute name is not valid UTF-8"))?
                .to_string();
            pos += padded(name_size);

            if pos + padded(dt_size) + padded(ds_size) > body.len() {
                return Err(self.fail("Truncated attribute message"));
            }
            let dtype = self.parse_datatype(&body[pos..pos + dt_size])?;
            pos += padded(dt_size);
            let dims = self.parse_dataspace(&body[pos..pos + ds_size])?;
            pos += padded(ds_size);

            let elements = dims.iter().product::<u64>() as usize;
            let size = elements * dtype.size();
            if pos + size > body.len() {
                return Err(self.fail("Truncated attribute data"));
            }
            out.push((
                name,
                Dataset {
                    format: self.format.clone(),
                    dims,
                    dtype,
                    raw: body[pos..pos + size].to_vec(),
                },
            ));
        }
        Ok(out)
    }

    /// Looks up a root group attribute by name.
    pub fn root_attribute(&self, name: &str) -> Result<Option<Dataset>, Error> {
        let addr = self.root_addr()?;
        Ok(self
            .attributes(addr)?
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| d))
    }

    /// Resolves a `/`-separated path from the root group.
    pub fn lookup(&self, path: &str) -> Result<u64, Error> {
        let mut addr = self.root_addr()?;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            let members = self.group(addr)?;
            addr = members
                .iter()
                .find(|(name, _)| name == part)
                .map(|(_, a)| *a)
                .ok_or_else(|| self.fail(format!("No object named {} in the file", part)))?;
        }
        Ok(addr)
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.lookup(path).is_ok()
    }

    pub fn dataset_at_path(&self, path: &str) -> Result<Dataset, Error> {
        let addr = self.lookup(path)?;
        self.dataset(addr)
    }
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn truncated_files_do_not_panic() {
        use super::Hdf5File;
        use super::super::SIGNATURE;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.h5");
        let mut bytes = vec![0u8; 96];
        bytes[0..8].copy_from_slice(&SIGNATURE);
        // Root object header address points past the end of the file
        bytes[64..72].copy_from_slice(&4096u64.to_le_bytes());
        std::fs::write(&path, &bytes).unwrap();

        let file = Hdf5File::open("TestFormat", &path).unwrap();
        assert!(file.lookup("anything").is_err());
    }

    #[test]
    fn one_byte_dataspace_message_is_an_error() {
        use super::Hdf5File;
        use super::super::MSG_DATASPACE;
        use super::super::SIGNATURE;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short-dataspace.h5");
        let mut bytes = vec![0u8; 128];
        bytes[0..8].copy_from_slice(&SIGNATURE);
        // Root object header at 96: version 1, one message, 9-byte block
        bytes[64..72].copy_from_slice(&96u64.to_le_bytes());
        bytes[96] = 1;
        bytes[98..100].copy_from_slice(&1u16.to_le_bytes());
        bytes[104..108].copy_from_slice(&9u32.to_le_bytes());
        // Dataspace message whose body is a single version byte
        bytes[112..114].copy_from_slice(&MSG_DATASPACE.to_le_bytes());
        bytes[114..116].copy_from_slice(&1u16.to_le_bytes());
        bytes[120] = 1;
        std::fs::write(&path, &bytes).unwrap();

        let file = Hdf5File::open("TestFormat", &path).unwrap();
        let err = file.dataset(96).unwrap_err();
        assert!(err.to_string().contains("Truncated dataspace message"));
    }

    #[test]
    fn root_attributes_read_back() {
        use super::Hdf5File;
        use super::super::write_file;
        use super::super::Attr;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attrs.h5");
        let attrs = vec![
            ("id".to_string(), Attr::Str("table-1".to_string())),
            ("format-version".to_string(), Attr::IntVec(vec![2, 1])),
            ("nnz".to_string(), Attr::Int(7)),
        ];
        write_file(&path, attrs, Vec::new()).unwrap();

        let file = Hdf5File::open("TestFormat", &path).unwrap();
        let id = file.root_attribute("id").unwrap().unwrap();
        assert_eq!(id.as_strings().unwrap(), vec!["table-1"]);
        let version = file.root_attribute("format-version").unwrap().unwrap();
        assert_eq!(version.as_u64().unwrap(), vec![2, 1]);
        let nnz = file.root_attribute("nnz").unwrap().unwrap();
        assert_eq!(nnz.as_u64().unwrap(), vec![7]);
        assert!(file.root_attribute("missing").unwrap().is_none());
    }

    #[test]
    fn sign_extension_for_small_ints() {
        use super::Dataset;
        use super::ReadDtype;

        let dataset = Dataset {
            format: "TestFormat".to_string(),
            dims: vec![2],
            dtype: ReadDtype::Int { size: 4, signed: true },
            raw: [(-3i32).to_le_bytes(), 7i32.to_le_bytes()].concat(),
        };
        assert_eq!(dataset.as_f64().unwrap(), vec![-3.0, 7.0]);
        assert!(dataset.as_u64().is_err());
    }
}
