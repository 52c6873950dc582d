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

//! The HDF5 subset writer.
//!
//! Objects are laid out bottom-up: dataset raw data, then the dataset object
//! headers, then per group its local heap, symbol table node, B-tree node and
//! object header, ending with the root group. The superblock at offset 0 is
//! patched last. Every object starts on an 8-byte boundary.

use std::path::Path;

use crate::Error;

use super::Attr;
use super::DataVec;
use super::Dtype;
use super::GroupDef;
use super::NodeDef;
use super::MSG_ATTRIBUTE;
use super::MSG_DATASPACE;
use super::MSG_DATATYPE;
use super::MSG_LAYOUT;
use super::MSG_SYMBOL_TABLE;
use super::SIGNATURE;
use super::UNDEF;

struct Builder {
    buf: Vec<u8>,
}

impl Builder {
    fn addr(&self) -> u64 {
        self.buf.len() as u64
    }

    fn pad8(&mut self) {
        while self.buf.len() % 8 != 0 {
            self.buf.push(0);
        }
    }

    fn put(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn put_u16(&mut self, value: u16) {
        self.put(&value.to_le_bytes());
    }

    fn put_u32(&mut self, value: u32) {
        self.put(&value.to_le_bytes());
    }

    fn put_u64(&mut self, value: u64) {
        self.put(&value.to_le_bytes());
    }
}

fn pad_to_8(bytes: &mut Vec<u8>) {
    while bytes.len() % 8 != 0 {
        bytes.push(0);
    }
}

/// Version-1 dataspace message body. An empty `dims` makes a scalar space.
fn dataspace_body(dims: &[u64]) -> Vec<u8> {
    let mut body = vec![1u8, dims.len() as u8, 0, 0, 0, 0, 0, 0];
    for dim in dims {
        body.extend_from_slice(&dim.to_le_bytes());
    }
    body
}

/// Version-1 datatype message body.
fn datatype_body(dtype: Dtype) -> Vec<u8> {
    let mut body = Vec::new();
    match dtype {
        Dtype::F64 => {
            // IEEE 754 double, little-endian
            body.extend_from_slice(&[0x11, 0x20, 0x3f, 0x00]);
            body.extend_from_slice(&8u32.to_le_bytes());
            body.extend_from_slice(&0u16.to_le_bytes()); // bit offset
            body.extend_from_slice(&64u16.to_le_bytes()); // precision
            body.push(52); // exponent location
            body.push(11); // exponent size
            body.push(0); // mantissa location
            body.push(52); // mantissa size
            body.extend_from_slice(&1023u32.to_le_bytes()); // exponent bias
        }
        Dtype::I32 => {
            body.extend_from_slice(&[0x10, 0x08, 0x00, 0x00]);
            body.extend_from_slice(&4u32.to_le_bytes());
            body.extend_from_slice(&0u16.to_le_bytes());
            body.extend_from_slice(&32u16.to_le_bytes());
        }
        Dtype::U64 => {
            body.extend_from_slice(&[0x10, 0x00, 0x00, 0x00]);
            body.extend_from_slice(&8u32.to_le_bytes());
            body.extend_from_slice(&0u16.to_le_bytes());
            body.extend_from_slice(&64u16.to_le_bytes());
        }
        Dtype::Str(size) => {
            // Fixed-length ASCII, null-terminated
            body.extend_from_slice(&[0x13, 0x00, 0x00, 0x00]);
            body.extend_from_slice(&(size as u32).to_le_bytes());
        }
    }
    body
}

/// Version-3 contiguous data layout message body.
fn layout_body(data_addr: u64, data_size: u64) -> Vec<u8> {
    let mut body = vec![3u8, 1u8];
    body.extend_from_slice(&data_addr.to_le_bytes());
    body.extend_from_slice(&data_size.to_le_bytes());
    body
}

/// Wraps a message body in the version-1 header-message frame.
fn message(msg_type: u16, mut body: Vec<u8>) -> Vec<u8> {
    pad_to_8(&mut body);
    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(&msg_type.to_le_bytes());
    out.extend_from_slice(&(body.len() as u16).to_le_bytes());
    out.extend_from_slice(&[0, 0, 0, 0]); // flags, reserved
    out.extend_from_slice(&body);
    out
}

/// Version-1 attribute message body.
fn attribute_body(name: &str, value: &Attr) -> Vec<u8> {
    let (datatype, dataspace, data) = match value {
        Attr::Str(s) => {
            let mut bytes = s.as_bytes().to_vec();
            bytes.push(0);
            (datatype_body(Dtype::Str(bytes.len())), dataspace_body(&[]), bytes)
        }
        Attr::Int(i) => {
            (datatype_body(Dtype::I32), dataspace_body(&[]), i.to_le_bytes().to_vec())
        }
        Attr::IntVec(v) => {
            let mut bytes = Vec::with_capacity(v.len() * 4);
            for i in v {
                bytes.extend_from_slice(&i.to_le_bytes());
            }
            (datatype_body(Dtype::I32), dataspace_body(&[v.len() as u64]), bytes)
        }
    };

    let mut name_bytes = name.as_bytes().to_vec();
    name_bytes.push(0);

    let mut body = vec![1u8, 0u8];
    body.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
    body.extend_from_slice(&(datatype.len() as u16).to_le_bytes());
    body.extend_from_slice(&(dataspace.len() as u16).to_le_bytes());
    pad_to_8(&mut name_bytes);
    body.extend_from_slice(&name_bytes);
    let mut datatype = datatype;
    pad_to_8(&mut datatype);
    body.extend_from_slice(&datatype);
    let mut dataspace = dataspace;
    pad_to_8(&mut dataspace);
    body.extend_from_slice(&dataspace);
    body.extend_from_slice(&data);
    body
}

/// Version-1 object header around already-framed messages.
fn object_header(messages: &[Vec<u8>]) -> Vec<u8> {
    let block: usize = messages.iter().map(|m| m.len()).sum();
    let mut out = Vec::with_capacity(16 + block);
    out.push(1); // version
    out.push(0);
    out.extend_from_slice(&(messages.len() as u16).to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes()); // reference count
    out.extend_from_slice(&(block as u32).to_le_bytes());
    out.extend_from_slice(&[0, 0, 0, 0]); // pad to an 8-byte boundary
    for msg in messages {
        out.extend_from_slice(msg);
    }
    out
}

fn encode_raw(data: &DataVec) -> Result<Vec<u8>, Error> {
    let mut raw = Vec::with_capacity(data.len() * data.dtype().size());
    match data {
        DataVec::F64(values) => {
            for v in values {
                raw.extend_from_slice(&v.to_le_bytes());
            }
        }
        DataVec::I32(values) => {
            for v in values {
                raw.extend_from_slice(&v.to_le_bytes());
            }
        }
        DataVec::U64(values) => {
            for v in values {
                raw.extend_from_slice(&v.to_le_bytes());
            }
        }
        DataVec::Str(values, width) => {
            for v in values {
                if v.len() >= *width {
                    return Err(Error::validation(
                        "Hdf5",
                        format!("String {} does not fit in {} bytes", v, width),
                    ));
                }
                raw.extend_from_slice(v.as_bytes());
                raw.resize(raw.len() + (width - v.len()), 0);
            }
        }
    }
    Ok(raw)
}

fn write_dataset(builder: &mut Builder, data: &DataVec) -> Result<u64, Error> {
    let raw = encode_raw(data)?;
    let data_addr = if raw.is_empty() {
        UNDEF
    } else {
        builder.pad8();
        let addr = builder.addr();
        builder.put(&raw);
        addr
    };

    let messages = vec![
        message(MSG_DATASPACE, dataspace_body(&[data.len() as u64])),
        message(MSG_DATATYPE, datatype_body(data.dtype())),
        message(MSG_LAYOUT, layout_body(data_addr, raw.len() as u64)),
    ];
    builder.pad8();
    let addr = builder.addr();
    builder.put(&object_header(&messages));
    Ok(addr)
}

fn write_group(
    builder: &mut Builder,
    children: &[NodeDef],
    attrs: &[(String, Attr)],
) -> Result<u64, Error> {
    let mut entries: Vec<(String, u64)> = Vec::with_capacity(children.len());
    for child in children {
        let addr = match child {
            NodeDef::Group(group) => write_group(builder, &group.children, &[])?,
            NodeDef::Dataset(dataset) => write_dataset(builder, &dataset.data)?,
        };
        entries.push((child.name().to_string(), addr));
    }
    entries.sort();

    // Local heap: link names, first entry at offset 8
    let mut heap_data = vec![0u8; 8];
    let mut name_offsets: Vec<u64> = Vec::with_capacity(entries.len());
    for (name, _) in &entries {
        name_offsets.push(heap_data.len() as u64);
        heap_data.extend_from_slice(name.as_bytes());
        heap_data.push(0);
        pad_to_8(&mut heap_data);
    }

    builder.pad8();
    let heap_addr = builder.addr();
    builder.put(b"HEAP");
    builder.put(&[0, 0, 0, 0]); // version, reserved
    builder.put_u64(heap_data.len() as u64);
    builder.put_u64(UNDEF); // no free list
    builder.put_u64(heap_addr + 32); // data segment directly after the header
    builder.put(&heap_data);

    builder.pad8();
    let snod_addr = builder.addr();
    builder.put(b"SNOD");
    builder.put(&[1, 0]); // version, reserved
    builder.put_u16(entries.len() as u16);
    for (offset, (_, oh_addr)) in name_offsets.iter().zip(&entries) {
        builder.put_u64(*offset);
        builder.put_u64(*oh_addr);
        builder.put_u32(0); // cache type
        builder.put_u32(0);
        builder.put(&[0u8; 16]); // scratch
    }

    builder.pad8();
    let btree_addr = builder.addr();
    builder.put(b"TREE");
    builder.put(&[0, 0]); // node type (group), node level
    builder.put_u16(1); // one symbol table node
    builder.put_u64(UNDEF);
    builder.put_u64(UNDEF);
    builder.put_u64(0); // key before the first child
    builder.put_u64(snod_addr);
    builder.put_u64(name_offsets.last().copied().unwrap_or(0));

    let mut messages: Vec<Vec<u8>> = attrs
        .iter()
        .map(|(name, value)| message(MSG_ATTRIBUTE, attribute_body(name, value)))
        .collect();
    let mut stab = Vec::with_capacity(16);
    stab.extend_from_slice(&btree_addr.to_le_bytes());
    stab.extend_from_slice(&heap_addr.to_le_bytes());
    messages.push(message(MSG_SYMBOL_TABLE, stab));

    builder.pad8();
    let addr = builder.addr();
    builder.put(&object_header(&messages));
    Ok(addr)
}

/// Writes a file with the given root attributes and members.
pub fn write_file(
    path: &Path,
    root_attrs: Vec<(String, Attr)>,
    children: Vec<NodeDef>,
) -> Result<(), Error> {
    let root = GroupDef { name: String::new(), children };
    let mut builder = Builder { buf: vec![0u8; 96] };
    let root_addr = write_group(&mut builder, &root.children, &root_attrs)?;
    let eof = builder.addr();

    // Patch the version-0 superblock
    let buf = &mut builder.buf;
    buf[0..8].copy_from_slice(&SIGNATURE);
    buf[8] = 0; // superblock version
    buf[9] = 0; // free space version
    buf[10] = 0; // root symbol table version
    buf[11] = 0;
    buf[12] = 0; // shared header message version
    buf[13] = 8; // size of offsets
    buf[14] = 8; // size of lengths
    buf[15] = 0;
    buf[16..18].copy_from_slice(&4u16.to_le_bytes()); // group leaf node k
    buf[18..20].copy_from_slice(&16u16.to_le_bytes()); // group internal node k
    buf[20..24].copy_from_slice(&0u32.to_le_bytes()); // consistency flags
    buf[24..32].copy_from_slice(&0u64.to_le_bytes()); // base address
    buf[32..40].copy_from_slice(&UNDEF.to_le_bytes()); // free space address
    buf[40..48].copy_from_slice(&eof.to_le_bytes()); // end of file
    buf[48..56].copy_from_slice(&UNDEF.to_le_bytes()); // driver info
    buf[56..64].copy_from_slice(&0u64.to_le_bytes()); // root link name offset
    buf[64..72].copy_from_slice(&root_addr.to_le_bytes());
    buf[72..76].copy_from_slice(&0u32.to_le_bytes()); // cache type
    // bytes 76..96 stay zero: reserved and scratch space

    std::fs::write(path, &builder.buf)?;
    Ok(())
}
