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

//! Per-format body validators.
//!
//! Every validator has the [BodyValidator](crate::format::BodyValidator)
//! shape: it reads the file at the given path and either returns or fails
//! with a message naming the violated rule. At
//! [Min](crate::ValidationLevel::Min) only a bounded prefix of the payload is
//! examined; at [Max](crate::ValidationLevel::Max) the whole payload.

pub mod biom;
pub mod hmm;
pub mod kraken2;
pub mod lsmat;
pub mod mag_to_contigs;
pub mod metadata;
pub mod newick;
pub mod ordination;

use std::io::Read;
use std::path::Path;

use crate::Error;

/// Reads up to `len` leading bytes for magic sniffing.
pub(crate) fn magic(path: &Path, len: usize) -> Result<Vec<u8>, Error> {
    let mut file = std::fs::File::open(path)?;
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
}
