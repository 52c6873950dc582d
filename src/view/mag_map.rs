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

//! The MAG-to-contigs mapping view and its JSON representation.
//!
//! The payload is one JSON object whose keys are UUIDv4 MAG identifiers and
//! whose values are non-empty lists of contig identifiers.

use std::io::Read;
use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::Error;

const FORMAT: &str = "MAGtoContigsFormat";

/// Maps each metagenome-assembled genome to the contigs it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MagToContigs {
    map: IndexMap<Uuid, Vec<String>>,
}

impl MagToContigs {
    pub fn new() -> Self {
        MagToContigs::default()
    }

    /// Adds a MAG and its contigs.
    ///
    /// ## Errors
    ///
    /// The contig list must not be empty.
    pub fn insert(&mut self, mag: Uuid, contigs: Vec<String>) -> Result<(), Error> {
        if contigs.is_empty() {
            return Err(Error::validation(
                FORMAT,
                format!("The list of contigs for MAG \"{}\" is empty.", mag),
            ));
        }
        self.map.insert(mag, contigs);
        Ok(())
    }

    pub fn get(&self, mag: &Uuid) -> Option<&[String]> {
        self.map.get(mag).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Uuid, &Vec<String>)> {
        self.map.iter()
    }

    /// Reads the JSON mapping, rejecting malformed keys and values with the
    /// same rules the format validator applies.
    pub fn from_json<R: Read>(conn: &mut R) -> Result<Self, Error> {
        let value: serde_json::Value = serde_json::from_reader(conn)?;
        let object = value.as_object().ok_or_else(|| {
            Error::validation(FORMAT, "The top-level JSON value must be an object")
        })?;

        let mut map = MagToContigs::new();
        for (key, contigs) in object {
            let mag = parse_mag_id(FORMAT, key)?;
            let contigs = contigs_list(FORMAT, key, contigs)?;
            map.insert(mag, contigs)?;
        }
        Ok(map)
    }

    pub fn read_json(path: &Path) -> Result<Self, Error> {
        let mut file = std::fs::File::open(path)?;
        Self::from_json(&mut file)
    }

    pub fn to_json<W: Write>(&self, conn: &mut W) -> Result<(), Error> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .map
            .iter()
            .map(|(mag, contigs)| {
                (
                    mag.to_string(),
                    serde_json::Value::Array(
                        contigs.iter().cloned().map(serde_json::Value::String).collect(),
                    ),
                )
            })
            .collect();
        serde_json::to_writer_pretty(conn, &serde_json::Value::Object(object))?;
        Ok(())
    }

    pub fn write_json(&self, path: &Path) -> Result<(), Error> {
        let mut file = std::fs::File::create(path)?;
        self.to_json(&mut file)
    }
}

/// Parses a MAG identifier, requiring a UUIDv4.
pub(crate) fn parse_mag_id(format: &str, key: &str) -> Result<Uuid, Error> {
    let invalid = || Error::validation(format, format!("Found \"{}\", which is invalid.", key));
    let uuid = Uuid::parse_str(key).map_err(|_| invalid())?;
    if uuid.get_version_num() != 4 {
        return Err(invalid());
    }
    Ok(uuid)
}

/// Extracts the contig list for a MAG, producing the format's normative
/// failure messages.
pub(crate) fn contigs_list(
    format: &str,
    key: &str,
    value: &serde_json::Value,
) -> Result<Vec<String>, Error> {
    let json_type = match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Object(_) => "object",
        serde_json::Value::Array(items) => {
            if items.is_empty() {
                return Err(Error::validation(
                    format,
                    format!("The list of contigs for MAG \"{}\" is empty.", key),
                ));
            }
            let mut contigs = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    serde_json::Value::String(s) => contigs.push(s.clone()),
                    _ => {
                        return Err(Error::validation(
                            format,
                            format!("The contigs of MAG \"{}\" must be strings.", key),
                        ))
                    }
                }
            }
            return Ok(contigs);
        }
    };
    Err(Error::validation(
        format,
        format!("Found \"{}\" for MAG \"{}\".", json_type, key),
    ))
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn json_round_trip() {
        use super::MagToContigs;
        use std::io::Cursor;
        use uuid::Uuid;

        let mut map = MagToContigs::new();
        let mag = Uuid::parse_str("6232c7e1-8ed7-47c8-9bdb-b94706a26931").unwrap();
        map.insert(mag, vec!["contig-1".to_string(), "contig-2".to_string()]).unwrap();

        let mut bytes: Cursor<Vec<u8>> = Cursor::new(Vec::new());
        map.to_json(&mut bytes).unwrap();

        let mut input = Cursor::new(bytes.into_inner());
        let got = MagToContigs::from_json(&mut input).unwrap();
        assert_eq!(got, map);
        assert_eq!(got.get(&mag).unwrap(), ["contig-1", "contig-2"]);
    }

    #[test]
    fn empty_contig_lists_are_rejected() {
        use super::MagToContigs;
        use std::io::Cursor;

        let data: Vec<u8> =
            br#"{ "6232c7e1-8ed7-47c8-9bdb-b94706a26931": [] }"#.to_vec();
        let err = MagToContigs::from_json(&mut Cursor::new(data)).unwrap_err();
        assert!(err
            .to_string()
            .contains("MAG \"6232c7e1-8ed7-47c8-9bdb-b94706a26931\" is empty."));
    }

    #[test]
    fn truncated_uuid_keys_are_rejected() {
        use super::MagToContigs;
        use std::io::Cursor;

        let data: Vec<u8> = br#"{ "6232c7e1": ["contig-1"] }"#.to_vec();
        let err = MagToContigs::from_json(&mut Cursor::new(data)).unwrap_err();
        assert!(err.to_string().contains("Found \"6232c7e1\", which is invalid."));
    }

    #[test]
    fn non_v4_uuid_keys_are_rejected() {
        use super::parse_mag_id;

        // A valid UUID, but version 1
        let err = parse_mag_id("MAGtoContigsFormat", "4930b79a-8ab2-11ee-b9d1-0242ac120002")
            .unwrap_err();
        assert!(err.to_string().contains("which is invalid."));
    }

    #[test]
    fn non_list_values_name_the_json_type() {
        use super::MagToContigs;
        use std::io::Cursor;

        let data: Vec<u8> =
            br#"{ "6232c7e1-8ed7-47c8-9bdb-b94706a26931": "contig-1" }"#.to_vec();
        let err = MagToContigs::from_json(&mut Cursor::new(data)).unwrap_err();
        assert!(err
            .to_string()
            .contains("Found \"string\" for MAG \"6232c7e1-8ed7-47c8-9bdb-b94706a26931\"."));
    }
}
