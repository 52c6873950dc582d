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

//! The on-disk format model.
//!
//! A format is either a file-format leaf (a single text or binary body with a
//! per-level validator) or a directory format: a named container listing the
//! files a payload directory must hold. Directory members come in two shapes:
//!
//!   - *named files*: a filename regex that must match exactly one entry
//!     (or none, when optional);
//!   - *file collections*: a regex matching zero or more entries, each kept
//!     with an identifier derived from its filename; new members are written
//!     through the collection's path-maker, readers use the regex only.
//!
//! [BoundDirectory] binds a directory format to a concrete payload root and
//! runs the validation contract at a requested [ValidationLevel].

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use regex::Regex;

use crate::Error;
use crate::ValidationLevel;

/// Whether a file body is line-oriented text or opaque bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Text,
    Binary,
}

/// Validates one file body at the given effort level.
pub type BodyValidator = fn(&Path, ValidationLevel) -> Result<(), Error>;

/// Validates a whole payload directory; directory formats may install one of
/// these to check constraints that span files.
pub type DirectoryValidator = fn(&Path, ValidationLevel) -> Result<(), Error>;

/// Maps member identifiers to the relative path a new collection member
/// should be written to.
pub type PathMaker = fn(sample_id: &str, mag_id: Option<&str>) -> PathBuf;

/// A file-format leaf: one body with a name, a kind, and a validator.
#[derive(Debug, Clone, Copy)]
pub struct FileFormatDef {
    pub name: &'static str,
    pub kind: BodyKind,
    pub validate: BodyValidator,
}

impl FileFormatDef {
    pub const fn new(name: &'static str, kind: BodyKind, validate: BodyValidator) -> Self {
        FileFormatDef { name, kind, validate }
    }
}

/// Accepts any body. Used for members recognised by filename only, eg. the
/// Kraken2 `.k2d` files.
pub fn any_body(_path: &Path, _level: ValidationLevel) -> Result<(), Error> {
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NamedFile {
    pub pattern: String,
    regex: Regex,
    pub format: FileFormatDef,
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub struct FileCollection {
    pub pattern: String,
    regex: Regex,
    pub format: FileFormatDef,
    pub path_maker: PathMaker,
}

/// A directory format: named files, file collections, and an optional
/// container-level validation hook.
#[derive(Debug, Clone)]
pub struct DirectoryFormatDef {
    pub name: &'static str,
    pub files: Vec<NamedFile>,
    pub collections: Vec<FileCollection>,
    pub validate_hook: Option<DirectoryValidator>,
}

// Filename patterns match the full path relative to the payload root, with
// `/` separators on every platform.
fn anchored(pattern: &str) -> Result<Regex, Error> {
    Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| Error::registration(format!("Invalid filename pattern {}: {}", pattern, e)))
}

impl DirectoryFormatDef {
    pub fn new(name: &'static str) -> Self {
        DirectoryFormatDef { name, files: Vec::new(), collections: Vec::new(), validate_hook: None }
    }

    /// Wraps one body under a fixed filename.
    pub fn single_file(
        name: &'static str,
        filename: &str,
        format: FileFormatDef,
    ) -> Result<Self, Error> {
        Self::new(name).named_file(&regex::escape(filename), format, false)
    }

    /// Adds a named file: `pattern` must match exactly one entry, or none
    /// when `optional` is set.
    pub fn named_file(
        mut self,
        pattern: &str,
        format: FileFormatDef,
        optional: bool,
    ) -> Result<Self, Error> {
        let regex = anchored(pattern)?;
        self.files.push(NamedFile { pattern: pattern.to_string(), regex, format, optional });
        Ok(self)
    }

    /// Adds a file collection: `pattern` may match any number of entries.
    pub fn collection(
        mut self,
        pattern: &str,
        format: FileFormatDef,
        path_maker: PathMaker,
    ) -> Result<Self, Error> {
        let regex = anchored(pattern)?;
        self.collections.push(FileCollection {
            pattern: pattern.to_string(),
            regex,
            format,
            path_maker,
        });
        Ok(self)
    }

    pub fn validate_hook(mut self, hook: DirectoryValidator) -> Self {
        self.validate_hook = Some(hook);
        self
    }
}

/// A directory format bound to a concrete payload root. Short-lived: bind,
/// validate, then transform or release.
#[derive(Debug, Clone)]
pub struct BoundDirectory<'a> {
    def: &'a DirectoryFormatDef,
    root: PathBuf,
}

impl<'a> BoundDirectory<'a> {
    pub fn new(def: &'a DirectoryFormatDef, root: impl Into<PathBuf>) -> Self {
        BoundDirectory { def, root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Runs the validation contract:
    ///
    /// 1. every non-optional named file matches exactly one entry,
    /// 2. collection members are enumerated,
    /// 3. every matched body's validator runs at `level`,
    /// 4. the container's own hook runs last.
    ///
    /// ## Errors
    ///
    /// `Missing one or more files: <pattern>` when a mandatory named file has
    /// no match, `Duplicate file: <pattern>` when it has several, plus
    /// whatever the body validators and the hook report.
    pub fn validate(&self, level: ValidationLevel) -> Result<(), Error> {
        log::debug!("validating {} at {:?}", self.def.name, self.root);
        let entries = walk_files(&self.root)?;

        for named in &self.def.files {
            let matches: Vec<&String> =
                entries.iter().filter(|p| named.regex.is_match(p)).collect();
            match matches.len() {
                0 if named.optional => {}
                0 => {
                    return Err(Error::validation(
                        self.def.name,
                        format!("Missing one or more files: {}", named.pattern),
                    ))
                }
                1 => (named.format.validate)(&self.root.join(matches[0]), level)?,
                _ => {
                    return Err(Error::validation(
                        self.def.name,
                        format!("Duplicate file: {}", named.pattern),
                    ))
                }
            }
        }

        for collection in &self.def.collections {
            for member in entries.iter().filter(|p| collection.regex.is_match(p)) {
                (collection.format.validate)(&self.root.join(member), level)?;
            }
        }

        if let Some(hook) = self.def.validate_hook {
            hook(&self.root, level)?;
        }
        Ok(())
    }

    /// Relative paths of the members of collection `index`, in lexicographic
    /// order.
    pub fn collection_members(&self, index: usize) -> Result<Vec<String>, Error> {
        let collection = &self.def.collections[index];
        Ok(walk_files(&self.root)?
            .into_iter()
            .filter(|p| collection.regex.is_match(p))
            .collect())
    }
}

/// Every file under `root`, as `/`-separated paths relative to `root`, in
/// lexicographic order.
pub fn walk_files(root: &Path) -> Result<Vec<String>, Error> {
    let mut found = Vec::new();
    let mut stack = vec![PathBuf::new()];
    while let Some(rel) = stack.pop() {
        let dir = root.join(&rel);
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let child = rel.join(entry.file_name());
            if entry.file_type()?.is_dir() {
                stack.push(child);
            } else {
                let as_string = child
                    .iter()
                    .map(|part| part.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                found.push(as_string);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Member maps derived from a payload directory by [file_dict].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDict {
    /// `identifier -> path` for a flat directory.
    Flat(BTreeMap<String, PathBuf>),
    /// `sub-directory -> identifier -> path` when the payload nests one level
    /// of sub-directories.
    Nested(BTreeMap<String, BTreeMap<String, PathBuf>>),
}

/// Derives the identifier for a file: the stem of its filename, with the
/// first matching suffix from `suffixes` stripped.
pub fn derived_identifier(path: &Path, suffixes: &[&str]) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    for suffix in suffixes {
        if let Some(stripped) = stem.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    stem
}

/// Enumerates a payload directory into identifier maps.
///
/// When `root` holds sub-directories the first level of keys is the
/// sub-directory name and the inner map is `identifier -> path`; plain files
/// directly under `root` are not included in that case. Both levels are in
/// lexicographic order.
pub fn file_dict(root: &Path, suffixes: &[&str]) -> Result<FileDict, Error> {
    let mut subdirs: Vec<PathBuf> = Vec::new();
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            subdirs.push(entry.path());
        } else {
            files.push(entry.path());
        }
    }

    if subdirs.is_empty() {
        let mut flat = BTreeMap::new();
        for path in files {
            flat.insert(derived_identifier(&path, suffixes), path);
        }
        return Ok(FileDict::Flat(flat));
    }

    let mut nested = BTreeMap::new();
    for dir in subdirs {
        let key = dir
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut inner = BTreeMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                inner.insert(derived_identifier(&entry.path(), suffixes), entry.path());
            }
        }
        nested.insert(key, inner);
    }
    Ok(FileDict::Nested(nested))
}
