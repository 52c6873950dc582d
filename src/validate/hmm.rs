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

//! Profile-HMM validators.
//!
//! Six text formats, one per alphabet and multiplicity: a single-profile
//! format holds exactly one HMMER3 block, a multiple-profile format one or
//! more. Every format declares an alphabet and rejects profiles written in
//! another. The pressed bundle's optional idmap file has its own line-number
//! rule.
//!
//! At `Min` the first three profiles (idmap: the first 100 lines) are
//! examined.

use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use regex::Regex;

use crate::view::hmm::parse_profiles;
use crate::view::hmm::Alphabet;
use crate::Error;
use crate::ValidationLevel;

const IDMAP_FORMAT: &str = "HmmIdmapFormat";

/// Profiles examined at `Min` level.
const MIN_PROFILES: usize = 3;

/// Idmap lines examined per level.
const IDMAP_MIN_LINES: usize = 100;
const IDMAP_MAX_LINES: usize = 10_000_000;

fn validate_profiles(
    format: &str,
    path: &Path,
    level: ValidationLevel,
    alphabet: Alphabet,
    single: bool,
) -> Result<(), Error> {
    log::debug!("validating {:?} as {}", path, format);
    let mut file = std::fs::File::open(path)?;
    let limit = match level {
        ValidationLevel::Min => Some(MIN_PROFILES),
        ValidationLevel::Max => None,
    };
    let profiles = parse_profiles(format, &mut file, limit, true)?;

    if single && profiles.len() != 1 {
        return Err(Error::validation(
            format,
            format!("Expected 1 profile, found {}", profiles.len()),
        ));
    }
    for profile in &profiles {
        if profile.alphabet != alphabet {
            return Err(Error::validation(
                format,
                format!(
                    "Profile {} uses the {} alphabet, but the format requires {}",
                    profile.name, profile.alphabet, alphabet
                ),
            ));
        }
    }
    Ok(())
}

pub fn validate_single_amino(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    validate_profiles("SingleAminoHmmFormat", path, level, Alphabet::Amino, true)
}

pub fn validate_single_dna(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    validate_profiles("SingleDnaHmmFormat", path, level, Alphabet::Dna, true)
}

pub fn validate_single_rna(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    validate_profiles("SingleRnaHmmFormat", path, level, Alphabet::Rna, true)
}

pub fn validate_multiple_amino(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    validate_profiles("MultipleAminoHmmFormat", path, level, Alphabet::Amino, false)
}

pub fn validate_multiple_dna(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    validate_profiles("MultipleDnaHmmFormat", path, level, Alphabet::Dna, false)
}

pub fn validate_multiple_rna(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    validate_profiles("MultipleRnaHmmFormat", path, level, Alphabet::Rna, false)
}

/// Validates the `*.hmm.idmap` file of a pressed bundle: every line matches
/// `<index> <NAME>` and the index on line `i` equals `i`.
pub fn validate_idmap(path: &Path, level: ValidationLevel) -> Result<(), Error> {
    log::debug!("validating {:?} as {}", path, IDMAP_FORMAT);
    let line_re = Regex::new(r"^(\d+) ([A-Z0-9]+)$").unwrap();
    let bound = match level {
        ValidationLevel::Min => IDMAP_MIN_LINES,
        ValidationLevel::Max => IDMAP_MAX_LINES,
    };

    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    for (number, line) in reader.lines().enumerate().take(bound) {
        let line = line?;
        let captures = line_re.captures(&line).ok_or_else(|| {
            Error::validation(
                IDMAP_FORMAT,
                format!("Line {} does not match '<index> <NAME>': '{}'", number + 1, line),
            )
        })?;
        let index = captures[1].parse::<usize>().map_err(|_| {
            Error::validation(IDMAP_FORMAT, format!("Index {} is out of range", &captures[1]))
        })?;
        if index != number + 1 {
            return Err(Error::validation(
                IDMAP_FORMAT,
                format!("Expected index {} but got {} instead.", number + 1, index),
            ));
        }
    }
    Ok(())
}

// Tests
#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::view::hmm::tests::DNA_PROFILE;
    use crate::ValidationLevel;

    fn write(name: &str, content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn single_dna_profile_validates() {
        let (_dir, path) = write("profile.hmm", DNA_PROFILE);
        super::validate_single_dna(&path, ValidationLevel::Min).unwrap();
        super::validate_single_dna(&path, ValidationLevel::Max).unwrap();
    }

    #[test]
    fn alphabet_mismatch_cites_the_declared_alphabet() {
        let (_dir, path) = write("profile.hmm", DNA_PROFILE);
        let err = super::validate_single_amino(&path, ValidationLevel::Max).unwrap_err();
        assert!(err.to_string().contains("amino"));
    }

    #[test]
    fn single_format_rejects_two_profiles() {
        let two = format!("{}{}", DNA_PROFILE, DNA_PROFILE);
        let (_dir, path) = write("profile.hmm", &two);
        let err = super::validate_single_dna(&path, ValidationLevel::Max).unwrap_err();
        assert!(err.to_string().contains("Expected 1 profile, found 2"));

        super::validate_multiple_dna(&path, ValidationLevel::Max).unwrap();
    }

    #[test]
    fn idmap_line_numbering_starts_at_one() {
        let (_dir, path) = write("profiles.hmm.idmap", "2 ABC123\n");
        let err = super::validate_idmap(&path, ValidationLevel::Max).unwrap_err();
        assert!(err.to_string().contains("Expected index 1 but got 2 instead."));
    }

    #[test]
    fn well_formed_idmap_validates() {
        let (_dir, path) = write("profiles.hmm.idmap", "1 ABC123\n2 DEF456\n3 A0\n");
        super::validate_idmap(&path, ValidationLevel::Min).unwrap();
        super::validate_idmap(&path, ValidationLevel::Max).unwrap();
    }

    #[test]
    fn malformed_idmap_lines_are_rejected() {
        let (_dir, path) = write("profiles.hmm.idmap", "1 abc123\n");
        assert!(super::validate_idmap(&path, ValidationLevel::Max).is_err());
    }
}
