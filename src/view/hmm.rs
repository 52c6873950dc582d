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

//! The profile-HMM view and the HMMER3 text parser.
//!
//! Emission and transition values in an HMMER3 file are negative natural log
//! probabilities, with `*` standing for probability zero. Each emission line
//! and each transition group must lie within [SIMPLEX_TOLERANCE] of a
//! probability simplex.

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use crate::Error;

/// Allowed deviation of a probability row from summing to one.
pub const SIMPLEX_TOLERANCE: f64 = 1e-4;

/// The residue alphabet of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    Amino,
    Dna,
    Rna,
}

impl Alphabet {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alphabet::Amino => "amino",
            Alphabet::Dna => "dna",
            Alphabet::Rna => "rna",
        }
    }

    /// The number of residue symbols, and so the emission-line width.
    pub fn size(&self) -> usize {
        match self {
            Alphabet::Amino => 20,
            Alphabet::Dna => 4,
            Alphabet::Rna => 4,
        }
    }

    fn from_header(token: &str) -> Option<Alphabet> {
        match token.to_lowercase().as_str() {
            "amino" => Some(Alphabet::Amino),
            "dna" => Some(Alphabet::Dna),
            "rna" => Some(Alphabet::Rna),
            _ => None,
        }
    }
}

impl std::fmt::Display for Alphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One parsed profile block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HmmProfile {
    pub name: String,
    pub alphabet: Alphabet,
    pub length: usize,
}

/// A profile-HMM file: the parsed profiles plus the verbatim text, so that
/// writing the view back reproduces the input byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub struct HmmFile {
    pub profiles: Vec<HmmProfile>,
    pub text: String,
}

impl HmmFile {
    pub fn from_text(format: &str, text: String) -> Result<Self, Error> {
        let profiles = parse_profiles(format, &mut text.as_bytes(), None, true)?;
        Ok(HmmFile { profiles, text })
    }

    pub fn read_text(format: &str, path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_text(format, text)
    }

    pub fn to_text<W: Write>(&self, conn: &mut W) -> Result<(), Error> {
        conn.write_all(self.text.as_bytes())?;
        Ok(())
    }

    pub fn write_text(&self, path: &Path) -> Result<(), Error> {
        let mut file = std::fs::File::create(path)?;
        self.to_text(&mut file)
    }
}

/// A negative-log probability token: a float or `*` for probability zero.
fn probability(format: &str, token: &str) -> Result<f64, Error> {
    if token == "*" {
        return Ok(0.0);
    }
    let neg_log = token.parse::<f64>().map_err(|_| {
        Error::validation(format, format!("Could not parse {} as a log probability", token))
    })?;
    Ok((-neg_log).exp())
}

fn check_simplex(format: &str, name: &str, what: &str, probs: &[f64]) -> Result<(), Error> {
    let sum: f64 = probs.iter().sum();
    if (sum - 1.0).abs() > SIMPLEX_TOLERANCE {
        return Err(Error::validation(
            format,
            format!(
                "Profile {}: {} probabilities sum to {} instead of 1",
                name, what, sum
            ),
        ));
    }
    Ok(())
}

/// Parses HMMER3 profile blocks from `conn`.
///
/// Stops after `limit` profiles when given. With `check` set, every emission
/// line and transition group is checked against the simplex constraint.
pub fn parse_profiles<R: Read>(
    format: &str,
    conn: &mut R,
    limit: Option<usize>,
    check: bool,
) -> Result<Vec<HmmProfile>, Error> {
    let reader = BufReader::new(conn);
    let mut lines = reader.lines();
    let mut profiles: Vec<HmmProfile> = Vec::new();

    'profiles: loop {
        if let Some(limit) = limit {
            if profiles.len() == limit {
                break;
            }
        }

        // Profile header line
        let header = loop {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => break 'profiles,
            }
        };
        if !header.starts_with("HMMER3/") {
            return Err(Error::validation(
                format,
                format!("Expected an HMMER3 header line, found '{}'", header),
            ));
        }

        // Key-value pairs up to the HMM symbol line
        let mut name: Option<String> = None;
        let mut length: Option<usize> = None;
        let mut alphabet: Option<Alphabet> = None;
        let symbols = loop {
            let line = match lines.next() {
                Some(line) => line?,
                None => return Err(Error::validation(format, "Unexpected end of file in a profile header")),
            };
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some("NAME") => name = tokens.next().map(|s| s.to_string()),
                Some("LENG") => {
                    let token = tokens.next().unwrap_or_default();
                    length = Some(token.parse::<usize>().map_err(|_| {
                        Error::validation(format, format!("Could not parse LENG value {}", token))
                    })?);
                }
                Some("ALPH") => {
                    let token = tokens.next().unwrap_or_default();
                    alphabet = Some(Alphabet::from_header(token).ok_or_else(|| {
                        Error::validation(format, format!("Unknown alphabet {}", token))
                    })?);
                }
                Some("HMM") => break tokens.count(),
                Some(_) => {}
                None => {}
            }
        };

        let name = name.ok_or_else(|| Error::validation(format, "A profile is missing its NAME"))?;
        let length = length.ok_or_else(|| {
            Error::validation(format, format!("Profile {} is missing LENG", name))
        })?;
        let alphabet = alphabet.ok_or_else(|| {
            Error::validation(format, format!("Profile {} is missing ALPH", name))
        })?;
        let k = alphabet.size();
        if symbols != k {
            return Err(Error::validation(
                format,
                format!(
                    "Profile {}: the {} alphabet has {} symbols but the HMM line lists {}",
                    name, alphabet, k, symbols
                ),
            ));
        }

        // Transition order line
        match lines.next() {
            Some(line) => {
                let line = line?;
                if !line.trim_start().starts_with("m->m") {
                    return Err(Error::validation(
                        format,
                        format!("Profile {}: expected the transition order line", name),
                    ));
                }
            }
            None => return Err(Error::validation(format, "Unexpected end of file after the HMM line")),
        }

        // Model lines through the closing '//'
        let mut nodes = 0usize;
        loop {
            let line = match lines.next() {
                Some(line) => line?,
                None => {
                    return Err(Error::validation(
                        format,
                        format!("Profile {} is not terminated by //", name),
                    ))
                }
            };
            let trimmed = line.trim();
            if trimmed == "//" {
                break;
            }
            let tokens: Vec<&str> = trimmed.split_whitespace().collect();
            if tokens.is_empty() {
                continue;
            }
            if tokens[0] == "COMPO" {
                // Average residue composition, informational only
                continue;
            }
            if let Ok(node) = tokens[0].parse::<usize>() {
                // Match emission line: node index, K emissions, annotations
                if node != nodes + 1 {
                    return Err(Error::validation(
                        format,
                        format!("Profile {}: node {} follows node {}", name, node, nodes),
                    ));
                }
                nodes = node;
                if tokens.len() < k + 1 {
                    return Err(Error::validation(
                        format,
                        format!("Profile {}: match emission line for node {} is too short", name, node),
                    ));
                }
                if check {
                    let probs = tokens[1..=k]
                        .iter()
                        .map(|t| probability(format, t))
                        .collect::<Result<Vec<f64>, Error>>()?;
                    check_simplex(format, &name, "match emission", &probs)?;
                }
            } else if tokens.len() == k {
                // Insert emission line
                if check {
                    let probs = tokens
                        .iter()
                        .map(|t| probability(format, t))
                        .collect::<Result<Vec<f64>, Error>>()?;
                    check_simplex(format, &name, "insert emission", &probs)?;
                }
            } else if tokens.len() == 7 {
                // Transition line: (m->m m->i m->d) (i->m i->i) (d->m d->d)
                if check {
                    let probs = tokens
                        .iter()
                        .map(|t| probability(format, t))
                        .collect::<Result<Vec<f64>, Error>>()?;
                    check_simplex(format, &name, "match transition", &probs[0..3])?;
                    check_simplex(format, &name, "insert transition", &probs[3..5])?;
                    check_simplex(format, &name, "delete transition", &probs[5..7])?;
                }
            } else {
                return Err(Error::validation(
                    format,
                    format!("Profile {}: unexpected line '{}'", name, trimmed),
                ));
            }
        }

        if nodes != length {
            return Err(Error::validation(
                format,
                format!("Profile {} declares LENG {} but has {} nodes", name, length, nodes),
            ));
        }
        profiles.push(HmmProfile { name, alphabet, length });
    }

    if profiles.is_empty() {
        return Err(Error::validation(format, "The file contains no profiles"));
    }
    Ok(profiles)
}

// Tests
#[cfg(test)]
pub(crate) mod tests {

    /// A well-formed single DNA profile with two nodes.
    pub(crate) const DNA_PROFILE: &str = "\
HMMER3/f [3.1b2 | February 2015]
NAME  test-dna
LENG  2
ALPH  DNA
HMM          A        C        G        T
            m->m     m->i     m->d     i->m     i->i     d->m     d->d
  COMPO   1.38629  1.38629  1.38629  1.38629
          1.38629  1.38629  1.38629  1.38629
          0.01005  5.29832  5.29832  0.69315  0.69315  0.69315  0.69315
      1   0.10536  2.99573  3.68888  3.68888
          1.38629  1.38629  1.38629  1.38629
          0.01005  5.29832  5.29832  0.69315  0.69315  0.69315  0.69315
      2   3.68888  0.10536  2.99573  3.68888
          1.38629  1.38629  1.38629  1.38629
          0.01005  5.29832  5.29832  0.69315  0.69315  0.69315  0.69315
//
";

    #[test]
    fn single_dna_profile_parses() {
        use super::parse_profiles;
        use super::Alphabet;

        let profiles =
            parse_profiles("HmmFormat", &mut DNA_PROFILE.as_bytes(), None, true).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, "test-dna");
        assert_eq!(profiles[0].alphabet, Alphabet::Dna);
        assert_eq!(profiles[0].length, 2);
    }

    #[test]
    fn profile_limit_is_honored() {
        use super::parse_profiles;

        let two = format!("{}{}", DNA_PROFILE, DNA_PROFILE);
        let all = parse_profiles("HmmFormat", &mut two.as_bytes(), None, true).unwrap();
        assert_eq!(all.len(), 2);

        let first = parse_profiles("HmmFormat", &mut two.as_bytes(), Some(1), true).unwrap();
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn broken_simplex_is_rejected() {
        use super::parse_profiles;

        // First match emission line scaled away from a valid simplex
        let broken = DNA_PROFILE.replace("      1   0.10536", "      1   1.10536");
        let err =
            parse_profiles("HmmFormat", &mut broken.as_bytes(), None, true).unwrap_err();
        assert!(err.to_string().contains("match emission"));
    }

    #[test]
    fn leng_mismatch_is_rejected() {
        use super::parse_profiles;

        let broken = DNA_PROFILE.replace("LENG  2", "LENG  3");
        assert!(parse_profiles("HmmFormat", &mut broken.as_bytes(), None, true).is_err());
    }

    #[test]
    fn non_hmm_payload_is_rejected() {
        use super::parse_profiles;

        let err = parse_profiles("HmmFormat", &mut "not a profile\n".as_bytes(), None, true)
            .unwrap_err();
        assert!(err.to_string().contains("HMMER3"));
    }

    #[test]
    fn view_round_trips_verbatim() {
        use super::HmmFile;
        use std::io::Cursor;

        let hmm = HmmFile::from_text("HmmFormat", DNA_PROFILE.to_string()).unwrap();
        let mut bytes: Cursor<Vec<u8>> = Cursor::new(Vec::new());
        hmm.to_text(&mut bytes).unwrap();
        assert_eq!(String::from_utf8(bytes.into_inner()).unwrap(), DNA_PROFILE);
    }
}
