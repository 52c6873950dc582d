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

//! The semantic-type lattice.
//!
//! A semantic type names what a payload means, independent of its file
//! layout. Types are built from constructors declared with zero or more
//! ordered field parameters; each field admits a declared set of variants.
//! The lattice is closed: only declared constructors and variants inhabit it.
//!
//! ## Usage
//!
//! ```rust
//! use leima::semantic::TypeLattice;
//!
//! let mut lattice = TypeLattice::new();
//! lattice.declare("Phylogeny", &["kind"]).unwrap();
//! lattice.variant("Rooted", "Phylogeny", "kind").unwrap();
//! lattice.variant("Unrooted", "Phylogeny", "kind").unwrap();
//!
//! let rooted = lattice.apply("Phylogeny", &["Rooted"]).unwrap();
//! assert_eq!(rooted.to_string(), "Phylogeny[Rooted]");
//!
//! // Undeclared variants are rejected
//! assert!(lattice.apply("Phylogeny", &["Ladderized"]).is_err());
//! ```

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::Error;

/// A declared type constructor: an ordered list of field-parameter names and,
/// per field, the set of admissible variant names.
#[derive(Debug, Clone)]
struct Constructor {
    fields: Vec<String>,
    variants: Vec<BTreeSet<String>>,
}

/// A fully specified semantic type: a constructor with one variant per field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SemanticType {
    constructor: String,
    args: Vec<String>,
}

impl SemanticType {
    pub fn constructor(&self) -> &str {
        &self.constructor
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.constructor)
        } else {
            write!(f, "{}[{}]", self.constructor, self.args.join(", "))
        }
    }
}

/// A type expression: a single fully specified type, or an unordered union of
/// fully specified types sharing one constructor.
///
/// Unions compare by set equality. A union of one member collapses to the
/// member, so `union([t]) == t.into()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Single(SemanticType),
    Union(BTreeSet<SemanticType>),
}

impl TypeExpr {
    /// Builds a union of fully specified types.
    ///
    /// ## Errors
    ///
    /// Unions over mixed constructors and empty unions are rejected.
    pub fn union(members: impl IntoIterator<Item = SemanticType>) -> Result<TypeExpr, Error> {
        let set: BTreeSet<SemanticType> = members.into_iter().collect();
        let mut constructors = set.iter().map(|t| t.constructor().to_string());
        match constructors.next() {
            None => Err(Error::registration("A union must have at least one member")),
            Some(first) => {
                if let Some(other) = constructors.find(|c| *c != first) {
                    return Err(Error::registration(format!(
                        "Cannot union types with different constructors: {} and {}",
                        first, other
                    )));
                }
                if set.len() == 1 {
                    // A union of one collapses to its member
                    Ok(TypeExpr::Single(set.into_iter().next().unwrap()))
                } else {
                    Ok(TypeExpr::Union(set))
                }
            }
        }
    }

    /// Iterates over the fully specified members, singles included.
    pub fn members(&self) -> impl Iterator<Item = &SemanticType> {
        match self {
            TypeExpr::Single(t) => Members::Single(std::iter::once(t)),
            TypeExpr::Union(set) => Members::Union(set.iter()),
        }
    }
}

enum Members<'a> {
    Single(std::iter::Once<&'a SemanticType>),
    Union(std::collections::btree_set::Iter<'a, SemanticType>),
}

impl<'a> Iterator for Members<'a> {
    type Item = &'a SemanticType;

    fn next(&mut self) -> Option<&'a SemanticType> {
        match self {
            Members::Single(iter) => iter.next(),
            Members::Union(iter) => iter.next(),
        }
    }
}

impl From<SemanticType> for TypeExpr {
    fn from(t: SemanticType) -> TypeExpr {
        TypeExpr::Single(t)
    }
}

impl std::fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let parts: Vec<String> = self.members().map(|t| t.to_string()).collect();
        write!(f, "{}", parts.join(" | "))
    }
}

/// The lattice of declared constructors and their variants.
#[derive(Debug, Clone, Default)]
pub struct TypeLattice {
    constructors: IndexMap<String, Constructor>,
}

impl TypeLattice {
    pub fn new() -> Self {
        TypeLattice::default()
    }

    /// Declares a type constructor with the given ordered field parameters.
    ///
    /// ## Errors
    ///
    /// Declaring the same constructor name twice is an error.
    pub fn declare(&mut self, name: &str, fields: &[&str]) -> Result<(), Error> {
        if self.constructors.contains_key(name) {
            return Err(Error::registration(format!(
                "Constructor {} is already declared", name
            )));
        }
        log::debug!("declaring semantic type constructor {name}");
        let constructor = Constructor {
            fields: fields.iter().map(|s| s.to_string()).collect(),
            variants: vec![BTreeSet::new(); fields.len()],
        };
        self.constructors.insert(name.to_string(), constructor);
        Ok(())
    }

    /// Registers `name` as an admissible variant of `field` on `constructor`.
    pub fn variant(&mut self, name: &str, constructor: &str, field: &str) -> Result<(), Error> {
        let ctor = self.constructors.get_mut(constructor).ok_or_else(|| {
            Error::registration(format!("Unknown constructor {}", constructor))
        })?;
        let idx = ctor.fields.iter().position(|f| f == field).ok_or_else(|| {
            Error::registration(format!(
                "Constructor {} has no field {}", constructor, field
            ))
        })?;
        ctor.variants[idx].insert(name.to_string());
        Ok(())
    }

    /// Builds a fully specified type from a constructor and one variant per
    /// field. A zero-field constructor is applied with an empty argument list.
    ///
    /// ## Errors
    ///
    /// Fails when the arity does not match the declaration or when any
    /// argument was not declared a variant of the corresponding field.
    pub fn apply(&self, constructor: &str, args: &[&str]) -> Result<SemanticType, Error> {
        let ctor = self.constructors.get(constructor).ok_or_else(|| {
            Error::registration(format!("Unknown constructor {}", constructor))
        })?;
        if args.len() != ctor.fields.len() {
            return Err(Error::registration(format!(
                "Constructor {} takes {} field(s) but {} were supplied",
                constructor,
                ctor.fields.len(),
                args.len()
            )));
        }
        for (idx, arg) in args.iter().enumerate() {
            if !ctor.variants[idx].contains(*arg) {
                return Err(Error::registration(format!(
                    "{} is not a declared variant of field {} on {}",
                    arg, ctor.fields[idx], constructor
                )));
            }
        }
        Ok(SemanticType {
            constructor: constructor.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Whether `constructor` has been declared.
    pub fn is_declared(&self, constructor: &str) -> bool {
        self.constructors.contains_key(constructor)
    }

    /// The declared variants of a field, in lexicographic order.
    pub fn variants_of(&self, constructor: &str, field: &str) -> Option<Vec<&str>> {
        let ctor = self.constructors.get(constructor)?;
        let idx = ctor.fields.iter().position(|f| f == field)?;
        Some(ctor.variants[idx].iter().map(|s| s.as_str()).collect())
    }
}

// Tests
#[cfg(test)]
mod tests {
    use super::TypeExpr;
    use super::TypeLattice;

    fn hmm_lattice() -> TypeLattice {
        let mut lattice = TypeLattice::new();
        lattice.declare("ProfileHMM", &["type"]).unwrap();
        for variant in [
            "SingleAmino", "SingleDNA", "SingleRNA",
            "MultipleAmino", "MultipleDNA", "MultipleRNA",
            "MultipleAminoPressed", "MultipleDNAPressed", "MultipleRNAPressed",
        ] {
            lattice.variant(variant, "ProfileHMM", "type").unwrap();
        }
        lattice
    }

    #[test]
    fn bare_constructor_has_no_brackets() {
        let mut lattice = TypeLattice::new();
        lattice.declare("DistanceMatrix", &[]).unwrap();

        let t = lattice.apply("DistanceMatrix", &[]).unwrap();
        assert_eq!(t.to_string(), "DistanceMatrix");
    }

    #[test]
    fn duplicate_constructor_is_rejected() {
        let mut lattice = TypeLattice::new();
        lattice.declare("Hierarchy", &[]).unwrap();
        assert!(lattice.declare("Hierarchy", &[]).is_err());
    }

    #[test]
    fn nine_hmm_variants_apply() {
        let lattice = hmm_lattice();
        let t = lattice.apply("ProfileHMM", &["MultipleDNAPressed"]).unwrap();
        assert_eq!(t.to_string(), "ProfileHMM[MultipleDNAPressed]");
    }

    #[test]
    fn declared_variants_are_listed_in_order() {
        let lattice = hmm_lattice();
        assert!(lattice.is_declared("ProfileHMM"));
        assert!(!lattice.is_declared("Phylogeny"));

        let variants = lattice.variants_of("ProfileHMM", "type").unwrap();
        assert_eq!(variants.len(), 9);
        assert_eq!(variants[0], "MultipleAmino");
        assert!(lattice.variants_of("ProfileHMM", "alphabet").is_none());
    }

    #[test]
    fn undeclared_variant_is_rejected() {
        let lattice = hmm_lattice();
        assert!(lattice.apply("ProfileHMM", &["PairRNA"]).is_err());
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let lattice = hmm_lattice();
        assert!(lattice.apply("ProfileHMM", &[]).is_err());
        assert!(lattice.apply("ProfileHMM", &["SingleAmino", "SingleDNA"]).is_err());
    }

    #[test]
    fn equality_is_structural() {
        let lattice = hmm_lattice();
        let a = lattice.apply("ProfileHMM", &["SingleAmino"]).unwrap();
        let b = lattice.apply("ProfileHMM", &["SingleAmino"]).unwrap();
        let c = lattice.apply("ProfileHMM", &["SingleRNA"]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn union_of_one_collapses() {
        let lattice = hmm_lattice();
        let t = lattice.apply("ProfileHMM", &["SingleAmino"]).unwrap();
        let expr = TypeExpr::union([t.clone()]).unwrap();
        assert_eq!(expr, TypeExpr::Single(t));
    }

    #[test]
    fn union_is_unordered() {
        let lattice = hmm_lattice();
        let a = lattice.apply("ProfileHMM", &["SingleAmino"]).unwrap();
        let b = lattice.apply("ProfileHMM", &["SingleDNA"]).unwrap();

        let ab = TypeExpr::union([a.clone(), b.clone()]).unwrap();
        let ba = TypeExpr::union([b, a]).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.members().count(), 2);
    }

    #[test]
    fn union_over_mixed_constructors_is_rejected() {
        let mut lattice = hmm_lattice();
        lattice.declare("Phylogeny", &["kind"]).unwrap();
        lattice.variant("Rooted", "Phylogeny", "kind").unwrap();

        let a = lattice.apply("ProfileHMM", &["SingleAmino"]).unwrap();
        let b = lattice.apply("Phylogeny", &["Rooted"]).unwrap();
        assert!(TypeExpr::union([a, b]).is_err());
    }
}
