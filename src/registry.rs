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

//! The registry: the single authority on declared types, formats, views,
//! artifact-class bindings and transformers.
//!
//! A host populates the registry once during start-up and treats every
//! registration failure as fatal; afterwards the registry is observed
//! read-only. Nothing can be unregistered.

use indexmap::IndexMap;

use crate::format::DirectoryFormatDef;
use crate::format::FileFormatDef;
use crate::graph::TransformFn;
use crate::graph::Transformer;
use crate::graph::TransformerGraph;
use crate::semantic::SemanticType;
use crate::semantic::TypeExpr;
use crate::semantic::TypeLattice;
use crate::view::ViewId;
use crate::Error;

/// What a fully specified type is bound to.
#[derive(Debug, Clone)]
struct Binding {
    format: &'static str,
    description: String,
}

/// A registered view: an endpoint of the transformer graph, optionally
/// carrying a citation for the work that defined it.
#[derive(Debug, Clone)]
pub struct ViewEntry {
    pub id: ViewId,
    pub citation: Option<&'static str>,
}

#[derive(Debug, Default)]
pub struct Registry {
    lattice: TypeLattice,
    file_formats: IndexMap<&'static str, FileFormatDef>,
    directory_formats: IndexMap<&'static str, DirectoryFormatDef>,
    types: Vec<SemanticType>,
    bindings: IndexMap<SemanticType, Binding>,
    views: IndexMap<ViewId, ViewEntry>,
    graph: TransformerGraph,
    transformer_citations: IndexMap<(ViewId, ViewId), &'static str>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// The semantic-type lattice, for building [SemanticType] values.
    pub fn lattice(&self) -> &TypeLattice {
        &self.lattice
    }

    pub fn lattice_mut(&mut self) -> &mut TypeLattice {
        &mut self.lattice
    }

    /// Registers a file-format leaf. The format also becomes a view under
    /// its own name.
    pub fn register_file_format(&mut self, def: FileFormatDef) -> Result<(), Error> {
        if self.file_formats.contains_key(def.name) {
            return Err(Error::registration(format!(
                "File format {} is already registered",
                def.name
            )));
        }
        log::debug!("registering file format {}", def.name);
        self.views.entry(ViewId(def.name)).or_insert(ViewEntry {
            id: ViewId(def.name),
            citation: None,
        });
        self.file_formats.insert(def.name, def);
        Ok(())
    }

    /// Registers a directory format. The format also becomes a view under
    /// its own name.
    pub fn register_directory_format(&mut self, def: DirectoryFormatDef) -> Result<(), Error> {
        if self.directory_formats.contains_key(def.name) {
            return Err(Error::registration(format!(
                "Directory format {} is already registered",
                def.name
            )));
        }
        log::debug!("registering directory format {}", def.name);
        self.views.entry(ViewId(def.name)).or_insert(ViewEntry {
            id: ViewId(def.name),
            citation: None,
        });
        self.directory_formats.insert(def.name, def);
        Ok(())
    }

    pub fn file_format(&self, name: &str) -> Option<&FileFormatDef> {
        self.file_formats.get(name)
    }

    pub fn directory_format(&self, name: &str) -> Option<&DirectoryFormatDef> {
        self.directory_formats.get(name)
    }

    /// Records a fully specified type as part of the catalog.
    ///
    /// ## Errors
    ///
    /// Registering the same type twice is an error.
    pub fn register_semantic_type(&mut self, t: SemanticType) -> Result<(), Error> {
        if self.types.contains(&t) {
            return Err(Error::registration(format!(
                "Semantic type {} is already registered",
                t
            )));
        }
        self.types.push(t);
        Ok(())
    }

    pub fn is_registered(&self, t: &SemanticType) -> bool {
        self.types.contains(t)
    }

    /// Binds an artifact class: every member of `expr` resolves to the named
    /// directory format from now on.
    ///
    /// ## Errors
    ///
    /// Every member must be a registered type that is not yet bound, and the
    /// format must be a registered directory format.
    pub fn register_artifact_class(
        &mut self,
        expr: TypeExpr,
        format: &'static str,
        description: &str,
    ) -> Result<(), Error> {
        if !self.directory_formats.contains_key(format) {
            return Err(Error::registration(format!(
                "{} is not a registered directory format",
                format
            )));
        }
        for member in expr.members() {
            if !self.is_registered(member) {
                return Err(Error::registration(format!(
                    "{} is not a registered semantic type",
                    member
                )));
            }
            if let Some(bound) = self.bindings.get(member) {
                return Err(Error::registration(format!(
                    "{} is already bound to {}",
                    member, bound.format
                )));
            }
        }
        log::debug!("binding {} to {}", expr, format);
        for member in expr.members() {
            self.bindings.insert(
                member.clone(),
                Binding { format, description: description.to_string() },
            );
        }
        Ok(())
    }

    pub fn is_bound(&self, t: &SemanticType) -> bool {
        self.bindings.contains_key(t)
    }

    /// The description recorded when `t` was bound.
    pub fn binding_description(&self, t: &SemanticType) -> Option<&str> {
        self.bindings.get(t).map(|b| b.description.as_str())
    }

    /// Resolves a type expression to its on-disk format. A union resolves
    /// iff every member is bound to the same directory format.
    pub fn directory_format_for(&self, expr: &TypeExpr) -> Result<&DirectoryFormatDef, Error> {
        let mut resolved: Option<&'static str> = None;
        for member in expr.members() {
            let binding = self.bindings.get(member).ok_or_else(|| {
                Error::registration(format!("{} is not bound to a directory format", member))
            })?;
            match resolved {
                None => resolved = Some(binding.format),
                Some(first) if first != binding.format => {
                    return Err(Error::registration(format!(
                        "{} does not resolve to a single format: {} and {}",
                        expr, first, binding.format
                    )));
                }
                Some(_) => {}
            }
        }
        let name = resolved
            .ok_or_else(|| Error::registration("An empty type expression cannot resolve"))?;
        Ok(&self.directory_formats[name])
    }

    /// Registers an in-memory view as a transformer endpoint.
    pub fn register_view(
        &mut self,
        id: ViewId,
        citation: Option<&'static str>,
    ) -> Result<(), Error> {
        if self.views.contains_key(&id) {
            return Err(Error::registration(format!(
                "View {} is already registered",
                id
            )));
        }
        self.views.insert(id, ViewEntry { id, citation });
        Ok(())
    }

    pub fn is_view_registered(&self, id: ViewId) -> bool {
        self.views.contains_key(&id)
    }

    pub fn view(&self, id: ViewId) -> Option<&ViewEntry> {
        self.views.get(&id)
    }

    /// Registers a one-step conversion between two registered views,
    /// optionally carrying a citation for the work the conversion is based on.
    pub fn register_transformer(
        &mut self,
        src: ViewId,
        dst: ViewId,
        func: TransformFn,
        citation: Option<&'static str>,
    ) -> Result<(), Error> {
        for endpoint in [src, dst] {
            if !self.views.contains_key(&endpoint) {
                return Err(Error::registration(format!(
                    "{} is not a registered view",
                    endpoint
                )));
            }
        }
        self.graph.add_edge(src, dst, func)?;
        if let Some(citation) = citation {
            self.transformer_citations.insert((src, dst), citation);
        }
        Ok(())
    }

    /// The citation recorded for a one-step transformer, if any.
    pub fn transformer_citation(&self, src: ViewId, dst: ViewId) -> Option<&'static str> {
        self.transformer_citations.get(&(src, dst)).copied()
    }

    /// Finds the shortest registered transformer between two views.
    pub fn transformer(&self, src: ViewId, dst: ViewId) -> Result<Transformer, Error> {
        self.graph.lookup(src, dst)
    }
}

// Tests
#[cfg(test)]
mod tests {
    use super::Registry;

    use crate::format::any_body;
    use crate::format::BodyKind;
    use crate::format::DirectoryFormatDef;
    use crate::format::FileFormatDef;
    use crate::semantic::TypeExpr;
    use crate::view::Value;
    use crate::view::ViewId;
    use crate::Error;

    const NWK: FileFormatDef = FileFormatDef::new("NewickFormat", BodyKind::Text, any_body);

    fn tree_registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_file_format(NWK).unwrap();
        registry
            .register_directory_format(
                DirectoryFormatDef::single_file("PhylogenyDirectoryFormat", "tree.nwk", NWK)
                    .unwrap(),
            )
            .unwrap();

        let lattice = registry.lattice_mut();
        lattice.declare("Phylogeny", &["kind"]).unwrap();
        lattice.variant("Rooted", "Phylogeny", "kind").unwrap();
        lattice.variant("Unrooted", "Phylogeny", "kind").unwrap();
        lattice.declare("Hierarchy", &[]).unwrap();

        for (ctor, args) in
            [("Phylogeny", vec!["Rooted"]), ("Phylogeny", vec!["Unrooted"]), ("Hierarchy", vec![])]
        {
            let t = registry.lattice().apply(ctor, &args).unwrap();
            registry.register_semantic_type(t).unwrap();
        }
        registry
    }

    #[test]
    fn union_binding_resolves_every_member() {
        let mut registry = tree_registry();
        let rooted = registry.lattice().apply("Phylogeny", &["Rooted"]).unwrap();
        let unrooted = registry.lattice().apply("Phylogeny", &["Unrooted"]).unwrap();
        let union = TypeExpr::union([rooted.clone(), unrooted.clone()]).unwrap();

        registry
            .register_artifact_class(union.clone(), "PhylogenyDirectoryFormat", "phylogenies")
            .unwrap();

        assert!(registry.is_bound(&rooted));
        assert!(registry.is_bound(&unrooted));
        assert_eq!(registry.binding_description(&rooted), Some("phylogenies"));
        let format = registry.directory_format_for(&union).unwrap();
        assert_eq!(format.name, "PhylogenyDirectoryFormat");
        let format = registry.directory_format_for(&rooted.into()).unwrap();
        assert_eq!(format.name, "PhylogenyDirectoryFormat");
    }

    #[test]
    fn double_binding_is_rejected() {
        let mut registry = tree_registry();
        let rooted = registry.lattice().apply("Phylogeny", &["Rooted"]).unwrap();

        registry
            .register_artifact_class(rooted.clone().into(), "PhylogenyDirectoryFormat", "first")
            .unwrap();
        let err = registry
            .register_artifact_class(rooted.into(), "PhylogenyDirectoryFormat", "second")
            .unwrap_err();
        assert!(err.to_string().contains("already bound"));
    }

    #[test]
    fn unregistered_types_cannot_be_bound() {
        let mut registry = tree_registry();
        let lattice = registry.lattice_mut();
        lattice.declare("Ordination", &[]).unwrap();
        let t = registry.lattice().apply("Ordination", &[]).unwrap();

        let err = registry
            .register_artifact_class(t.into(), "PhylogenyDirectoryFormat", "ordinations")
            .unwrap_err();
        assert!(err.to_string().contains("not a registered semantic type"));
    }

    #[test]
    fn unbound_types_do_not_resolve() {
        let registry = tree_registry();
        let hierarchy = registry.lattice().apply("Hierarchy", &[]).unwrap();
        let err = registry.directory_format_for(&hierarchy.into()).unwrap_err();
        assert!(err.to_string().contains("not bound"));
    }

    #[test]
    fn transformer_endpoints_must_be_views() {
        fn noop(value: Value) -> Result<Value, Error> {
            Ok(value)
        }

        let mut registry = tree_registry();
        registry.register_view(crate::view::TREE, None).unwrap();

        // NewickFormat became a view when the file format was registered
        registry
            .register_transformer(ViewId("NewickFormat"), crate::view::TREE, noop, Some("newick"))
            .unwrap();
        let err = registry
            .register_transformer(ViewId("Bogus"), crate::view::TREE, noop, None)
            .unwrap_err();
        assert!(err.to_string().contains("not a registered view"));
        assert_eq!(
            registry.transformer_citation(ViewId("NewickFormat"), crate::view::TREE),
            Some("newick")
        );
        assert!(registry.transformer_citation(crate::view::TREE, ViewId("NewickFormat")).is_none());

        let transformer = registry
            .transformer(ViewId("NewickFormat"), crate::view::TREE)
            .unwrap();
        assert_eq!(transformer.n_steps(), 1);
    }
}
