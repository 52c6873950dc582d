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

//! The transformer graph: registered single-step conversions between views
//! and the multi-step transformers found by searching over them.
//!
//! Lookups run a breadth-first search, so a found transformer always has the
//! fewest possible steps. Ties are broken by registration order, which makes
//! repeated lookups deterministic. Found paths are memoised per
//! `(source, destination)` pair.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;

use indexmap::IndexMap;

use crate::view::Value;
use crate::view::ViewId;
use crate::Error;

/// A single registered conversion step.
pub type TransformFn = fn(Value) -> Result<Value, Error>;

#[derive(Debug, Clone, Copy)]
struct Edge {
    src: ViewId,
    dst: ViewId,
    func: TransformFn,
}

/// A composed conversion from one view to another.
#[derive(Debug, Clone)]
pub struct Transformer {
    steps: Vec<TransformFn>,
    path: Vec<ViewId>,
}

impl Transformer {
    /// Runs the steps in order.
    ///
    /// ## Errors
    ///
    /// Fails when any step fails, eg. because the input value does not hold
    /// what its view tag promises.
    pub fn apply(&self, value: Value) -> Result<Value, Error> {
        let mut value = value;
        for step in &self.steps {
            value = step(value)?;
        }
        Ok(value)
    }

    /// The views visited, source and destination included.
    pub fn path(&self) -> &[ViewId] {
        &self.path
    }

    pub fn n_steps(&self) -> usize {
        self.steps.len()
    }
}

/// The registered edges and the searches over them.
#[derive(Debug, Default)]
pub struct TransformerGraph {
    edges: Vec<Edge>,
    /// Edge indices leaving each view, in registration order.
    adjacency: IndexMap<ViewId, Vec<usize>>,
    memo: Mutex<HashMap<(ViewId, ViewId), Option<Vec<usize>>>>,
}

impl TransformerGraph {
    pub fn new() -> Self {
        TransformerGraph::default()
    }

    /// Registers a one-step conversion.
    ///
    /// ## Errors
    ///
    /// A second edge between the same pair of views is rejected rather than
    /// silently shadowed.
    pub fn add_edge(&mut self, src: ViewId, dst: ViewId, func: TransformFn) -> Result<(), Error> {
        if self.edges.iter().any(|e| e.src == src && e.dst == dst) {
            return Err(Error::registration(format!(
                "A transformer from {} to {} is already registered",
                src, dst
            )));
        }
        let index = self.edges.len();
        self.edges.push(Edge { src, dst, func });
        self.adjacency.entry(src).or_default().push(index);
        self.memo.lock().unwrap().clear();
        Ok(())
    }

    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    /// Finds the shortest transformer from `src` to `dst`.
    ///
    /// ## Errors
    ///
    /// [Error::NoTransformer] when the destination is unreachable. A lookup
    /// with `src == dst` yields the empty transformer.
    pub fn lookup(&self, src: ViewId, dst: ViewId) -> Result<Transformer, Error> {
        let found = {
            let mut memo = self.memo.lock().unwrap();
            match memo.get(&(src, dst)) {
                Some(cached) => cached.clone(),
                None => {
                    let computed = self.search(src, dst);
                    memo.insert((src, dst), computed.clone());
                    computed
                }
            }
        };
        let edge_indices = found.ok_or_else(|| Error::NoTransformer {
            src: src.to_string(),
            dst: dst.to_string(),
        })?;

        let mut path = vec![src];
        let mut steps = Vec::with_capacity(edge_indices.len());
        for index in edge_indices {
            let edge = self.edges[index];
            steps.push(edge.func);
            path.push(edge.dst);
        }
        Ok(Transformer { steps, path })
    }

    /// Breadth-first search returning the edge indices of the shortest path,
    /// or `None` when unreachable.
    fn search(&self, src: ViewId, dst: ViewId) -> Option<Vec<usize>> {
        if src == dst {
            return Some(Vec::new());
        }
        // predecessor edge per discovered view
        let mut via: HashMap<ViewId, usize> = HashMap::new();
        let mut queue = VecDeque::from([src]);
        while let Some(current) = queue.pop_front() {
            let Some(out) = self.adjacency.get(&current) else {
                continue;
            };
            for &index in out {
                let edge = self.edges[index];
                if edge.dst == src || via.contains_key(&edge.dst) {
                    continue;
                }
                via.insert(edge.dst, index);
                if edge.dst == dst {
                    let mut rev = Vec::new();
                    let mut at = dst;
                    while at != src {
                        let index = via[&at];
                        rev.push(index);
                        at = self.edges[index].src;
                    }
                    rev.reverse();
                    return Some(rev);
                }
                queue.push_back(edge.dst);
            }
        }
        None
    }
}

// Tests
#[cfg(test)]
mod tests {
    use super::TransformerGraph;
    use crate::view::Value;
    use crate::view::ViewId;
    use crate::Error;

    const A: ViewId = ViewId("A");
    const B: ViewId = ViewId("B");
    const C: ViewId = ViewId("C");
    const D: ViewId = ViewId("D");

    fn noop(value: Value) -> Result<Value, Error> {
        Ok(value)
    }

    #[test]
    fn shortest_path_wins() {
        let mut graph = TransformerGraph::new();
        graph.add_edge(A, B, noop).unwrap();
        graph.add_edge(B, C, noop).unwrap();
        graph.add_edge(C, D, noop).unwrap();
        graph.add_edge(A, D, noop).unwrap();

        let transformer = graph.lookup(A, D).unwrap();
        assert_eq!(transformer.n_steps(), 1);
        assert_eq!(transformer.path(), &[A, D]);
    }

    #[test]
    fn ties_break_by_registration_order() {
        let mut graph = TransformerGraph::new();
        graph.add_edge(A, B, noop).unwrap();
        graph.add_edge(A, C, noop).unwrap();
        graph.add_edge(C, D, noop).unwrap();
        graph.add_edge(B, D, noop).unwrap();

        // Both two-step routes exist; the one through B was registered first
        let transformer = graph.lookup(A, D).unwrap();
        assert_eq!(transformer.path(), &[A, B, D]);
    }

    #[test]
    fn unreachable_views_are_reported() {
        let mut graph = TransformerGraph::new();
        graph.add_edge(A, B, noop).unwrap();

        let err = graph.lookup(B, A).unwrap_err();
        assert_eq!(err.to_string(), "No transformer from B to A");
    }

    #[test]
    fn duplicate_edges_are_rejected() {
        let mut graph = TransformerGraph::new();
        graph.add_edge(A, B, noop).unwrap();
        let err = graph.add_edge(A, B, noop).unwrap_err();
        assert!(err.to_string().contains("already registered"));
        assert_eq!(graph.n_edges(), 1);
    }

    #[test]
    fn identity_lookup_is_empty() {
        let mut graph = TransformerGraph::new();
        graph.add_edge(A, B, noop).unwrap();

        let transformer = graph.lookup(A, A).unwrap();
        assert_eq!(transformer.n_steps(), 0);
        assert_eq!(transformer.path(), &[A]);
    }
}
