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

//! The tree view and its Newick text representation.

use crate::Error;

const FORMAT: &str = "NewickFormat";

/// A node in a phylogenetic tree. Leaves have no children; the root is the
/// node holding everything else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeNode {
    pub name: Option<String>,
    pub length: Option<f64>,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The number of leaves under this node, the node itself included when it
    /// is a leaf.
    pub fn tip_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(|c| c.tip_count()).sum()
        }
    }

    /// Serializes the tree as a Newick string terminated by `;`.
    pub fn to_newick(&self) -> String {
        let mut out = String::new();
        self.write_node(&mut out);
        out.push(';');
        out
    }

    fn write_node(&self, out: &mut String) {
        if !self.children.is_empty() {
            out.push('(');
            for (idx, child) in self.children.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                child.write_node(out);
            }
            out.push(')');
        }
        if let Some(name) = &self.name {
            if name.chars().any(|c| " \t(),:;'".contains(c)) {
                out.push('\'');
                out.push_str(&name.replace('\'', "''"));
                out.push('\'');
            } else {
                out.push_str(name);
            }
        }
        if let Some(length) = self.length {
            out.push(':');
            out.push_str(&length.to_string());
        }
    }
}

struct NewickCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> NewickCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        NewickCursor { bytes, pos: 0 }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.bytes.len() && self.bytes[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn expect(&mut self, byte: u8) -> Result<(), Error> {
        match self.bump() {
            Some(got) if got == byte => Ok(()),
            Some(got) => Err(Error::validation(
                FORMAT,
                format!("Expected '{}' but found '{}'", byte as char, got as char),
            )),
            None => Err(Error::validation(
                FORMAT,
                format!("Expected '{}' but the input ended", byte as char),
            )),
        }
    }

    fn label(&mut self) -> Result<Option<String>, Error> {
        match self.peek() {
            Some(b'\'') => {
                self.pos += 1;
                let mut name = String::new();
                loop {
                    match self.bytes.get(self.pos) {
                        Some(b'\'') if self.bytes.get(self.pos + 1) == Some(&b'\'') => {
                            name.push('\'');
                            self.pos += 2;
                        }
                        Some(b'\'') => {
                            self.pos += 1;
                            return Ok(Some(name));
                        }
                        Some(byte) => {
                            name.push(*byte as char);
                            self.pos += 1;
                        }
                        None => {
                            return Err(Error::validation(FORMAT, "Unterminated quoted label"))
                        }
                    }
                }
            }
            Some(byte) if !b"(),:;".contains(&byte) => {
                let mut name = String::new();
                while let Some(byte) = self.bytes.get(self.pos) {
                    if b"(),:;".contains(byte) || byte.is_ascii_whitespace() {
                        break;
                    }
                    name.push(*byte as char);
                    self.pos += 1;
                }
                Ok(Some(name))
            }
            _ => Ok(None),
        }
    }

    fn length(&mut self) -> Result<Option<f64>, Error> {
        if self.peek() != Some(b':') {
            return Ok(None);
        }
        self.pos += 1;
        self.skip_whitespace();
        let start = self.pos;
        while let Some(byte) = self.bytes.get(self.pos) {
            if b"(),;".contains(byte) || byte.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| Error::validation(FORMAT, "Branch length is not valid UTF-8"))?;
        let value = text.parse::<f64>().map_err(|_| {
            Error::validation(FORMAT, format!("Could not parse branch length {}", text))
        })?;
        Ok(Some(value))
    }

    fn subtree(&mut self) -> Result<TreeNode, Error> {
        let mut node = TreeNode::default();
        if self.peek() == Some(b'(') {
            self.pos += 1;
            loop {
                node.children.push(self.subtree()?);
                match self.bump() {
                    Some(b',') => continue,
                    Some(b')') => break,
                    Some(byte) => {
                        return Err(Error::validation(
                            FORMAT,
                            format!("Expected ',' or ')' but found '{}'", byte as char),
                        ))
                    }
                    None => {
                        return Err(Error::validation(FORMAT, "Unbalanced parentheses"))
                    }
                }
            }
        }
        node.name = self.label()?;
        node.length = self.length()?;
        Ok(node)
    }
}

/// Parses one Newick tree, requiring the terminating `;`.
pub fn parse_newick(text: &str) -> Result<TreeNode, Error> {
    let mut cursor = NewickCursor::new(text.as_bytes());
    let tree = cursor.subtree()?;
    cursor.expect(b';')?;
    cursor.skip_whitespace();
    if cursor.pos != cursor.bytes.len() {
        return Err(Error::validation(FORMAT, "Trailing data after the tree"));
    }
    // A bare ';' names nothing and holds nothing
    if tree == TreeNode::default() {
        return Err(Error::validation(FORMAT, "The tree is empty"));
    }
    Ok(tree)
}

/// Parses every `;`-terminated tree in `text`, up to `limit` when given.
pub fn parse_newick_all(text: &str, limit: Option<usize>) -> Result<Vec<TreeNode>, Error> {
    let mut trees = Vec::new();
    let mut cursor = NewickCursor::new(text.as_bytes());
    while cursor.peek().is_some() {
        if let Some(limit) = limit {
            if trees.len() == limit {
                break;
            }
        }
        let tree = cursor.subtree()?;
        cursor.expect(b';')?;
        if tree == TreeNode::default() {
            return Err(Error::validation(FORMAT, "The tree is empty"));
        }
        trees.push(tree);
    }
    if trees.is_empty() {
        return Err(Error::validation(FORMAT, "The file contains no trees"));
    }
    Ok(trees)
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn leaf_names_and_lengths_round_trip() {
        use super::parse_newick;

        let text = "((a:0.1,b:0.2)c:0.3,d:0.4)root;";
        let tree = parse_newick(text).unwrap();
        assert_eq!(tree.to_newick(), text);
        assert_eq!(tree.tip_count(), 3);
    }

    #[test]
    fn unnamed_internal_nodes_parse() {
        use super::parse_newick;

        let tree = parse_newick("((a,b),(c,d));").unwrap();
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.tip_count(), 4);
        assert_eq!(tree.to_newick(), "((a,b),(c,d));");
    }

    #[test]
    fn quoted_labels_round_trip() {
        use super::parse_newick;

        let tree = parse_newick("('name with spaces':1,b:2);").unwrap();
        assert_eq!(tree.children[0].name.as_deref(), Some("name with spaces"));
        assert_eq!(tree.to_newick(), "('name with spaces':1,b:2);");
    }

    #[test]
    fn non_newick_payload_is_rejected() {
        use super::parse_newick;

        let err = parse_newick("this is not a tree").unwrap_err();
        assert!(err.to_string().contains("NewickFormat"));
    }

    #[test]
    fn unbalanced_parentheses_are_rejected() {
        use super::parse_newick;

        assert!(parse_newick("((a,b);").is_err());
    }

    #[test]
    fn multiple_trees_parse_with_limit() {
        use super::parse_newick_all;

        let text = "(a,b);\n(c,d);\n(e,f);\n";
        assert_eq!(parse_newick_all(text, None).unwrap().len(), 3);
        assert_eq!(parse_newick_all(text, Some(1)).unwrap().len(), 1);
    }
}
