//! Specificity-ordered opcode decoding.
//!
//! Templates with every bit fixed go into a direct value map; the rest form a
//! forest ordered by the super-pattern relation, so that looking up a byte
//! always lands on the most specific registered template.

pub mod pattern;

use std::collections::{HashMap, HashSet};

use thiserror::Error;

pub use pattern::{BytePattern, PatternError, VarField};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error("opcode {0:#04x} registered twice")]
    DuplicateOpcode(u8),
    #[error("template \"{0}\" registered twice")]
    DuplicatePattern(String),
}

struct Node {
    pattern: BytePattern,
    children: Vec<usize>,
}

/// Pattern index: O(1) map for fully-constant templates plus an arena-backed
/// forest for the rest. Nodes reference children by arena index, so moving a
/// subtree under a new parent is index-list surgery.
#[derive(Default)]
pub struct PatternForest {
    constants: HashMap<u8, BytePattern>,
    arena: Vec<Node>,
    roots: Vec<usize>,
}

impl PatternForest {
    pub fn new() -> PatternForest {
        PatternForest::default()
    }

    pub fn add(&mut self, text: &str) -> Result<(), DecodeError> {
        let pattern = BytePattern::parse(text)?;

        if pattern.is_constant() {
            let value = pattern.const_val();
            if self.constants.contains_key(&value) {
                return Err(DecodeError::DuplicateOpcode(value));
            }
            self.constants.insert(value, pattern);
            return Ok(());
        }

        let node = self.arena.len();
        self.arena.push(Node {
            pattern,
            children: Vec::new(),
        });

        for i in 0..self.roots.len() {
            if self.insert_under(self.roots[i], node) {
                return Ok(());
            }
        }

        // No root covers it: it becomes a root itself, and adopts any
        // existing root it covers. This keeps the forest ordered by
        // generality at every insertion, not just at the end.
        self.roots.push(node);
        let mut adopted = Vec::new();
        for i in 0..self.roots.len() {
            let root = self.roots[i];
            if root != node && self.insert_under(node, root) {
                adopted.push(root);
            }
        }
        self.roots.retain(|r| !adopted.contains(r));

        Ok(())
    }

    /// Returns the most specific registered template matching `value`.
    pub fn find(&self, value: u8) -> Option<&BytePattern> {
        if let Some(pattern) = self.constants.get(&value) {
            return Some(pattern);
        }
        self.roots.iter().find_map(|&root| self.find_in(root, value))
    }

    fn find_in(&self, index: usize, value: u8) -> Option<&BytePattern> {
        let node = &self.arena[index];
        if !node.pattern.test(value) {
            return None;
        }
        // A matching child always beats the node's own template.
        for &child in &node.children {
            if let Some(pattern) = self.find_in(child, value) {
                return Some(pattern);
            }
        }
        Some(&node.pattern)
    }

    /// Offers `node` to `parent` as a descendant. The deepest eligible parent
    /// wins; children the newcomer itself covers are re-parented under it.
    fn insert_under(&mut self, parent: usize, node: usize) -> bool {
        if !self.is_super_pattern(parent, node) {
            return false;
        }

        let children = self.arena[parent].children.clone();
        for &child in &children {
            if self.insert_under(child, node) {
                return true;
            }
        }

        let mut adopted = Vec::new();
        for &child in &children {
            if self.insert_under(node, child) {
                adopted.push(child);
            }
        }
        self.arena[parent].children.retain(|c| !adopted.contains(c));
        self.arena[parent].children.push(node);

        true
    }

    /// `a` covers a strictly larger value set than `b`: its constant bits are
    /// a consistent subset of `b`'s, and the two are not identical.
    fn is_super_pattern(&self, a: usize, b: usize) -> bool {
        let p = &self.arena[a].pattern;
        let q = &self.arena[b].pattern;
        let same = p.const_mask() == q.const_mask() && p.const_val() == q.const_val();
        !same
            && p.const_mask() == (q.const_mask() & p.const_mask())
            && p.const_val() == (q.const_val() & p.const_mask())
    }
}

/// Lookup outcome for a [`DispatchTable`].
pub enum Lookup<'a, V> {
    /// No registered template matches the byte.
    Miss,
    /// The final match is an umbrella template with no payload: a coverage gap.
    Group(&'a BytePattern),
    Hit(&'a BytePattern, &'a V),
}

/// A pattern forest paired with a payload per template, keyed by the exact
/// template text. The interpreter keys handlers this way; the disassembler
/// keys mnemonic generators the same way.
pub struct DispatchTable<V> {
    forest: PatternForest,
    entries: HashMap<String, V>,
    groups: HashSet<String>,
}

impl<V> DispatchTable<V> {
    pub fn new() -> DispatchTable<V> {
        DispatchTable {
            forest: PatternForest::new(),
            entries: HashMap::new(),
            groups: HashSet::new(),
        }
    }

    pub fn add(&mut self, text: &str, value: V) -> Result<(), DecodeError> {
        if self.entries.contains_key(text) || self.groups.contains(text) {
            return Err(DecodeError::DuplicatePattern(text.to_string()));
        }
        self.forest.add(text)?;
        self.entries.insert(text.to_string(), value);
        Ok(())
    }

    /// Registers an umbrella template that asserts "this range must be fully
    /// covered by more specific entries". It carries no payload and must never
    /// be the final match.
    pub fn add_group(&mut self, text: &str) -> Result<(), DecodeError> {
        if self.entries.contains_key(text) || self.groups.contains(text) {
            return Err(DecodeError::DuplicatePattern(text.to_string()));
        }
        self.forest.add(text)?;
        self.groups.insert(text.to_string());
        Ok(())
    }

    pub fn find(&self, value: u8) -> Lookup<'_, V> {
        match self.forest.find(value) {
            None => Lookup::Miss,
            Some(pattern) => match self.entries.get(pattern.text()) {
                Some(entry) => Lookup::Hit(pattern, entry),
                None => Lookup::Group(pattern),
            },
        }
    }

    pub fn pattern_for(&self, value: u8) -> Option<&BytePattern> {
        self.forest.find(value)
    }
}

impl<V> Default for DispatchTable<V> {
    fn default() -> Self {
        DispatchTable::new()
    }
}
