//! Nested expansion state of tree and group rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Entry for one expanded node: a plain flag, or the expanded children beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpandNode {
    Expanded(bool),
    Children(ExpandState),
}

/// Expanded nodes keyed by their path of keys from the root.
///
/// Only reachable expansions are present: a node appears only if every ancestor does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpandState(BTreeMap<String, ExpandNode>);

impl ExpandState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&ExpandNode> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Record `path` as expanded. Returns false if its parent path is not already present.
    pub fn insert_path<S: AsRef<str>>(&mut self, path: &[S]) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };
        let mut level = self;
        for key in parents {
            let Some(node) = level.0.get_mut(key.as_ref()) else {
                return false;
            };
            if matches!(node, ExpandNode::Expanded(_)) {
                *node = ExpandNode::Children(ExpandState::new());
            }
            let ExpandNode::Children(children) = node else {
                return false;
            };
            level = children;
        }
        level
            .0
            .entry(last.as_ref().to_string())
            .or_insert(ExpandNode::Expanded(true));
        true
    }

    /// True if the node at `path` is recorded as expanded.
    pub fn contains_path<S: AsRef<str>>(&self, path: &[S]) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };
        let mut level = self;
        for key in parents {
            match level.0.get(key.as_ref()) {
                Some(ExpandNode::Children(children)) => level = children,
                _ => return false,
            }
        }
        match level.0.get(last.as_ref()) {
            Some(ExpandNode::Expanded(expanded)) => *expanded,
            Some(ExpandNode::Children(_)) => true,
            None => false,
        }
    }

    /// Number of expanded nodes at any depth.
    pub fn node_count(&self) -> usize {
        self.0
            .values()
            .map(|node| match node {
                ExpandNode::Expanded(expanded) => usize::from(*expanded),
                ExpandNode::Children(children) => 1 + children.node_count(),
            })
            .sum()
    }
}
