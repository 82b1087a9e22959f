//! Records and immutable record sets.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::value::Value;

static NULL: Value = Value::Null;

/// Stable identity of a record across reloads.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i32> for RecordId {
    fn from(value: i32) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<u32> for RecordId {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl From<usize> for RecordId {
    fn from(value: usize) -> Self {
        Self(value.to_string())
    }
}

/// Shared, immutable handle to a record.
///
/// A new `Arc` for the same id means the record changed; the sync layer compares
/// handles with [`Arc::ptr_eq`] and never inspects field values.
pub type RecordRef = Arc<Record>;

/// One row of data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<RecordId>,
    #[serde(default)]
    data: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_summary: bool,
}

impl Record {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            data: BTreeMap::new(),
            is_summary: false,
        }
    }

    /// Summary (aggregate) record, pinned above or below the main rows.
    pub fn summary(id: impl Into<RecordId>) -> Self {
        Self {
            is_summary: true,
            ..Self::new(id)
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<RecordId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(field.into(), value.into());
        self
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&RecordId> {
        self.parent_id.as_ref()
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    /// Field value, `Value::Null` when absent.
    pub fn get(&self, field: &str) -> &Value {
        self.data.get(field).unwrap_or(&NULL)
    }

    pub fn is_summary(&self) -> bool {
        self.is_summary
    }

    /// Key of this record's row in the live grid.
    pub fn grid_id(&self) -> String {
        grid_id_for(&self.id)
    }

    pub fn into_ref(self) -> RecordRef {
        Arc::new(self)
    }
}

/// Row key used by the live grid for a record id.
pub fn grid_id_for(id: &RecordId) -> String {
    format!("ag_{id}")
}

/// Ordered, immutable snapshot of records at one point in time.
///
/// There is no way to mutate a `RecordSet` once built. Holders share it behind an
/// `Arc`, so pointer equality of two handles means "same data version".
#[derive(Debug, Default)]
pub struct RecordSet {
    list: Vec<RecordRef>,
    by_id: HashMap<RecordId, RecordRef>,
    depths: HashMap<RecordId, usize>,
    root_count: usize,
    max_depth: usize,
}

impl RecordSet {
    pub fn new(records: impl IntoIterator<Item = RecordRef>) -> Result<Self> {
        let list: Vec<RecordRef> = records.into_iter().collect();
        let mut by_id = HashMap::with_capacity(list.len());
        for record in &list {
            if by_id
                .insert(record.id().clone(), Arc::clone(record))
                .is_some()
            {
                return Err(ModelError::DuplicateRecordId(record.id().clone()));
            }
        }

        let mut depths = HashMap::with_capacity(list.len());
        for record in &list {
            let depth = depth_of(record, &by_id);
            depths.insert(record.id().clone(), depth);
        }
        let root_count = depths.values().filter(|d| **d == 0).count();
        let max_depth = depths.values().copied().max().unwrap_or(0);

        Ok(Self {
            list,
            by_id,
            depths,
            root_count,
            max_depth,
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[RecordRef] {
        &self.list
    }

    pub fn count(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn get_by_id(&self, id: &RecordId) -> Option<&RecordRef> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Number of ancestors of the record present in this set.
    pub fn depth(&self, id: &RecordId) -> usize {
        self.depths.get(id).copied().unwrap_or(0)
    }

    /// Ancestor ids, root first.
    pub fn ancestors(&self, id: &RecordId) -> Vec<RecordId> {
        let mut ret = Vec::new();
        let mut current = self.by_id.get(id).and_then(|r| r.parent_id());
        while let Some(parent) = current {
            if ret.len() > self.list.len() || !self.by_id.contains_key(parent) {
                break;
            }
            ret.push(parent.clone());
            current = self.by_id.get(parent).and_then(|r| r.parent_id());
        }
        ret.reverse();
        ret
    }

    /// Ancestors followed by the record itself.
    pub fn tree_path(&self, id: &RecordId) -> Vec<RecordId> {
        let mut path = self.ancestors(id);
        path.push(id.clone());
        path
    }

    pub fn root_count(&self) -> usize {
        self.root_count
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// True if any root-level record has children.
    pub fn is_hierarchical(&self) -> bool {
        self.root_count != self.list.len()
    }
}

fn depth_of(record: &Record, by_id: &HashMap<RecordId, RecordRef>) -> usize {
    let mut depth = 0;
    let mut current = record.parent_id();
    while let Some(parent) = current {
        // Guard against parent cycles in malformed input.
        if depth > by_id.len() {
            break;
        }
        match by_id.get(parent) {
            Some(p) => {
                depth += 1;
                current = p.parent_id();
            }
            None => break,
        }
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> RecordSet {
        RecordSet::new([
            Record::new("a").into_ref(),
            Record::new("b").with_parent("a").into_ref(),
            Record::new("c").with_parent("b").into_ref(),
            Record::new("d").into_ref(),
        ])
        .expect("record set")
    }

    #[test]
    fn computes_depths_and_paths() {
        let rs = tree();
        assert_eq!(rs.depth(&"c".into()), 2);
        assert_eq!(rs.max_depth(), 2);
        assert_eq!(rs.root_count(), 2);
        assert!(rs.is_hierarchical());
        assert_eq!(
            rs.tree_path(&"c".into()),
            vec![RecordId::from("a"), "b".into(), "c".into()]
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = RecordSet::new([Record::new(1).into_ref(), Record::new(1).into_ref()]);
        assert!(matches!(result, Err(ModelError::DuplicateRecordId(_))));
    }

    #[test]
    fn grid_id_is_prefixed() {
        assert_eq!(Record::new(7).grid_id(), "ag_7");
    }
}
