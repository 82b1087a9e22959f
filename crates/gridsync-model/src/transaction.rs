//! Minimal row mutations between two record set versions.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::record::{RecordRef, RecordSet};

/// Rows to add, update and remove to bring the live grid from one record set to another.
///
/// Empty buckets are never sent to the live grid; they serialize as absent keys.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transaction {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add: Vec<RecordRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub update: Vec<RecordRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove: Vec<RecordRef>,
}

impl Transaction {
    /// Diff `next` against `prev`.
    ///
    /// A record whose id is new is an add. A record whose id existed under a different
    /// `Arc` is an update. Removals are only searched for when the sizes show that some
    /// previous record is missing, so pure add/update diffs skip that scan.
    pub fn between(next: &RecordSet, prev: Option<&RecordSet>) -> Self {
        let Some(prev) = prev else {
            return Self {
                add: next.list().to_vec(),
                ..Self::default()
            };
        };

        let mut add = Vec::new();
        let mut update = Vec::new();
        for rec in next.list() {
            match prev.get_by_id(rec.id()) {
                None => add.push(Arc::clone(rec)),
                Some(existing) if !Arc::ptr_eq(existing, rec) => update.push(Arc::clone(rec)),
                Some(_) => {}
            }
        }

        let mut remove = Vec::new();
        if next.count() != prev.count() + add.len() {
            remove = prev
                .list()
                .iter()
                .filter(|rec| !next.contains(rec.id()))
                .cloned()
                .collect();
        }

        Self {
            add,
            update,
            remove,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }

    /// True if rows were added or removed, as opposed to only updated.
    pub fn is_structural(&self) -> bool {
        !self.add.is_empty() || !self.remove.is_empty()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[update: {} | add: {} | remove: {}]",
            self.update.len(),
            self.add.len(),
            self.remove.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn set(records: &[&RecordRef]) -> RecordSet {
        RecordSet::new(records.iter().map(|r| Arc::clone(r))).expect("record set")
    }

    #[test]
    fn first_load_adds_everything() {
        let a = Record::new(1).into_ref();
        let next = set(&[&a]);
        let tx = Transaction::between(&next, None);
        assert_eq!(tx.add.len(), 1);
        assert!(tx.update.is_empty() && tx.remove.is_empty());
    }

    #[test]
    fn same_set_is_empty() {
        let a = Record::new(1).into_ref();
        let b = Record::new(2).into_ref();
        let rs = set(&[&a, &b]);
        assert!(Transaction::between(&rs, Some(&rs)).is_empty());
    }

    #[test]
    fn equal_values_under_new_handle_are_updates() {
        let a = Record::new(1).with("x", 1).into_ref();
        let a2 = Record::new(1).with("x", 1).into_ref();
        let tx = Transaction::between(&set(&[&a2]), Some(&set(&[&a])));
        assert_eq!(tx.update.len(), 1);
        assert!(!tx.is_structural());
    }

    #[test]
    fn log_string() {
        let a = Record::new(1).into_ref();
        let b = Record::new(2).into_ref();
        let tx = Transaction::between(&set(&[&b]), Some(&set(&[&a])));
        insta::assert_snapshot!(tx.to_string(), @"[update: 0 | add: 1 | remove: 1]");
    }
}
