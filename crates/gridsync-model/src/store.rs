//! Record store: the full and filtered record sets plus an optional summary record.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::filter::Filter;
use crate::record::{Record, RecordId, RecordRef, RecordSet};

/// Incremental change to the store's records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreUpdate {
    pub add: Vec<Record>,
    pub update: Vec<Record>,
    pub remove: Vec<RecordId>,
}

/// Holds immutable record set versions.
///
/// Each effective change publishes a new `Arc<RecordSet>`; an operation that changes
/// nothing keeps the current `Arc`, so consumers can detect versions with
/// [`Arc::ptr_eq`].
#[derive(Debug, Default)]
pub struct Store {
    all: Arc<RecordSet>,
    filtered: Arc<RecordSet>,
    filter: Option<Filter>,
    summary: Option<RecordRef>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> &Arc<RecordSet> {
        &self.all
    }

    /// Records passing the current filter, in load order.
    pub fn filtered(&self) -> &Arc<RecordSet> {
        &self.filtered
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn summary(&self) -> Option<&RecordRef> {
        self.summary.as_ref()
    }

    /// Replace all records. Records equal to their current version keep their handle.
    ///
    /// Returns false when nothing changed.
    pub fn load_data(&mut self, records: impl IntoIterator<Item = Record>) -> Result<bool> {
        let next: Vec<RecordRef> = records
            .into_iter()
            .map(|rec| self.reuse(rec))
            .collect();
        self.publish(next)
    }

    pub fn update_data(&mut self, update: StoreUpdate) -> Result<bool> {
        let removed: HashSet<RecordId> = update.remove.into_iter().collect();
        let mut updated: HashMap<RecordId, RecordRef> = update
            .update
            .into_iter()
            .map(|rec| (rec.id().clone(), self.reuse(rec)))
            .collect();

        let mut next: Vec<RecordRef> = self
            .all
            .list()
            .iter()
            .filter(|rec| !removed.contains(rec.id()))
            .map(|rec| updated.remove(rec.id()).unwrap_or_else(|| Arc::clone(rec)))
            .collect();
        next.extend(update.add.into_iter().map(Record::into_ref));
        self.publish(next)
    }

    pub fn set_filter(&mut self, filter: Option<Filter>) {
        if self.filter == filter {
            return;
        }
        self.filter = filter;
        self.refilter();
    }

    pub fn set_summary(&mut self, summary: Option<Record>) {
        self.summary = summary.map(|rec| match &self.summary {
            Some(existing) if **existing == rec => Arc::clone(existing),
            _ => rec.into_ref(),
        });
    }

    fn reuse(&self, rec: Record) -> RecordRef {
        match self.all.get_by_id(rec.id()) {
            Some(existing) if **existing == rec => Arc::clone(existing),
            _ => rec.into_ref(),
        }
    }

    fn publish(&mut self, next: Vec<RecordRef>) -> Result<bool> {
        let unchanged = next.len() == self.all.count()
            && next
                .iter()
                .zip(self.all.list())
                .all(|(a, b)| Arc::ptr_eq(a, b));
        if unchanged {
            return Ok(false);
        }
        self.all = Arc::new(RecordSet::new(next)?);
        debug!(count = self.all.count(), "store loaded");
        self.refilter();
        Ok(true)
    }

    fn refilter(&mut self) {
        let Some(filter) = &self.filter else {
            self.filtered = Arc::clone(&self.all);
            return;
        };

        let mut keep: HashSet<&RecordId> = HashSet::new();
        for rec in self.all.list() {
            if filter.test(rec) {
                keep.insert(rec.id());
                // Ancestors of a match stay visible so the match stays reachable.
                let mut current = rec.parent_id();
                while let Some(parent) = current {
                    match self.all.get_by_id(parent) {
                        Some(p) if keep.insert(p.id()) => current = p.parent_id(),
                        _ => break,
                    }
                }
            }
        }

        let records: Vec<RecordRef> = self
            .all
            .list()
            .iter()
            .filter(|rec| keep.contains(rec.id()))
            .cloned()
            .collect();
        // Ids are unique in `all`, so a subset cannot fail to build.
        self.filtered = RecordSet::new(records).map(Arc::new).unwrap_or_default();
    }
}
