//! Coalescing scheduler for reconciliation passes.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// A named reconciliation pass.
///
/// Variant order is run order: column definitions go before column state, structure
/// before data, data before anything that reads row nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Pass {
    Columns,
    ColumnState,
    GroupBy,
    SortBy,
    Data,
    Selection,
    NativeSelection,
    ExpandLevel,
    RowHeight,
}

impl Pass {
    pub const ALL: [Self; 9] = [
        Self::Columns,
        Self::ColumnState,
        Self::GroupBy,
        Self::SortBy,
        Self::Data,
        Self::Selection,
        Self::NativeSelection,
        Self::ExpandLevel,
        Self::RowHeight,
    ];
}

/// Pending and deferred passes.
///
/// Triggering a pass that is already pending is a no-op, so a burst of changes to the
/// same concern runs its pass once. Deferred passes wait for the next tick, which
/// coalesces bursts of engine events and lets the engine settle after a transaction.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    pending: BTreeSet<Pass>,
    deferred: BTreeSet<Pass>,
    runs: BTreeMap<Pass, usize>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&mut self, pass: Pass) {
        self.pending.insert(pass);
    }

    pub fn trigger_all(&mut self) {
        self.pending.extend(Pass::ALL);
    }

    /// Schedule `pass` for the next tick.
    pub fn defer(&mut self, pass: Pass) {
        self.deferred.insert(pass);
    }

    /// Pop the highest priority pending pass and count its run.
    pub fn next(&mut self) -> Option<Pass> {
        let pass = self.pending.pop_first()?;
        *self.runs.entry(pass).or_default() += 1;
        Some(pass)
    }

    /// Move deferred passes into the pending set.
    pub fn promote_deferred(&mut self) {
        let deferred = std::mem::take(&mut self.deferred);
        self.pending.extend(deferred);
    }

    pub fn is_pending(&self, pass: Pass) -> bool {
        self.pending.contains(&pass)
    }

    pub fn is_deferred(&self, pass: Pass) -> bool {
        self.deferred.contains(&pass)
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.deferred.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.deferred.clear();
    }

    /// Times `pass` has run.
    pub fn run_count(&self, pass: Pass) -> usize {
        self.runs.get(&pass).copied().unwrap_or(0)
    }

    pub fn run_counts(&self) -> &BTreeMap<Pass, usize> {
        &self.runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_triggers_coalesce() {
        let mut scheduler = Scheduler::new();
        scheduler.trigger(Pass::Data);
        scheduler.trigger(Pass::Data);
        scheduler.trigger(Pass::Data);

        assert_eq!(scheduler.next(), Some(Pass::Data));
        assert_eq!(scheduler.next(), None);
        assert_eq!(scheduler.run_count(Pass::Data), 1);
    }

    #[test]
    fn passes_run_in_priority_order() {
        let mut scheduler = Scheduler::new();
        scheduler.trigger(Pass::RowHeight);
        scheduler.trigger(Pass::Data);
        scheduler.trigger(Pass::Columns);

        let order: Vec<Pass> = std::iter::from_fn(|| scheduler.next()).collect();
        assert_eq!(order, vec![Pass::Columns, Pass::Data, Pass::RowHeight]);
    }

    #[test]
    fn deferred_passes_wait_for_promotion() {
        let mut scheduler = Scheduler::new();
        scheduler.defer(Pass::Selection);
        scheduler.defer(Pass::Selection);

        assert_eq!(scheduler.next(), None);
        assert!(!scheduler.is_idle());

        scheduler.promote_deferred();
        assert_eq!(scheduler.next(), Some(Pass::Selection));
        assert_eq!(scheduler.next(), None);
        assert!(scheduler.is_idle());
    }
}
