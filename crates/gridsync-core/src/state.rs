//! Serializable snapshots of live engine state.

use std::collections::{BTreeMap, BTreeSet};

use gridsync_model::{ExpandState, SortDirection};
use serde::{Deserialize, Serialize};

use crate::api::{AgColumnState, FilterModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateCategory {
    Column,
    Sort,
    Expand,
    Filter,
    Misc,
}

impl StateCategory {
    pub const ALL: [Self; 5] = [
        Self::Column,
        Self::Sort,
        Self::Expand,
        Self::Filter,
        Self::Misc,
    ];
}

/// Categories left out of a [`AgGridState`] capture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateExclusions(BTreeSet<StateCategory>);

impl StateExclusions {
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn without(mut self, category: StateCategory) -> Self {
        self.0.insert(category);
        self
    }

    pub fn includes(&self, category: StateCategory) -> bool {
        !self.0.contains(&category)
    }
}

/// Column layout as the engine sees it, sort fields stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnStateSnapshot {
    pub is_pivot: bool,
    pub columns: Vec<AgColumnState>,
}

/// Column addressed by a sort entry.
///
/// Pivot result columns are generated by the engine with unstable ids, so they are
/// addressed by their pivot keys and value column instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortColumnRef {
    Primary(String),
    Secondary(Vec<String>, String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortStateEntry {
    pub col_id: SortColumnRef,
    pub sort: SortDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_index: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiscState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened_tool_panel: Option<String>,
}

/// Full engine state snapshot.
///
/// Each category is captured independently; a category that failed is absent and its
/// error message is kept under `errors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgGridState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_state: Option<ColumnStateSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_state: Option<Vec<SortStateEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expand_state: Option<ExpandState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_state: Option<FilterModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub misc_state: Option<MiscState>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<StateCategory, String>,
}

/// Engine state to capture before, and restore after, a disruptive engine call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreserveState {
    pub filters: bool,
    pub expansion: bool,
}

impl PreserveState {
    pub const FILTERS: Self = Self {
        filters: true,
        expansion: false,
    };

    pub const EXPANSION: Self = Self {
        filters: false,
        expansion: true,
    };
}
