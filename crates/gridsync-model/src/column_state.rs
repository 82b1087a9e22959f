//! Persistable per-column display state and its maintenance rules.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::column::{Column, ColumnNode, Pinned, gather_leaves};
use crate::error::{ModelError, Result};
use crate::options::SizingMode;

/// Display state of one leaf column. The order of a `Vec<ColumnState>` is column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnState {
    pub col_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<Pinned>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub manually_sized: bool,
}

impl ColumnState {
    pub fn new(col_id: impl Into<String>) -> Self {
        Self {
            col_id: col_id.into(),
            width: None,
            hidden: false,
            pinned: None,
            manually_sized: false,
        }
    }

    pub fn for_column(col: &Column) -> Self {
        Self {
            col_id: col.col_id.clone(),
            width: col.effective_width(),
            hidden: col.hidden,
            pinned: col.pinned,
            manually_sized: false,
        }
    }
}

/// Partial update of one column's state. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnStateChange {
    pub col_id: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub hidden: Option<bool>,
    /// `Some(None)` unpins.
    #[serde(
        default,
        with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub pinned: Option<Option<Pinned>>,
    #[serde(default)]
    pub manually_sized: Option<bool>,
}

impl ColumnStateChange {
    pub fn new(col_id: impl Into<String>) -> Self {
        Self {
            col_id: col_id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    #[must_use]
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    #[must_use]
    pub fn pinned(mut self, pinned: Option<Pinned>) -> Self {
        self.pinned = Some(pinned);
        self
    }

    #[must_use]
    pub fn manually_sized(mut self, manually_sized: bool) -> Self {
        self.manually_sized = Some(manually_sized);
        self
    }
}

/// Restoring a full state entry sets every field it carries.
impl From<&ColumnState> for ColumnStateChange {
    fn from(state: &ColumnState) -> Self {
        Self {
            col_id: state.col_id.clone(),
            width: state.width,
            hidden: Some(state.hidden),
            pinned: Some(state.pinned),
            manually_sized: Some(state.manually_sized),
        }
    }
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T: Serialize, S: Serializer>(
        value: &Option<Option<T>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T: Deserialize<'de>, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Option<T>>, D::Error> {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Sizing mode in effect when columns were last autosized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosizeState {
    pub sizing_mode: Option<SizingMode>,
}

/// Starting state straight from the column definitions.
pub fn initial_column_state(columns: &[ColumnNode]) -> Vec<ColumnState> {
    gather_leaves(columns)
        .into_iter()
        .map(ColumnState::for_column)
        .collect()
}

/// Reconcile stored state with the current columns.
///
/// Entries for columns that no longer exist are dropped. Columns missing from the state
/// are inserted at their definition index.
pub fn clean_column_state(state: &[ColumnState], columns: &[ColumnNode]) -> Vec<ColumnState> {
    let leaves = gather_leaves(columns);
    let mut ret: Vec<ColumnState> = state
        .iter()
        .filter(|it| leaves.iter().any(|col| col.col_id == it.col_id))
        .cloned()
        .collect();

    for (idx, col) in leaves.iter().enumerate() {
        if !ret.iter().any(|it| it.col_id == col.col_id) {
            let at = idx.min(ret.len());
            ret.insert(at, ColumnState::for_column(col));
        }
    }
    ret
}

/// Strip widths of columns the user cannot resize; their width always comes from the definition.
pub fn remove_transient_widths(state: &mut [ColumnState], columns: &[ColumnNode]) {
    let leaves = gather_leaves(columns);
    for it in state.iter_mut() {
        if leaves
            .iter()
            .any(|col| col.col_id == it.col_id && !col.resizable)
        {
            it.width = None;
        }
    }
}

/// Apply partial changes. A change list naming every column also sets the order.
pub fn apply_column_state_changes(
    state: &[ColumnState],
    changes: &[ColumnStateChange],
) -> Result<Vec<ColumnState>> {
    let unknown: Vec<String> = changes
        .iter()
        .filter(|change| !state.iter().any(|it| it.col_id == change.col_id))
        .map(|change| change.col_id.clone())
        .collect();
    if !unknown.is_empty() {
        return Err(ModelError::UnknownColumns(unknown));
    }

    let mut ret = state.to_vec();
    for change in changes {
        if let Some(col) = ret.iter_mut().find(|it| it.col_id == change.col_id) {
            if let Some(width) = change.width {
                col.width = Some(width);
            }
            if let Some(hidden) = change.hidden {
                col.hidden = hidden;
            }
            if let Some(pinned) = change.pinned {
                col.pinned = pinned;
            }
            if let Some(manually_sized) = change.manually_sized {
                col.manually_sized = manually_sized;
            }
        }
    }

    if changes.len() == ret.len() {
        let order: HashMap<&str, usize> = changes
            .iter()
            .enumerate()
            .map(|(idx, change)| (change.col_id.as_str(), idx))
            .collect();
        ret.sort_by_key(|it| order.get(it.col_id.as_str()).copied().unwrap_or(usize::MAX));
    }
    Ok(ret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;

    fn columns() -> Vec<ColumnNode> {
        vec![
            Column::new("a").into(),
            Column::new("b").with_resizable(false).with_width(80).into(),
            Column::new("c").with_flex(1).into(),
        ]
    }

    #[test]
    fn initial_state_uses_definition_defaults() {
        let state = initial_column_state(&columns());
        assert_eq!(state[0].width, Some(60));
        assert_eq!(state[1].width, Some(80));
        assert_eq!(state[2].width, None);
    }

    #[test]
    fn clean_drops_missing_and_inserts_new() {
        let stored = vec![ColumnState::new("zzz"), ColumnState::new("c"), ColumnState::new("a")];
        let cleaned = clean_column_state(&stored, &columns());
        let ids: Vec<_> = cleaned.iter().map(|it| it.col_id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);
    }

    #[test]
    fn transient_widths_are_removed() {
        let mut state = initial_column_state(&columns());
        remove_transient_widths(&mut state, &columns());
        assert_eq!(state[1].width, None);
        assert_eq!(state[0].width, Some(60));
    }

    #[test]
    fn partial_changes_keep_unset_fields() {
        let mut state = initial_column_state(&columns());
        state[0].pinned = Some(Pinned::Left);
        let changed =
            apply_column_state_changes(&state, &[ColumnStateChange::new("a").width(120)])
                .expect("apply");
        assert_eq!(changed[0].width, Some(120));
        assert_eq!(changed[0].pinned, Some(Pinned::Left));

        let unpinned =
            apply_column_state_changes(&changed, &[ColumnStateChange::new("a").pinned(None)])
                .expect("apply");
        assert_eq!(unpinned[0].pinned, None);
    }

    #[test]
    fn full_change_list_reorders() {
        let state = initial_column_state(&columns());
        let changes = ["c", "a", "b"].map(ColumnStateChange::new);
        let reordered = apply_column_state_changes(&state, &changes).expect("apply");
        let ids: Vec<_> = reordered.iter().map(|it| it.col_id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn unknown_ids_fail() {
        let state = initial_column_state(&columns());
        let err = apply_column_state_changes(&state, &[ColumnStateChange::new("nope")])
            .expect_err("unknown column");
        assert_eq!(err.to_string(), "unknown column ids: nope");
    }

    #[test]
    fn change_json_distinguishes_unpin() {
        let unpin: ColumnStateChange =
            serde_json::from_str(r#"{"col_id": "a", "pinned": null}"#).expect("parse");
        assert_eq!(unpin.pinned, Some(None));
        let untouched: ColumnStateChange =
            serde_json::from_str(r#"{"col_id": "a"}"#).expect("parse");
        assert_eq!(untouched.pinned, None);
    }
}
