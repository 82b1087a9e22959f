//! Column definitions and declarative column state.

use gridsync_model::{
    Column, ColumnNode, ColumnState, ColumnStateChange, Pinned, apply_column_state_changes,
    clean_column_state, find_column, gather_leaves, initial_column_state,
    remove_transient_widths, validate_columns,
};
use tracing::debug;

use crate::api::{AgColumnState, ColumnDef};
use crate::column_sync::{self, ColumnSyncPath};
use crate::error::Result;
use crate::scheduler::Pass;
use crate::state::PreserveState;

use super::GridModel;

impl GridModel {
    //------------------------
    // Columns
    //------------------------

    /// Replace the column definitions. Column state restarts from the new definitions.
    pub fn set_columns(&mut self, columns: Vec<ColumnNode>) -> Result<()> {
        validate_columns(&columns, self.config.tree_mode)?;
        self.column_state = initial_column_state(&columns);
        self.columns = columns;
        self.trigger(&[Pass::Columns, Pass::ColumnState, Pass::RowHeight])
    }

    pub fn column(&self, col_id: &str) -> Option<&Column> {
        find_column(&self.columns, col_id)
    }

    pub fn leaf_columns(&self) -> Vec<&Column> {
        gather_leaves(&self.columns)
    }

    /// Leaf columns not hidden by column state, in definition order.
    pub fn visible_leaf_columns(&self) -> Vec<&Column> {
        gather_leaves(&self.columns)
            .into_iter()
            .filter(|col| self.is_column_visible(&col.col_id))
            .collect()
    }

    pub fn state_for_column(&self, col_id: &str) -> Option<&ColumnState> {
        self.column_state.iter().find(|it| it.col_id == col_id)
    }

    pub fn is_column_visible(&self, col_id: &str) -> bool {
        self.state_for_column(col_id).is_some_and(|it| !it.hidden)
    }

    pub fn column_pinned(&self, col_id: &str) -> Option<Pinned> {
        self.state_for_column(col_id).and_then(|it| it.pinned)
    }

    pub fn set_column_visible(&mut self, col_id: &str, visible: bool) -> Result<()> {
        self.apply_column_state_changes(&[ColumnStateChange::new(col_id).hidden(!visible)])
    }

    pub fn show_column(&mut self, col_id: &str) -> Result<()> {
        self.set_column_visible(col_id, true)
    }

    pub fn hide_column(&mut self, col_id: &str) -> Result<()> {
        self.set_column_visible(col_id, false)
    }

    //------------------------
    // Column state
    //------------------------

    /// Restore column state, e.g. from persisted state.
    ///
    /// Entries for removed columns are dropped, new columns are inserted at their
    /// definition index, and widths of non-resizable columns are ignored.
    pub fn set_column_state(&mut self, state: &[ColumnState]) -> Result<()> {
        let mut state = clean_column_state(state, &self.columns);
        remove_transient_widths(&mut state, &self.columns);
        let changes: Vec<ColumnStateChange> =
            state.iter().map(ColumnStateChange::from).collect();
        self.apply_column_state_changes(&changes)
    }

    /// Apply partial column state changes.
    ///
    /// Unknown column ids are an error. A change list naming every leaf column also
    /// sets the column order.
    pub fn apply_column_state_changes(&mut self, changes: &[ColumnStateChange]) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let next = apply_column_state_changes(&self.column_state, changes)?;
        if next == self.column_state {
            return Ok(());
        }
        self.column_state = next;
        self.trigger(&[Pass::ColumnState, Pass::RowHeight])
    }

    /// Feed the engine's column state back into declarative state.
    ///
    /// Engine-only columns are skipped, and flex columns never take their width from
    /// the engine.
    pub(super) fn note_ag_column_state_changed(&mut self, live: &[AgColumnState]) -> Result<()> {
        let changes: Vec<ColumnStateChange> = live
            .iter()
            .filter_map(|it| {
                let col = find_column(&self.columns, &it.col_id)?;
                let change = ColumnStateChange::new(it.col_id.clone())
                    .hidden(it.hide)
                    .pinned(it.pinned);
                Some(if col.is_flex() {
                    change
                } else {
                    change.width(it.width)
                })
            })
            .collect();
        self.apply_column_state_changes(&changes)
    }

    /// Record a user resize; the column is then left alone by managed autosizing.
    pub fn note_column_manually_sized(&mut self, col_id: &str, width: u32) -> Result<()> {
        let Some(col) = find_column(&self.columns, col_id) else {
            return Ok(());
        };
        if width == 0 || col.is_flex() {
            return Ok(());
        }
        self.apply_column_state_changes(&[ColumnStateChange::new(col_id)
            .width(width)
            .manually_sized(true)])
    }

    pub fn note_columns_autosized(&mut self, col_ids: &[String]) -> Result<()> {
        let changes: Vec<ColumnStateChange> = col_ids
            .iter()
            .map(|id| ColumnStateChange::new(id.clone()).manually_sized(false))
            .collect();
        self.apply_column_state_changes(&changes)?;
        self.autosize_state.sizing_mode = Some(self.config.sizing_mode);
        Ok(())
    }

    //------------------------
    // Passes
    //------------------------

    /// Replace engine column definitions, keeping the engine's filters.
    ///
    /// Expansion is not restored; new definitions imply a new row structure.
    pub(super) fn sync_columns(&mut self) -> Result<()> {
        let defs: Vec<ColumnDef> = self
            .column_state
            .iter()
            .filter_map(|state| {
                find_column(&self.columns, &state.col_id).map(|col| ColumnDef::new(col, Some(state)))
            })
            .collect();
        debug!(count = defs.len(), "pushing column definitions");
        self.ag
            .with_preserved_state(PreserveState::FILTERS, |api| api.set_column_defs(defs))
    }

    pub(super) fn sync_column_state(&mut self) -> Result<()> {
        let path = column_sync::sync_column_state(&mut self.ag, &self.column_state)?;
        if path == ColumnSyncPath::Reapply {
            debug!("column order changed, column state re-applied");
        }
        Ok(())
    }
}
