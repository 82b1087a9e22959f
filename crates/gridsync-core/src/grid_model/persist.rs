//! Grid layout state suitable for saving between sessions.

use gridsync_model::{
    AutosizeMode, AutosizeOverrides, ColumnNode, ColumnState, GridSorter, GridSorterLike,
    remove_transient_widths,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

use super::GridModel;

/// Columns, sort and grouping of a grid, as saved by an application.
///
/// Sorters serialize as their compact string form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridPersistState {
    pub columns: Vec<ColumnState>,
    pub sort_by: Vec<GridSorter>,
    pub group_by: Vec<String>,
}

/// Layout a grid was created with.
#[derive(Debug, Clone, Default)]
pub(super) struct GridDefaults {
    pub columns: Vec<ColumnNode>,
    pub sort_by: Vec<GridSorter>,
    pub group_by: Vec<String>,
}

impl GridModel {
    /// Initial sort, brought back by [`restore_defaults`](Self::restore_defaults).
    pub fn with_sort_by<S>(mut self, sorters: impl IntoIterator<Item = S>) -> Result<Self>
    where
        S: Into<GridSorterLike>,
    {
        self.set_sort_by(sorters)?;
        self.defaults.sort_by = self.sort_by.clone();
        Ok(self)
    }

    /// Initial grouping, brought back by [`restore_defaults`](Self::restore_defaults).
    pub fn with_group_by<S: Into<String>>(
        mut self,
        col_ids: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        self.set_group_by(col_ids)?;
        self.defaults.group_by = self.group_by.clone();
        Ok(self)
    }

    /// Widths of columns users cannot resize are left out.
    pub fn persistable_state(&self) -> GridPersistState {
        let mut columns = self.column_state.clone();
        remove_transient_widths(&mut columns, &self.columns);
        GridPersistState {
            columns,
            sort_by: self.sort_by.clone(),
            group_by: self.group_by.clone(),
        }
    }

    /// Restore saved state.
    ///
    /// Saved state may predate the current columns: missing column entries are dropped
    /// and new columns keep their defaults, a sort naming a removed column is ignored,
    /// and grouping by a removed column ungroups the grid.
    pub fn restore_state(&mut self, state: &GridPersistState) -> Result<()> {
        self.set_column_state(&state.columns)?;
        self.set_sort_by(state.sort_by.iter().cloned())?;
        self.set_group_by(state.group_by.iter().cloned())
    }

    /// Put back the columns, sort and grouping the grid was created with and drop the
    /// filter. Managed grids are autosized again.
    pub fn restore_defaults(&mut self) -> Result<()> {
        debug!("restoring default grid layout");
        let defaults = self.defaults.clone();
        self.set_columns(defaults.columns)?;
        self.set_sort_by(defaults.sort_by)?;
        self.set_group_by(defaults.group_by)?;
        self.set_filter(None)?;
        if self.config.autosize.mode == AutosizeMode::Managed {
            self.autosize(&AutosizeOverrides::default())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use gridsync_model::SortDirection;

    use super::*;

    #[test]
    fn persisted_state_json() {
        let state = GridPersistState {
            columns: vec![],
            sort_by: vec![
                GridSorter::desc("price"),
                GridSorter::new("delta", SortDirection::Asc, true),
            ],
            group_by: vec!["region".into()],
        };
        let json = serde_json::to_string(&state).expect("serialize");
        assert_eq!(
            json,
            r#"{"columns":[],"sort_by":["price|desc","delta|asc|abs"],"group_by":["region"]}"#
        );
        let back: GridPersistState = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, state);
    }

    #[test]
    fn missing_fields_default() {
        let state: GridPersistState = serde_json::from_str("{}").expect("parse");
        assert_eq!(state, GridPersistState::default());
    }
}
