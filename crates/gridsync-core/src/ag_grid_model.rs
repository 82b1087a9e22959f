//! Façade over the live engine: reads and writes its state as serializable snapshots.
//!
//! `AgGridModel` never touches declarative grid state. Apart from the engine handle and
//! the last applied sorters it is stateless.

use std::collections::HashMap;

use gridsync_model::{AUTO_GROUP_COL_ID, ExpandState, GridSorter, RecordRef};
use tracing::{debug, warn};

use crate::api::{AgColumnState, FilterModel, GridApi, RowNode};
use crate::error::{GridError, Result};
use crate::state::{
    AgGridState, ColumnStateSnapshot, MiscState, PreserveState, SortColumnRef, SortStateEntry,
    StateCategory, StateExclusions,
};

#[derive(Default)]
pub struct AgGridModel {
    api: Option<Box<dyn GridApi>>,
    prev_sort_by: Option<Vec<GridSorter>>,
}

impl std::fmt::Debug for AgGridModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgGridModel")
            .field("instance_id", &self.api.as_ref().map(|api| api.instance_id()))
            .field("prev_sort_by", &self.prev_sort_by)
            .finish()
    }
}

impl AgGridModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.api.is_some()
    }

    /// Attach a live engine.
    ///
    /// Re-binding the same instance is a no-op; binding a different instance while bound
    /// fails with [`GridError::AlreadyBound`].
    pub fn bind(&mut self, api: Box<dyn GridApi>) -> Result<()> {
        if let Some(current) = &self.api {
            if current.instance_id() != api.instance_id() {
                return Err(GridError::AlreadyBound);
            }
            return Ok(());
        }
        debug!(instance_id = api.instance_id(), "grid engine bound");
        self.api = Some(api);
        self.prev_sort_by = None;
        Ok(())
    }

    pub fn unbind(&mut self) -> Option<Box<dyn GridApi>> {
        let api = self.api.take();
        if let Some(api) = &api {
            debug!(instance_id = api.instance_id(), "grid engine unbound");
        }
        self.prev_sort_by = None;
        api
    }

    pub fn api(&self) -> Result<&(dyn GridApi + 'static)> {
        self.api.as_deref().ok_or(GridError::NotReady)
    }

    pub fn api_mut(&mut self) -> Result<&mut (dyn GridApi + 'static)> {
        self.api.as_deref_mut().ok_or(GridError::NotReady)
    }

    //------------------------
    // Full state
    //------------------------

    /// Capture every included category. A failing category is logged and recorded in
    /// `errors` while the others are still captured.
    pub fn get_state(&self, exclude: &StateExclusions) -> Result<AgGridState> {
        self.api()?;
        let mut ret = AgGridState::default();
        for category in StateCategory::ALL {
            if !exclude.includes(category) {
                continue;
            }
            let captured = match category {
                StateCategory::Column => self
                    .get_column_state()
                    .map(|it| ret.column_state = Some(it)),
                StateCategory::Sort => self.get_sort_state().map(|it| ret.sort_state = Some(it)),
                StateCategory::Expand => self
                    .get_expand_state()
                    .map(|it| ret.expand_state = Some(it)),
                StateCategory::Filter => self
                    .get_filter_state()
                    .map(|it| ret.filter_state = Some(it)),
                StateCategory::Misc => self.get_misc_state().map(|it| ret.misc_state = Some(it)),
            };
            if let Err(err) = captured {
                warn!(?category, error = %err, "unable to capture grid state category");
                ret.errors.insert(category, err.to_string());
            }
        }
        Ok(ret)
    }

    /// Apply every category present in `state`.
    pub fn set_state(&mut self, state: &AgGridState) -> Result<()> {
        self.api()?;
        if let Some(column_state) = &state.column_state {
            self.set_column_state(column_state)?;
        }
        if let Some(sort_state) = &state.sort_state {
            self.set_sort_state(sort_state)?;
        }
        if let Some(expand_state) = &state.expand_state {
            self.set_expand_state(expand_state)?;
        }
        if let Some(filter_state) = &state.filter_state {
            self.set_filter_state(filter_state.clone())?;
        }
        if let Some(misc_state) = &state.misc_state {
            self.set_misc_state(misc_state)?;
        }
        Ok(())
    }

    //------------------------
    // Columns
    //------------------------

    pub fn get_column_state(&self) -> Result<ColumnStateSnapshot> {
        let api = self.api()?;
        Ok(ColumnStateSnapshot {
            is_pivot: api.is_pivot_mode(),
            columns: api
                .column_state()
                .into_iter()
                .map(AgColumnState::without_sort)
                .collect(),
        })
    }

    /// Restore a column layout. Ids the engine does not know are dropped, and the
    /// engine's current sort is kept.
    pub fn set_column_state(&mut self, snapshot: &ColumnStateSnapshot) -> Result<()> {
        let api = self.api_mut()?;
        let live = api.column_state();

        api.set_pivot_mode(snapshot.is_pivot);

        let drop_auto_group =
            snapshot.is_pivot && snapshot.columns.iter().any(|it| it.pivot_index.is_some());
        let columns: Vec<AgColumnState> = snapshot
            .columns
            .iter()
            .filter(|it| !(drop_auto_group && it.col_id == AUTO_GROUP_COL_ID))
            .filter_map(|it| {
                if it.col_id == AUTO_GROUP_COL_ID {
                    return Some(it.clone());
                }
                let current = live.iter().find(|c| c.col_id == it.col_id)?;
                Some(AgColumnState {
                    sort: current.sort,
                    sort_index: current.sort_index,
                    sort_abs: current.sort_abs,
                    ..it.clone()
                })
            })
            .collect();

        api.apply_column_state(columns, true);
        Ok(())
    }

    //------------------------
    // Sort
    //------------------------

    pub fn get_sort_state(&self) -> Result<Vec<SortStateEntry>> {
        let api = self.api()?;
        let mut ret: Vec<SortStateEntry> = api
            .column_state()
            .into_iter()
            .filter_map(|it| {
                it.sort.map(|sort| SortStateEntry {
                    col_id: SortColumnRef::Primary(it.col_id),
                    sort,
                    sort_index: it.sort_index,
                })
            })
            .collect();

        if api.is_pivot_mode() {
            ret.extend(api.pivot_result_columns().into_iter().filter_map(|it| {
                it.sort.map(|sort| SortStateEntry {
                    col_id: SortColumnRef::Secondary(it.pivot_keys, it.value_col_id),
                    sort,
                    sort_index: None,
                })
            }));
        }
        Ok(ret)
    }

    /// Restore sort state.
    ///
    /// Pivot result columns cannot be sorted through bulk column state. Their sorts are
    /// first all cleared, then set one by one. Primary columns are then sorted in bulk,
    /// clearing any column not listed.
    pub fn set_sort_state(&mut self, entries: &[SortStateEntry]) -> Result<()> {
        let api = self.api_mut()?;
        let (secondary, primary): (Vec<&SortStateEntry>, Vec<&SortStateEntry>) = entries
            .iter()
            .partition(|it| matches!(it.col_id, SortColumnRef::Secondary(..)));

        let pivot_cols = api.pivot_result_columns();
        if api.is_pivot_mode() && !pivot_cols.is_empty() && !secondary.is_empty() {
            api.set_column_sort(AUTO_GROUP_COL_ID, None);
            for col in &pivot_cols {
                api.set_column_sort(&col.col_id, None);
            }
            for entry in secondary {
                let SortColumnRef::Secondary(keys, value_col_id) = &entry.col_id else {
                    continue;
                };
                match pivot_cols
                    .iter()
                    .find(|it| &it.pivot_keys == keys && &it.value_col_id == value_col_id)
                {
                    Some(col) => {
                        api.set_column_sort(&col.col_id, Some(entry.sort));
                    }
                    None => warn!(
                        pivot_keys = ?keys,
                        value_col_id = %value_col_id,
                        "could not find pivot column to restore sort"
                    ),
                }
            }
        }

        let state = api
            .column_state()
            .into_iter()
            .map(|col| {
                let entry = primary
                    .iter()
                    .find(|it| matches!(&it.col_id, SortColumnRef::Primary(id) if *id == col.col_id));
                match entry {
                    Some(entry) => AgColumnState {
                        sort: Some(entry.sort),
                        sort_index: entry.sort_index,
                        ..col
                    },
                    None => col.without_sort(),
                }
            })
            .collect();
        api.apply_column_state(state, false);
        api.on_sort_changed();
        Ok(())
    }

    /// Push declarative sorters to the engine.
    ///
    /// Unchanged sorter lists are skipped. When only the absolute-value flag of a sorter
    /// flips, the engine would not notice a change, so all sorts are cleared first and
    /// rows redrawn after. Sorters for columns the engine does not know are skipped.
    pub fn apply_sort_by(&mut self, sorters: &[GridSorter]) -> Result<()> {
        let Some(api) = self.api.as_deref_mut() else {
            return Err(GridError::NotReady);
        };
        if self.prev_sort_by.as_deref() == Some(sorters) {
            return Ok(());
        }

        let abs_toggled = self.prev_sort_by.as_ref().is_some_and(|prev| {
            sorters.iter().any(|sorter| {
                prev.iter().any(|it| {
                    it.col_id == sorter.col_id && it.sort == sorter.sort && it.abs != sorter.abs
                })
            })
        });

        if abs_toggled {
            let cleared = api
                .column_state()
                .into_iter()
                .map(AgColumnState::without_sort)
                .collect();
            api.apply_column_state(cleared, false);
        }

        let mut state: Vec<AgColumnState> = api
            .column_state()
            .into_iter()
            .map(AgColumnState::without_sort)
            .collect();
        let mut sort_index = 0;
        for sorter in sorters {
            let Some(col) = state.iter_mut().find(|it| it.col_id == sorter.col_id) else {
                debug!(col_id = %sorter.col_id, "sorter column not present in engine, skipped");
                continue;
            };
            col.sort = Some(sorter.sort);
            col.sort_index = Some(sort_index);
            col.sort_abs = sorter.abs;
            sort_index += 1;
        }
        api.apply_column_state(state, false);

        if abs_toggled {
            api.redraw_rows();
        }
        self.prev_sort_by = Some(sorters.to_vec());
        Ok(())
    }

    //------------------------
    // Expansion
    //------------------------

    /// Expanded nodes keyed by path.
    ///
    /// A node is recorded only if its parent is recorded, so expansions hidden under a
    /// collapsed ancestor are left out.
    pub fn get_expand_state(&self) -> Result<ExpandState> {
        let nodes = self.api()?.nodes();
        let by_id: HashMap<&str, &RowNode> =
            nodes.iter().map(|it| (it.id.as_str(), it)).collect();

        let mut ret = ExpandState::new();
        for node in &nodes {
            if node.has_children && node.expanded {
                ret.insert_path(&node_path(node, &by_id));
            }
        }
        Ok(ret)
    }

    /// Expand every node whose path is present in `state`.
    pub fn set_expand_state(&mut self, state: &ExpandState) -> Result<()> {
        let api = self.api_mut()?;
        let nodes = api.nodes();
        let by_id: HashMap<&str, &RowNode> =
            nodes.iter().map(|it| (it.id.as_str(), it)).collect();

        let mut changed = false;
        for node in &nodes {
            if node.has_children && state.contains_path(&node_path(node, &by_id)) {
                api.set_row_expanded(&node.id, true);
                changed = true;
            }
        }
        if changed {
            api.on_group_expanded_or_collapsed();
        }
        Ok(())
    }

    //------------------------
    // Filters and misc
    //------------------------

    pub fn get_filter_state(&self) -> Result<FilterModel> {
        Ok(self.api()?.filter_model()?)
    }

    pub fn set_filter_state(&mut self, model: FilterModel) -> Result<()> {
        let api = self.api_mut()?;
        api.set_filter_model(model)?;
        api.on_filter_changed();
        Ok(())
    }

    pub fn get_misc_state(&self) -> Result<MiscState> {
        Ok(MiscState {
            opened_tool_panel: self.api()?.opened_tool_panel(),
        })
    }

    pub fn set_misc_state(&mut self, state: &MiscState) -> Result<()> {
        self.api_mut()?
            .open_tool_panel(state.opened_tool_panel.as_deref());
        Ok(())
    }

    /// Run `f` against the engine, restoring filters and/or expansion afterwards.
    pub fn with_preserved_state(
        &mut self,
        preserve: PreserveState,
        f: impl FnOnce(&mut dyn GridApi),
    ) -> Result<()> {
        let filters = if preserve.filters {
            Some(self.get_filter_state()?)
        } else {
            None
        };
        let expansion = if preserve.expansion {
            Some(self.get_expand_state()?)
        } else {
            None
        };

        f(self.api_mut()?);

        if let Some(filters) = filters {
            self.set_filter_state(filters)?;
        }
        if let Some(expansion) = expansion {
            self.set_expand_state(&expansion)?;
        }
        Ok(())
    }

    //------------------------
    // Selection
    //------------------------

    pub fn get_selected_row_node_ids(&self) -> Result<Vec<String>> {
        Ok(self.api()?.selected_ids())
    }

    /// Replace the selection. Ids without a live row are skipped.
    pub fn set_selected_row_node_ids(&mut self, ids: &[String]) -> Result<()> {
        let api = self.api_mut()?;
        api.deselect_all();
        for id in ids {
            if api.row_node(id).is_some() {
                api.select_node(id);
            }
        }
        Ok(())
    }

    /// First node backed by a record, in filtered and sorted order.
    pub fn get_first_selectable_row_node(&self) -> Result<Option<RowNode>> {
        Ok(self
            .api()?
            .nodes_after_filter_and_sort()
            .into_iter()
            .find(|it| it.record.is_some()))
    }

    //------------------------
    // Pinned rows
    //------------------------

    pub fn get_pinned_top_row_data(&self) -> Result<Vec<RecordRef>> {
        Ok(self.api()?.pinned_top_rows())
    }

    pub fn set_pinned_top_row_data(&mut self, rows: Vec<RecordRef>) -> Result<()> {
        self.api_mut()?.set_pinned_top_rows(rows);
        Ok(())
    }

    pub fn get_pinned_bottom_row_data(&self) -> Result<Vec<RecordRef>> {
        Ok(self.api()?.pinned_bottom_rows())
    }

    pub fn set_pinned_bottom_row_data(&mut self, rows: Vec<RecordRef>) -> Result<()> {
        self.api_mut()?.set_pinned_bottom_rows(rows);
        Ok(())
    }
}

/// Keys from the top level down to `node`, built by walking parent links.
fn node_path(node: &RowNode, by_id: &HashMap<&str, &RowNode>) -> Vec<String> {
    let mut path = vec![node.key.clone()];
    let mut parent = node.parent_id.as_deref().and_then(|id| by_id.get(id));
    while let Some(it) = parent {
        path.push(it.key.clone());
        parent = it.parent_id.as_deref().and_then(|id| by_id.get(id));
    }
    path.reverse();
    path
}
