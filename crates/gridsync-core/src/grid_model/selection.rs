//! Record selection and scrolling records into view.

use std::collections::{BTreeSet, HashMap};

use gridsync_model::{RecordId, grid_id_for};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::scheduler::Pass;

use super::GridModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectOptions {
    /// Expand and scroll so the selection can be seen.
    pub ensure_visible: bool,
    /// Replace the current selection rather than adding to it.
    pub clear_selection: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        Self {
            ensure_visible: true,
            clear_selection: true,
        }
    }
}

impl GridModel {
    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }

    /// Select records by id. Ids not in the filtered store are ignored.
    pub fn select<I: Into<RecordId>>(
        &mut self,
        ids: impl IntoIterator<Item = I>,
        options: SelectOptions,
    ) -> Result<()> {
        let mut next = if options.clear_selection {
            Vec::new()
        } else {
            self.selection.clone()
        };
        for id in ids {
            let id: RecordId = id.into();
            if self.store.filtered().contains(&id) && !next.contains(&id) {
                next.push(id);
            }
        }
        self.selection = next;
        self.trigger(&[Pass::Selection])?;
        if options.ensure_visible {
            self.ensure_selection_visible()?;
        }
        Ok(())
    }

    /// Select the first row backed by a record, in displayed sort order.
    pub fn select_first(&mut self, ensure_visible: bool) -> Result<()> {
        if !self.ag.is_ready() {
            return Ok(());
        }
        let first = self
            .ag
            .get_first_selectable_row_node()?
            .and_then(|node| node.record)
            .map(|rec| rec.id().clone());
        if let Some(id) = first {
            self.select(
                [id],
                SelectOptions {
                    ensure_visible,
                    clear_selection: true,
                },
            )?;
        }
        Ok(())
    }

    /// Select the first row unless something is already selected.
    pub fn pre_select_first(&mut self) -> Result<()> {
        if self.has_selection() {
            return Ok(());
        }
        self.select_first(true)
    }

    pub fn clear_selection(&mut self) -> Result<()> {
        if self.selection.is_empty() {
            return Ok(());
        }
        self.selection.clear();
        self.trigger(&[Pass::Selection])
    }

    pub fn ensure_selection_visible(&mut self) -> Result<()> {
        if !self.ag.is_ready() {
            return Ok(());
        }
        let ids = self.selection.clone();
        self.ensure_records_visible(&ids)
    }

    /// Scroll so the given records can be seen.
    ///
    /// Collapsed ancestors are expanded first. With several records, the last row is
    /// scrolled to and then the first, showing the start of the range and as much of
    /// the rest as fits.
    pub fn ensure_records_visible(&mut self, ids: &[RecordId]) -> Result<()> {
        let api = self.ag.api_mut()?;
        let grid_ids: Vec<String> = ids.iter().map(grid_id_for).collect();

        let mut expanded_any = false;
        for grid_id in &grid_ids {
            let mut parent = api.row_node(grid_id).and_then(|it| it.parent_id);
            while let Some(parent_id) = parent {
                let Some(node) = api.row_node(&parent_id) else {
                    break;
                };
                if !node.expanded {
                    api.set_row_expanded(&node.id, true);
                    expanded_any = true;
                }
                parent = node.parent_id;
            }
        }
        if expanded_any {
            api.on_group_expanded_or_collapsed();
        }

        let indexes: Vec<usize> = grid_ids
            .iter()
            .filter_map(|id| api.row_node(id).and_then(|it| it.row_index))
            .collect();
        if indexes.len() != grid_ids.len() {
            warn!(
                requested = grid_ids.len(),
                found = indexes.len(),
                "grid row nodes not found for all provided records"
            );
        }

        match (indexes.iter().min(), indexes.iter().max()) {
            (Some(&min), Some(&max)) if min == max => api.ensure_index_visible(min),
            (Some(&min), Some(&max)) => {
                api.ensure_index_visible(max);
                api.ensure_index_visible(min);
            }
            _ => {}
        }

        if expanded_any {
            self.note_expand_state_changed()?;
        }
        Ok(())
    }

    //------------------------
    // Passes
    //------------------------

    /// Push declarative selection to the engine, unless the engine already has it.
    pub(super) fn sync_selection(&mut self) -> Result<()> {
        let filtered = self.store.filtered();
        let declared: Vec<String> = self
            .selection
            .iter()
            .filter(|id| filtered.contains(id))
            .map(grid_id_for)
            .collect();
        let live: BTreeSet<String> = self.ag.get_selected_row_node_ids()?.into_iter().collect();
        if declared.iter().cloned().collect::<BTreeSet<_>>() == live {
            return Ok(());
        }
        self.ag.set_selected_row_node_ids(&declared)
    }

    /// Pull the engine's selection into declarative state, then re-assert it.
    pub(super) fn sync_native_selection(&mut self) -> Result<()> {
        let by_grid_id: HashMap<String, &RecordId> = self
            .store
            .filtered()
            .list()
            .iter()
            .map(|rec| (rec.grid_id(), rec.id()))
            .collect();
        let live: Vec<RecordId> = self
            .ag
            .get_selected_row_node_ids()?
            .iter()
            .filter_map(|id| by_grid_id.get(id).map(|it| (*it).clone()))
            .collect();

        let current: BTreeSet<&RecordId> = self.selection.iter().collect();
        if live.iter().collect::<BTreeSet<_>>() != current {
            self.selection = live;
        }
        self.sync_selection()
    }
}
