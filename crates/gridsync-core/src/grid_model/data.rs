//! Row data: store mutations and the diff-and-patch data pass.

use std::sync::Arc;

use gridsync_model::{
    AutosizeMode, AutosizeOverrides, Filter, Record, RecordRef, ShowSummary, StoreUpdate,
    Transaction, gather_leaves,
};
use tracing::debug;

use crate::error::Result;
use crate::scheduler::Pass;

use super::GridModel;

impl GridModel {
    //------------------------
    // Store
    //------------------------

    /// Replace all records.
    pub fn load_data(&mut self, records: impl IntoIterator<Item = Record>) -> Result<()> {
        if self.store.load_data(records)? {
            self.trigger(&[Pass::Data])?;
        }
        Ok(())
    }

    pub fn update_data(&mut self, update: StoreUpdate) -> Result<()> {
        if self.store.update_data(update)? {
            self.trigger(&[Pass::Data])?;
        }
        Ok(())
    }

    /// Remove all records.
    pub fn clear(&mut self) -> Result<()> {
        self.load_data(std::iter::empty())
    }

    pub fn set_filter(&mut self, filter: Option<Filter>) -> Result<()> {
        let before = Arc::clone(self.store.filtered());
        self.store.set_filter(filter);
        if !Arc::ptr_eq(&before, self.store.filtered()) {
            self.trigger(&[Pass::Data])?;
        }
        Ok(())
    }

    pub fn set_summary(&mut self, summary: Option<Record>) -> Result<()> {
        let before = self.store.summary().cloned();
        self.store.set_summary(summary);
        let changed = match (&before, self.store.summary()) {
            (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
            (None, None) => false,
            _ => true,
        };
        if changed {
            self.trigger(&[Pass::Data])?;
        }
        Ok(())
    }

    //------------------------
    // Data pass
    //------------------------

    /// Bring the engine's rows in line with the store.
    ///
    /// The first load replaces all rows; later loads send only a transaction, and
    /// nothing when it is empty. Updated rows are force-refreshed in visible complex
    /// columns. Selection is re-asserted on the next tick when rows were added or
    /// removed, as the engine may have dropped selected rows.
    pub(super) fn sync_data(&mut self) -> Result<()> {
        let next = Arc::clone(self.store.filtered());
        self.prune_selection();

        let transaction = match self.prev_rs.as_deref() {
            Some(prev) => {
                let transaction = Transaction::between(&next, Some(prev));
                debug!(transaction = %transaction, "row data transaction");
                if !transaction.is_empty() {
                    self.ag.api_mut()?.apply_transaction(&transaction);
                }
                Some(transaction)
            }
            None => {
                debug!(count = next.count(), "row data replaced");
                self.ag.api_mut()?.set_row_data(next.list());
                None
            }
        };

        if self.config.external_sort {
            self.ag.apply_sort_by(&self.sort_by)?;
        }

        self.sync_summary_rows()?;

        if let Some(transaction) = &transaction {
            if !transaction.update.is_empty() {
                self.refresh_updated_rows(&transaction.update)?;
            }
        }

        if transaction.as_ref().is_none_or(Transaction::is_structural) {
            self.scheduler.defer(Pass::Selection);
        }

        if self.config.autosize.mode == AutosizeMode::Managed {
            let overrides = if self.autosize_state.sizing_mode == Some(self.config.sizing_mode) {
                AutosizeOverrides::columns(
                    self.column_state
                        .iter()
                        .filter(|it| !it.manually_sized)
                        .map(|it| it.col_id.clone()),
                )
            } else {
                AutosizeOverrides::default()
            };
            self.autosize(&overrides)?;
        }

        self.note_expand_state_changed()?;
        self.prev_rs = Some(next);
        self.apply_scroll_optimization()
    }

    /// Pin the store's summary record top or bottom, keeping other pinned rows.
    fn sync_summary_rows(&mut self) -> Result<()> {
        let summary = self.store.summary().cloned();
        let is_summary = |rec: &RecordRef| {
            rec.is_summary() || summary.as_ref().is_some_and(|it| it.id() == rec.id())
        };

        let mut top: Vec<RecordRef> = self
            .ag
            .get_pinned_top_row_data()?
            .into_iter()
            .filter(|it| !is_summary(it))
            .collect();
        let mut bottom: Vec<RecordRef> = self
            .ag
            .get_pinned_bottom_row_data()?
            .into_iter()
            .filter(|it| !is_summary(it))
            .collect();

        if let Some(summary) = summary {
            match self.config.show_summary {
                ShowSummary::Top => top.insert(0, summary),
                ShowSummary::Bottom => bottom.push(summary),
                ShowSummary::None => {}
            }
        }

        self.ag.set_pinned_top_row_data(top)?;
        self.ag.set_pinned_bottom_row_data(bottom)
    }

    fn refresh_updated_rows(&mut self, updated: &[RecordRef]) -> Result<()> {
        let col_ids = self.visible_complex_col_ids();
        if col_ids.is_empty() {
            return Ok(());
        }
        let row_ids: Vec<String> = updated.iter().map(|it| it.grid_id()).collect();
        self.ag.api_mut()?.refresh_cells(&row_ids, &col_ids, true);
        Ok(())
    }

    /// Force-refresh every visible column with a complex renderer, e.g. after
    /// validation state that renderers read has changed.
    pub fn refresh_complex_cells(&mut self) -> Result<()> {
        let col_ids = self.visible_complex_col_ids();
        if col_ids.is_empty() {
            return Ok(());
        }
        self.ag.api_mut()?.refresh_cells(&[], &col_ids, true);
        Ok(())
    }

    fn visible_complex_col_ids(&self) -> Vec<String> {
        gather_leaves(&self.columns)
            .into_iter()
            .filter(|col| col.renderer_is_complex && self.is_column_visible(&col.col_id))
            .map(|col| col.col_id.clone())
            .collect()
    }

    /// Drop selected ids whose records are no longer shown.
    fn prune_selection(&mut self) {
        let filtered = self.store.filtered();
        self.selection.retain(|id| filtered.contains(id));
    }
}
