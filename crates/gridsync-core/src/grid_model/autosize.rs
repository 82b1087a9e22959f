//! Autosizing columns to their content.
//!
//! A request gathers the records to size and snapshots the filtered record set, then
//! each tick measures one column. The job is dropped as soon as the store's filtered
//! records are no longer the snapshot, so widths are never applied for stale data.

use std::collections::VecDeque;
use std::sync::Arc;

use gridsync_autosize::{SizingContext, calc_fill_widths};
use gridsync_model::{
    AutosizeMode, AutosizeOptions, AutosizeOverrides, ColumnStateChange, RecordRef, ShowSummary,
    find_column,
};
use tracing::debug;

use crate::autosize::{AutosizeJob, AutosizeOutcome, AutosizeRequest};
use crate::error::Result;

use super::GridModel;

impl GridModel {
    /// Start autosizing columns, merging `overrides` onto the configured options.
    ///
    /// Requested columns are narrowed to visible, autosizable, non-flex columns in
    /// column order. A request made while a job for the current data and sizing mode is
    /// running joins that job; a stale job is discarded and replaced. Widths are
    /// measured on later [`tick`](Self::tick)s.
    pub fn autosize(&mut self, overrides: &AutosizeOverrides) -> Result<AutosizeRequest> {
        let options = self.config.autosize.merged(overrides);
        if options.mode == AutosizeMode::Disabled {
            return Ok(AutosizeRequest::Skipped);
        }
        if let Some(job) = self.autosizer.job.take() {
            if job.is_current(self.store.filtered(), self.config.sizing_mode) {
                debug!("autosize already running, request joined");
                self.autosizer.job = Some(job);
                return Ok(AutosizeRequest::Joined);
            }
            debug!("running autosize is stale, replacing it");
            self.finish_autosize(job, false)?;
        }
        if !self.ag.is_ready() {
            return Ok(AutosizeRequest::Skipped);
        }

        let col_ids = self.autosize_col_ids(&options);
        if col_ids.is_empty() {
            return Ok(AutosizeRequest::Skipped);
        }
        let records = self.gather_records_to_size(&options)?;
        if records.is_empty() {
            debug!("autosize skipped, no records to size");
            return Ok(AutosizeRequest::Skipped);
        }

        if options.show_mask {
            self.ag.api_mut()?.show_loading_overlay();
        }
        debug!(columns = col_ids.len(), records = records.len(), "autosize started");
        self.autosizer.job = Some(AutosizeJob {
            remaining: col_ids.iter().cloned().collect::<VecDeque<_>>(),
            col_ids,
            records,
            snapshot: Arc::clone(self.store.filtered()),
            sizing_mode: self.config.sizing_mode,
            widths: Vec::new(),
            options,
        });
        Ok(AutosizeRequest::Started)
    }

    /// Autosize and run the job to completion.
    pub fn autosize_blocking(
        &mut self,
        overrides: &AutosizeOverrides,
    ) -> Result<Option<AutosizeOutcome>> {
        if self.autosize(overrides)? == AutosizeRequest::Skipped {
            return Ok(None);
        }
        while self.autosizer.is_running() {
            self.step_autosize()?;
        }
        self.run_pending()?;
        Ok(self.autosizer.last_outcome.clone())
    }

    fn autosize_col_ids(&self, options: &AutosizeOptions) -> Vec<String> {
        let requested: Vec<String> = match &options.columns {
            Some(ids) => ids.clone(),
            None => self.column_state.iter().map(|it| it.col_id.clone()).collect(),
        };
        let mut ret: Vec<(usize, String)> = requested
            .into_iter()
            .filter(|id| self.is_column_visible(id))
            .filter(|id| {
                find_column(&self.columns, id).is_some_and(|col| col.is_autosizable() && !col.is_flex())
            })
            .filter_map(|id| {
                let pos = self.column_state.iter().position(|it| it.col_id == id)?;
                Some((pos, id))
            })
            .collect();
        ret.sort_by_key(|(pos, _)| *pos);
        ret.dedup_by(|a, b| a.0 == b.0);
        ret.into_iter().map(|(_, id)| id).collect()
    }

    /// Records whose values should fit: rendered rows only, displayed rows only for
    /// grouped or tree grids not sizing collapsed children, the engine's filtered rows,
    /// or every record. The shown summary record is always included.
    fn gather_records_to_size(&self, options: &AutosizeOptions) -> Result<Vec<RecordRef>> {
        let api = self.ag.api()?;
        let include_collapsed = options.include_collapsed_children.unwrap_or(false);
        let nested = self.config.tree_mode || !self.group_by.is_empty();

        let nodes = if options.rendered_rows_only {
            Some(api.rendered_rows())
        } else if !include_collapsed && nested {
            Some(api.displayed_rows())
        } else if api.is_any_filter_present() {
            Some(api.nodes_after_filter())
        } else {
            None
        };

        let mut ret: Vec<RecordRef> = match nodes {
            Some(nodes) => nodes
                .into_iter()
                .filter_map(|node| node.record)
                .filter_map(|rec| self.store.all().get_by_id(rec.id()).cloned())
                .collect(),
            None => self.store.all().list().to_vec(),
        };

        if self.config.show_summary != ShowSummary::None {
            if let Some(summary) = self.store.summary() {
                ret.push(Arc::clone(summary));
            }
        }
        Ok(ret)
    }

    /// Measure the next column of the running job, finishing it after the last one.
    pub(super) fn step_autosize(&mut self) -> Result<()> {
        let Some(mut job) = self.autosizer.job.take() else {
            return Ok(());
        };

        if !job.is_current(self.store.filtered(), self.config.sizing_mode) {
            debug!("autosize aborted, grid data or sizing mode is obsolete");
            return self.finish_autosize(job, false);
        }

        if let Some(col_id) = job.remaining.pop_front() {
            if let Some(col) = find_column(&self.columns, &col_id) {
                let tree = (self.config.tree_mode && self.store.all().is_hierarchical())
                    .then(|| job.snapshot.as_ref());
                let ctx = SizingContext {
                    sizing_mode: self.config.sizing_mode,
                    sort_by: &self.sort_by,
                    filter: self.store.filter(),
                    header_menu_display: self.config.header_menu_display,
                    tree,
                    buffer_px: job.options.buffer_px(self.config.platform),
                    row_class: self.row_class.as_deref(),
                };
                if let Some(width) = self.autosizer.calculator.calc_width(col, &job.records, &ctx)
                {
                    job.widths.push(ColumnStateChange::new(col_id).width(width));
                }
            }
        }

        if job.is_done() {
            return self.finish_autosize(job, true);
        }
        self.autosizer.job = Some(job);
        Ok(())
    }

    fn finish_autosize(&mut self, job: AutosizeJob, current: bool) -> Result<()> {
        let outcome = if current {
            self.apply_autosize(&job)?
        } else {
            AutosizeOutcome::Discarded {
                col_ids: job.col_ids.clone(),
            }
        };

        if job.options.show_mask {
            let api = self.ag.api_mut()?;
            if self.store.all().is_empty() {
                api.show_no_rows_overlay();
            } else {
                api.hide_overlay();
            }
        }
        self.autosizer.last_outcome = Some(outcome);
        Ok(())
    }

    fn apply_autosize(&mut self, job: &AutosizeJob) -> Result<AutosizeOutcome> {
        self.apply_column_state_changes(&job.widths)?;
        debug!(
            columns = job.widths.len(),
            records = job.records.len(),
            "autosized columns"
        );

        let available = self.ag.api()?.viewport_width();
        let fill = calc_fill_widths(
            &self.column_state,
            &self.columns,
            &job.col_ids,
            job.options.effective_fill_mode(),
            available,
        );
        self.apply_column_state_changes(&fill)?;
        self.note_columns_autosized(&job.col_ids)?;

        let mut changes = job.widths.clone();
        changes.extend(fill);
        Ok(AutosizeOutcome::Applied {
            col_ids: job.col_ids.clone(),
            changes,
        })
    }
}
