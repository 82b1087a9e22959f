//! Declarative grid state, reconciled against a live engine.
//!
//! [`GridModel`] owns the canonical column state, sort, grouping, selection and
//! expansion. Every change triggers a named [`Pass`] that pushes the minimum set of
//! engine calls; engine events are drained between passes and fed back into declarative
//! state, ignoring the echoes of our own pushes.

mod autosize;
mod columns;
mod data;
mod events;
mod expansion;
mod persist;
mod row_height;
mod selection;

use std::sync::Arc;

use gridsync_autosize::{ColumnWidthCalculator, RowClassFn};
use gridsync_model::{
    AutosizeState, ColumnNode, ColumnState, ExpandState, GridConfig, GridSorter, Record, RecordId,
    RecordSet, SizingMode, Store, initial_column_state, validate_columns,
};
use tracing::{debug, trace, warn};

use crate::ag_grid_model::AgGridModel;
use crate::api::GridApi;
use crate::autosize::{AutosizeOutcome, Autosizer};
use crate::error::Result;
use crate::scheduler::{Pass, Scheduler};

use persist::GridDefaults;

pub use persist::GridPersistState;
pub use row_height::RowHeightKey;
pub use selection::SelectOptions;

/// Passes run per [`GridModel::run_pending`] before giving up on settling.
const MAX_PASS_RUNS: usize = 64;

/// Ticks run per [`GridModel::settle`] before giving up.
const MAX_SETTLE_TICKS: usize = 256;

pub struct GridModel {
    config: GridConfig,
    store: Store,
    columns: Vec<ColumnNode>,
    column_state: Vec<ColumnState>,
    sort_by: Vec<GridSorter>,
    group_by: Vec<String>,
    selection: Vec<RecordId>,
    expand_state: ExpandState,
    expand_level: Option<usize>,
    autosize_state: AutosizeState,
    ag: AgGridModel,
    scheduler: Scheduler,
    /// Record set last pushed to the engine.
    prev_rs: Option<Arc<RecordSet>>,
    applied_row_heights: Option<RowHeightKey>,
    autosizer: Autosizer,
    row_class: Option<Arc<RowClassFn>>,
    defaults: GridDefaults,
}

impl std::fmt::Debug for GridModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridModel")
            .field("config", &self.config)
            .field("column_state", &self.column_state)
            .field("sort_by", &self.sort_by)
            .field("group_by", &self.group_by)
            .field("selection", &self.selection)
            .field("ag", &self.ag)
            .field("autosizing", &self.autosizer.is_running())
            .finish_non_exhaustive()
    }
}

impl GridModel {
    /// Model for `columns`; column ids must be unique.
    pub fn new(config: GridConfig, columns: Vec<ColumnNode>) -> Result<Self> {
        validate_columns(&columns, config.tree_mode)?;
        let column_state = initial_column_state(&columns);
        let defaults = GridDefaults {
            columns: columns.clone(),
            ..Default::default()
        };
        Ok(Self {
            config,
            store: Store::new(),
            columns,
            column_state,
            sort_by: Vec::new(),
            group_by: Vec::new(),
            selection: Vec::new(),
            expand_state: ExpandState::new(),
            expand_level: None,
            autosize_state: AutosizeState::default(),
            ag: AgGridModel::new(),
            scheduler: Scheduler::new(),
            prev_rs: None,
            applied_row_heights: None,
            autosizer: Autosizer::new(ColumnWidthCalculator::default()),
            row_class: None,
            defaults,
        })
    }

    #[must_use]
    pub fn with_calculator(mut self, calculator: ColumnWidthCalculator) -> Self {
        self.autosizer = Autosizer::new(calculator);
        self
    }

    /// Row classes applied to every row, taken into account when measuring cells.
    #[must_use]
    pub fn with_row_class(
        mut self,
        row_class: impl Fn(&Record) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        self.row_class = Some(Arc::new(row_class));
        self
    }

    //------------------------
    // Accessors
    //------------------------

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn columns(&self) -> &[ColumnNode] {
        &self.columns
    }

    pub fn column_state(&self) -> &[ColumnState] {
        &self.column_state
    }

    pub fn sort_by(&self) -> &[GridSorter] {
        &self.sort_by
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    pub fn selection(&self) -> &[RecordId] {
        &self.selection
    }

    pub fn expand_state(&self) -> &ExpandState {
        &self.expand_state
    }

    pub fn expand_level(&self) -> Option<usize> {
        self.expand_level
    }

    pub fn autosize_state(&self) -> &AutosizeState {
        &self.autosize_state
    }

    pub fn sizing_mode(&self) -> SizingMode {
        self.config.sizing_mode
    }

    pub fn is_ready(&self) -> bool {
        self.ag.is_ready()
    }

    pub fn ag(&self) -> &AgGridModel {
        &self.ag
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn is_autosizing(&self) -> bool {
        self.autosizer.is_running()
    }

    pub fn last_autosize_outcome(&self) -> Option<&AutosizeOutcome> {
        self.autosizer.last_outcome.as_ref()
    }

    //------------------------
    // Lifecycle
    //------------------------

    /// Attach a live engine and push the full declarative state to it.
    pub fn bind(&mut self, api: Box<dyn GridApi>) -> Result<()> {
        self.ag.bind(api)?;
        self.ag.api_mut()?.set_tree_data(self.config.tree_mode);
        self.prev_rs = None;
        self.applied_row_heights = None;
        self.scheduler.trigger_all();
        self.run_pending()
    }

    /// Detach the live engine, abandoning any autosize in flight.
    pub fn unbind(&mut self) -> Option<Box<dyn GridApi>> {
        if self.autosizer.job.take().is_some() {
            debug!("autosize abandoned, grid unbound");
        }
        self.scheduler.clear();
        self.prev_rs = None;
        self.applied_row_heights = None;
        self.ag.unbind()
    }

    /// Run pending passes, handling engine events between them.
    ///
    /// Deferred passes are left for the next [`tick`](Self::tick). Nothing runs while
    /// unbound; passes stay pending until an engine is bound.
    pub fn run_pending(&mut self) -> Result<()> {
        if !self.ag.is_ready() {
            return Ok(());
        }
        for _ in 0..MAX_PASS_RUNS {
            self.handle_engine_events()?;
            let Some(pass) = self.scheduler.next() else {
                return Ok(());
            };
            trace!(?pass, "running reconciliation pass");
            self.run_pass(pass)?;
        }
        warn!(
            limit = MAX_PASS_RUNS,
            "reconciliation passes did not settle, remaining passes left pending"
        );
        Ok(())
    }

    /// One scheduler turn: handle engine events, run deferred passes, then measure one
    /// column of any autosize in flight.
    pub fn tick(&mut self) -> Result<()> {
        if !self.ag.is_ready() {
            return Ok(());
        }
        self.handle_engine_events()?;
        self.scheduler.promote_deferred();
        self.run_pending()?;
        self.step_autosize()?;
        self.run_pending()
    }

    /// Tick until no passes are pending or deferred and no autosize is running.
    pub fn settle(&mut self) -> Result<()> {
        if !self.ag.is_ready() {
            return Ok(());
        }
        for _ in 0..MAX_SETTLE_TICKS {
            self.tick()?;
            if self.scheduler.is_idle() && !self.autosizer.is_running() {
                return Ok(());
            }
        }
        warn!(limit = MAX_SETTLE_TICKS, "grid did not settle");
        Ok(())
    }

    fn run_pass(&mut self, pass: Pass) -> Result<()> {
        match pass {
            Pass::Columns => self.sync_columns(),
            Pass::ColumnState => self.sync_column_state(),
            Pass::GroupBy => self.sync_group_by(),
            Pass::SortBy => self.sync_sort_by(),
            Pass::Data => self.sync_data(),
            Pass::Selection => self.sync_selection(),
            Pass::NativeSelection => self.sync_native_selection(),
            Pass::ExpandLevel => self.sync_expand_level(),
            Pass::RowHeight => self.sync_row_heights(),
        }
    }

    /// Trigger `passes` and run them.
    fn trigger(&mut self, passes: &[Pass]) -> Result<()> {
        for pass in passes {
            self.scheduler.trigger(*pass);
        }
        self.run_pending()
    }

    //------------------------
    // Sort and grouping
    //------------------------

    /// Set the sort, highest priority first.
    ///
    /// Each entry may be a compact string, a config or a sorter; a malformed entry is an
    /// error. Sorters naming an unknown column make the whole call a logged no-op, so
    /// stale persisted sorts cannot break a grid. Ids of engine-generated columns are
    /// accepted as is.
    pub fn set_sort_by<S>(&mut self, sorters: impl IntoIterator<Item = S>) -> Result<()>
    where
        S: Into<gridsync_model::GridSorterLike>,
    {
        let sorters = sorters
            .into_iter()
            .map(GridSorter::parse)
            .collect::<gridsync_model::Result<Vec<_>>>()?;

        let invalid: Vec<&str> = sorters
            .iter()
            .filter(|it| !self.is_known_column(&it.col_id))
            .map(|it| it.col_id.as_str())
            .collect();
        if !invalid.is_empty() {
            warn!(col_ids = ?invalid, "sorter column not found in grid columns, sort ignored");
            return Ok(());
        }

        if sorters == self.sort_by {
            return Ok(());
        }
        self.sort_by = sorters;
        self.trigger(&[Pass::SortBy])
    }

    /// Group rows by `col_ids`. Unknown ids ungroup the grid, with a warning.
    pub fn set_group_by<S: Into<String>>(
        &mut self,
        col_ids: impl IntoIterator<Item = S>,
    ) -> Result<()> {
        let mut col_ids: Vec<String> = col_ids.into_iter().map(Into::into).collect();
        let invalid: Vec<&String> = col_ids
            .iter()
            .filter(|id| gridsync_model::find_column(&self.columns, id).is_none())
            .collect();
        if !invalid.is_empty() {
            warn!(col_ids = ?invalid, "unknown column in group by, grid will not be grouped");
            col_ids.clear();
        }

        if col_ids == self.group_by {
            return Ok(());
        }
        self.group_by = col_ids;
        self.trigger(&[Pass::GroupBy])
    }

    fn is_known_column(&self, col_id: &str) -> bool {
        col_id.starts_with(gridsync_model::ENGINE_COLUMN_PREFIX)
            || gridsync_model::find_column(&self.columns, col_id).is_some()
    }

    fn sync_sort_by(&mut self) -> Result<()> {
        if self.config.external_sort {
            return Ok(());
        }
        self.ag.apply_sort_by(&self.sort_by)
    }

    fn sync_group_by(&mut self) -> Result<()> {
        self.ag.api_mut()?.set_row_group_columns(&self.group_by);
        Ok(())
    }

    //------------------------
    // Config
    //------------------------

    /// Change row density. Row heights are recomputed on the next tick; columns are
    /// autosized when the autosize mode asks for it.
    pub fn set_sizing_mode(&mut self, sizing_mode: SizingMode) -> Result<()> {
        if sizing_mode == self.config.sizing_mode {
            return Ok(());
        }
        self.config.sizing_mode = sizing_mode;
        self.scheduler.defer(Pass::RowHeight);
        if self.config.autosize.mode.sizes_on_mode_change() {
            self.autosize(&gridsync_model::AutosizeOverrides {
                show_mask: Some(true),
                ..Default::default()
            })?;
        }
        Ok(())
    }

    pub fn set_show_summary(&mut self, show_summary: gridsync_model::ShowSummary) -> Result<()> {
        if show_summary == self.config.show_summary {
            return Ok(());
        }
        self.config.show_summary = show_summary;
        self.trigger(&[Pass::Data])
    }

    pub fn set_external_sort(&mut self, external_sort: bool) -> Result<()> {
        if external_sort == self.config.external_sort {
            return Ok(());
        }
        self.config.external_sort = external_sort;
        self.trigger(&[Pass::SortBy])
    }
}
