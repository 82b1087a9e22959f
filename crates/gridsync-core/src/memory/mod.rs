//! Headless in-memory grid engine.
//!
//! `MemoryGrid` behaves like a live grid closely enough to drive the reconciliation
//! engine without a UI: it keeps its own column state, row tree, selection and
//! expansion, raises events tagged with their source, and counts every API call.
//! Handles are cheap clones of one shared engine, so a test can keep a handle while the
//! grid model owns another.

mod rows;
mod ui;

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use gridsync_model::{
    AUTO_GROUP_COL_ID, DEFAULT_WIDTH, FLEX_COL_MIN_WIDTH, Pinned, RecordRef, SortDirection,
    Transaction,
};
use serde::Serialize;

use crate::api::{AgColumnState, ColumnDef, FilterModel, GridApi, PivotColumn, RowNode};
use crate::error::EngineError;
use crate::events::{EventSource, GridEvent};

use rows::View;

pub const AUTO_GROUP_WIDTH: u32 = 200;
pub const DEFAULT_RENDERED_ROWS: usize = 50;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Overlay {
    #[default]
    None,
    Loading,
    NoRows,
}

/// Arguments of one `refresh_cells` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRefresh {
    pub row_ids: Vec<String>,
    pub col_ids: Vec<String>,
    pub force: bool,
}

struct EngineColumn {
    /// `None` for engine-generated columns.
    def: Option<ColumnDef>,
    state: AgColumnState,
}

impl EngineColumn {
    fn from_def(def: ColumnDef, previous: Option<&AgColumnState>) -> Self {
        let width = def
            .width
            .or(def.min_width)
            .unwrap_or(if def.flex.is_some() {
                FLEX_COL_MIN_WIDTH
            } else {
                DEFAULT_WIDTH
            });
        let mut state = AgColumnState::new(def.col_id.clone(), width);
        state.hide = def.hide;
        state.pinned = def.pinned;
        state.flex = def.flex;
        if let Some(previous) = previous {
            state.sort = previous.sort;
            state.sort_index = previous.sort_index;
            state.sort_abs = previous.sort_abs;
            state.row_group_index = previous.row_group_index;
            state.pivot_index = previous.pivot_index;
        }
        Self {
            def: Some(def),
            state,
        }
    }
}

#[derive(Default)]
struct Engine {
    instance_id: u64,
    tree_data: bool,
    columns: Vec<EngineColumn>,
    group_cols: Vec<String>,
    pivot_mode: bool,
    pivot_columns: Vec<PivotColumn>,
    filter_model: FilterModel,
    filter_failure: Option<String>,
    rows: Vec<RecordRef>,
    expanded: HashSet<String>,
    selected: Vec<String>,
    row_heights: HashMap<String, u32>,
    pinned_top: Vec<RecordRef>,
    pinned_bottom: Vec<RecordRef>,
    viewport_width: Option<u32>,
    first_rendered: usize,
    rendered_rows: usize,
    overlay: Overlay,
    tool_panel: Option<String>,
    refreshes: Vec<CellRefresh>,
    scrolled_to: Vec<usize>,
    events: Vec<GridEvent>,
    calls: BTreeMap<&'static str, usize>,
}

impl Engine {
    fn column_mut(&mut self, col_id: &str) -> Option<&mut EngineColumn> {
        self.columns.iter_mut().find(|it| it.state.col_id == col_id)
    }

    fn emit(&mut self, event: GridEvent) {
        self.events.push(event);
    }

    fn has_row(&self, id: &str) -> bool {
        self.flat(View::RAW, false).iter().any(|it| it.id == id)
    }

    /// Drop selected ids whose rows are gone.
    fn prune_selection(&mut self) {
        let present: HashSet<String> = self
            .flat(View::RAW, false)
            .into_iter()
            .map(|it| it.id)
            .collect();
        let before = self.selected.len();
        self.selected.retain(|id| present.contains(id));
        if self.selected.len() != before {
            self.emit(GridEvent::SelectionChanged {
                source: EventSource::RowDataChanged,
            });
        }
    }

    fn sync_auto_group_column(&mut self) {
        let has_auto = self
            .columns
            .iter()
            .any(|it| it.state.col_id == AUTO_GROUP_COL_ID);
        if !self.group_cols.is_empty() && !has_auto {
            self.columns.insert(
                0,
                EngineColumn {
                    def: None,
                    state: AgColumnState::new(AUTO_GROUP_COL_ID, AUTO_GROUP_WIDTH),
                },
            );
        } else if self.group_cols.is_empty() && has_auto {
            self.columns.retain(|it| it.state.col_id != AUTO_GROUP_COL_ID);
        }
    }

    fn all_node_ids_with_children(&self) -> Vec<String> {
        self.flat(View::RAW, false)
            .into_iter()
            .filter(|it| it.has_children)
            .map(|it| it.id)
            .collect()
    }
}

/// Shared handle to an in-memory grid engine.
#[derive(Clone)]
pub struct MemoryGrid {
    inner: Rc<RefCell<Engine>>,
}

impl Default for MemoryGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let engine = self.inner.borrow();
        f.debug_struct("MemoryGrid")
            .field("instance_id", &engine.instance_id)
            .field("columns", &engine.columns.len())
            .field("rows", &engine.rows.len())
            .finish_non_exhaustive()
    }
}

impl MemoryGrid {
    pub fn new() -> Self {
        let engine = Engine {
            instance_id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            rendered_rows: DEFAULT_RENDERED_ROWS,
            ..Engine::default()
        };
        Self {
            inner: Rc::new(RefCell::new(engine)),
        }
    }

    #[must_use]
    pub fn with_viewport_width(self, width: u32) -> Self {
        self.set_viewport_width(Some(width));
        self
    }

    /// Number of displayed rows kept materialized.
    #[must_use]
    pub fn with_rendered_rows(self, rows: usize) -> Self {
        self.inner.borrow_mut().rendered_rows = rows.max(1);
        self
    }

    pub fn set_viewport_width(&self, width: Option<u32>) {
        self.inner.borrow_mut().viewport_width = width;
    }

    /// Boxed handle for binding to a grid model.
    pub fn handle(&self) -> Box<dyn GridApi> {
        Box::new(self.clone())
    }

    /// Stand in for the engine's pivot computation.
    pub fn set_pivot_result_columns(&self, columns: Vec<PivotColumn>) {
        self.inner.borrow_mut().pivot_columns = columns;
    }

    /// Make filter model reads and writes fail with `message`.
    pub fn set_filter_failure(&self, message: Option<&str>) {
        self.inner.borrow_mut().filter_failure = message.map(str::to_string);
    }

    //------------------------
    // Inspection
    //------------------------

    /// Times `method` of [`GridApi`] has been called.
    pub fn call_count(&self, method: &str) -> usize {
        self.inner.borrow().calls.get(method).copied().unwrap_or(0)
    }

    pub fn calls(&self) -> BTreeMap<&'static str, usize> {
        self.inner.borrow().calls.clone()
    }

    pub fn reset_calls(&self) {
        let mut engine = self.inner.borrow_mut();
        engine.calls.clear();
        engine.refreshes.clear();
        engine.scrolled_to.clear();
    }

    pub fn column(&self, col_id: &str) -> Option<AgColumnState> {
        self.inner
            .borrow()
            .columns
            .iter()
            .find(|it| it.state.col_id == col_id)
            .map(|it| it.state.clone())
    }

    pub fn column_ids(&self) -> Vec<String> {
        self.inner
            .borrow()
            .columns
            .iter()
            .map(|it| it.state.col_id.clone())
            .collect()
    }

    pub fn row_ids(&self) -> Vec<String> {
        self.inner
            .borrow()
            .rows
            .iter()
            .map(|it| it.grid_id())
            .collect()
    }

    /// Ids of displayed rows, top to bottom.
    pub fn displayed_ids(&self) -> Vec<String> {
        self.inner
            .borrow()
            .flat(View::FILTERED_SORTED, true)
            .into_iter()
            .map(|it| it.id)
            .collect()
    }

    pub fn expanded_ids(&self) -> Vec<String> {
        let engine = self.inner.borrow();
        let mut ids: Vec<String> = engine.expanded.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn overlay(&self) -> Overlay {
        self.inner.borrow().overlay
    }

    pub fn refreshes(&self) -> Vec<CellRefresh> {
        self.inner.borrow().refreshes.clone()
    }

    pub fn scrolled_to(&self) -> Vec<usize> {
        self.inner.borrow().scrolled_to.clone()
    }

    pub fn row_height(&self, id: &str) -> Option<u32> {
        self.inner.borrow().row_heights.get(id).copied()
    }

    pub fn pending_events(&self) -> usize {
        self.inner.borrow().events.len()
    }

    fn call<R>(&self, method: &'static str, f: impl FnOnce(&mut Engine) -> R) -> R {
        let mut engine = self.inner.borrow_mut();
        *engine.calls.entry(method).or_default() += 1;
        f(&mut engine)
    }
}

impl GridApi for MemoryGrid {
    fn instance_id(&self) -> u64 {
        self.inner.borrow().instance_id
    }

    fn set_tree_data(&mut self, tree_data: bool) {
        self.call("set_tree_data", |e| e.tree_data = tree_data);
    }

    /// Replacing definitions drops the filter model, as the engine rebuilds its filters.
    fn set_column_defs(&mut self, defs: Vec<ColumnDef>) {
        self.call("set_column_defs", |e| {
            let previous: Vec<AgColumnState> =
                e.columns.iter().map(|it| it.state.clone()).collect();
            let mut columns: Vec<EngineColumn> = defs
                .into_iter()
                .map(|def| {
                    let prev = previous.iter().find(|it| it.col_id == def.col_id);
                    EngineColumn::from_def(def, prev)
                })
                .collect();
            if let Some(auto) = previous.iter().find(|it| it.col_id == AUTO_GROUP_COL_ID) {
                columns.insert(
                    0,
                    EngineColumn {
                        def: None,
                        state: auto.clone(),
                    },
                );
            }
            e.columns = columns;
            let known: HashSet<String> =
                e.columns.iter().map(|it| it.state.col_id.clone()).collect();
            e.group_cols.retain(|it| known.contains(it));
            e.sync_auto_group_column();
            e.filter_model.clear();
        });
    }

    fn column_state(&self) -> Vec<AgColumnState> {
        self.call("column_state", |e| {
            e.columns.iter().map(|it| it.state.clone()).collect()
        })
    }

    /// Reordering collapses every group, as engines rebuild their row models on reorder.
    fn apply_column_state(&mut self, state: Vec<AgColumnState>, apply_order: bool) {
        self.call("apply_column_state", |e| {
            let mut visibility_changed = false;
            let mut pinning_changed = false;
            for next in &state {
                let Some(col) = e.column_mut(&next.col_id) else {
                    continue;
                };
                visibility_changed |= col.state.hide != next.hide;
                pinning_changed |= col.state.pinned != next.pinned;
                let flex = col.state.flex;
                col.state = AgColumnState {
                    flex,
                    ..next.clone()
                };
            }

            if apply_order {
                let before: Vec<String> =
                    e.columns.iter().map(|it| it.state.col_id.clone()).collect();
                let mut remaining = std::mem::take(&mut e.columns);
                let mut ordered = Vec::with_capacity(remaining.len());
                for next in &state {
                    if let Some(idx) = remaining.iter().position(|it| it.state.col_id == next.col_id)
                    {
                        ordered.push(remaining.remove(idx));
                    }
                }
                ordered.extend(remaining);
                e.columns = ordered;
                let after: Vec<String> =
                    e.columns.iter().map(|it| it.state.col_id.clone()).collect();
                if before != after {
                    e.expanded.clear();
                }
            }

            if visibility_changed {
                e.emit(GridEvent::ColumnVisible {
                    source: EventSource::Api,
                });
            }
            if pinning_changed {
                e.emit(GridEvent::ColumnPinned {
                    source: EventSource::Api,
                });
            }
        });
    }

    fn set_column_width(&mut self, col_id: &str, width: u32) {
        self.call("set_column_width", |e| {
            if let Some(col) = e.column_mut(col_id) {
                col.state.width = width;
                e.emit(GridEvent::ColumnResized {
                    col_id: Some(col_id.to_string()),
                    width: Some(width),
                    source: EventSource::Api,
                    finished: true,
                });
            }
        });
    }

    fn set_column_visible(&mut self, col_id: &str, visible: bool) {
        self.call("set_column_visible", |e| {
            if let Some(col) = e.column_mut(col_id) {
                col.state.hide = !visible;
                e.emit(GridEvent::ColumnVisible {
                    source: EventSource::Api,
                });
            }
        });
    }

    fn set_column_pinned(&mut self, col_id: &str, pinned: Option<Pinned>) {
        self.call("set_column_pinned", |e| {
            if let Some(col) = e.column_mut(col_id) {
                col.state.pinned = pinned;
                e.emit(GridEvent::ColumnPinned {
                    source: EventSource::Api,
                });
            }
        });
    }

    fn set_column_sort(&mut self, col_id: &str, sort: Option<SortDirection>) -> bool {
        self.call("set_column_sort", |e| {
            if let Some(col) = e.column_mut(col_id) {
                col.state.sort = sort;
                if sort.is_none() {
                    col.state.sort_index = None;
                }
                return true;
            }
            match e.pivot_columns.iter_mut().find(|it| it.col_id == col_id) {
                Some(col) => {
                    col.sort = sort;
                    true
                }
                None => false,
            }
        })
    }

    /// Share the viewport width left by fixed columns among visible flex columns.
    fn refresh_flexed_columns(&mut self) {
        self.call("refresh_flexed_columns", |e| {
            let Some(viewport) = e.viewport_width else {
                return;
            };
            let (mut fixed, mut total_flex) = (0u32, 0u32);
            for col in e.columns.iter().filter(|it| !it.state.hide) {
                match col.state.flex {
                    Some(flex) => total_flex += flex,
                    None => fixed += col.state.width,
                }
            }
            if total_flex == 0 {
                return;
            }
            let available = viewport.saturating_sub(fixed);
            for col in e.columns.iter_mut().filter(|it| !it.state.hide) {
                let Some(flex) = col.state.flex else {
                    continue;
                };
                let min = col
                    .def
                    .as_ref()
                    .and_then(|it| it.min_width)
                    .unwrap_or(FLEX_COL_MIN_WIDTH);
                col.state.width = (available * flex / total_flex).max(min);
            }
        });
    }

    fn set_row_group_columns(&mut self, col_ids: &[String]) {
        self.call("set_row_group_columns", |e| {
            let next: Vec<String> = col_ids
                .iter()
                .filter(|id| e.columns.iter().any(|c| c.state.col_id == **id))
                .cloned()
                .collect();
            if next == e.group_cols {
                return;
            }
            e.group_cols = next;
            for col in &mut e.columns {
                col.state.row_group_index =
                    e.group_cols.iter().position(|it| *it == col.state.col_id);
            }
            e.sync_auto_group_column();
            e.emit(GridEvent::ColumnRowGroupChanged {
                source: EventSource::Api,
            });
        });
    }

    fn row_group_columns(&self) -> Vec<String> {
        self.call("row_group_columns", |e| e.group_cols.clone())
    }

    fn is_pivot_mode(&self) -> bool {
        self.call("is_pivot_mode", |e| e.pivot_mode)
    }

    fn set_pivot_mode(&mut self, pivot_mode: bool) {
        self.call("set_pivot_mode", |e| e.pivot_mode = pivot_mode);
    }

    fn pivot_result_columns(&self) -> Vec<PivotColumn> {
        self.call("pivot_result_columns", |e| {
            if e.pivot_mode {
                e.pivot_columns.clone()
            } else {
                Vec::new()
            }
        })
    }

    fn on_sort_changed(&mut self) {
        self.call("on_sort_changed", |_| {});
    }

    fn filter_model(&self) -> Result<FilterModel, EngineError> {
        self.call("filter_model", |e| match &e.filter_failure {
            Some(message) => Err(EngineError::new(message.clone())),
            None => Ok(e.filter_model.clone()),
        })
    }

    fn set_filter_model(&mut self, model: FilterModel) -> Result<(), EngineError> {
        self.call("set_filter_model", |e| {
            if let Some(message) = &e.filter_failure {
                return Err(EngineError::new(message.clone()));
            }
            e.filter_model = model;
            Ok(())
        })
    }

    fn on_filter_changed(&mut self) {
        self.call("on_filter_changed", |_| {});
    }

    fn is_any_filter_present(&self) -> bool {
        self.call("is_any_filter_present", |e| !e.filter_model.is_empty())
    }

    fn set_row_data(&mut self, records: &[RecordRef]) {
        self.call("set_row_data", |e| {
            e.rows = records.to_vec();
            e.prune_selection();
        });
    }

    fn apply_transaction(&mut self, transaction: &Transaction) {
        self.call("apply_transaction", |e| {
            let removed: HashSet<&str> = transaction
                .remove
                .iter()
                .map(|it| it.id().as_str())
                .collect();
            e.rows.retain(|it| !removed.contains(it.id().as_str()));
            for rec in &transaction.update {
                if let Some(row) = e.rows.iter_mut().find(|it| it.id() == rec.id()) {
                    *row = RecordRef::clone(rec);
                }
            }
            e.rows.extend(transaction.add.iter().cloned());
            if !transaction.remove.is_empty() {
                e.prune_selection();
            }
        });
    }

    fn nodes(&self) -> Vec<RowNode> {
        self.call("nodes", |e| e.flat(View::RAW, false))
    }

    fn row_node(&self, id: &str) -> Option<RowNode> {
        self.call("row_node", |e| {
            e.flat(View::RAW, false).into_iter().find(|it| it.id == id)
        })
    }

    fn nodes_after_filter(&self) -> Vec<RowNode> {
        self.call("nodes_after_filter", |e| e.flat(View::FILTERED, false))
    }

    fn nodes_after_filter_and_sort(&self) -> Vec<RowNode> {
        self.call("nodes_after_filter_and_sort", |e| {
            e.flat(View::FILTERED_SORTED, false)
        })
    }

    fn displayed_rows(&self) -> Vec<RowNode> {
        self.call("displayed_rows", |e| e.flat(View::FILTERED_SORTED, true))
    }

    fn rendered_rows(&self) -> Vec<RowNode> {
        self.call("rendered_rows", |e| {
            e.flat(View::FILTERED_SORTED, true)
                .into_iter()
                .skip(e.first_rendered)
                .take(e.rendered_rows)
                .collect()
        })
    }

    fn set_row_expanded(&mut self, id: &str, expanded: bool) {
        self.call("set_row_expanded", |e| {
            if expanded {
                e.expanded.insert(id.to_string());
            } else {
                e.expanded.remove(id);
            }
        });
    }

    fn expand_all(&mut self) {
        self.call("expand_all", |e| {
            e.expanded = e.all_node_ids_with_children().into_iter().collect();
        });
    }

    fn collapse_all(&mut self) {
        self.call("collapse_all", |e| e.expanded.clear());
    }

    fn on_group_expanded_or_collapsed(&mut self) {
        self.call("on_group_expanded_or_collapsed", |_| {});
    }

    fn selected_ids(&self) -> Vec<String> {
        self.call("selected_ids", |e| e.selected.clone())
    }

    fn deselect_all(&mut self) {
        self.call("deselect_all", |e| {
            if !e.selected.is_empty() {
                e.selected.clear();
                e.emit(GridEvent::SelectionChanged {
                    source: EventSource::Api,
                });
            }
        });
    }

    fn select_node(&mut self, id: &str) {
        self.call("select_node", |e| {
            if e.has_row(id) && !e.selected.iter().any(|it| it == id) {
                e.selected.push(id.to_string());
                e.emit(GridEvent::SelectionChanged {
                    source: EventSource::Api,
                });
            }
        });
    }

    fn pinned_top_rows(&self) -> Vec<RecordRef> {
        self.call("pinned_top_rows", |e| e.pinned_top.clone())
    }

    fn set_pinned_top_rows(&mut self, rows: Vec<RecordRef>) {
        self.call("set_pinned_top_rows", |e| e.pinned_top = rows);
    }

    fn pinned_bottom_rows(&self) -> Vec<RecordRef> {
        self.call("pinned_bottom_rows", |e| e.pinned_bottom.clone())
    }

    fn set_pinned_bottom_rows(&mut self, rows: Vec<RecordRef>) {
        self.call("set_pinned_bottom_rows", |e| e.pinned_bottom = rows);
    }

    fn refresh_cells(&mut self, row_ids: &[String], col_ids: &[String], force: bool) {
        self.call("refresh_cells", |e| {
            e.refreshes.push(CellRefresh {
                row_ids: row_ids.to_vec(),
                col_ids: col_ids.to_vec(),
                force,
            });
        });
    }

    fn redraw_rows(&mut self) {
        self.call("redraw_rows", |_| {});
    }

    fn reset_row_heights(&mut self) {
        self.call("reset_row_heights", |e| e.row_heights.clear());
    }

    fn set_row_height(&mut self, id: &str, height: u32) {
        self.call("set_row_height", |e| {
            e.row_heights.insert(id.to_string(), height);
        });
    }

    fn on_row_height_changed(&mut self) {
        self.call("on_row_height_changed", |_| {});
    }

    fn ensure_index_visible(&mut self, index: usize) {
        self.call("ensure_index_visible", |e| {
            if index < e.first_rendered {
                e.first_rendered = index;
            } else if index >= e.first_rendered + e.rendered_rows {
                e.first_rendered = index + 1 - e.rendered_rows;
            }
            e.scrolled_to.push(index);
        });
    }

    fn show_loading_overlay(&mut self) {
        self.call("show_loading_overlay", |e| e.overlay = Overlay::Loading);
    }

    fn show_no_rows_overlay(&mut self) {
        self.call("show_no_rows_overlay", |e| e.overlay = Overlay::NoRows);
    }

    fn hide_overlay(&mut self) {
        self.call("hide_overlay", |e| e.overlay = Overlay::None);
    }

    fn viewport_width(&self) -> Option<u32> {
        self.call("viewport_width", |e| e.viewport_width)
    }

    fn opened_tool_panel(&self) -> Option<String> {
        self.call("opened_tool_panel", |e| e.tool_panel.clone())
    }

    fn open_tool_panel(&mut self, id: Option<&str>) {
        self.call("open_tool_panel", |e| e.tool_panel = id.map(str::to_string));
    }

    fn drain_events(&mut self) -> Vec<GridEvent> {
        self.call("drain_events", |e| std::mem::take(&mut e.events))
    }
}
