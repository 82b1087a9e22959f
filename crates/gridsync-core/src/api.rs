//! Capability interface to a live grid engine.
//!
//! The engine is imperative and stateful: it owns its own column state, row nodes,
//! selection and expansion, and reports user-driven changes as [`GridEvent`]s. The
//! reconciliation engine only ever talks to it through [`GridApi`], so any engine (or a
//! test double such as [`crate::MemoryGrid`]) can be plugged in.

use gridsync_model::{Column, ColumnState, Pinned, RecordRef, SortDirection, Transaction};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::events::GridEvent;

/// Engine filter model, opaque to the reconciliation engine.
pub type FilterModel = serde_json::Map<String, serde_json::Value>;

/// The engine's view of one column.
///
/// A superset of [`ColumnState`]: engines track sort, grouping and pivot properties
/// that the declarative column state does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgColumnState {
    pub col_id: String,
    pub width: u32,
    #[serde(default)]
    pub hide: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<Pinned>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_index: Option<usize>,
    /// Absolute-value sort. Engines without support ignore it.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sort_abs: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flex: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_group_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pivot_index: Option<usize>,
}

impl AgColumnState {
    pub fn new(col_id: impl Into<String>, width: u32) -> Self {
        Self {
            col_id: col_id.into(),
            width,
            hide: false,
            pinned: None,
            sort: None,
            sort_index: None,
            sort_abs: false,
            flex: None,
            row_group_index: None,
            pivot_index: None,
        }
    }

    /// Overlay the declarative width, visibility and pinning. A missing width leaves
    /// the engine's own width alone.
    #[must_use]
    pub fn merged_with(mut self, state: &ColumnState) -> Self {
        if let Some(width) = state.width {
            self.width = width;
        }
        self.hide = state.hidden;
        self.pinned = state.pinned;
        self
    }

    #[must_use]
    pub fn without_sort(mut self) -> Self {
        self.sort = None;
        self.sort_index = None;
        self.sort_abs = false;
        self
    }
}

/// Column definition pushed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub col_id: String,
    pub field: String,
    pub width: Option<u32>,
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub flex: Option<u32>,
    pub hide: bool,
    pub pinned: Option<Pinned>,
    pub sortable: bool,
    pub resizable: bool,
    pub auto_height: bool,
    pub tree_column: bool,
}

impl ColumnDef {
    /// Definition for `col`, with its current display state applied.
    pub fn new(col: &Column, state: Option<&ColumnState>) -> Self {
        Self {
            col_id: col.col_id.clone(),
            field: col.field.clone(),
            width: state.and_then(|it| it.width).or(col.effective_width()),
            min_width: col.effective_min_width(),
            max_width: col.max_width,
            flex: col.flex,
            hide: state.map_or(col.hidden, |it| it.hidden),
            pinned: state.map_or(col.pinned, |it| it.pinned),
            sortable: col.sortable,
            resizable: col.resizable,
            auto_height: col.auto_height,
            tree_column: col.is_tree_column,
        }
    }
}

/// A column generated by the engine in pivot mode, one per (pivot keys, value column).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotColumn {
    pub col_id: String,
    pub pivot_keys: Vec<String>,
    pub value_col_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortDirection>,
}

/// A row in the engine: a record row, or a synthetic group row with no record.
#[derive(Debug, Clone, PartialEq)]
pub struct RowNode {
    pub id: String,
    /// Key of this node within its parent; record id for record rows, group value for
    /// group rows.
    pub key: String,
    pub record: Option<RecordRef>,
    pub parent_id: Option<String>,
    pub level: usize,
    pub has_children: bool,
    pub expanded: bool,
    pub selected: bool,
    /// Position among displayed rows; `None` when hidden by a collapsed ancestor or filter.
    pub row_index: Option<usize>,
    pub row_height: Option<u32>,
}

impl RowNode {
    pub fn is_group_row(&self) -> bool {
        self.record.is_none()
    }
}

/// Operations the reconciliation engine needs from a live grid.
pub trait GridApi {
    /// Identity of this engine instance; handles to the same instance report the same id.
    fn instance_id(&self) -> u64;

    fn set_tree_data(&mut self, tree_data: bool);

    // Columns

    fn set_column_defs(&mut self, defs: Vec<ColumnDef>);

    fn column_state(&self) -> Vec<AgColumnState>;

    /// Apply state to the listed columns, ignoring unknown ids. With `apply_order` the
    /// listed columns are also moved into the given order.
    fn apply_column_state(&mut self, state: Vec<AgColumnState>, apply_order: bool);

    fn set_column_width(&mut self, col_id: &str, width: u32);

    fn set_column_visible(&mut self, col_id: &str, visible: bool);

    fn set_column_pinned(&mut self, col_id: &str, pinned: Option<Pinned>);

    /// Sort of a single primary or pivot column. Returns false if no such column exists.
    fn set_column_sort(&mut self, col_id: &str, sort: Option<SortDirection>) -> bool;

    fn refresh_flexed_columns(&mut self);

    fn set_row_group_columns(&mut self, col_ids: &[String]);

    fn row_group_columns(&self) -> Vec<String>;

    fn is_pivot_mode(&self) -> bool;

    fn set_pivot_mode(&mut self, pivot_mode: bool);

    fn pivot_result_columns(&self) -> Vec<PivotColumn>;

    fn on_sort_changed(&mut self);

    // Filters

    fn filter_model(&self) -> Result<FilterModel, EngineError>;

    fn set_filter_model(&mut self, model: FilterModel) -> Result<(), EngineError>;

    fn on_filter_changed(&mut self);

    fn is_any_filter_present(&self) -> bool;

    // Rows

    fn set_row_data(&mut self, records: &[RecordRef]);

    fn apply_transaction(&mut self, transaction: &Transaction);

    /// Every node, in tree order, regardless of expansion, filter or sort.
    fn nodes(&self) -> Vec<RowNode>;

    fn row_node(&self, id: &str) -> Option<RowNode>;

    fn nodes_after_filter(&self) -> Vec<RowNode>;

    fn nodes_after_filter_and_sort(&self) -> Vec<RowNode>;

    fn displayed_rows(&self) -> Vec<RowNode>;

    /// Displayed rows currently materialized in the viewport.
    fn rendered_rows(&self) -> Vec<RowNode>;

    fn set_row_expanded(&mut self, id: &str, expanded: bool);

    fn expand_all(&mut self);

    fn collapse_all(&mut self);

    /// Recompute displayed rows after direct changes to expanded flags.
    fn on_group_expanded_or_collapsed(&mut self);

    // Selection

    fn selected_ids(&self) -> Vec<String>;

    fn deselect_all(&mut self);

    fn select_node(&mut self, id: &str);

    // Pinned rows

    fn pinned_top_rows(&self) -> Vec<RecordRef>;

    fn set_pinned_top_rows(&mut self, rows: Vec<RecordRef>);

    fn pinned_bottom_rows(&self) -> Vec<RecordRef>;

    fn set_pinned_bottom_rows(&mut self, rows: Vec<RecordRef>);

    // Rendering

    fn refresh_cells(&mut self, row_ids: &[String], col_ids: &[String], force: bool);

    fn redraw_rows(&mut self);

    fn reset_row_heights(&mut self);

    fn set_row_height(&mut self, id: &str, height: u32);

    fn on_row_height_changed(&mut self);

    fn ensure_index_visible(&mut self, index: usize);

    fn show_loading_overlay(&mut self);

    fn show_no_rows_overlay(&mut self);

    fn hide_overlay(&mut self);

    /// Width of the scrollable body, if the grid has been laid out.
    fn viewport_width(&self) -> Option<u32>;

    fn opened_tool_panel(&self) -> Option<String>;

    fn open_tool_panel(&mut self, id: Option<&str>);

    // Events

    /// Events raised since the last call, oldest first.
    fn drain_events(&mut self) -> Vec<GridEvent>;
}
