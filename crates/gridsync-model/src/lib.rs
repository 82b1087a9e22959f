//! Serializable grid state shared by the reconciliation engine and width estimator.

pub mod column;
pub mod column_state;
pub mod error;
pub mod expand;
pub mod filter;
pub mod options;
pub mod record;
pub mod sort;
pub mod store;
pub mod transaction;
pub mod value;

pub use column::{
    AUTO_GROUP_COL_ID, Column, ColumnGroup, ColumnGroupSpec, ColumnNode, ColumnNodeSpec,
    ColumnSpec, DEFAULT_WIDTH, ENGINE_COLUMN_PREFIX, FLEX_COL_MIN_WIDTH, HeaderName, Pinned,
    RenderFn, RendererSpec, build_columns, collect_ids, find_column, gather_leaves,
    validate_columns,
};
pub use column_state::{
    AutosizeState, ColumnState, ColumnStateChange, apply_column_state_changes,
    clean_column_state, initial_column_state, remove_transient_widths,
};
pub use error::{ModelError, RenderError, Result};
pub use expand::{ExpandNode, ExpandState};
pub use filter::{CompoundFilter, CompoundOp, FieldFilter, Filter, FilterOp};
pub use options::{
    AutosizeMode, AutosizeOptions, AutosizeOverrides, FillMode, GridConfig, HeaderMenuDisplay,
    Platform, RowHeightTable, ShowSummary, SizeTable, SizingMode,
};
pub use record::{Record, RecordId, RecordRef, RecordSet, grid_id_for};
pub use sort::{GridSorter, GridSorterLike, SortDirection, SorterConfig, default_comparator};
pub use store::{Store, StoreUpdate};
pub use transaction::Transaction;
pub use value::Value;
