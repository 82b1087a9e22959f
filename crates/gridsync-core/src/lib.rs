//! Keeps a declarative grid model and a live, event-driven grid engine in sync.
//!
//! [`GridModel`] holds the canonical grid state. A bound engine, reached through
//! [`GridApi`], is treated as a cache of that state: changes are pushed as a minimal
//! set of engine calls, and user changes made in the engine flow back as events.
//! [`MemoryGrid`] is a headless engine for tests and scenario replay.

pub mod ag_grid_model;
pub mod api;
pub mod autosize;
pub mod column_sync;
pub mod error;
pub mod events;
pub mod grid_model;
pub mod memory;
pub mod scheduler;
pub mod state;

pub use ag_grid_model::AgGridModel;
pub use api::{AgColumnState, ColumnDef, FilterModel, GridApi, PivotColumn, RowNode};
pub use autosize::{AutosizeOutcome, AutosizeRequest};
pub use column_sync::ColumnSyncPath;
pub use error::{EngineError, GridError, Result};
pub use events::{EventSource, GridEvent};
pub use grid_model::{GridModel, GridPersistState, RowHeightKey, SelectOptions};
pub use memory::{CellRefresh, MemoryGrid, Overlay};
pub use scheduler::{Pass, Scheduler};
pub use state::{
    AgGridState, ColumnStateSnapshot, MiscState, PreserveState, SortColumnRef, SortStateEntry,
    StateCategory, StateExclusions,
};
