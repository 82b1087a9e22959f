//! Pushing declarative column state onto a live engine.
//!
//! When the engine already has the declared column order, only changed widths,
//! visibility and pinning are pushed one call at a time. Otherwise the full state is
//! re-applied with ordering, which can make the engine drop its expansion, so expansion
//! is captured and restored around it.

use gridsync_model::{AUTO_GROUP_COL_ID, ColumnState, DEFAULT_WIDTH};

use crate::ag_grid_model::AgGridModel;
use crate::api::{AgColumnState, GridApi};
use crate::error::Result;
use crate::state::PreserveState;

/// How a column state sync was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSyncPath {
    /// Orders matched; only differing fields were pushed.
    Deltas { changed: bool },
    /// Orders differed; the full state was re-applied.
    Reapply,
}

/// Declared state with the engine's auto-group column spliced in at its live position.
///
/// The auto-group column has no declared counterpart but must keep its place when the
/// order is compared or re-applied.
pub fn desired_state(live: &[AgColumnState], declared: &[ColumnState]) -> Vec<ColumnState> {
    let mut ret = declared.to_vec();
    if let Some(pos) = live.iter().position(|it| it.col_id == AUTO_GROUP_COL_ID) {
        let auto = &live[pos];
        let entry = ColumnState {
            col_id: auto.col_id.clone(),
            width: Some(auto.width),
            hidden: auto.hide,
            pinned: auto.pinned,
            manually_sized: false,
        };
        ret.insert(pos.min(ret.len()), entry);
    }
    ret
}

pub fn same_order(live: &[AgColumnState], desired: &[ColumnState]) -> bool {
    live.len() == desired.len()
        && live
            .iter()
            .zip(desired)
            .all(|(current, next)| current.col_id == next.col_id)
}

/// Push the width, visibility and pinning of each column that differs from the engine.
///
/// Columns are matched by position; callers check [`same_order`] first. A column with
/// no declared width keeps its engine width. Returns true if any call was made.
pub fn apply_deltas(
    api: &mut dyn GridApi,
    live: &[AgColumnState],
    desired: &[ColumnState],
) -> bool {
    let mut changed = false;
    for (current, next) in live.iter().zip(desired) {
        if let Some(width) = next.width.filter(|width| *width != current.width) {
            api.set_column_width(&next.col_id, width);
            changed = true;
        }
        if next.hidden != current.hide {
            api.set_column_visible(&next.col_id, !next.hidden);
            changed = true;
        }
        if next.pinned != current.pinned {
            api.set_column_pinned(&next.col_id, next.pinned);
            changed = true;
        }
    }
    if changed {
        api.refresh_flexed_columns();
    }
    changed
}

/// Merge `desired` onto the engine's own state and apply it with ordering.
///
/// Engine-only properties such as sort and grouping indexes are kept from `live`.
pub fn reapply(
    ag: &mut AgGridModel,
    live: &[AgColumnState],
    desired: &[ColumnState],
) -> Result<()> {
    let merged: Vec<AgColumnState> = desired
        .iter()
        .map(|state| {
            live.iter()
                .find(|it| it.col_id == state.col_id)
                .cloned()
                .unwrap_or_else(|| AgColumnState::new(state.col_id.clone(), DEFAULT_WIDTH))
                .merged_with(state)
        })
        .collect();
    ag.with_preserved_state(PreserveState::EXPANSION, |api| {
        api.apply_column_state(merged, true);
    })
}

/// Bring the engine's column state in line with `declared`.
pub fn sync_column_state(ag: &mut AgGridModel, declared: &[ColumnState]) -> Result<ColumnSyncPath> {
    let live = ag.api()?.column_state();
    let desired = desired_state(&live, declared);
    if same_order(&live, &desired) {
        let changed = apply_deltas(ag.api_mut()?, &live, &desired);
        return Ok(ColumnSyncPath::Deltas { changed });
    }
    reapply(ag, &live, &desired)?;
    Ok(ColumnSyncPath::Reapply)
}
