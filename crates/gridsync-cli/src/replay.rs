//! Running a scenario against the in-memory engine.

use std::collections::BTreeMap;

use anyhow::{Context, Result, bail};
use gridsync_core::{
    AutosizeOutcome, EventSource, GridModel, GridPersistState, MemoryGrid, Overlay,
};
use gridsync_model::{
    ExpandState, GridSorter, Pinned, RecordId, SortDirection, StoreUpdate,
};
use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::scenario::{Scenario, Step};

/// Declarative and engine state at one point of a replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub columns: Vec<ColumnRow>,
    pub sort_by: Vec<GridSorter>,
    pub group_by: Vec<String>,
    pub selection: Vec<RecordId>,
    pub expand_state: ExpandState,
    /// Displayed engine rows, top to bottom.
    pub rows: Vec<String>,
    pub overlay: Overlay,
}

/// One leaf column, as declared and as the engine has it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRow {
    pub col_id: String,
    pub width: Option<u32>,
    pub engine_width: Option<u32>,
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<Pinned>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortDirection>,
    pub manually_sized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub steps: usize,
    pub state: GridSnapshot,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub snapshots: Vec<GridSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autosize: Option<AutosizeOutcome>,
    pub persisted: GridPersistState,
    /// Engine API calls by method name.
    pub calls: BTreeMap<String, usize>,
}

/// Replay `scenario` and settle the grid.
///
/// # Errors
///
/// Returns an error if the scenario's columns are invalid or a step fails.
pub fn replay(scenario: &Scenario) -> Result<ReplayReport> {
    let span = info_span!("replay", scenario = scenario.name.as_deref().unwrap_or("unnamed"));
    let _guard = span.enter();

    let mut grid = MemoryGrid::new();
    if let Some(rows) = scenario.rendered_rows {
        grid = grid.with_rendered_rows(rows);
    }
    grid.set_viewport_width(scenario.viewport_width);

    let mut model = scenario.build_model()?;
    if scenario.bind_first {
        model.bind(grid.handle()).context("bind grid")?;
    }

    let mut snapshots = Vec::new();
    for (idx, step) in scenario.steps.iter().enumerate() {
        info!(step = idx + 1, action = step.name(), "replaying step");
        if let Step::Snapshot { label } = step {
            snapshots.push(snapshot(&model, &grid, Some(label.clone())));
            continue;
        }
        run_step(&mut model, &grid, step)
            .with_context(|| format!("step {} ({})", idx + 1, step.name()))?;
        if step.is_ui_gesture() {
            model.run_pending()?;
        }
    }

    if !model.is_ready() {
        model.bind(grid.handle()).context("bind grid")?;
    }
    model.settle()?;
    debug!(calls = grid.calls().values().sum::<usize>(), "replay settled");

    Ok(ReplayReport {
        name: scenario.name.clone(),
        steps: scenario.steps.len(),
        state: snapshot(&model, &grid, None),
        snapshots,
        autosize: model.last_autosize_outcome().cloned(),
        persisted: model.persistable_state(),
        calls: grid
            .calls()
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect(),
    })
}

fn run_step(model: &mut GridModel, grid: &MemoryGrid, step: &Step) -> Result<()> {
    match step {
        Step::Load { records } => model.load_data(records.iter().cloned())?,
        Step::Update {
            add,
            update,
            remove,
        } => model.update_data(StoreUpdate {
            add: add.clone(),
            update: update.clone(),
            remove: remove.clone(),
        })?,
        Step::Clear => model.clear()?,
        Step::Filter { filter } => model.set_filter(filter.clone())?,
        Step::Summary { record, show } => {
            if let Some(show) = show {
                model.set_show_summary(*show)?;
            }
            model.set_summary(record.clone())?;
        }
        Step::Sort { sort_by } => model.set_sort_by(sort_by.iter().cloned())?,
        Step::Group { group_by } => model.set_group_by(group_by.iter().cloned())?,
        Step::ColumnState { changes } => model.apply_column_state_changes(changes)?,
        Step::Select { ids, options } => model.select(ids.iter().cloned(), *options)?,
        Step::SelectFirst => model.select_first(true)?,
        Step::ClearSelection => model.clear_selection()?,
        Step::ExpandAll => model.expand_all()?,
        Step::CollapseAll => model.collapse_all()?,
        Step::ExpandToLevel { level } => model.expand_to_level(*level)?,
        Step::SizingMode { mode } => model.set_sizing_mode(*mode)?,
        Step::Autosize { overrides, wait } => {
            if *wait {
                let outcome = model.autosize_blocking(overrides)?;
                debug!(?outcome, "autosize finished");
            } else {
                let request = model.autosize(overrides)?;
                debug!(?request, "autosize requested");
            }
        }
        Step::RefreshComplexCells => model.refresh_complex_cells()?,
        Step::RestoreDefaults => model.restore_defaults()?,
        Step::Viewport { width } => grid.set_viewport_width(*width),
        Step::UiResize { col_id, width } => grid.ui_resize_column(col_id, *width),
        Step::UiAutosizeColumn { col_id, width } => grid.ui_autosize_column(col_id, *width),
        Step::UiMove { col_id, to_index } => grid.ui_move_column(col_id, *to_index),
        Step::UiVisible { col_id, visible } => grid.ui_set_column_visible(col_id, *visible),
        Step::UiPin { col_id, pinned } => grid.ui_pin_column(col_id, *pinned),
        Step::UiGroup { col_ids } => {
            let col_ids: Vec<&str> = col_ids.iter().map(String::as_str).collect();
            grid.ui_set_row_groups(&col_ids, EventSource::ToolPanelUi);
        }
        Step::UiSelect { ids } => {
            let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
            grid.ui_select(&ids);
        }
        Step::UiToggle { id } => grid.ui_toggle_expanded(id),
        Step::Tick { count } => {
            for _ in 0..*count {
                model.tick()?;
            }
        }
        Step::Settle => model.settle()?,
        Step::Bind => model.bind(grid.handle())?,
        Step::Unbind => {
            if model.unbind().is_none() {
                bail!("grid is not bound");
            }
        }
        Step::Snapshot { .. } => {}
    }
    Ok(())
}

/// Capture state through inspection only, so call counts are not disturbed.
pub fn snapshot(model: &GridModel, grid: &MemoryGrid, label: Option<String>) -> GridSnapshot {
    let columns = model
        .column_state()
        .iter()
        .map(|state| {
            let live = grid.column(&state.col_id);
            ColumnRow {
                col_id: state.col_id.clone(),
                width: state.width,
                engine_width: live.as_ref().map(|it| it.width),
                hidden: state.hidden,
                pinned: state.pinned,
                sort: live.and_then(|it| it.sort),
                manually_sized: state.manually_sized,
            }
        })
        .collect();

    GridSnapshot {
        label,
        columns,
        sort_by: model.sort_by().to_vec(),
        group_by: model.group_by().to_vec(),
        selection: model.selection().to_vec(),
        expand_state: model.expand_state().clone(),
        rows: grid.displayed_ids(),
        overlay: grid.overlay(),
    }
}
