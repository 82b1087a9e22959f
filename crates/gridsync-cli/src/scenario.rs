//! Scenario files: grid setup plus a script of model calls and user gestures.
//!
//! ```json
//! {
//!   "name": "sorted products",
//!   "config": {"sizing_mode": "compact"},
//!   "columns": [{"col_id": "name", "width": 120}, {"col_id": "qty"}],
//!   "viewport_width": 800,
//!   "steps": [
//!     {"action": "load", "records": [{"id": "1", "data": {"name": "Widget", "qty": 5}}]},
//!     {"action": "sort", "sort_by": ["qty|desc"]},
//!     {"action": "ui_resize", "col_id": "name", "width": 200},
//!     {"action": "settle"}
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use gridsync_core::{GridModel, SelectOptions};
use gridsync_model::{
    AutosizeOverrides, ColumnNodeSpec, ColumnStateChange, Filter, GridConfig, GridSorterLike,
    Pinned, Record, RecordId, ShowSummary, SizingMode, build_columns,
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: GridConfig,
    pub columns: Vec<ColumnNodeSpec>,
    /// Initial sort, restored by a `restore_defaults` step.
    #[serde(default)]
    pub sort_by: Vec<GridSorterLike>,
    /// Initial grouping, restored by a `restore_defaults` step.
    #[serde(default)]
    pub group_by: Vec<String>,
    /// Width of the simulated viewport; unset means the grid was never laid out.
    #[serde(default)]
    pub viewport_width: Option<u32>,
    /// Rows the simulated engine keeps rendered.
    #[serde(default)]
    pub rendered_rows: Option<usize>,
    /// Bind the engine before the first step rather than at the end.
    #[serde(default = "default_true")]
    pub bind_first: bool,
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_true() -> bool {
    true
}

fn default_one() -> usize {
    1
}

/// One scripted action.
///
/// `ui_*` steps simulate gestures in the engine and address engine row node ids
/// (`ag_<record id>` for records). The events they raise are handled right away;
/// passes they defer run on the next `tick` or `settle`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Load {
        records: Vec<Record>,
    },
    Update {
        #[serde(default)]
        add: Vec<Record>,
        #[serde(default)]
        update: Vec<Record>,
        #[serde(default)]
        remove: Vec<RecordId>,
    },
    Clear,
    Filter {
        #[serde(default)]
        filter: Option<Filter>,
    },
    Summary {
        #[serde(default)]
        record: Option<Record>,
        #[serde(default)]
        show: Option<ShowSummary>,
    },
    Sort {
        sort_by: Vec<GridSorterLike>,
    },
    Group {
        group_by: Vec<String>,
    },
    ColumnState {
        changes: Vec<ColumnStateChange>,
    },
    Select {
        ids: Vec<RecordId>,
        #[serde(default)]
        options: SelectOptions,
    },
    SelectFirst,
    ClearSelection,
    ExpandAll,
    CollapseAll,
    ExpandToLevel {
        level: usize,
    },
    SizingMode {
        mode: SizingMode,
    },
    /// Start an autosize; with `wait` it runs to completion in this step.
    Autosize {
        #[serde(default)]
        overrides: AutosizeOverrides,
        #[serde(default)]
        wait: bool,
    },
    RefreshComplexCells,
    RestoreDefaults,
    Viewport {
        width: Option<u32>,
    },
    UiResize {
        col_id: String,
        width: u32,
    },
    UiAutosizeColumn {
        col_id: String,
        width: u32,
    },
    UiMove {
        col_id: String,
        to_index: usize,
    },
    UiVisible {
        col_id: String,
        visible: bool,
    },
    UiPin {
        col_id: String,
        #[serde(default)]
        pinned: Option<Pinned>,
    },
    UiGroup {
        col_ids: Vec<String>,
    },
    UiSelect {
        ids: Vec<String>,
    },
    UiToggle {
        id: String,
    },
    Tick {
        #[serde(default = "default_one")]
        count: usize,
    },
    Settle,
    Bind,
    Unbind,
    /// Record the state at this point of the replay.
    Snapshot {
        label: String,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Load { .. } => "load",
            Self::Update { .. } => "update",
            Self::Clear => "clear",
            Self::Filter { .. } => "filter",
            Self::Summary { .. } => "summary",
            Self::Sort { .. } => "sort",
            Self::Group { .. } => "group",
            Self::ColumnState { .. } => "column_state",
            Self::Select { .. } => "select",
            Self::SelectFirst => "select_first",
            Self::ClearSelection => "clear_selection",
            Self::ExpandAll => "expand_all",
            Self::CollapseAll => "collapse_all",
            Self::ExpandToLevel { .. } => "expand_to_level",
            Self::SizingMode { .. } => "sizing_mode",
            Self::Autosize { .. } => "autosize",
            Self::RefreshComplexCells => "refresh_complex_cells",
            Self::RestoreDefaults => "restore_defaults",
            Self::Viewport { .. } => "viewport",
            Self::UiResize { .. } => "ui_resize",
            Self::UiAutosizeColumn { .. } => "ui_autosize_column",
            Self::UiMove { .. } => "ui_move",
            Self::UiVisible { .. } => "ui_visible",
            Self::UiPin { .. } => "ui_pin",
            Self::UiGroup { .. } => "ui_group",
            Self::UiSelect { .. } => "ui_select",
            Self::UiToggle { .. } => "ui_toggle",
            Self::Tick { .. } => "tick",
            Self::Settle => "settle",
            Self::Bind => "bind",
            Self::Unbind => "unbind",
            Self::Snapshot { .. } => "snapshot",
        }
    }

    pub fn is_ui_gesture(&self) -> bool {
        self.name().starts_with("ui_")
    }
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parse scenario")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("read scenario {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("in {}", path.display()))
    }

    /// Unbound model for the scenario's columns and config.
    pub fn build_model(&self) -> Result<GridModel> {
        let columns = build_columns(self.columns.clone()).context("build columns")?;
        GridModel::new(self.config.clone(), columns)
            .and_then(|model| model.with_sort_by(self.sort_by.iter().cloned()))
            .and_then(|model| model.with_group_by(self.group_by.iter().cloned()))
            .context("create grid model")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_tagged_by_action() {
        let scenario = Scenario::from_json(
            r#"{
                "columns": [{"col_id": "name"}],
                "steps": [
                    {"action": "sort", "sort_by": ["name|desc", {"col_id": "qty", "sort": "asc"}]},
                    {"action": "ui_pin", "col_id": "name", "pinned": "left"},
                    {"action": "tick"},
                    {"action": "autosize", "overrides": {"fill_mode": "all"}, "wait": true}
                ]
            }"#,
        )
        .expect("parse");

        assert!(scenario.bind_first);
        assert_eq!(scenario.config, GridConfig::default());
        let names: Vec<&str> = scenario.steps.iter().map(Step::name).collect();
        assert_eq!(names, ["sort", "ui_pin", "tick", "autosize"]);
        assert!(matches!(scenario.steps[2], Step::Tick { count: 1 }));
        assert!(scenario.steps[1].is_ui_gesture());
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = Scenario::from_json(r#"{"columns": [], "steps": [{"action": "explode"}]}"#)
            .expect_err("should fail");
        assert!(format!("{err:#}").contains("explode"));
    }

    #[test]
    fn duplicate_columns_fail_to_build() {
        let scenario =
            Scenario::from_json(r#"{"columns": [{"col_id": "a"}, {"col_id": "a"}]}"#).expect("parse");
        assert!(scenario.build_model().is_err());
    }
}
