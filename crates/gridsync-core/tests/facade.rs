//! Engine state capture and restore through the façade.

use gridsync_core::{
    AgGridModel, AgColumnState, ColumnDef, GridApi, GridError, MemoryGrid, PivotColumn,
    SortColumnRef, SortStateEntry, StateCategory, StateExclusions,
};
use gridsync_model::{AUTO_GROUP_COL_ID, Column, Record, SortDirection};

fn defs() -> Vec<ColumnDef> {
    ["sym", "px", "qty"]
        .iter()
        .map(|id| ColumnDef::new(&Column::new(*id).with_width(80), None))
        .collect()
}

fn bound_facade() -> (AgGridModel, MemoryGrid) {
    let mut grid = MemoryGrid::new();
    grid.set_column_defs(defs());
    grid.set_row_data(&[
        Record::new("a").with("sym", "MSFT").into_ref(),
        Record::new("b").with("sym", "AAPL").into_ref(),
    ]);
    let mut ag = AgGridModel::new();
    ag.bind(grid.handle()).expect("bind");
    (ag, grid)
}

fn filter_model(json: serde_json::Value) -> gridsync_core::FilterModel {
    serde_json::from_value(json).expect("from value")
}

#[test]
fn test_unbound_facade_is_not_ready() {
    let mut ag = AgGridModel::new();

    assert!(!ag.is_ready());
    assert!(matches!(
        ag.get_state(&StateExclusions::none()),
        Err(GridError::NotReady)
    ));
    assert!(matches!(ag.get_sort_state(), Err(GridError::NotReady)));
    assert!(matches!(
        ag.set_selected_row_node_ids(&["ag_a".to_string()]),
        Err(GridError::NotReady)
    ));
}

#[test]
fn test_binding_another_engine_fails() {
    let (mut ag, grid) = bound_facade();

    // Another handle to the same engine is accepted.
    ag.bind(grid.handle()).expect("bind");
    assert!(matches!(
        ag.bind(MemoryGrid::new().handle()),
        Err(GridError::AlreadyBound)
    ));

    ag.unbind();
    ag.bind(MemoryGrid::new().handle()).expect("bind");
}

#[test]
fn test_failing_category_does_not_block_others() {
    let (ag, grid) = bound_facade();
    grid.set_filter_failure(Some("corrupt filter model"));

    let state = ag.get_state(&StateExclusions::none()).expect("get state");

    assert!(state.column_state.is_some());
    assert!(state.sort_state.is_some());
    assert!(state.expand_state.is_some());
    assert!(state.misc_state.is_some());
    assert!(state.filter_state.is_none());
    assert_eq!(
        state.errors.get(&StateCategory::Filter).map(String::as_str),
        Some("grid engine error: corrupt filter model")
    );
}

#[test]
fn test_excluded_categories_are_skipped() {
    let (ag, grid) = bound_facade();
    grid.reset_calls();

    let exclude = StateExclusions::none()
        .without(StateCategory::Filter)
        .without(StateCategory::Expand);
    let state = ag.get_state(&exclude).expect("get state");

    assert!(state.filter_state.is_none());
    assert!(state.expand_state.is_none());
    assert!(state.errors.is_empty());
    assert_eq!(grid.call_count("filter_model"), 0);
}

#[test]
fn test_state_round_trips_between_engines() {
    let (mut source, mut grid) = bound_facade();
    grid.apply_column_state(
        vec![
            AgColumnState {
                sort: Some(SortDirection::Desc),
                sort_index: Some(0),
                ..AgColumnState::new("qty", 50)
            },
            AgColumnState::new("sym", 110),
            AgColumnState {
                hide: true,
                ..AgColumnState::new("px", 80)
            },
        ],
        true,
    );
    source
        .set_filter_state(filter_model(serde_json::json!({"sym": {"values": ["MSFT"]}})))
        .expect("set filter state");
    grid.open_tool_panel(Some("columns"));
    let state = source.get_state(&StateExclusions::none()).expect("get state");

    let (mut target, other) = bound_facade();
    target.set_state(&state).expect("set state");

    assert_eq!(other.column_ids(), vec!["qty", "sym", "px"]);
    assert_eq!(other.column("sym").expect("column").width, 110);
    assert!(other.column("px").expect("column").hide);
    assert_eq!(other.column("qty").expect("column").sort, Some(SortDirection::Desc));
    assert_eq!(other.displayed_ids(), vec!["ag_a"]);
    assert_eq!(
        target.get_misc_state().expect("get misc state").opened_tool_panel.as_deref(),
        Some("columns")
    );

    let json = serde_json::to_string(&state).expect("serialize");
    let back: gridsync_core::AgGridState = serde_json::from_str(&json).expect("parse");
    assert_eq!(back, state);
}

#[test]
fn test_column_state_keeps_current_sort() {
    let (mut ag, mut grid) = bound_facade();
    let snapshot = ag.get_column_state().expect("get column state");
    assert!(snapshot.columns.iter().all(|it| it.sort.is_none()));

    grid.set_column_sort("px", Some(SortDirection::Asc));
    ag.set_column_state(&snapshot).expect("set column state");

    assert_eq!(grid.column("px").expect("column").sort, Some(SortDirection::Asc));
}

#[test]
fn test_pivot_sorts_are_addressed_by_keys() {
    let (mut ag, mut grid) = bound_facade();
    grid.set_pivot_mode(true);
    grid.set_pivot_result_columns(vec![
        PivotColumn {
            col_id: "pivot_0".into(),
            pivot_keys: vec!["2024".into()],
            value_col_id: "qty".into(),
            sort: None,
        },
        PivotColumn {
            col_id: "pivot_1".into(),
            pivot_keys: vec!["2025".into()],
            value_col_id: "qty".into(),
            sort: Some(SortDirection::Asc),
        },
    ]);

    let entries = vec![
        SortStateEntry {
            col_id: SortColumnRef::Secondary(vec!["2024".into()], "qty".into()),
            sort: SortDirection::Desc,
            sort_index: None,
        },
        SortStateEntry {
            col_id: SortColumnRef::Secondary(vec!["1999".into()], "qty".into()),
            sort: SortDirection::Asc,
            sort_index: None,
        },
        SortStateEntry {
            col_id: SortColumnRef::Primary("sym".into()),
            sort: SortDirection::Asc,
            sort_index: Some(0),
        },
    ];
    ag.set_sort_state(&entries).expect("set sort state");

    let pivots = grid.pivot_result_columns();
    assert_eq!(pivots[0].sort, Some(SortDirection::Desc));
    assert_eq!(pivots[1].sort, None);
    assert_eq!(grid.column("sym").expect("column").sort, Some(SortDirection::Asc));

    let captured = ag.get_sort_state().expect("get sort state");
    assert_eq!(captured.len(), 2);
    assert_eq!(
        captured[1].col_id,
        SortColumnRef::Secondary(vec!["2024".into()], "qty".into())
    );
}

#[test]
fn test_pivot_layout_drops_auto_group_column() {
    let (mut ag, mut grid) = bound_facade();
    grid.set_row_group_columns(&["sym".to_string()]);
    assert_eq!(grid.column_ids()[0], AUTO_GROUP_COL_ID);

    let mut snapshot = ag.get_column_state().expect("get column state");
    snapshot.is_pivot = true;
    snapshot.columns.reverse();
    for col in &mut snapshot.columns {
        if col.col_id == "px" {
            col.pivot_index = Some(0);
        }
    }
    ag.set_column_state(&snapshot).expect("set column state");

    assert!(grid.is_pivot_mode());
    // Unlisted columns keep their place after the listed ones.
    assert_eq!(grid.column_ids(), vec!["qty", "px", "sym", AUTO_GROUP_COL_ID]);
}

#[test]
fn test_preserved_state_survives_column_defs() {
    let (mut ag, grid) = bound_facade();
    ag.set_filter_state(filter_model(serde_json::json!({"sym": {"values": ["AAPL"]}})))
        .expect("set filter state");

    ag.with_preserved_state(gridsync_core::PreserveState::FILTERS, |api| {
        api.set_column_defs(defs());
    })
    .expect("with preserved state");

    assert_eq!(grid.displayed_ids(), vec!["ag_b"]);
    assert!(!ag.get_filter_state().expect("get filter state").is_empty());
}

#[test]
fn test_selection_skips_missing_rows() {
    let (mut ag, grid) = bound_facade();

    ag.set_selected_row_node_ids(&["ag_b".to_string(), "ag_zzz".to_string()])
        .expect("set selected row node ids");

    assert_eq!(ag.get_selected_row_node_ids().expect("get selected row node ids"), vec!["ag_b"]);
    assert_eq!(grid.call_count("select_node"), 1);
    assert_eq!(
        ag.get_first_selectable_row_node()
            .expect("get first selectable row node")
            .map(|it| it.id),
        Some("ag_a".to_string())
    );
}
