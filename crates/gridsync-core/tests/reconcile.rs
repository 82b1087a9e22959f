//! Reconciliation passes driven against the in-memory engine.

use gridsync_core::{GridApi, GridModel, MemoryGrid, Pass, SelectOptions};
use gridsync_model::{
    Column, ColumnNode, ColumnStateChange, Filter, FilterOp, GridConfig, Pinned, Record,
    RecordId, ShowSummary, SortDirection, StoreUpdate,
};

fn product_columns() -> Vec<ColumnNode> {
    vec![
        Column::new("name").with_width(120).into(),
        Column::new("region").with_width(80).into(),
        Column::new("qty").with_width(60).into(),
        Column::new("price").with_width(70).complex().into(),
    ]
}

fn products() -> Vec<Record> {
    vec![
        Record::new(1).with("name", "Widget").with("region", "EU").with("qty", 5),
        Record::new(2).with("name", "Gadget").with("region", "US").with("qty", 3),
        Record::new(3).with("name", "Doohickey").with("region", "EU").with("qty", -10),
    ]
}

fn bound_model(config: GridConfig) -> (GridModel, MemoryGrid) {
    let grid = MemoryGrid::new().with_viewport_width(800);
    let mut model = GridModel::new(config, product_columns()).expect("model");
    model.load_data(products()).expect("load data");
    model.bind(grid.handle()).expect("bind");
    model.settle().expect("settle");
    (model, grid)
}

#[test]
fn test_bind_pushes_full_state() {
    let (model, grid) = bound_model(GridConfig::default());

    assert!(model.is_ready());
    assert_eq!(grid.column_ids(), vec!["name", "region", "qty", "price"]);
    assert_eq!(grid.column("name").expect("column").width, 120);
    assert_eq!(grid.row_ids(), vec!["ag_1", "ag_2", "ag_3"]);
    assert_eq!(grid.call_count("set_column_defs"), 1);
    assert_eq!(grid.call_count("set_row_data"), 1);
    assert!(model.scheduler().is_idle());
}

#[test]
fn test_passes_wait_until_bound() {
    let grid = MemoryGrid::new();
    let mut model = GridModel::new(GridConfig::default(), product_columns()).expect("model");
    model.load_data(products()).expect("load data");
    model.set_sort_by(["name"]).expect("set sort by");

    assert!(model.scheduler().is_pending(Pass::Data));
    assert!(model.scheduler().is_pending(Pass::SortBy));
    assert_eq!(grid.call_count("set_row_data"), 0);

    model.bind(grid.handle()).expect("bind");
    assert_eq!(grid.row_ids().len(), 3);
    assert_eq!(grid.column("name").expect("column").sort, Some(SortDirection::Asc));
    assert_eq!(grid.displayed_ids(), vec!["ag_3", "ag_2", "ag_1"]);
}

#[test]
fn test_second_load_sends_transaction() {
    let (mut model, grid) = bound_model(GridConfig::default());
    grid.reset_calls();

    model
        .update_data(StoreUpdate {
            add: vec![Record::new(4).with("name", "Sprocket")],
            update: vec![Record::new(2).with("name", "Gadget Pro").with("region", "US")],
            remove: vec![3.into()],
        })
        .expect("update data");

    assert_eq!(grid.call_count("set_row_data"), 0);
    assert_eq!(grid.call_count("apply_transaction"), 1);
    assert_eq!(grid.row_ids(), vec!["ag_1", "ag_2", "ag_4"]);

    // Updated rows are force-refreshed in complex columns only.
    let refreshes = grid.refreshes();
    assert_eq!(refreshes.len(), 1);
    assert_eq!(refreshes[0].row_ids, vec!["ag_2"]);
    assert_eq!(refreshes[0].col_ids, vec!["price"]);
    assert!(refreshes[0].force);
}

#[test]
fn test_reloading_identical_data_sends_nothing() {
    let (mut model, grid) = bound_model(GridConfig::default());
    grid.reset_calls();

    model.load_data(products()).expect("load data");

    assert_eq!(grid.call_count("set_row_data"), 0);
    assert_eq!(grid.call_count("apply_transaction"), 0);
}

#[test]
fn test_empty_grid_passes_send_transactions() {
    let grid = MemoryGrid::new().with_viewport_width(800);
    let mut model = GridModel::new(GridConfig::default(), product_columns()).expect("model");
    model.bind(grid.handle()).expect("bind");
    model.settle().expect("settle");
    assert_eq!(grid.call_count("set_row_data"), 1);
    grid.reset_calls();

    // Nothing to diff against an empty engine.
    model.set_show_summary(ShowSummary::Top).expect("set show summary");
    assert_eq!(grid.call_count("set_row_data"), 0);
    assert_eq!(grid.call_count("apply_transaction"), 0);

    model.load_data(products()).expect("load data");
    assert_eq!(grid.call_count("set_row_data"), 0);
    assert_eq!(grid.call_count("apply_transaction"), 1);
    assert_eq!(grid.row_ids(), vec!["ag_1", "ag_2", "ag_3"]);
}

#[test]
fn test_filter_prunes_selection() {
    let (mut model, grid) = bound_model(GridConfig::default());
    model
        .select(
            ["1", "2"],
            SelectOptions {
                ensure_visible: false,
                clear_selection: true,
            },
        )
        .expect("select");
    model.settle().expect("settle");
    assert_eq!(grid.selected_ids(), vec!["ag_1", "ag_2"]);

    model
        .set_filter(Some(Filter::field("region", FilterOp::Eq, "EU")))
        .expect("set filter");
    model.settle().expect("settle");

    assert_eq!(model.selection().to_vec(), vec![RecordId::from("1")]);
    assert_eq!(grid.row_ids(), vec!["ag_1", "ag_3"]);
    assert_eq!(grid.selected_ids(), vec!["ag_1"]);
}

#[test]
fn test_equal_selection_issues_no_engine_calls() {
    let (mut model, grid) = bound_model(GridConfig::default());
    let options = SelectOptions {
        ensure_visible: false,
        clear_selection: true,
    };
    model.select(["2"], options).expect("select");
    model.settle().expect("settle");
    assert_eq!(grid.selected_ids(), vec!["ag_2"]);

    grid.reset_calls();
    model.select(["2"], options).expect("select");
    model.settle().expect("settle");

    assert_eq!(grid.call_count("deselect_all"), 0);
    assert_eq!(grid.call_count("select_node"), 0);
}

#[test]
fn test_ui_selection_flows_back() {
    let (mut model, grid) = bound_model(GridConfig::default());
    grid.reset_calls();

    grid.ui_select(&["ag_3", "ag_1"]);
    model.tick().expect("tick");

    assert_eq!(
        model.selection().to_vec(),
        vec![RecordId::from("3"), RecordId::from("1")]
    );
    assert_eq!(grid.call_count("deselect_all"), 0);
    assert_eq!(grid.call_count("select_node"), 0);
    assert!(model.has_selection());
}

#[test]
fn test_bulk_ui_selection_is_coalesced() {
    let (mut model, grid) = bound_model(GridConfig::default());
    let before = model.scheduler().run_count(Pass::NativeSelection);

    grid.ui_select(&["ag_1"]);
    grid.ui_select(&["ag_1", "ag_2"]);
    grid.ui_select(&["ag_1", "ag_2", "ag_3"]);
    model.tick().expect("tick");

    assert_eq!(model.scheduler().run_count(Pass::NativeSelection), before + 1);
    assert_eq!(model.selection().len(), 3);
}

#[test]
fn test_own_column_pushes_do_not_feed_back() {
    let (mut model, grid) = bound_model(GridConfig::default());
    grid.reset_calls();

    model
        .apply_column_state_changes(&[
            ColumnStateChange::new("qty").width(90),
            ColumnStateChange::new("region").hidden(true),
            ColumnStateChange::new("name").pinned(Some(Pinned::Left)),
        ])
        .expect("apply column state changes");
    let runs = model.scheduler().run_count(Pass::ColumnState);
    model.settle().expect("settle");

    assert_eq!(grid.call_count("set_column_width"), 1);
    assert_eq!(grid.call_count("set_column_visible"), 1);
    assert_eq!(grid.call_count("set_column_pinned"), 1);
    assert_eq!(grid.call_count("apply_column_state"), 0);
    assert_eq!(model.scheduler().run_count(Pass::ColumnState), runs);
    assert!(grid.column("region").expect("column").hide);
    assert_eq!(grid.column("name").expect("column").pinned, Some(Pinned::Left));
    assert!(!model.state_for_column("qty").expect("state for column").manually_sized);
}

#[test]
fn test_ui_resize_marks_column_manually_sized() {
    let (mut model, grid) = bound_model(GridConfig::default());
    grid.reset_calls();

    grid.ui_resize_column("name", 200);
    model.tick().expect("tick");

    let state = model.state_for_column("name").expect("state for column");
    assert_eq!(state.width, Some(200));
    assert!(state.manually_sized);
    // The engine already has the width; nothing is pushed back.
    assert_eq!(grid.call_count("set_column_width"), 0);
}

#[test]
fn test_ui_column_changes_flow_back() {
    let (mut model, grid) = bound_model(GridConfig::default());

    grid.ui_set_column_visible("price", false);
    grid.ui_pin_column("qty", Some(Pinned::Right));
    grid.ui_move_column("qty", 0);
    model.tick().expect("tick");

    assert!(!model.is_column_visible("price"));
    assert_eq!(model.column_pinned("qty"), Some(Pinned::Right));
    let order: Vec<&str> = model
        .column_state()
        .iter()
        .map(|it| it.col_id.as_str())
        .collect();
    assert_eq!(order, vec!["qty", "name", "region", "price"]);
}

#[test]
fn test_reorder_reapplies_and_keeps_expansion() {
    let (mut model, grid) = bound_model(GridConfig::default());
    model.set_group_by(["region"]).expect("set group by");
    model.expand_all().expect("expand all");
    let expanded = grid.expanded_ids();
    assert_eq!(expanded.len(), 2);
    grid.reset_calls();

    let mut state = model.column_state().to_vec();
    state.reverse();
    model.set_column_state(&state).expect("set column state");

    assert_eq!(grid.call_count("apply_column_state"), 1);
    assert_eq!(grid.expanded_ids(), expanded);
    assert_eq!(
        grid.column_ids(),
        vec![
            gridsync_model::AUTO_GROUP_COL_ID,
            "price",
            "qty",
            "region",
            "name"
        ]
    );
}

#[test]
fn test_ui_grouping_flows_back_but_api_grouping_does_not() {
    let (mut model, grid) = bound_model(GridConfig::default());

    grid.ui_set_row_groups(&["region"], gridsync_core::EventSource::ToolPanelUi);
    model.tick().expect("tick");
    assert_eq!(model.group_by(), &["region".to_string()]);

    grid.ui_set_row_groups(&[], gridsync_core::EventSource::UiColumnDragged);
    model.tick().expect("tick");
    assert_eq!(model.group_by(), &["region".to_string()]);
}

#[test]
fn test_invalid_group_by_ungroups() {
    let (mut model, grid) = bound_model(GridConfig::default());
    model.set_group_by(["region"]).expect("set group by");
    assert_eq!(grid.row_group_columns(), vec!["region"]);

    model.set_group_by(["region", "missing"]).expect("set group by");

    assert!(model.group_by().is_empty());
    assert!(grid.row_group_columns().is_empty());
}

#[test]
fn test_unknown_sort_column_is_ignored() {
    let (mut model, _grid) = bound_model(GridConfig::default());
    model.set_sort_by(["qty"]).expect("set sort by");

    model.set_sort_by(["qty", "missing|desc"]).expect("set sort by");

    assert_eq!(model.sort_by(), &[gridsync_model::GridSorter::asc("qty")]);
    assert!(model.set_sort_by(["|desc"]).is_err());
}

#[test]
fn test_auto_group_sort_is_accepted() {
    let (mut model, grid) = bound_model(GridConfig::default());
    model.set_group_by(["region"]).expect("set group by");

    model
        .set_sort_by([format!("{}|desc", gridsync_model::AUTO_GROUP_COL_ID)])
        .expect("set sort by");

    assert_eq!(model.sort_by().len(), 1);
    assert_eq!(
        grid.column(gridsync_model::AUTO_GROUP_COL_ID).expect("column").sort,
        Some(SortDirection::Desc)
    );
}

#[test]
fn test_abs_toggle_clears_and_redraws() {
    let (mut model, grid) = bound_model(GridConfig::default());
    model.set_sort_by(["qty|desc"]).expect("set sort by");
    assert_eq!(grid.displayed_ids(), vec!["ag_1", "ag_2", "ag_3"]);
    grid.reset_calls();

    model.set_sort_by(["qty|desc|abs"]).expect("set sort by");

    assert_eq!(grid.call_count("redraw_rows"), 1);
    assert_eq!(grid.call_count("apply_column_state"), 2);
    assert!(grid.column("qty").expect("column").sort_abs);
    assert_eq!(grid.displayed_ids(), vec!["ag_3", "ag_1", "ag_2"]);

    grid.reset_calls();
    model.set_sort_by(["qty|asc|abs"]).expect("set sort by");
    assert_eq!(grid.call_count("redraw_rows"), 0);
}

#[test]
fn test_external_sort_applies_after_data() {
    let grid = MemoryGrid::new();
    let config = GridConfig::default().with_external_sort(true);
    let mut model = GridModel::new(config, product_columns()).expect("model");
    model.bind(grid.handle()).expect("bind");

    model.set_sort_by(["qty|desc"]).expect("set sort by");
    assert_eq!(grid.column("qty").expect("column").sort, None);

    model.load_data(products()).expect("load data");
    assert_eq!(
        grid.column("qty").expect("column").sort,
        Some(SortDirection::Desc)
    );
}

#[test]
fn test_summary_record_is_pinned() {
    let config = GridConfig::default().with_show_summary(ShowSummary::Top);
    let (mut model, grid) = bound_model(config);

    model
        .set_summary(Some(Record::summary("total").with("qty", -2)))
        .expect("set summary");
    let top = grid.pinned_top_rows();
    assert_eq!(top.len(), 1);
    assert!(top[0].is_summary());
    assert!(grid.pinned_bottom_rows().is_empty());

    model.set_show_summary(ShowSummary::Bottom).expect("set show summary");
    assert!(grid.pinned_top_rows().is_empty());
    assert_eq!(grid.pinned_bottom_rows().len(), 1);

    model.set_summary(None).expect("set summary");
    assert!(grid.pinned_bottom_rows().is_empty());
}

#[test]
fn test_other_pinned_rows_are_kept() {
    let config = GridConfig::default().with_show_summary(ShowSummary::Top);
    let (mut model, mut grid) = bound_model(config);
    let banner = Record::new("banner").into_ref();
    grid.set_pinned_top_rows(vec![banner]);

    model.set_summary(Some(Record::summary("total"))).expect("set summary");

    let ids: Vec<String> = grid
        .pinned_top_rows()
        .iter()
        .map(|it| it.id().to_string())
        .collect();
    assert_eq!(ids, vec!["total", "banner"]);
}

#[test]
fn test_refresh_complex_cells() {
    let (mut model, grid) = bound_model(GridConfig::default());
    grid.reset_calls();

    model.refresh_complex_cells().expect("refresh complex cells");

    let refreshes = grid.refreshes();
    assert_eq!(refreshes.len(), 1);
    assert!(refreshes[0].row_ids.is_empty());
    assert_eq!(refreshes[0].col_ids, vec!["price"]);

    model.hide_column("price").expect("hide column");
    grid.reset_calls();
    model.refresh_complex_cells().expect("refresh complex cells");
    assert!(grid.refreshes().is_empty());
}

#[test]
fn test_row_heights_follow_sizing_mode() {
    let (mut model, grid) = bound_model(GridConfig::default());
    assert_eq!(grid.row_height("ag_1"), Some(28));

    model
        .set_sizing_mode(gridsync_model::SizingMode::Compact)
        .expect("set sizing mode");
    // Row heights are recomputed on the next tick.
    assert_eq!(grid.row_height("ag_1"), Some(28));
    model.settle().expect("settle");

    assert_eq!(grid.row_height("ag_1"), Some(24));
    assert_eq!(model.row_height(), 24);
}

#[test]
fn test_unbind_stops_pushing() {
    let (mut model, grid) = bound_model(GridConfig::default());
    assert!(model.unbind().is_some());
    grid.reset_calls();

    model.set_sort_by(["name"]).expect("set sort by");
    assert!(!model.is_ready());
    assert!(grid.calls().is_empty());
}

#[test]
fn test_restore_drops_stale_persisted_state() {
    let (mut model, grid) = bound_model(GridConfig::default());
    let saved: gridsync_core::GridPersistState = serde_json::from_str(
        r#"{
            "columns": [{"col_id": "qty", "width": 90}, {"col_id": "name"}, {"col_id": "discount"}],
            "sort_by": ["qty|desc"],
            "group_by": ["region"]
        }"#,
    )
    .expect("parse");

    model.restore_state(&saved).expect("restore state");
    model.settle().expect("settle");

    let ids: Vec<&str> = model
        .column_state()
        .iter()
        .map(|it| it.col_id.as_str())
        .collect();
    assert_eq!(ids, vec!["qty", "region", "name", "price"]);
    assert_eq!(grid.column("qty").expect("column").width, 90);
    assert_eq!(grid.column("qty").expect("column").sort, Some(SortDirection::Desc));
    assert_eq!(grid.row_group_columns(), vec!["region"]);

    // A save from an older column set: the sort is ignored, the grouping dropped.
    let stale: gridsync_core::GridPersistState =
        serde_json::from_str(r#"{"sort_by": ["discount"], "group_by": ["discount"]}"#).expect("parse");
    model.restore_state(&stale).expect("restore state");

    assert_eq!(model.sort_by()[0].col_id, "qty");
    assert!(model.group_by().is_empty());
    assert!(grid.row_group_columns().is_empty());
    assert_eq!(model.persistable_state().sort_by, model.sort_by());
}

#[test]
fn test_persisted_state_omits_fixed_widths() {
    let columns: Vec<ColumnNode> = vec![
        Column::new("name").with_width(120).into(),
        Column::new("actions").with_width(40).with_resizable(false).into(),
    ];
    let mut model = GridModel::new(GridConfig::default(), columns).expect("model");
    model.load_data(products()).expect("load data");

    let state = model.persistable_state();
    assert_eq!(state.columns[0].width, Some(120));
    assert_eq!(state.columns[1].col_id, "actions");
    assert_eq!(state.columns[1].width, None);
    // The live state keeps the width.
    assert_eq!(model.column_state()[1].width, Some(40));
}

#[test]
fn test_restore_defaults_brings_back_initial_layout() {
    let grid = MemoryGrid::new().with_viewport_width(800);
    let mut model = GridModel::new(GridConfig::default(), product_columns())
        .expect("model")
        .with_sort_by(["qty|desc"])
        .expect("with sort by");
    model.load_data(products()).expect("load data");
    model.bind(grid.handle()).expect("bind");
    model.settle().expect("settle");
    let initial = model.column_state().to_vec();

    model.set_sort_by(["name"]).expect("set sort by");
    model.set_group_by(["region"]).expect("set group by");
    model
        .set_filter(Some(Filter::field("region", FilterOp::Eq, "EU")))
        .expect("set filter");
    grid.ui_resize_column("name", 300);
    model.settle().expect("settle");
    assert!(model.column_state()[0].manually_sized);

    model.restore_defaults().expect("restore defaults");
    model.settle().expect("settle");

    assert_eq!(model.column_state(), initial.as_slice());
    assert_eq!(grid.column("name").expect("column").width, 120);
    let sort_by: Vec<String> = model.sort_by().iter().map(ToString::to_string).collect();
    assert_eq!(sort_by, vec!["qty|desc"]);
    assert!(model.group_by().is_empty());
    assert!(grid.row_group_columns().is_empty());
    assert!(model.store().filter().is_none());
    assert_eq!(grid.row_ids().len(), 3);
}
