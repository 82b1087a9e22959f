use std::collections::BTreeMap;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use gridsync_core::{AutosizeOutcome, Overlay};

use crate::replay::{GridSnapshot, ReplayReport};

pub fn print_report(report: &ReplayReport, with_calls: bool) {
    println!("{}", render_report(report, with_calls));
}

/// Render a replay report as text tables.
pub fn render_report(report: &ReplayReport, with_calls: bool) -> String {
    let mut out = String::new();
    if let Some(name) = &report.name {
        out.push_str(&format!("Scenario: {name}\n"));
    }
    out.push_str(&format!("Steps: {}\n", report.steps));

    for snapshot in &report.snapshots {
        out.push('\n');
        render_snapshot(&mut out, snapshot);
    }
    out.push('\n');
    render_snapshot(&mut out, &report.state);

    match &report.autosize {
        Some(AutosizeOutcome::Applied { col_ids, changes }) => out.push_str(&format!(
            "Autosize: applied to {} column(s), {} change(s)\n",
            col_ids.len(),
            changes.len()
        )),
        Some(AutosizeOutcome::Discarded { col_ids }) => out.push_str(&format!(
            "Autosize: discarded for {} column(s), data changed while measuring\n",
            col_ids.len()
        )),
        None => {}
    }

    if with_calls {
        out.push('\n');
        out.push_str(&calls_table(&report.calls).to_string());
        out.push('\n');
    }
    out
}

fn render_snapshot(out: &mut String, snapshot: &GridSnapshot) {
    let title = snapshot.label.as_deref().unwrap_or("Final state");
    out.push_str(&format!("{title}\n"));
    out.push_str(&columns_table(snapshot).to_string());
    out.push('\n');

    let sort_by = if snapshot.sort_by.is_empty() {
        "-".to_string()
    } else {
        snapshot
            .sort_by
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    out.push_str(&format!("Sort: {sort_by}\n"));
    out.push_str(&format!("Group: {}\n", join_or_dash(&snapshot.group_by)));
    let selection: Vec<String> = snapshot.selection.iter().map(ToString::to_string).collect();
    out.push_str(&format!("Selection: {}\n", join_or_dash(&selection)));
    out.push_str(&format!("Rows: {}\n", join_or_dash(&snapshot.rows)));
    match snapshot.overlay {
        Overlay::None => {}
        Overlay::Loading => out.push_str("Overlay: loading\n"),
        Overlay::NoRows => out.push_str("Overlay: no rows\n"),
    }
}

fn columns_table(snapshot: &GridSnapshot) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Width"),
        header_cell("Engine"),
        header_cell("Hidden"),
        header_cell("Pinned"),
        header_cell("Sort"),
        header_cell("Manual"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);
    align_column(&mut table, 6, CellAlignment::Center);

    for column in &snapshot.columns {
        let id_cell = if column.hidden {
            dim_cell(&column.col_id)
        } else {
            Cell::new(&column.col_id)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold)
        };
        let engine_cell = match (column.width, column.engine_width) {
            (Some(declared), Some(live)) if declared != live => {
                Cell::new(live).fg(Color::Yellow)
            }
            (_, Some(live)) => Cell::new(live),
            (_, None) => dim_cell("-"),
        };
        table.add_row(vec![
            id_cell,
            option_cell(column.width),
            engine_cell,
            flag_cell(column.hidden),
            option_cell(column.pinned),
            option_cell(column.sort),
            flag_cell(column.manually_sized),
        ]);
    }
    table
}

fn calls_table(calls: &BTreeMap<String, usize>) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Engine call"), header_cell("Count")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for (name, count) in calls {
        table.add_row(vec![Cell::new(name), Cell::new(count)]);
    }
    table
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn join_or_dash(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}

fn option_cell<T: ToString>(value: Option<T>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
    }
}

fn flag_cell(value: bool) -> Cell {
    if value {
        Cell::new("yes").fg(Color::Green)
    } else {
        dim_cell("-")
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
