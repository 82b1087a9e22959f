//! Growing autosized columns into leftover horizontal space.

use gridsync_model::{ColumnNode, ColumnState, ColumnStateChange, FillMode, find_column};
use tracing::warn;

/// Current width and growth cap of a fill candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillColumn {
    pub col_id: String,
    pub width: u32,
    pub max_width: Option<u32>,
}

impl FillColumn {
    pub fn new(col_id: impl Into<String>, width: u32, max_width: Option<u32>) -> Self {
        Self {
            col_id: col_id.into(),
            width,
            max_width,
        }
    }
}

/// Split `remaining` evenly across columns, re-splitting as columns hit their max width.
pub fn fill_evenly(columns: &[FillColumn], mut remaining: u32) -> Vec<ColumnStateChange> {
    let mut widths: Vec<u32> = columns.iter().map(|col| col.width).collect();
    let mut grown = vec![false; columns.len()];

    while remaining > 0 {
        let targets: Vec<usize> = (0..columns.len())
            .filter(|idx| columns[*idx].max_width.is_none_or(|max| widths[*idx] < max))
            .collect();
        if targets.is_empty() {
            break;
        }
        let target_add = remaining / targets.len() as u32;
        if target_add == 0 {
            break;
        }

        for idx in targets {
            let current = widths[idx];
            let extra = columns[idx]
                .max_width
                .map_or(target_add, |max| max.saturating_sub(current).min(target_add));
            if extra > 0 {
                remaining -= extra;
                widths[idx] = current + extra;
                grown[idx] = true;
            }
        }
    }

    columns
        .iter()
        .zip(widths)
        .zip(grown)
        .filter(|(_, grown)| *grown)
        .map(|((col, width), _)| ColumnStateChange::new(col.col_id.clone()).width(width))
        .collect()
}

/// Grant `remaining` to columns in the given order, each up to its max width.
pub fn fill_sequentially<'a>(
    columns: impl IntoIterator<Item = &'a FillColumn>,
    mut remaining: u32,
) -> Vec<ColumnStateChange> {
    let mut ret = Vec::new();
    for col in columns {
        let extra = col
            .max_width
            .map_or(remaining, |max| max.saturating_sub(col.width).min(remaining));
        if extra > 0 {
            remaining -= extra;
            ret.push(ColumnStateChange::new(col.col_id.clone()).width(col.width + extra));
        }
        if remaining == 0 {
            break;
        }
    }
    ret
}

/// Width changes that fill the viewport after an autosize of `col_ids`.
///
/// Nothing is filled while any visible column is flex, since flex already claims the
/// leftover space. Pinned and hidden columns never grow. `available` is the viewport
/// width; without it nothing can be filled.
pub fn calc_fill_widths(
    state: &[ColumnState],
    columns: &[ColumnNode],
    col_ids: &[String],
    fill_mode: FillMode,
    available: Option<u32>,
) -> Vec<ColumnStateChange> {
    if fill_mode == FillMode::None {
        return Vec::new();
    }

    let any_visible_flex = state.iter().filter(|it| !it.hidden).any(|it| {
        find_column(columns, &it.col_id).is_some_and(|col| col.is_flex())
    });
    if any_visible_flex {
        return Vec::new();
    }

    let candidates: Vec<FillColumn> = col_ids
        .iter()
        .filter_map(|id| {
            let col_state = state.iter().find(|it| &it.col_id == id)?;
            if col_state.hidden || col_state.pinned.is_some() {
                return None;
            }
            let col = find_column(columns, id)?;
            Some(FillColumn::new(
                id.clone(),
                col_state.width.unwrap_or(0),
                col.effective_autosize_max_width(),
            ))
        })
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    let Some(available) = available else {
        warn!("grid not rendered, unable to fill columns");
        return Vec::new();
    };

    let total: u32 = state
        .iter()
        .filter(|it| !it.hidden)
        .filter_map(|it| it.width)
        .sum();
    let Some(remaining) = available.checked_sub(total).filter(|r| *r > 0) else {
        return Vec::new();
    };

    match fill_mode {
        FillMode::All => fill_evenly(&candidates, remaining),
        FillMode::Left => fill_sequentially(&candidates, remaining),
        FillMode::Right => fill_sequentially(candidates.iter().rev(), remaining),
        FillMode::None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsync_model::{Column, Pinned};

    fn widths(changes: &[ColumnStateChange]) -> Vec<(&str, u32)> {
        changes
            .iter()
            .map(|it| (it.col_id.as_str(), it.width.unwrap_or_default()))
            .collect()
    }

    #[test]
    fn even_fill_redistributes_capped_space() {
        let cols = [
            FillColumn::new("a", 50, Some(60)),
            FillColumn::new("b", 50, None),
            FillColumn::new("c", 50, None),
        ];
        let changes = fill_evenly(&cols, 90);
        // First pass: 30 each, "a" capped at +10. Second pass: 20 left over, 10 each.
        assert_eq!(widths(&changes), [("a", 60), ("b", 90), ("c", 90)]);
    }

    #[test]
    fn even_fill_stops_when_share_rounds_to_zero() {
        let cols = [FillColumn::new("a", 10, None), FillColumn::new("b", 10, None)];
        assert!(fill_evenly(&cols, 1).is_empty());
    }

    #[test]
    fn sequential_fill_respects_order() {
        let cols = [
            FillColumn::new("a", 50, Some(70)),
            FillColumn::new("b", 50, None),
        ];
        assert_eq!(widths(&fill_sequentially(&cols, 30)), [("a", 70), ("b", 60)]);
        assert_eq!(widths(&fill_sequentially(cols.iter().rev(), 30)), [("b", 80)]);
    }

    #[test]
    fn fill_skips_flex_and_pinned() {
        let columns: Vec<ColumnNode> = vec![
            Column::new("a").into(),
            Column::new("b").with_pinned(Pinned::Left).into(),
        ];
        let mut state = gridsync_model::initial_column_state(&columns);
        let ids = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            widths(&calc_fill_widths(&state, &columns, &ids, FillMode::All, Some(200))),
            [("a", 140)]
        );

        let flexed: Vec<ColumnNode> = vec![
            Column::new("a").into(),
            Column::new("b").with_flex(1).into(),
        ];
        state = gridsync_model::initial_column_state(&flexed);
        assert!(calc_fill_widths(&state, &flexed, &ids, FillMode::All, Some(200)).is_empty());
        assert!(calc_fill_widths(&state, &columns, &ids, FillMode::All, None).is_empty());
    }
}
