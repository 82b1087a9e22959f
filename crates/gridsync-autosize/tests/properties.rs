use gridsync_autosize::{FillColumn, clamp_width, fill_evenly, fill_sequentially};
use proptest::prelude::*;

fn fill_columns() -> impl Strategy<Value = Vec<FillColumn>> {
    proptest::collection::vec(
        (20u32..200, proptest::option::of(0u32..300)),
        1..8,
    )
    .prop_map(|cols| {
        cols.into_iter()
            .enumerate()
            .map(|(idx, (width, extra_cap))| {
                FillColumn::new(format!("c{idx}"), width, extra_cap.map(|cap| width + cap))
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn clamp_stays_within_bounds(width in any::<u32>(), min in 0u32..500, span in 0u32..500) {
        let max = min + span;
        let clamped = clamp_width(width, Some(min), Some(max));
        prop_assert!(min <= clamped && clamped <= max);
    }

    #[test]
    fn even_fill_conserves_space(cols in fill_columns(), remaining in 0u32..2000) {
        let changes = fill_evenly(&cols, remaining);
        let mut added = 0;
        for change in &changes {
            let col = cols.iter().find(|c| c.col_id == change.col_id).expect("known column");
            let width = change.width.expect("width set");
            prop_assert!(width > col.width);
            if let Some(max) = col.max_width {
                prop_assert!(width <= max);
            }
            added += width - col.width;
        }
        prop_assert!(added <= remaining);
    }

    #[test]
    fn sequential_fill_conserves_space(cols in fill_columns(), remaining in 0u32..2000) {
        let changes = fill_sequentially(&cols, remaining);
        let added: u32 = changes
            .iter()
            .map(|change| {
                let col = cols.iter().find(|c| c.col_id == change.col_id).expect("known column");
                change.width.unwrap_or(col.width) - col.width
            })
            .sum();
        prop_assert!(added <= remaining);
    }
}
