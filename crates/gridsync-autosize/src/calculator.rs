//! Required-width estimation for one column over a set of records.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use gridsync_model::{
    Column, Filter, GridSorter, HeaderMenuDisplay, Record, RecordRef, RecordSet, SizingMode,
};
use tracing::warn;

use crate::error::{AutosizeError, Result};
use crate::measure::{
    CellMeasure, CellProbe, FixedMetrics, HeaderProbe, TextMeasurer, strip_tags,
};

/// Widest estimated values carried forward to exact measurement.
pub const SIZE_CALC_SAMPLES: usize = 10;

pub type RowClassFn = dyn Fn(&Record) -> Vec<String> + Send + Sync;

/// Grid state that affects measured widths.
#[derive(Clone, Copy)]
pub struct SizingContext<'a> {
    pub sizing_mode: SizingMode,
    pub sort_by: &'a [GridSorter],
    pub filter: Option<&'a Filter>,
    pub header_menu_display: HeaderMenuDisplay,
    /// Set for tree grids whose records have children; tree columns are then sized per depth.
    pub tree: Option<&'a RecordSet>,
    pub buffer_px: u32,
    pub row_class: Option<&'a RowClassFn>,
}

impl<'a> SizingContext<'a> {
    pub fn new(sizing_mode: SizingMode, buffer_px: u32) -> Self {
        Self {
            sizing_mode,
            sort_by: &[],
            filter: None,
            header_menu_display: HeaderMenuDisplay::Always,
            tree: None,
            buffer_px,
            row_class: None,
        }
    }
}

struct Estimate<'r> {
    markup: String,
    width: f64,
    records: Vec<&'r RecordRef>,
}

/// Two-phase width estimator.
///
/// Every distinct rendered value is first estimated with the [`TextMeasurer`]; only the
/// widest [`SIZE_CALC_SAMPLES`] are then measured exactly with the [`CellProbe`], under
/// each row/cell class combination their records produce.
pub struct ColumnWidthCalculator {
    measurer: Box<dyn TextMeasurer + Send>,
    probe: Box<dyn CellProbe + Send>,
    samples: usize,
}

impl Default for ColumnWidthCalculator {
    fn default() -> Self {
        Self::new(FixedMetrics::default(), FixedMetrics::default())
    }
}

impl ColumnWidthCalculator {
    pub fn new(
        measurer: impl TextMeasurer + Send + 'static,
        probe: impl CellProbe + Send + 'static,
    ) -> Self {
        Self {
            measurer: Box::new(measurer),
            probe: Box::new(probe),
            samples: SIZE_CALC_SAMPLES,
        }
    }

    #[must_use]
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples.max(1);
        self
    }

    /// Width needed by `col`, clamped to its autosize bounds.
    ///
    /// Header and data failures are logged and only drop their own part. `None` when
    /// neither part produced a width.
    pub fn calc_width(
        &mut self,
        col: &Column,
        records: &[RecordRef],
        ctx: &SizingContext<'_>,
    ) -> Option<u32> {
        let header = self.calc_header_width(col, ctx).unwrap_or_else(|err| {
            warn!(col_id = %col.col_id, error = %err, "error calculating max header width");
            None
        });
        let data = self.calc_data_width(col, records, ctx).unwrap_or_else(|err| {
            warn!(col_id = %col.col_id, error = %err, "error calculating max data width");
            None
        });

        let width = header.into_iter().chain(data).max()?;
        Some(clamp_width(
            width,
            col.effective_autosize_min_width(),
            col.effective_autosize_max_width(),
        ))
    }

    pub fn calc_header_width(
        &mut self,
        col: &Column,
        ctx: &SizingContext<'_>,
    ) -> Result<Option<u32>> {
        if !col.autosize_include_header {
            return Ok(None);
        }
        let include_icons = col.autosize_include_header_icons;
        let markup = col.header_text().map_err(|source| AutosizeError::Header {
            col_id: col.col_id.clone(),
            source,
        })?;

        let show_sort = col.sortable
            && (include_icons || ctx.sort_by.iter().any(|it| it.col_id == col.col_id));
        let mut show_menu = col.filterable && ctx.filter.is_some() && include_icons;
        // Hover menus only need room while the column is filtered.
        if show_menu && ctx.header_menu_display == HeaderMenuDisplay::Hover {
            show_menu = ctx
                .filter
                .is_some_and(|filter| is_column_filtered(filter, col));
        }

        let width = self.probe.header_width(&HeaderProbe {
            markup: &markup,
            classes: &col.header_class,
            sizing_mode: ctx.sizing_mode,
            show_sort,
            show_menu,
        });
        Ok(Some(to_px(width) + buffer_px(col, ctx)))
    }

    pub fn calc_data_width(
        &mut self,
        col: &Column,
        records: &[RecordRef],
        ctx: &SizingContext<'_>,
    ) -> Result<Option<u32>> {
        if records.is_empty() {
            return Ok(None);
        }

        let tree = ctx
            .tree
            .filter(|rs| col.is_tree_column && rs.is_hierarchical());
        let Some(tree) = tree else {
            let all: Vec<&RecordRef> = records.iter().collect();
            return self.calc_level_width(col, &all, ctx, 0).map(Some);
        };

        let mut by_depth: BTreeMap<usize, Vec<&RecordRef>> = BTreeMap::new();
        for rec in records {
            by_depth.entry(tree.depth(rec.id())).or_default().push(rec);
        }
        let mut ret = 0;
        for (depth, level) in by_depth {
            // One extra level for the expand/collapse affordance.
            let indent = (self.probe.indent_per_level() * (depth + 1) as f64).ceil() as u32;
            ret = ret.max(self.calc_level_width(col, &level, ctx, indent)?);
        }
        Ok(Some(ret))
    }

    fn calc_level_width(
        &mut self,
        col: &Column,
        records: &[&RecordRef],
        ctx: &SizingContext<'_>,
        indent_px: u32,
    ) -> Result<u32> {
        let mut estimates: Vec<Estimate<'_>> = Vec::new();
        let mut by_markup: HashMap<String, usize> = HashMap::new();
        let mut memo: Option<HashMap<String, String>> =
            (col.renderer.is_some() && !col.renderer_is_complex).then(HashMap::new);

        for &rec in records {
            let raw = col.value(rec);
            let memo_key = format!("{raw:?}");
            let cached = memo.as_ref().and_then(|m| m.get(&memo_key)).cloned();
            let markup = match cached {
                Some(markup) => markup,
                None => {
                    let markup = col.render(rec).map_err(|source| AutosizeError::Cell {
                        col_id: col.col_id.clone(),
                        record_id: rec.id().clone(),
                        source,
                    })?;
                    if let Some(memo) = memo.as_mut() {
                        memo.insert(memo_key, markup.clone());
                    }
                    markup
                }
            };

            match by_markup.get(&markup) {
                Some(idx) => estimates[*idx].records.push(rec),
                None => {
                    let width = if markup.is_empty() {
                        0.0
                    } else {
                        self.measurer.text_width(&strip_tags(&markup))
                            + f64::from(indent_px)
                    };
                    by_markup.insert(markup.clone(), estimates.len());
                    estimates.push(Estimate {
                        markup,
                        width,
                        records: vec![rec],
                    });
                }
            }
        }

        estimates.sort_by(|a, b| a.width.total_cmp(&b.width));
        let skip = estimates.len().saturating_sub(self.samples);

        let classed = col.cell_class.is_some()
            || !col.cell_class_rules.is_empty()
            || ctx.row_class.is_some();
        let mut ret = 0;
        for est in &estimates[skip..] {
            let mut combos: BTreeSet<(Vec<String>, Vec<String>)> = BTreeSet::new();
            if classed {
                for rec in &est.records {
                    let row_classes = ctx.row_class.map(|f| f(&**rec)).unwrap_or_default();
                    combos.insert((row_classes, col.cell_classes(rec)));
                }
            } else {
                combos.insert((Vec::new(), Vec::new()));
            }

            for (row_classes, cell_classes) in &combos {
                let width = self.probe.cell_width(&CellMeasure {
                    markup: &est.markup,
                    row_classes,
                    cell_classes,
                    sizing_mode: ctx.sizing_mode,
                });
                ret = ret.max(to_px(width) + indent_px + buffer_px(col, ctx));
            }
        }
        Ok(ret)
    }
}

/// True if `filter`, or any filter nested in it, targets the column's field.
pub fn is_column_filtered(filter: &Filter, col: &Column) -> bool {
    filter.references_field(&col.field)
}

/// Clamp to `[min, max]`; a bound that is absent does not apply.
pub fn clamp_width(width: u32, min: Option<u32>, max: Option<u32>) -> u32 {
    let mut ret = width;
    if let Some(min) = min {
        ret = ret.max(min);
    }
    if let Some(max) = max {
        ret = ret.min(max);
    }
    ret
}

fn buffer_px(col: &Column, ctx: &SizingContext<'_>) -> u32 {
    col.autosize_buffer_px.unwrap_or(ctx.buffer_px)
}

fn to_px(width: f64) -> u32 {
    if width.is_finite() && width > 0.0 {
        width.ceil() as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsync_model::{FilterOp, RenderError, Value};

    fn records(values: &[&str]) -> Vec<RecordRef> {
        values
            .iter()
            .enumerate()
            .map(|(idx, v)| Record::new(idx).with("name", *v).into_ref())
            .collect()
    }

    fn ctx() -> SizingContext<'static> {
        SizingContext::new(SizingMode::Standard, 5)
    }

    #[test]
    fn data_width_uses_widest_value() {
        let mut calc = ColumnWidthCalculator::default();
        let col = Column::new("name").with_header_name("N");
        let width = calc
            .calc_data_width(&col, &records(&["a", "abcd", "ab"]), &ctx())
            .expect("width");
        // 4 chars * 7 + 12 padding + 5 buffer
        assert_eq!(width, Some(45));
    }

    #[test]
    fn header_reserves_icon_space() {
        let mut calc = ColumnWidthCalculator::default();
        let col = Column::new("name").with_header_name("Name");
        let with_icons = calc.calc_header_width(&col, &ctx()).expect("header");
        // 28 text + 12 padding + 16 sort icon + 5 buffer
        assert_eq!(with_icons, Some(61));

        let mut no_icons = col.clone();
        no_icons.autosize_include_header_icons = false;
        assert_eq!(calc.calc_header_width(&no_icons, &ctx()).expect("header"), Some(45));

        let sort_by = [GridSorter::asc("name")];
        let sorted = SizingContext {
            sort_by: &sort_by,
            ..ctx()
        };
        assert_eq!(calc.calc_header_width(&no_icons, &sorted).expect("header"), Some(61));
    }

    #[test]
    fn hover_menu_only_counts_when_filtered() {
        let mut calc = ColumnWidthCalculator::default();
        let col = Column::new("name")
            .with_header_name("Name")
            .with_sortable(false)
            .with_filterable(true);
        let other = Filter::field("other", FilterOp::Eq, 1);
        let own = Filter::and(vec![Filter::field("name", FilterOp::Eq, "x")]);

        let hover = |filter| SizingContext {
            filter: Some(filter),
            header_menu_display: HeaderMenuDisplay::Hover,
            ..ctx()
        };
        assert_eq!(calc.calc_header_width(&col, &hover(&other)).expect("h"), Some(45));
        assert_eq!(calc.calc_header_width(&col, &hover(&own)).expect("h"), Some(61));
    }

    #[test]
    fn result_is_clamped() {
        let mut calc = ColumnWidthCalculator::default();
        let col = Column::new("name").with_autosize_bounds(Some(10), Some(40));
        assert_eq!(calc.calc_width(&col, &records(&["abcdefghij"]), &ctx()), Some(40));
    }

    #[test]
    fn tree_columns_add_indentation_per_depth() {
        let rs = RecordSet::new([
            Record::new("a").with("name", "abc").into_ref(),
            Record::new("b").with_parent("a").with("name", "ab").into_ref(),
        ])
        .expect("records");
        let mut calc = ColumnWidthCalculator::default();
        let col = Column::new("name").tree_column();
        let tree_ctx = SizingContext {
            tree: Some(&rs),
            ..ctx()
        };
        let width = calc
            .calc_data_width(&col, rs.list(), &tree_ctx)
            .expect("width");
        // depth 1: 14 text + 12 padding + 40 indent + 5 buffer beats depth 0 (21 + 12 + 20 + 5)
        assert_eq!(width, Some(71));
    }

    #[test]
    fn renderer_failure_drops_only_data_part() {
        let mut calc = ColumnWidthCalculator::default();
        let col = Column::new("name")
            .with_header_name("Name")
            .with_renderer(|_: &Value, _: &Record| Err(RenderError::new("boom")));
        assert!(calc.calc_data_width(&col, &records(&["x"]), &ctx()).is_err());
        assert_eq!(calc.calc_width(&col, &records(&["x"]), &ctx()), Some(61));
    }

    #[test]
    fn only_widest_samples_are_probed() {
        let mut calc = ColumnWidthCalculator::default().with_samples(1);
        let col = Column::new("name").with_cell_class_rule("wide", |v, _| v.as_str() == Some("a"));
        calc.probe = Box::new(FixedMetrics::default().with_class_extra("wide", 100.0));
        // "a" carries a wide class but is not among the sampled widest values.
        let width = calc
            .calc_data_width(&col, &records(&["a", "abc"]), &ctx())
            .expect("width");
        assert_eq!(width, Some(38));
    }

    #[test]
    fn empty_records_have_no_data_width() {
        let mut calc = ColumnWidthCalculator::default();
        let col = Column::new("name");
        assert_eq!(calc.calc_data_width(&col, &[], &ctx()).expect("width"), None);
    }
}
