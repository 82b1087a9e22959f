//! Column width estimation for grid autosizing.
//!
//! Widths are estimated without laying out every record: a cheap text measurement
//! narrows each column to its widest candidates, and only those are measured exactly.

pub mod calculator;
pub mod error;
pub mod fill;
pub mod measure;

pub use calculator::{
    ColumnWidthCalculator, RowClassFn, SIZE_CALC_SAMPLES, SizingContext, clamp_width,
    is_column_filtered,
};
pub use error::{AutosizeError, Result};
pub use fill::{FillColumn, calc_fill_widths, fill_evenly, fill_sequentially};
pub use measure::{CellMeasure, CellProbe, FixedMetrics, HeaderProbe, TextMeasurer, strip_tags};
