//! Autosize jobs: one column measured per tick, discarded if the data moves on.

use std::collections::VecDeque;
use std::sync::Arc;

use gridsync_autosize::ColumnWidthCalculator;
use gridsync_model::{AutosizeOptions, ColumnStateChange, RecordRef, RecordSet, SizingMode};
use serde::Serialize;

/// What an autosize request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AutosizeRequest {
    /// Nothing to size, autosizing disabled, or no engine bound.
    Skipped,
    Started,
    /// A job for the same data and sizing mode was already running; the request folds
    /// into it.
    Joined,
}

/// How a finished autosize job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum AutosizeOutcome {
    Applied {
        col_ids: Vec<String>,
        /// Measured widths followed by any fill growth.
        changes: Vec<ColumnStateChange>,
    },
    /// The filtered records changed while measuring; nothing was applied.
    Discarded { col_ids: Vec<String> },
}

/// An in-flight autosize.
pub(crate) struct AutosizeJob {
    pub options: AutosizeOptions,
    pub col_ids: Vec<String>,
    pub remaining: VecDeque<String>,
    pub records: Vec<RecordRef>,
    /// Filtered record set the job was started against.
    pub snapshot: Arc<RecordSet>,
    /// Sizing mode widths are being measured for.
    pub sizing_mode: SizingMode,
    pub widths: Vec<ColumnStateChange>,
}

impl AutosizeJob {
    pub fn is_done(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Whether the job still measures `filtered` records in `sizing_mode`.
    pub fn is_current(&self, filtered: &Arc<RecordSet>, sizing_mode: SizingMode) -> bool {
        Arc::ptr_eq(&self.snapshot, filtered) && self.sizing_mode == sizing_mode
    }
}

/// Width calculator plus the job it is working through.
pub(crate) struct Autosizer {
    pub calculator: ColumnWidthCalculator,
    pub job: Option<AutosizeJob>,
    pub last_outcome: Option<AutosizeOutcome>,
}

impl Autosizer {
    pub fn new(calculator: ColumnWidthCalculator) -> Self {
        Self {
            calculator,
            job: None,
            last_outcome: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.job.is_some()
    }
}
