//! Native events raised by the live engine.

use serde::{Deserialize, Serialize};

/// What caused a live engine event.
///
/// Handlers match on this to tell changes pushed by the reconciliation engine itself
/// (`Api`) from ones a user made in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventSource {
    Api,
    UiColumnDragged,
    UiColumnResized,
    AutosizeColumns,
    ToolPanelUi,
    ColumnMenu,
    RowClicked,
    RowDataChanged,
    Flex,
}

impl EventSource {
    /// Sources whose column and grouping events are echoes of our own pushes or of an
    /// in-progress drag, and so are not fed back into declarative state.
    pub fn is_api_or_drag(self) -> bool {
        matches!(self, Self::Api | Self::UiColumnDragged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GridEvent {
    SelectionChanged {
        source: EventSource,
    },
    ColumnResized {
        col_id: Option<String>,
        width: Option<u32>,
        source: EventSource,
        finished: bool,
    },
    ColumnPinned {
        source: EventSource,
    },
    ColumnVisible {
        source: EventSource,
    },
    ColumnRowGroupChanged {
        source: EventSource,
    },
    DragStopped,
    RowGroupOpened {
        node_id: String,
        expanded: bool,
    },
}

impl GridEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectionChanged { .. } => "selectionChanged",
            Self::ColumnResized { .. } => "columnResized",
            Self::ColumnPinned { .. } => "columnPinned",
            Self::ColumnVisible { .. } => "columnVisible",
            Self::ColumnRowGroupChanged { .. } => "columnRowGroupChanged",
            Self::DragStopped => "dragStopped",
            Self::RowGroupOpened { .. } => "rowGroupOpened",
        }
    }
}
