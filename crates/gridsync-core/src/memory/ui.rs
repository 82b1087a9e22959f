//! User interactions with the in-memory grid.
//!
//! Each method changes engine state the way a user gesture would, and queues the event
//! the gesture raises, tagged with its UI source.

use gridsync_model::Pinned;

use crate::events::{EventSource, GridEvent};

use super::MemoryGrid;

impl MemoryGrid {
    /// Drag a column edge to `width` and release.
    pub fn ui_resize_column(&self, col_id: &str, width: u32) {
        let mut e = self.inner.borrow_mut();
        let Some(col) = e.column_mut(col_id) else {
            return;
        };
        col.state.width = width;
        e.emit(GridEvent::ColumnResized {
            col_id: Some(col_id.to_string()),
            width: Some(width),
            source: EventSource::UiColumnResized,
            finished: true,
        });
    }

    /// Double-click a column edge to size it to its content.
    pub fn ui_autosize_column(&self, col_id: &str, width: u32) {
        let mut e = self.inner.borrow_mut();
        let Some(col) = e.column_mut(col_id) else {
            return;
        };
        col.state.width = width;
        e.emit(GridEvent::ColumnResized {
            col_id: Some(col_id.to_string()),
            width: Some(width),
            source: EventSource::AutosizeColumns,
            finished: true,
        });
    }

    /// Drag a column header to `to_index` and drop it.
    pub fn ui_move_column(&self, col_id: &str, to_index: usize) {
        let mut e = self.inner.borrow_mut();
        let Some(from) = e.columns.iter().position(|it| it.state.col_id == col_id) else {
            return;
        };
        let col = e.columns.remove(from);
        let at = to_index.min(e.columns.len());
        e.columns.insert(at, col);
        e.emit(GridEvent::DragStopped);
    }

    /// Toggle a column in the columns tool panel.
    pub fn ui_set_column_visible(&self, col_id: &str, visible: bool) {
        let mut e = self.inner.borrow_mut();
        let Some(col) = e.column_mut(col_id) else {
            return;
        };
        col.state.hide = !visible;
        e.emit(GridEvent::ColumnVisible {
            source: EventSource::ToolPanelUi,
        });
    }

    /// Pin or unpin a column from its header menu.
    pub fn ui_pin_column(&self, col_id: &str, pinned: Option<Pinned>) {
        let mut e = self.inner.borrow_mut();
        let Some(col) = e.column_mut(col_id) else {
            return;
        };
        col.state.pinned = pinned;
        e.emit(GridEvent::ColumnPinned {
            source: EventSource::ColumnMenu,
        });
    }

    /// Change row grouping from `source`, e.g. the tool panel or a header drag.
    pub fn ui_set_row_groups(&self, col_ids: &[&str], source: EventSource) {
        let mut e = self.inner.borrow_mut();
        e.group_cols = col_ids
            .iter()
            .filter(|id| e.columns.iter().any(|c| c.state.col_id == **id))
            .map(|id| id.to_string())
            .collect();
        let group_cols = e.group_cols.clone();
        for col in &mut e.columns {
            col.state.row_group_index = group_cols.iter().position(|it| *it == col.state.col_id);
        }
        e.sync_auto_group_column();
        e.emit(GridEvent::ColumnRowGroupChanged { source });
    }

    /// Click rows, replacing the selection.
    pub fn ui_select(&self, ids: &[&str]) {
        let mut e = self.inner.borrow_mut();
        let selected: Vec<String> = ids
            .iter()
            .filter(|id| e.has_row(id))
            .map(|id| id.to_string())
            .collect();
        e.selected = selected;
        e.emit(GridEvent::SelectionChanged {
            source: EventSource::RowClicked,
        });
    }

    /// Click the expand chevron of a group or parent row.
    pub fn ui_toggle_expanded(&self, id: &str) {
        let mut e = self.inner.borrow_mut();
        let expanded = !e.expanded.contains(id);
        if expanded {
            e.expanded.insert(id.to_string());
        } else {
            e.expanded.remove(id);
        }
        e.emit(GridEvent::RowGroupOpened {
            node_id: id.to_string(),
            expanded,
        });
    }
}
