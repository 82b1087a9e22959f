//! Feeding live engine events back into declarative state.

use tracing::trace;

use crate::error::Result;
use crate::events::{EventSource, GridEvent};
use crate::scheduler::Pass;

use super::GridModel;

impl GridModel {
    pub(super) fn handle_engine_events(&mut self) -> Result<()> {
        let Ok(api) = self.ag.api_mut() else {
            return Ok(());
        };
        for event in api.drain_events() {
            self.on_engine_event(event)?;
        }
        Ok(())
    }

    fn on_engine_event(&mut self, event: GridEvent) -> Result<()> {
        trace!(event = event.name(), "engine event");
        match event {
            // Bulk selection fires once per row; coalesce into one pull next tick.
            GridEvent::SelectionChanged { .. } => self.scheduler.defer(Pass::NativeSelection),
            GridEvent::DragStopped => {
                let live = self.ag.api()?.column_state();
                self.note_ag_column_state_changed(&live)?;
            }
            GridEvent::ColumnResized {
                col_id,
                width,
                source,
                finished: true,
            } => match source {
                EventSource::UiColumnResized => {
                    if let (Some(col_id), Some(width)) = (col_id, width) {
                        self.note_column_manually_sized(&col_id, width)?;
                    }
                }
                EventSource::AutosizeColumns => {
                    let live = self.ag.api()?.column_state();
                    self.note_ag_column_state_changed(&live)?;
                }
                _ => {}
            },
            GridEvent::ColumnResized { .. } => {}
            GridEvent::ColumnRowGroupChanged { source } if !source.is_api_or_drag() => {
                let group_by = self.ag.api()?.row_group_columns();
                self.set_group_by(group_by)?;
            }
            GridEvent::ColumnPinned { source } | GridEvent::ColumnVisible { source }
                if !source.is_api_or_drag() =>
            {
                let live = self.ag.api()?.column_state();
                self.note_ag_column_state_changed(&live)?;
            }
            GridEvent::ColumnRowGroupChanged { .. }
            | GridEvent::ColumnPinned { .. }
            | GridEvent::ColumnVisible { .. } => {}
            GridEvent::RowGroupOpened { .. } => self.note_expand_state_changed()?,
        }
        Ok(())
    }
}
