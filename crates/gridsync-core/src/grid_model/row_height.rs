//! Row heights and the scroll optimization.

use crate::error::Result;

use super::GridModel;

/// Inputs that determine the heights pushed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowHeightKey {
    pub scroll_optimization: bool,
    pub row_height: u32,
    pub group_row_height: u32,
}

impl GridModel {
    /// Height of record rows: the explicit override, else the larger of the sizing
    /// mode's height and any visible column's minimum row height.
    pub fn row_height(&self) -> u32 {
        if let Some(height) = self.config.row_height {
            return height;
        }
        let table = self.config.row_heights().row.get(self.config.sizing_mode);
        self.visible_leaf_columns()
            .into_iter()
            .filter_map(|col| col.row_height)
            .fold(table, u32::max)
    }

    pub fn group_row_height(&self) -> u32 {
        self.config.group_row_height.unwrap_or_else(|| {
            self.config
                .row_heights()
                .group_row
                .get(self.config.sizing_mode)
        })
    }

    /// Whether row heights are set on every node up front.
    ///
    /// Off with a fixed row height override, and off whenever a visible column sizes
    /// rows to its content, as assigned heights would fight content-driven heights.
    pub fn use_scroll_optimization(&self) -> bool {
        self.config.use_scroll_optimization
            && self.config.row_height.is_none()
            && !self.visible_leaf_columns().iter().any(|col| col.auto_height)
    }

    fn row_height_key(&self) -> RowHeightKey {
        RowHeightKey {
            scroll_optimization: self.use_scroll_optimization(),
            row_height: self.row_height(),
            group_row_height: self.group_row_height(),
        }
    }

    /// Drop cached heights and re-push pinned rows, whose heights the engine does not
    /// recompute on its own. Skipped when no height input changed.
    pub(super) fn sync_row_heights(&mut self) -> Result<()> {
        let key = self.row_height_key();
        if self.applied_row_heights == Some(key) {
            return Ok(());
        }
        self.applied_row_heights = Some(key);

        self.ag.api_mut()?.reset_row_heights();
        let top = self.ag.get_pinned_top_row_data()?;
        self.ag.set_pinned_top_row_data(top)?;
        let bottom = self.ag.get_pinned_bottom_row_data()?;
        self.ag.set_pinned_bottom_row_data(bottom)?;
        self.apply_scroll_optimization()
    }

    /// Assign every node its height directly, so scrolling never waits on height
    /// callbacks.
    pub(super) fn apply_scroll_optimization(&mut self) -> Result<()> {
        if !self.use_scroll_optimization() {
            return Ok(());
        }
        let row_height = self.row_height();
        let group_row_height = self.group_row_height();
        let api = self.ag.api_mut()?;
        for node in api.nodes() {
            let height = if node.is_group_row() {
                group_row_height
            } else {
                row_height
            };
            api.set_row_height(&node.id, height);
        }
        api.on_row_height_changed();
        Ok(())
    }
}
