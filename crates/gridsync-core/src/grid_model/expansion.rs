//! Group and tree row expansion.

use gridsync_model::ExpandState;

use crate::error::Result;
use crate::scheduler::Pass;

use super::GridModel;

impl GridModel {
    /// Deepest expandable level: the number of grouping columns when grouped, else the
    /// record tree's depth.
    pub fn max_depth(&self) -> usize {
        if !self.group_by.is_empty() {
            self.group_by.len()
        } else if self.config.tree_mode {
            self.store.all().max_depth()
        } else {
            0
        }
    }

    /// Expand every parent row. A no-op while unbound.
    pub fn expand_all(&mut self) -> Result<()> {
        let Ok(api) = self.ag.api_mut() else {
            return Ok(());
        };
        api.expand_all();
        self.note_expand_state_changed()
    }

    /// Collapse every parent row. A no-op while unbound.
    pub fn collapse_all(&mut self) -> Result<()> {
        let Ok(api) = self.ag.api_mut() else {
            return Ok(());
        };
        api.collapse_all();
        self.note_expand_state_changed()
    }

    /// Expand rows above `level`, collapse the rest.
    pub fn expand_to_level(&mut self, level: usize) -> Result<()> {
        self.expand_level = Some(level);
        self.trigger(&[Pass::ExpandLevel])
    }

    pub fn set_expand_state(&mut self, state: &ExpandState) -> Result<()> {
        self.ag.set_expand_state(state)?;
        self.note_expand_state_changed()
    }

    /// Refresh the declarative expansion mirror from the engine.
    pub fn note_expand_state_changed(&mut self) -> Result<()> {
        if !self.ag.is_ready() {
            return Ok(());
        }
        let state = self.ag.get_expand_state()?;
        if state != self.expand_state {
            self.expand_state = state;
        }
        Ok(())
    }

    /// Apply the expand level. The extremes use the engine's bulk calls; levels in
    /// between set each parent row's flag directly, then recompute displayed rows once.
    pub(super) fn sync_expand_level(&mut self) -> Result<()> {
        let Some(level) = self.expand_level else {
            return Ok(());
        };
        let max_depth = self.max_depth();
        let api = self.ag.api_mut()?;
        if level == 0 {
            api.collapse_all();
        } else if level >= max_depth {
            api.expand_all();
        } else {
            for node in api.nodes().into_iter().filter(|it| it.has_children) {
                api.set_row_expanded(&node.id, node.level < level);
            }
            api.on_group_expanded_or_collapsed();
        }
        self.note_expand_state_changed()
    }
}
