//! Scenario replay for the grid reconciliation engine.
//!
//! A scenario is a JSON script of model calls and simulated user gestures. Replaying
//! it drives a [`gridsync_core::GridModel`] bound to a headless
//! [`gridsync_core::MemoryGrid`] and reports the settled state.

pub mod logging;
pub mod replay;
pub mod scenario;
pub mod summary;
