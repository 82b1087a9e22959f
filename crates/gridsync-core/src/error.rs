use gridsync_autosize::AutosizeError;
use gridsync_model::ModelError;
use thiserror::Error;

/// Failure reported by a live grid engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("grid engine error: {0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum GridError {
    #[error("grid is not ready: no live engine is bound")]
    NotReady,
    #[error("grid is already bound to a different engine instance")]
    AlreadyBound,
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Autosize(#[from] AutosizeError),
}

pub type Result<T> = std::result::Result<T, GridError>;
