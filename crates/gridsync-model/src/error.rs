use thiserror::Error;

use crate::record::RecordId;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("duplicate record id: {0}")]
    DuplicateRecordId(RecordId),
    #[error("invalid sorter: {0}")]
    InvalidSorter(String),
    #[error("column must specify a colId or field")]
    MissingColumnId,
    #[error("duplicate column or group id: {0}")]
    DuplicateColumnId(String),
    #[error("unknown column ids: {}", .0.join(", "))]
    UnknownColumns(Vec<String>),
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Failure raised by a cell renderer or header-name function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("render failed: {0}")]
pub struct RenderError(pub String);

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
