use gridsync_model::{RecordId, RenderError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutosizeError {
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("header of column '{col_id}': {source}")]
    Header {
        col_id: String,
        #[source]
        source: RenderError,
    },
    #[error("cell of column '{col_id}' for record {record_id}: {source}")]
    Cell {
        col_id: String,
        record_id: RecordId,
        #[source]
        source: RenderError,
    },
}

pub type Result<T> = std::result::Result<T, AutosizeError>;
