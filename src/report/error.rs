use thiserror::Error;

use crate::database::DatabaseError;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Unknown field '{field}' for data source '{source_name}'")]
    UnknownField { field: String, source_name: String },

    #[error("Unsupported report format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid report filter: {0}")]
    InvalidFilter(String),

    #[error("A report needs at least one column")]
    EmptyColumns,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
