//! Error types for nltha-prep

use thiserror::Error;

/// Errors that can occur while preparing a dataset
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read source file: {0}")]
    Ingest(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Research log rejected record: {0}")]
    Research(String),
}
