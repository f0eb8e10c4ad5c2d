//! Fatal error types for the site resolver
//!
//! Only structural problems end up here: missing columns, malformed tables,
//! bad configuration and IO. A single row that cannot be resolved is never an
//! error; it becomes an `UnresolvedRecord` with a `FailureReason`.

use thiserror::Error;

/// Errors that abort a run before (or instead of) row processing
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Table '{table}' is missing required columns: {}", columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("Table '{table}' has duplicate column '{column}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Table '{table}' row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        table: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, EngineError>;
