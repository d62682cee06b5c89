//! Error types for node history analysis.

use std::path::PathBuf;

/// Configuration errors. Raised before any query runs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Required environment variable {var} is not set")]
    MissingCutoff { var: String },
    #[error("Environment variable {var} must be an integer epoch timestamp, got {value:?}")]
    InvalidCutoff { var: String, value: String },
    #[error("Leaderboard limit must be at least 1, got {0}")]
    InvalidLimit(usize),
    #[error("Unknown category label: {0}")]
    UnknownLabel(String),
}

/// Errors raised by the observation data source.
#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("Failed to open node history database {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("Table {0:?} not found in node history database")]
    MissingTable(String),
    #[error("Table {table:?} has no column {column:?}")]
    MissingColumn { table: String, column: String },
    #[error("Query against node history database failed: {0}")]
    Query(#[from] rusqlite::Error),
}
