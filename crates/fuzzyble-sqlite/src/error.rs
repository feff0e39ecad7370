//! Error types for the SQLite backend

use fuzzyble_core::StoreError;
use thiserror::Error;

/// Result type for SQLite operations
pub type Result<T> = std::result::Result<T, SqliteError>;

/// Errors that can occur during SQLite operations
#[derive(Debug, Error)]
pub enum SqliteError {
    /// Database connection or query error
    #[error("SQLite error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Column has no index metadata
    #[error("Index for {0} not found")]
    NotIndexed(String),

    /// Source table does not exist
    #[error("Table {0} not found")]
    UnknownTable(String),

    /// Source table has no such column
    #[error("Column {table}.{column} not found")]
    UnknownColumn { table: String, column: String },

    /// Stored row could not be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Convert SqliteError to StoreError for the storage traits
impl From<SqliteError> for StoreError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::NotIndexed(column) => StoreError::NotFound(format!("index for {}", column)),
            SqliteError::UnknownTable(table) => StoreError::NotFound(format!("table {}", table)),
            SqliteError::UnknownColumn { table, column } => {
                StoreError::NotFound(format!("column {}.{}", table, column))
            }
            SqliteError::InvalidData(msg) => StoreError::InvalidData(msg),
            SqliteError::Database(rusqlite::Error::SqliteFailure(code, msg)) => StoreError::Query(
                msg.unwrap_or_else(|| code.to_string()),
            ),
            SqliteError::Database(e) => StoreError::Backend(format!("SQLite: {}", e)),
            SqliteError::Migration(msg) => StoreError::Backend(format!("Migration: {}", msg)),
        }
    }
}
