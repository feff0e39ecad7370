//! Storage error types

use thiserror::Error;

/// Errors that can occur during index or source storage operations
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No index metadata, table or column with this name
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored data could not be interpreted
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Storage backend error (database, filesystem, etc.)
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Query error
    #[error("query error: {0}")]
    Query(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
