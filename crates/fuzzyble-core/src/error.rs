//! Errors surfaced by the `FuzzyCursor` façade

use thiserror::Error;

use crate::column::FuzzyColumn;
use crate::storage::StoreError;

/// Result type for façade operations
pub type Result<T> = std::result::Result<T, FuzzyError>;

/// Errors that can occur while creating, populating or querying a fuzzy column
#[derive(Debug, Error)]
pub enum FuzzyError {
    /// Sync or source database unreachable or unwritable
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// Population aborted mid-run; postings already written are kept
    #[error("population failed after {rows_processed} rows: {source}")]
    Population {
        rows_processed: usize,
        #[source]
        source: StoreError,
    },

    /// Table or column no longer exists in the source database
    #[error("invalid selection: {table}.{column} not found in source database")]
    InvalidSelection { table: String, column: String },

    /// Operation requires `create_fuzzyble` first
    #[error("{0} is not fuzzyble, use `create_fuzzyble()` to enable")]
    NotFuzzyble(FuzzyColumn),

    /// Caller cancelled a query
    #[error("operation cancelled")]
    Cancelled,
}

impl FuzzyError {
    pub fn invalid_selection(column: &FuzzyColumn) -> Self {
        Self::InvalidSelection {
            table: column.table.clone(),
            column: column.column.clone(),
        }
    }

    /// Rows processed before a population failure, if this is one.
    pub fn rows_processed(&self) -> Option<usize> {
        match self {
            Self::Population { rows_processed, .. } => Some(*rows_processed),
            _ => None,
        }
    }
}
