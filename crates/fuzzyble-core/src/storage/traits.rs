//! Storage trait definitions

use crate::column::{FuzzyColumn, IndexMetadata, KeyScheme, StrategyKind};
use crate::storage::error::StoreResult;
use crate::strategy::IndexKey;

/// Row cap applied by [`SourceDatabase::find_rows`] and [`SourceDatabase::first_rows`].
pub const FIND_ROWS_LIMIT: usize = 100;

/// Lazy sequence of value batches produced by [`SourceDatabase::scan_column`].
pub type ColumnBatches<'a> = Box<dyn Iterator<Item = StoreResult<Vec<String>>> + 'a>;

/// Durable storage of index metadata and postings.
///
/// All methods take `&self`; implementations serialize writes internally so a
/// single store can be shared between threads.
pub trait IndexStore: Send + Sync {
    /// Create metadata and posting storage for a column.
    ///
    /// Without `force` an existing index is left untouched (returns `false`).
    /// With `force` existing postings are dropped and `populated` is reset.
    fn create_index(&self, column: &FuzzyColumn, kind: StrategyKind, force: bool)
        -> StoreResult<bool>;

    /// Metadata row for a column, if indexed.
    fn metadata(&self, column: &FuzzyColumn) -> StoreResult<Option<IndexMetadata>>;

    /// Metadata exists, regardless of population state.
    fn is_indexed(&self, column: &FuzzyColumn) -> StoreResult<bool> {
        Ok(self.metadata(column)?.is_some())
    }

    /// Metadata exists and the column is marked populated.
    fn is_populated(&self, column: &FuzzyColumn) -> StoreResult<bool> {
        Ok(self.metadata(column)?.map(|m| m.populated).unwrap_or(false))
    }

    /// Set the populated flag.
    ///
    /// Returns `StoreError::NotFound` if the column is not indexed.
    fn mark_populated(&self, column: &FuzzyColumn, populated: bool) -> StoreResult<()>;

    /// Record the strategy used to build the postings.
    fn set_strategy(&self, column: &FuzzyColumn, kind: StrategyKind) -> StoreResult<()>;

    /// Store a `(column, key, value)` posting.
    ///
    /// Set semantics: returns `false` if the posting already existed.
    fn add_posting(&self, column: &FuzzyColumn, key: &IndexKey, value: &str) -> StoreResult<bool>;

    /// Store the postings of several values in one write.
    ///
    /// Returns the number of newly inserted postings.
    fn add_postings(&self, column: &FuzzyColumn, postings: &[(String, Vec<IndexKey>)])
        -> StoreResult<usize> {
        let mut inserted = 0;
        for (value, keys) in postings {
            for key in keys {
                if self.add_posting(column, key, value)? {
                    inserted += 1;
                }
            }
        }
        Ok(inserted)
    }

    /// Union of the values posted under any of `keys`.
    ///
    /// Deduplicated, in first-seen order.
    fn lookup(&self, column: &FuzzyColumn, keys: &[IndexKey]) -> StoreResult<Vec<String>>;

    /// Distinct tokens of `scheme` whose bucket is one of `buckets`.
    fn tokens_in_buckets(
        &self,
        column: &FuzzyColumn,
        scheme: KeyScheme,
        buckets: &[u32],
    ) -> StoreResult<Vec<String>>;

    /// Number of postings stored for a column.
    fn posting_count(&self, column: &FuzzyColumn) -> StoreResult<usize>;

    /// Remove metadata and postings. Returns `false` if nothing was indexed.
    fn drop_index(&self, column: &FuzzyColumn) -> StoreResult<bool>;

    /// Metadata of every indexed column.
    fn list_indexes(&self) -> StoreResult<Vec<IndexMetadata>>;
}

/// Read-only access to the source data being indexed.
pub trait SourceDatabase: Send + Sync {
    /// Table names.
    fn list_tables(&self) -> StoreResult<Vec<String>>;

    /// Column names of a table, in declaration order.
    fn list_columns(&self, table: &str) -> StoreResult<Vec<String>>;

    /// Whether `table.column` exists.
    fn has_column(&self, table: &str, column: &str) -> StoreResult<bool> {
        if !self.list_tables()?.iter().any(|t| t == table) {
            return Ok(false);
        }
        Ok(self.list_columns(table)?.iter().any(|c| c == column))
    }

    /// Number of non-null values in a column.
    fn count_values(&self, table: &str, column: &str) -> StoreResult<usize>;

    /// Stream non-null values of a column in batches of `batch_size`.
    ///
    /// Each call starts a fresh scan.
    fn scan_column<'a>(
        &'a self,
        table: &str,
        column: &str,
        batch_size: usize,
    ) -> StoreResult<ColumnBatches<'a>>;

    /// Distinct values containing `needle` verbatim (case-sensitive).
    fn values_containing(
        &self,
        table: &str,
        column: &str,
        needle: &str,
        limit: usize,
    ) -> StoreResult<Vec<String>>;

    /// Rows whose `column` matches `LIKE '%search%'`, at most [`FIND_ROWS_LIMIT`].
    ///
    /// `%` and `_` inside `search` keep their wildcard meaning.
    ///
    /// Each row's values are joined with [`crate::ROW_SEPARATOR`].
    fn find_rows(&self, table: &str, column: &str, search: &str) -> StoreResult<Vec<String>>;

    /// First [`FIND_ROWS_LIMIT`] rows of a table, joined like [`Self::find_rows`].
    fn first_rows(&self, table: &str) -> StoreResult<Vec<String>>;
}
