//! Storage abstraction for the fuzzy index and its source data
//!
//! Two traits separate the engine from concrete databases:
//!
//! - [`IndexStore`] - the writable "sync" database holding index metadata and
//!   postings
//! - [`SourceDatabase`] - read-only access to the source table data
//!
//! Implementations exist for:
//!
//! - **Memory**: `MemoryIndexStore` / `MemorySource`, for tests and embedding
//! - **SQLite**: `SqliteIndexStore` / `SqliteSource` (separate crate)
//!
//! # Example
//!
//! ```rust
//! use fuzzyble_core::storage::{IndexStore, MemoryIndexStore};
//! use fuzzyble_core::{FuzzyColumn, IndexKey, StrategyKind};
//!
//! let store = MemoryIndexStore::new();
//! let column = FuzzyColumn::new("people", "name");
//!
//! store.create_index(&column, StrategyKind::Trigram, false).unwrap();
//! store.add_posting(&column, &IndexKey::Trigram("jon".into()), "Jon Snow").unwrap();
//!
//! let values = store.lookup(&column, &[IndexKey::Trigram("jon".into())]).unwrap();
//! assert_eq!(values, vec!["Jon Snow".to_string()]);
//! ```

mod error;
mod memory;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryIndexStore, MemorySource};
pub use traits::{ColumnBatches, IndexStore, SourceDatabase, FIND_ROWS_LIMIT};
