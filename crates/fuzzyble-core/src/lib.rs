//! Fuzzyble Core Engine
//!
//! Typo-tolerant search over a single column of a source database. The engine
//! derives match keys from column values, persists them as an inverted index in
//! a separate "sync" store, and answers fuzzy queries by candidate lookup plus a
//! strategy-specific ranking.
//!
//! # Layout
//!
//! - [`text`] - normalisation, trigrams and word splitting
//! - [`strategy`] - `Trigram`, `Trigram2` and `WordLen` matching policies
//! - [`storage`] - `IndexStore` / `SourceDatabase` traits and in-memory backends
//! - [`cursor`] - the `FuzzyCursor` façade (create, populate, query)
//! - [`search`] - row search on top of fuzzy suggestions
//!
//! # Features
//!
//! - `parallel` (default) - tokenize population batches on the rayon pool
//!
//! # Example
//!
//! ```rust
//! use fuzzyble_core::{FuzzyColumn, FuzzyCursor, MemoryIndexStore, MemorySource, NoProgress};
//!
//! let source = MemorySource::new().with_table(
//!     "people",
//!     &["name"],
//!     vec![vec![Some("Jon Snow")], vec![Some("Jane Roe")]],
//! );
//! let store = MemoryIndexStore::new();
//! let cursor = FuzzyCursor::new(&source, &store);
//!
//! let column = FuzzyColumn::new("people", "name");
//! cursor.create_fuzzyble(&column, false).unwrap();
//! cursor.populate(&column, false, &mut NoProgress).unwrap();
//!
//! let words = cursor.get_fuzzy_words(&column, "jon");
//! assert!(words.contains(&"Jon Snow".to_string()));
//! ```

pub mod column;
pub mod config;
pub mod cursor;
pub mod error;
pub mod search;
pub mod similarity;
pub mod storage;
pub mod strategy;
pub mod text;

// Re-export main types at crate root
pub use column::{ColumnState, FuzzyColumn, IndexMetadata, KeyScheme, StrategyKind};
pub use config::{CursorConfig, StrategyConfig};
pub use cursor::{
    CancelToken, ChannelProgress, FuzzyCursor, NoProgress, PopulateOutcome, ProgressObserver,
    StrategyCheck,
};
pub use error::{FuzzyError, Result};
pub use search::{split_row, MatchMode, RowMatches, ROW_SEPARATOR};
pub use similarity::{Levenshtein, Similarity};
pub use storage::{
    IndexStore, MemoryIndexStore, MemorySource, SourceDatabase, StoreError, StoreResult,
};
pub use strategy::{IndexKey, QueryPlan, Strategy, Trigram, Trigram2, WordLen};
