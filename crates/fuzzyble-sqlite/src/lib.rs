//! SQLite backends for fuzzyble
//!
//! Persistent implementations of the `fuzzyble-core` storage traits:
//!
//! - [`SqliteIndexStore`] keeps index metadata and postings in a "sync"
//!   database, created and upgraded by the embedded [`migrate`] runner
//! - [`SqliteSource`] reads the tables being indexed
//!
//! The two may share one file; the index tables are hidden from the source
//! table listing.
//!
//! # Example
//!
//! ```rust,no_run
//! use fuzzyble_core::{FuzzyColumn, FuzzyCursor, NoProgress, StrategyKind};
//! use fuzzyble_sqlite::{SqliteIndexStore, SqliteSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! fuzzyble_sqlite::logging::init();
//!
//! let source = SqliteSource::open("library.db")?;
//! let store = SqliteIndexStore::open("library-sync.db")?;
//! let cursor = FuzzyCursor::new(&source, &store).with_strategy(StrategyKind::WordLen);
//!
//! let column = FuzzyColumn::new("books", "title");
//! cursor.create_fuzzyble(&column, false)?;
//! cursor.populate(&column, false, &mut |p: f64| println!("{:.0}%", p * 100.0))?;
//!
//! for word in cursor.get_fuzzy_words(&column, "harry poter") {
//!     println!("{}", word);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod logging;
pub mod migrate;
pub mod source;
pub mod store;

// Re-export main types
pub use error::{Result, SqliteError};
pub use source::SqliteSource;
pub use store::SqliteIndexStore;
