//! FuzzyCursor - the engine façade
//!
//! Drives a fuzzy column through its lifecycle:
//!
//! ```text
//! Unindexed --create_fuzzyble--> Unpopulated --populate--> Populated
//!                                     ^                        |
//!                                     +-- create(force=true) --+
//! ```
//!
//! Queries are answered only once a column is populated. Transitions on the
//! same column are serialized; different columns proceed independently and
//! meet only at the index store, which serializes its own writes. Status
//! reads (`is_fuzzyble`, `is_populated`, `state`, `strategy_check`) are a
//! single metadata read and take no column lock, so a progress observer may
//! call them while its population run holds the column.

mod locks;
mod progress;

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::column::{ColumnState, FuzzyColumn, IndexMetadata, StrategyKind};
use crate::config::CursorConfig;
use crate::error::{FuzzyError, Result};
use crate::storage::{IndexStore, SourceDatabase, StoreError};
use crate::strategy::{IndexKey, QueryPlan, Strategy};

use locks::ColumnLocks;
pub use progress::{CancelToken, ChannelProgress, NoProgress, ProgressObserver};

/// How a population run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulateOutcome {
    /// Every value was indexed and the column is now populated
    Completed { rows_processed: usize },
    /// Column was already populated and `force` was not set
    AlreadyPopulated,
    /// Stopped by a `CancelToken`; the column stays unpopulated and resumable
    Cancelled { rows_processed: usize },
}

/// Compatibility of the active strategy with a column's postings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyCheck {
    NotIndexed,
    /// Postings use the key scheme the active strategy reads
    Compatible { indexed: StrategyKind },
    /// Queries will return degraded or empty results
    Mismatch {
        indexed: StrategyKind,
        active: StrategyKind,
    },
}

/// Fuzzy search over columns of a source database.
///
/// Borrows the source and the index store; both outlive the cursor.
pub struct FuzzyCursor<'a> {
    source: &'a dyn SourceDatabase,
    store: &'a dyn IndexStore,
    strategy: Box<dyn Strategy>,
    config: CursorConfig,
    locks: ColumnLocks,
}

impl<'a> FuzzyCursor<'a> {
    /// Cursor with the default configuration and the `Trigram` strategy.
    pub fn new(source: &'a dyn SourceDatabase, store: &'a dyn IndexStore) -> Self {
        let config = CursorConfig::default();
        Self {
            source,
            store,
            strategy: StrategyKind::Trigram.build(&config.strategy),
            config,
            locks: ColumnLocks::default(),
        }
    }

    pub fn with_strategy(mut self, kind: StrategyKind) -> Self {
        self.set_strategy(kind);
        self
    }

    /// Replace the configuration, rebuilding the active strategy with its tuning.
    pub fn with_config(mut self, config: CursorConfig) -> Self {
        self.strategy = self.strategy.kind().build(&config.strategy);
        self.config = config;
        self
    }

    /// Use a custom strategy implementation.
    pub fn with_strategy_impl(mut self, strategy: Box<dyn Strategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Switch strategy for subsequent calls. Existing postings are untouched.
    pub fn set_strategy(&mut self, kind: StrategyKind) {
        if kind != self.strategy.kind() {
            debug!(from = %self.strategy.kind(), to = %kind, "Switching strategy");
        }
        self.strategy = kind.build(&self.config.strategy);
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy.kind()
    }

    pub fn config(&self) -> &CursorConfig {
        &self.config
    }

    /// Metadata exists for the column.
    pub fn is_fuzzyble(&self, column: &FuzzyColumn) -> Result<bool> {
        Ok(self.store.is_indexed(column)?)
    }

    /// The column is indexed and its population completed.
    pub fn is_populated(&self, column: &FuzzyColumn) -> Result<bool> {
        Ok(self.store.is_populated(column)?)
    }

    pub fn state(&self, column: &FuzzyColumn) -> Result<ColumnState> {
        let metadata = self.store.metadata(column)?;
        Ok(ColumnState::from_metadata(metadata.as_ref()))
    }

    /// Set the populated flag by hand, e.g. after bulk-loading postings.
    pub fn mark_populated(&self, column: &FuzzyColumn, populated: bool) -> Result<()> {
        let lock = self.locks.get(column);
        let _guard = lock.write();
        self.require_indexed(column)?;
        self.store.mark_populated(column, populated)?;
        Ok(())
    }

    /// Create index metadata for a column.
    ///
    /// Returns `false` when the column was already fuzzyble and `force` is not
    /// set. With `force` the postings are dropped and the column must be
    /// populated again.
    pub fn create_fuzzyble(&self, column: &FuzzyColumn, force: bool) -> Result<bool> {
        let lock = self.locks.get(column);
        let _guard = lock.write();
        self.require_selection(column)?;

        let created = self.store.create_index(column, self.strategy.kind(), force)?;
        if created {
            info!(column = %column, strategy = %self.strategy.kind(), force, "Created fuzzy index");
        } else {
            debug!(column = %column, "Fuzzy index already exists");
        }
        Ok(created)
    }

    /// Remove metadata and postings. Returns `false` if the column was not fuzzyble.
    pub fn remove_fuzzyble(&self, column: &FuzzyColumn) -> Result<bool> {
        let lock = self.locks.get(column);
        let _guard = lock.write();
        let removed = self.store.drop_index(column)?;
        if removed {
            info!(column = %column, "Removed fuzzy index");
        }
        Ok(removed)
    }

    /// Index every non-null value of the column.
    pub fn populate(
        &self,
        column: &FuzzyColumn,
        force: bool,
        observer: &mut dyn ProgressObserver,
    ) -> Result<PopulateOutcome> {
        self.populate_with_cancel(column, force, observer, &CancelToken::new())
    }

    /// [`populate`](Self::populate), stopping before the next batch once
    /// `cancel` is set. Postings written so far are kept; a later run resumes
    /// without duplicating them.
    pub fn populate_with_cancel(
        &self,
        column: &FuzzyColumn,
        force: bool,
        observer: &mut dyn ProgressObserver,
        cancel: &CancelToken,
    ) -> Result<PopulateOutcome> {
        let lock = self.locks.get(column);
        let _guard = lock.write();

        let metadata = self
            .store
            .metadata(column)?
            .ok_or_else(|| FuzzyError::NotFuzzyble(column.clone()))?;
        if metadata.populated && !force {
            debug!(column = %column, "Already populated, skipping");
            return Ok(PopulateOutcome::AlreadyPopulated);
        }
        self.require_selection(column)?;

        let start = Instant::now();
        let kind = self.strategy.kind();
        let failed = |rows_processed: usize| {
            move |source: StoreError| FuzzyError::Population {
                rows_processed,
                source,
            }
        };

        if metadata.strategy.scheme() != kind.scheme() {
            info!(
                column = %column,
                from = %metadata.strategy,
                to = %kind,
                "Key scheme changed, rebuilding index"
            );
            self.store.create_index(column, kind, true).map_err(failed(0))?;
        }
        self.store.mark_populated(column, false).map_err(failed(0))?;
        self.store.set_strategy(column, kind).map_err(failed(0))?;

        let total = self
            .source
            .count_values(&column.table, &column.column)
            .map_err(failed(0))?;
        let batch_size = self.config.effective_batch_size();
        info!(column = %column, strategy = %kind, total, batch_size, "Populating fuzzy index");

        let mut processed = 0;
        let mut reported = 0.0_f64;
        let batches = self
            .source
            .scan_column(&column.table, &column.column, batch_size)
            .map_err(failed(0))?;

        for batch in batches {
            if cancel.is_cancelled() {
                info!(column = %column, rows_processed = processed, "Population cancelled");
                return Ok(PopulateOutcome::Cancelled {
                    rows_processed: processed,
                });
            }

            let values = batch.map_err(failed(processed))?;
            let postings = tokenize_batch(&*self.strategy, values);
            let inserted = self
                .store
                .add_postings(column, &postings)
                .map_err(failed(processed))?;
            processed += postings.len();
            debug!(column = %column, processed, inserted, "Indexed batch");

            // Source rows added mid-run can push processed past total
            let fraction = if total == 0 {
                1.0
            } else {
                (processed as f64 / total as f64).min(1.0)
            };
            if fraction > reported {
                reported = fraction;
                observer.on_progress(fraction);
            }
        }

        self.store
            .mark_populated(column, true)
            .map_err(failed(processed))?;
        if reported < 1.0 {
            observer.on_progress(1.0);
        }

        info!(
            column = %column,
            rows_processed = processed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Population complete"
        );
        Ok(PopulateOutcome::Completed {
            rows_processed: processed,
        })
    }

    /// Create (if needed) and populate in one call.
    pub fn enable_fuzzy_search(
        &self,
        column: &FuzzyColumn,
        force: bool,
        observer: &mut dyn ProgressObserver,
    ) -> Result<PopulateOutcome> {
        self.create_fuzzyble(column, force)?;
        self.populate(column, force, observer)
    }

    /// Index a single value, e.g. one just inserted into the source table.
    ///
    /// Returns the number of new postings. Does not change the populated flag.
    pub fn add_to_fuzzy_search(&self, column: &FuzzyColumn, value: &str) -> Result<usize> {
        let lock = self.locks.get(column);
        let _guard = lock.write();
        let metadata = self.require_indexed(column)?;
        if metadata.strategy.scheme() != self.strategy.scheme() {
            warn!(
                column = %column,
                indexed = %metadata.strategy,
                active = %self.strategy.kind(),
                "Adding value with a strategy the index was not built with"
            );
        }

        let postings = tokenize_batch(&*self.strategy, vec![value.to_string()]);
        Ok(self.store.add_postings(column, &postings)?)
    }

    /// Compare the active strategy with the one the postings were built with.
    pub fn strategy_check(&self, column: &FuzzyColumn) -> Result<StrategyCheck> {
        Ok(match self.store.metadata(column)? {
            None => StrategyCheck::NotIndexed,
            Some(m) if m.strategy.scheme() == self.strategy.scheme() => {
                StrategyCheck::Compatible {
                    indexed: m.strategy,
                }
            }
            Some(m) => StrategyCheck::Mismatch {
                indexed: m.strategy,
                active: self.strategy.kind(),
            },
        })
    }

    /// Ranked values of the column matching `term`.
    ///
    /// Best effort: failures are logged and yield an empty list.
    pub fn get_fuzzy_words(&self, column: &FuzzyColumn, term: &str) -> Vec<String> {
        match self.try_get_fuzzy_words(column, term) {
            Ok(words) => words,
            Err(e) => {
                warn!(column = %column, term, error = %e, "Fuzzy query failed");
                Vec::new()
            }
        }
    }

    /// [`get_fuzzy_words`](Self::get_fuzzy_words), propagating failures.
    pub fn try_get_fuzzy_words(&self, column: &FuzzyColumn, term: &str) -> Result<Vec<String>> {
        self.query(column, term, None)
    }

    /// Query that gives up with [`FuzzyError::Cancelled`] once `cancel` is set.
    pub fn get_fuzzy_words_cancellable(
        &self,
        column: &FuzzyColumn,
        term: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<String>> {
        self.query(column, term, Some(cancel))
    }

    fn query(
        &self,
        column: &FuzzyColumn,
        term: &str,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<String>> {
        let checkpoint = || match cancel {
            Some(token) if token.is_cancelled() => Err(FuzzyError::Cancelled),
            _ => Ok(()),
        };
        checkpoint()?;

        let lock = self.locks.get(column);
        let _guard = lock.read();

        let metadata = match self.store.metadata(column)? {
            Some(m) if m.populated => m,
            _ => return Ok(Vec::new()),
        };
        if metadata.strategy.scheme() != self.strategy.scheme() {
            warn!(
                column = %column,
                indexed = %metadata.strategy,
                active = %self.strategy.kind(),
                "Querying with a strategy the index was not built with"
            );
        }

        self.require_selection(column)?;

        let mut words = match self.strategy.query_plan(term) {
            QueryPlan::Verbatim(needle) => {
                self.source.values_containing(
                    &column.table,
                    &column.column,
                    &needle,
                    self.config.verbatim_limit,
                )?
            }
            QueryPlan::Keys(keys) => {
                let keys: Vec<IndexKey> = keys.into_iter().collect();
                self.lookup_and_rank(column, term, &keys, &checkpoint)?
            }
            QueryPlan::Buckets(buckets) => {
                let buckets: Vec<u32> = buckets.into_iter().collect();
                let vocabulary =
                    self.store
                        .tokens_in_buckets(column, self.strategy.scheme(), &buckets)?;
                checkpoint()?;

                let keys: Vec<IndexKey> = self.strategy.expand(term, &vocabulary).into_iter().collect();
                debug!(
                    column = %column,
                    vocabulary = vocabulary.len(),
                    keys = keys.len(),
                    "Expanded word buckets"
                );
                self.lookup_and_rank(column, term, &keys, &checkpoint)?
            }
        };

        if let Some(max) = self.config.max_results {
            words.truncate(max);
        }
        Ok(words)
    }

    fn lookup_and_rank(
        &self,
        column: &FuzzyColumn,
        term: &str,
        keys: &[IndexKey],
        checkpoint: &dyn Fn() -> Result<()>,
    ) -> Result<Vec<String>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let candidates = self.store.lookup(column, keys)?;
        checkpoint()?;
        Ok(self.strategy.rank(candidates, term))
    }

    fn require_indexed(&self, column: &FuzzyColumn) -> Result<IndexMetadata> {
        self.store
            .metadata(column)?
            .ok_or_else(|| FuzzyError::NotFuzzyble(column.clone()))
    }

    fn require_selection(&self, column: &FuzzyColumn) -> Result<()> {
        if self.source.has_column(&column.table, &column.column)? {
            Ok(())
        } else {
            Err(FuzzyError::invalid_selection(column))
        }
    }

    pub(crate) fn source(&self) -> &dyn SourceDatabase {
        self.source
    }
}

/// Tokenize a batch of values, fanning out over the rayon pool.
#[cfg(feature = "parallel")]
fn tokenize_batch(strategy: &dyn Strategy, values: Vec<String>) -> Vec<(String, Vec<IndexKey>)> {
    use rayon::prelude::*;

    values
        .into_par_iter()
        .map(|value| {
            let keys = strategy.tokenize(&value).into_iter().collect();
            (value, keys)
        })
        .collect()
}

/// Tokenize a batch of values sequentially.
#[cfg(not(feature = "parallel"))]
fn tokenize_batch(strategy: &dyn Strategy, values: Vec<String>) -> Vec<(String, Vec<IndexKey>)> {
    values
        .into_iter()
        .map(|value| {
            let keys = strategy.tokenize(&value).into_iter().collect();
            (value, keys)
        })
        .collect()
}
