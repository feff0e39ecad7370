//! Row search on top of fuzzy suggestions
//!
//! Expands each word of a query into fuzzy suggestions, then pulls the full
//! source rows containing those suggestions. Rows come back as strings with
//! their values joined by [`ROW_SEPARATOR`].

use ahash::AHashSet;
use tracing::debug;

use crate::column::FuzzyColumn;
use crate::cursor::FuzzyCursor;
use crate::error::{FuzzyError, Result};
use crate::text::{char_len, MIN_FUZZY_LENGTH};

/// Separator between the values of a row returned by a source database.
pub const ROW_SEPARATOR: &str = "-:-";

/// Split a joined row back into its values.
pub fn split_row(row: &str) -> Vec<&str> {
    row.split(ROW_SEPARATOR).collect()
}

/// How per-word results are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Rows matching any word
    #[default]
    Any,
    /// Rows matching every word
    All,
}

/// Result of [`FuzzyCursor::search_rows`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowMatches {
    /// Each query word with the terms it was searched by, in query order
    pub suggestions: Vec<(String, Vec<String>)>,
    /// Matching rows, deduplicated, in discovery order
    pub rows: Vec<String>,
}

impl FuzzyCursor<'_> {
    /// Find source rows for a free-text query.
    ///
    /// A blank query returns the first rows of the table. Queries shorter than
    /// three characters, and individual short words, are matched verbatim;
    /// longer words are replaced by their fuzzy suggestions.
    pub fn search_rows(
        &self,
        column: &FuzzyColumn,
        query: &str,
        mode: MatchMode,
    ) -> Result<RowMatches> {
        let source = self.source();
        if !source.has_column(&column.table, &column.column)? {
            return Err(FuzzyError::invalid_selection(column));
        }

        let query = query.trim();
        if query.is_empty() {
            return Ok(RowMatches {
                suggestions: Vec::new(),
                rows: source.first_rows(&column.table)?,
            });
        }
        if char_len(query) < MIN_FUZZY_LENGTH {
            return Ok(RowMatches {
                suggestions: vec![(query.to_string(), vec![query.to_string()])],
                rows: source.find_rows(&column.table, &column.column, query)?,
            });
        }

        let mut suggestions = Vec::new();
        for word in query.split_whitespace() {
            let terms = if char_len(word) < MIN_FUZZY_LENGTH {
                vec![word.to_string()]
            } else {
                self.get_fuzzy_words(column, word)
            };
            suggestions.push((word.to_string(), terms));
        }
        debug!(column = %column, words = suggestions.len(), ?mode, "Searching rows");

        let mut per_word = Vec::with_capacity(suggestions.len());
        for (_, terms) in &suggestions {
            let mut rows = Vec::new();
            for term in terms {
                rows.extend(source.find_rows(&column.table, &column.column, term)?);
            }
            let found_none = rows.is_empty();
            per_word.push(rows);
            if mode == MatchMode::All && found_none {
                break;
            }
        }

        Ok(RowMatches {
            suggestions,
            rows: combine(per_word, mode),
        })
    }
}

fn combine(per_word: Vec<Vec<String>>, mode: MatchMode) -> Vec<String> {
    match mode {
        MatchMode::Any => {
            let mut seen = AHashSet::new();
            per_word
                .into_iter()
                .flatten()
                .filter(|row| seen.insert(row.clone()))
                .collect()
        }
        MatchMode::All => {
            let mut words = per_word.into_iter();
            let Some(first) = words.next() else {
                return Vec::new();
            };
            let others: Vec<AHashSet<String>> =
                words.map(|rows| rows.into_iter().collect()).collect();

            let mut seen = AHashSet::new();
            first
                .into_iter()
                .filter(|row| others.iter().all(|set| set.contains(row)))
                .filter(|row| seen.insert(row.clone()))
                .collect()
        }
    }
}
