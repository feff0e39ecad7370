//! In-memory storage backends
//!
//! HashMap-based implementations for testing and embedding.
//! Not suitable for production use due to lack of persistence.

use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;

use crate::column::{FuzzyColumn, IndexMetadata, KeyScheme, StrategyKind};
use crate::search::ROW_SEPARATOR;
use crate::storage::error::{StoreError, StoreResult};
use crate::storage::traits::{ColumnBatches, IndexStore, SourceDatabase, FIND_ROWS_LIMIT};
use crate::strategy::IndexKey;

/// Postings of one column, kept in insertion order.
#[derive(Debug, Default)]
struct ColumnIndex {
    metadata: Option<IndexMetadata>,
    postings: Vec<(IndexKey, String)>,
    seen: AHashSet<(IndexKey, String)>,
}

/// In-memory index store.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    columns: RwLock<AHashMap<FuzzyColumn, ColumnIndex>>,
}

impl MemoryIndexStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn not_indexed(column: &FuzzyColumn) -> StoreError {
    StoreError::NotFound(format!("index for {}", column))
}

impl IndexStore for MemoryIndexStore {
    fn create_index(&self, column: &FuzzyColumn, kind: StrategyKind, force: bool) -> StoreResult<bool> {
        let mut columns = self.columns.write();
        let exists = columns
            .get(column)
            .map(|c| c.metadata.is_some())
            .unwrap_or(false);
        if exists && !force {
            return Ok(false);
        }

        columns.insert(
            column.clone(),
            ColumnIndex {
                metadata: Some(IndexMetadata {
                    column: column.clone(),
                    strategy: kind,
                    populated: false,
                    last_update: now_millis(),
                }),
                ..Default::default()
            },
        );
        Ok(true)
    }

    fn metadata(&self, column: &FuzzyColumn) -> StoreResult<Option<IndexMetadata>> {
        Ok(self
            .columns
            .read()
            .get(column)
            .and_then(|c| c.metadata.clone()))
    }

    fn mark_populated(&self, column: &FuzzyColumn, populated: bool) -> StoreResult<()> {
        let mut columns = self.columns.write();
        let metadata = columns
            .get_mut(column)
            .and_then(|c| c.metadata.as_mut())
            .ok_or_else(|| not_indexed(column))?;
        metadata.populated = populated;
        metadata.last_update = now_millis();
        Ok(())
    }

    fn set_strategy(&self, column: &FuzzyColumn, kind: StrategyKind) -> StoreResult<()> {
        let mut columns = self.columns.write();
        let metadata = columns
            .get_mut(column)
            .and_then(|c| c.metadata.as_mut())
            .ok_or_else(|| not_indexed(column))?;
        metadata.strategy = kind;
        metadata.last_update = now_millis();
        Ok(())
    }

    fn add_posting(&self, column: &FuzzyColumn, key: &IndexKey, value: &str) -> StoreResult<bool> {
        let mut columns = self.columns.write();
        let index = columns
            .get_mut(column)
            .filter(|c| c.metadata.is_some())
            .ok_or_else(|| not_indexed(column))?;

        let entry = (key.clone(), value.to_string());
        if !index.seen.insert(entry.clone()) {
            return Ok(false);
        }
        index.postings.push(entry);
        Ok(true)
    }

    fn lookup(&self, column: &FuzzyColumn, keys: &[IndexKey]) -> StoreResult<Vec<String>> {
        let columns = self.columns.read();
        let Some(index) = columns.get(column) else {
            return Ok(Vec::new());
        };

        let wanted: AHashSet<&IndexKey> = keys.iter().collect();
        let mut seen = AHashSet::new();
        let values = index
            .postings
            .iter()
            .filter(|(key, _)| wanted.contains(key))
            .filter(|(_, value)| seen.insert(value.as_str()))
            .map(|(_, value)| value.clone())
            .collect();
        Ok(values)
    }

    fn tokens_in_buckets(
        &self,
        column: &FuzzyColumn,
        scheme: KeyScheme,
        buckets: &[u32],
    ) -> StoreResult<Vec<String>> {
        let columns = self.columns.read();
        let Some(index) = columns.get(column) else {
            return Ok(Vec::new());
        };

        let mut seen = AHashSet::new();
        let tokens = index
            .postings
            .iter()
            .map(|(key, _)| key)
            .filter(|key| key.scheme() == scheme && buckets.contains(&key.bucket()))
            .filter(|key| seen.insert(key.token()))
            .map(|key| key.token().to_string())
            .collect();
        Ok(tokens)
    }

    fn posting_count(&self, column: &FuzzyColumn) -> StoreResult<usize> {
        Ok(self
            .columns
            .read()
            .get(column)
            .map(|c| c.postings.len())
            .unwrap_or(0))
    }

    fn drop_index(&self, column: &FuzzyColumn) -> StoreResult<bool> {
        Ok(self
            .columns
            .write()
            .remove(column)
            .map(|c| c.metadata.is_some())
            .unwrap_or(false))
    }

    fn list_indexes(&self) -> StoreResult<Vec<IndexMetadata>> {
        let mut indexes: Vec<IndexMetadata> = self
            .columns
            .read()
            .values()
            .filter_map(|c| c.metadata.clone())
            .collect();
        indexes.sort_by(|a, b| a.column.cmp(&b.column));
        Ok(indexes)
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

/// In-memory source database.
///
/// Tables are kept in name order; rows in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: BTreeMap<String, MemoryTable>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a table. Missing trailing cells read as NULL.
    pub fn with_table(mut self, name: &str, columns: &[&str], rows: Vec<Vec<Option<&str>>>) -> Self {
        self.tables.insert(
            name.to_string(),
            MemoryTable {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows: rows
                    .into_iter()
                    .map(|row| row.into_iter().map(|v| v.map(str::to_string)).collect())
                    .collect(),
            },
        );
        self
    }

    /// Append a row to an existing table.
    pub fn insert_row(&mut self, table: &str, row: Vec<Option<&str>>) -> StoreResult<()> {
        let table = self
            .tables
            .get_mut(table)
            .ok_or_else(|| StoreError::NotFound(format!("table {}", table)))?;
        table
            .rows
            .push(row.into_iter().map(|v| v.map(str::to_string)).collect());
        Ok(())
    }

    fn table(&self, table: &str) -> StoreResult<&MemoryTable> {
        self.tables
            .get(table)
            .ok_or_else(|| StoreError::NotFound(format!("table {}", table)))
    }

    fn column_values(&self, table: &str, column: &str) -> StoreResult<Vec<String>> {
        let table_data = self.table(table)?;
        let idx = table_data
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| StoreError::NotFound(format!("column {}.{}", table, column)))?;

        Ok(table_data
            .rows
            .iter()
            .filter_map(|row| row.get(idx).cloned().flatten())
            .collect())
    }

    fn join_row(table: &MemoryTable, row: &[Option<String>]) -> String {
        (0..table.columns.len())
            .map(|i| row.get(i).cloned().flatten().unwrap_or_else(|| "null".to_string()))
            .collect::<Vec<_>>()
            .join(ROW_SEPARATOR)
    }
}

impl SourceDatabase for MemorySource {
    fn list_tables(&self) -> StoreResult<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    fn list_columns(&self, table: &str) -> StoreResult<Vec<String>> {
        Ok(self.table(table)?.columns.clone())
    }

    fn count_values(&self, table: &str, column: &str) -> StoreResult<usize> {
        Ok(self.column_values(table, column)?.len())
    }

    fn scan_column<'a>(
        &'a self,
        table: &str,
        column: &str,
        batch_size: usize,
    ) -> StoreResult<ColumnBatches<'a>> {
        let values = self.column_values(table, column)?;
        let batches: Vec<Vec<String>> = values
            .chunks(batch_size.max(1))
            .map(<[String]>::to_vec)
            .collect();
        Ok(Box::new(batches.into_iter().map(Ok)))
    }

    fn values_containing(
        &self,
        table: &str,
        column: &str,
        needle: &str,
        limit: usize,
    ) -> StoreResult<Vec<String>> {
        let mut seen = AHashSet::new();
        Ok(self
            .column_values(table, column)?
            .into_iter()
            .filter(|v| v.contains(needle))
            .filter(|v| seen.insert(v.clone()))
            .take(limit)
            .collect())
    }

    fn find_rows(&self, table: &str, column: &str, search: &str) -> StoreResult<Vec<String>> {
        let table_data = self.table(table)?;
        let idx = table_data
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| StoreError::NotFound(format!("column {}.{}", table, column)))?;

        let pattern = format!("%{}%", search);
        Ok(table_data
            .rows
            .iter()
            .filter(|row| {
                row.get(idx)
                    .and_then(Option::as_deref)
                    .map(|v| like(v, &pattern))
                    .unwrap_or(false)
            })
            .take(FIND_ROWS_LIMIT)
            .map(|row| Self::join_row(table_data, row))
            .collect())
    }

    fn first_rows(&self, table: &str) -> StoreResult<Vec<String>> {
        let table_data = self.table(table)?;
        Ok(table_data
            .rows
            .iter()
            .take(FIND_ROWS_LIMIT)
            .map(|row| Self::join_row(table_data, row))
            .collect())
    }
}

/// SQL `LIKE`: `%` matches any run, `_` a single char, ASCII case-insensitive.
fn like(value: &str, pattern: &str) -> bool {
    let value: Vec<char> = value.chars().map(|c| c.to_ascii_lowercase()).collect();
    let pattern: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();

    let (mut v, mut p) = (0, 0);
    // Last `%` seen and the value position it currently absorbs up to
    let mut backtrack: Option<(usize, usize)> = None;
    while v < value.len() {
        match pattern.get(p).copied() {
            Some('%') => {
                backtrack = Some((p, v));
                p += 1;
            }
            Some(c) if c == '_' || c == value[v] => {
                v += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star, absorbed)) => {
                    backtrack = Some((star, absorbed + 1));
                    p = star + 1;
                    v = absorbed + 1;
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn column() -> FuzzyColumn {
        FuzzyColumn::new("people", "name")
    }

    fn trigram(t: &str) -> IndexKey {
        IndexKey::Trigram(t.to_string())
    }

    #[test]
    fn test_create_index_is_idempotent() {
        let store = MemoryIndexStore::new();
        assert!(store.create_index(&column(), StrategyKind::Trigram, false).unwrap());
        store.add_posting(&column(), &trigram("jon"), "Jon Snow").unwrap();

        assert!(!store.create_index(&column(), StrategyKind::WordLen, false).unwrap());
        assert_eq!(store.posting_count(&column()).unwrap(), 1);
        assert_eq!(
            store.metadata(&column()).unwrap().unwrap().strategy,
            StrategyKind::Trigram
        );
    }

    #[test]
    fn test_force_create_drops_postings() {
        let store = MemoryIndexStore::new();
        store.create_index(&column(), StrategyKind::Trigram, false).unwrap();
        store.add_posting(&column(), &trigram("jon"), "Jon Snow").unwrap();
        store.mark_populated(&column(), true).unwrap();

        assert!(store.create_index(&column(), StrategyKind::Trigram, true).unwrap());
        assert_eq!(store.posting_count(&column()).unwrap(), 0);
        assert!(!store.is_populated(&column()).unwrap());
    }

    #[test]
    fn test_add_posting_has_set_semantics() {
        let store = MemoryIndexStore::new();
        store.create_index(&column(), StrategyKind::Trigram, false).unwrap();

        assert!(store.add_posting(&column(), &trigram("jon"), "Jon Snow").unwrap());
        assert!(!store.add_posting(&column(), &trigram("jon"), "Jon Snow").unwrap());
        assert_eq!(store.posting_count(&column()).unwrap(), 1);
    }

    #[test]
    fn test_add_posting_requires_index() {
        let store = MemoryIndexStore::new();
        let result = store.add_posting(&column(), &trigram("jon"), "Jon Snow");
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_lookup_unions_in_first_seen_order() {
        let store = MemoryIndexStore::new();
        store.create_index(&column(), StrategyKind::Trigram, false).unwrap();
        store.add_posting(&column(), &trigram("now"), "Jon Snow").unwrap();
        store.add_posting(&column(), &trigram("doe"), "John Doe").unwrap();
        store.add_posting(&column(), &trigram("jon"), "Jon Snow").unwrap();

        let values = store
            .lookup(&column(), &[trigram("jon"), trigram("doe"), trigram("now")])
            .unwrap();
        assert_eq!(values, vec!["Jon Snow".to_string(), "John Doe".to_string()]);
    }

    #[test]
    fn test_tokens_in_buckets() {
        let store = MemoryIndexStore::new();
        store.create_index(&column(), StrategyKind::WordLen, false).unwrap();
        store.add_posting(&column(), &IndexKey::word("jon"), "Jon Snow").unwrap();
        store.add_posting(&column(), &IndexKey::word("snow"), "Jon Snow").unwrap();
        store.add_posting(&column(), &IndexKey::word("jon"), "Jon Doe").unwrap();

        let tokens = store
            .tokens_in_buckets(&column(), KeyScheme::WordLen, &[3])
            .unwrap();
        assert_eq!(tokens, vec!["jon".to_string()]);
        assert!(store
            .tokens_in_buckets(&column(), KeyScheme::Trigram, &[3])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_mark_populated_unknown_column() {
        let store = MemoryIndexStore::new();
        assert!(store.mark_populated(&column(), true).is_err());
    }

    #[test]
    fn test_drop_and_list() {
        let store = MemoryIndexStore::new();
        store.create_index(&column(), StrategyKind::Trigram, false).unwrap();
        store
            .create_index(&FuzzyColumn::new("books", "title"), StrategyKind::WordLen, false)
            .unwrap();

        let listed: Vec<String> = store
            .list_indexes()
            .unwrap()
            .iter()
            .map(|m| m.column.to_string())
            .collect();
        assert_eq!(listed, vec!["books/title", "people/name"]);

        assert!(store.drop_index(&column()).unwrap());
        assert!(!store.drop_index(&column()).unwrap());
        assert!(!store.is_indexed(&column()).unwrap());
    }

    fn people() -> MemorySource {
        MemorySource::new().with_table(
            "people",
            &["id", "name"],
            vec![
                vec![Some("1"), Some("Jon Snow")],
                vec![Some("2"), None],
                vec![Some("3"), Some("John Doe")],
            ],
        )
    }

    #[test]
    fn test_source_skips_nulls() {
        let source = people();
        assert_eq!(source.count_values("people", "name").unwrap(), 2);
        let batches: Vec<Vec<String>> = source
            .scan_column("people", "name", 1)
            .unwrap()
            .collect::<StoreResult<_>>()
            .unwrap();
        assert_eq!(batches, vec![vec!["Jon Snow".to_string()], vec!["John Doe".to_string()]]);
    }

    #[test]
    fn test_source_has_column() {
        let source = people();
        assert!(source.has_column("people", "name").unwrap());
        assert!(!source.has_column("people", "email").unwrap());
        assert!(!source.has_column("places", "name").unwrap());
    }

    #[test]
    fn test_source_find_rows_joins_with_separator() {
        let rows = people().find_rows("people", "name", "JOHN").unwrap();
        assert_eq!(rows, vec!["3-:-John Doe".to_string()]);

        let all = people().first_rows("people").unwrap();
        assert_eq!(all[1], "2-:-null");
    }

    #[test]
    fn test_like_wildcards() {
        assert!(like("Jon Snow", "%SNOW%"));
        assert!(like("Jon Snow", "j_n%"));
        assert!(like("Jon Snow", "%o%o%"));
        assert!(like("", "%%"));
        assert!(!like("Jon Snow", "j_n"));
        assert!(!like("Jon", "%x%"));
    }

    #[test]
    fn test_source_find_rows_treats_percent_and_underscore_as_wildcards() {
        let source = people();
        assert_eq!(
            source.find_rows("people", "name", "J_hn").unwrap(),
            vec!["3-:-John Doe".to_string()]
        );
        assert_eq!(source.find_rows("people", "name", "%").unwrap().len(), 2);
        assert_eq!(
            source.find_rows("people", "name", "n%e").unwrap(),
            vec!["3-:-John Doe".to_string()]
        );
    }

    #[test]
    fn test_source_values_containing_is_case_sensitive() {
        let source = people();
        assert_eq!(
            source.values_containing("people", "name", "Jo", 10).unwrap(),
            vec!["Jon Snow".to_string(), "John Doe".to_string()]
        );
        assert!(source.values_containing("people", "name", "jo", 10).unwrap().is_empty());
    }
}
