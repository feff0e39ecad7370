//! SQLite index store implementing the IndexStore trait

use std::collections::HashMap;
use std::path::Path;

use fuzzyble_core::storage::{IndexStore, StoreResult};
use fuzzyble_core::{FuzzyColumn, IndexKey, IndexMetadata, KeyScheme, StrategyKind};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{Result, SqliteError};
use crate::logging::prefix;

/// Keys per lookup statement, two bound parameters each
const LOOKUP_CHUNK: usize = 400;

/// SQLite-backed index store
///
/// The connection sits behind a mutex, so every write goes through a single
/// writer. Batches are written in one transaction each.
pub struct SqliteIndexStore {
    conn: Mutex<Connection>,
}

impl SqliteIndexStore {
    /// Create a store from a connection
    ///
    /// The connection should already have migrations applied.
    /// Use [`crate::migrate::migrate`] to initialize a fresh database.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Create a new in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        crate::migrate::migrate(&conn)?;
        Ok(Self::new(conn))
    }

    /// Open (or create) a file-backed sync database
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        crate::migrate::migrate(&conn)?;
        Ok(Self::new(conn))
    }

    /// Run `f` with the underlying connection locked
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> T) -> T {
        f(&self.conn.lock())
    }

    fn require_indexed(conn: &Connection, column: &FuzzyColumn) -> Result<()> {
        let exists = conn
            .prepare_cached(
                "SELECT 1 FROM fuzzyble_meta_data WHERE table_name = ?1 AND column_name = ?2",
            )?
            .exists(params![column.table, column.column])?;
        if exists {
            Ok(())
        } else {
            Err(SqliteError::NotIndexed(column.to_string()))
        }
    }

    fn create(&self, column: &FuzzyColumn, kind: StrategyKind, force: bool) -> Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let exists = tx
            .prepare("SELECT 1 FROM fuzzyble_meta_data WHERE table_name = ?1 AND column_name = ?2")?
            .exists(params![column.table, column.column])?;
        if exists && !force {
            return Ok(false);
        }

        tx.execute(
            "DELETE FROM fuzzyble_postings WHERE table_name = ?1 AND column_name = ?2",
            params![column.table, column.column],
        )?;
        tx.execute(
            "INSERT INTO fuzzyble_meta_data (table_name, column_name, strategy, populated, last_update)
             VALUES (?1, ?2, ?3, 0, ?4)
             ON CONFLICT (table_name, column_name) DO UPDATE SET
                 strategy = excluded.strategy,
                 populated = 0,
                 last_update = excluded.last_update",
            params![column.table, column.column, kind.as_str(), now_millis()],
        )?;
        tx.commit()?;

        debug!("{} Created index for {}", prefix::DB, column);
        Ok(true)
    }

    fn read_metadata(&self, column: &FuzzyColumn) -> Result<Option<IndexMetadata>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT strategy, populated, last_update FROM fuzzyble_meta_data
                 WHERE table_name = ?1 AND column_name = ?2",
                params![column.table, column.column],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, bool>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(strategy, populated, last_update)| {
            Ok(IndexMetadata {
                column: column.clone(),
                strategy: parse_strategy(&strategy)?,
                populated,
                last_update,
            })
        })
        .transpose()
    }

    fn update_metadata(&self, column: &FuzzyColumn, sql: &str, value: Value) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            sql,
            params![value, now_millis(), column.table, column.column],
        )?;
        if changed == 0 {
            return Err(SqliteError::NotIndexed(column.to_string()));
        }
        Ok(())
    }

    fn insert_postings(&self, column: &FuzzyColumn, postings: &[(String, Vec<IndexKey>)]) -> Result<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        Self::require_indexed(&tx, column)?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO fuzzyble_postings
                 (table_name, column_name, scheme, token, bucket, value)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (value, keys) in postings {
                for key in keys {
                    inserted += stmt.execute(params![
                        column.table,
                        column.column,
                        key.scheme().as_str(),
                        key.token(),
                        key.bucket(),
                        value,
                    ])?;
                }
            }
        }
        tx.commit()?;

        debug!(
            "{} {} {} values, {} new postings",
            prefix::POPULATE,
            column,
            postings.len(),
            inserted
        );
        Ok(inserted)
    }

    fn find_values(&self, column: &FuzzyColumn, keys: &[IndexKey]) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        // value -> earliest rowid across all chunks
        let mut first_seen: HashMap<String, i64> = HashMap::new();

        for chunk in keys.chunks(LOOKUP_CHUNK) {
            let pairs = vec!["(?, ?)"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT value, MIN(rowid) FROM fuzzyble_postings
                 WHERE table_name = ? AND column_name = ? AND (scheme, token) IN (VALUES {})
                 GROUP BY value",
                pairs
            );

            let mut values = vec![
                Value::Text(column.table.clone()),
                Value::Text(column.column.clone()),
            ];
            for key in chunk {
                values.push(Value::Text(key.scheme().as_str().to_string()));
                values.push(Value::Text(key.token().to_string()));
            }

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(values), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (value, rowid) = row?;
                first_seen
                    .entry(value)
                    .and_modify(|seen| *seen = (*seen).min(rowid))
                    .or_insert(rowid);
            }
        }

        let mut ordered: Vec<(String, i64)> = first_seen.into_iter().collect();
        ordered.sort_by_key(|(_, rowid)| *rowid);
        Ok(ordered.into_iter().map(|(value, _)| value).collect())
    }

    fn find_tokens(&self, column: &FuzzyColumn, scheme: KeyScheme, buckets: &[u32]) -> Result<Vec<String>> {
        if buckets.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn.lock();
        let placeholders = vec!["?"; buckets.len()].join(", ");
        let sql = format!(
            "SELECT token FROM fuzzyble_postings
             WHERE table_name = ? AND column_name = ? AND scheme = ? AND bucket IN ({})
             GROUP BY token ORDER BY MIN(rowid)",
            placeholders
        );

        let mut values = vec![
            Value::Text(column.table.clone()),
            Value::Text(column.column.clone()),
            Value::Text(scheme.as_str().to_string()),
        ];
        values.extend(buckets.iter().map(|b| Value::Integer(i64::from(*b))));

        let mut stmt = conn.prepare(&sql)?;
        let tokens = stmt
            .query_map(params_from_iter(values), |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tokens)
    }

    fn count(&self, column: &FuzzyColumn) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM fuzzyble_postings WHERE table_name = ?1 AND column_name = ?2",
            params![column.table, column.column],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn remove(&self, column: &FuzzyColumn) -> Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM fuzzyble_postings WHERE table_name = ?1 AND column_name = ?2",
            params![column.table, column.column],
        )?;
        let removed = tx.execute(
            "DELETE FROM fuzzyble_meta_data WHERE table_name = ?1 AND column_name = ?2",
            params![column.table, column.column],
        )?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn list(&self) -> Result<Vec<IndexMetadata>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT table_name, column_name, strategy, populated, last_update
             FROM fuzzyble_meta_data ORDER BY table_name, column_name",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(table, column, strategy, populated, last_update)| {
                Ok(IndexMetadata {
                    column: FuzzyColumn::new(table, column),
                    strategy: parse_strategy(&strategy)?,
                    populated,
                    last_update,
                })
            })
            .collect()
    }
}

impl IndexStore for SqliteIndexStore {
    fn create_index(&self, column: &FuzzyColumn, kind: StrategyKind, force: bool) -> StoreResult<bool> {
        Ok(self.create(column, kind, force)?)
    }

    fn metadata(&self, column: &FuzzyColumn) -> StoreResult<Option<IndexMetadata>> {
        Ok(self.read_metadata(column)?)
    }

    fn mark_populated(&self, column: &FuzzyColumn, populated: bool) -> StoreResult<()> {
        Ok(self.update_metadata(
            column,
            "UPDATE fuzzyble_meta_data SET populated = ?1, last_update = ?2
             WHERE table_name = ?3 AND column_name = ?4",
            Value::Integer(i64::from(populated)),
        )?)
    }

    fn set_strategy(&self, column: &FuzzyColumn, kind: StrategyKind) -> StoreResult<()> {
        Ok(self.update_metadata(
            column,
            "UPDATE fuzzyble_meta_data SET strategy = ?1, last_update = ?2
             WHERE table_name = ?3 AND column_name = ?4",
            Value::Text(kind.as_str().to_string()),
        )?)
    }

    fn add_posting(&self, column: &FuzzyColumn, key: &IndexKey, value: &str) -> StoreResult<bool> {
        let inserted = self.insert_postings(column, &[(value.to_string(), vec![key.clone()])])?;
        Ok(inserted > 0)
    }

    fn add_postings(&self, column: &FuzzyColumn, postings: &[(String, Vec<IndexKey>)]) -> StoreResult<usize> {
        Ok(self.insert_postings(column, postings)?)
    }

    fn lookup(&self, column: &FuzzyColumn, keys: &[IndexKey]) -> StoreResult<Vec<String>> {
        Ok(self.find_values(column, keys)?)
    }

    fn tokens_in_buckets(
        &self,
        column: &FuzzyColumn,
        scheme: KeyScheme,
        buckets: &[u32],
    ) -> StoreResult<Vec<String>> {
        Ok(self.find_tokens(column, scheme, buckets)?)
    }

    fn posting_count(&self, column: &FuzzyColumn) -> StoreResult<usize> {
        Ok(self.count(column)?)
    }

    fn drop_index(&self, column: &FuzzyColumn) -> StoreResult<bool> {
        Ok(self.remove(column)?)
    }

    fn list_indexes(&self) -> StoreResult<Vec<IndexMetadata>> {
        Ok(self.list()?)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn parse_strategy(value: &str) -> Result<StrategyKind> {
    value.parse().map_err(SqliteError::InvalidData)
}
