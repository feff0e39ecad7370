//! SQLite source database adapter
//!
//! Read-only access to the tables being indexed. Values of any storage class
//! are read as text; NULLs are skipped when scanning and rendered as `null`
//! in joined rows.

use std::path::Path;

use fuzzyble_core::storage::{ColumnBatches, SourceDatabase, StoreResult, FIND_ROWS_LIMIT};
use fuzzyble_core::ROW_SEPARATOR;
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, Row};

use crate::error::{Result, SqliteError};

/// Tables owned by the index, hidden when source and sync share a file
const INTERNAL_TABLES: &[&str] = &["schema_migrations", "fuzzyble_meta_data", "fuzzyble_postings"];

/// Source database backed by a SQLite connection
pub struct SqliteSource {
    conn: Mutex<Connection>,
}

impl SqliteSource {
    /// Wrap an open connection
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Open an existing database file read-only
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )?;
        Ok(Self::from_connection(conn))
    }

    fn tables(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names
            .into_iter()
            .filter(|name| !INTERNAL_TABLES.contains(&name.as_str()))
            .collect())
    }

    fn columns(&self, table: &str) -> Result<Vec<String>> {
        table_columns(&self.conn.lock(), table)
    }

    fn count(&self, table: &str, column: &str) -> Result<usize> {
        let conn = self.conn.lock();
        require_column(&conn, table, column)?;
        let sql = format!(
            "SELECT COUNT({}) FROM {}",
            quote_ident(column),
            quote_ident(table)
        );
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Next batch of non-null values after `after_rowid`, with the last rowid read
    fn batch_after(
        &self,
        table: &str,
        column: &str,
        after_rowid: i64,
        batch_size: usize,
    ) -> Result<(Vec<String>, Option<i64>)> {
        let conn = self.conn.lock();
        require_column(&conn, table, column)?;
        let sql = format!(
            "SELECT rowid, CAST({col} AS TEXT) FROM {table}
             WHERE rowid > ?1 AND {col} IS NOT NULL
             ORDER BY rowid LIMIT ?2",
            col = quote_ident(column),
            table = quote_ident(table)
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params![after_rowid, batch_size as i64], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let last = rows.last().map(|(rowid, _)| *rowid);
        Ok((rows.into_iter().map(|(_, value)| value).collect(), last))
    }

    fn containing(&self, table: &str, column: &str, needle: &str, limit: usize) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        require_column(&conn, table, column)?;
        let sql = format!(
            "SELECT v FROM (
                 SELECT rowid AS r, CAST({col} AS TEXT) AS v FROM {table}
                 WHERE {col} IS NOT NULL
             )
             WHERE instr(v, ?1) > 0
             GROUP BY v ORDER BY MIN(r) LIMIT ?2",
            col = quote_ident(column),
            table = quote_ident(table)
        );
        let mut stmt = conn.prepare(&sql)?;
        let values = stmt
            .query_map(params![needle, limit as i64], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(values)
    }

    fn rows(&self, table: &str, sql: &str, search: Option<(&str, &str)>) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        match search {
            Some((column, _)) => require_column(&conn, table, column)?,
            None => {
                table_columns(&conn, table)?;
            }
        }
        let mut stmt = conn.prepare(sql)?;
        let width = stmt.column_count();

        let mut rows = match search {
            Some((_, search)) => stmt.query(params![format!("%{}%", search), FIND_ROWS_LIMIT as i64])?,
            None => stmt.query(params![FIND_ROWS_LIMIT as i64])?,
        };

        let mut joined = Vec::new();
        while let Some(row) = rows.next()? {
            joined.push(join_row(row, width)?);
        }
        Ok(joined)
    }
}

impl SourceDatabase for SqliteSource {
    fn list_tables(&self) -> StoreResult<Vec<String>> {
        Ok(self.tables()?)
    }

    fn list_columns(&self, table: &str) -> StoreResult<Vec<String>> {
        Ok(self.columns(table)?)
    }

    fn count_values(&self, table: &str, column: &str) -> StoreResult<usize> {
        Ok(self.count(table, column)?)
    }

    fn scan_column<'a>(
        &'a self,
        table: &str,
        column: &str,
        batch_size: usize,
    ) -> StoreResult<ColumnBatches<'a>> {
        let table = table.to_string();
        let column = column.to_string();
        let batch_size = batch_size.max(1);
        let mut cursor = Some(0_i64);

        Ok(Box::new(std::iter::from_fn(move || {
            let after = cursor?;
            match self.batch_after(&table, &column, after, batch_size) {
                Ok((values, Some(last))) => {
                    cursor = Some(last);
                    Some(Ok(values))
                }
                Ok((_, None)) => {
                    cursor = None;
                    None
                }
                Err(e) => {
                    cursor = None;
                    Some(Err(e.into()))
                }
            }
        })))
    }

    fn values_containing(
        &self,
        table: &str,
        column: &str,
        needle: &str,
        limit: usize,
    ) -> StoreResult<Vec<String>> {
        Ok(self.containing(table, column, needle, limit)?)
    }

    fn find_rows(&self, table: &str, column: &str, search: &str) -> StoreResult<Vec<String>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} LIKE ?1 LIMIT ?2",
            quote_ident(table),
            quote_ident(column)
        );
        Ok(self.rows(table, &sql, Some((column, search)))?)
    }

    fn first_rows(&self, table: &str) -> StoreResult<Vec<String>> {
        let sql = format!("SELECT * FROM {} LIMIT ?1", quote_ident(table));
        Ok(self.rows(table, &sql, None)?)
    }
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if columns.is_empty() {
        return Err(SqliteError::UnknownTable(table.to_string()));
    }
    Ok(columns)
}

/// SQLite reads an unknown double-quoted identifier as a string literal,
/// so every column is checked before it reaches generated SQL.
fn require_column(conn: &Connection, table: &str, column: &str) -> Result<()> {
    if table_columns(conn, table)?.iter().any(|c| c == column) {
        Ok(())
    } else {
        Err(SqliteError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
    }
}

/// Quote an SQL identifier, doubling embedded quotes
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn join_row(row: &Row<'_>, width: usize) -> Result<String> {
    let mut values = Vec::with_capacity(width);
    for i in 0..width {
        values.push(match row.get_ref(i)? {
            ValueRef::Null => "null".to_string(),
            ValueRef::Integer(n) => n.to_string(),
            ValueRef::Real(r) => r.to_string(),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                String::from_utf8_lossy(bytes).into_owned()
            }
        });
    }
    Ok(values.join(ROW_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("name"), "\"name\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_join_row_renders_storage_classes() {
        let conn = Connection::open_in_memory().unwrap();
        let joined = conn
            .query_row("SELECT 1, 2.5, 'text', NULL", [], |row| {
                Ok(join_row(row, 4).unwrap())
            })
            .unwrap();
        assert_eq!(joined, "1-:-2.5-:-text-:-null");
    }
}
