use rusqlite::types::Value;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{ColumnDef, ColumnType};

use super::store::{quote_identifier, Record, TableStore};

/// A table present in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub row_count: u64,
}

/// A connection to the SQLite store.
///
/// The connection is closed when the value is dropped.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    /// List user tables with their row counts, ordered by name.
    pub fn list_tables(&self) -> Result<Vec<TableInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        names
            .into_iter()
            .map(|name| {
                let row_count = self.row_count(&name)?;
                Ok(TableInfo { name, row_count })
            })
            .collect()
    }
}

impl TableStore for Database {
    fn replace_table<I>(&mut self, name: &str, columns: &[ColumnDef], rows: I) -> Result<u64>
    where
        I: IntoIterator<Item = Result<Record>>,
    {
        let table = quote_identifier(name);
        let column_list = columns
            .iter()
            .map(|c| format!("{} {}", quote_identifier(&c.name), c.column_type()))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {table}"))?;
        tx.execute_batch(&format!("CREATE TABLE {table} ({column_list})"))?;

        let mut count: u64 = 0;
        {
            let mut stmt = tx.prepare(&format!("INSERT INTO {table} VALUES ({placeholders})"))?;
            for row in rows {
                let row = row?;
                if row.len() != columns.len() {
                    return Err(Error::InvalidData(format!(
                        "row {} of {name} has {} values, table has {} columns",
                        count + 1,
                        row.len(),
                        columns.len()
                    )));
                }
                let values = columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| to_sql_value(column, value))
                    .collect::<Result<Vec<_>>>()?;
                stmt.execute(rusqlite::params_from_iter(values))?;
                count += 1;
            }
        }
        tx.commit()?;

        log::debug!("Replaced table {} with {} rows", name, count);
        Ok(count)
    }

    fn run_statements(&mut self, statements: &[&str]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for sql in statements {
            tx.execute_batch(sql)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn table_exists(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn row_count(&self, name: &str) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_identifier(name)),
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

fn to_sql_value(column: &ColumnDef, value: Option<String>) -> Result<Value> {
    let Some(value) = value else {
        return Ok(Value::Null);
    };
    match column.column_type() {
        ColumnType::Integer => value
            .parse()
            .map(Value::Integer)
            .map_err(|_| type_mismatch(column, &value)),
        ColumnType::Real => value
            .parse()
            .map(Value::Real)
            .map_err(|_| type_mismatch(column, &value)),
        ColumnType::Text => Ok(Value::Text(value)),
    }
}

fn type_mismatch(column: &ColumnDef, value: &str) -> Error {
    Error::InvalidData(format!(
        "value {value:?} in column {} is not {}",
        column.name,
        column.column_type()
    ))
}
