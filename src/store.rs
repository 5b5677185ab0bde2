//! SQLite Store - Persists target tables and converts uploads to database files

use crate::error::{ConsoleError, Result};
use crate::ingestion::{CellValue, IngestionPipeline, TabularSource, TargetTable};
use crate::ingestion::table_builder::quote_identifier;
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What to do when the target table already exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMode {
    /// Drop the existing table first
    Replace,
    /// Refuse to touch an existing table
    Fail,
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Bool(b) => ToSqlOutput::Owned(Value::Integer(*b as i64)),
            CellValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            CellValue::Real(f) if f.is_nan() => ToSqlOutput::Owned(Value::Null),
            CellValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// Reads a SQLite value back into a cell.
pub fn cell_from_sql(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(i) => CellValue::Integer(i),
        ValueRef::Real(f) => CellValue::Real(f),
        ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => CellValue::Text(format!("<blob {} bytes>", b.len())),
    }
}

/// SQLite Store - One connection, owned.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            ConsoleError::Database(format!(
                "Failed to open database {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    /// Writes `table` in a single transaction. Returns the rows inserted.
    pub fn persist(&mut self, table: &TargetTable, mode: WriteMode) -> Result<usize> {
        let exists = self.table_exists(table.name())?;
        if exists && mode == WriteMode::Fail {
            return Err(ConsoleError::Database(format!(
                "table '{}' already exists",
                table.name()
            )));
        }

        let tx = self.conn.transaction()?;
        if exists {
            tx.execute(&format!("DROP TABLE {}", quote_identifier(table.name())), [])?;
        }
        tx.execute(&table.create_table_sql(), [])?;

        let placeholders = (1..=table.columns().len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let columns = table
            .columns()
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table.name()),
            columns,
            placeholders
        );

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(&insert)?;
            for row in table.rows() {
                inserted += stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        info!(
            table = table.name(),
            rows = inserted,
            replaced = exists,
            "persisted table"
        );
        Ok(inserted)
    }

    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn list_tables(&self) -> Result<Vec<String>> {
        list_tables(&self.conn)
    }

    pub fn row_count(&self, table: &str) -> Result<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_identifier(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// User tables of a SQLite database, in creation order.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// Column names of `table`, in declaration order.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

/// A SQLite file produced from an upload.
#[derive(Clone, Debug, Serialize)]
pub struct ConvertedDatabase {
    pub path: PathBuf,
    pub table_name: String,
    pub row_count: usize,
}

/// Ingests `source` into a fresh SQLite file under `dir`.
///
/// The file is created before ingestion starts and removed again if any
/// step fails, so an error never leaves a partial database behind.
pub fn convert_to_sqlite_file<R: Read + Seek>(
    pipeline: &IngestionPipeline,
    source: TabularSource<R>,
    table_name: &str,
    sample_size: Option<usize>,
    dir: impl AsRef<Path>,
) -> Result<ConvertedDatabase> {
    std::fs::create_dir_all(dir.as_ref())?;
    let scratch = tempfile::Builder::new()
        .prefix("sql-console-")
        .suffix(".db")
        .tempfile_in(dir.as_ref())?;
    debug!(path = %scratch.path().display(), "created scratch database");

    let row_count = {
        let table = pipeline.ingest(source, table_name, sample_size)?;
        let mut store = SqliteStore::open(scratch.path())?;
        store.persist(&table, WriteMode::Replace)?
    };

    let (_, path) = scratch
        .keep()
        .map_err(|e| ConsoleError::Io(e.error))?;

    info!(path = %path.display(), table = table_name, rows = row_count, "converted upload to SQLite");
    Ok(ConvertedDatabase {
        path,
        table_name: table_name.to_string(),
        row_count,
    })
}
