//! Console Session - Explicit per-user state and statement execution
//!
//! A `Session` is owned by the presentation layer and passed into every
//! call; nothing here is global.

use crate::backend::{Backend, ServerKind};
use crate::error::{ConsoleError, Result};
use crate::ingestion::table_builder::quote_identifier;
use crate::ingestion::{CellValue, IngestionPipeline, TabularSource};
use crate::store::{self, cell_from_sql, ConvertedDatabase};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Rows returned by a query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    /// First `n` rows as JSON objects keyed by column name.
    pub fn sample_records(&self, n: usize) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .take(n)
            .map(|row| {
                let obj = self
                    .columns
                    .iter()
                    .zip(row.iter())
                    .map(|(c, v)| (c.clone(), v.to_json()))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(obj)
            })
            .collect()
    }

    /// CSV text with a header row. Nulls are written as empty fields.
    pub fn to_csv(&self) -> Result<String> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(|v| v.to_string()))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| ConsoleError::Csv(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ConsoleError::Csv(e.to_string()))
    }
}

/// Whether a statement is expected to produce rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatementKind {
    Query,
    Modification,
}

impl StatementKind {
    const QUERY_PREFIXES: &'static [&'static str] =
        &["SELECT", "SHOW", "DESCRIBE", "PRAGMA", "WITH", "EXPLAIN"];

    pub fn classify(sql: &str) -> Self {
        let upper = sql.trim_start().to_uppercase();
        if Self::QUERY_PREFIXES.iter().any(|p| upper.starts_with(p)) {
            StatementKind::Query
        } else {
            StatementKind::Modification
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum QueryOutcome {
    Rows(ResultSet),
    Affected(usize),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuickAction {
    pub label: String,
    pub query: String,
}

impl QuickAction {
    fn new(label: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            query: query.into(),
        }
    }
}

/// Canned queries for the sample database.
pub fn sample_queries() -> Vec<QuickAction> {
    vec![
        QuickAction::new("Show all employees", "SELECT * FROM employees;"),
        QuickAction::new(
            "High salary employees",
            "SELECT * FROM employees WHERE salary > 65000;",
        ),
        QuickAction::new(
            "Count by department",
            "SELECT department, COUNT(*) as count FROM employees GROUP BY department;",
        ),
        QuickAction::new(
            "Join employees & departments",
            "SELECT e.name, e.salary, d.budget FROM employees e JOIN departments d ON e.department = d.name;",
        ),
        QuickAction::new("Show table structure", "PRAGMA table_info(employees);"),
    ]
}

/// Canned queries for a table produced by conversion.
pub fn table_queries(table: &str) -> Vec<QuickAction> {
    let quoted = quote_identifier(table);
    vec![
        QuickAction::new(
            format!("Show all {}", table),
            format!("SELECT * FROM {} LIMIT 100;", quoted),
        ),
        QuickAction::new(
            format!("Count {} records", table),
            format!("SELECT COUNT(*) as total_records FROM {};", quoted),
        ),
        QuickAction::new(
            format!("Show {} structure", table),
            format!("PRAGMA table_info({});", quoted),
        ),
        QuickAction::new(
            "Sample 10 records",
            format!("SELECT * FROM {} ORDER BY RANDOM() LIMIT 10;", quoted),
        ),
    ]
}

/// Catalog queries for a remote engine.
pub fn common_queries(kind: ServerKind) -> Vec<QuickAction> {
    let (tables, databases) = match kind {
        ServerKind::PostgreSql => (
            "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public';",
            "SELECT datname FROM pg_database;",
        ),
        ServerKind::MySql => ("SHOW TABLES;", "SHOW DATABASES;"),
        ServerKind::SqlServer => ("SELECT name FROM sys.tables;", "SELECT name FROM sys.databases;"),
    };
    vec![
        QuickAction::new("Show all tables", tables),
        QuickAction::new("Show databases", databases),
    ]
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub query: String,
    pub executed_at: DateTime<Utc>,
}

/// Per-user console state.
pub struct Session {
    id: Uuid,
    backend: Option<Backend>,
    conn: Option<Connection>,
    current_query: String,
    history: Vec<HistoryEntry>,
    last_query: Option<String>,
    last_result: Option<ResultSet>,
    converted: Option<ConvertedDatabase>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            backend: None,
            conn: None,
            current_query: String::new(),
            history: Vec::new(),
            last_query: None,
            last_result: None,
            converted: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Switches to `backend`, returning the tables it exposes.
    ///
    /// On failure the previous connection is dropped and the session is left
    /// disconnected. A remote server stays recorded as the configured backend
    /// so its catalog queries remain available.
    pub fn connect(&mut self, backend: Backend) -> Result<Vec<String>> {
        self.conn = None;
        self.backend = None;

        let conn = match backend.connect() {
            Ok(conn) => conn,
            Err(e) => {
                if let Backend::RemoteServer(_) = backend {
                    warn!(session = %self.id, backend = %backend, error = %e, "remote backend configured without a connection");
                    self.converted = None;
                    self.backend = Some(backend);
                }
                return Err(e);
            }
        };
        let tables = store::list_tables(&conn)?;
        info!(session = %self.id, backend = %backend, tables = tables.len(), "connected");

        if !matches!(backend, Backend::UploadedFile { .. }) {
            self.converted = None;
        }
        self.backend = Some(backend);
        self.conn = Some(conn);
        Ok(tables)
    }

    pub fn disconnect(&mut self) {
        self.conn = None;
        self.backend = None;
        self.converted = None;
    }

    pub fn backend(&self) -> Option<&Backend> {
        self.backend.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }

    pub fn current_query(&self) -> &str {
        &self.current_query
    }

    pub fn set_current_query(&mut self, query: impl Into<String>) {
        self.current_query = query.into();
    }

    pub fn clear_query(&mut self) {
        self.current_query.clear();
    }

    pub fn select_quick_action(&mut self, action: &QuickAction) {
        self.current_query = action.query.clone();
    }

    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    pub fn last_result(&self) -> Option<&ResultSet> {
        self.last_result.as_ref()
    }

    pub fn converted(&self) -> Option<&ConvertedDatabase> {
        self.converted.as_ref()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Up to `n` history entries, most recent first.
    pub fn recent_history(&self, n: usize) -> Vec<&str> {
        self.history
            .iter()
            .rev()
            .take(n)
            .map(|h| h.query.as_str())
            .collect()
    }

    /// Runs the current query.
    pub fn execute_current(&mut self) -> Result<QueryOutcome> {
        let sql = self.current_query.clone();
        self.execute(&sql)
    }

    /// Runs one statement against the connected backend.
    pub fn execute(&mut self, sql: &str) -> Result<QueryOutcome> {
        if sql.trim().is_empty() {
            return Err(ConsoleError::EmptyQuery);
        }
        let conn = self.conn.as_ref().ok_or(ConsoleError::NotConnected)?;

        let outcome = run_statement(conn, sql)?;

        if !self.history.iter().any(|h| h.query == sql) {
            self.history.push(HistoryEntry {
                query: sql.to_string(),
                executed_at: Utc::now(),
            });
        }
        self.last_query = Some(sql.to_string());
        if let QueryOutcome::Rows(rows) = &outcome {
            self.last_result = Some(rows.clone());
        }

        Ok(outcome)
    }

    /// Ingests an upload into a new SQLite file under `dir` and switches the
    /// session to it.
    pub fn convert_upload<R: Read + Seek>(
        &mut self,
        pipeline: &IngestionPipeline,
        source: TabularSource<R>,
        table_name: &str,
        sample_size: Option<usize>,
        dir: impl AsRef<Path>,
    ) -> Result<ConvertedDatabase> {
        let converted =
            store::convert_to_sqlite_file(pipeline, source, table_name, sample_size, dir)?;
        self.adopt_converted(converted)
    }

    /// Connects to a freshly converted file. The file is deleted again if the
    /// connection fails.
    fn adopt_converted(&mut self, converted: ConvertedDatabase) -> Result<ConvertedDatabase> {
        if let Err(e) = self.connect(Backend::UploadedFile {
            path: converted.path.clone(),
        }) {
            if let Err(rm) = std::fs::remove_file(&converted.path) {
                warn!(path = %converted.path.display(), error = %rm, "could not remove converted database");
            }
            return Err(e);
        }
        self.converted = Some(converted.clone());
        Ok(converted)
    }

    /// Tables of the connected database with their row counts.
    pub fn table_summaries(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn.as_ref().ok_or(ConsoleError::NotConnected)?;
        store::list_tables(conn)?
            .into_iter()
            .map(|table| -> Result<(String, i64)> {
                let count: i64 = conn.query_row(
                    &format!("SELECT COUNT(*) FROM {}", quote_identifier(&table)),
                    [],
                    |row| row.get(0),
                )?;
                Ok((table, count))
            })
            .collect()
    }

    /// `{table: [column, ...]}` for every table of the connected database.
    pub fn schema_info(&self) -> Result<serde_json::Value> {
        let conn = self.conn.as_ref().ok_or(ConsoleError::NotConnected)?;
        let mut tables = serde_json::Map::new();
        for table in store::list_tables(conn)? {
            let columns = store::table_columns(conn, &table)?;
            tables.insert(table, serde_json::json!(columns));
        }
        Ok(serde_json::Value::Object(tables))
    }

    /// Canned queries that fit the current backend.
    pub fn quick_actions(&self) -> Result<Vec<QuickAction>> {
        match &self.backend {
            None => Ok(Vec::new()),
            Some(Backend::SampleData { .. }) => Ok(sample_queries()),
            Some(Backend::RemoteServer(c)) => Ok(common_queries(c.kind)),
            Some(Backend::UploadedFile { .. }) => {
                if let Some(converted) = &self.converted {
                    return Ok(table_queries(&converted.table_name));
                }
                let conn = self.conn.as_ref().ok_or(ConsoleError::NotConnected)?;
                let mut actions = Vec::new();
                for table in store::list_tables(conn)? {
                    let quoted = quote_identifier(&table);
                    actions.push(QuickAction::new(
                        format!("Show {} structure", table),
                        format!("PRAGMA table_info({});", quoted),
                    ));
                    actions.push(QuickAction::new(
                        format!("Sample from {}", table),
                        format!("SELECT * FROM {} LIMIT 10;", quoted),
                    ));
                }
                Ok(actions)
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn run_statement(conn: &Connection, sql: &str) -> Result<QueryOutcome> {
    let mut stmt = conn.prepare(sql)?;

    if StatementKind::classify(sql) == StatementKind::Query || stmt.column_count() > 0 {
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();
        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(cell_from_sql(row.get_ref(idx)?));
            }
            rows.push(values);
        }
        debug!(rows = rows.len(), columns = width, "query returned rows");
        Ok(QueryOutcome::Rows(ResultSet::new(columns, rows)))
    } else {
        let affected = stmt.execute([])?;
        debug!(affected, "statement modified data");
        Ok(QueryOutcome::Affected(affected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::seed_sample_data;

    fn sample_session() -> Session {
        let conn = Connection::open_in_memory().unwrap();
        seed_sample_data(&conn).unwrap();
        let mut session = Session::new();
        session.backend = Some(Backend::SampleData {
            path: ":memory:".into(),
        });
        session.conn = Some(conn);
        session
    }

    #[test]
    fn test_classify() {
        assert_eq!(StatementKind::classify("  select 1"), StatementKind::Query);
        assert_eq!(StatementKind::classify("PRAGMA table_info(t)"), StatementKind::Query);
        assert_eq!(StatementKind::classify("INSERT INTO t VALUES (1)"), StatementKind::Modification);
    }

    #[test]
    fn test_execute_requires_query_and_connection() {
        let mut session = Session::new();
        assert!(matches!(session.execute("   "), Err(ConsoleError::EmptyQuery)));
        assert!(matches!(session.execute("SELECT 1"), Err(ConsoleError::NotConnected)));
    }

    #[test]
    fn test_select_returns_rows() {
        let mut session = sample_session();
        let outcome = session
            .execute("SELECT name, salary FROM employees WHERE salary > 65000 ORDER BY salary")
            .unwrap();
        match outcome {
            QueryOutcome::Rows(rows) => {
                assert_eq!(rows.columns(), &["name", "salary"]);
                assert_eq!(rows.row_count(), 2);
                assert_eq!(rows.rows()[1][1], CellValue::Real(80000.0));
            }
            other => panic!("expected rows, got {:?}", other),
        }
        assert!(session.last_result().is_some());
    }

    #[test]
    fn test_modification_reports_affected_rows() {
        let mut session = sample_session();
        let outcome = session
            .execute("UPDATE employees SET salary = salary + 1 WHERE department = 'Engineering'")
            .unwrap();
        assert_eq!(outcome, QueryOutcome::Affected(2));
    }

    #[test]
    fn test_history_is_deduplicated() {
        let mut session = sample_session();
        session.execute("SELECT 1").unwrap();
        session.execute("SELECT 2").unwrap();
        session.execute("SELECT 1").unwrap();
        assert!(session.execute("SELECT * FROM missing").is_err());
        assert_eq!(session.recent_history(5), vec!["SELECT 2", "SELECT 1"]);
    }

    #[test]
    fn test_csv_export() {
        let rows = ResultSet::new(
            vec!["name".to_string(), "note".to_string()],
            vec![
                vec![CellValue::Text("a, b".to_string()), CellValue::Null],
                vec![CellValue::Text("c".to_string()), CellValue::Integer(3)],
            ],
        );
        assert_eq!(rows.to_csv().unwrap(), "name,note\n\"a, b\",\nc,3\n");
    }

    #[test]
    fn test_quick_actions_follow_backend() {
        let mut session = sample_session();
        let actions = session.quick_actions().unwrap();
        assert_eq!(actions.len(), 5);
        session.select_quick_action(&actions[0]);
        assert_eq!(session.current_query(), "SELECT * FROM employees;");
        assert!(matches!(
            session.execute_current().unwrap(),
            QueryOutcome::Rows(r) if r.row_count() == 5
        ));
    }

    #[test]
    fn test_schema_info_lists_columns() {
        let session = sample_session();
        let info = session.schema_info().unwrap();
        assert_eq!(
            info["departments"],
            serde_json::json!(["id", "name", "budget"])
        );
        assert_eq!(info.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_table_queries_quote_names() {
        let actions = table_queries("staff");
        assert_eq!(actions[0].query, "SELECT * FROM \"staff\" LIMIT 100;");
        assert_eq!(actions.len(), 4);
    }

    #[test]
    fn test_remote_backend_keeps_catalog_queries() {
        use crate::backend::ServerCredentials;

        let mut session = Session::new();
        let backend = Backend::RemoteServer(ServerCredentials::local(
            ServerKind::PostgreSql,
            "shop",
            "u",
            "p",
        ));
        assert!(matches!(
            session.connect(backend),
            Err(ConsoleError::UnsupportedBackend(_))
        ));
        assert!(!session.is_connected());
        assert!(matches!(session.backend(), Some(Backend::RemoteServer(_))));

        let actions = session.quick_actions().unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[1].query, "SELECT datname FROM pg_database;");
        assert!(matches!(session.execute("SELECT 1"), Err(ConsoleError::NotConnected)));
    }

    #[test]
    fn test_unusable_converted_file_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.db");
        std::fs::write(&path, "not a sqlite database\n".repeat(64)).unwrap();

        let mut session = Session::new();
        let result = session.adopt_converted(ConvertedDatabase {
            path: path.clone(),
            table_name: "t".to_string(),
            row_count: 0,
        });
        assert!(matches!(result, Err(ConsoleError::Database(_))));
        assert!(!path.exists());
        assert!(session.converted().is_none());
        assert!(!session.is_connected());
    }
}
