//! Database backends - the three connection modes of the console
//!
//! Each mode maps to exactly one connection-construction path. SQLite modes
//! open a rusqlite connection; remote servers only produce a connection
//! string, since no remote drivers are linked in.

use crate::error::{ConsoleError, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Remote database engines the console knows how to address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerKind {
    PostgreSql,
    MySql,
    SqlServer,
}

impl ServerKind {
    pub fn default_port(&self) -> u16 {
        match self {
            ServerKind::PostgreSql => 5432,
            ServerKind::MySql => 3306,
            ServerKind::SqlServer => 1433,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServerKind::PostgreSql => "PostgreSQL",
            ServerKind::MySql => "MySQL",
            ServerKind::SqlServer => "SQL Server",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCredentials {
    pub kind: ServerKind,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl ServerCredentials {
    /// Credentials for `localhost` on the engine's default port.
    pub fn local(kind: ServerKind, database: &str, username: &str, password: &str) -> Self {
        Self {
            kind,
            host: "localhost".to_string(),
            port: kind.default_port(),
            database: database.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

/// Where queries run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// Seeded `employees`/`departments` database at `path`
    SampleData { path: PathBuf },
    /// An uploaded or converted SQLite file
    UploadedFile { path: PathBuf },
    RemoteServer(ServerCredentials),
}

impl Backend {
    /// SQLAlchemy-style URL, as shown to the user and passed to insight prompts.
    pub fn connection_string(&self) -> String {
        match self {
            Backend::SampleData { path } | Backend::UploadedFile { path } => {
                format!("sqlite:///{}", path.display())
            }
            Backend::RemoteServer(c) => {
                let base = format!(
                    "{}:{}@{}:{}/{}",
                    c.username, c.password, c.host, c.port, c.database
                );
                match c.kind {
                    ServerKind::PostgreSql => format!("postgresql://{}", base),
                    ServerKind::MySql => format!("mysql+pymysql://{}", base),
                    ServerKind::SqlServer => format!(
                        "mssql+pyodbc://{}?driver=ODBC+Driver+17+for+SQL+Server",
                        base
                    ),
                }
            }
        }
    }

    /// Driver name reported as the backend type.
    pub fn driver_name(&self) -> &'static str {
        match self {
            Backend::SampleData { .. } | Backend::UploadedFile { .. } => "sqlite",
            Backend::RemoteServer(c) => match c.kind {
                ServerKind::PostgreSql => "postgresql",
                ServerKind::MySql => "mysql+pymysql",
                ServerKind::SqlServer => "mssql+pyodbc",
            },
        }
    }

    /// Opens a connection. The sample database is created and seeded on
    /// first use.
    pub fn connect(&self) -> Result<Connection> {
        match self {
            Backend::SampleData { path } => {
                if !path.exists() {
                    create_sample_database(path)?;
                }
                let conn = Connection::open(path)?;
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                info!(path = %path.display(), "connected to sample SQLite database");
                Ok(conn)
            }
            Backend::UploadedFile { path } => {
                if !path.exists() {
                    return Err(ConsoleError::Database(format!(
                        "database file {} does not exist",
                        path.display()
                    )));
                }
                let conn = Connection::open(path)?;
                // Fails here if the file is not a SQLite database.
                conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |_| Ok(()))?;
                info!(path = %path.display(), "connected to SQLite file");
                Ok(conn)
            }
            Backend::RemoteServer(c) => Err(ConsoleError::UnsupportedBackend(format!(
                "{} connections are not available in this build",
                c.kind.label()
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::SampleData { .. } => f.write_str("SQLite (Sample Data)"),
            Backend::UploadedFile { .. } => f.write_str("SQLite (File Upload)"),
            Backend::RemoteServer(c) => f.write_str(c.kind.label()),
        }
    }
}

const SAMPLE_SCHEMA: &str = r#"
CREATE TABLE employees (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    department TEXT,
    salary REAL NOT NULL,
    hire_date DATE NOT NULL
);

CREATE TABLE departments (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    budget REAL
);

INSERT INTO departments (name, budget) VALUES
    ('Engineering', 500000),
    ('Marketing', 200000),
    ('Sales', 300000),
    ('HR', 150000);

INSERT INTO employees (name, department, salary, hire_date) VALUES
    ('Allen Kupoluyi', 'Engineering', 75000, '2023-01-15'),
    ('Demilade Smith', 'Marketing', 65000, '2023-02-20'),
    ('Akan Daniel', 'Sales', 55000, '2023-03-10'),
    ('Chikezie Brown', 'Engineering', 80000, '2023-01-25'),
    ('Charlie Bilal', 'HR', 50000, '2023-04-05');
"#;

/// Creates the sample database at `path`, seeded with five employees and
/// four departments.
pub fn create_sample_database(path: impl AsRef<Path>) -> Result<()> {
    let mut conn = Connection::open(path.as_ref())?;
    let tx = conn.transaction()?;
    tx.execute_batch(SAMPLE_SCHEMA)
        .map_err(|e| ConsoleError::Database(format!("Error creating sample database: {}", e)))?;
    tx.commit()?;
    info!(path = %path.as_ref().display(), "created sample database");
    Ok(())
}

/// Seeds an already-open connection, e.g. an in-memory one.
pub fn seed_sample_data(conn: &Connection) -> Result<()> {
    conn.execute_batch(SAMPLE_SCHEMA)
        .map_err(|e| ConsoleError::Database(format!("Error creating sample database: {}", e)))
}
