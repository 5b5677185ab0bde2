use thiserror::Error;

/// Failures of a single ingestion attempt.
///
/// Every variant carries a human-readable message that the presentation
/// layer shows verbatim.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Empty source: {0}")]
    EmptySource(String),

    #[error("Malformed source: {0}")]
    MalformedSource(String),

    #[error("Unsupported JSON shape: {0}")]
    UnsupportedJsonShape(String),

    #[error("Source too large: {size} bytes exceeds the limit of {limit} bytes")]
    SourceTooLarge { size: u64, limit: u64 },

    #[error("Ingestion failed: {0}")]
    IngestionFailed(String),
}

impl IngestionError {
    /// Short stable name of the error kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            IngestionError::UnsupportedFormat(_) => "unsupported_format",
            IngestionError::EmptySource(_) => "empty_source",
            IngestionError::MalformedSource(_) => "malformed_source",
            IngestionError::UnsupportedJsonShape(_) => "unsupported_json_shape",
            IngestionError::SourceTooLarge { .. } => "source_too_large",
            IngestionError::IngestionFailed(_) => "ingestion_failed",
        }
    }
}

impl From<std::io::Error> for IngestionError {
    fn from(err: std::io::Error) -> Self {
        IngestionError::IngestionFailed(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for IngestionError {
    fn from(err: serde_json::Error) -> Self {
        IngestionError::MalformedSource(format!("invalid JSON: {}", err))
    }
}

impl From<csv::Error> for IngestionError {
    fn from(err: csv::Error) -> Self {
        IngestionError::MalformedSource(format!("invalid delimited text: {}", err))
    }
}

/// Application-layer failures: backends, statement execution, insight.
#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Please configure a database connection first")]
    NotConnected,

    #[error("Please enter a SQL query")]
    EmptyQuery,

    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),

    #[error("Insight error: {0}")]
    Insight(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV export error: {0}")]
    Csv(String),
}

impl From<rusqlite::Error> for ConsoleError {
    fn from(err: rusqlite::Error) -> Self {
        ConsoleError::Database(err.to_string())
    }
}

impl From<csv::Error> for ConsoleError {
    fn from(err: csv::Error) -> Self {
        ConsoleError::Csv(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
pub type IngestionResult<T> = std::result::Result<T, IngestionError>;
