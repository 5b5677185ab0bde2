pub mod backend;
pub mod config;
pub mod console;
pub mod error;
pub mod ingestion;
pub mod insight;
pub mod store;
pub mod viz;

pub use backend::{Backend, ServerCredentials, ServerKind};
pub use config::ConsoleConfig;
pub use console::{QueryOutcome, QuickAction, ResultSet, Session};
pub use error::{ConsoleError, IngestionError, Result};
pub use ingestion::{IngestionPipeline, SourceInfo, TabularSource, TargetTable};
pub use insight::{ChatCompletion, InsightContext, InsightGenerator, OpenAiChatClient};
pub use store::{SqliteStore, WriteMode};
