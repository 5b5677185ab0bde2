//! Ingestion Module - CSV/JSON sources into typed, sanitized tables
//!
//! Handles one upload at a time with:
//! - Format detection from the file extension
//! - Seeded sampling of large sources
//! - Column name sanitization
//! - Schema inference
//!
//! Every call is independent; nothing is kept between calls.

pub mod source;
pub mod row_set;
pub mod csv_connector;
pub mod json_connector;
pub mod sanitize;
pub mod schema_inference;
pub mod sampling;
pub mod table_builder;
pub mod orchestrator;

pub use source::{SourceFormat, TabularSource};
pub use row_set::{CellValue, RowSet};
pub use csv_connector::CsvConnector;
pub use json_connector::{JsonConnector, JsonShape};
pub use sanitize::sanitize_column_names;
pub use schema_inference::{ColumnType, InferredColumn, SchemaInference};
pub use sampling::SAMPLE_SEED;
pub use table_builder::{ColumnDescriptor, TableBuilder, TargetTable};
pub use orchestrator::{IngestionLimits, IngestionPipeline, SourceInfo};
