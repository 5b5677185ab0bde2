//! Ingestion Orchestrator - inspect, preview and ingest a tabular source

use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::csv_connector::CsvConnector;
use crate::ingestion::json_connector::{JsonConnector, JsonShape};
use crate::ingestion::row_set::RowSet;
use crate::ingestion::sampling::sample_rows;
use crate::ingestion::source::{SourceFormat, TabularSource};
use crate::ingestion::table_builder::{TargetTable, TableBuilder};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek};
use tracing::{debug, info, warn};

/// Caller-supplied resource bounds.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IngestionLimits {
    /// Sources larger than this fail with `SourceTooLarge` before parsing.
    pub max_source_bytes: Option<u64>,
}

/// Summary of a source, computed over every record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceInfo {
    pub format: SourceFormat,
    /// Set for JSON sources only
    pub json_shape: Option<JsonShape>,
    pub row_count: usize,
    pub column_count: usize,
    /// Original, unsanitized names
    pub column_names: Vec<String>,
    pub size_in_bytes: u64,
}

impl SourceInfo {
    pub fn size_mb(&self) -> f64 {
        self.size_in_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Ingestion Pipeline - Stateless; every call takes all of its inputs.
pub struct IngestionPipeline {
    limits: IngestionLimits,
    csv: CsvConnector,
    json: JsonConnector,
    table_builder: TableBuilder,
}

impl IngestionPipeline {
    pub fn new() -> Self {
        Self::with_limits(IngestionLimits::default())
    }

    pub fn with_limits(limits: IngestionLimits) -> Self {
        Self {
            limits,
            csv: CsvConnector::new(),
            json: JsonConnector::new(),
            table_builder: TableBuilder::new(),
        }
    }

    pub fn limits(&self) -> &IngestionLimits {
        &self.limits
    }

    /// Counts rows and columns of the whole source. The stream position is
    /// unchanged afterwards.
    pub fn inspect<R: Read + Seek>(
        &self,
        source: &mut TabularSource<R>,
    ) -> IngestionResult<SourceInfo> {
        let size_in_bytes = self.check_size(source)?;
        let bytes = source.read_restoring()?;
        let (rows, json_shape) = self.parse(source.name(), source.format(), &bytes)?;

        let info = SourceInfo {
            format: source.format(),
            json_shape,
            row_count: rows.row_count(),
            column_count: rows.column_count(),
            column_names: rows.columns().to_vec(),
            size_in_bytes,
        };

        debug!(
            source = source.name(),
            rows = info.row_count,
            columns = info.column_count,
            bytes = info.size_in_bytes,
            "inspected source"
        );

        Ok(info)
    }

    /// First `n` records of the fully parsed source. Repeatable: the stream
    /// position is unchanged afterwards.
    pub fn preview<R: Read + Seek>(
        &self,
        source: &mut TabularSource<R>,
        n: usize,
    ) -> IngestionResult<RowSet> {
        self.check_size(source)?;
        let bytes = source.read_restoring()?;
        let (rows, _) = self.parse(source.name(), source.format(), &bytes)?;
        Self::ensure_not_empty(source.name(), &rows)?;

        Ok(rows.head(n))
    }

    /// Parses, samples, sanitizes and types the source into a table.
    ///
    /// `sample_size` of `None` or `Some(0)` keeps every row in source order.
    pub fn ingest<R: Read + Seek>(
        &self,
        mut source: TabularSource<R>,
        table_name: &str,
        sample_size: Option<usize>,
    ) -> IngestionResult<TargetTable> {
        let source_name = source.name().to_string();
        let format = source.format();

        let result = self
            .check_size(&mut source)
            .and_then(|_| source.into_bytes())
            .and_then(|bytes| self.parse(&source_name, format, &bytes))
            .and_then(|(rows, _)| {
                Self::ensure_not_empty(&source_name, &rows)?;
                info!(
                    source = %source_name,
                    rows = rows.row_count(),
                    columns = rows.column_count(),
                    "parsed source"
                );

                let rows = sample_rows(rows, sample_size);
                self.table_builder.build(table_name, rows)
            });

        match &result {
            Ok(table) => info!(
                table = table.name(),
                rows = table.row_count(),
                columns = table.columns().len(),
                "built target table"
            ),
            Err(e) => warn!(source = %source_name, kind = e.kind(), error = %e, "ingestion failed"),
        }

        result
    }

    fn check_size<R: Read + Seek>(&self, source: &mut TabularSource<R>) -> IngestionResult<u64> {
        let size = source.size_in_bytes()?;
        if let Some(limit) = self.limits.max_source_bytes {
            if size > limit {
                return Err(IngestionError::SourceTooLarge { size, limit });
            }
        }
        Ok(size)
    }

    fn parse(
        &self,
        name: &str,
        format: SourceFormat,
        bytes: &[u8],
    ) -> IngestionResult<(RowSet, Option<JsonShape>)> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(IngestionError::EmptySource(format!("{} contains no data", name)));
        }

        match format {
            SourceFormat::DelimitedText => Ok((self.csv.parse(bytes)?, None)),
            SourceFormat::Json => {
                let (rows, shape) = self.json.parse(bytes)?;
                Ok((rows, Some(shape)))
            }
        }
    }

    fn ensure_not_empty(name: &str, rows: &RowSet) -> IngestionResult<()> {
        if rows.is_empty() || rows.column_count() == 0 {
            return Err(IngestionError::EmptySource(format!(
                "{} contains no records",
                name
            )));
        }
        Ok(())
    }
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self::new()
    }
}
