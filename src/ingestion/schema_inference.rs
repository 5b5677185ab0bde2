//! Schema Inference - Deterministic column typing from parsed rows

use crate::ingestion::row_set::{CellValue, RowSet};
use serde::Serialize;
use std::fmt;

/// Column types a target table can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    /// Never produced by inference; kept so the storage mapping is complete.
    Date,
}

impl ColumnType {
    /// Native SQLite column type.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Date => "DATE",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_type())
    }
}

/// Inferred type and nullability of one column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct InferredColumn {
    pub column_type: ColumnType,
    pub nullable: bool,
}

/// Kinds of value seen so far in a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Observed {
    Nothing,
    Bool,
    Integer,
    Real,
    Text,
}

impl Observed {
    fn merge(self, value: &CellValue) -> Observed {
        let next = match value {
            CellValue::Null => return self,
            CellValue::Bool(_) => Observed::Bool,
            CellValue::Integer(_) => Observed::Integer,
            CellValue::Real(_) => Observed::Real,
            CellValue::Text(_) => Observed::Text,
        };

        match (self, next) {
            (Observed::Nothing, n) => n,
            (a, b) if a == b => a,
            (Observed::Integer, Observed::Real) | (Observed::Real, Observed::Integer) => {
                Observed::Real
            }
            // Any other mix widens to text.
            _ => Observed::Text,
        }
    }
}

/// Schema Inference Engine
pub struct SchemaInference;

impl SchemaInference {
    pub fn new() -> Self {
        Self
    }

    /// Infers one column from its values. Never fails: incompatible values
    /// widen the column to text, and an all-null column is text.
    pub fn infer_column<'a, I>(&self, values: I) -> InferredColumn
    where
        I: IntoIterator<Item = &'a CellValue>,
    {
        let mut observed = Observed::Nothing;
        let mut nullable = false;

        for value in values {
            if value.is_null() {
                nullable = true;
            } else {
                observed = observed.merge(value);
            }
        }

        let column_type = match observed {
            Observed::Bool | Observed::Integer => ColumnType::Integer,
            Observed::Real => ColumnType::Real,
            Observed::Text | Observed::Nothing => ColumnType::Text,
        };

        InferredColumn {
            column_type,
            nullable,
        }
    }

    /// Infers every column of a row set, in column order.
    pub fn infer_schema(&self, rows: &RowSet) -> Vec<InferredColumn> {
        (0..rows.column_count())
            .map(|idx| self.infer_column(rows.column_values(idx)))
            .collect()
    }
}

impl Default for SchemaInference {
    fn default() -> Self {
        Self::new()
    }
}
