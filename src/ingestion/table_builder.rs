//! Table Builder - Turns a sampled row set into a typed target table

use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::row_set::{CellValue, RowSet};
use crate::ingestion::sanitize::sanitize_column_names;
use crate::ingestion::schema_inference::{ColumnType, SchemaInference};
use serde::Serialize;

/// Rows per INSERT statement when rendering SQL text.
pub const DEFAULT_INSERT_CHUNK: usize = 100;

/// One column of a target table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    /// Name as it appeared in the source
    pub original_name: String,

    /// Sanitized identifier used in the table
    pub name: String,

    pub column_type: ColumnType,
    pub nullable: bool,
}

/// A named, typed table ready for persistence.
///
/// Built once per ingestion and read-only afterwards. Each value is either
/// `Null` or matches its column's type: `Integer` for Integer columns,
/// `Real` for Real columns, `Text` for Text columns.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TargetTable {
    name: String,
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<CellValue>>,
}

impl TargetTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// `CREATE TABLE` statement for this table.
    pub fn create_table_sql(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("    {} {}", quote_identifier(&c.name), c.column_type.sql_type()))
            .collect::<Vec<_>>()
            .join(",\n");

        format!(
            "CREATE TABLE {} (\n{}\n)",
            quote_identifier(&self.name),
            columns
        )
    }

    /// Multi-row `INSERT` statements, `chunk_size` rows each. Nulls are
    /// written as the `NULL` literal.
    pub fn insert_statements(&self, chunk_size: usize) -> Vec<String> {
        let columns = self
            .columns
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect::<Vec<_>>()
            .join(", ");

        self.rows
            .chunks(chunk_size.max(1))
            .map(|chunk| {
                let values = chunk
                    .iter()
                    .map(|row| {
                        let literals = row.iter().map(sql_literal).collect::<Vec<_>>();
                        format!("({})", literals.join(", "))
                    })
                    .collect::<Vec<_>>()
                    .join(",\n    ");
                format!(
                    "INSERT INTO {} ({}) VALUES\n    {}",
                    quote_identifier(&self.name),
                    columns,
                    values
                )
            })
            .collect()
    }

    /// Full SQL script: the DDL followed by every INSERT.
    pub fn to_sql_script(&self) -> String {
        let mut script = self.create_table_sql();
        script.push_str(";\n");
        for insert in self.insert_statements(DEFAULT_INSERT_CHUNK) {
            script.push('\n');
            script.push_str(&insert);
            script.push_str(";\n");
        }
        script
    }
}

/// Quotes an identifier for SQL text, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Renders one value as a SQL literal.
pub fn sql_literal(value: &CellValue) -> String {
    match value {
        CellValue::Null => "NULL".to_string(),
        CellValue::Bool(true) => "1".to_string(),
        CellValue::Bool(false) => "0".to_string(),
        CellValue::Integer(i) => i.to_string(),
        CellValue::Real(f) if f.is_nan() => "NULL".to_string(),
        // SQLite reads an overflowing literal as infinity.
        CellValue::Real(f) if f.is_infinite() && *f > 0.0 => "9e999".to_string(),
        CellValue::Real(f) if f.is_infinite() => "-9e999".to_string(),
        CellValue::Real(f) => format!("{:?}", f),
        CellValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}

/// Table Builder - Applies sanitization and inference, then types each row.
pub struct TableBuilder {
    schema_inference: SchemaInference,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self {
            schema_inference: SchemaInference::new(),
        }
    }

    pub fn build(&self, table_name: &str, rows: RowSet) -> IngestionResult<TargetTable> {
        if table_name.trim().is_empty() {
            return Err(IngestionError::IngestionFailed(
                "table name must not be empty".to_string(),
            ));
        }

        let inferred = self.schema_inference.infer_schema(&rows);
        let (original_names, raw_rows) = rows.into_parts();
        let names = sanitize_column_names(original_names.as_slice());

        let columns: Vec<ColumnDescriptor> = original_names
            .into_iter()
            .zip(names)
            .zip(inferred.iter())
            .map(|((original_name, name), col)| ColumnDescriptor {
                original_name,
                name,
                column_type: col.column_type,
                nullable: col.nullable,
            })
            .collect();

        let typed_rows = raw_rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(columns.iter())
                    .map(|(value, col)| coerce_to(value, col.column_type))
                    .collect()
            })
            .collect();

        Ok(TargetTable {
            name: table_name.to_string(),
            columns,
            rows: typed_rows,
        })
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts a value into the representation its column type stores.
fn coerce_to(value: CellValue, column_type: ColumnType) -> CellValue {
    match (column_type, value) {
        (_, CellValue::Null) => CellValue::Null,
        (ColumnType::Integer, CellValue::Bool(b)) => CellValue::Integer(b as i64),
        (ColumnType::Real, CellValue::Integer(i)) => CellValue::Real(i as f64),
        (ColumnType::Text, CellValue::Bool(b)) => CellValue::Text(b.to_string()),
        (ColumnType::Text, CellValue::Integer(i)) => CellValue::Text(i.to_string()),
        (ColumnType::Text, CellValue::Real(f)) => CellValue::Text(format!("{:?}", f)),
        (ColumnType::Date, CellValue::Text(s)) => CellValue::Text(s),
        (ColumnType::Date, other) => CellValue::Text(other.to_string()),
        (_, other) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(columns: &[&str], data: Vec<Vec<CellValue>>) -> RowSet {
        let mut set = RowSet::new(columns.iter().map(|c| c.to_string()).collect());
        for row in data {
            set.push_row(row);
        }
        set
    }

    #[test]
    fn test_build_types_and_sanitizes() {
        let input = rows(
            &["Full Name", "Score"],
            vec![
                vec![CellValue::Text("A".to_string()), CellValue::Integer(1)],
                vec![CellValue::Text("B".to_string()), CellValue::Real(2.5)],
            ],
        );
        let table = TableBuilder::new().build("people", input).unwrap();
        assert_eq!(table.columns()[0].name, "Full_Name");
        assert_eq!(table.columns()[0].original_name, "Full Name");
        assert_eq!(table.columns()[1].column_type, ColumnType::Real);
        assert_eq!(table.rows()[0][1], CellValue::Real(1.0));
    }

    #[test]
    fn test_mixed_column_values_become_text() {
        let input = rows(
            &["v"],
            vec![
                vec![CellValue::Integer(1)],
                vec![CellValue::Text("x".to_string())],
                vec![CellValue::Null],
            ],
        );
        let table = TableBuilder::new().build("t", input).unwrap();
        assert_eq!(table.columns()[0].column_type, ColumnType::Text);
        assert!(table.columns()[0].nullable);
        assert_eq!(table.rows()[0][0], CellValue::Text("1".to_string()));
        assert_eq!(table.rows()[2][0], CellValue::Null);
    }

    #[test]
    fn test_empty_table_name_is_rejected() {
        let input = rows(&["a"], vec![vec![CellValue::Integer(1)]]);
        assert!(matches!(
            TableBuilder::new().build("  ", input),
            Err(IngestionError::IngestionFailed(_))
        ));
    }

    #[test]
    fn test_sql_rendering_uses_null_literal() {
        let input = rows(
            &["name", "score"],
            vec![
                vec![CellValue::Text("O'Brien".to_string()), CellValue::Null],
                vec![CellValue::Null, CellValue::Real(2.5)],
            ],
        );
        let table = TableBuilder::new().build("scores", input).unwrap();

        assert_eq!(
            table.create_table_sql(),
            "CREATE TABLE \"scores\" (\n    \"name\" TEXT,\n    \"score\" REAL\n)"
        );

        let inserts = table.insert_statements(DEFAULT_INSERT_CHUNK);
        assert_eq!(inserts.len(), 1);
        assert!(inserts[0].contains("('O''Brien', NULL)"));
        assert!(inserts[0].contains("(NULL, 2.5)"));
        assert!(!inserts[0].contains("'NULL'"));
        assert!(!inserts[0].contains("NaN"));
    }

    #[test]
    fn test_insert_statements_are_chunked() {
        let data = (0..250).map(|i| vec![CellValue::Integer(i)]).collect();
        let table = TableBuilder::new().build("n", rows(&["n"], data)).unwrap();
        assert_eq!(table.insert_statements(100).len(), 3);
    }
}
