//! Row Set - Parsed, untyped records shared by every connector

use serde::Serialize;
use std::fmt;

/// A single scalar value as read from a tabular source.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Converts a JSON value into a cell. Nested arrays and objects are kept
    /// as their compact JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CellValue::Integer(i)
                } else {
                    match n.as_f64() {
                        Some(f) => CellValue::Real(f),
                        None => CellValue::Text(n.to_string()),
                    }
                }
            }
            Value::String(s) => CellValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => CellValue::Text(value.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::Integer(i) => Value::from(*i),
            CellValue::Real(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CellValue::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Real(r) => write!(f, "{}", r),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// Ordered records with a fixed column list.
///
/// Every row holds exactly `columns.len()` values; fields a record did not
/// carry are `CellValue::Null`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RowSet {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl RowSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row, padding missing trailing values with nulls.
    pub(crate) fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.columns.len(), CellValue::Null);
        self.rows.push(row);
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

    /// Iterates rows as `(column name, value)` pairs.
    pub fn records(&self) -> impl Iterator<Item = Vec<(&str, &CellValue)>> + '_ {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect()
        })
    }

    /// Keeps only the first `n` rows.
    pub fn head(mut self, n: usize) -> Self {
        self.rows.truncate(n);
        self
    }

    /// Returns a row set holding the rows at `indices`, in that order.
    pub(crate) fn select(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Values of one column, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Vec<CellValue>>) {
        (self.columns, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_short_rows_are_padded_with_nulls() {
        let mut rows = RowSet::new(vec!["a".to_string(), "b".to_string()]);
        rows.push_row(vec![CellValue::Integer(1)]);
        assert_eq!(rows.rows()[0], vec![CellValue::Integer(1), CellValue::Null]);
    }

    #[test]
    fn test_nested_json_becomes_text() {
        let cell = CellValue::from_json(&json!({"a": [1, 2]}));
        assert_eq!(cell, CellValue::Text(r#"{"a":[1,2]}"#.to_string()));
        assert_eq!(CellValue::from_json(&json!(2.5)), CellValue::Real(2.5));
        assert_eq!(CellValue::from_json(&json!(7)), CellValue::Integer(7));
    }

    #[test]
    fn test_records_pairs_names_with_values() {
        let mut rows = RowSet::new(vec!["id".to_string(), "name".to_string()]);
        rows.push_row(vec![CellValue::Integer(1), CellValue::Text("a".to_string())]);
        let records: Vec<_> = rows.records().collect();
        assert_eq!(records[0][1], ("name", &CellValue::Text("a".to_string())));
    }
}
