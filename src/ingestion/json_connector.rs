//! JSON Connector - Flattens JSON documents into a row set

use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::row_set::{CellValue, RowSet};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// How the records were laid out in the document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "shape", content = "key")]
pub enum JsonShape {
    /// `[{...}, {...}]`
    Array,
    /// `{"key": [{...}, ...]}` or `{"key": {...}}`
    KeyedArray(String),
    /// A bare object, read as a single row.
    Object,
}

/// JSON Connector - Accepts the three supported document shapes.
pub struct JsonConnector;

impl JsonConnector {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, bytes: &[u8]) -> IngestionResult<(RowSet, JsonShape)> {
        let document: Value = serde_json::from_slice(bytes)?;

        let (shape, records) = match document {
            Value::Array(items) => (JsonShape::Array, Self::objects(items, "top-level array")?),
            Value::Object(obj) if obj.len() == 1 && Self::wraps_records(&obj) => {
                // Single-key wrapper: the value holds the records.
                let (key, inner) = obj
                    .into_iter()
                    .next()
                    .ok_or_else(|| IngestionError::IngestionFailed("empty wrapper".to_string()))?;
                let records = match inner {
                    Value::Array(items) => Self::objects(items, &format!("array under \"{}\"", key))?,
                    Value::Object(inner_obj) => vec![inner_obj],
                    other => {
                        return Err(IngestionError::UnsupportedJsonShape(format!(
                            "value under \"{}\" is {}, expected an array of objects or an object",
                            key,
                            Self::describe(&other)
                        )))
                    }
                };
                (JsonShape::KeyedArray(key), records)
            }
            Value::Object(obj) => (JsonShape::Object, vec![obj]),
            other => {
                return Err(IngestionError::UnsupportedJsonShape(format!(
                    "document is {}, expected an array of objects or an object",
                    Self::describe(&other)
                )))
            }
        };

        let rows = Self::to_row_set(&records);
        debug!(
            rows = rows.row_count(),
            columns = rows.column_count(),
            shape = ?shape,
            "parsed JSON document"
        );

        Ok((rows, shape))
    }

    /// A single-key object is a wrapper only when its value is an array or
    /// an object; `{"total": 5}` is an ordinary one-row record.
    fn wraps_records(obj: &Map<String, Value>) -> bool {
        matches!(obj.values().next(), Some(Value::Array(_) | Value::Object(_)))
    }

    fn objects(items: Vec<Value>, context: &str) -> IngestionResult<Vec<Map<String, Value>>> {
        items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::Object(obj) => Ok(obj),
                other => Err(IngestionError::UnsupportedJsonShape(format!(
                    "element {} of the {} is {}, expected an object",
                    idx,
                    context,
                    Self::describe(&other)
                ))),
            })
            .collect()
    }

    /// Builds rows over the union of keys, in first-seen order.
    fn to_row_set(records: &[Map<String, Value>]) -> RowSet {
        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for record in records {
            for key in record.keys() {
                if !positions.contains_key(key) {
                    positions.insert(key.clone(), columns.len());
                    columns.push(key.clone());
                }
            }
        }

        let width = columns.len();
        let mut rows = RowSet::new(columns);
        for record in records {
            let mut row = vec![CellValue::Null; width];
            for (key, value) in record {
                row[positions[key]] = CellValue::from_json(value);
            }
            rows.push_row(row);
        }

        rows
    }

    fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
        }
    }
}

impl Default for JsonConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_of_objects_unions_keys() {
        let (rows, shape) = JsonConnector::new()
            .parse(br#"[{"a": 1, "b": "x"}, {"b": "y", "c": true}]"#)
            .unwrap();
        assert_eq!(shape, JsonShape::Array);
        assert_eq!(rows.columns(), &["a", "b", "c"]);
        assert_eq!(
            rows.rows()[1],
            vec![
                CellValue::Null,
                CellValue::Text("y".to_string()),
                CellValue::Bool(true)
            ]
        );
    }

    #[test]
    fn test_single_key_wrapper() {
        let (rows, shape) = JsonConnector::new()
            .parse(br#"{"employees": [{"id": 1}, {"id": 2}]}"#)
            .unwrap();
        assert_eq!(shape, JsonShape::KeyedArray("employees".to_string()));
        assert_eq!(rows.row_count(), 2);
    }

    #[test]
    fn test_bare_object_is_one_row() {
        let (rows, shape) = JsonConnector::new()
            .parse(br#"{"id": 1, "name": "a"}"#)
            .unwrap();
        assert_eq!(shape, JsonShape::Object);
        assert_eq!(rows.row_count(), 1);
        assert_eq!(rows.columns(), &["id", "name"]);
    }

    #[test]
    fn test_rejects_scalars_and_mixed_arrays() {
        let connector = JsonConnector::new();
        assert!(matches!(
            connector.parse(b"42"),
            Err(IngestionError::UnsupportedJsonShape(_))
        ));
        assert!(matches!(
            connector.parse(br#"[{"a": 1}, 2]"#),
            Err(IngestionError::UnsupportedJsonShape(_))
        ));
        assert!(matches!(
            connector.parse(br#"{"rows": [1, 2]}"#),
            Err(IngestionError::UnsupportedJsonShape(_))
        ));
    }

    #[test]
    fn test_single_scalar_key_is_one_row() {
        let connector = JsonConnector::new();

        let (rows, shape) = connector.parse(br#"{"total": 5}"#).unwrap();
        assert_eq!(shape, JsonShape::Object);
        assert_eq!(rows.columns(), &["total"]);
        assert_eq!(rows.rows(), &[vec![CellValue::Integer(5)]]);

        let (rows, _) = connector.parse(br#"{"name": "acme"}"#).unwrap();
        assert_eq!(rows.rows(), &[vec![CellValue::Text("acme".to_string())]]);

        let (rows, _) = connector.parse(br#"{"gone": null}"#).unwrap();
        assert_eq!(rows.rows(), &[vec![CellValue::Null]]);
    }

    #[test]
    fn test_invalid_syntax_is_malformed() {
        let err = JsonConnector::new().parse(b"[{\"a\": 1,}").unwrap_err();
        assert!(matches!(err, IngestionError::MalformedSource(_)));
    }
}
