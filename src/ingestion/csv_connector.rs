//! CSV Connector - Parses delimited text into a row set

use crate::error::{IngestionError, IngestionResult};
use crate::ingestion::row_set::{CellValue, RowSet};
use csv::ReaderBuilder;
use tracing::debug;

/// Cell contents treated as missing, in addition to the empty string.
const NA_TOKENS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
];

/// CSV Connector - Reads a header row followed by records.
pub struct CsvConnector {
    delimiter: u8,
}

impl CsvConnector {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Coerces one raw cell into a scalar.
    ///
    /// Booleans and numbers are recognised on the trimmed text; anything
    /// else keeps the original text untouched.
    pub fn coerce_cell(s: &str) -> CellValue {
        let trimmed = s.trim();
        if trimmed.is_empty() || NA_TOKENS.contains(&trimmed) {
            return CellValue::Null;
        }

        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }

        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_nan() {
                return CellValue::Null;
            }
            return CellValue::Real(f);
        }

        CellValue::Text(s.to_string())
    }

    /// Parses the full text. A record longer than the header is rejected;
    /// shorter records are padded with nulls.
    pub fn parse(&self, bytes: &[u8]) -> IngestionResult<RowSet> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            IngestionError::MalformedSource(format!("delimited text is not valid UTF-8: {}", e))
        })?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(text.as_bytes());

        let headers = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();

        if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
            return Err(IngestionError::EmptySource(
                "no columns to parse from delimited text".to_string(),
            ));
        }

        let width = headers.len();
        let mut rows = RowSet::new(headers);

        for (idx, result) in rdr.records().enumerate() {
            let record = result?;
            if record.len() > width {
                // Line numbers are 1-based and the header occupies line 1.
                let line = record
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(idx as u64 + 2);
                return Err(IngestionError::MalformedSource(format!(
                    "expected {} fields on line {}, saw {}",
                    width,
                    line,
                    record.len()
                )));
            }

            rows.push_row(record.iter().map(Self::coerce_cell).collect());
        }

        debug!(
            rows = rows.row_count(),
            columns = rows.column_count(),
            "parsed delimited text"
        );

        Ok(rows)
    }
}

impl Default for CsvConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_cell() {
        assert_eq!(CsvConnector::coerce_cell(" 42 "), CellValue::Integer(42));
        assert_eq!(CsvConnector::coerce_cell("2.5"), CellValue::Real(2.5));
        assert_eq!(CsvConnector::coerce_cell("TRUE"), CellValue::Bool(true));
        assert_eq!(CsvConnector::coerce_cell(""), CellValue::Null);
        assert_eq!(CsvConnector::coerce_cell("NaN"), CellValue::Null);
        assert_eq!(CsvConnector::coerce_cell("N/A"), CellValue::Null);
        assert_eq!(
            CsvConnector::coerce_cell(" hello "),
            CellValue::Text(" hello ".to_string())
        );
    }

    #[test]
    fn test_parse_pads_short_records() {
        let rows = CsvConnector::new().parse(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(rows.columns(), &["a", "b", "c"]);
        assert_eq!(
            rows.rows()[0],
            vec![CellValue::Integer(1), CellValue::Integer(2), CellValue::Null]
        );
    }

    #[test]
    fn test_parse_rejects_long_records() {
        let err = CsvConnector::new().parse(b"a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(err, IngestionError::MalformedSource(_)));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_keeps_quoted_headers() {
        let rows = CsvConnector::new()
            .parse(b"\"2023 Q1 (Revenue)\",name\n100,x\n")
            .unwrap();
        assert_eq!(rows.columns()[0], "2023 Q1 (Revenue)");
    }

    #[test]
    fn test_header_only_has_no_rows() {
        let rows = CsvConnector::new().parse(b"a,b\n").unwrap();
        assert!(rows.is_empty());
        assert_eq!(rows.column_count(), 2);
    }

    #[test]
    fn test_blank_text_has_no_columns() {
        let err = CsvConnector::new().parse(b"").unwrap_err();
        assert!(matches!(err, IngestionError::EmptySource(_)));
    }
}
