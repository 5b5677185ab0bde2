//! Visualization suggestions for a result set
//!
//! Rendering is left to the presentation layer; this only decides which
//! charts make sense for the columns at hand.

use crate::console::ResultSet;
use crate::ingestion::{ColumnType, SchemaInference};
use serde::Serialize;
use std::collections::HashSet;

/// Categorical columns with more distinct values than this are not charted.
const HIGH_CARDINALITY: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartSuggestion {
    SummaryStats,
    Distribution { column: String },
    Correlation,
    BarChart { column: String },
    Scatter { x_column: String, y_column: String },
}

impl ChartSuggestion {
    pub fn title(&self) -> String {
        match self {
            ChartSuggestion::SummaryStats => "Dataset Overview".to_string(),
            ChartSuggestion::Distribution { column } => format!("Distribution: {}", column),
            ChartSuggestion::Correlation => "Correlation Analysis".to_string(),
            ChartSuggestion::BarChart { column } => format!("Count: {}", column),
            ChartSuggestion::Scatter { x_column, y_column } => {
                format!("{} vs {}", y_column, x_column)
            }
        }
    }

    pub fn description(&self) -> String {
        match self {
            ChartSuggestion::SummaryStats => {
                "Overall statistics and data quality assessment".to_string()
            }
            ChartSuggestion::Distribution { column } => {
                format!("Histogram, box plot, and statistics for {}", column)
            }
            ChartSuggestion::Correlation => "Correlation matrix for numeric variables".to_string(),
            ChartSuggestion::BarChart { column } => format!("Count distribution for {}", column),
            ChartSuggestion::Scatter { .. } => "Scatter plot showing relationship".to_string(),
        }
    }
}

/// Column roles found in a result set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ColumnProfile {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
    pub high_cardinality: Vec<String>,
    pub low_cardinality: Vec<String>,
}

pub fn profile(result: &ResultSet) -> ColumnProfile {
    let inference = SchemaInference::new();
    let mut profile = ColumnProfile::default();

    for (idx, name) in result.columns().iter().enumerate() {
        let inferred = inference.infer_column(result.column_values(idx));
        let has_values = result.column_values(idx).any(|v| !v.is_null());

        match inferred.column_type {
            ColumnType::Integer | ColumnType::Real if has_values => {
                profile.numeric.push(name.clone())
            }
            _ => {
                profile.categorical.push(name.clone());
                let distinct: HashSet<String> = result
                    .column_values(idx)
                    .filter(|v| !v.is_null())
                    .map(|v| v.to_string())
                    .collect();
                if distinct.len() > HIGH_CARDINALITY {
                    profile.high_cardinality.push(name.clone());
                } else {
                    profile.low_cardinality.push(name.clone());
                }
            }
        }
    }

    profile
}

/// Suggests charts for `result`. An empty result gets no suggestions.
pub fn suggest(result: &ResultSet) -> Vec<ChartSuggestion> {
    if result.is_empty() || result.column_count() == 0 {
        return Vec::new();
    }

    let profile = profile(result);
    let numeric = &profile.numeric;
    let mut suggestions = Vec::new();

    if !numeric.is_empty() {
        suggestions.push(ChartSuggestion::SummaryStats);
    }

    for column in numeric.iter().take(5) {
        suggestions.push(ChartSuggestion::Distribution {
            column: column.clone(),
        });
    }

    if numeric.len() > 1 {
        suggestions.push(ChartSuggestion::Correlation);
    }

    for column in profile.low_cardinality.iter().take(3) {
        suggestions.push(ChartSuggestion::BarChart {
            column: column.clone(),
        });
    }

    if numeric.len() >= 2 {
        for (i, x_column) in numeric.iter().take(2).enumerate() {
            for y_column in numeric.iter().skip(i + 1).take(2) {
                suggestions.push(ChartSuggestion::Scatter {
                    x_column: x_column.clone(),
                    y_column: y_column.clone(),
                });
            }
        }
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::CellValue;

    fn employees() -> ResultSet {
        ResultSet::new(
            vec![
                "name".to_string(),
                "department".to_string(),
                "salary".to_string(),
                "years".to_string(),
                "age".to_string(),
            ],
            (0..30)
                .map(|i| {
                    vec![
                        CellValue::Text(format!("emp{}", i)),
                        CellValue::Text(["Eng", "Ops"][i % 2].to_string()),
                        CellValue::Real(50000.0 + i as f64),
                        CellValue::Integer(i as i64 % 10),
                        CellValue::Integer(20 + i as i64),
                    ]
                })
                .collect(),
        )
    }

    #[test]
    fn test_profile_splits_by_cardinality() {
        let p = profile(&employees());
        assert_eq!(p.numeric, vec!["salary", "years", "age"]);
        assert_eq!(p.high_cardinality, vec!["name"]);
        assert_eq!(p.low_cardinality, vec!["department"]);
    }

    #[test]
    fn test_suggestions() {
        let s = suggest(&employees());
        assert_eq!(s[0], ChartSuggestion::SummaryStats);
        assert!(s.contains(&ChartSuggestion::Correlation));
        assert!(s.contains(&ChartSuggestion::BarChart {
            column: "department".to_string()
        }));
        let scatters: Vec<_> = s
            .iter()
            .filter(|c| matches!(c, ChartSuggestion::Scatter { .. }))
            .collect();
        // (salary, years), (salary, age), (years, age)
        assert_eq!(scatters.len(), 3);
    }

    #[test]
    fn test_empty_result_has_no_suggestions() {
        let empty = ResultSet::new(vec!["a".to_string()], Vec::new());
        assert!(suggest(&empty).is_empty());
    }
}
