//! Column name sanitization
//!
//! Rewrites source column names into identifiers that are safe to use in
//! DDL and unique within one table:
//! 1. blocklisted characters become `_`
//! 2. runs of `_` collapse and leading/trailing `_` are dropped
//! 3. an empty result becomes `column_<index>`
//! 4. duplicates, compared case-insensitively, get the smallest free `_<n>`

use std::collections::HashSet;

/// Characters replaced by an underscore.
const BLOCKLIST: &[char] = &[
    ' ', '-', '.', '(', ')', '[', ']', '{', '}', '/', '\\', ':', ';', ',', '?', '!', '@', '#',
    '$', '%', '^', '&', '*', '+', '=', '|',
];

/// Applies steps 1 and 2 to one name.
pub fn clean_identifier(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if BLOCKLIST.contains(&c) { '_' } else { c })
        .collect();

    replaced
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Sanitizes a full column list, preserving order.
pub fn sanitize_column_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let cleaned = names.iter().enumerate().map(|(idx, name)| {
        let cleaned = clean_identifier(name.as_ref());
        if cleaned.is_empty() {
            format!("column_{}", idx)
        } else {
            cleaned
        }
    });

    // Keys are lowercased: SQL column names collide regardless of case.
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(names.len());

    for name in cleaned {
        let unique = if seen.contains(&name.to_lowercase()) {
            let mut counter = 1;
            loop {
                let candidate = format!("{}_{}", name, counter);
                if !seen.contains(&candidate.to_lowercase()) {
                    break candidate;
                }
                counter += 1;
            }
        } else {
            name
        };

        seen.insert(unique.to_lowercase());
        out.push(unique);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_punctuation_becomes_single_underscores() {
        assert_eq!(clean_identifier("2023 Q1 (Revenue)"), "2023_Q1_Revenue");
        assert_eq!(clean_identifier("first-name"), "first_name");
        assert_eq!(clean_identifier("a.b.c"), "a_b_c");
        assert_eq!(clean_identifier("__total__ $$"), "total");
        assert_eq!(clean_identifier("x / y \\ z"), "x_y_z");
    }

    #[test]
    fn test_empty_names_get_positional_placeholders() {
        let names = sanitize_column_names(&["id", "", "()", "value"]);
        assert_eq!(names, vec!["id", "column_1", "column_2", "value"]);
    }

    #[test]
    fn test_case_insensitive_duplicates() {
        let names = sanitize_column_names(&["Name", "name", "NAME"]);
        assert_eq!(names, vec!["Name", "name_1", "NAME_2"]);
    }

    #[test]
    fn test_duplicates_created_by_cleaning() {
        let names = sanitize_column_names(&["a b", "a-b", "a.b", "a_b_1"]);
        assert_eq!(names, vec!["a_b", "a_b_1", "a_b_2", "a_b_1_1"]);
    }

    #[test]
    fn test_sanitization_is_idempotent() {
        let inputs = vec![
            "Full Name", "full name", "", "Salary ($)", "Name", "NAME", "column_2", "  ", "a--b",
        ];
        let once = sanitize_column_names(inputs.as_slice());
        let twice = sanitize_column_names(once.as_slice());
        assert_eq!(once, twice);
    }
}
