//! Runtime configuration read from the environment (and `.env`, if present).

use crate::ingestion::IngestionLimits;
use std::env;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_MAX_SOURCE_BYTES: u64 = 200 * 1024 * 1024;
pub const DEFAULT_SAMPLE_SIZE: usize = 10_000;
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo";

#[derive(Clone, Debug, PartialEq)]
pub struct ConsoleConfig {
    pub max_source_bytes: u64,
    /// Suggested sample size for sources with more rows than this
    pub default_sample_size: usize,
    pub data_dir: PathBuf,
    pub api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
            default_sample_size: DEFAULT_SAMPLE_SIZE,
            data_dir: env::temp_dir(),
            api_key: None,
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
        }
    }
}

impl ConsoleConfig {
    /// Loads `.env` and then reads the environment.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unparseable numbers fall
    /// back to their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_source_bytes = parse_or(
            "SQL_CONSOLE_MAX_SOURCE_BYTES",
            lookup("SQL_CONSOLE_MAX_SOURCE_BYTES"),
            defaults.max_source_bytes,
        );
        let default_sample_size = parse_or(
            "SQL_CONSOLE_DEFAULT_SAMPLE",
            lookup("SQL_CONSOLE_DEFAULT_SAMPLE"),
            defaults.default_sample_size,
        );

        Self {
            max_source_bytes,
            default_sample_size,
            data_dir: lookup("SQL_CONSOLE_DATA_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            api_key: lookup("OPENAI_API_KEY").filter(|v| !v.trim().is_empty()),
            llm_base_url: lookup("SQL_CONSOLE_LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            llm_model: lookup("SQL_CONSOLE_LLM_MODEL").unwrap_or(defaults.llm_model),
        }
    }

    pub fn ingestion_limits(&self) -> IngestionLimits {
        IngestionLimits {
            max_source_bytes: Some(self.max_source_bytes),
        }
    }

    /// Sample size to suggest for a source of `row_count` rows, if any.
    pub fn suggested_sample(&self, row_count: usize) -> Option<usize> {
        (row_count > self.default_sample_size).then_some(self.default_sample_size)
    }
}

fn parse_or<T: std::str::FromStr + Copy>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %v, "ignoring unparseable setting");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> ConsoleConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConsoleConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.max_source_bytes, 200 * 1024 * 1024);
        assert_eq!(cfg.default_sample_size, 10_000);
        assert!(cfg.api_key.is_none());
        assert_eq!(cfg.ingestion_limits().max_source_bytes, Some(DEFAULT_MAX_SOURCE_BYTES));
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let cfg = config(&[
            ("SQL_CONSOLE_MAX_SOURCE_BYTES", "1024"),
            ("SQL_CONSOLE_DEFAULT_SAMPLE", "many"),
            ("SQL_CONSOLE_DATA_DIR", "/var/lib/console"),
            ("OPENAI_API_KEY", "  "),
        ]);
        assert_eq!(cfg.max_source_bytes, 1024);
        assert_eq!(cfg.default_sample_size, DEFAULT_SAMPLE_SIZE);
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/console"));
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn test_suggested_sample() {
        let cfg = config(&[("SQL_CONSOLE_DEFAULT_SAMPLE", "100")]);
        assert_eq!(cfg.suggested_sample(100), None);
        assert_eq!(cfg.suggested_sample(101), Some(100));
    }
}
