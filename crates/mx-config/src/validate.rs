//! Semantic validation of export configurations.
//!
//! Names end up verbatim in SQL statements and file names, so they are
//! restricted to identifier-safe characters.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::export::{DatabaseType, ExportConfig};

/// Smallest identifier bound that still leaves room to shorten names.
pub const MIN_COLUMN_NAME_LEN: usize = 8;

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Outcome of validating a configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn table_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]+$").expect("valid regex"))
}

fn db_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid regex"))
}

fn file_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_].*$").expect("valid regex"))
}

/// Check names and numeric bounds of `config`.
pub fn validate_config(config: &ExportConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if let Some(prefix) = &config.table_prefix {
        if !table_prefix_re().is_match(prefix) {
            result.errors.push(ValidationError::new(
                "table_prefix",
                format!("invalid table prefix {:?}", prefix),
            ));
        }
    }

    match config.db_type {
        DatabaseType::MySql => {
            if !db_name_re().is_match(&config.db_name) {
                result.errors.push(ValidationError::new(
                    "db_name",
                    "the database name has invalid characters",
                ));
            }
        }
        DatabaseType::Sqlite => {
            if !file_name_re().is_match(&config.sqlite_file) {
                result.errors.push(ValidationError::new(
                    "sqlite_file",
                    "the SQLite file name has invalid characters",
                ));
            }
        }
        DatabaseType::Oracle => result
            .warnings
            .push("Oracle is not supported; export will fail at schema setup".to_string()),
    }

    if config.store_csvs && !table_prefix_re().is_match(&config.sql_file_prefix) {
        result.errors.push(ValidationError::new(
            "sql_file_prefix",
            format!("invalid SQL file prefix {:?}", config.sql_file_prefix),
        ));
    }

    if config.max_column_name_len < MIN_COLUMN_NAME_LEN {
        result.errors.push(ValidationError::new(
            "max_column_name_len",
            format!("must be at least {}", MIN_COLUMN_NAME_LEN),
        ));
    }
    if config.insert_batch_size == 0 {
        result
            .errors
            .push(ValidationError::new("insert_batch_size", "must be at least 1"));
    }
    if config.max_name_attempts == 0 {
        result
            .errors
            .push(ValidationError::new("max_name_attempts", "must be at least 1"));
    }

    if config.aggregates.kinds().is_empty() {
        result
            .warnings
            .push("no aggregates enabled; Per_Image carries image features only".to_string());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let result = validate_config(&ExportConfig::default());
        assert!(result.is_valid(), "{:?}", result.errors);
    }

    #[test]
    fn table_prefix_must_start_with_letter() {
        let mut config = ExportConfig::default();
        config.table_prefix = Some("_x".to_string());
        assert!(!validate_config(&config).is_valid());
        config.table_prefix = Some("Expt_".to_string());
        assert!(validate_config(&config).is_valid());
    }

    #[test]
    fn mysql_db_name_rejects_punctuation() {
        let mut config = ExportConfig::default();
        config.db_name = "my-db".to_string();
        let result = validate_config(&config);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "db_name");
    }

    #[test]
    fn sqlite_checks_file_not_db_name() {
        let mut config = ExportConfig::default();
        config.db_type = DatabaseType::Sqlite;
        config.db_name = "not checked!".to_string();
        config.sqlite_file = ".hidden.db".to_string();
        let result = validate_config(&config);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "sqlite_file");
    }

    #[test]
    fn sql_file_prefix_checked_only_for_csv_output() {
        let mut config = ExportConfig::default();
        config.sql_file_prefix = "9bad".to_string();
        assert!(validate_config(&config).is_valid());
        config.store_csvs = true;
        assert!(!validate_config(&config).is_valid());
    }

    #[test]
    fn numeric_bounds() {
        let mut config = ExportConfig::default();
        config.max_column_name_len = 4;
        config.insert_batch_size = 0;
        config.max_name_attempts = 0;
        let fields: Vec<_> = validate_config(&config)
            .errors
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec!["max_column_name_len", "insert_batch_size", "max_name_attempts"]
        );
    }

    #[test]
    fn oracle_warns_but_validates() {
        let mut config = ExportConfig::default();
        config.db_type = DatabaseType::Oracle;
        let result = validate_config(&config);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
    }
}
