//! Export configuration types.
//!
//! Every field has a default, so an empty TOML or JSON document is a valid
//! configuration that writes `Per_Image`/`Per_Object` into `DefaultDB`.

use mx_common::AggregateKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::validate::{validate_config, ValidationError, ValidationResult};

/// Default bound on generated column identifiers.
pub const DEFAULT_MAX_COLUMN_NAME_LEN: usize = 64;

/// Object rows per multi-row INSERT; keeps statements under the server's
/// maximum packet size.
pub const DEFAULT_INSERT_BATCH_SIZE: usize = 25;

/// Attempts allowed for the randomized fallback shortening of one name.
pub const DEFAULT_MAX_NAME_ATTEMPTS: usize = 1000;

/// Errors raised while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported config file extension: {0}")]
    UnknownExtension(String),

    #[error("invalid configuration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ConfigError> for mx_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Invalid(errors) => match errors.first() {
                Some(first) if errors.len() == 1 => mx_common::Error::InvalidSetting {
                    field: first.field.clone(),
                    reason: first.message.clone(),
                },
                _ => mx_common::Error::Config(join_errors(&errors)),
            },
            other => mx_common::Error::Config(other.to_string()),
        }
    }
}

/// Target database engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseType {
    #[default]
    #[serde(rename = "mysql")]
    MySql,
    Sqlite,
    /// Declared for configuration compatibility; exporting to it fails.
    Oracle,
}

impl DatabaseType {
    pub fn is_supported(&self) -> bool {
        !matches!(self, DatabaseType::Oracle)
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::MySql => write!(f, "MySQL"),
            DatabaseType::Sqlite => write!(f, "SQLite"),
            DatabaseType::Oracle => write!(f, "Oracle"),
        }
    }
}

/// Which per-image aggregates to compute over object measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateSettings {
    pub mean: bool,
    pub median: bool,
    pub std_dev: bool,
}

impl Default for AggregateSettings {
    fn default() -> Self {
        Self {
            mean: true,
            median: false,
            std_dev: false,
        }
    }
}

impl AggregateSettings {
    pub fn none() -> Self {
        Self {
            mean: false,
            median: false,
            std_dev: false,
        }
    }

    /// Enabled kinds in column order.
    pub fn kinds(&self) -> Vec<AggregateKind> {
        AggregateKind::ALL
            .into_iter()
            .filter(|kind| match kind {
                AggregateKind::Mean => self.mean,
                AggregateKind::Median => self.median,
                AggregateKind::StdDev => self.std_dev,
            })
            .collect()
    }
}

/// Complete export configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub db_type: DatabaseType,

    /// Database name (MySQL) written into setup scripts.
    pub db_name: String,

    /// SQLite database file name, relative to the output directory.
    pub sqlite_file: String,

    /// Optional prefix prepended to both table names.
    pub table_prefix: Option<String>,

    /// Prefix of generated SQL and CSV file names.
    pub sql_file_prefix: String,

    /// Write delimited files plus a setup script instead of inserting.
    pub store_csvs: bool,

    pub output_directory: PathBuf,

    pub aggregates: AggregateSettings,

    pub max_column_name_len: usize,

    pub insert_batch_size: usize,

    pub max_name_attempts: usize,

    /// Seed for the randomized name shortening; random when absent.
    pub name_seed: Option<u64>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            db_type: DatabaseType::MySql,
            db_name: "DefaultDB".to_string(),
            sqlite_file: "DefaultDB.db".to_string(),
            table_prefix: None,
            sql_file_prefix: "SQL_".to_string(),
            store_csvs: false,
            output_directory: PathBuf::from("."),
            aggregates: AggregateSettings::default(),
            max_column_name_len: DEFAULT_MAX_COLUMN_NAME_LEN,
            insert_batch_size: DEFAULT_INSERT_BATCH_SIZE,
            max_name_attempts: DEFAULT_MAX_NAME_ATTEMPTS,
            name_seed: None,
        }
    }
}

impl ExportConfig {
    /// Load a configuration file, picking the parser from the extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(ConfigError::UnknownExtension(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    /// Load and reject configurations that fail validation.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_path(path)?;
        config.ensure_valid()?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn validate(&self) -> ValidationResult {
        validate_config(self)
    }

    /// Validate, folding every problem into one error.
    pub fn ensure_valid(&self) -> Result<(), ConfigError> {
        let result = self.validate();
        if result.is_valid() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(result.errors))
        }
    }

    /// Table prefix, empty when unset.
    pub fn table_prefix(&self) -> &str {
        self.table_prefix.as_deref().unwrap_or("")
    }

    pub fn image_table(&self) -> String {
        format!("{}Per_Image", self.table_prefix())
    }

    pub fn object_table(&self) -> String {
        format!("{}Per_Object", self.table_prefix())
    }

    pub fn aggregate_kinds(&self) -> Vec<AggregateKind> {
        self.aggregates.kinds()
    }

    /// Base of the data file names for image numbers `first` through
    /// `last`, e.g. `SQL_1_4`.
    pub fn base_name(&self, first: u64, last: u64) -> String {
        format!("{}{}_{}", self.sql_file_prefix, first, last)
    }

    pub fn image_csv_name(&self, base_name: &str) -> String {
        format!("{}_image.CSV", base_name)
    }

    pub fn object_csv_name(&self, base_name: &str) -> String {
        format!("{}_object.CSV", base_name)
    }

    /// Name of the table-definition and bulk-load script.
    pub fn setup_file_name(&self) -> String {
        format!("{}_SETUP.SQL", self.sql_file_prefix)
    }

    /// Name of the statement script written by the SQL output format.
    pub fn export_script_name(&self) -> String {
        format!("{}_EXPORT.SQL", self.sql_file_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_is_default() {
        let config = ExportConfig::from_toml_str("").unwrap();
        assert_eq!(config, ExportConfig::default());
        assert_eq!(config.max_column_name_len, 64);
        assert_eq!(config.insert_batch_size, 25);
    }

    #[test]
    fn toml_overrides() {
        let config = ExportConfig::from_toml_str(
            r#"
            db_type = "sqlite"
            table_prefix = "Expt_"
            name_seed = 7

            [aggregates]
            median = true
            "#,
        )
        .unwrap();
        assert_eq!(config.db_type, DatabaseType::Sqlite);
        assert_eq!(config.image_table(), "Expt_Per_Image");
        assert_eq!(config.object_table(), "Expt_Per_Object");
        assert_eq!(config.name_seed, Some(7));
        assert_eq!(
            config.aggregate_kinds(),
            vec![AggregateKind::Mean, AggregateKind::Median]
        );
    }

    #[test]
    fn json_database_names() {
        let config = ExportConfig::from_json_str(r#"{"db_type": "mysql"}"#).unwrap();
        assert_eq!(config.db_type, DatabaseType::MySql);
        let config = ExportConfig::from_json_str(r#"{"db_type": "oracle"}"#).unwrap();
        assert!(!config.db_type.is_supported());
    }

    #[test]
    fn file_names() {
        let config = ExportConfig::default();
        let base = config.base_name(1, 4);
        assert_eq!(base, "SQL_1_4");
        assert_eq!(config.image_csv_name(&base), "SQL_1_4_image.CSV");
        assert_eq!(config.object_csv_name(&base), "SQL_1_4_object.CSV");
        assert_eq!(config.setup_file_name(), "SQL__SETUP.SQL");
    }

    #[test]
    fn aggregate_kinds_follow_column_order() {
        let settings = AggregateSettings {
            mean: true,
            median: true,
            std_dev: true,
        };
        assert_eq!(settings.kinds(), AggregateKind::ALL.to_vec());
        assert!(AggregateSettings::none().kinds().is_empty());
    }

    #[test]
    fn from_path_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("export.toml");
        let mut f = std::fs::File::create(&toml_path).unwrap();
        writeln!(f, "db_name = \"Screen42\"").unwrap();
        assert_eq!(ExportConfig::from_path(&toml_path).unwrap().db_name, "Screen42");

        let json_path = dir.path().join("export.json");
        std::fs::write(&json_path, r#"{"insert_batch_size": 10}"#).unwrap();
        assert_eq!(ExportConfig::from_path(&json_path).unwrap().insert_batch_size, 10);

        let yaml_path = dir.path().join("export.yaml");
        std::fs::write(&yaml_path, "db_name: x").unwrap();
        assert!(matches!(
            ExportConfig::from_path(&yaml_path),
            Err(ConfigError::UnknownExtension(_))
        ));
    }

    #[test]
    fn load_validated_rejects_bad_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "table_prefix = \"1bad\"").unwrap();
        let err = ExportConfig::load_validated(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let common: mx_common::Error = err.into();
        assert_eq!(common.code(), 11);
    }
}
