//! Measurement export configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the export configuration file
//! - Loading from TOML or JSON
//! - Semantic validation of names and bounds

pub mod export;
pub mod validate;

pub use export::{AggregateSettings, ConfigError, DatabaseType, ExportConfig};
pub use validate::{validate_config, ValidationError, ValidationResult};
