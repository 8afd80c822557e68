//! Error types for measurement export.

use thiserror::Error;

/// Result type alias for measurement export operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for measurement export.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid setting {field}: {reason}")]
    InvalidSetting { field: String, reason: String },

    #[error("unsupported database backend: {0}")]
    UnsupportedBackend(String),

    // Naming and schema errors (20-29)
    #[error("could not find a unique column name for {feature} after {attempts} attempts")]
    NameCollision { feature: String, attempts: usize },

    #[error("feature {0} was never registered for column naming")]
    UnknownFeature(String),

    #[error("schema error: {0}")]
    Schema(String),

    // Measurement and row errors (30-39)
    #[error("{table} row has {actual} cells, expected {expected}")]
    RowWidth {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("image set index {index} out of range (have {count})")]
    ImageSetOutOfRange { index: usize, count: usize },

    #[error("{feature} reports {count} objects in image set #{image_number} (limit {limit})")]
    ObjectCountOutOfRange {
        image_number: u64,
        feature: String,
        count: f64,
        limit: usize,
    },

    #[error("image set {index} after start number {start} has no valid image number")]
    ImageNumberOverflow { start: u64, index: usize },

    // Sink errors (40-49)
    #[error("sink write failed: {0}")]
    Sink(String),

    #[error("statement execution failed: {0}")]
    Statement(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    /// Used for detailed error reporting in CLI output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidSetting { .. } => 11,
            Error::UnsupportedBackend(_) => 12,
            Error::NameCollision { .. } => 20,
            Error::UnknownFeature(_) => 21,
            Error::Schema(_) => 22,
            Error::RowWidth { .. } => 30,
            Error::ImageSetOutOfRange { .. } => 31,
            Error::ObjectCountOutOfRange { .. } => 32,
            Error::ImageNumberOverflow { .. } => 33,
            Error::Sink(_) => 40,
            Error::Statement(_) => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Whether the error was raised before any row could be written.
    pub fn is_setup_error(&self) -> bool {
        self.code() < 30
    }
}
