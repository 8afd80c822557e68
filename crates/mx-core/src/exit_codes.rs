//! Exit codes for the mx-export CLI.
//!
//! Exit codes communicate the outcome of an export without requiring output
//! parsing. They are stable across releases.

use mx_common::Error;

/// Exit codes for mx-export operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Export completed with no diagnostics
    Clean = 0,

    /// Export completed, but count mismatches or missing values were recovered
    CompletedWithWarnings = 1,

    /// Configuration error or unsupported backend
    ConfigError = 10,

    /// Column naming or schema derivation error
    SchemaError = 11,

    /// Malformed measurement input or row assembly error
    InputError = 12,

    /// I/O or sink write error
    IoError = 13,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates the export was written.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::CompletedWithWarnings)
    }

    /// Check if this exit code indicates an error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Exit code for a failed run, chosen by the error's code group.
    pub fn for_error(err: &Error) -> Self {
        match err.code() {
            10..=19 => ExitCode::ConfigError,
            20..=29 => ExitCode::SchemaError,
            30..=39 => ExitCode::InputError,
            40..=49 | 60 => ExitCode::IoError,
            61 => ExitCode::InputError,
            _ => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}
