//! Exit codes for the geomix CLI.
//!
//! Exit code ranges:
//! - 0: success
//! - 10-19: user/input errors (fixable by changing arguments or files)
//! - 20-29: internal errors

use crate::config::ConfigError;
use gm_common::{Error, ErrorCategory};

/// Exit codes for geomix operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Ok = 0,

    // ========================================================================
    // User / Input Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Model file missing, unreadable as JSON, or semantically invalid
    ConfigError = 11,

    /// Model distributions inconsistent, or a query out of range
    ModelError = 12,

    /// Classifier taxonomies disagree, or a label is unknown
    TaxonomyError = 13,

    /// Malformed dataset record
    DatasetError = 14,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Ok
    }

    /// Codes 10-19.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Codes 20 and up.
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Ok => "OK",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::ModelError => "ERR_MODEL",
            ExitCode::TaxonomyError => "ERR_TAXONOMY",
            ExitCode::DatasetError => "ERR_DATASET",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err.category() {
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Model => ExitCode::ModelError,
            ErrorCategory::Taxonomy => ExitCode::TaxonomyError,
            ErrorCategory::Dataset => ExitCode::DatasetError,
            ErrorCategory::Io => ExitCode::IoError,
        }
    }
}

impl From<&ConfigError> for ExitCode {
    fn from(err: &ConfigError) -> Self {
        match err {
            ConfigError::IoError { .. } => ExitCode::IoError,
            _ => ExitCode::ConfigError,
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
