//! Error types for geomix.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 31,
//!   "category": "taxonomy",
//!   "message": "unknown category label: retired",
//!   "recoverable": false,
//!   "context": { "label": "retired" }
//! }
//! ```

use gm_math::{DistributionAxis, MixtureError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for geomix operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Model file and settings errors.
    Config,
    /// Mixture construction and query errors.
    Model,
    /// Class taxonomy errors (registration, ground-truth labels).
    Taxonomy,
    /// Dataset record errors.
    Dataset,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Model => write!(f, "model"),
            ErrorCategory::Taxonomy => write!(f, "taxonomy"),
            ErrorCategory::Dataset => write!(f, "dataset"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for geomix.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid model file: {0}")]
    InvalidModel(String),

    // Model errors (20-29)
    #[error("distribution {axis}{} sums to {sum}, expected 1", index_suffix(.index))]
    DistributionConsistency {
        axis: DistributionAxis,
        index: Option<usize>,
        sum: f64,
    },

    #[error("{axis} id {index} out of range (size {len})")]
    IndexOutOfRange {
        axis: DistributionAxis,
        index: usize,
        len: usize,
    },

    #[error("malformed mixture parameters: {0}")]
    MalformedModel(MixtureError),

    // Taxonomy errors (30-39)
    #[error("taxonomy mismatch: expected {expected:?}, got {actual:?}")]
    TaxonomyMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("unknown category label: {label}")]
    UnknownCategory { label: String },

    #[error("classifier reports {classes} classes but carries {labels} class labels")]
    ClassCountMismatch { classes: usize, labels: usize },

    #[error("classifier label {label:?} collides with registered {existing:?} (both report as {stem:?})")]
    DuplicateLabel {
        label: String,
        existing: String,
        stem: String,
    },

    // Dataset errors (40-49)
    #[error("malformed record at line {line}: {message}")]
    Parse { line: usize, message: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn index_suffix(index: &Option<usize>) -> String {
    index.map(|i| format!("[{}]", i)).unwrap_or_default()
}

impl From<MixtureError> for Error {
    fn from(err: MixtureError) -> Self {
        match err {
            MixtureError::DistributionConsistency { axis, index, sum } => {
                Error::DistributionConsistency { axis, index, sum }
            }
            MixtureError::IndexOutOfRange { axis, index, len } => {
                Error::IndexOutOfRange { axis, index, len }
            }
            other => Error::MalformedModel(other),
        }
    }
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Model errors
    /// - 30-39: Taxonomy errors
    /// - 40-49: Dataset errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidModel(_) => 11,
            Error::DistributionConsistency { .. } => 20,
            Error::IndexOutOfRange { .. } => 21,
            Error::MalformedModel(_) => 22,
            Error::TaxonomyMismatch { .. } => 30,
            Error::UnknownCategory { .. } => 31,
            Error::ClassCountMismatch { .. } => 32,
            Error::DuplicateLabel { .. } => 33,
            Error::Parse { .. } => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidModel(_) => ErrorCategory::Config,
            Error::DistributionConsistency { .. }
            | Error::IndexOutOfRange { .. }
            | Error::MalformedModel(_) => ErrorCategory::Model,
            Error::TaxonomyMismatch { .. }
            | Error::UnknownCategory { .. }
            | Error::ClassCountMismatch { .. }
            | Error::DuplicateLabel { .. } => ErrorCategory::Taxonomy,
            Error::Parse { .. } => ErrorCategory::Dataset,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether the caller can reasonably continue after this error.
    ///
    /// A failed registration or an out-of-range query leaves everything else
    /// intact. A broken model or a mislabeled record ends the current run.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::InvalidModel(_) => false,
            Error::DistributionConsistency { .. } => false,
            Error::IndexOutOfRange { .. } => true,
            Error::MalformedModel(_) => false,
            Error::TaxonomyMismatch { .. } => true,
            Error::UnknownCategory { .. } => false,
            Error::ClassCountMismatch { .. } => true,
            Error::DuplicateLabel { .. } => true,
            Error::Parse { .. } => false,
            Error::Io(_) => false,
            Error::Json(_) => false,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Pass --model <file> or set GEOMIX_MODEL to a readable model.json."
            }
            Error::InvalidModel(_) => {
                "Run 'geomix check --model <file>' and fix the reported field."
            }
            Error::DistributionConsistency { .. } => {
                "Re-export the fitted parameters; every probability row must sum to 1."
            }
            Error::IndexOutOfRange { .. } => {
                "Use ids below the model's symbol, topic and class counts."
            }
            Error::MalformedModel(_) => {
                "Check that every P(w|z) row has one entry per symbol and every P(z|c) row one per topic."
            }
            Error::TaxonomyMismatch { .. } => {
                "Register only classifiers built with the same ordered class labels."
            }
            Error::UnknownCategory { .. } => {
                "Fix the dataset label or add the class to the model's class_labels."
            }
            Error::ClassCountMismatch { .. } => {
                "Build the classifier with exactly one label per class."
            }
            Error::DuplicateLabel { .. } => {
                "Give each registered classifier a distinct label with with_label()."
            }
            Error::Parse { .. } => {
                "Each dataset line must be a JSON object with 'label' and 'observations'."
            }
            Error::Io(_) => "Check that the file exists and is readable.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq . <file>'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidModel(_) => "Invalid Model File",
            Error::DistributionConsistency { .. } => "Inconsistent Distribution",
            Error::IndexOutOfRange { .. } => "Index Out Of Range",
            Error::MalformedModel(_) => "Malformed Model",
            Error::TaxonomyMismatch { .. } => "Taxonomy Mismatch",
            Error::UnknownCategory { .. } => "Unknown Category",
            Error::ClassCountMismatch { .. } => "Class Count Mismatch",
            Error::DuplicateLabel { .. } => "Duplicate Classifier Label",
            Error::Parse { .. } => "Dataset Parse Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (axis, id, label).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::DistributionConsistency { axis, index, sum } => {
                context.insert("axis".to_string(), serde_json::json!(axis));
                context.insert("index".to_string(), serde_json::json!(index));
                context.insert("sum".to_string(), serde_json::json!(sum));
            }
            Error::IndexOutOfRange { axis, index, len } => {
                context.insert("axis".to_string(), serde_json::json!(axis));
                context.insert("index".to_string(), serde_json::json!(index));
                context.insert("len".to_string(), serde_json::json!(len));
            }
            Error::UnknownCategory { label } => {
                context.insert("label".to_string(), serde_json::json!(label));
            }
            Error::ClassCountMismatch { classes, labels } => {
                context.insert("classes".to_string(), serde_json::json!(classes));
                context.insert("labels".to_string(), serde_json::json!(labels));
            }
            Error::DuplicateLabel { label, existing, .. } => {
                context.insert("label".to_string(), serde_json::json!(label));
                context.insert("existing".to_string(), serde_json::json!(existing));
            }
            Error::Parse { line, .. } => {
                context.insert("line".to_string(), serde_json::json!(line));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}
