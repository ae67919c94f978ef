//! Model file validation errors and semantic validation.
//!
//! Probability sums are not checked here; the mixture engine owns that check
//! and reports the failing axis itself.

use thiserror::Error;

use crate::model::ModelFile;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Model file validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

/// Validate a model file semantically.
pub fn validate_model(model: &ModelFile) -> ValidationResult<()> {
    if model.schema_version != crate::MODEL_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::MODEL_SCHEMA_VERSION.to_string(),
            actual: model.schema_version.clone(),
        });
    }

    validate_labels(&model.class_labels)?;

    if model.class_labels.len() != model.p_c.len() {
        return Err(ValidationError::SemanticError(format!(
            "class_labels has {} entries but p_c has {}",
            model.class_labels.len(),
            model.p_c.len()
        )));
    }

    validate_symbols(model)?;

    let tolerance = model.tolerance();
    if !(tolerance > 0.0 && tolerance <= 0.1) {
        return Err(ValidationError::InvalidValue {
            field: "tolerance".to_string(),
            message: format!("Must be in (0, 0.1], got {}", tolerance),
        });
    }

    Ok(())
}

fn validate_labels(labels: &[String]) -> ValidationResult<()> {
    if labels.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "class_labels".to_string(),
            message: "Must contain at least one label".to_string(),
        });
    }
    for (i, label) in labels.iter().enumerate() {
        if label.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("class_labels[{}]", i),
                message: "Must not be blank".to_string(),
            });
        }
        if labels[..i].contains(label) {
            return Err(ValidationError::InvalidValue {
                field: format!("class_labels[{}]", i),
                message: format!("Duplicate label {:?}", label),
            });
        }
    }
    Ok(())
}

fn validate_symbols(model: &ModelFile) -> ValidationResult<()> {
    let symbols = &model.symbols;
    if symbols.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "symbols".to_string(),
            message: "Must contain at least one symbol".to_string(),
        });
    }
    for (i, symbol) in symbols.iter().enumerate() {
        if symbols[..i].iter().any(|s| s.name == symbol.name) {
            return Err(ValidationError::InvalidValue {
                field: format!("symbols[{}].name", i),
                message: format!("Duplicate symbol {:?}", symbol.name),
            });
        }
        if let Some([min_lat, min_lon, max_lat, max_lon]) = symbol.bbox {
            if !(min_lat <= max_lat && min_lon <= max_lon) {
                return Err(ValidationError::InvalidValue {
                    field: format!("symbols[{}].bbox", i),
                    message: "Minimum corner must not exceed maximum corner".to_string(),
                });
            }
        }
    }
    Ok(())
}
