//! geomix model file loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for model.json (the fitted mixture parameters)
//! - Model path resolution (CLI → env → XDG → system → none)
//! - Shape and semantic validation

pub mod model;
pub mod resolve;
pub mod validate;

pub use model::{ModelFile, SymbolSpec};
pub use resolve::{resolve_model_path, ConfigSource, ModelPath};
pub use validate::{validate_model, ValidationError, ValidationResult};

/// Schema version for model files.
pub const MODEL_SCHEMA_VERSION: &str = "1.0.0";

/// Tolerance used for distribution sums when the model file names none.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;
