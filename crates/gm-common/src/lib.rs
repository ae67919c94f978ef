//! geomix common types and errors.
//!
//! This crate provides foundational types shared across the geomix crates:
//! - The unified error type with stable codes
//! - The class taxonomy shared by every registered classifier
//! - Report output formats

pub mod error;
pub mod output;
pub mod taxonomy;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use output::OutputFormat;
pub use taxonomy::Taxonomy;
