//! geomix core library
//!
//! - Classifiers over a class → topic → symbol mixture model
//! - Labeled dataset streaming
//! - Side-by-side evaluation of classifiers sharing one taxonomy
//! - Model loading, logging and exit codes for the CLI
//!
//! The binary entry point is in `main.rs`.

pub mod classify;
pub mod config;
pub mod dataset;
pub mod evaluation;
pub mod exit_codes;
pub mod logging;

pub use classify::{Classifier, MixtureClassifier, PriorClassifier};
pub use dataset::{Record, RecordSource};
pub use evaluation::{EvaluationManager, EvaluationSummary};
