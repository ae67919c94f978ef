//! Errors raised while building or querying a mixture model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Distribution family (or index space) an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionAxis {
    /// Class prior P(c).
    ClassPrior,
    /// Topic mixture per class P(z|c).
    TopicGivenClass,
    /// Symbol emission per topic P(w|z).
    SymbolGivenTopic,
    /// Derived symbol likelihood per class P(w|c).
    SymbolGivenClass,
    /// Derived symbol marginal P(w).
    SymbolMarginal,
    /// The symbol index space W.
    Symbol,
    /// The topic index space Z.
    Topic,
    /// The class index space C.
    Class,
}

impl std::fmt::Display for DistributionAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DistributionAxis::ClassPrior => write!(f, "P(c)"),
            DistributionAxis::TopicGivenClass => write!(f, "P(z|c)"),
            DistributionAxis::SymbolGivenTopic => write!(f, "P(w|z)"),
            DistributionAxis::SymbolGivenClass => write!(f, "P(w|c)"),
            DistributionAxis::SymbolMarginal => write!(f, "P(w)"),
            DistributionAxis::Symbol => write!(f, "symbol"),
            DistributionAxis::Topic => write!(f, "topic"),
            DistributionAxis::Class => write!(f, "class"),
        }
    }
}

/// Errors raised by [`crate::MixtureModel`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MixtureError {
    /// A supplied or derived distribution does not sum to one.
    ///
    /// `index` is the conditioning id (class or topic) of the failing
    /// row, or None for unconditional vectors.
    #[error("distribution {axis}{} sums to {sum}, expected 1", fmt_index(.index))]
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

    #[error("{axis}{} has length {actual}, expected {expected}", fmt_index(.index))]
    DimensionMismatch {
        axis: DistributionAxis,
        index: Option<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("{axis}{} entry {position} is not a probability: {value}", fmt_index(.index))]
    InvalidProbability {
        axis: DistributionAxis,
        index: Option<usize>,
        position: usize,
        value: f64,
    },

    #[error("{axis} is empty")]
    Empty { axis: DistributionAxis },
}

impl MixtureError {
    /// The axis the error was raised for.
    pub fn axis(&self) -> DistributionAxis {
        match self {
            MixtureError::DistributionConsistency { axis, .. }
            | MixtureError::IndexOutOfRange { axis, .. }
            | MixtureError::DimensionMismatch { axis, .. }
            | MixtureError::InvalidProbability { axis, .. }
            | MixtureError::Empty { axis } => *axis,
        }
    }
}

fn fmt_index(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!("[{}]", i),
        None => String::new(),
    }
}
