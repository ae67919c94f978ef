//! Classifiers: strategies that map a person's observations to a class.
//!
//! Every strategy implements [`Classifier`], so the evaluation manager can
//! drive them uniformly. Strategies share no state, only the contract.

pub mod mixture;
pub mod prior;
pub mod resolver;

pub use mixture::{MixtureClassifier, Prediction};
pub use prior::PriorClassifier;
pub use resolver::{
    BoundingBox, BoundingBoxResolver, NameResolver, Region, RegionResolver, ResolverKind,
    SymbolResolver,
};

use gm_common::Result;
use std::path::Path;

/// Capability set shared by every classification strategy.
pub trait Classifier {
    /// Predict the class id of the person behind `observations`.
    fn predict(&mut self, observations: &[String]) -> Result<usize>;

    /// Number of classes |C|.
    fn number_of_classes(&self) -> usize;

    /// Class labels in class-id order.
    fn class_labels(&self) -> &[String];

    /// Identifying name, used in reports.
    fn label(&self) -> &str;

    /// Fit the classifier on a dataset file.
    ///
    /// Unreadable input is an I/O error.
    fn train(&mut self, dataset: &Path) -> Result<()>;

    /// Average log-likelihood per sample over every prediction made so far.
    ///
    /// NaN before the first sample.
    fn likelihood(&self) -> f64;

    /// Samples counted into [`Classifier::likelihood`].
    fn samples(&self) -> u64;

    /// Forget accumulated likelihood statistics.
    fn reset_statistics(&mut self);
}
