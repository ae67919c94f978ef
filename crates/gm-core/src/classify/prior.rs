//! Baseline classifier that ignores observations and always predicts the
//! most probable class under its prior.
//!
//! Training counts ground-truth labels in a dataset (add-one smoothed), so the
//! baseline answers "how well does guessing the majority class do?".

use super::Classifier;
use crate::dataset::{open_dataset, RecordSource};
use gm_common::{Error, Result, Taxonomy};
use gm_math::{argmax_first, sums_to_one};
use std::path::Path;
use tracing::{debug, info};

/// Default report label.
pub const PRIOR_LABEL: &str = "prior baseline";

#[derive(Debug, Clone)]
pub struct PriorClassifier {
    taxonomy: Taxonomy,
    prior: Vec<f64>,
    label: String,
    likelihood: f64,
    samples: u64,
}

impl PriorClassifier {
    /// Uniform prior over the taxonomy.
    pub fn uniform(taxonomy: Taxonomy) -> Self {
        let n = taxonomy.len();
        Self {
            taxonomy,
            prior: vec![1.0 / n as f64; n],
            label: PRIOR_LABEL.to_string(),
            likelihood: 0.0,
            samples: 0,
        }
    }

    /// Explicit prior; one non-negative entry per class, summing to 1.
    pub fn with_prior(taxonomy: Taxonomy, prior: Vec<f64>) -> Result<Self> {
        if prior.len() != taxonomy.len() {
            return Err(Error::InvalidModel(format!(
                "prior has {} entries for {} classes",
                prior.len(),
                taxonomy.len()
            )));
        }
        if prior.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(Error::InvalidModel("prior entries must be finite and >= 0".to_string()));
        }
        let sum: f64 = prior.iter().sum();
        if !sums_to_one(sum, gm_math::DEFAULT_TOLERANCE) {
            return Err(Error::DistributionConsistency {
                axis: gm_math::DistributionAxis::ClassPrior,
                index: None,
                sum,
            });
        }
        let mut clf = Self::uniform(taxonomy);
        clf.prior = prior;
        Ok(clf)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn prior(&self) -> &[f64] {
        &self.prior
    }

    /// Re-estimate the prior from the labels of `records`.
    pub fn fit(&mut self, records: &mut dyn RecordSource) -> Result<u64> {
        let mut counts = vec![1.0f64; self.taxonomy.len()];
        let mut seen = 0u64;
        while let Some(record) = records.next_record()? {
            let class = self.taxonomy.index_of(&record.label)?;
            counts[class] += 1.0;
            seen += 1;
        }
        let total: f64 = counts.iter().sum();
        self.prior = counts.into_iter().map(|c| c / total).collect();
        Ok(seen)
    }
}

impl Classifier for PriorClassifier {
    fn predict(&mut self, _observations: &[String]) -> Result<usize> {
        let class = argmax_first(&self.prior).unwrap_or(0);
        self.likelihood += self.prior[class].ln();
        self.samples += 1;
        Ok(class)
    }

    fn number_of_classes(&self) -> usize {
        self.taxonomy.len()
    }

    fn class_labels(&self) -> &[String] {
        self.taxonomy.labels()
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn train(&mut self, dataset: &Path) -> Result<()> {
        let mut reader = open_dataset(dataset)?;
        let seen = self.fit(&mut reader)?;
        info!(
            label = %self.label,
            records = seen,
            dataset = %dataset.display(),
            "prior fitted"
        );
        debug!(prior = ?self.prior, "fitted prior");
        Ok(())
    }

    fn likelihood(&self) -> f64 {
        self.likelihood / self.samples as f64
    }

    fn samples(&self) -> u64 {
        self.samples
    }

    fn reset_statistics(&mut self) {
        self.likelihood = 0.0;
        self.samples = 0;
    }
}
