//! Class → topic → symbol generative mixture.
//!
//! The model is built from three fitted distributions:
//! - `P(c)`: class prior
//! - `P(z|c)`: topic mixture of each class
//! - `P(w|z)`: symbol emission of each topic
//!
//! and derives the rest once, at construction:
//! - `P(w|c) = Σ_z P(z|c)·P(w|z)`
//! - `P(w)   = Σ_c P(c)·P(w|c)`
//! - `P(z)   = Σ_c P(z|c)·P(c)`
//! - `P(z|w) = P(w|z)·P(z) / P(w)` (w depends on c only through z)
//! - `P(c|w) = P(c)·P(w|c) / P(w)`
//!
//! `P(c)`, `P(z|c)`, `P(w|z)`, `P(w|c)` and `P(w)` are checked to sum to one
//! along their axis before the model is handed out. A symbol with `P(w) = 0`
//! is allowed; its `P(z|w)` and `P(c|w)` entries are NaN. A model is immutable for its whole life.
//!
//! The symbol payload `T` is opaque here: only the count and order of symbols
//! matter to the engine.

use super::error::{DistributionAxis, MixtureError};
use super::stable::sums_to_one;
use serde::{Deserialize, Serialize};

/// Default tolerance for distribution sum checks.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// A fitted class/topic/symbol mixture with all derived tables cached.
#[derive(Debug, Clone)]
pub struct MixtureModel<T> {
    symbols: Vec<T>,
    /// Indexed `[topic][symbol]`.
    w_given_z: Vec<Vec<f64>>,
    /// Indexed `[class][topic]`.
    z_given_c: Vec<Vec<f64>>,
    class_prior: Vec<f64>,

    /// Indexed `[class][symbol]`.
    w_given_c: Vec<Vec<f64>>,
    w_marginal: Vec<f64>,
    z_marginal: Vec<f64>,
    /// Indexed `[symbol][topic]`.
    z_given_w: Vec<Vec<f64>>,
    /// Indexed `[symbol][class]`.
    c_given_w: Vec<Vec<f64>>,

    tolerance: f64,
}

/// Serializable overview of a built model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub symbols: usize,
    pub topics: usize,
    pub classes: usize,
    pub tolerance: f64,
    pub class_prior: Vec<f64>,
    pub topic_marginal: Vec<f64>,
    pub symbol_marginal: Vec<f64>,
}

impl<T> MixtureModel<T> {
    /// Build a model with [`DEFAULT_TOLERANCE`].
    ///
    /// # Arguments
    /// * `symbols` - symbol payloads, ordered so that ids match the columns of `w_given_z`
    /// * `w_given_z` - one row per topic, each a distribution over symbols
    /// * `z_given_c` - one row per class, each a distribution over topics
    /// * `class_prior` - distribution over classes
    pub fn new(
        symbols: Vec<T>,
        w_given_z: Vec<Vec<f64>>,
        z_given_c: Vec<Vec<f64>>,
        class_prior: Vec<f64>,
    ) -> Result<Self, MixtureError> {
        Self::with_tolerance(symbols, w_given_z, z_given_c, class_prior, DEFAULT_TOLERANCE)
    }

    /// Build a model, checking distribution sums against `tolerance`.
    pub fn with_tolerance(
        symbols: Vec<T>,
        w_given_z: Vec<Vec<f64>>,
        z_given_c: Vec<Vec<f64>>,
        class_prior: Vec<f64>,
        tolerance: f64,
    ) -> Result<Self, MixtureError> {
        let n_topics = w_given_z.len();
        let n_classes = class_prior.len();

        if n_classes == 0 {
            return Err(MixtureError::Empty {
                axis: DistributionAxis::ClassPrior,
            });
        }
        if n_topics == 0 {
            return Err(MixtureError::Empty {
                axis: DistributionAxis::SymbolGivenTopic,
            });
        }
        let n_symbols = w_given_z[0].len();
        if n_symbols == 0 {
            return Err(MixtureError::Empty {
                axis: DistributionAxis::Symbol,
            });
        }

        check_entries(&class_prior, DistributionAxis::ClassPrior, None)?;

        if z_given_c.len() != n_classes {
            return Err(MixtureError::DimensionMismatch {
                axis: DistributionAxis::TopicGivenClass,
                index: None,
                expected: n_classes,
                actual: z_given_c.len(),
            });
        }
        for (c, row) in z_given_c.iter().enumerate() {
            if row.len() != n_topics {
                return Err(MixtureError::DimensionMismatch {
                    axis: DistributionAxis::TopicGivenClass,
                    index: Some(c),
                    expected: n_topics,
                    actual: row.len(),
                });
            }
            check_entries(row, DistributionAxis::TopicGivenClass, Some(c))?;
        }

        for (z, row) in w_given_z.iter().enumerate() {
            if row.len() != n_symbols {
                return Err(MixtureError::DimensionMismatch {
                    axis: DistributionAxis::SymbolGivenTopic,
                    index: Some(z),
                    expected: n_symbols,
                    actual: row.len(),
                });
            }
            check_entries(row, DistributionAxis::SymbolGivenTopic, Some(z))?;
        }

        if symbols.len() != n_symbols {
            return Err(MixtureError::DimensionMismatch {
                axis: DistributionAxis::Symbol,
                index: None,
                expected: n_symbols,
                actual: symbols.len(),
            });
        }

        let w_given_c = compute_w_given_c(&w_given_z, &z_given_c);
        let w_marginal = compute_w_marginal(&w_given_c, &class_prior);
        let z_marginal = compute_z_marginal(&z_given_c, &class_prior);
        let z_given_w = compute_z_given_w(&w_given_z, &z_marginal, &w_marginal);
        let c_given_w = compute_c_given_w(&w_given_c, &class_prior, &w_marginal);

        let model = Self {
            symbols,
            w_given_z,
            z_given_c,
            class_prior,
            w_given_c,
            w_marginal,
            z_marginal,
            z_given_w,
            c_given_w,
            tolerance,
        };
        model.sanity_check()?;
        Ok(model)
    }

    /// Verify that the supplied families and the derived P(w|c), P(w) sum to one.
    fn sanity_check(&self) -> Result<(), MixtureError> {
        check_sum(&self.class_prior, DistributionAxis::ClassPrior, None, self.tolerance)?;
        for (c, row) in self.z_given_c.iter().enumerate() {
            check_sum(row, DistributionAxis::TopicGivenClass, Some(c), self.tolerance)?;
        }
        for (z, row) in self.w_given_z.iter().enumerate() {
            check_sum(row, DistributionAxis::SymbolGivenTopic, Some(z), self.tolerance)?;
        }
        for (c, row) in self.w_given_c.iter().enumerate() {
            check_sum(row, DistributionAxis::SymbolGivenClass, Some(c), self.tolerance)?;
        }
        check_sum(&self.w_marginal, DistributionAxis::SymbolMarginal, None, self.tolerance)?;
        // Posterior rows are not checked: a symbol no topic emits has P(w) = 0
        // and a NaN row, and such a model is still valid.
        Ok(())
    }

    /// Number of symbols |W|.
    pub fn number_of_symbols(&self) -> usize {
        self.w_marginal.len()
    }

    /// Number of latent topics |Z|.
    pub fn number_of_topics(&self) -> usize {
        self.w_given_z.len()
    }

    /// Number of classes |C|.
    pub fn number_of_classes(&self) -> usize {
        self.class_prior.len()
    }

    /// Tolerance the sums were checked against.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Symbol payloads in id order.
    pub fn symbols(&self) -> &[T] {
        &self.symbols
    }

    /// P(w|z).
    pub fn p_w_given_z(&self, word: usize, topic: usize) -> Result<f64, MixtureError> {
        self.check_topic(topic)?;
        self.check_symbol(word)?;
        Ok(self.w_given_z[topic][word])
    }

    /// P(z|c).
    pub fn p_z_given_c(&self, topic: usize, class: usize) -> Result<f64, MixtureError> {
        self.check_class(class)?;
        self.check_topic(topic)?;
        Ok(self.z_given_c[class][topic])
    }

    /// P(c).
    pub fn p_c(&self, class: usize) -> Result<f64, MixtureError> {
        self.check_class(class)?;
        Ok(self.class_prior[class])
    }

    /// P(z), the topic marginal.
    pub fn p_z(&self, topic: usize) -> Result<f64, MixtureError> {
        self.check_topic(topic)?;
        Ok(self.z_marginal[topic])
    }

    /// P(z|w). NaN when `P(w) = 0`.
    pub fn p_z_given_w(&self, topic: usize, word: usize) -> Result<f64, MixtureError> {
        self.check_symbol(word)?;
        self.check_topic(topic)?;
        Ok(self.z_given_w[word][topic])
    }

    /// P(c|w). NaN when `P(w) = 0`.
    pub fn p_c_given_w(&self, class: usize, word: usize) -> Result<f64, MixtureError> {
        self.check_symbol(word)?;
        self.check_class(class)?;
        Ok(self.c_given_w[word][class])
    }

    /// P(w).
    pub fn p_w(&self, word: usize) -> Result<f64, MixtureError> {
        self.check_symbol(word)?;
        Ok(self.w_marginal[word])
    }

    /// P(w|c), served from the cached `|C|×|W|` table.
    pub fn p_w_given_c(&self, word: usize, class: usize) -> Result<f64, MixtureError> {
        self.check_class(class)?;
        self.check_symbol(word)?;
        Ok(self.w_given_c[class][word])
    }

    /// P(w|z) rows, indexed `[topic][symbol]`.
    pub fn w_given_z_table(&self) -> &[Vec<f64>] {
        &self.w_given_z
    }

    /// P(z|c) rows, indexed `[class][topic]`.
    pub fn z_given_c_table(&self) -> &[Vec<f64>] {
        &self.z_given_c
    }

    /// P(c) vector.
    pub fn class_prior(&self) -> &[f64] {
        &self.class_prior
    }

    /// P(w|c) rows, indexed `[class][symbol]`.
    pub fn w_given_c_table(&self) -> &[Vec<f64>] {
        &self.w_given_c
    }

    /// P(w) vector.
    pub fn symbol_marginal(&self) -> &[f64] {
        &self.w_marginal
    }

    /// P(z) vector.
    pub fn topic_marginal(&self) -> &[f64] {
        &self.z_marginal
    }

    /// P(z|w) rows, indexed `[symbol][topic]`.
    pub fn z_given_w_table(&self) -> &[Vec<f64>] {
        &self.z_given_w
    }

    /// P(c|w) rows, indexed `[symbol][class]`.
    pub fn c_given_w_table(&self) -> &[Vec<f64>] {
        &self.c_given_w
    }

    /// Dimensions and marginals, for reports.
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            symbols: self.number_of_symbols(),
            topics: self.number_of_topics(),
            classes: self.number_of_classes(),
            tolerance: self.tolerance,
            class_prior: self.class_prior.clone(),
            topic_marginal: self.z_marginal.clone(),
            symbol_marginal: self.w_marginal.clone(),
        }
    }

    fn check_symbol(&self, word: usize) -> Result<(), MixtureError> {
        check_index(word, self.number_of_symbols(), DistributionAxis::Symbol)
    }

    fn check_topic(&self, topic: usize) -> Result<(), MixtureError> {
        check_index(topic, self.number_of_topics(), DistributionAxis::Topic)
    }

    fn check_class(&self, class: usize) -> Result<(), MixtureError> {
        check_index(class, self.number_of_classes(), DistributionAxis::Class)
    }
}

fn check_index(index: usize, len: usize, axis: DistributionAxis) -> Result<(), MixtureError> {
    if index >= len {
        return Err(MixtureError::IndexOutOfRange { axis, index, len });
    }
    Ok(())
}

fn check_entries(
    values: &[f64],
    axis: DistributionAxis,
    index: Option<usize>,
) -> Result<(), MixtureError> {
    for (position, &value) in values.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(MixtureError::InvalidProbability {
                axis,
                index,
                position,
                value,
            });
        }
    }
    Ok(())
}

fn check_sum(
    values: &[f64],
    axis: DistributionAxis,
    index: Option<usize>,
    tolerance: f64,
) -> Result<(), MixtureError> {
    let sum: f64 = values.iter().sum();
    if !sums_to_one(sum, tolerance) {
        return Err(MixtureError::DistributionConsistency { axis, index, sum });
    }
    Ok(())
}

fn compute_w_given_c(w_given_z: &[Vec<f64>], z_given_c: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n_symbols = w_given_z[0].len();
    z_given_c
        .iter()
        .map(|topics| {
            let mut row = vec![0.0; n_symbols];
            for (z, &pz) in topics.iter().enumerate() {
                for (w, slot) in row.iter_mut().enumerate() {
                    *slot += pz * w_given_z[z][w];
                }
            }
            row
        })
        .collect()
}

fn compute_w_marginal(w_given_c: &[Vec<f64>], class_prior: &[f64]) -> Vec<f64> {
    let n_symbols = w_given_c[0].len();
    let mut marginal = vec![0.0; n_symbols];
    for (row, &pc) in w_given_c.iter().zip(class_prior) {
        for (slot, &pw) in marginal.iter_mut().zip(row) {
            *slot += pc * pw;
        }
    }
    marginal
}

fn compute_z_marginal(z_given_c: &[Vec<f64>], class_prior: &[f64]) -> Vec<f64> {
    let n_topics = z_given_c[0].len();
    let mut marginal = vec![0.0; n_topics];
    for (row, &pc) in z_given_c.iter().zip(class_prior) {
        for (slot, &pz) in marginal.iter_mut().zip(row) {
            *slot += pc * pz;
        }
    }
    marginal
}

// A zero marginal yields a NaN row (0/0).
fn compute_z_given_w(
    w_given_z: &[Vec<f64>],
    z_marginal: &[f64],
    w_marginal: &[f64],
) -> Vec<Vec<f64>> {
    w_marginal
        .iter()
        .enumerate()
        .map(|(w, &pw)| {
            z_marginal
                .iter()
                .enumerate()
                .map(|(z, &pz)| w_given_z[z][w] * pz / pw)
                .collect()
        })
        .collect()
}

fn compute_c_given_w(
    w_given_c: &[Vec<f64>],
    class_prior: &[f64],
    w_marginal: &[f64],
) -> Vec<Vec<f64>> {
    w_marginal
        .iter()
        .enumerate()
        .map(|(w, &pw)| {
            class_prior
                .iter()
                .enumerate()
                .map(|(c, &pc)| pc * w_given_c[c][w] / pw)
                .collect()
        })
        .collect()
}
