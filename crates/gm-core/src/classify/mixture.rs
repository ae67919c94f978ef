//! Naive-Bayes decision over a class/topic/symbol mixture.
//!
//! For observations resolving to symbols `w1..wn`:
//!
//! ```text
//! score(c) = ln P(c) + Σ_i ln P(wi|c)
//! ```
//!
//! Scores stay in log space; a product of many small P(w|c) would underflow
//! to zero. The predicted class is the first maximum. The running likelihood
//! adds `Σ_i ln P(wi|predicted)` per call, so [`Classifier::likelihood`] is an
//! average per resolved observation over the classifier's lifetime.

use super::resolver::SymbolResolver;
use super::Classifier;
use gm_common::{Error, Result};
use gm_math::{argmax_first, normalize_log_probs, safe_ln, DistributionAxis, MixtureModel};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

/// Default report label.
pub const MIXTURE_LABEL: &str = "mixture predictor";

/// Outcome of scoring one observation sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Winning class id.
    pub class: usize,
    /// Unnormalized log scores per class.
    pub log_scores: Vec<f64>,
    /// Normalized posterior P(c | observations).
    pub posterior: Vec<f64>,
    /// Observations that resolved to a symbol.
    pub resolved: usize,
    /// Σ ln P(w|class) over resolved observations.
    pub log_likelihood: f64,
}

/// Mixture-model classifier.
pub struct MixtureClassifier<T, R> {
    model: Arc<MixtureModel<T>>,
    resolver: R,
    class_labels: Vec<String>,
    label: String,
    log_prior: Vec<f64>,
    /// Indexed `[class][symbol]`.
    log_w_given_c: Vec<Vec<f64>>,
    likelihood: f64,
    samples: u64,
}

impl<T, R: SymbolResolver<T>> MixtureClassifier<T, R> {
    /// Wrap a fitted model. `class_labels` must have one entry per model class.
    pub fn new(model: Arc<MixtureModel<T>>, class_labels: Vec<String>, resolver: R) -> Result<Self> {
        if class_labels.len() != model.number_of_classes() {
            return Err(Error::InvalidModel(format!(
                "{} class labels for a model with {} classes",
                class_labels.len(),
                model.number_of_classes()
            )));
        }

        let log_prior = model.class_prior().iter().map(|&p| safe_ln(p)).collect();
        let log_w_given_c = model
            .w_given_c_table()
            .iter()
            .map(|row| row.iter().map(|&p| safe_ln(p)).collect())
            .collect();

        debug!(
            classes = model.number_of_classes(),
            symbols = model.number_of_symbols(),
            "mixture classifier ready"
        );

        Ok(Self {
            model,
            resolver,
            class_labels,
            label: MIXTURE_LABEL.to_string(),
            log_prior,
            log_w_given_c,
            likelihood: 0.0,
            samples: 0,
        })
    }

    /// Override the report label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// The wrapped model.
    pub fn model(&self) -> &Arc<MixtureModel<T>> {
        &self.model
    }

    /// Cumulative log-likelihood (not averaged).
    pub fn total_log_likelihood(&self) -> f64 {
        self.likelihood
    }

    /// Score observations without touching the running statistics.
    pub fn score(&self, observations: &[String]) -> Result<Prediction> {
        let resolved = self.resolve_all(observations)?;

        let mut log_scores = self.log_prior.clone();
        for &w in &resolved {
            for (c, score) in log_scores.iter_mut().enumerate() {
                *score += self.log_w_given_c[c][w];
            }
        }

        let class = argmax_first(&log_scores).unwrap_or(0);

        // Second pass: likelihood under the winning class only.
        let log_likelihood: f64 = resolved
            .iter()
            .map(|&w| self.log_w_given_c[class][w])
            .sum();

        let posterior = normalize_log_probs(&log_scores)
            .into_iter()
            .map(f64::exp)
            .collect();

        Ok(Prediction {
            class,
            log_scores,
            posterior,
            resolved: resolved.len(),
            log_likelihood,
        })
    }

    fn resolve_all(&self, observations: &[String]) -> Result<Vec<usize>> {
        let symbols = self.model.symbols();
        let mut resolved = Vec::with_capacity(observations.len());
        for raw in observations {
            match self.resolver.resolve(symbols, raw) {
                Some(w) if w < symbols.len() => resolved.push(w),
                Some(w) => {
                    return Err(Error::IndexOutOfRange {
                        axis: DistributionAxis::Symbol,
                        index: w,
                        len: symbols.len(),
                    })
                }
                None => trace!(observation = %raw, "observation matches no symbol"),
            }
        }
        Ok(resolved)
    }
}

impl<T, R: SymbolResolver<T>> Classifier for MixtureClassifier<T, R> {
    fn predict(&mut self, observations: &[String]) -> Result<usize> {
        let prediction = self.score(observations)?;
        self.samples += prediction.resolved as u64;
        self.likelihood += prediction.log_likelihood;
        Ok(prediction.class)
    }

    fn number_of_classes(&self) -> usize {
        self.model.number_of_classes()
    }

    fn class_labels(&self) -> &[String] {
        &self.class_labels
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn train(&mut self, dataset: &Path) -> Result<()> {
        // The model arrives fitted.
        debug!(dataset = %dataset.display(), label = %self.label, "training skipped");
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::NameResolver;

    fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    fn obs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn labels() -> Vec<String> {
        vec!["c0".to_string(), "c1".to_string()]
    }

    fn tied_model() -> Arc<MixtureModel<&'static str>> {
        Arc::new(
            MixtureModel::new(
                vec!["w0", "w1"],
                vec![vec![0.7, 0.3]],
                vec![vec![1.0], vec![1.0]],
                vec![0.5, 0.5],
            )
            .unwrap(),
        )
    }

    fn separating_model() -> Arc<MixtureModel<&'static str>> {
        Arc::new(
            MixtureModel::new(
                vec!["home", "campus", "office"],
                vec![vec![0.2, 0.7, 0.1], vec![0.3, 0.05, 0.65]],
                vec![vec![0.9, 0.1], vec![0.1, 0.9]],
                vec![0.5, 0.5],
            )
            .unwrap(),
        )
    }

    #[test]
    fn tie_goes_to_lowest_class_and_likelihood_accumulates() {
        let mut clf = MixtureClassifier::new(tied_model(), labels(), NameResolver).unwrap();
        let predicted = clf.predict(&obs(&["w0", "w0", "w1"])).unwrap();
        assert_eq!(predicted, 0);
        assert_eq!(clf.samples(), 3);

        let expected = 0.7f64.ln() + 0.7f64.ln() + 0.3f64.ln();
        assert!(approx_eq(clf.total_log_likelihood(), expected, 1e-12));
        assert!(approx_eq(clf.likelihood(), expected / 3.0, 1e-12));
    }

    #[test]
    fn separating_model_picks_expected_class() {
        let mut clf = MixtureClassifier::new(separating_model(), labels(), NameResolver).unwrap();
        assert_eq!(clf.predict(&obs(&["campus", "campus", "home"])).unwrap(), 0);
        assert_eq!(clf.predict(&obs(&["office", "office"])).unwrap(), 1);
    }

    #[test]
    fn unresolvable_observations_are_ignored() {
        let model = separating_model();
        let mut with_noise =
            MixtureClassifier::new(model.clone(), labels(), NameResolver).unwrap();
        let mut clean = MixtureClassifier::new(model, labels(), NameResolver).unwrap();

        let a = with_noise
            .predict(&obs(&["mars", "office", "?", "campus", "office"]))
            .unwrap();
        let b = clean.predict(&obs(&["office", "campus", "office"])).unwrap();
        assert_eq!(a, b);
        assert_eq!(with_noise.samples(), clean.samples());
        assert_eq!(with_noise.total_log_likelihood(), clean.total_log_likelihood());
    }

    #[test]
    fn no_resolved_observations_falls_back_to_prior() {
        let model = Arc::new(
            MixtureModel::new(
                vec!["a", "b"],
                vec![vec![0.5, 0.5]],
                vec![vec![1.0], vec![1.0]],
                vec![0.3, 0.7],
            )
            .unwrap(),
        );
        let mut clf = MixtureClassifier::new(model, labels(), NameResolver).unwrap();
        assert_eq!(clf.predict(&obs(&["nowhere"])).unwrap(), 1);
        assert_eq!(clf.samples(), 0);
        assert!(clf.likelihood().is_nan());
    }

    #[test]
    fn predict_is_deterministic_on_fresh_instances() {
        let model = separating_model();
        let input = obs(&["home", "office", "campus", "office"]);
        let mut deltas = Vec::new();
        for _ in 0..3 {
            let mut clf = MixtureClassifier::new(model.clone(), labels(), NameResolver).unwrap();
            let class = clf.predict(&input).unwrap();
            deltas.push((class, clf.total_log_likelihood()));
        }
        assert!(deltas.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn statistics_span_calls_until_reset() {
        let mut clf = MixtureClassifier::new(tied_model(), labels(), NameResolver).unwrap();
        clf.predict(&obs(&["w0"])).unwrap();
        clf.predict(&obs(&["w1", "w1"])).unwrap();
        assert_eq!(clf.samples(), 3);
        let expected = (0.7f64.ln() + 2.0 * 0.3f64.ln()) / 3.0;
        assert!(approx_eq(clf.likelihood(), expected, 1e-12));

        clf.reset_statistics();
        assert_eq!(clf.samples(), 0);
        assert_eq!(clf.total_log_likelihood(), 0.0);
    }

    #[test]
    fn score_leaves_statistics_untouched() {
        let clf = MixtureClassifier::new(separating_model(), labels(), NameResolver).unwrap();
        let prediction = clf.score(&obs(&["campus", "unknown"])).unwrap();
        assert_eq!(prediction.class, 0);
        assert_eq!(prediction.resolved, 1);
        let total: f64 = prediction.posterior.iter().sum();
        assert!(approx_eq(total, 1.0, 1e-12));
        assert!(prediction.posterior[0] > prediction.posterior[1]);
        assert_eq!(clf.samples(), 0);
    }

    #[test]
    fn zero_probability_class_loses() {
        let model = Arc::new(
            MixtureModel::new(
                vec!["shared", "only_c1"],
                vec![vec![1.0, 0.0], vec![0.5, 0.5]],
                vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                vec![0.9, 0.1],
            )
            .unwrap(),
        );
        let mut clf = MixtureClassifier::new(model, labels(), NameResolver).unwrap();
        let prediction = clf.score(&obs(&["shared", "only_c1"])).unwrap();
        assert_eq!(prediction.log_scores[0], f64::NEG_INFINITY);
        assert_eq!(prediction.class, 1);
        assert_eq!(prediction.posterior, vec![0.0, 1.0]);

        assert_eq!(clf.predict(&obs(&["only_c1"])).unwrap(), 1);
        assert!(approx_eq(clf.total_log_likelihood(), 0.5f64.ln(), 1e-12));

        // A zero prior beats the low-index tie-break.
        let zero_prior = Arc::new(
            MixtureModel::new(
                vec!["a", "b"],
                vec![vec![0.5, 0.5]],
                vec![vec![1.0], vec![1.0]],
                vec![0.0, 1.0],
            )
            .unwrap(),
        );
        let mut clf = MixtureClassifier::new(zero_prior, labels(), NameResolver).unwrap();
        assert_eq!(clf.predict(&obs(&["a", "b"])).unwrap(), 1);
    }

    #[test]
    fn unreachable_symbol_ties_every_class_at_negative_infinity() {
        let model = Arc::new(
            MixtureModel::new(
                vec!["a", "b", "unvisited"],
                vec![vec![0.5, 0.5, 0.0]],
                vec![vec![1.0], vec![1.0]],
                vec![0.3, 0.7],
            )
            .unwrap(),
        );
        let mut clf = MixtureClassifier::new(model, labels(), NameResolver).unwrap();

        let prediction = clf.score(&obs(&["a", "unvisited"])).unwrap();
        assert!(prediction.log_scores.iter().all(|s| *s == f64::NEG_INFINITY));
        assert_eq!(prediction.class, 0);
        assert_eq!(prediction.log_likelihood, f64::NEG_INFINITY);

        assert_eq!(clf.predict(&obs(&["a", "unvisited"])).unwrap(), 0);
        assert_eq!(clf.samples(), 2);
        assert_eq!(clf.likelihood(), f64::NEG_INFINITY);

        // The running total stays at -inf once it gets there.
        assert_eq!(clf.predict(&obs(&["b"])).unwrap(), 1);
        assert_eq!(clf.total_log_likelihood(), f64::NEG_INFINITY);
        assert_eq!(clf.samples(), 3);
    }

    #[test]
    fn label_count_must_match_model() {
        let err = MixtureClassifier::new(tied_model(), vec!["only".to_string()], NameResolver)
            .err()
            .unwrap();
        assert!(matches!(err, Error::InvalidModel(_)));
    }

    #[test]
    fn out_of_range_resolver_output_is_an_error() {
        let broken = |_: &[&str], _: &str| Some(99usize);
        let mut clf = MixtureClassifier::new(tied_model(), labels(), broken).unwrap();
        let err = clf.predict(&obs(&["w0"])).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 99, .. }));
        assert_eq!(clf.samples(), 0);
    }

    #[test]
    fn capability_accessors() {
        let mut clf = MixtureClassifier::new(tied_model(), labels(), NameResolver)
            .unwrap()
            .with_label("mixture-a");
        assert_eq!(clf.label(), "mixture-a");
        assert_eq!(clf.number_of_classes(), 2);
        assert_eq!(clf.class_labels(), &labels()[..]);
        assert!(clf.train(Path::new("/nonexistent")).is_ok());
        assert_eq!(clf.model().number_of_symbols(), 2);
    }
}
