//! Evaluation manager: runs several classifiers side by side over one
//! labeled test stream and compares them.
//!
//! The first registered classifier fixes the taxonomy. Each classifier is
//! paired with its own [`ScoreTester`]; records are fed to every classifier in
//! registration order, one record at a time. Classifier labels double as
//! report file names, so two labels that map to the same file name cannot be
//! registered together.

pub mod tester;

pub use tester::{ClassScore, ConfusionTester, ScoreTester, StatCurve, TesterSummary};

use crate::classify::Classifier;
use crate::dataset::{open_dataset, RecordSource};
use chrono::Utc;
use gm_common::{Error, OutputFormat, Result, Taxonomy};
use gm_math::DistributionAxis;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

struct Entry {
    classifier: Box<dyn Classifier>,
    tester: Box<dyn ScoreTester>,
}

/// Counters for one pass over a test stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationSummary {
    pub records_read: u64,
    pub records_scored: u64,
    /// Records with no observations.
    pub records_skipped: u64,
}

/// Per-classifier section of a JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifierReport {
    pub label: String,
    /// Average log-likelihood per sample; absent before any sample.
    pub log_likelihood: Option<f64>,
    pub samples: u64,
    pub scores: TesterSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    pub generated_at: String,
    pub class_labels: Vec<String>,
    pub classifiers: Vec<ClassifierReport>,
}

#[derive(Default)]
pub struct EvaluationManager {
    entries: Vec<Entry>,
    taxonomy: Option<Taxonomy>,
}

impl EvaluationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a classifier with a fresh [`ConfusionTester`].
    pub fn register(&mut self, classifier: Box<dyn Classifier>) -> Result<()> {
        let tester = Box::new(ConfusionTester::new(classifier.class_labels()));
        self.register_with_tester(classifier, tester)
    }

    /// Register a classifier paired with a caller-supplied tester.
    ///
    /// Fails without adding anything when the classifier's class count and
    /// labels disagree, when its taxonomy differs from the fixed one, or when
    /// its label maps to the same report file name as a registered one.
    pub fn register_with_tester(
        &mut self,
        classifier: Box<dyn Classifier>,
        tester: Box<dyn ScoreTester>,
    ) -> Result<()> {
        let classes = classifier.number_of_classes();
        let labels = classifier.class_labels().len();
        if classes != labels {
            return Err(Error::ClassCountMismatch { classes, labels });
        }

        let taxonomy = match &self.taxonomy {
            Some(taxonomy) => {
                taxonomy.ensure_matches(classes, classifier.class_labels())?;
                None
            }
            None => Some(Taxonomy::new(classifier.class_labels().iter().cloned())?),
        };

        let stem = file_stem(classifier.label());
        if let Some(existing) = self
            .entries
            .iter()
            .find(|e| file_stem(e.classifier.label()) == stem)
        {
            return Err(Error::DuplicateLabel {
                label: classifier.label().to_string(),
                existing: existing.classifier.label().to_string(),
                stem,
            });
        }

        if let Some(taxonomy) = taxonomy {
            info!(classes = taxonomy.len(), "taxonomy fixed by first classifier");
            self.taxonomy = Some(taxonomy);
        }
        info!(label = classifier.label(), position = self.entries.len(), "classifier registered");
        self.entries.push(Entry { classifier, tester });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The fixed taxonomy; `None` until the first registration.
    pub fn taxonomy(&self) -> Option<&Taxonomy> {
        self.taxonomy.as_ref()
    }

    /// Labels of registered classifiers, in registration order.
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.classifier.label()).collect()
    }

    /// Train every classifier in registration order. The first failure stops.
    pub fn train_predictors(&mut self, dataset: &Path) -> Result<()> {
        for entry in &mut self.entries {
            let label = entry.classifier.label().to_string();
            info!(label = %label, dataset = %dataset.display(), "training classifier");
            entry.classifier.train(dataset)?;
            info!(label = %label, "training finished");
        }
        Ok(())
    }

    /// Stream records and score every classifier on each one.
    ///
    /// An unknown ground-truth label aborts the run, even for a record with
    /// no observations. Every classifier predicts a record before any tester
    /// sees it, so a failing prediction leaves all testers at the previous
    /// record. The running likelihood of classifiers that already predicted
    /// the failing record does include it.
    pub fn test_predictors(&mut self, source: &mut dyn RecordSource) -> Result<EvaluationSummary> {
        let taxonomy = self
            .taxonomy
            .as_ref()
            .ok_or_else(|| Error::Config("no classifiers registered".to_string()))?;

        let mut summary = EvaluationSummary::default();
        while let Some(record) = source.next_record()? {
            summary.records_read += 1;
            let truth = taxonomy.index_of(&record.label)?;

            if record.observations.is_empty() {
                trace!(line = record.line, "record without observations skipped");
                summary.records_skipped += 1;
                continue;
            }

            let mut predictions = Vec::with_capacity(self.entries.len());
            for entry in &mut self.entries {
                let predicted = entry.classifier.predict(&record.observations)?;
                if predicted >= taxonomy.len() {
                    return Err(Error::IndexOutOfRange {
                        axis: DistributionAxis::Class,
                        index: predicted,
                        len: taxonomy.len(),
                    });
                }
                predictions.push(predicted);
            }
            for (entry, predicted) in self.entries.iter_mut().zip(predictions) {
                entry.tester.update_score(predicted, truth, &record)?;
            }
            summary.records_scored += 1;

            if summary.records_read % 1000 == 0 {
                debug!(records = summary.records_read, "evaluation progress");
            }
        }

        info!(
            read = summary.records_read,
            scored = summary.records_scored,
            skipped = summary.records_skipped,
            "evaluation finished"
        );
        Ok(summary)
    }

    /// [`Self::test_predictors`] over a JSON Lines file.
    pub fn test_predictors_file(&mut self, path: &Path) -> Result<EvaluationSummary> {
        let mut reader = open_dataset(path)?;
        self.test_predictors(&mut reader)
    }

    /// Text report: label, tester report and log-likelihood per classifier.
    pub fn report_predictors_performance(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = write!(
                out,
                "{}\n{}\nloglikelihood : {}\n\n",
                entry.classifier.label(),
                entry.tester.report_performance(),
                entry.classifier.likelihood()
            );
        }
        out
    }

    pub fn report(&self) -> PerformanceReport {
        PerformanceReport {
            generated_at: Utc::now().to_rfc3339(),
            class_labels: self
                .taxonomy
                .as_ref()
                .map(|t| t.labels().to_vec())
                .unwrap_or_default(),
            classifiers: self
                .entries
                .iter()
                .map(|e| {
                    let likelihood = e.classifier.likelihood();
                    ClassifierReport {
                        label: e.classifier.label().to_string(),
                        log_likelihood: likelihood.is_finite().then_some(likelihood),
                        samples: e.classifier.samples(),
                        scores: e.tester.summary(),
                    }
                })
                .collect(),
        }
    }

    /// Render the performance report in the requested format.
    pub fn performance_report(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Text => Ok(self.report_predictors_performance()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&self.report())?),
            OutputFormat::Md => Ok(self.markdown_report()),
        }
    }

    fn markdown_report(&self) -> String {
        let report = self.report();
        let mut out = String::from("# Classifier comparison\n\n");
        let _ = writeln!(out, "Generated {}\n", report.generated_at);
        out.push_str("| classifier | accuracy | scored | log-likelihood | samples |\n");
        out.push_str("|---|---|---|---|---|\n");
        for c in &report.classifiers {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} |",
                c.label,
                c.scores
                    .accuracy
                    .map_or_else(|| "n/a".to_string(), |a| format!("{:.4}", a)),
                c.scores.scored,
                c.log_likelihood
                    .map_or_else(|| "n/a".to_string(), |l| format!("{:.4}", l)),
                c.samples
            );
        }
        out
    }

    /// Write each classifier's curves as `<label>_<curve>.tsv` under `dir`.
    ///
    /// Registration keeps label stems unique, so no file is written twice.
    pub fn report_statistics(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for entry in &self.entries {
            let stem = file_stem(entry.classifier.label());
            for curve in entry.tester.curves() {
                let path = dir.join(format!("{}_{}.tsv", stem, curve.name));
                curve.write_tsv(&path)?;
                debug!(path = %path.display(), points = curve.points.len(), "curve written");
                written.push(path);
            }
        }
        Ok(written)
    }
}

/// Classifier label as a file-name fragment.
fn file_stem(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Record;

    /// Predicts a fixed class and counts calls.
    struct Fixed {
        labels: Vec<String>,
        label: String,
        class: usize,
        classes: usize,
        /// Observation count that makes `predict` fail.
        fail_on: Option<usize>,
        calls: u64,
    }

    impl Fixed {
        fn new(label: &str, labels: &[&str], class: usize) -> Self {
            Self {
                labels: labels.iter().map(|s| s.to_string()).collect(),
                label: label.to_string(),
                class,
                classes: labels.len(),
                fail_on: None,
                calls: 0,
            }
        }

        fn boxed(label: &str, labels: &[&str], class: usize) -> Box<dyn Classifier> {
            Box::new(Self::new(label, labels, class))
        }
    }

    impl Classifier for Fixed {
        fn predict(&mut self, observations: &[String]) -> Result<usize> {
            self.calls += 1;
            if self.fail_on == Some(observations.len()) {
                return Err(Error::Config("prediction failed".to_string()));
            }
            Ok(self.class)
        }
        fn number_of_classes(&self) -> usize {
            self.classes
        }
        fn class_labels(&self) -> &[String] {
            &self.labels
        }
        fn label(&self) -> &str {
            &self.label
        }
        fn train(&mut self, dataset: &Path) -> Result<()> {
            fs::metadata(dataset)?;
            Ok(())
        }
        fn likelihood(&self) -> f64 {
            -(self.calls as f64)
        }
        fn samples(&self) -> u64 {
            self.calls
        }
        fn reset_statistics(&mut self) {
            self.calls = 0;
        }
    }

    fn obs(n: usize) -> Vec<String> {
        vec!["o".to_string(); n]
    }

    #[test]
    fn first_registration_fixes_taxonomy() {
        let mut m = EvaluationManager::new();
        assert!(m.taxonomy().is_none());
        m.register(Fixed::boxed("a", &["x", "y"], 0)).unwrap();
        assert_eq!(m.taxonomy().unwrap().labels(), &["x".to_string(), "y".to_string()][..]);
    }

    #[test]
    fn mismatched_registration_leaves_collection_unchanged() {
        let mut m = EvaluationManager::new();
        m.register(Fixed::boxed("a", &["x", "y"], 0)).unwrap();

        let err = m.register(Fixed::boxed("b", &["y", "x"], 0)).unwrap_err();
        assert!(matches!(err, Error::TaxonomyMismatch { .. }));
        assert!(m.register(Fixed::boxed("c", &["x", "y", "z"], 0)).is_err());
        assert_eq!(m.len(), 1);
        assert_eq!(m.labels(), vec!["a"]);
    }

    #[test]
    fn class_count_disagreement_names_both_counts() {
        let mut m = EvaluationManager::new();
        let mut miscounted = Fixed::new("a", &["x", "y"], 0);
        miscounted.classes = 3;
        let err = m.register(Box::new(miscounted)).unwrap_err();
        assert!(matches!(err, Error::ClassCountMismatch { classes: 3, labels: 2 }));
        assert!(m.is_empty());
        assert!(m.taxonomy().is_none());

        m.register(Fixed::boxed("a", &["x", "y"], 0)).unwrap();
        let mut miscounted = Fixed::new("b", &["x", "y"], 0);
        miscounted.classes = 1;
        let err = m.register(Box::new(miscounted)).unwrap_err();
        assert!(matches!(err, Error::ClassCountMismatch { classes: 1, labels: 2 }));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn colliding_report_labels_are_rejected() {
        let mut m = EvaluationManager::new();
        m.register(Fixed::boxed("Base A", &["x", "y"], 0)).unwrap();

        let err = m.register(Fixed::boxed("base-a", &["x", "y"], 1)).unwrap_err();
        match err {
            Error::DuplicateLabel { label, existing, stem } => {
                assert_eq!(label, "base-a");
                assert_eq!(existing, "Base A");
                assert_eq!(stem, "base_a");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(
            m.register(Fixed::boxed("Base A", &["x", "y"], 1)),
            Err(Error::DuplicateLabel { .. })
        ));
        assert_eq!(m.labels(), vec!["Base A"]);

        m.register(Fixed::boxed("base b", &["x", "y"], 1)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut source = vec![Record::new("x", obs(1))].into_iter();
        m.test_predictors(&mut source).unwrap();
        let written = m.report_statistics(dir.path()).unwrap();
        assert_eq!(written.len(), 4);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 4);
    }

    #[test]
    fn failed_prediction_leaves_every_tester_at_previous_record() {
        let mut m = EvaluationManager::new();
        m.register(Fixed::boxed("steady", &["x", "y"], 0)).unwrap();
        let mut flaky = Fixed::new("flaky", &["x", "y"], 0);
        flaky.fail_on = Some(2);
        m.register(Box::new(flaky)).unwrap();

        let mut source = vec![Record::new("x", obs(1)), Record::new("x", obs(2))].into_iter();
        assert!(matches!(m.test_predictors(&mut source), Err(Error::Config(_))));

        let report = m.report();
        assert_eq!(report.classifiers[0].scores.scored, 1);
        assert_eq!(report.classifiers[1].scores.scored, 1);
        // The steady classifier did predict the failing record.
        assert_eq!(report.classifiers[0].samples, 2);
    }

    #[test]
    fn out_of_range_prediction_is_caught_before_scoring() {
        let mut m = EvaluationManager::new();
        m.register(Fixed::boxed("steady", &["x", "y"], 0)).unwrap();
        m.register(Fixed::boxed("broken", &["x", "y"], 7)).unwrap();

        let mut source = vec![Record::new("y", obs(1))].into_iter();
        let err = m.test_predictors(&mut source).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 7, len: 2, .. }));
        assert_eq!(m.report().classifiers[0].scores.scored, 0);
    }

    #[test]
    fn empty_records_are_skipped_and_unknown_labels_abort() {
        let mut m = EvaluationManager::new();
        m.register(Fixed::boxed("a", &["x", "y"], 1)).unwrap();

        let mut source = vec![
            Record::new("x", obs(2)),
            Record::new("y", vec![]),
            Record::new("y", obs(1)),
        ]
        .into_iter();
        let summary = m.test_predictors(&mut source).unwrap();
        assert_eq!(
            summary,
            EvaluationSummary {
                records_read: 3,
                records_scored: 2,
                records_skipped: 1
            }
        );

        let mut bad = vec![Record::new("z", vec![])].into_iter();
        assert!(matches!(
            m.test_predictors(&mut bad),
            Err(Error::UnknownCategory { .. })
        ));
    }

    #[test]
    fn testing_without_classifiers_is_a_config_error() {
        let mut m = EvaluationManager::new();
        let mut source = Vec::<Record>::new().into_iter();
        assert!(matches!(m.test_predictors(&mut source), Err(Error::Config(_))));
    }

    #[test]
    fn text_report_follows_registration_order() {
        let mut m = EvaluationManager::new();
        m.register(Fixed::boxed("first", &["x", "y"], 0)).unwrap();
        m.register(Fixed::boxed("second", &["x", "y"], 1)).unwrap();
        let mut source = vec![Record::new("x", obs(1))].into_iter();
        m.test_predictors(&mut source).unwrap();

        let report = m.report_predictors_performance();
        let first = report.find("first\n").unwrap();
        let second = report.find("second\n").unwrap();
        assert!(first < second);
        assert!(report.contains("loglikelihood : -1\n\n"));
        assert!(report.ends_with("\n\n"));
    }

    #[test]
    fn json_report_carries_scores() {
        let mut m = EvaluationManager::new();
        m.register(Fixed::boxed("a", &["x", "y"], 0)).unwrap();
        let mut source = vec![Record::new("x", obs(1)), Record::new("y", obs(1))].into_iter();
        m.test_predictors(&mut source).unwrap();

        let json = m.performance_report(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["class_labels"][1], "y");
        assert_eq!(value["classifiers"][0]["scores"]["accuracy"], 0.5);
        assert_eq!(value["classifiers"][0]["samples"], 2);

        let md = m.performance_report(OutputFormat::Md).unwrap();
        assert!(md.contains("| a | 0.5000 | 2 |"));
    }

    #[test]
    fn training_propagates_io_errors() {
        let mut m = EvaluationManager::new();
        m.register(Fixed::boxed("a", &["x"], 0)).unwrap();
        let err = m.train_predictors(Path::new("/nonexistent/train.jsonl")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn statistics_are_written_per_classifier() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = EvaluationManager::new();
        m.register(Fixed::boxed("Mixture A", &["x", "y"], 0)).unwrap();
        let mut source = vec![Record::new("x", obs(3))].into_iter();
        m.test_predictors(&mut source).unwrap();

        let written = m.report_statistics(dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        let curve = fs::read_to_string(dir.path().join("mixture_a_error_vs_observations.tsv")).unwrap();
        assert_eq!(curve, "observations\terror_rate\n3\t0\n");
    }
}
