//! Per-classifier score bookkeeping.
//!
//! A tester sees `(predicted, truth, record)` triples for exactly one
//! classifier and turns them into a text report plus exportable curves.

use crate::dataset::Record;
use gm_common::{Error, Result};
use gm_math::DistributionAxis;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

/// Bookkeeping half of an evaluation pair.
pub trait ScoreTester {
    /// Record one decision. Class ids must be inside the taxonomy.
    fn update_score(&mut self, predicted: usize, truth: usize, record: &Record) -> Result<()>;

    /// Human-readable performance summary.
    fn report_performance(&self) -> String;

    /// Curves for export.
    fn curves(&self) -> Vec<StatCurve>;

    /// Machine-readable summary.
    fn summary(&self) -> TesterSummary;
}

/// A named series of `(x, y)` points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatCurve {
    pub name: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<(f64, f64)>,
}

impl StatCurve {
    /// Tab-separated rendering with a header row.
    pub fn to_tsv(&self) -> String {
        let mut out = format!("{}\t{}\n", self.x_label, self.y_label);
        for (x, y) in &self.points {
            let _ = writeln!(out, "{}\t{}", x, y);
        }
        out
    }

    pub fn write_tsv(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_tsv())?;
        Ok(())
    }
}

/// Precision and recall for one class. `None` when undefined (0/0).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassScore {
    pub label: String,
    pub support: u64,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TesterSummary {
    pub scored: u64,
    pub correct: u64,
    pub accuracy: Option<f64>,
    /// `[truth][predicted]`.
    pub confusion: Vec<Vec<u64>>,
    pub per_class: Vec<ClassScore>,
}

/// Confusion-matrix tester with an error-vs-observation-count curve.
#[derive(Debug, Clone)]
pub struct ConfusionTester {
    labels: Vec<String>,
    /// `[truth][predicted]`.
    confusion: Vec<Vec<u64>>,
    /// observation count -> (records, errors)
    by_length: BTreeMap<usize, (u64, u64)>,
    /// Running error rate after each scored record.
    running: Vec<f64>,
    scored: u64,
    errors: u64,
}

impl ConfusionTester {
    pub fn new(labels: &[String]) -> Self {
        let k = labels.len();
        Self {
            labels: labels.to_vec(),
            confusion: vec![vec![0; k]; k],
            by_length: BTreeMap::new(),
            running: Vec::new(),
            scored: 0,
            errors: 0,
        }
    }

    pub fn scored(&self) -> u64 {
        self.scored
    }

    pub fn accuracy(&self) -> Option<f64> {
        if self.scored == 0 {
            return None;
        }
        Some((self.scored - self.errors) as f64 / self.scored as f64)
    }

    /// Count of records with truth `truth` predicted as `predicted`.
    pub fn cell(&self, truth: usize, predicted: usize) -> Option<u64> {
        self.confusion.get(truth)?.get(predicted).copied()
    }

    fn class_scores(&self) -> Vec<ClassScore> {
        let k = self.labels.len();
        (0..k)
            .map(|c| {
                let tp = self.confusion[c][c];
                let support: u64 = self.confusion[c].iter().sum();
                let predicted: u64 = (0..k).map(|t| self.confusion[t][c]).sum();
                ClassScore {
                    label: self.labels[c].clone(),
                    support,
                    precision: ratio(tp, predicted),
                    recall: ratio(tp, support),
                }
            })
            .collect()
    }

    fn check_class(&self, class: usize) -> Result<()> {
        if class >= self.labels.len() {
            return Err(Error::IndexOutOfRange {
                axis: DistributionAxis::Class,
                index: class,
                len: self.labels.len(),
            });
        }
        Ok(())
    }
}

fn ratio(num: u64, den: u64) -> Option<f64> {
    (den > 0).then(|| num as f64 / den as f64)
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v))
}

impl ScoreTester for ConfusionTester {
    fn update_score(&mut self, predicted: usize, truth: usize, record: &Record) -> Result<()> {
        self.check_class(predicted)?;
        self.check_class(truth)?;

        let wrong = predicted != truth;
        self.confusion[truth][predicted] += 1;
        self.scored += 1;
        if wrong {
            self.errors += 1;
        }

        let bucket = self.by_length.entry(record.observations.len()).or_default();
        bucket.0 += 1;
        if wrong {
            bucket.1 += 1;
        }
        self.running.push(self.errors as f64 / self.scored as f64);
        Ok(())
    }

    fn report_performance(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "records scored : {}", self.scored);
        let _ = writeln!(out, "accuracy : {}", fmt_opt(self.accuracy()));

        let width = self
            .labels
            .iter()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(8);
        let _ = writeln!(out, "confusion (rows = truth, columns = predicted):");
        let _ = write!(out, "{:width$}", "", width = width);
        for label in &self.labels {
            let _ = write!(out, " {:>width$}", label, width = width);
        }
        out.push('\n');
        for (label, row) in self.labels.iter().zip(&self.confusion) {
            let _ = write!(out, "{:width$}", label, width = width);
            for count in row {
                let _ = write!(out, " {:>width$}", count, width = width);
            }
            out.push('\n');
        }

        for score in self.class_scores() {
            let _ = writeln!(
                out,
                "{} : precision {} recall {} support {}",
                score.label,
                fmt_opt(score.precision),
                fmt_opt(score.recall),
                score.support
            );
        }
        // Drop the trailing newline; the manager adds its own separators.
        out.pop();
        out
    }

    fn curves(&self) -> Vec<StatCurve> {
        let by_length = self
            .by_length
            .iter()
            .map(|(&n, &(total, errors))| (n as f64, errors as f64 / total as f64))
            .collect();
        let running = self
            .running
            .iter()
            .enumerate()
            .map(|(i, &rate)| ((i + 1) as f64, rate))
            .collect();
        vec![
            StatCurve {
                name: "error_vs_observations".to_string(),
                x_label: "observations".to_string(),
                y_label: "error_rate".to_string(),
                points: by_length,
            },
            StatCurve {
                name: "error_vs_records".to_string(),
                x_label: "records".to_string(),
                y_label: "error_rate".to_string(),
                points: running,
            },
        ]
    }

    fn summary(&self) -> TesterSummary {
        TesterSummary {
            scored: self.scored,
            correct: self.scored - self.errors,
            accuracy: self.accuracy(),
            confusion: self.confusion.clone(),
            per_class: self.class_scores(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["resident".to_string(), "visitor".to_string()]
    }

    fn record(n: usize) -> Record {
        Record::new("resident", vec!["x".to_string(); n])
    }

    #[test]
    fn confusion_and_rates() {
        let mut t = ConfusionTester::new(&labels());
        t.update_score(0, 0, &record(1)).unwrap();
        t.update_score(0, 0, &record(2)).unwrap();
        t.update_score(1, 0, &record(2)).unwrap();
        t.update_score(1, 1, &record(1)).unwrap();

        assert_eq!(t.scored(), 4);
        assert_eq!(t.cell(0, 1), Some(1));
        assert_eq!(t.cell(1, 1), Some(1));
        assert_eq!(t.accuracy(), Some(0.75));

        let summary = t.summary();
        assert_eq!(summary.correct, 3);
        assert_eq!(summary.per_class[0].recall, Some(2.0 / 3.0));
        assert_eq!(summary.per_class[0].precision, Some(1.0));
        assert_eq!(summary.per_class[1].precision, Some(0.5));
        assert_eq!(summary.per_class[1].support, 1);
    }

    #[test]
    fn empty_tester_has_undefined_rates() {
        let t = ConfusionTester::new(&labels());
        assert_eq!(t.accuracy(), None);
        assert!(t.summary().per_class.iter().all(|s| s.precision.is_none()));
        assert!(t.report_performance().contains("accuracy : n/a"));
    }

    #[test]
    fn rejects_out_of_range_classes() {
        let mut t = ConfusionTester::new(&labels());
        let err = t.update_score(2, 0, &record(1)).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 2, len: 2, .. }));
        assert_eq!(t.scored(), 0);
    }

    #[test]
    fn curves_bucket_by_observation_count() {
        let mut t = ConfusionTester::new(&labels());
        t.update_score(1, 0, &record(1)).unwrap();
        t.update_score(0, 0, &record(1)).unwrap();
        t.update_score(0, 0, &record(3)).unwrap();

        let curves = t.curves();
        assert_eq!(curves[0].points, vec![(1.0, 0.5), (3.0, 0.0)]);
        assert_eq!(curves[1].points.len(), 3);
        assert_eq!(curves[1].points[0], (1.0, 1.0));

        let tsv = curves[0].to_tsv();
        assert!(tsv.starts_with("observations\terror_rate\n"));
        assert!(tsv.contains("3\t0\n"));
    }

    #[test]
    fn report_lists_every_class() {
        let mut t = ConfusionTester::new(&labels());
        t.update_score(0, 1, &record(1)).unwrap();
        let report = t.report_performance();
        assert!(report.contains("records scored : 1"));
        assert!(report.contains("resident : precision"));
        assert!(report.contains("visitor : precision n/a recall 0.0000 support 1"));
        assert!(!report.ends_with('\n'));
    }
}
