//! Evaluation pipeline tests: model file → classifiers → manager → report.

use gm_common::{Error, OutputFormat};
use gm_core::classify::{Classifier, MixtureClassifier, PriorClassifier, RegionResolver, ResolverKind};
use gm_core::config::{load_model, LoadedModel, ModelOptions};
use gm_core::dataset::Record;
use gm_core::evaluation::EvaluationManager;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn loaded() -> LoadedModel {
    let options = ModelOptions {
        model_path: Some(fixture("model.json")),
    };
    load_model(&options)
        .expect("fixture model loads")
        .build()
        .expect("fixture model builds")
}

fn mixture(model: &LoadedModel) -> Box<dyn Classifier> {
    let resolver = RegionResolver::for_regions(ResolverKind::Auto, model.model.symbols());
    Box::new(
        MixtureClassifier::new(model.model.clone(), model.taxonomy.labels().to_vec(), resolver)
            .expect("labels match model"),
    )
}

fn manager(model: &LoadedModel) -> EvaluationManager {
    let mut m = EvaluationManager::new();
    m.register(mixture(model)).unwrap();
    m.register(Box::new(PriorClassifier::uniform(model.taxonomy.clone())))
        .unwrap();
    m
}

#[test]
fn fixture_model_derives_expected_tables() {
    let model = loaded();
    let m = &model.model;
    assert_eq!(m.number_of_symbols(), 3);
    assert!((m.p_w_given_c(0, 0).unwrap() - 0.64).abs() < 1e-12);
    assert!((m.p_w_given_c(2, 1).unwrap() - 0.50).abs() < 1e-12);
    let p_w: f64 = (0..3).map(|w| m.p_w(w).unwrap()).sum();
    assert!((p_w - 1.0).abs() < 1e-9);
}

#[test]
fn evaluation_over_fixture_dataset() {
    let model = loaded();
    let mut m = manager(&model);

    let summary = m.test_predictors_file(&fixture("test.jsonl")).unwrap();
    assert_eq!(summary.records_read, 5);
    assert_eq!(summary.records_scored, 4);
    assert_eq!(summary.records_skipped, 1);

    let report = m.report();
    assert_eq!(report.classifiers.len(), 2);
    let mixture = &report.classifiers[0];
    assert_eq!(mixture.label, "mixture predictor");
    assert_eq!(mixture.scores.accuracy, Some(0.75));
    // The point outside every district resolves to nothing.
    assert_eq!(mixture.samples, 7);
    assert!(mixture.log_likelihood.unwrap() < 0.0);

    let baseline = &report.classifiers[1];
    assert_eq!(baseline.scores.accuracy, Some(0.5));
    assert_eq!(baseline.samples, 4);
}

#[test]
fn text_report_layout() {
    let model = loaded();
    let mut m = manager(&model);
    m.test_predictors_file(&fixture("test.jsonl")).unwrap();

    let text = m.performance_report(OutputFormat::Text).unwrap();
    assert!(text.starts_with("mixture predictor\n"));
    assert!(text.contains("\nprior baseline\n"));
    assert_eq!(text.matches("loglikelihood : ").count(), 2);
    assert!(text.ends_with("\n\n"));
}

#[test]
fn unknown_label_aborts_run() {
    let model = loaded();
    let mut m = manager(&model);
    let err = m
        .test_predictors_file(&fixture("unknown_label.jsonl"))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownCategory { ref label } if label == "commuter"));
}

#[test]
fn mismatched_taxonomy_is_rejected_atomically() {
    let model = loaded();
    let mut m = manager(&model);

    let reversed = gm_common::Taxonomy::new(["visitor", "resident"]).unwrap();
    let err = m
        .register(Box::new(PriorClassifier::uniform(reversed)))
        .unwrap_err();
    assert!(matches!(err, Error::TaxonomyMismatch { .. }));
    assert!(err.is_recoverable());
    assert_eq!(m.labels(), vec!["mixture predictor", "prior baseline"]);
}

#[test]
fn training_refits_baseline_and_propagates_io_errors() {
    let model = loaded();
    let mut m = manager(&model);
    m.train_predictors(&fixture("test.jsonl")).unwrap();

    let err = m
        .train_predictors(&fixture("absent.jsonl"))
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn repeated_runs_accumulate_statistics() {
    let model = loaded();
    let mut m = EvaluationManager::new();
    m.register(mixture(&model)).unwrap();

    let records = || {
        vec![Record::new("resident", vec!["46.51,6.63".to_string()])].into_iter()
    };
    m.test_predictors(&mut records()).unwrap();
    m.test_predictors(&mut records()).unwrap();

    let report = m.report();
    assert_eq!(report.classifiers[0].samples, 2);
    assert_eq!(report.classifiers[0].scores.scored, 2);
}

#[test]
fn statistics_directory_gets_one_file_per_curve() {
    let model = loaded();
    let mut m = manager(&model);
    m.test_predictors_file(&fixture("test.jsonl")).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let written = m.report_statistics(dir.path()).unwrap();
    assert_eq!(written.len(), 4);
    assert!(dir
        .path()
        .join("mixture_predictor_error_vs_observations.tsv")
        .exists());
    assert!(dir.path().join("prior_baseline_error_vs_records.tsv").exists());
}
