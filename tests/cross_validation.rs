use riskfold::config::{ClassifierKind, CvConfig};
use riskfold::cv::{self, CvError, MetricName};
use riskfold::dataset::synthetic::{CohortOptions, generate_cohort};
use riskfold::dataset::{Dataset, Target, encode_patients, load_patients, save_patients};
use riskfold::ml::MetricsEngine;
use tempfile::tempdir;

fn cohort_dataset(count: usize) -> Dataset {
    let records = generate_cohort(CohortOptions { count, seed: 42 }).expect("cohort");
    encode_patients(&records, Target::Complications).expect("encode")
}

fn run_cv(dataset: &Dataset, config: &CvConfig) -> Result<Vec<cv::FoldResult>, CvError> {
    let engine = MetricsEngine::new(config.threshold).expect("decision threshold");
    cv::run(
        dataset,
        config.folds,
        config.seed,
        || config.classifier.build(),
        &engine,
    )
}

#[test]
fn synthetic_cohort_end_to_end() {
    let dir = tempdir().expect("tempdir");
    let patients_path = dir.path().join("patients.json");
    let records = generate_cohort(CohortOptions {
        count: 300,
        seed: 42,
    })
    .expect("cohort");
    save_patients(&patients_path, &records).expect("save patients");
    let loaded = load_patients(&patients_path).expect("load patients");
    assert_eq!(loaded, records);

    let dataset = encode_patients(&loaded, Target::Complications).expect("encode");
    let mut config = CvConfig::default();
    config.classifier.kind = ClassifierKind::LogReg;
    let folds = run_cv(&dataset, &config).expect("cross-validation");
    assert_eq!(folds.len(), config.folds);
    let tested: usize = folds.iter().map(|fold| fold.test_size).sum();
    assert_eq!(tested, dataset.len());
    for fold in &folds {
        assert_eq!(fold.train_size + fold.test_size, dataset.len());
        let auc = fold.metrics.auc;
        assert!((0.0..=1.0).contains(&auc), "fold {} auc {auc}", fold.fold);
        assert_eq!(fold.metrics.confusion.total() as usize, fold.test_size);
    }

    let aggregated = cv::aggregate(&folds).expect("aggregate");
    assert_eq!(aggregated.len(), MetricName::ALL.len());
    let report = cv::assemble(config.snapshot(), dataset.summary(), folds, aggregated);
    let report_path = dir.path().join("out").join("report.json");
    cv::write_report(&report_path, &report).expect("write report");
    let reread = cv::read_report(&report_path).expect("read report");
    assert_eq!(reread.folds, report.folds);
    assert_eq!(reread.aggregated, report.aggregated);
    assert_eq!(reread.dataset, report.dataset);
    assert_eq!(reread.stability, report.stability);
}

#[test]
fn same_seeds_reproduce_the_same_metrics() {
    let dataset = cohort_dataset(200);
    let config = CvConfig {
        folds: 4,
        ..CvConfig::default()
    };
    let first = run_cv(&dataset, &config).expect("first run");
    let second = run_cv(&dataset, &config).expect("second run");
    assert_eq!(first, second);
}

#[test]
fn too_many_folds_for_a_small_cohort() {
    let dataset = cohort_dataset(12);
    let config = CvConfig {
        folds: 10,
        ..CvConfig::default()
    };
    let err = run_cv(&dataset, &config).expect_err("must not stratify");
    assert!(matches!(err, CvError::InvalidConfiguration(_)));
    assert_eq!(err.fold_index(), None);
}

#[test]
fn dataset_fingerprint_tracks_the_cohort_seed() {
    let a = cohort_dataset(50).summary();
    let b = cohort_dataset(50).summary();
    assert_eq!(a, b);
    let other = generate_cohort(CohortOptions {
        count: 50,
        seed: 43,
    })
    .expect("cohort");
    let c = encode_patients(&other, Target::Complications)
        .expect("encode")
        .summary();
    assert_ne!(a.fingerprint, c.fingerprint);
}
