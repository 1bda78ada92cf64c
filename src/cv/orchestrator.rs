//! Per-fold train/evaluate loop.

use serde::{Deserialize, Serialize};

use super::CvError;
use super::folds::{Fold, partition};
use crate::dataset::Dataset;
use crate::ml::metrics::{BinaryMetrics, MetricsEngine, MetricsError};
use crate::ml::TrainableClassifier;

/// Scores for one held-out fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub fold: usize,
    pub train_size: usize,
    pub test_size: usize,
    #[serde(flatten)]
    pub metrics: BinaryMetrics,
}

/// Partition `dataset` into `k` stratified folds and evaluate each one.
///
/// Configuration problems are reported before any classifier is built.
pub fn run<C, F>(
    dataset: &Dataset,
    k: usize,
    seed: u64,
    factory: F,
    engine: &MetricsEngine,
) -> Result<Vec<FoldResult>, CvError>
where
    C: TrainableClassifier,
    F: FnMut() -> C,
{
    let folds = partition(dataset.labels(), k, seed)?;
    run_with_folds(dataset, &folds, factory, engine)
}

/// Evaluate caller-supplied folds in index order.
///
/// The folds are validated up front: they must cover every row exactly once,
/// match their declared class counts and each hold both classes. Only then is
/// a fresh classifier taken from `factory` per fold, fitted on the union of the
/// other folds and scored on the held-out one. Any failure stops the run.
pub fn run_with_folds<C, F>(
    dataset: &Dataset,
    folds: &[Fold],
    mut factory: F,
    engine: &MetricsEngine,
) -> Result<Vec<FoldResult>, CvError>
where
    C: TrainableClassifier,
    F: FnMut() -> C,
{
    if folds.len() < 2 {
        return Err(CvError::InvalidConfiguration(format!(
            "at least 2 folds are required, got {}",
            folds.len()
        )));
    }
    check_folds(dataset, folds)?;
    check_fold_classes(folds)
        .inspect_err(|err| tracing::warn!("Rejected folds: {err}"))?;

    let mut results = Vec::with_capacity(folds.len());
    for (fold_index, fold) in folds.iter().enumerate() {
        let result = evaluate_fold(dataset, folds, fold_index, &mut factory, engine)
            .inspect_err(|err| tracing::warn!(fold = fold_index, "Fold failed: {err}"))?;
        tracing::info!(
            fold = fold_index,
            train = result.train_size,
            test = result.test_size,
            auc = format_args!("{:.4}", result.metrics.auc),
            f1 = format_args!("{:.4}", result.metrics.f1),
            "Fold evaluated"
        );
        debug_assert_eq!(fold.len(), result.test_size);
        results.push(result);
    }
    Ok(results)
}

fn evaluate_fold<C, F>(
    dataset: &Dataset,
    folds: &[Fold],
    fold_index: usize,
    factory: &mut F,
    engine: &MetricsEngine,
) -> Result<FoldResult, CvError>
where
    C: TrainableClassifier,
    F: FnMut() -> C,
{
    let test_indices = &folds[fold_index].indices;
    let (test_x, test_y) = dataset.subset(test_indices);

    let train_indices: Vec<usize> = folds
        .iter()
        .filter(|fold| fold.index != folds[fold_index].index)
        .flat_map(|fold| fold.indices.iter().copied())
        .collect();
    let (train_x, train_y) = dataset.subset(&train_indices);
    tracing::info!(
        fold = fold_index,
        train = train_y.len(),
        test = test_y.len(),
        "Training fold classifier"
    );

    let mut classifier = factory();
    classifier
        .fit(train_x.view(), &train_y)
        .map_err(|source| CvError::ClassifierTraining { fold_index, source })?;
    // The training matrix is no longer needed once the model is fitted.
    drop(train_x);

    let probabilities = classifier
        .predict(test_x.view())
        .map_err(|source| CvError::ClassifierPrediction { fold_index, source })?;
    let metrics = engine
        .evaluate(&probabilities, &test_y)
        .map_err(|source| match source {
            MetricsError::MissingClass {
                positives,
                negatives,
            } => CvError::DegenerateFold {
                fold_index,
                positives,
                negatives,
            },
            source => CvError::Evaluation { fold_index, source },
        })?;

    Ok(FoldResult {
        fold: fold_index,
        train_size: train_y.len(),
        test_size: test_y.len(),
        metrics,
    })
}

/// Folds must sit at their own index, partition every row exactly once and
/// declare the class counts their rows actually have.
fn check_folds(dataset: &Dataset, folds: &[Fold]) -> Result<(), CvError> {
    let labels = dataset.labels();
    let mut seen = vec![false; dataset.len()];
    for (position, fold) in folds.iter().enumerate() {
        if fold.index != position {
            return Err(CvError::InvalidConfiguration(format!(
                "fold at position {position} is labelled {}",
                fold.index
            )));
        }
        let mut positives = 0usize;
        for &idx in &fold.indices {
            match seen.get_mut(idx) {
                None => {
                    return Err(CvError::InvalidConfiguration(format!(
                        "fold {position} references row {idx} beyond {} samples",
                        dataset.len()
                    )));
                }
                Some(true) => {
                    return Err(CvError::InvalidConfiguration(format!(
                        "row {idx} appears in more than one fold"
                    )));
                }
                Some(slot) => *slot = true,
            }
            positives += usize::from(labels[idx] == 1);
        }
        let negatives = fold.indices.len() - positives;
        if fold.positives != positives || fold.negatives != negatives {
            return Err(CvError::InvalidConfiguration(format!(
                "fold {position} declares {} positive and {} negative rows but holds {positives} and {negatives}",
                fold.positives, fold.negatives
            )));
        }
    }
    let uncovered = seen.iter().filter(|&&covered| !covered).count();
    if uncovered > 0 {
        return Err(CvError::InvalidConfiguration(format!(
            "{uncovered} of {} rows belong to no fold",
            dataset.len()
        )));
    }
    Ok(())
}

/// Every test fold needs both classes; checked before any classifier is built.
fn check_fold_classes(folds: &[Fold]) -> Result<(), CvError> {
    match folds
        .iter()
        .find(|fold| fold.positives == 0 || fold.negatives == 0)
    {
        Some(fold) => Err(CvError::DegenerateFold {
            fold_index: fold.index,
            positives: fold.positives,
            negatives: fold.negatives,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::ClassifierError;
    use ndarray::{Array2, ArrayView2};
    use std::cell::Cell;

    /// Scores rows by their first feature and refuses to be fitted twice.
    #[derive(Default)]
    struct FirstFeature {
        fitted: bool,
    }

    impl TrainableClassifier for FirstFeature {
        fn fit(
            &mut self,
            features: ArrayView2<'_, f64>,
            labels: &[u8],
        ) -> Result<(), ClassifierError> {
            if self.fitted {
                return Err(ClassifierError::Other("fitted twice".to_string()));
            }
            assert_eq!(features.nrows(), labels.len());
            self.fitted = true;
            Ok(())
        }

        fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>, ClassifierError> {
            if !self.fitted {
                return Err(ClassifierError::NotFitted);
            }
            Ok(features.column(0).iter().map(|v| v.clamp(0.0, 1.0)).collect())
        }
    }

    struct Failing;

    impl TrainableClassifier for Failing {
        fn fit(&mut self, _: ArrayView2<'_, f64>, _: &[u8]) -> Result<(), ClassifierError> {
            Err(ClassifierError::Other("gpu on fire".to_string()))
        }

        fn predict(&self, _: ArrayView2<'_, f64>) -> Result<Vec<f64>, ClassifierError> {
            unreachable!("predict after failed fit")
        }
    }

    /// Positives carry 0.9 in column 0, negatives 0.1.
    fn separable(positives: usize, negatives: usize) -> Dataset {
        let n = positives + negatives;
        let labels: Vec<u8> = (0..n).map(|i| u8::from(i < positives)).collect();
        let mut features = Array2::<f64>::zeros((n, 2));
        for (i, &label) in labels.iter().enumerate() {
            features[[i, 0]] = if label == 1 { 0.9 } else { 0.1 };
            features[[i, 1]] = i as f64;
        }
        Dataset::new(features, labels).unwrap()
    }

    #[test]
    fn builds_one_fresh_classifier_per_fold() {
        let dataset = separable(12, 18);
        let calls = Cell::new(0usize);
        let results = run(
            &dataset,
            3,
            5,
            || {
                calls.set(calls.get() + 1);
                FirstFeature::default()
            },
            &MetricsEngine::default(),
        )
        .unwrap();
        assert_eq!(calls.get(), 3);
        assert_eq!(results.len(), 3);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.fold, i);
            assert_eq!(result.train_size + result.test_size, dataset.len());
            assert_eq!(result.metrics.auc, 1.0);
            assert_eq!(result.metrics.accuracy, 1.0);
        }
    }

    #[test]
    fn too_many_folds_fail_before_any_training() {
        let dataset = separable(3, 20);
        let calls = Cell::new(0usize);
        let err = run(
            &dataset,
            4,
            0,
            || {
                calls.set(calls.get() + 1);
                FirstFeature::default()
            },
            &MetricsEngine::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CvError::InvalidConfiguration(_)));
        assert_eq!(calls.get(), 0);
    }

    fn fold(index: usize, indices: Vec<usize>, positives: usize, negatives: usize) -> Fold {
        Fold {
            index,
            indices,
            positives,
            negatives,
        }
    }

    #[test]
    fn single_class_fold_fails_before_any_training() {
        let dataset = separable(3, 3);
        let folds = vec![
            fold(0, vec![0, 3], 1, 1),
            fold(1, vec![1, 2], 2, 0),
            fold(2, vec![4, 5], 0, 2),
        ];
        let calls = Cell::new(0usize);
        let err = run_with_folds(
            &dataset,
            &folds,
            || {
                calls.set(calls.get() + 1);
                FirstFeature::default()
            },
            &MetricsEngine::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CvError::DegenerateFold {
                fold_index: 1,
                positives: 2,
                negatives: 0
            }
        ));
        assert_eq!(err.fold_index(), Some(1));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn folds_must_cover_every_row() {
        let dataset = separable(4, 4);
        let folds = vec![fold(0, vec![0, 4], 1, 1), fold(1, vec![1, 5], 1, 1)];
        let calls = Cell::new(0usize);
        let err = run_with_folds(
            &dataset,
            &folds,
            || {
                calls.set(calls.get() + 1);
                FirstFeature::default()
            },
            &MetricsEngine::default(),
        )
        .unwrap_err();
        match err {
            CvError::InvalidConfiguration(message) => {
                assert!(message.contains("4 of 8 rows"), "{message}")
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn declared_class_counts_must_match_labels() {
        let dataset = separable(2, 2);
        let folds = vec![fold(0, vec![0, 2], 1, 1), fold(1, vec![1, 3], 2, 0)];
        let err = run_with_folds(
            &dataset,
            &folds,
            FirstFeature::default,
            &MetricsEngine::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CvError::InvalidConfiguration(_)));
    }

    #[test]
    fn classifier_errors_carry_the_fold_index() {
        let dataset = separable(6, 6);
        let err = run(&dataset, 2, 1, || Failing, &MetricsEngine::default()).unwrap_err();
        match err {
            CvError::ClassifierTraining { fold_index, source } => {
                assert_eq!(fold_index, 0);
                assert_eq!(source, ClassifierError::Other("gpu on fire".to_string()));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn overlapping_custom_folds_are_rejected() {
        let dataset = separable(2, 2);
        let folds = vec![fold(0, vec![0, 2], 1, 1), fold(1, vec![1, 2, 3], 1, 2)];
        let err = run_with_folds(
            &dataset,
            &folds,
            FirstFeature::default,
            &MetricsEngine::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CvError::InvalidConfiguration(_)));
    }

    #[test]
    fn boxed_classifiers_work_as_factories() {
        let dataset = separable(8, 8);
        let results = run(
            &dataset,
            4,
            3,
            || Box::new(FirstFeature::default()) as Box<dyn TrainableClassifier>,
            &MetricsEngine::default(),
        )
        .unwrap();
        assert_eq!(results.len(), 4);
    }
}
