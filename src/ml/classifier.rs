//! The trainable-classifier seam used by cross-validation.

use ndarray::ArrayView2;
use thiserror::Error;

/// Failures raised by classifier implementations while fitting or predicting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifierError {
    #[error("Empty training set")]
    EmptyTrainingSet,
    #[error("Mismatched inputs: {rows} feature rows for {labels} labels")]
    MismatchedInputs { rows: usize, labels: usize },
    #[error("Expected {expected} features per row, got {actual}")]
    FeatureCount { expected: usize, actual: usize },
    #[error("Training labels must contain both classes")]
    SingleClass,
    #[error("Label {0} is not 0 or 1")]
    InvalidLabel(u8),
    #[error("Non-finite value in input features")]
    NonFinite,
    #[error("Training diverged to non-finite weights")]
    Diverged,
    #[error("Model has not been fitted")]
    NotFitted,
    /// Free-form failure from an external implementation.
    #[error("{0}")]
    Other(String),
}

/// A binary classifier that can be fitted once and then queried for probabilities.
///
/// Cross-validation builds a fresh instance for every fold, so implementations
/// never see more than one training set.
pub trait TrainableClassifier {
    /// Fit on `features` (`n x d`) and labels in `{0, 1}`.
    fn fit(&mut self, features: ArrayView2<'_, f64>, labels: &[u8]) -> Result<(), ClassifierError>;

    /// Positive-class probability for each row of `features`.
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>, ClassifierError>;
}

impl<C: TrainableClassifier + ?Sized> TrainableClassifier for Box<C> {
    fn fit(&mut self, features: ArrayView2<'_, f64>, labels: &[u8]) -> Result<(), ClassifierError> {
        (**self).fit(features, labels)
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>, ClassifierError> {
        (**self).predict(features)
    }
}

/// Shared input checks for the bundled trainers.
pub(crate) fn check_training_inputs(
    features: ArrayView2<'_, f64>,
    labels: &[u8],
) -> Result<(), ClassifierError> {
    if features.nrows() == 0 || labels.is_empty() {
        return Err(ClassifierError::EmptyTrainingSet);
    }
    if features.nrows() != labels.len() {
        return Err(ClassifierError::MismatchedInputs {
            rows: features.nrows(),
            labels: labels.len(),
        });
    }
    if let Some(&bad) = labels.iter().find(|&&label| label > 1) {
        return Err(ClassifierError::InvalidLabel(bad));
    }
    let positives = labels.iter().filter(|&&label| label == 1).count();
    if positives == 0 || positives == labels.len() {
        return Err(ClassifierError::SingleClass);
    }
    if features.iter().any(|v| !v.is_finite()) {
        return Err(ClassifierError::NonFinite);
    }
    Ok(())
}

/// Per-class sample weights; balanced weights are `n / (2 * count)`.
pub(crate) fn class_weights(labels: &[u8], balance: bool) -> [f64; 2] {
    if !balance {
        return [1.0, 1.0];
    }
    let positives = labels.iter().filter(|&&label| label == 1).count() as f64;
    let negatives = labels.len() as f64 - positives;
    let total = labels.len() as f64;
    let weight = |count: f64| if count == 0.0 { 0.0 } else { total / (2.0 * count) };
    [weight(negatives), weight(positives)]
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
