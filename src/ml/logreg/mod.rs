//! Binary logistic regression over encoded patient features.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use crate::ml::classifier::{ClassifierError, TrainableClassifier, sigmoid};

mod train;
pub use train::{TrainOptions, train_logreg};

/// Fitted weights of a logistic regression model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRegModel {
    pub feature_len: usize,
    pub weights: Vec<f64>,
    pub bias: f64,
}

impl LogRegModel {
    /// Validate the model dimensions.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if self.weights.len() != self.feature_len {
            return Err(ClassifierError::FeatureCount {
                expected: self.feature_len,
                actual: self.weights.len(),
            });
        }
        if !self.bias.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err(ClassifierError::Diverged);
        }
        Ok(())
    }

    /// Positive-class probability for a single row.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let z = self
            .weights
            .iter()
            .zip(row)
            .fold(self.bias, |acc, (w, x)| acc + w * x);
        sigmoid(z)
    }
}

/// [`TrainableClassifier`] wrapper that trains a [`LogRegModel`] on `fit`.
#[derive(Debug, Clone, Default)]
pub struct LogRegClassifier {
    options: TrainOptions,
    model: Option<LogRegModel>,
}

impl LogRegClassifier {
    pub fn new(options: TrainOptions) -> Self {
        Self {
            options,
            model: None,
        }
    }

    pub fn model(&self) -> Option<&LogRegModel> {
        self.model.as_ref()
    }
}

impl TrainableClassifier for LogRegClassifier {
    fn fit(&mut self, features: ArrayView2<'_, f64>, labels: &[u8]) -> Result<(), ClassifierError> {
        self.model = Some(train_logreg(features, labels, &self.options)?);
        Ok(())
    }

    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<f64>, ClassifierError> {
        let model = self.model.as_ref().ok_or(ClassifierError::NotFitted)?;
        if features.ncols() != model.feature_len {
            return Err(ClassifierError::FeatureCount {
                expected: model.feature_len,
                actual: features.ncols(),
            });
        }
        Ok(features
            .rows()
            .into_iter()
            .map(|row| model.predict_proba(&row.to_vec()))
            .collect())
    }
}
