use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

use super::train::{TrainOptions, train_mlp};
use crate::ml::classifier::{ClassifierError, TrainableClassifier, sigmoid};

/// One ReLU hidden layer feeding a single sigmoid output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpModel {
    pub feature_len: usize,
    pub hidden_size: usize,
    /// Row-major `hidden x feature_len`.
    pub weights1: Vec<f64>,
    pub bias1: Vec<f64>,
    pub weights2: Vec<f64>,
    pub bias2: f64,
}

impl MlpModel {
    pub fn validate(&self) -> Result<(), ClassifierError> {
        let input = self.feature_len;
        let hidden = self.hidden_size;
        if self.weights1.len() != input * hidden
            || self.bias1.len() != hidden
            || self.weights2.len() != hidden
        {
            return Err(ClassifierError::Other("MLP layer size mismatch".to_string()));
        }
        let finite = self
            .weights1
            .iter()
            .chain(&self.bias1)
            .chain(&self.weights2)
            .all(|v| v.is_finite());
        if !finite || !self.bias2.is_finite() {
            return Err(ClassifierError::Diverged);
        }
        Ok(())
    }

    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        let input = self.feature_len;
        let mut logit = self.bias2;
        for h in 0..self.hidden_size {
            let base = h * input;
            let mut sum = self.bias1[h];
            for i in 0..input {
                sum += self.weights1[base + i] * features[i];
            }
            logit += self.weights2[h] * sum.max(0.0);
        }
        sigmoid(logit)
    }
}

/// [`TrainableClassifier`] wrapper that trains an [`MlpModel`] on `fit`.
#[derive(Debug, Clone, Default)]
pub struct MlpClassifier {
    options: TrainOptions,
    model: Option<MlpModel>,
}

impl MlpClassifier {
    pub fn new(options: TrainOptions) -> Self {
        Self {
            options,
            model: None,
        }
    }

    pub fn model(&self) -> Option<&MlpModel> {
        self.model.as_ref()
    }
}

impl TrainableClassifier for MlpClassifier {
    fn fit(&mut self, features: ArrayView2<'_, f64>, labels: &[u8]) -> Result<(), ClassifierError> {
        self.model = Some(train_mlp(features, labels, &self.options)?);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_weights_predict_one_half() {
        let model = MlpModel {
            feature_len: 4,
            hidden_size: 2,
            weights1: vec![0.0; 8],
            bias1: vec![0.0; 2],
            weights2: vec![0.0; 2],
            bias2: 0.0,
        };
        model.validate().unwrap();
        assert!((model.predict_proba(&[1.0, 2.0, 3.0, 4.0]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn validate_catches_mismatched_layers() {
        let model = MlpModel {
            feature_len: 4,
            hidden_size: 2,
            weights1: vec![0.0; 7],
            bias1: vec![0.0; 2],
            weights2: vec![0.0; 2],
            bias2: 0.0,
        };
        assert!(model.validate().is_err());
    }
}
