use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, seq::SliceRandom};

use super::LogRegModel;
use crate::ml::classifier::{ClassifierError, check_training_inputs, class_weights, sigmoid};

/// Training options for the logistic regression baseline.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
    pub batch_size: usize,
    pub seed: u64,
    pub balance_classes: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 200,
            learning_rate: 0.05,
            l2: 1e-4,
            batch_size: 32,
            seed: 7,
            balance_classes: true,
        }
    }
}

/// Fit a logistic regression model with seeded mini-batch gradient descent.
pub fn train_logreg(
    features: ArrayView2<'_, f64>,
    labels: &[u8],
    options: &TrainOptions,
) -> Result<LogRegModel, ClassifierError> {
    check_training_inputs(features, labels)?;
    let dim = features.ncols();

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut weights: Vec<f64> = (0..dim)
        .map(|_| (rng.random::<f64>() - 0.5) * 0.01)
        .collect();
    let mut bias = 0.0f64;

    let mut indices: Vec<usize> = (0..labels.len()).collect();
    let batch_size = options.batch_size.max(1);
    let lr = options.learning_rate;
    let l2 = options.l2.max(0.0);
    let class_weights = class_weights(labels, options.balance_classes);

    for _epoch in 0..options.epochs {
        indices.shuffle(&mut rng);
        for chunk in indices.chunks(batch_size) {
            let mut grad_w = vec![0.0f64; dim];
            let mut grad_b = 0.0f64;
            let mut batch_weight = 0.0f64;
            for &idx in chunk {
                let row = features.row(idx);
                let y = labels[idx];
                let weight = class_weights[usize::from(y)];
                if weight == 0.0 {
                    continue;
                }
                let z = weights
                    .iter()
                    .zip(row.iter())
                    .fold(bias, |acc, (w, x)| acc + w * x);
                let diff = sigmoid(z) - f64::from(y);
                for (g, x) in grad_w.iter_mut().zip(row.iter()) {
                    *g += diff * x * weight;
                }
                grad_b += diff * weight;
                batch_weight += weight;
            }
            if batch_weight == 0.0 {
                continue;
            }
            let inv = 1.0 / batch_weight;
            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= lr * (g * inv + l2 * *w);
            }
            bias -= lr * grad_b * inv;
        }
    }

    let model = LogRegModel {
        feature_len: dim,
        weights,
        bias,
    };
    model.validate()?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn separable() -> (Array2<f64>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let t = i as f64 / 40.0;
            rows.extend_from_slice(&[t - 1.0, 0.3 * t]);
            labels.push(0);
            rows.extend_from_slice(&[t + 0.5, -0.2 * t]);
            labels.push(1);
        }
        (Array2::from_shape_vec((80, 2), rows).unwrap(), labels)
    }

    #[test]
    fn learns_a_separable_boundary() {
        let (x, y) = separable();
        let model = train_logreg(x.view(), &y, &TrainOptions::default()).unwrap();
        assert!(model.predict_proba(&[1.2, 0.0]) > 0.5);
        assert!(model.predict_proba(&[-1.0, 0.0]) < 0.5);
    }

    #[test]
    fn same_seed_gives_identical_weights() {
        let (x, y) = separable();
        let options = TrainOptions {
            epochs: 10,
            ..TrainOptions::default()
        };
        let a = train_logreg(x.view(), &y, &options).unwrap();
        let b = train_logreg(x.view(), &y, &options).unwrap();
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.bias, b.bias);
    }

    #[test]
    fn single_class_training_set_is_rejected() {
        let (x, _) = separable();
        let y = vec![1u8; x.nrows()];
        let err = train_logreg(x.view(), &y, &TrainOptions::default()).unwrap_err();
        assert_eq!(err, ClassifierError::SingleClass);
    }
}
