use ndarray::ArrayView2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, seq::SliceRandom};

use super::MlpModel;
use crate::ml::classifier::{ClassifierError, check_training_inputs, class_weights, sigmoid};

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub hidden_size: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub l2_penalty: f64,
    pub dropout: f64,
    pub balance_classes: bool,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            hidden_size: 16,
            epochs: 200,
            batch_size: 32,
            learning_rate: 0.05,
            l2_penalty: 1e-4,
            dropout: 0.1,
            balance_classes: true,
            seed: 7,
        }
    }
}

/// Fit the MLP with seeded mini-batch SGD on binary cross-entropy.
pub fn train_mlp(
    features: ArrayView2<'_, f64>,
    labels: &[u8],
    options: &TrainOptions,
) -> Result<MlpModel, ClassifierError> {
    check_training_inputs(features, labels)?;
    let d = features.ncols();
    let hidden = options.hidden_size.max(1);
    let batch_size = options.batch_size.max(1);
    let dropout = options.dropout.clamp(0.0, 0.9);

    let mut rng = StdRng::seed_from_u64(options.seed);
    // Uniform in +-sqrt(6 / fan_in).
    let scale1 = (6.0 / d as f64).sqrt();
    let scale2 = (6.0 / hidden as f64).sqrt();
    let mut weights1: Vec<f64> = (0..hidden * d)
        .map(|_| (rng.random::<f64>() * 2.0 - 1.0) * scale1)
        .collect();
    let mut bias1 = vec![0.0f64; hidden];
    let mut weights2: Vec<f64> = (0..hidden)
        .map(|_| (rng.random::<f64>() * 2.0 - 1.0) * scale2)
        .collect();
    let mut bias2 = 0.0f64;

    let class_weights = class_weights(labels, options.balance_classes);
    let mut indices: Vec<usize> = (0..labels.len()).collect();
    let mut hidden_pre = vec![0.0f64; hidden];
    let mut hidden_act = vec![0.0f64; hidden];

    for _epoch in 0..options.epochs {
        indices.shuffle(&mut rng);
        for batch in indices.chunks(batch_size) {
            let mut d_w1 = vec![0.0f64; weights1.len()];
            let mut d_b1 = vec![0.0f64; hidden];
            let mut d_w2 = vec![0.0f64; hidden];
            let mut d_b2 = 0.0f64;
            let mut batch_weight = 0.0f64;

            for &idx in batch {
                let y = labels[idx];
                let weight = class_weights[usize::from(y)];
                if weight == 0.0 {
                    continue;
                }
                let x = features.row(idx);

                let mut logit = bias2;
                for h in 0..hidden {
                    let base = h * d;
                    let mut sum = bias1[h];
                    for (i, xi) in x.iter().enumerate() {
                        sum += weights1[base + i] * xi;
                    }
                    hidden_pre[h] = sum;
                    let mut act = sum.max(0.0);
                    if dropout > 0.0 {
                        if rng.random::<f64>() < dropout {
                            act = 0.0;
                        } else {
                            act /= 1.0 - dropout;
                        }
                    }
                    hidden_act[h] = act;
                    logit += weights2[h] * act;
                }

                let dz = (sigmoid(logit) - f64::from(y)) * weight;
                d_b2 += dz;
                for h in 0..hidden {
                    d_w2[h] += dz * hidden_act[h];
                    // Dropped units have zero activation and pass no gradient.
                    if hidden_pre[h] <= 0.0 || hidden_act[h] == 0.0 {
                        continue;
                    }
                    let dh = dz * weights2[h] * (hidden_act[h] / hidden_pre[h]);
                    d_b1[h] += dh;
                    let base = h * d;
                    for (i, xi) in x.iter().enumerate() {
                        d_w1[base + i] += dh * xi;
                    }
                }
                batch_weight += weight;
            }

            if batch_weight == 0.0 {
                continue;
            }
            let step = options.learning_rate / batch_weight;
            let l2 = options.l2_penalty.max(0.0);
            for (w, g) in weights1.iter_mut().zip(&d_w1) {
                *w -= step * g + options.learning_rate * l2 * *w;
            }
            for (b, g) in bias1.iter_mut().zip(&d_b1) {
                *b -= step * g;
            }
            for (w, g) in weights2.iter_mut().zip(&d_w2) {
                *w -= step * g + options.learning_rate * l2 * *w;
            }
            bias2 -= step * d_b2;
        }
    }

    let model = MlpModel {
        feature_len: d,
        hidden_size: hidden,
        weights1,
        bias1,
        weights2,
        bias2,
    };
    model.validate()?;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Two bands separated by a margin along `x0 + x1`.
    fn banded() -> (Array2<f64>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..50 {
            let t = i as f64 / 50.0 * 2.0 - 1.0;
            rows.extend_from_slice(&[t, -t - 1.0]);
            labels.push(0);
            rows.extend_from_slice(&[t, -t + 1.0]);
            labels.push(1);
        }
        (Array2::from_shape_vec((100, 2), rows).unwrap(), labels)
    }

    #[test]
    fn separates_banded_classes() {
        let (x, y) = banded();
        let options = TrainOptions {
            dropout: 0.0,
            ..TrainOptions::default()
        };
        let model = train_mlp(x.view(), &y, &options).unwrap();
        let correct = x
            .rows()
            .into_iter()
            .zip(&y)
            .filter(|(row, label)| {
                let p = model.predict_proba(&row.to_vec());
                (p >= 0.5) == (**label == 1)
            })
            .count();
        assert!(correct >= 95, "only {correct}/100 correct");
    }

    #[test]
    fn training_is_reproducible_for_a_seed() {
        let (x, y) = banded();
        let options = TrainOptions {
            epochs: 5,
            ..TrainOptions::default()
        };
        let a = train_mlp(x.view(), &y, &options).unwrap();
        let b = train_mlp(x.view(), &y, &options).unwrap();
        assert_eq!(a.weights1, b.weights1);
        assert_eq!(a.weights2, b.weights2);
    }
}
