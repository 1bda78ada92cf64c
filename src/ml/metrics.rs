//! Evaluation metrics for binary risk classifiers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Probability at or above which a prediction counts as positive.
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

/// Reasons a set of held-out predictions cannot be scored.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("No predictions to evaluate")]
    Empty,
    #[error("Got {predictions} predictions for {labels} labels")]
    LengthMismatch { predictions: usize, labels: usize },
    #[error("Label {value} at index {index} is not 0 or 1")]
    InvalidLabel { index: usize, value: u8 },
    #[error("Decision threshold {0} is not in [0, 1]")]
    InvalidThreshold(f64),
    #[error("Score {value} at index {index} is not a probability in [0, 1]")]
    InvalidProbability { index: usize, value: f64 },
    /// AUC needs at least one sample of each class.
    #[error("AUC is undefined with {positives} positive and {negatives} negative samples")]
    MissingClass { positives: usize, negatives: usize },
}

/// 2x2 confusion counts at a fixed decision threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: u32,
    pub fp: u32,
    pub tn: u32,
    #[serde(rename = "fn")]
    pub fn_: u32,
}

impl ConfusionMatrix {
    pub fn add(&mut self, truth: bool, predicted: bool) {
        let cell = match (truth, predicted) {
            (true, true) => &mut self.tp,
            (false, true) => &mut self.fp,
            (false, false) => &mut self.tn,
            (true, false) => &mut self.fn_,
        };
        *cell = cell.saturating_add(1);
    }

    pub fn total(&self) -> u32 {
        self.tp + self.fp + self.tn + self.fn_
    }

    /// `(TP + TN) / total`.
    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// `TP / (TP + FP)`, 0 when nothing was predicted positive.
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// `TP / (TP + FN)`, 0 when there are no positives.
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// `TN / (TN + FP)`, 0 when there are no negatives.
    pub fn specificity(&self) -> f64 {
        ratio(self.tn, self.tn + self.fp)
    }

    /// Harmonic mean of precision and recall, 0 when both are 0.
    pub fn f1(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }
}

fn ratio(num: u32, den: u32) -> f64 {
    if den == 0 {
        0.0
    } else {
        f64::from(num) / f64::from(den)
    }
}

/// Scores for one set of held-out predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryMetrics {
    pub confusion: ConfusionMatrix,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub specificity: f64,
    pub f1: f64,
    pub auc: f64,
}

/// Turns predicted probabilities and true labels into [`BinaryMetrics`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsEngine {
    threshold: f64,
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DECISION_THRESHOLD,
        }
    }
}

impl MetricsEngine {
    /// Engine that calls a prediction positive at or above `threshold`.
    pub fn new(threshold: f64) -> Result<Self, MetricsError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(MetricsError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score `probabilities` against `labels`.
    ///
    /// Both slices must have the same non-zero length and the labels must
    /// contain both classes; otherwise AUC is undefined and an error is
    /// returned rather than a placeholder value.
    pub fn evaluate(
        &self,
        probabilities: &[f64],
        labels: &[u8],
    ) -> Result<BinaryMetrics, MetricsError> {
        check_inputs(probabilities, labels)?;
        if let Some((index, &value)) = probabilities
            .iter()
            .enumerate()
            .find(|(_, p)| !(0.0..=1.0).contains(*p))
        {
            return Err(MetricsError::InvalidProbability { index, value });
        }

        let mut confusion = ConfusionMatrix::default();
        for (&p, &label) in probabilities.iter().zip(labels) {
            confusion.add(label == 1, p >= self.threshold);
        }
        let auc = roc_auc(probabilities, labels)?;

        Ok(BinaryMetrics {
            confusion,
            accuracy: confusion.accuracy(),
            precision: confusion.precision(),
            recall: confusion.recall(),
            specificity: confusion.specificity(),
            f1: confusion.f1(),
            auc,
        })
    }
}

/// Area under the ROC curve via the Mann-Whitney rank-sum statistic.
///
/// Scores are ranked in ascending order (rank 1 is the lowest score) and tied
/// scores share the mean of the ranks they span, so the result equals the
/// probability that a random positive outscores a random negative, counting
/// ties as one half. Any finite scores are accepted; only their order matters.
pub fn roc_auc(scores: &[f64], labels: &[u8]) -> Result<f64, MetricsError> {
    check_inputs(scores, labels)?;
    if let Some((index, &value)) = scores.iter().enumerate().find(|(_, s)| !s.is_finite()) {
        return Err(MetricsError::InvalidProbability { index, value });
    }
    let positives = labels.iter().filter(|&&label| label == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(MetricsError::MissingClass {
            positives,
            negatives,
        });
    }

    let ranks = midranks(scores);
    let rank_sum: f64 = ranks
        .iter()
        .zip(labels)
        .filter(|&(_, &label)| label == 1)
        .map(|(rank, _)| rank)
        .sum();
    let p = positives as f64;
    let n = negatives as f64;
    Ok((rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// 1-based ascending ranks, averaging over runs of equal scores.
fn midranks(scores: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Positions start..end hold ranks start+1..=end.
        let shared = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = shared;
        }
        start = end;
    }
    ranks
}

fn check_inputs(scores: &[f64], labels: &[u8]) -> Result<(), MetricsError> {
    if scores.len() != labels.len() {
        return Err(MetricsError::LengthMismatch {
            predictions: scores.len(),
            labels: labels.len(),
        });
    }
    if scores.is_empty() {
        return Err(MetricsError::Empty);
    }
    if let Some((index, &value)) = labels.iter().enumerate().find(|(_, l)| **l > 1) {
        return Err(MetricsError::InvalidLabel { index, value });
    }
    Ok(())
}
