//! Cross-fold mean, spread and stability verdict.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::CvError;
use super::orchestrator::FoldResult;
use crate::ml::BinaryMetrics;

/// AUC standard deviation below which a run is reported as stable.
pub const DEFAULT_STABILITY_THRESHOLD: f64 = 0.05;

/// Per-fold scores that are summarized across folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    Accuracy,
    Precision,
    Recall,
    Specificity,
    F1,
    Auc,
}

impl MetricName {
    pub const ALL: [MetricName; 6] = [
        MetricName::Accuracy,
        MetricName::Precision,
        MetricName::Recall,
        MetricName::Specificity,
        MetricName::F1,
        MetricName::Auc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricName::Accuracy => "accuracy",
            MetricName::Precision => "precision",
            MetricName::Recall => "recall",
            MetricName::Specificity => "specificity",
            MetricName::F1 => "f1",
            MetricName::Auc => "auc",
        }
    }

    pub fn value(self, metrics: &BinaryMetrics) -> f64 {
        match self {
            MetricName::Accuracy => metrics.accuracy,
            MetricName::Precision => metrics.precision,
            MetricName::Recall => metrics.recall,
            MetricName::Specificity => metrics.specificity,
            MetricName::F1 => metrics.f1,
            MetricName::Auc => metrics.auc,
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetric {
    pub mean: f64,
    /// Population standard deviation (divides by the fold count).
    pub std: f64,
    /// Per-fold values in fold order.
    pub values: Vec<f64>,
}

impl AggregatedMetric {
    fn from_values(values: Vec<f64>) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            std: variance.sqrt(),
            values,
        }
    }
}

/// Reporting label for how much AUC moved between folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Stable,
    Variable,
}

impl Stability {
    pub fn from_auc_std(std: f64, threshold: f64) -> Self {
        if std < threshold {
            Stability::Stable
        } else {
            Stability::Variable
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stability::Stable => "stable",
            Stability::Variable => "variable",
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mean and population std of every [`MetricName`] across `results`.
///
/// The statistics do not depend on the order of `results`; only `values`
/// keeps it.
pub fn aggregate(
    results: &[FoldResult],
) -> Result<BTreeMap<MetricName, AggregatedMetric>, CvError> {
    if results.is_empty() {
        return Err(CvError::NoFolds);
    }
    Ok(MetricName::ALL
        .iter()
        .map(|&name| {
            let values = results
                .iter()
                .map(|result| name.value(&result.metrics))
                .collect();
            (name, AggregatedMetric::from_values(values))
        })
        .collect())
}
