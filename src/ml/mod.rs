//! Binary risk classifiers and the metrics used to score them.
//!
//! `classifier` defines the fit/predict seam that cross-validation drives;
//! `logreg` and `mlp` are small seeded baselines that implement it.

pub mod classifier;
pub mod logreg;
pub mod metrics;
pub mod mlp;

pub use classifier::{ClassifierError, TrainableClassifier};
pub use metrics::{BinaryMetrics, ConfusionMatrix, MetricsEngine, MetricsError};
