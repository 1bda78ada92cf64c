use thiserror::Error;

use crate::ml::{ClassifierError, MetricsError};

/// Failures that abort a cross-validation run. No partial report is produced.
#[derive(Debug, Error)]
pub enum CvError {
    /// The requested fold count cannot be honoured for this dataset.
    #[error("Invalid cross-validation configuration: {0}")]
    InvalidConfiguration(String),
    /// A test fold lacks one of the two classes, so AUC is undefined.
    #[error(
        "Fold {fold_index} is degenerate: {positives} positive and {negatives} negative test samples"
    )]
    DegenerateFold {
        fold_index: usize,
        positives: usize,
        negatives: usize,
    },
    #[error("Classifier training failed on fold {fold_index}: {source}")]
    ClassifierTraining {
        fold_index: usize,
        #[source]
        source: ClassifierError,
    },
    #[error("Classifier prediction failed on fold {fold_index}: {source}")]
    ClassifierPrediction {
        fold_index: usize,
        #[source]
        source: ClassifierError,
    },
    #[error("Evaluation failed on fold {fold_index}: {source}")]
    Evaluation {
        fold_index: usize,
        #[source]
        source: MetricsError,
    },
    #[error("No fold results to aggregate")]
    NoFolds,
}

impl CvError {
    /// Fold that failed, when the error is tied to one.
    pub fn fold_index(&self) -> Option<usize> {
        match self {
            CvError::DegenerateFold { fold_index, .. }
            | CvError::ClassifierTraining { fold_index, .. }
            | CvError::ClassifierPrediction { fold_index, .. }
            | CvError::Evaluation { fold_index, .. } => Some(*fold_index),
            CvError::InvalidConfiguration(_) | CvError::NoFolds => None,
        }
    }
}
