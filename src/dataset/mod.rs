//! Labeled feature matrices and the patient records they are built from.

use std::path::PathBuf;

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod encode;
pub mod patients;
pub mod synthetic;

pub use encode::{FEATURE_NAMES, Target, encode_patients};
pub use patients::{PatientRecord, load_patients, save_patients};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid patient JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Dataset has no samples")]
    Empty,
    #[error("Dataset has no feature columns")]
    NoFeatures,
    #[error("Patient {patient_id}: invalid {field}: {reason}")]
    InvalidRecord {
        patient_id: String,
        field: &'static str,
        reason: String,
    },
    #[error("Feature matrix has {rows} rows but {labels} labels were given")]
    ShapeMismatch { rows: usize, labels: usize },
    #[error("Label {value} at row {row} is not 0 or 1")]
    InvalidLabel { row: usize, value: u8 },
    #[error("Non-finite feature at row {row}, column {column}")]
    NonFinite { row: usize, column: usize },
    #[error("Expected {expected} feature names, got {actual}")]
    FeatureNames { expected: usize, actual: usize },
    #[error("Synthetic cohort setup failed: {0}")]
    Synthetic(String),
}

/// A validated binary-labeled feature matrix.
///
/// Every row has the same width, every label is 0 or 1 and every feature is
/// finite. Cross-validation only ever reads it.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Array2<f64>,
    labels: Vec<u8>,
    feature_names: Vec<String>,
}

/// Shape and class balance of a dataset, recorded alongside results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub samples: usize,
    pub features: usize,
    pub positives: usize,
    pub negatives: usize,
    /// blake3 digest of the feature matrix and labels.
    pub fingerprint: String,
}

impl Dataset {
    pub fn new(features: Array2<f64>, labels: Vec<u8>) -> Result<Self, DatasetError> {
        if features.nrows() == 0 {
            return Err(DatasetError::Empty);
        }
        if features.ncols() == 0 {
            return Err(DatasetError::NoFeatures);
        }
        if features.nrows() != labels.len() {
            return Err(DatasetError::ShapeMismatch {
                rows: features.nrows(),
                labels: labels.len(),
            });
        }
        if let Some((row, &value)) = labels.iter().enumerate().find(|(_, l)| **l > 1) {
            return Err(DatasetError::InvalidLabel { row, value });
        }
        if let Some(((row, column), _)) = features.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(DatasetError::NonFinite { row, column });
        }
        let feature_names = (0..features.ncols()).map(|i| format!("x{i}")).collect();
        Ok(Self {
            features,
            labels,
            feature_names,
        })
    }

    pub fn with_feature_names(mut self, names: Vec<String>) -> Result<Self, DatasetError> {
        if names.len() != self.feature_len() {
            return Err(DatasetError::FeatureNames {
                expected: self.feature_len(),
                actual: names.len(),
            });
        }
        self.feature_names = names;
        Ok(self)
    }

    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn feature_len(&self) -> usize {
        self.features.ncols()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&label| label == 1).count()
    }

    pub fn negatives(&self) -> usize {
        self.len() - self.positives()
    }

    /// Materialize the rows at `indices` (in that order) with their labels.
    pub fn subset(&self, indices: &[usize]) -> (Array2<f64>, Vec<u8>) {
        let features = self.features.select(Axis(0), indices);
        let labels = indices.iter().map(|&idx| self.labels[idx]).collect();
        (features, labels)
    }

    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(self.features.nrows() as u64).to_le_bytes());
        hasher.update(&(self.features.ncols() as u64).to_le_bytes());
        for value in self.features.iter() {
            hasher.update(&value.to_le_bytes());
        }
        hasher.update(&self.labels);
        hasher.finalize().to_hex().to_string()
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            samples: self.len(),
            features: self.feature_len(),
            positives: self.positives(),
            negatives: self.negatives(),
            fingerprint: self.fingerprint(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rejects_invalid_shapes_and_values() {
        assert!(matches!(
            Dataset::new(Array2::zeros((0, 2)), vec![]),
            Err(DatasetError::Empty)
        ));
        assert!(matches!(
            Dataset::new(array![[1.0], [2.0]], vec![0]),
            Err(DatasetError::ShapeMismatch { rows: 2, labels: 1 })
        ));
        assert!(matches!(
            Dataset::new(array![[1.0], [2.0]], vec![0, 2]),
            Err(DatasetError::InvalidLabel { row: 1, value: 2 })
        ));
        assert!(matches!(
            Dataset::new(array![[1.0, f64::NAN]], vec![1]),
            Err(DatasetError::NonFinite { row: 0, column: 1 })
        ));
    }

    #[test]
    fn subset_keeps_requested_order() {
        let dataset = Dataset::new(array![[0.0], [1.0], [2.0], [3.0]], vec![0, 1, 0, 1]).unwrap();
        let (x, y) = dataset.subset(&[3, 0]);
        assert_eq!(x, array![[3.0], [0.0]]);
        assert_eq!(y, vec![1, 0]);
        assert_eq!(dataset.positives(), 2);
        assert_eq!(dataset.negatives(), 2);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = Dataset::new(array![[0.0, 1.0], [2.0, 3.0]], vec![0, 1]).unwrap();
        let b = Dataset::new(array![[0.0, 1.0], [2.0, 3.0]], vec![0, 1]).unwrap();
        let c = Dataset::new(array![[0.0, 1.0], [2.0, 3.0]], vec![1, 0]).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }
}
