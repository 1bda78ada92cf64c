//! TOML run configuration.
//!
//! Every field has a default, so an empty or partial `riskfold.toml` is valid.
//! Command-line flags are applied on top of the loaded values.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;
use crate::cv::DEFAULT_STABILITY_THRESHOLD;
use crate::dataset::Target;
use crate::ml::TrainableClassifier;
use crate::ml::logreg::{self, LogRegClassifier};
use crate::ml::metrics::DEFAULT_DECISION_THRESHOLD;
use crate::ml::mlp::{self, MlpClassifier};

pub const CONFIG_FILE_NAME: &str = "riskfold.toml";

/// Errors that may occur while loading, validating or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
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
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error(transparent)]
    AppDir(#[from] app_dirs::AppDirError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    LogReg,
    #[default]
    Mlp,
}

impl ClassifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassifierKind::LogReg => "logreg",
            ClassifierKind::Mlp => "mlp",
        }
    }
}

impl std::str::FromStr for ClassifierKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "logreg" => Ok(ClassifierKind::LogReg),
            "mlp" => Ok(ClassifierKind::Mlp),
            other => Err(format!("Unknown classifier {other} (expected logreg or mlp)")),
        }
    }
}

/// Hyperparameters shared by both classifier kinds; `hidden_size` and
/// `dropout` only apply to the MLP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub kind: ClassifierKind,
    pub hidden_size: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2_penalty: f64,
    pub batch_size: usize,
    pub dropout: f64,
    pub balance_classes: bool,
    pub seed: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let defaults = mlp::TrainOptions::default();
        Self {
            kind: ClassifierKind::default(),
            hidden_size: defaults.hidden_size,
            epochs: defaults.epochs,
            learning_rate: defaults.learning_rate,
            l2_penalty: defaults.l2_penalty,
            batch_size: defaults.batch_size,
            dropout: defaults.dropout,
            balance_classes: defaults.balance_classes,
            seed: defaults.seed,
        }
    }
}

impl ClassifierConfig {
    /// A new untrained classifier. Called once per fold.
    pub fn build(&self) -> Box<dyn TrainableClassifier> {
        match self.kind {
            ClassifierKind::LogReg => Box::new(LogRegClassifier::new(logreg::TrainOptions {
                epochs: self.epochs,
                learning_rate: self.learning_rate,
                l2: self.l2_penalty,
                batch_size: self.batch_size,
                seed: self.seed,
                balance_classes: self.balance_classes,
            })),
            ClassifierKind::Mlp => Box::new(MlpClassifier::new(mlp::TrainOptions {
                hidden_size: self.hidden_size,
                epochs: self.epochs,
                batch_size: self.batch_size,
                learning_rate: self.learning_rate,
                l2_penalty: self.l2_penalty,
                dropout: self.dropout,
                balance_classes: self.balance_classes,
                seed: self.seed,
            })),
        }
    }
}

/// Settings for one cross-validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CvConfig {
    pub folds: usize,
    /// Seeds the fold shuffle; the classifier has its own seed.
    pub seed: u64,
    pub stability_threshold: f64,
    pub target: Target,
    /// Decision threshold applied to predicted probabilities.
    pub threshold: f64,
    pub classifier: ClassifierConfig,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            folds: 5,
            seed: 42,
            stability_threshold: DEFAULT_STABILITY_THRESHOLD,
            target: Target::default(),
            threshold: DEFAULT_DECISION_THRESHOLD,
            classifier: ClassifierConfig::default(),
        }
    }
}

/// Configuration values recorded in a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub folds: usize,
    pub seed: u64,
    pub stability_threshold: f64,
    pub target: Target,
    pub decision_threshold: f64,
    pub classifier: ClassifierConfig,
}

impl CvConfig {
    /// Reject values no run could succeed with.
    ///
    /// Whether `folds` fits the class counts is only known once the dataset is
    /// loaded and is checked by the partitioner.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.folds < 2 {
            return Err(invalid("folds", format!("must be at least 2, got {}", self.folds)));
        }
        if !self.stability_threshold.is_finite() || self.stability_threshold <= 0.0 {
            return Err(invalid(
                "stability_threshold",
                format!("must be positive, got {}", self.stability_threshold),
            ));
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 || self.threshold > 1.0 {
            return Err(invalid(
                "threshold",
                format!("must be in (0, 1], got {}", self.threshold),
            ));
        }
        let classifier = &self.classifier;
        if classifier.epochs == 0 {
            return Err(invalid("classifier.epochs", "must be positive".to_string()));
        }
        if classifier.batch_size == 0 {
            return Err(invalid("classifier.batch_size", "must be positive".to_string()));
        }
        if classifier.kind == ClassifierKind::Mlp && classifier.hidden_size == 0 {
            return Err(invalid("classifier.hidden_size", "must be positive".to_string()));
        }
        if !classifier.learning_rate.is_finite() || classifier.learning_rate <= 0.0 {
            return Err(invalid(
                "classifier.learning_rate",
                format!("must be positive, got {}", classifier.learning_rate),
            ));
        }
        if !classifier.l2_penalty.is_finite() || classifier.l2_penalty < 0.0 {
            return Err(invalid(
                "classifier.l2_penalty",
                format!("must be non-negative, got {}", classifier.l2_penalty),
            ));
        }
        if !(0.0..1.0).contains(&classifier.dropout) {
            return Err(invalid(
                "classifier.dropout",
                format!("must be in [0, 1), got {}", classifier.dropout),
            ));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            folds: self.folds,
            seed: self.seed,
            stability_threshold: self.stability_threshold,
            target: self.target,
            decision_threshold: self.threshold,
            classifier: self.classifier.clone(),
        }
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

/// Default config location inside the app directory.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load and validate configuration from `path`.
pub fn load_config(path: &Path) -> Result<CvConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: CvConfig = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Load `riskfold.toml` from the app directory, or defaults when it does not exist.
pub fn load_or_default() -> Result<CvConfig, ConfigError> {
    let path = config_path()?;
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(CvConfig::default());
    }
    load_config(&path)
}

/// Write `config` as TOML, creating parent directories as needed.
///
/// The file is written next to its destination and renamed into place so a
/// crash never leaves a truncated config behind.
pub fn save_config(path: &Path, config: &CvConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    let tmp_path = path.with_extension("toml.tmp");
    let write_err = |source| ConfigError::Write {
        path: tmp_path.clone(),
        source,
    };
    let mut file = std::fs::File::create(&tmp_path).map_err(write_err)?;
    file.write_all(data.as_bytes()).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;
    drop(file);
    std::fs::rename(&tmp_path, path).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "folds = 10\n\n[classifier]\nkind = \"logreg\"\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.folds, 10);
        assert_eq!(config.seed, 42);
        assert_eq!(config.stability_threshold, 0.05);
        assert_eq!(config.classifier.kind, ClassifierKind::LogReg);
        assert_eq!(config.classifier.epochs, 200);
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        let config = CvConfig {
            folds: 3,
            seed: 99,
            target: Target::Mortality,
            ..CvConfig::default()
        };
        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn rejects_invalid_values() {
        let single_fold = CvConfig {
            folds: 1,
            ..CvConfig::default()
        };
        assert!(matches!(
            single_fold.validate(),
            Err(ConfigError::Invalid { field: "folds", .. })
        ));
        let mut no_epochs = CvConfig::default();
        no_epochs.classifier.epochs = 0;
        assert!(matches!(
            no_epochs.validate(),
            Err(ConfigError::Invalid {
                field: "classifier.epochs",
                ..
            })
        ));
        let zero_threshold = CvConfig {
            stability_threshold: 0.0,
            ..CvConfig::default()
        };
        assert!(zero_threshold.validate().is_err());
        assert!(CvConfig::default().validate().is_ok());
    }

    #[test]
    fn malformed_toml_names_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "folds = \"many\"").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn builds_the_configured_classifier() {
        use ndarray::array;
        let features = array![[-2.0], [-1.5], [-1.0], [1.0], [1.5], [2.0]];
        let labels = [0, 0, 0, 1, 1, 1];
        for kind in [ClassifierKind::LogReg, ClassifierKind::Mlp] {
            let config = ClassifierConfig {
                kind,
                batch_size: 2,
                ..ClassifierConfig::default()
            };
            let mut classifier = config.build();
            classifier.fit(features.view(), &labels).unwrap();
            let probabilities = classifier.predict(features.view()).unwrap();
            assert!(probabilities[0] < probabilities[5], "{kind:?}");
        }
    }
}
