//! Report assembly and the JSON report sink.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use super::aggregate::{AggregatedMetric, MetricName, Stability};
use super::orchestrator::FoldResult;
use crate::config::ConfigSnapshot;
use crate::dataset::DatasetSummary;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Unable to create report directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read report {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to serialize report: {0}")]
    Serialize(serde_json::Error),
    #[error("Invalid report JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Everything needed to interpret and reproduce one cross-validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationReport {
    pub run_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub config: ConfigSnapshot,
    pub dataset: DatasetSummary,
    pub folds: Vec<FoldResult>,
    pub aggregated: BTreeMap<MetricName, AggregatedMetric>,
    pub stability: Stability,
}

/// Combine a finished run into a report stamped with the current UTC time.
///
/// The stability verdict compares the AUC spread with the snapshot's
/// threshold. No I/O happens here.
pub fn assemble(
    config: ConfigSnapshot,
    dataset: DatasetSummary,
    folds: Vec<FoldResult>,
    aggregated: BTreeMap<MetricName, AggregatedMetric>,
) -> CrossValidationReport {
    let auc_std = aggregated
        .get(&MetricName::Auc)
        .map_or(f64::INFINITY, |auc| auc.std);
    let stability = Stability::from_auc_std(auc_std, config.stability_threshold);
    CrossValidationReport {
        run_id: Uuid::new_v4(),
        created_at: OffsetDateTime::now_utc(),
        config,
        dataset,
        folds,
        aggregated,
        stability,
    }
}

/// Write `report` as pretty JSON, creating parent directories as needed.
pub fn write_report(path: &Path, report: &CrossValidationReport) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ReportError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(report).map_err(ReportError::Serialize)?;
    std::fs::write(path, json).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_report(path: &Path) -> Result<CrossValidationReport, ReportError> {
    let text = std::fs::read_to_string(path).map_err(|source| ReportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ReportError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Plain-text summary: one row per fold, then mean and std per metric.
pub fn render_summary(report: &CrossValidationReport) -> String {
    let mut out = String::new();
    let config = &report.config;
    let _ = writeln!(
        out,
        "Run {} | {} folds | seed {} | target {} | classifier {}",
        report.run_id,
        config.folds,
        config.seed,
        config.target,
        config.classifier.kind.as_str()
    );
    let _ = writeln!(
        out,
        "Dataset: {} samples, {} features, {} positive / {} negative",
        report.dataset.samples,
        report.dataset.features,
        report.dataset.positives,
        report.dataset.negatives
    );
    let _ = writeln!(out);

    let _ = write!(out, "{:<6}{:>7}{:>7}", "fold", "train", "test");
    for name in MetricName::ALL {
        let _ = write!(out, "{:>13}", name.as_str());
    }
    let _ = writeln!(out);
    for fold in &report.folds {
        let _ = write!(
            out,
            "{:<6}{:>7}{:>7}",
            fold.fold, fold.train_size, fold.test_size
        );
        for name in MetricName::ALL {
            let _ = write!(out, "{:>13.4}", name.value(&fold.metrics));
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out);
    for (name, metric) in &report.aggregated {
        let _ = writeln!(
            out,
            "{:<12} {:.4} ± {:.4}",
            name.as_str(),
            metric.mean,
            metric.std
        );
    }
    let _ = writeln!(
        out,
        "\nStability: {} (AUC std threshold {})",
        report.stability, config.stability_threshold
    );
    out
}
