//! Stratified K-fold cross-validation.
//!
//! [`folds::partition`] splits labels into class-balanced folds,
//! [`orchestrator::run`] trains and scores a fresh classifier per fold,
//! [`aggregate::aggregate`] summarizes the per-fold metrics and
//! [`report::assemble`] packages everything for a report sink.

pub mod aggregate;
mod error;
pub mod folds;
pub mod orchestrator;
pub mod report;

pub use aggregate::{
    AggregatedMetric, DEFAULT_STABILITY_THRESHOLD, MetricName, Stability, aggregate,
};
pub use error::CvError;
pub use folds::{Fold, partition};
pub use orchestrator::{FoldResult, run, run_with_folds};
pub use report::{
    CrossValidationReport, ReportError, assemble, read_report, render_summary, write_report,
};
