//! Library exports for the cross-validation engine, its collaborators and the CLIs.
/// Application directory resolution.
pub mod app_dirs;
/// Run configuration loaded from TOML.
pub mod config;
/// Stratified cross-validation, aggregation and reporting.
pub mod cv;
/// Patient records, feature encoding and synthetic cohorts.
pub mod dataset;
/// Tracing setup for binaries.
pub mod logging;
/// Classifiers and binary-classification metrics.
pub mod ml;
