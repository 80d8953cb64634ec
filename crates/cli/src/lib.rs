//! Command implementations behind the `calib` binary.
//!
//! Each analysis step loads the dataset through an [`AnalysisContext`],
//! writes one JSON report and returns its result so the steps can be
//! chained by `run-all` or driven from tests.

pub mod commands;
pub mod config;

pub use commands::AnalysisContext;
pub use config::AnalysisConfig;
