//! CLI commands for the calibration bias toolkit.

pub mod backtest;
pub mod calibration;
pub mod concentration;
pub mod cross_validate;
pub mod disputes;
pub mod heatmap;
pub mod rolling;
pub mod run_all;
pub mod significance;
pub mod summary;

pub use backtest::{run_backtest, BacktestReport};
pub use calibration::run_calibration;
pub use concentration::run_concentration;
pub use cross_validate::run_cross_validate;
pub use disputes::{run_disputes, DisputeReport};
pub use heatmap::{run_heatmap, HeatmapArgs, HeatmapReport};
pub use rolling::run_rolling;
pub use run_all::run_all;
pub use significance::{run_significance, SignificanceArgs, SignificanceReport};
pub use summary::{run_summary, DatasetSummary};

use anyhow::{anyhow, Result};
use calib_backtest::{BacktestEngine, CalibrationEstimator};
use calib_core::Horizon;
use calib_data::{CalibrationSample, LoadReport, MarketDataset, ReportWriter};
use tracing::{info, warn};

use crate::config::AnalysisConfig;

const RULE: &str = "===============================================================\n";
const THIN_RULE: &str = "---------------------------------------------------------------\n";

/// Configuration, loaded dataset and report writer shared by every command.
pub struct AnalysisContext {
    pub config: AnalysisConfig,
    pub dataset: MarketDataset,
    pub load_report: LoadReport,
    pub writer: ReportWriter,
}

impl AnalysisContext {
    /// Loads the dataset named in `config` and prepares the output
    /// directory.
    ///
    /// # Errors
    /// Returns an error if the input files cannot be read or the output
    /// directory cannot be created.
    pub fn load(config: AnalysisConfig) -> Result<Self> {
        let classifier = config.classifier.classifier();
        let (dataset, load_report) = MarketDataset::load(&config.data, &classifier)?;
        if load_report.markets_skipped() > 0 || load_report.observations_skipped() > 0 {
            warn!(
                markets = ?load_report.skipped_markets,
                observations = ?load_report.skipped_observations,
                "Skipped invalid rows"
            );
        }
        if dataset.is_empty() {
            warn!("Dataset has no resolved markets");
        }
        let writer = ReportWriter::new(&config.data.output_dir)?;
        info!(
            markets = dataset.len(),
            run_id = %writer.run_id(),
            output = %config.data.output_dir.display(),
            "Dataset loaded"
        );
        Ok(Self {
            config,
            dataset,
            load_report,
            writer,
        })
    }

    /// # Errors
    /// Returns an error if the bucket scheme is invalid.
    pub fn estimator(&self) -> Result<CalibrationEstimator> {
        Ok(self.config.calibration.estimator()?)
    }

    /// # Errors
    /// Returns an error if the bucket scheme is invalid.
    pub fn engine(&self) -> Result<BacktestEngine> {
        Ok(BacktestEngine::new(self.config.backtest.clone(), self.estimator()?))
    }

    /// The configured analysis horizon, or the configured horizon labelled
    /// `label`.
    ///
    /// # Errors
    /// Returns an error if no configured horizon has that label.
    pub fn horizon(&self, label: Option<&str>) -> Result<Horizon> {
        let calibration = &self.config.calibration;
        let Some(label) = label else {
            return Ok(calibration.analysis_horizon.clone());
        };
        if calibration.analysis_horizon.label == label {
            return Ok(calibration.analysis_horizon.clone());
        }
        calibration
            .horizons
            .iter()
            .find(|h| h.label == label)
            .cloned()
            .ok_or_else(|| {
                let known: Vec<&str> = calibration.horizons.iter().map(|h| h.label.as_str()).collect();
                anyhow!("Unknown horizon '{}'. Configured horizons: {}", label, known.join(", "))
            })
    }

    /// Snapshot samples at the chosen horizon.
    ///
    /// # Errors
    /// Returns an error for an unknown horizon label.
    pub fn samples(&self, label: Option<&str>) -> Result<(Horizon, Vec<CalibrationSample>)> {
        let horizon = self.horizon(label)?;
        let samples = self.dataset.horizon_samples(&horizon);
        info!(horizon = %horizon.label, samples = samples.len(), "Collected snapshot samples");
        Ok((horizon, samples))
    }
}

fn header(out: &mut String, title: &str) {
    out.push('\n');
    out.push_str(RULE);
    out.push_str(&format!("{title:^63}\n"));
    out.push_str(RULE);
}

fn section(out: &mut String, title: &str) {
    out.push('\n');
    out.push_str(title);
    out.push('\n');
    out.push_str(THIN_RULE);
}

fn footer(out: &mut String, writer: &ReportWriter, path: &std::path::Path) {
    out.push('\n');
    out.push_str(RULE);
    out.push_str(&format!("Report: {}\n", path.display()));
    out.push_str(&format!("Run ID: {}\n", writer.run_id()));
}

/// `-` for a missing value.
fn opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.decimals$}"))
}

/// Signed percentage points, `-` when missing.
fn pp(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:+.1}pp"))
}
