//! Top-level configuration for a calibration analysis run.

use std::path::Path;

use anyhow::Result;
use calib_backtest::{BacktestConfig, CalibrationConfig, CrossValidationConfig, RollingConfig};
use calib_core::{ClassifierConfig, ConfigLoader, StatisticsConfig};
use calib_data::DataConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Every section of the configuration file.
///
/// ```toml
/// [data]
/// markets_path = "data/markets.csv"
/// prices_path = "data/prices.csv"
///
/// [statistics]
/// seed = 7
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub data: DataConfig,
    pub calibration: CalibrationConfig,
    pub backtest: BacktestConfig,
    pub statistics: StatisticsConfig,
    pub cross_validation: CrossValidationConfig,
    pub rolling: RollingConfig,
    pub classifier: ClassifierConfig,
}

impl AnalysisConfig {
    /// Defaults, then the optional file, then `CALIB_` environment
    /// variables.
    ///
    /// # Errors
    /// Returns an error if a named file is missing or any layer fails to
    /// parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: Self = ConfigLoader::load(path)?;
        debug!(
            markets = %config.data.markets_path.display(),
            prices = %config.data.prices_path.display(),
            seed = config.statistics.seed,
            "Loaded configuration"
        );
        Ok(config)
    }
}
