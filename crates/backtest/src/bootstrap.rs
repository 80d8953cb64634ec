//! Bootstrap confidence intervals for scalar statistics.
//!
//! Resampling is always seeded. Samples with fewer than two elements are
//! rejected, since the resampled distribution of a single value carries no
//! information about its spread.
//!
//! # Example
//!
//! ```
//! use calib_backtest::bootstrap::{BootstrapConfig, BootstrapResampler};
//!
//! let resampler = BootstrapResampler::new(BootstrapConfig::new(2_000, 0.95, 7));
//! let sample = [0.1, -0.2, 0.4, 0.0, 0.3];
//! let result = resampler.bootstrap_mean(&sample).unwrap();
//!
//! assert!(result.ci_lower <= result.point_estimate);
//! assert!(result.point_estimate <= result.ci_upper);
//! ```

use calib_core::validation::{mean, std_dev};
use calib_core::{StatisticsConfig, StatsError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::Trade;

/// Resample count, interval level and seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// Resamples drawn per estimate.
    pub n_iterations: usize,
    /// Interval coverage in (0, 1), e.g. 0.95.
    pub confidence_level: f64,
    pub seed: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self::from(&StatisticsConfig::default())
    }
}

impl From<&StatisticsConfig> for BootstrapConfig {
    fn from(config: &StatisticsConfig) -> Self {
        Self::new(config.bootstrap_iterations, config.confidence_level, config.seed)
    }
}

impl BootstrapConfig {
    #[must_use]
    pub fn new(n_iterations: usize, confidence_level: f64, seed: u64) -> Self {
        Self {
            n_iterations,
            confidence_level,
            seed,
        }
    }

    fn validate(&self) -> Result<(), StatsError> {
        if self.n_iterations == 0 {
            return Err(StatsError::InvalidParameter {
                name: "n_iterations",
                reason: "must be positive".to_string(),
            });
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(StatsError::InvalidParameter {
                name: "confidence_level",
                reason: format!("{} is not in (0, 1)", self.confidence_level),
            });
        }
        Ok(())
    }
}

/// Percentile interval around a statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapResult {
    /// Statistic on the original sample.
    pub point_estimate: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    /// Standard deviation of the resampled statistic.
    pub standard_error: f64,
    /// Resampled mean minus the point estimate.
    pub bias: f64,
    pub sample_size: usize,
    pub n_iterations: usize,
    /// Full bootstrap distribution (sorted). Left out of reports.
    #[serde(skip)]
    pub distribution: Vec<f64>,
}

impl BootstrapResult {
    #[must_use]
    pub fn ci_width(&self) -> f64 {
        self.ci_upper - self.ci_lower
    }

    /// Zero lies outside the interval.
    #[must_use]
    pub fn is_significant(&self) -> bool {
        self.ci_lower > 0.0 || self.ci_upper < 0.0
    }
}

/// Bootstrap resampler.
#[derive(Debug, Clone)]
pub struct BootstrapResampler {
    config: BootstrapConfig,
}

impl BootstrapResampler {
    #[must_use]
    pub fn new(config: BootstrapConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// Generic bootstrap method for any statistic over any sample.
    ///
    /// Statistics that come out non-finite on a resample (e.g. a ratio over
    /// a zero denominator) are dropped from the distribution.
    ///
    /// # Errors
    /// Returns [`StatsError`] for fewer than two samples, an invalid
    /// configuration or a non-finite statistic on the original sample.
    pub fn bootstrap_statistic<T, F>(
        &self,
        sample: &[T],
        context: &'static str,
        statistic_fn: F,
    ) -> Result<BootstrapResult, StatsError>
    where
        F: Fn(&[&T]) -> f64,
    {
        self.config.validate()?;
        if sample.is_empty() {
            return Err(StatsError::EmptySample { context });
        }
        if sample.len() < 2 {
            return Err(StatsError::InsufficientSamples {
                context,
                needed: 2,
                got: sample.len(),
            });
        }

        let original: Vec<&T> = sample.iter().collect();
        let point_estimate = statistic_fn(&original);
        if !point_estimate.is_finite() {
            return Err(StatsError::NonFinite { context });
        }

        let n = sample.len();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut distribution = Vec::with_capacity(self.config.n_iterations);
        let mut resample: Vec<&T> = Vec::with_capacity(n);
        for _ in 0..self.config.n_iterations {
            resample.clear();
            resample.extend((0..n).map(|_| &sample[rng.gen_range(0..n)]));
            let stat = statistic_fn(&resample);
            if stat.is_finite() {
                distribution.push(stat);
            }
        }
        if distribution.is_empty() {
            return Err(StatsError::NonFinite { context });
        }

        distribution.sort_by(f64::total_cmp);
        let (ci_lower, ci_upper) = percentile_ci(&distribution, self.config.confidence_level);

        let boot_mean = mean(&distribution)?;
        let standard_error = std_dev(&distribution).unwrap_or(0.0);

        Ok(BootstrapResult {
            point_estimate,
            ci_lower,
            ci_upper,
            standard_error,
            bias: boot_mean - point_estimate,
            sample_size: n,
            n_iterations: self.config.n_iterations,
            distribution,
        })
    }

    /// # Errors
    /// See [`Self::bootstrap_statistic`].
    pub fn bootstrap_mean(&self, sample: &[f64]) -> Result<BootstrapResult, StatsError> {
        self.bootstrap_statistic(sample, "bootstrap mean", |s| {
            s.iter().copied().sum::<f64>() / s.len() as f64
        })
    }

    /// Aggregate ROI (net P&L over total stake) of a trade list.
    ///
    /// # Errors
    /// See [`Self::bootstrap_statistic`].
    pub fn bootstrap_roi(&self, trades: &[Trade]) -> Result<BootstrapResult, StatsError> {
        self.bootstrap_statistic(trades, "bootstrap roi", |s| {
            let staked: Decimal = s.iter().map(|t| t.stake).sum();
            let pnl: Decimal = s.iter().map(|t| t.pnl).sum();
            if staked.is_zero() {
                return f64::NAN;
            }
            (pnl / staked).to_f64().unwrap_or(f64::NAN)
        })
    }

    /// Per-trade Sharpe ratio. Resamples where every return is identical
    /// are dropped.
    ///
    /// # Errors
    /// See [`Self::bootstrap_statistic`].
    pub fn bootstrap_sharpe(&self, trades: &[Trade]) -> Result<BootstrapResult, StatsError> {
        self.bootstrap_statistic(trades, "bootstrap sharpe", |s| {
            let returns: Vec<f64> = s.iter().map(|t| t.return_on_stake()).collect();
            match (mean(&returns), std_dev(&returns)) {
                (Ok(m), Ok(sd)) if sd > 1e-12 => m / sd,
                _ => f64::NAN,
            }
        })
    }
}

/// Percentile interval from a sorted distribution.
#[must_use]
pub fn percentile_ci(distribution: &[f64], confidence_level: f64) -> (f64, f64) {
    if distribution.is_empty() {
        return (0.0, 0.0);
    }
    if distribution.len() == 1 {
        return (distribution[0], distribution[0]);
    }

    let alpha = 1.0 - confidence_level;
    let n = distribution.len();

    let lo = (((alpha / 2.0) * n as f64).floor() as usize).min(n - 1);
    let hi = (((1.0 - alpha / 2.0) * n as f64).ceil() as usize).min(n - 1).max(lo);
    (distribution[lo], distribution[hi])
}
