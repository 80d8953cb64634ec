//! Time-aware cross-validation of the backtest.
//!
//! Three splitting policies:
//!
//! 1. **Expanding**: train on everything that closed before the test window,
//!    test on the next window, grow the train set and repeat.
//! 2. **Leave-one-quarter-out**: hold out each calendar quarter once and
//!    train on markets whose lifetime lies entirely outside it.
//! 3. **Blocked**: contiguous test blocks with a purge gap on both sides.
//!
//! A market belongs to a fold's train set only if its whole lifetime lies
//! outside the test window widened by the purge gap. It belongs to the test
//! set if it closes inside the window and, when a purge gap is set, was
//! created on or after the window start. Markets straddling the gap are in
//! neither.
//!
//! Test trades are entered one entry horizon before close, so every policy
//! also embargoes that lead time: a market resolving less than the horizon
//! before `test_start` never trains.

use std::fmt;

use calib_core::Market;
use calib_data::MarketDataset;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::BacktestEngine;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrossValidationError {
    #[error("dataset has no markets")]
    EmptyDataset,

    #[error("{name} must be positive, got {days} days")]
    InvalidWindow { name: &'static str, days: i64 },

    #[error("purge gap cannot be negative, got {0} days")]
    NegativePurge(i64),

    #[error("{policy} produced no folds over the dataset's time range")]
    NoFolds { policy: SplitPolicy },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    Expanding,
    LeaveOneQuarterOut,
    Blocked,
}

impl SplitPolicy {
    pub const ALL: [SplitPolicy; 3] = [
        SplitPolicy::Expanding,
        SplitPolicy::LeaveOneQuarterOut,
        SplitPolicy::Blocked,
    ];

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Expanding => "expanding",
            Self::LeaveOneQuarterOut => "leave_one_quarter_out",
            Self::Blocked => "blocked",
        }
    }
}

impl fmt::Display for SplitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossValidationConfig {
    pub policies: Vec<SplitPolicy>,
    /// Train span before the first expanding test window.
    pub initial_train_days: i64,
    /// Length of expanding and blocked test windows.
    pub test_days: i64,
    /// Gap on each side of a blocked test window.
    pub purge_days: i64,
    /// Folds with fewer trades are reported but not averaged.
    pub min_trades: usize,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            policies: SplitPolicy::ALL.to_vec(),
            initial_train_days: 180,
            test_days: 90,
            purge_days: 30,
            min_trades: 10,
        }
    }
}

impl CrossValidationConfig {
    fn validate(&self) -> Result<(), CrossValidationError> {
        if self.initial_train_days <= 0 {
            return Err(CrossValidationError::InvalidWindow {
                name: "initial_train_days",
                days: self.initial_train_days,
            });
        }
        if self.test_days <= 0 {
            return Err(CrossValidationError::InvalidWindow {
                name: "test_days",
                days: self.test_days,
            });
        }
        if self.purge_days < 0 {
            return Err(CrossValidationError::NegativePurge(self.purge_days));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Train,
    Test,
    Excluded,
}

/// Test window of one fold and the rule that assigns markets to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldWindow {
    pub label: String,
    pub test_start: DateTime<Utc>,
    /// Exclusive.
    pub test_end: DateTime<Utc>,
    pub purge_days: i64,
    /// Entry lead time of test trades. Training markets must resolve at
    /// least this long before `test_start`.
    pub embargo_days: i64,
    /// Train only on markets that closed before the window.
    pub past_only: bool,
}

impl FoldWindow {
    #[must_use]
    pub fn assign(&self, market: &Market) -> Membership {
        let purge = Duration::days(self.purge_days);
        let closes_inside = market.closed_at >= self.test_start && market.closed_at < self.test_end;
        if closes_inside && (self.purge_days == 0 || market.created_at >= self.test_start) {
            return Membership::Test;
        }

        let cutoff = self.test_start - Duration::days(self.purge_days.max(self.embargo_days));
        let before = market.closed_at < cutoff;
        let after = market.created_at >= self.test_end + purge;
        if before || (after && !self.past_only) {
            Membership::Train
        } else {
            Membership::Excluded
        }
    }

    /// Train and test datasets for this fold.
    #[must_use]
    pub fn split(&self, dataset: &MarketDataset) -> (MarketDataset, MarketDataset) {
        (
            dataset.filter(|m| self.assign(m) == Membership::Train),
            dataset.filter(|m| self.assign(m) == Membership::Test),
        )
    }
}

/// Test windows a policy produces over a dataset.
///
/// `embargo_days` is how long before close test trades are entered; no
/// training market may resolve inside that lead time.
///
/// # Errors
/// Rejects an invalid configuration or an empty dataset.
pub fn fold_windows(
    policy: SplitPolicy,
    config: &CrossValidationConfig,
    dataset: &MarketDataset,
    embargo_days: i64,
) -> Result<Vec<FoldWindow>, CrossValidationError> {
    config.validate()?;
    let embargo_days = embargo_days.max(0);
    let closes = dataset.markets().iter().map(|m| m.closed_at);
    let (Some(first_close), Some(last_close)) = (closes.clone().min(), closes.max()) else {
        return Err(CrossValidationError::EmptyDataset);
    };
    let test_len = Duration::days(config.test_days);

    let windows = match policy {
        SplitPolicy::Expanding => {
            let mut start = first_close + Duration::days(config.initial_train_days);
            let mut windows = Vec::new();
            while start <= last_close {
                windows.push(FoldWindow {
                    label: format!("fold{}", windows.len() + 1),
                    test_start: start,
                    test_end: start + test_len,
                    purge_days: 0,
                    embargo_days,
                    past_only: true,
                });
                start += test_len;
            }
            windows
        }
        SplitPolicy::LeaveOneQuarterOut => {
            let mut windows = Vec::new();
            let mut start = quarter_start(first_close);
            while start <= last_close {
                let Some(end) = next_quarter(start) else { break };
                windows.push(FoldWindow {
                    label: format!("{}Q{}", start.year(), start.month0() / 3 + 1),
                    test_start: start,
                    test_end: end,
                    purge_days: 0,
                    embargo_days,
                    past_only: false,
                });
                start = end;
            }
            windows
        }
        SplitPolicy::Blocked => {
            let mut start = first_close;
            let mut windows = Vec::new();
            while start <= last_close {
                windows.push(FoldWindow {
                    label: format!("block{}", windows.len() + 1),
                    test_start: start,
                    test_end: start + test_len,
                    purge_days: config.purge_days,
                    embargo_days,
                    past_only: false,
                });
                start += test_len;
            }
            windows
        }
    };
    Ok(windows)
}

fn quarter_start(ts: DateTime<Utc>) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(ts.year(), ts.month0() / 3 * 3 + 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map_or(ts, |d| d.and_utc())
}

fn next_quarter(start: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let (year, month) = if start.month() >= 10 {
        (start.year() + 1, 1)
    } else {
        (start.year(), start.month() + 3)
    };
    Some(NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?.and_utc())
}

/// One strategy's out-of-sample result in one fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldStrategy {
    pub strategy: String,
    pub trades: usize,
    pub net_pnl: Decimal,
    pub roi: f64,
    pub sharpe_ratio: Option<f64>,
    /// At least `min_trades` trades.
    pub reliable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldResult {
    pub window: FoldWindow,
    pub train_markets: usize,
    pub test_markets: usize,
    pub trained_buckets: usize,
    pub strategies: Vec<FoldStrategy>,
}

/// Averages over reliable folds only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyAggregate {
    pub strategy: String,
    pub folds: usize,
    pub reliable_folds: usize,
    pub unreliable_folds: usize,
    pub mean_roi: Option<f64>,
    pub mean_sharpe: Option<f64>,
    pub total_trades: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationReport {
    pub policy: SplitPolicy,
    pub min_trades: usize,
    pub folds: Vec<FoldResult>,
    pub aggregates: Vec<StrategyAggregate>,
}

pub struct CrossValidator<'a> {
    engine: &'a BacktestEngine,
    config: CrossValidationConfig,
}

impl<'a> CrossValidator<'a> {
    #[must_use]
    pub fn new(engine: &'a BacktestEngine, config: CrossValidationConfig) -> Self {
        Self { engine, config }
    }

    /// Trains and tests every fold of one policy.
    ///
    /// # Errors
    /// Returns [`CrossValidationError`] for an invalid configuration, an
    /// empty dataset or a policy that yields no folds.
    pub fn run(
        &self,
        dataset: &MarketDataset,
        policy: SplitPolicy,
    ) -> Result<CrossValidationReport, CrossValidationError> {
        let embargo = self.engine.config().entry_horizon.offset_days;
        let windows = fold_windows(policy, &self.config, dataset, embargo)?;
        if windows.is_empty() {
            return Err(CrossValidationError::NoFolds { policy });
        }

        let mut folds = Vec::with_capacity(windows.len());
        for window in windows {
            let (train, test) = window.split(dataset);
            let table = self.engine.train(&train);
            let strategies = self
                .engine
                .config()
                .strategies
                .iter()
                .map(|rule| {
                    let result = self.engine.run(&test, &table, rule);
                    FoldStrategy {
                        strategy: rule.name.clone(),
                        trades: result.metrics.trades,
                        net_pnl: result.metrics.net_pnl,
                        roi: result.metrics.roi_f64(),
                        sharpe_ratio: result.metrics.sharpe_ratio,
                        reliable: result.metrics.trades >= self.config.min_trades,
                    }
                })
                .collect();
            debug!(
                policy = %policy,
                fold = %window.label,
                train = train.len(),
                test = test.len(),
                "Evaluated fold"
            );
            folds.push(FoldResult {
                train_markets: train.len(),
                test_markets: test.len(),
                trained_buckets: table.trained_buckets(),
                window,
                strategies,
            });
        }

        let aggregates = self.aggregate(&folds);
        for agg in &aggregates {
            info!(
                policy = %policy,
                strategy = %agg.strategy,
                reliable = agg.reliable_folds,
                unreliable = agg.unreliable_folds,
                mean_roi = ?agg.mean_roi,
                "Cross-validation complete"
            );
        }

        Ok(CrossValidationReport {
            policy,
            min_trades: self.config.min_trades,
            folds,
            aggregates,
        })
    }

    /// Runs every configured policy, skipping those that yield no folds.
    ///
    /// # Errors
    /// Returns the first error other than [`CrossValidationError::NoFolds`].
    pub fn run_all(&self, dataset: &MarketDataset) -> Result<Vec<CrossValidationReport>, CrossValidationError> {
        let mut reports = Vec::new();
        for &policy in &self.config.policies {
            match self.run(dataset, policy) {
                Ok(report) => reports.push(report),
                Err(e @ CrossValidationError::NoFolds { .. }) => warn!(error = %e, "Skipping policy"),
                Err(e) => return Err(e),
            }
        }
        Ok(reports)
    }

    fn aggregate(&self, folds: &[FoldResult]) -> Vec<StrategyAggregate> {
        self.engine
            .config()
            .strategies
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                let per_fold: Vec<&FoldStrategy> = folds.iter().filter_map(|f| f.strategies.get(i)).collect();
                let reliable: Vec<&&FoldStrategy> = per_fold.iter().filter(|s| s.reliable).collect();
                let sharpes: Vec<f64> = reliable.iter().filter_map(|s| s.sharpe_ratio).collect();
                StrategyAggregate {
                    strategy: rule.name.clone(),
                    folds: per_fold.len(),
                    reliable_folds: reliable.len(),
                    unreliable_folds: per_fold.len() - reliable.len(),
                    mean_roi: (!reliable.is_empty())
                        .then(|| reliable.iter().map(|s| s.roi).sum::<f64>() / reliable.len() as f64),
                    mean_sharpe: (!sharpes.is_empty())
                        .then(|| sharpes.iter().sum::<f64>() / sharpes.len() as f64),
                    total_trades: per_fold.iter().map(|s| s.trades).sum(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{BucketScheme, CalibrationEstimator};
    use crate::engine::tests::{dataset, market, quoted, ts};
    use crate::engine::{BacktestConfig, StrategyRule};
    use crate::spread::TieredSpread;
    use calib_core::{LiquidityTier, Resolution, Side};
    use chrono::TimeZone;

    fn engine() -> BacktestEngine {
        let config = BacktestConfig {
            spread: TieredSpread::zero(),
            liquidity_filter: LiquidityTier::ALL.to_vec(),
            strategies: vec![StrategyRule::new("fade", Side::No, 0.85, 0.99)],
            ..BacktestConfig::default()
        };
        BacktestEngine::new(config, CalibrationEstimator::new(BucketScheme::default()).unwrap())
    }

    /// 39 markets at 0.9, each open 30 days, closing every ten days from
    /// day 20 to day 400.
    fn history() -> MarketDataset {
        dataset(
            (0..39)
                .map(|i| {
                    let res = if i % 2 == 0 { Resolution::Yes } else { Resolution::No };
                    let close = 20 + 10 * i;
                    quoted(&format!("m{i:02}"), close - 30, close, res, 0.9)
                })
                .collect(),
        )
    }

    fn config() -> CrossValidationConfig {
        CrossValidationConfig {
            min_trades: 3,
            ..CrossValidationConfig::default()
        }
    }

    fn blocked_window() -> FoldWindow {
        FoldWindow {
            label: "block".to_string(),
            test_start: ts(100),
            test_end: ts(190),
            purge_days: 30,
            embargo_days: 0,
            past_only: false,
        }
    }

    // ============================================================
    // Membership Tests
    // ============================================================

    #[test]
    fn market_straddling_purge_gap_is_in_neither_set() {
        let window = blocked_window();
        // Opens inside the leading gap, closes inside the test window.
        let straddler = market("s", 80, 120, Resolution::Yes, 1.0);
        assert_eq!(window.assign(&straddler), Membership::Excluded);

        // Closes inside the leading gap.
        let gap_close = market("g", 40, 85, Resolution::Yes, 1.0);
        assert_eq!(window.assign(&gap_close), Membership::Excluded);

        // Opens inside the trailing gap.
        let late = market("l", 200, 260, Resolution::Yes, 1.0);
        assert_eq!(window.assign(&late), Membership::Excluded);
    }

    #[test]
    fn markets_clear_of_the_gap_are_assigned() {
        let window = blocked_window();
        assert_eq!(window.assign(&market("early", 0, 60, Resolution::No, 1.0)), Membership::Train);
        assert_eq!(window.assign(&market("later", 230, 260, Resolution::No, 1.0)), Membership::Train);
        assert_eq!(window.assign(&market("inside", 110, 150, Resolution::No, 1.0)), Membership::Test);
    }

    #[test]
    fn past_only_windows_never_train_on_the_future() {
        let window = FoldWindow {
            past_only: true,
            purge_days: 0,
            ..blocked_window()
        };
        assert_eq!(window.assign(&market("later", 230, 260, Resolution::No, 1.0)), Membership::Excluded);
        // Without a purge gap, a market opened before the window still tests.
        assert_eq!(window.assign(&market("open", 80, 120, Resolution::No, 1.0)), Membership::Test);
    }

    #[test]
    fn markets_resolving_after_a_test_entry_are_embargoed() {
        let window = FoldWindow {
            past_only: true,
            purge_days: 0,
            embargo_days: 7,
            ..blocked_window()
        };
        // Entered seven days before its day-101 close, i.e. on day 94.
        assert_eq!(window.assign(&market("test", 60, 101, Resolution::No, 1.0)), Membership::Test);
        // Resolved on day 99, after that entry: its outcome was unknown then.
        assert_eq!(window.assign(&market("late", 50, 99, Resolution::No, 1.0)), Membership::Excluded);
        assert_eq!(window.assign(&market("edge", 50, 93, Resolution::No, 1.0)), Membership::Excluded);
        assert_eq!(window.assign(&market("known", 50, 92, Resolution::No, 1.0)), Membership::Train);
    }

    #[test]
    fn no_policy_leaks_test_lifetimes_into_training() {
        let data = history();
        for policy in SplitPolicy::ALL {
            for window in fold_windows(policy, &config(), &data, 7).unwrap() {
                let purge = Duration::days(window.purge_days);
                let embargo = Duration::days(window.embargo_days);
                let (train, test) = window.split(&data);
                for m in train.markets() {
                    assert!(
                        !m.overlaps(window.test_start - purge, window.test_end + purge),
                        "{policy} {} trains on {}",
                        window.label,
                        m.id
                    );
                    if m.closed_at < window.test_start {
                        assert!(m.closed_at < window.test_start - embargo);
                    }
                }
                for m in test.markets() {
                    assert!(m.closed_at >= window.test_start && m.closed_at < window.test_end);
                }
            }
        }
    }

    // ============================================================
    // Fold Generation Tests
    // ============================================================

    #[test]
    fn expanding_train_set_grows() {
        let data = history();
        let windows = fold_windows(SplitPolicy::Expanding, &config(), &data, 0).unwrap();
        assert_eq!(windows.len(), 3);

        let sizes: Vec<usize> = windows.iter().map(|w| w.split(&data).0.len()).collect();
        assert_eq!(sizes, vec![18, 27, 36]);
    }

    #[test]
    fn quarters_cover_the_close_range() {
        let windows = fold_windows(SplitPolicy::LeaveOneQuarterOut, &config(), &history(), 0).unwrap();
        let labels: Vec<&str> = windows.iter().map(|w| w.label.as_str()).collect();
        // Closes run from 2024-01-21 to 2025-02-04.
        assert_eq!(labels, vec!["2024Q1", "2024Q2", "2024Q3", "2024Q4", "2025Q1"]);
        assert_eq!(windows[1].test_start, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let bad = CrossValidationConfig {
            test_days: 0,
            ..CrossValidationConfig::default()
        };
        assert_eq!(
            fold_windows(SplitPolicy::Blocked, &bad, &history(), 0),
            Err(CrossValidationError::InvalidWindow { name: "test_days", days: 0 })
        );
        let empty = MarketDataset::from_parts(Vec::new(), Vec::new());
        assert_eq!(
            fold_windows(SplitPolicy::Blocked, &config(), &empty, 0),
            Err(CrossValidationError::EmptyDataset)
        );
    }

    // ============================================================
    // Validator Tests
    // ============================================================

    #[test]
    fn folds_below_min_trades_are_flagged_not_averaged() {
        let engine = engine();
        let validator = CrossValidator::new(&engine, config());
        let report = validator.run(&history(), SplitPolicy::Expanding).unwrap();

        // The last fold only holds the markets closing on days 380-400.
        let last = &report.folds[2].strategies[0];
        assert_eq!(last.trades, 3);
        assert!(last.reliable);

        let agg = &report.aggregates[0];
        assert_eq!(agg.folds, 3);
        assert_eq!(agg.reliable_folds + agg.unreliable_folds, 3);
        assert_eq!(agg.total_trades, report.folds.iter().map(|f| f.strategies[0].trades).sum::<usize>());

        let strict = CrossValidator::new(
            &engine,
            CrossValidationConfig {
                min_trades: 100,
                ..config()
            },
        );
        let report = strict.run(&history(), SplitPolicy::Expanding).unwrap();
        assert_eq!(report.aggregates[0].reliable_folds, 0);
        assert!(report.aggregates[0].mean_roi.is_none());
    }

    #[test]
    fn folds_embargo_the_engine_entry_horizon() {
        let engine = engine();
        let report = CrossValidator::new(&engine, config())
            .run(&history(), SplitPolicy::LeaveOneQuarterOut)
            .unwrap();
        assert!(report.folds.iter().all(|f| f.window.embargo_days == 7));
    }

    #[test]
    fn run_all_covers_each_policy() {
        let engine = engine();
        let reports = CrossValidator::new(&engine, config()).run_all(&history()).unwrap();
        let policies: Vec<SplitPolicy> = reports.iter().map(|r| r.policy).collect();
        assert_eq!(policies, SplitPolicy::ALL.to_vec());
    }
}
