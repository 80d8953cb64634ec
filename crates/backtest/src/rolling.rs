//! Rolling-window backtest: train on a trailing lookback, trade the next
//! step, roll forward.

use calib_core::StatsError;
use calib_data::MarketDataset;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::{BacktestEngine, Trade};
use crate::metrics::{cumulative_pnl, StrategyMetrics};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingConfig {
    /// Training lookback before each test window.
    pub lookback_days: i64,
    /// Length of each test window and the distance rolled forward.
    pub step_days: i64,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            lookback_days: 180,
            step_days: 30,
        }
    }
}

impl RollingConfig {
    fn validate(&self) -> Result<(), StatsError> {
        if self.lookback_days <= 0 {
            return Err(StatsError::InvalidParameter {
                name: "lookback_days",
                reason: format!("must be positive, got {}", self.lookback_days),
            });
        }
        if self.step_days <= 0 {
            return Err(StatsError::InvalidParameter {
                name: "step_days",
                reason: format!("must be positive, got {}", self.step_days),
            });
        }
        Ok(())
    }
}

/// Train/test boundaries of one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingWindow {
    pub index: usize,
    pub train_start: DateTime<Utc>,
    /// Exclusive; `test_start` less the entry horizon.
    pub train_end: DateTime<Utc>,
    pub test_start: DateTime<Utc>,
    pub test_end: DateTime<Utc>,
    pub train_markets: usize,
    pub test_markets: usize,
    pub trained_buckets: usize,
    pub trades: usize,
    pub pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlPoint {
    pub entry_time: DateTime<Utc>,
    pub market_id: String,
    pub pnl: Decimal,
    pub cumulative_pnl: Decimal,
}

/// One strategy traded through every window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingResult {
    pub strategy: String,
    pub windows: Vec<RollingWindow>,
    pub series: Vec<PnlPoint>,
    pub metrics: StrategyMetrics,
}

/// Runs every configured strategy through successive windows.
///
/// Training uses markets that closed in `[test_start - lookback,
/// test_start - entry_horizon)`; testing uses markets closing in
/// `[test_start, test_start + step)`. The first test window opens one
/// lookback after the earliest close.
///
/// # Errors
/// Rejects non-positive window lengths.
pub fn run_rolling(
    engine: &BacktestEngine,
    dataset: &MarketDataset,
    config: &RollingConfig,
) -> Result<Vec<RollingResult>, StatsError> {
    config.validate()?;
    let strategies = &engine.config().strategies;
    let mut windows: Vec<Vec<RollingWindow>> = vec![Vec::new(); strategies.len()];
    let mut trades: Vec<Vec<Trade>> = vec![Vec::new(); strategies.len()];

    let closes = dataset.markets().iter().map(|m| m.closed_at);
    if let (Some(first_close), Some(last_close)) = (closes.clone().min(), closes.max()) {
        let lookback = Duration::days(config.lookback_days);
        let step = Duration::days(config.step_days);
        let mut test_start = first_close + lookback;
        let embargo = engine.config().entry_horizon.offset().max(Duration::zero());
        let mut index = 0;

        while test_start <= last_close {
            let train_start = test_start - lookback;
            // Test trades are entered `embargo` before close, so nothing
            // resolving after the earliest entry may train.
            let train_end = test_start - embargo;
            let test_end = test_start + step;
            let train = dataset.filter(|m| m.closed_at >= train_start && m.closed_at < train_end);
            let test = dataset.filter(|m| m.closed_at >= test_start && m.closed_at < test_end);
            let table = engine.train(&train);

            for (i, rule) in strategies.iter().enumerate() {
                let result = engine.run(&test, &table, rule);
                windows[i].push(RollingWindow {
                    index,
                    train_start,
                    train_end,
                    test_start,
                    test_end,
                    train_markets: train.len(),
                    test_markets: test.len(),
                    trained_buckets: table.trained_buckets(),
                    trades: result.trades.len(),
                    pnl: result.metrics.net_pnl,
                });
                trades[i].extend(result.trades);
            }
            debug!(
                window = index,
                train = train.len(),
                test = test.len(),
                "Rolled window"
            );

            test_start = test_end;
            index += 1;
        }
    }

    let results: Vec<RollingResult> = strategies
        .iter()
        .zip(windows.into_iter().zip(trades))
        .map(|(rule, (windows, trades))| {
            let series = trades
                .iter()
                .zip(cumulative_pnl(&trades))
                .map(|(t, cumulative)| PnlPoint {
                    entry_time: t.entry_time,
                    market_id: t.market_id.clone(),
                    pnl: t.pnl,
                    cumulative_pnl: cumulative,
                })
                .collect();
            RollingResult {
                strategy: rule.name.clone(),
                metrics: StrategyMetrics::from_trades(&trades, engine.config().initial_bankroll),
                windows,
                series,
            }
        })
        .collect();

    for result in &results {
        info!(
            strategy = %result.strategy,
            windows = result.windows.len(),
            trades = result.metrics.trades,
            net_pnl = %result.metrics.net_pnl,
            "Rolling backtest complete"
        );
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{BucketScheme, CalibrationEstimator};
    use crate::engine::tests::{dataset, quoted, ts};
    use crate::engine::{BacktestConfig, StrategyRule};
    use crate::spread::TieredSpread;
    use calib_core::{LiquidityTier, Resolution, Side};

    fn engine() -> BacktestEngine {
        let config = BacktestConfig {
            spread: TieredSpread::zero(),
            liquidity_filter: LiquidityTier::ALL.to_vec(),
            strategies: vec![StrategyRule::new("fade", Side::No, 0.85, 0.99)],
            ..BacktestConfig::default()
        };
        BacktestEngine::new(config, CalibrationEstimator::new(BucketScheme::default()).unwrap())
    }

    /// A market at 0.9 closing every ten days from day 20 to day 400,
    /// alternating Yes and No.
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

    #[test]
    fn windows_roll_from_first_close_plus_lookback() {
        let results = run_rolling(&engine(), &history(), &RollingConfig::default()).unwrap();
        let windows = &results[0].windows;

        // Test windows start at days 200, 230, ..., 380.
        assert_eq!(windows.len(), 7);
        assert_eq!(windows[1].test_start - windows[0].test_start, Duration::days(30));
        for w in windows {
            assert_eq!(w.test_start - w.train_end, Duration::days(7));
            assert_eq!(w.test_start - w.train_start, Duration::days(180));
            assert_eq!(w.train_markets, 18);
        }
        assert_eq!(windows[6].test_markets, 3);
    }

    #[test]
    fn training_stops_before_the_first_test_entry() {
        // A market closing three days into the entry lead of the day-200
        // window resolves after that window's day-193 entries.
        let mut rows: Vec<_> = (0..39)
            .map(|i| {
                let res = if i % 2 == 0 { Resolution::Yes } else { Resolution::No };
                let close = 20 + 10 * i;
                quoted(&format!("m{i:02}"), close - 30, close, res, 0.9)
            })
            .collect();
        rows.push(quoted("late", 150, 196, Resolution::No, 0.9));
        let data = dataset(rows);

        let results = run_rolling(&engine(), &data, &RollingConfig::default()).unwrap();
        let first = &results[0].windows[0];
        assert_eq!(first.test_start, ts(200));
        assert_eq!(first.train_markets, 18);
    }

    #[test]
    fn cumulative_series_ends_at_net_pnl() {
        let results = run_rolling(&engine(), &history(), &RollingConfig::default()).unwrap();
        let result = &results[0];

        assert_eq!(result.series.len(), result.metrics.trades);
        assert!(result.metrics.trades > 0);
        let last = result.series.last().unwrap();
        assert_eq!(last.cumulative_pnl, result.metrics.net_pnl);
        let window_total: Decimal = result.windows.iter().map(|w| w.pnl).sum();
        assert_eq!(window_total, result.metrics.net_pnl);
    }

    #[test]
    fn short_history_produces_no_windows() {
        let config = RollingConfig {
            lookback_days: 1_000,
            step_days: 30,
        };
        let results = run_rolling(&engine(), &history(), &config).unwrap();
        assert!(results[0].windows.is_empty());
        assert_eq!(results[0].metrics.trades, 0);
    }

    #[test]
    fn invalid_step_is_rejected() {
        let config = RollingConfig {
            lookback_days: 180,
            step_days: 0,
        };
        assert!(run_rolling(&engine(), &history(), &config).is_err());
    }
}
