//! Performance metrics for a set of simulated trades.

use calib_core::kelly::expected_log_growth;
use calib_core::validation::{mean, std_dev};
use calib_core::WinRateValidation;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::Trade;

/// Aggregate results of one strategy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyMetrics {
    // Basic counts
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,

    // Financial metrics (use Decimal!)
    /// Total amount staked across all trades.
    pub total_staked: Decimal,
    /// Total spread paid on entry.
    pub total_spread_cost: Decimal,
    /// Net P&L after spread.
    pub net_pnl: Decimal,
    /// Return on investment (net_pnl / total_staked).
    pub roi: Decimal,
    pub final_equity: Decimal,

    // Risk metrics
    /// Mean over standard deviation of per-trade returns. `None` with fewer
    /// than two trades or identical returns.
    pub sharpe_ratio: Option<f64>,
    /// Largest peak-to-trough equity decline.
    pub max_drawdown: Decimal,
    /// `max_drawdown` as a fraction of the peak it fell from.
    pub max_drawdown_pct: f64,
    /// Realized mean log growth of the bankroll per trade.
    pub kelly_growth: Option<f64>,
    /// Expected log growth per trade at the sized fractions and the
    /// model's win probabilities.
    pub expected_kelly_growth: Option<f64>,

    pub avg_entry_price: f64,
    /// Win rate tested against the average entry price, i.e. the win rate
    /// the market implied.
    pub win_rate_validation: WinRateValidation,
}

impl StrategyMetrics {
    /// Computes metrics from trades already in canonical order.
    #[must_use]
    pub fn from_trades(trades: &[Trade], initial_bankroll: Decimal) -> Self {
        let n = trades.len();
        let wins = trades.iter().filter(|t| t.won).count();
        let losses = n - wins;

        let total_staked: Decimal = trades.iter().map(|t| t.stake).sum();
        let total_spread_cost: Decimal = trades.iter().map(|t| t.spread_cost).sum();
        let net_pnl: Decimal = trades.iter().map(|t| t.pnl).sum();
        let roi = if total_staked > Decimal::ZERO {
            net_pnl / total_staked
        } else {
            Decimal::ZERO
        };

        let returns: Vec<f64> = trades.iter().map(Trade::return_on_stake).collect();
        let sharpe_ratio = match (mean(&returns), std_dev(&returns)) {
            (Ok(m), Ok(sd)) if sd > 1e-12 => Some(m / sd),
            _ => None,
        };

        let (max_drawdown, max_drawdown_pct) = Self::calculate_max_drawdown(trades, initial_bankroll);

        let bankroll = initial_bankroll.to_f64().unwrap_or(0.0);
        let log_growth: Vec<f64> = trades
            .iter()
            .filter_map(|t| {
                let r = t.pnl.to_f64()? / bankroll;
                (bankroll > 0.0 && r > -1.0).then(|| (1.0 + r).ln())
            })
            .collect();
        let kelly_growth = mean(&log_growth).ok();

        let expected: Vec<f64> = trades
            .iter()
            .filter_map(|t| {
                let fraction = (t.stake / initial_bankroll).to_f64()?;
                expected_log_growth(t.win_probability, t.entry_price.to_f64()?, fraction)
            })
            .collect();
        let expected_kelly_growth = mean(&expected).ok();

        let avg_entry_price = if n == 0 {
            0.0
        } else {
            trades.iter().filter_map(|t| t.entry_price.to_f64()).sum::<f64>() / n as f64
        };

        Self {
            trades: n,
            wins,
            losses,
            win_rate: if n == 0 { 0.0 } else { wins as f64 / n as f64 },
            total_staked,
            total_spread_cost,
            net_pnl,
            roi,
            final_equity: initial_bankroll + net_pnl,
            sharpe_ratio,
            max_drawdown,
            max_drawdown_pct,
            kelly_growth,
            expected_kelly_growth,
            avg_entry_price,
            win_rate_validation: WinRateValidation::from_counts(wins, n, avg_entry_price),
        }
    }

    #[must_use]
    pub fn roi_f64(&self) -> f64 {
        self.roi.to_f64().unwrap_or(0.0)
    }

    fn calculate_max_drawdown(trades: &[Trade], initial_bankroll: Decimal) -> (Decimal, f64) {
        let mut equity = initial_bankroll;
        let mut peak = initial_bankroll;
        let mut max_dd = Decimal::ZERO;
        let mut max_dd_pct = 0.0;

        for trade in trades {
            equity += trade.pnl;
            if equity > peak {
                peak = equity;
            }
            let drawdown = peak - equity;
            if drawdown > max_dd {
                max_dd = drawdown;
                if peak > Decimal::ZERO {
                    max_dd_pct = (drawdown / peak).to_f64().unwrap_or(0.0);
                }
            }
        }

        (max_dd, max_dd_pct)
    }
}

/// Cumulative P&L after each trade.
#[must_use]
pub fn cumulative_pnl(trades: &[Trade]) -> Vec<Decimal> {
    trades
        .iter()
        .scan(Decimal::ZERO, |acc, t| {
            *acc += t.pnl;
            Some(*acc)
        })
        .collect()
}
