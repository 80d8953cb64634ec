//! Permutation test for strategy profitability.
//!
//! Trade outcome labels are shuffled across the entered positions to build
//! a null distribution of the statistic under "outcomes are unrelated to
//! which markets the strategy picked". The p-value is the fraction of
//! shuffled statistics at or above the observed one.

use calib_core::validation::{mean, std_dev, ALPHA};
use calib_core::{StatisticsConfig, StatsError};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::Trade;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationConfig {
    pub n_permutations: usize,
    pub seed: u64,
}

impl Default for PermutationConfig {
    fn default() -> Self {
        Self::from(&StatisticsConfig::default())
    }
}

impl From<&StatisticsConfig> for PermutationConfig {
    fn from(config: &StatisticsConfig) -> Self {
        Self {
            n_permutations: config.permutation_iterations,
            seed: config.seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationResult {
    pub observed: f64,
    /// Share of null statistics `>=` the observed one.
    pub p_value: f64,
    pub n_permutations: usize,
    pub null_mean: f64,
    pub null_std: f64,
    pub sample_size: usize,
    pub is_significant: bool,
}

#[derive(Debug, Clone)]
pub struct PermutationTest {
    config: PermutationConfig,
}

impl PermutationTest {
    #[must_use]
    pub fn new(config: PermutationConfig) -> Self {
        Self { config }
    }

    /// Shuffles `labels` and evaluates `statistic` on each permutation.
    ///
    /// # Errors
    /// Rejects fewer than two labels, zero permutations and a non-finite
    /// observed statistic.
    pub fn run<F>(&self, labels: &[bool], statistic: F) -> Result<PermutationResult, StatsError>
    where
        F: Fn(&[bool]) -> f64,
    {
        const CONTEXT: &str = "permutation test";
        if self.config.n_permutations == 0 {
            return Err(StatsError::InvalidParameter {
                name: "n_permutations",
                reason: "must be positive".to_string(),
            });
        }
        if labels.is_empty() {
            return Err(StatsError::EmptySample { context: CONTEXT });
        }
        if labels.len() < 2 {
            return Err(StatsError::InsufficientSamples {
                context: CONTEXT,
                needed: 2,
                got: labels.len(),
            });
        }

        let observed = statistic(labels);
        if !observed.is_finite() {
            return Err(StatsError::NonFinite { context: CONTEXT });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut shuffled = labels.to_vec();
        let mut null = Vec::with_capacity(self.config.n_permutations);
        for _ in 0..self.config.n_permutations {
            shuffled.shuffle(&mut rng);
            null.push(statistic(&shuffled));
        }

        let exceed = null.iter().filter(|&&s| s >= observed).count();
        let p_value = exceed as f64 / null.len() as f64;
        debug!(observed, p_value, "Permutation test complete");

        Ok(PermutationResult {
            observed,
            p_value,
            n_permutations: self.config.n_permutations,
            null_mean: mean(&null)?,
            null_std: std_dev(&null).unwrap_or(0.0),
            sample_size: labels.len(),
            is_significant: p_value < ALPHA,
        })
    }

    /// Tests whether a strategy's ROI beats what its own positions earn
    /// under shuffled outcomes.
    ///
    /// Trades are put in (entry time, market id) order first, so the result
    /// does not depend on the order they are passed in.
    ///
    /// # Errors
    /// See [`Self::run`].
    pub fn strategy_profitability(&self, trades: &[Trade]) -> Result<PermutationResult, StatsError> {
        let mut ordered: Vec<&Trade> = trades.iter().collect();
        ordered.sort_by(|a, b| {
            a.entry_time
                .cmp(&b.entry_time)
                .then_with(|| a.market_id.cmp(&b.market_id))
        });
        let labels: Vec<bool> = ordered.iter().map(|t| t.won).collect();
        let staked: Decimal = ordered.iter().map(|t| t.stake).sum();

        self.run(&labels, |won| {
            if staked.is_zero() {
                return f64::NAN;
            }
            let pnl: Decimal = ordered
                .iter()
                .zip(won)
                .map(|(t, &w)| Trade::settle_pnl(t.stake, t.entry_price, t.spread_cost, w))
                .sum();
            (pnl / staked).to_f64().unwrap_or(f64::NAN)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::trade;
    use rust_decimal_macros::dec;

    fn tester() -> PermutationTest {
        PermutationTest::new(PermutationConfig {
            n_permutations: 1_000,
            seed: 42,
        })
    }

    fn skilled_trades() -> Vec<Trade> {
        let mut trades: Vec<Trade> = (0..20)
            .map(|i| trade(&format!("cheap{i:02}"), i, dec!(0.2), dec!(100), dec!(0), true))
            .collect();
        trades.extend((0..20).map(|i| trade(&format!("dear{i:02}"), i, dec!(0.8), dec!(100), dec!(0), false)));
        trades
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        assert!(matches!(
            tester().run(&[], |_| 0.0),
            Err(StatsError::EmptySample { .. })
        ));
        assert!(matches!(
            tester().run(&[true], |_| 0.0),
            Err(StatsError::InsufficientSamples { .. })
        ));
    }

    #[test]
    fn exchangeable_trades_give_p_of_one() {
        // Same price and stake: ROI depends only on the win count.
        let trades: Vec<Trade> = (0..10)
            .map(|i| trade(&format!("m{i}"), i, dec!(0.5), dec!(100), dec!(0), i % 2 == 0))
            .collect();
        let result = tester().strategy_profitability(&trades).unwrap();
        assert!((result.p_value - 1.0).abs() < 1e-12);
        assert!(!result.is_significant);
    }

    #[test]
    fn winning_cheap_positions_is_significant() {
        let result = tester().strategy_profitability(&skilled_trades()).unwrap();
        // 20 wins at 0.2 pay 400 each, 20 losses at 0.8 cost 100 each.
        assert!((result.observed - 1.5).abs() < 1e-12);
        assert!(result.p_value < 0.01);
        assert!(result.is_significant);
        assert!(result.null_mean < result.observed);
    }

    #[test]
    fn p_value_ignores_input_order() {
        let forward = tester().strategy_profitability(&skilled_trades()).unwrap();
        let mut reversed = skilled_trades();
        reversed.reverse();
        let backward = tester().strategy_profitability(&reversed).unwrap();
        assert_eq!(forward, backward);
    }
}
