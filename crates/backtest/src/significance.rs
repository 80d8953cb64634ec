//! Significance testing of calibration bias and strategy results.
//!
//! Each test that cannot run on its input (too few samples, constant
//! values) is left out of the report and the reason is recorded in
//! `notes`, so a report never carries NaN statistics.

use calib_core::validation::{
    kruskal_wallis, mann_whitney_u, one_sample_t_test, spearman_correlation, welch_t_test,
    wilcoxon_signed_rank,
};
use calib_core::{LiquidityTier, StatsError, TestResult};
use calib_data::CalibrationSample;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bootstrap::{BootstrapResampler, BootstrapResult};
use crate::calibration::BucketScheme;
use crate::engine::{StrategyResult, Trade};
use crate::permutation::{PermutationResult, PermutationTest};
use crate::slicer::{bias_groups, SliceDimension};

/// Bias tests within one price bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSignificance {
    pub label: String,
    pub count: usize,
    pub mean_bias: f64,
    pub t_test: Option<TestResult>,
    pub wilcoxon: Option<TestResult>,
    pub bootstrap: Option<BootstrapResult>,
}

/// Whether bias differs between the slices of one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceSignificance {
    pub dimension: SliceDimension,
    pub groups: Vec<(String, usize)>,
    pub kruskal_wallis: Option<TestResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationSignificance {
    pub name: String,
    pub spearman: Option<TestResult>,
}

/// Absolute bias of the thinnest against the deepest liquidity tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierComparison {
    pub thin: LiquidityTier,
    pub deep: LiquidityTier,
    pub thin_count: usize,
    pub deep_count: usize,
    pub thin_mean_abs_bias: Option<f64>,
    pub deep_mean_abs_bias: Option<f64>,
    pub welch: Option<TestResult>,
    pub mann_whitney: Option<TestResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasSignificanceReport {
    pub samples: usize,
    /// Bias over every sample against zero.
    pub overall_t_test: Option<TestResult>,
    pub overall_wilcoxon: Option<TestResult>,
    pub overall_bootstrap: Option<BootstrapResult>,
    pub buckets: Vec<BucketSignificance>,
    pub slices: Vec<SliceSignificance>,
    pub tier_comparison: TierComparison,
    pub correlations: Vec<CorrelationSignificance>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySignificance {
    pub strategy: String,
    pub trades: usize,
    pub roi: Option<BootstrapResult>,
    pub sharpe: Option<BootstrapResult>,
    pub permutation: Option<PermutationResult>,
    pub notes: Vec<String>,
}

/// Per-trade returns (`pnl / stake`) of two strategies on the same test set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub first: String,
    pub second: String,
    pub first_trades: usize,
    pub second_trades: usize,
    pub welch: Option<TestResult>,
    pub mann_whitney: Option<TestResult>,
    pub notes: Vec<String>,
}

pub struct SignificanceAnalyzer {
    scheme: BucketScheme,
    bootstrap: BootstrapResampler,
    permutation: PermutationTest,
    /// Buckets with fewer samples are not tested.
    min_bucket_count: usize,
}

impl SignificanceAnalyzer {
    #[must_use]
    pub fn new(
        scheme: BucketScheme,
        bootstrap: BootstrapResampler,
        permutation: PermutationTest,
        min_bucket_count: usize,
    ) -> Self {
        Self {
            scheme,
            bootstrap,
            permutation,
            min_bucket_count,
        }
    }

    #[must_use]
    pub fn analyze_bias(&self, samples: &[CalibrationSample]) -> BiasSignificanceReport {
        let mut notes = Vec::new();
        let bias: Vec<f64> = samples.iter().map(CalibrationSample::bias).collect();

        let overall_t_test = record(one_sample_t_test(&bias, 0.0), "overall", &mut notes);
        let overall_wilcoxon = record(wilcoxon_signed_rank(&bias, 0.0), "overall", &mut notes);
        let overall_bootstrap = record(self.bootstrap.bootstrap_mean(&bias), "overall", &mut notes);

        let mut per_bucket: Vec<Vec<f64>> = vec![Vec::new(); self.scheme.len()];
        for sample in samples {
            if let Some(i) = self.scheme.index_of(sample.price) {
                per_bucket[i].push(sample.bias());
            }
        }
        let buckets = per_bucket
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_empty() && b.len() >= self.min_bucket_count)
            .map(|(i, b)| {
                let label = self.scheme.bucket(i).label();
                BucketSignificance {
                    count: b.len(),
                    mean_bias: b.iter().sum::<f64>() / b.len() as f64,
                    t_test: record(one_sample_t_test(b, 0.0), &label, &mut notes),
                    wilcoxon: record(wilcoxon_signed_rank(b, 0.0), &label, &mut notes),
                    bootstrap: record(self.bootstrap.bootstrap_mean(b), &label, &mut notes),
                    label,
                }
            })
            .collect();

        let slices = SliceDimension::ALL
            .iter()
            .map(|&dimension| {
                let groups = bias_groups(samples, dimension);
                let refs: Vec<&[f64]> = groups.iter().map(|(_, g)| g.as_slice()).collect();
                SliceSignificance {
                    dimension,
                    groups: groups.iter().map(|(l, g)| ((*l).to_string(), g.len())).collect(),
                    kruskal_wallis: record(kruskal_wallis(&refs), dimension.name(), &mut notes),
                }
            })
            .collect();

        let tier_comparison = compare_tiers(samples, &mut notes);

        let abs_bias: Vec<f64> = bias.iter().map(|b| b.abs()).collect();
        let volume: Vec<f64> = samples.iter().map(|s| s.volume).collect();
        let days: Vec<f64> = samples.iter().map(|s| s.days_to_close).collect();
        let correlations = vec![
            CorrelationSignificance {
                name: "volume_vs_abs_bias".to_string(),
                spearman: record(spearman_correlation(&volume, &abs_bias), "volume_vs_abs_bias", &mut notes),
            },
            CorrelationSignificance {
                name: "days_to_close_vs_abs_bias".to_string(),
                spearman: record(
                    spearman_correlation(&days, &abs_bias),
                    "days_to_close_vs_abs_bias",
                    &mut notes,
                ),
            },
        ];

        debug!(samples = samples.len(), skipped = notes.len(), "Bias significance");
        BiasSignificanceReport {
            samples: samples.len(),
            overall_t_test,
            overall_wilcoxon,
            overall_bootstrap,
            buckets,
            slices,
            tier_comparison,
            correlations,
            notes,
        }
    }

    #[must_use]
    pub fn analyze_strategy(&self, result: &StrategyResult) -> StrategySignificance {
        let mut notes = Vec::new();
        let trades = &result.trades;
        StrategySignificance {
            strategy: result.strategy.clone(),
            trades: trades.len(),
            roi: record(self.bootstrap.bootstrap_roi(trades), "roi", &mut notes),
            sharpe: record(self.bootstrap.bootstrap_sharpe(trades), "sharpe", &mut notes),
            permutation: record(
                self.permutation.strategy_profitability(trades),
                "permutation",
                &mut notes,
            ),
            notes,
        }
    }

    /// Tests whether two strategies' per-trade returns differ.
    #[must_use]
    pub fn compare_strategies(&self, first: &StrategyResult, second: &StrategyResult) -> StrategyComparison {
        let mut notes = Vec::new();
        let a = trade_returns(&first.trades);
        let b = trade_returns(&second.trades);
        StrategyComparison {
            first: first.strategy.clone(),
            second: second.strategy.clone(),
            first_trades: a.len(),
            second_trades: b.len(),
            welch: record(welch_t_test(&a, &b), "welch", &mut notes),
            mann_whitney: record(mann_whitney_u(&a, &b), "mann-whitney", &mut notes),
            notes,
        }
    }
}

fn compare_tiers(samples: &[CalibrationSample], notes: &mut Vec<String>) -> TierComparison {
    let (thin, deep) = (LiquidityTier::Thin, LiquidityTier::VeryDeep);
    let abs_bias = |tier: LiquidityTier| -> Vec<f64> {
        samples
            .iter()
            .filter(|s| s.liquidity_tier == tier)
            .map(|s| s.bias().abs())
            .collect()
    };
    let (a, b) = (abs_bias(thin), abs_bias(deep));
    let scope = "thin_vs_very_deep";
    TierComparison {
        thin,
        deep,
        thin_count: a.len(),
        deep_count: b.len(),
        thin_mean_abs_bias: mean_of(&a),
        deep_mean_abs_bias: mean_of(&b),
        welch: record(welch_t_test(&a, &b), scope, notes),
        mann_whitney: record(mann_whitney_u(&a, &b), scope, notes),
    }
}

fn mean_of(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn trade_returns(trades: &[Trade]) -> Vec<f64> {
    trades
        .iter()
        .filter(|t| !t.stake.is_zero())
        .filter_map(|t| (t.pnl / t.stake).to_f64())
        .collect()
}

fn record<T>(result: Result<T, StatsError>, scope: &str, notes: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            notes.push(format!("{scope}: {e}"));
            None
        }
    }
}
