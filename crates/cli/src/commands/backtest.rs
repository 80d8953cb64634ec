//! Backtest every configured strategy under each cost variant.

use anyhow::{Context, Result};
use calib_backtest::{chronological_split, run_variants, StrategyMetrics, VariantResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{footer, header, opt, section, AnalysisContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub train_fraction: f64,
    pub train_markets: usize,
    pub test_markets: usize,
    /// First close in the test period.
    pub test_start: Option<DateTime<Utc>>,
    pub initial_bankroll: Decimal,
    pub variants: Vec<VariantResult>,
}

/// Trains on the earlier closes, trades the later ones and writes
/// `backtest.json`.
///
/// # Errors
/// Returns an error if the dataset cannot be split, the bucket scheme is
/// invalid or the report cannot be written.
pub fn run_backtest(ctx: &AnalysisContext) -> Result<BacktestReport> {
    let config = &ctx.config.backtest;
    let (train, test) =
        chronological_split(&ctx.dataset, config.train_fraction, config.entry_horizon.offset())
            .context("Failed to split dataset for backtest")?;
    let variants = run_variants(config, &ctx.estimator()?, &train, &test);

    let report = BacktestReport {
        train_fraction: config.train_fraction,
        train_markets: train.len(),
        test_markets: test.len(),
        test_start: test.markets().iter().map(|m| m.closed_at).min(),
        initial_bankroll: config.initial_bankroll,
        variants,
    };
    let path = ctx.writer.write("backtest", &report)?;

    let mut out = format_backtest(&report);
    footer(&mut out, &ctx.writer, &path);
    println!("{out}");
    Ok(report)
}

pub(crate) fn metrics_lines(out: &mut String, m: &StrategyMetrics) {
    out.push_str(&format!(
        "  Trades:       {} ({} W / {} L, {:.1}%)\n",
        m.trades,
        m.wins,
        m.losses,
        m.win_rate * 100.0
    ));
    out.push_str(&format!("  Staked:       ${:.2}\n", m.total_staked));
    out.push_str(&format!("  Spread:       ${:.2}\n", m.total_spread_cost));
    out.push_str(&format!("  Net P&L:      ${:.2}\n", m.net_pnl));
    out.push_str(&format!("  ROI:          {:.2}%\n", m.roi_f64() * 100.0));
    out.push_str(&format!("  Sharpe:       {}\n", opt(m.sharpe_ratio, 3)));
    out.push_str(&format!(
        "  Max Drawdown: ${:.2} ({:.1}%)\n",
        m.max_drawdown,
        m.max_drawdown_pct * 100.0
    ));
    out.push_str(&format!("  Kelly Growth: {}\n", opt(m.kelly_growth, 5)));
}

fn format_backtest(report: &BacktestReport) -> String {
    let mut out = String::new();
    header(&mut out, "CALIBRATION BIAS BACKTEST");
    out.push_str(&format!(
        "Train: {} markets  Test: {} markets  ({:.0}% train)\n",
        report.train_markets,
        report.test_markets,
        report.train_fraction * 100.0
    ));
    if let Some(start) = report.test_start {
        out.push_str(&format!("Test Period From: {}\n", start.format("%Y-%m-%d")));
    }
    out.push_str(&format!("Bankroll: ${:.2}\n", report.initial_bankroll));

    for variant in &report.variants {
        section(&mut out, &variant.label.to_uppercase());
        for result in &variant.results {
            out.push_str(&format!(
                "{} ({:?}, {} eligible, {} skipped)\n",
                result.strategy,
                result.side,
                result.eligible,
                result.skipped.total()
            ));
            metrics_lines(&mut out, &result.metrics);
        }
    }

    section(&mut out, "ROI BY VARIANT");
    if let Some(first) = report.variants.first() {
        for (i, result) in first.results.iter().enumerate() {
            out.push_str(&format!("{:<20}", result.strategy));
            for variant in &report.variants {
                let roi = variant.results.get(i).map(|r| r.metrics.roi_f64() * 100.0);
                out.push_str(&format!("{:>12}", opt(roi, 2)));
            }
            out.push('\n');
        }
    }
    out
}
