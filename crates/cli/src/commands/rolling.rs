//! Rolling-window backtest.

use anyhow::{Context, Result};
use calib_backtest::RollingResult;

use super::backtest::metrics_lines;
use super::{footer, header, section, AnalysisContext};

/// Writes `rolling.json` and prints per-window P&L for each strategy.
///
/// # Errors
/// Returns an error for invalid window lengths or bucket scheme, or if the
/// report cannot be written.
pub fn run_rolling(ctx: &AnalysisContext) -> Result<Vec<RollingResult>> {
    let engine = ctx.engine()?;
    let results = calib_backtest::run_rolling(&engine, &ctx.dataset, &ctx.config.rolling)
        .context("Rolling backtest failed")?;
    let path = ctx.writer.write("rolling", &results)?;

    let mut out = String::new();
    header(&mut out, "ROLLING BACKTEST");
    out.push_str(&format!(
        "Lookback: {} days  Step: {} days\n",
        ctx.config.rolling.lookback_days, ctx.config.rolling.step_days
    ));
    for result in &results {
        section(&mut out, &result.strategy);
        if result.windows.is_empty() {
            out.push_str("  No complete lookback in the dataset\n");
            continue;
        }
        for w in &result.windows {
            out.push_str(&format!(
                "  {} .. {}  train {:>5}  test {:>5}  trades {:>4}  P&L ${:.2}\n",
                w.test_start.format("%Y-%m-%d"),
                w.test_end.format("%Y-%m-%d"),
                w.train_markets,
                w.test_markets,
                w.trades,
                w.pnl
            ));
        }
        metrics_lines(&mut out, &result.metrics);
    }
    footer(&mut out, &ctx.writer, &path);
    println!("{out}");
    Ok(results)
}
