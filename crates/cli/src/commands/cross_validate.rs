//! Cross-validated backtests under every configured split policy.

use anyhow::{Context, Result};
use calib_backtest::{CrossValidationReport, CrossValidator};

use super::{footer, header, opt, section, AnalysisContext};

/// Writes `cross_validation.json` and prints per-fold and averaged
/// results.
///
/// # Errors
/// Returns an error for an invalid configuration, an empty dataset or if
/// the report cannot be written.
pub fn run_cross_validate(ctx: &AnalysisContext) -> Result<Vec<CrossValidationReport>> {
    let engine = ctx.engine()?;
    let validator = CrossValidator::new(&engine, ctx.config.cross_validation.clone());
    let reports = validator
        .run_all(&ctx.dataset)
        .context("Cross-validation failed")?;
    let path = ctx.writer.write("cross_validation", &reports)?;

    let mut out = String::new();
    header(&mut out, "CROSS-VALIDATION");
    if reports.is_empty() {
        out.push_str("No policy produced a fold over this dataset\n");
    }
    for report in &reports {
        section(
            &mut out,
            &format!("{} (folds need {} trades)", report.policy.name().to_uppercase(), report.min_trades),
        );
        for fold in &report.folds {
            out.push_str(&format!(
                "{:<10} train {:>5}  test {:>5}\n",
                fold.window.label, fold.train_markets, fold.test_markets
            ));
            for s in &fold.strategies {
                out.push_str(&format!(
                    "  {:<20} trades {:>4}  ROI {:>8.2}%{}\n",
                    s.strategy,
                    s.trades,
                    s.roi * 100.0,
                    if s.reliable { "" } else { "  (unreliable)" }
                ));
            }
        }
        for agg in &report.aggregates {
            out.push_str(&format!(
                "{}: mean ROI {}%, mean Sharpe {} over {} reliable folds ({} unreliable)\n",
                agg.strategy,
                opt(agg.mean_roi.map(|r| r * 100.0), 2),
                opt(agg.mean_sharpe, 3),
                agg.reliable_folds,
                agg.unreliable_folds
            ));
        }
    }
    footer(&mut out, &ctx.writer, &path);
    println!("{out}");
    Ok(reports)
}
