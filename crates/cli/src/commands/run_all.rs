//! Every analysis step in sequence over one loaded dataset.

use anyhow::Result;
use tracing::{info, warn};

use super::{
    run_backtest, run_calibration, run_concentration, run_cross_validate, run_disputes,
    run_heatmap, run_rolling, run_significance, run_summary, AnalysisContext, HeatmapArgs,
    SignificanceArgs,
};

/// Runs each step, sharing one run id across all reports.
///
/// A step that fails on this dataset (too few markets to split, no folds)
/// is logged and skipped so the remaining reports are still written. The
/// dispute step runs only when a request or dispute file is configured.
///
/// # Errors
/// Returns an error if the summary or calibration step fails, since every
/// later step depends on the same inputs.
pub fn run_all(ctx: &AnalysisContext) -> Result<()> {
    run_summary(ctx)?;
    run_calibration(ctx)?;

    let steps: [(&str, &dyn Fn() -> Result<()>); 7] = [
        ("heatmap", &|| run_heatmap(ctx, &HeatmapArgs::default()).map(drop)),
        ("significance", &|| run_significance(ctx, &SignificanceArgs::default()).map(drop)),
        ("backtest", &|| run_backtest(ctx).map(drop)),
        ("rolling", &|| run_rolling(ctx).map(drop)),
        ("cross_validation", &|| run_cross_validate(ctx).map(drop)),
        ("concentration", &|| run_concentration(ctx).map(drop)),
        ("disputes", &|| run_disputes(ctx).map(drop)),
    ];
    let data = &ctx.config.data;
    let has_disputes = data.uma_requests_path.is_some() || data.kleros_disputes_path.is_some();

    let mut failed = 0usize;
    for (name, step) in steps {
        if name == "disputes" && !has_disputes {
            continue;
        }
        if let Err(e) = step() {
            warn!(step = name, error = %format!("{e:#}"), "Step failed");
            failed += 1;
        }
    }

    info!(
        run_id = %ctx.writer.run_id(),
        failed,
        "All steps complete"
    );
    Ok(())
}
