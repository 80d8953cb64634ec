//! Calibration curves and summary statistics at every configured horizon.

use anyhow::Result;
use calib_backtest::CalibrationSummary;

use super::{footer, header, opt, pp, section, AnalysisContext};

/// Writes `calibration.json` and prints one table per horizon.
///
/// # Errors
/// Returns an error for an invalid bucket scheme or if the report cannot be
/// written.
pub fn run_calibration(ctx: &AnalysisContext) -> Result<CalibrationSummary> {
    let estimator = ctx.estimator()?;
    let summary = CalibrationSummary::compute(&ctx.dataset, &estimator, &ctx.config.calibration.horizons);
    let path = ctx.writer.write("calibration", &summary)?;

    let mut out = format_calibration(&summary);
    footer(&mut out, &ctx.writer, &path);
    println!("{out}");
    Ok(summary)
}

fn format_calibration(summary: &CalibrationSummary) -> String {
    let mut out = String::new();
    header(&mut out, "CALIBRATION SUMMARY");
    out.push_str(&format!("Markets: {}\n", summary.markets));
    if let Some(period) = &summary.data_period {
        out.push_str(&format!(
            "Period:  {} to {}\n",
            period.start.format("%Y-%m-%d"),
            period.end.format("%Y-%m-%d")
        ));
    }

    for h in &summary.horizons {
        section(&mut out, &format!("HORIZON {} ({} days before close)", h.horizon, h.offset_days));
        out.push_str(&format!("Samples:        {}\n", h.samples));
        out.push_str(&format!("Brier Score:    {}\n", opt(h.brier_score, 4)));
        out.push_str(&format!("Sharpness:      {}\n", opt(h.sharpness, 4)));
        out.push_str(&format!("Yes Rate:       {}\n", opt(h.yes_rate.map(|r| r * 100.0), 1)));
        if let Some(fit) = &h.curve.regression {
            out.push_str(&format!(
                "Regression:     slope {:.3}, intercept {:+.3} ({} buckets)\n",
                fit.slope, fit.intercept, fit.buckets_used
            ));
        }

        out.push_str("\n  Bucket     Count   Price  Realized     Bias\n");
        for b in h.curve.buckets.iter().filter(|b| b.count > 0) {
            out.push_str(&format!(
                "  {:<9}{:>6}  {:>6}  {:>8}  {:>7}\n",
                b.label,
                b.count,
                opt(b.mean_price, 3),
                opt(b.realized_rate, 3),
                pp(b.bias_pp)
            ));
        }

        for d in &h.deviation_by_range {
            out.push_str(&format!(
                "  {:<5} {:<8} n={:<6} {}\n",
                d.name,
                d.range,
                d.count,
                pp(d.deviation_pp)
            ));
        }
        for t in &h.volume_tier_brier {
            out.push_str(&format!(
                "  Brier {:<6} n={:<6} {:.4}\n",
                t.tier.label(),
                t.count,
                t.brier_score
            ));
        }
    }
    out
}
