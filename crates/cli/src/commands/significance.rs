//! Significance of the calibration bias and of each strategy's returns.

use anyhow::Result;
use calib_backtest::bootstrap::BootstrapConfig;
use calib_backtest::permutation::PermutationConfig;
use calib_backtest::{
    chronological_split, BiasSignificanceReport, BootstrapResampler, PermutationTest,
    SignificanceAnalyzer, StrategyComparison, StrategySignificance,
};
use calib_core::TestResult;
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{footer, header, opt, section, AnalysisContext};

#[derive(Args, Debug, Clone, Default)]
pub struct SignificanceArgs {
    /// Snapshot horizon label (default: the configured analysis horizon)
    #[arg(long)]
    pub horizon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceReport {
    pub horizon: String,
    pub seed: u64,
    pub bias: BiasSignificanceReport,
    /// Out-of-sample trades of the chronological split; empty when the
    /// dataset is too small to split.
    pub strategies: Vec<StrategySignificance>,
    /// Every pair of strategies, first listed first.
    pub comparisons: Vec<StrategyComparison>,
}

/// Writes `significance.json` and prints the test results.
///
/// # Errors
/// Returns an error for an unknown horizon, an invalid bucket scheme or if
/// the report cannot be written.
pub fn run_significance(ctx: &AnalysisContext, args: &SignificanceArgs) -> Result<SignificanceReport> {
    let stats = &ctx.config.statistics;
    let (horizon, samples) = ctx.samples(args.horizon.as_deref())?;
    let analyzer = SignificanceAnalyzer::new(
        ctx.config.calibration.scheme,
        BootstrapResampler::new(BootstrapConfig::from(stats)),
        PermutationTest::new(PermutationConfig::from(stats)),
        ctx.config.calibration.min_cell_count,
    );
    let bias = analyzer.analyze_bias(&samples);

    let backtest = &ctx.config.backtest;
    let split = chronological_split(&ctx.dataset, backtest.train_fraction, backtest.entry_horizon.offset());
    let results = match split {
        Ok((train, test)) => ctx.engine()?.run_all(&train, &test),
        Err(e) => {
            warn!(error = %e, "Skipping strategy significance");
            Vec::new()
        }
    };
    let strategies = results.iter().map(|r| analyzer.analyze_strategy(r)).collect();
    let mut comparisons = Vec::new();
    for (i, first) in results.iter().enumerate() {
        for second in &results[i + 1..] {
            comparisons.push(analyzer.compare_strategies(first, second));
        }
    }

    let report = SignificanceReport {
        horizon: horizon.label,
        seed: stats.seed,
        bias,
        strategies,
        comparisons,
    };
    let path = ctx.writer.write("significance", &report)?;

    let mut out = format_significance(&report);
    footer(&mut out, &ctx.writer, &path);
    println!("{out}");
    Ok(report)
}

fn test_line(name: &str, test: Option<&TestResult>) -> String {
    match test {
        Some(t) => format!(
            "{:<16}stat {:>9.3}  p {:.4}{}\n",
            name,
            t.statistic,
            t.p_value,
            if t.is_significant { "  *" } else { "" }
        ),
        None => format!("{name:<16}-\n"),
    }
}

fn format_significance(report: &SignificanceReport) -> String {
    let bias = &report.bias;
    let mut out = String::new();
    header(&mut out, "STATISTICAL VALIDATION");
    out.push_str(&format!(
        "Horizon: {}  Samples: {}  Seed: {}\n",
        report.horizon, bias.samples, report.seed
    ));

    section(&mut out, "OVERALL BIAS");
    out.push_str(&test_line("t-test", bias.overall_t_test.as_ref()));
    out.push_str(&test_line("Wilcoxon", bias.overall_wilcoxon.as_ref()));
    if let Some(b) = &bias.overall_bootstrap {
        out.push_str(&format!(
            "Bootstrap       {:+.4} [{:+.4}, {:+.4}]\n",
            b.point_estimate, b.ci_lower, b.ci_upper
        ));
    }

    section(&mut out, "BY PRICE BUCKET");
    for b in &bias.buckets {
        out.push_str(&format!("{} (n={}, bias {:+.4})\n", b.label, b.count, b.mean_bias));
        out.push_str(&format!("  {}", test_line("t-test", b.t_test.as_ref())));
        out.push_str(&format!("  {}", test_line("Wilcoxon", b.wilcoxon.as_ref())));
    }

    section(&mut out, "ACROSS SLICES (Kruskal-Wallis)");
    for s in &bias.slices {
        out.push_str(&test_line(s.dimension.name(), s.kruskal_wallis.as_ref()));
    }

    let tiers = &bias.tier_comparison;
    section(&mut out, "THIN VS VERY DEEP (absolute bias)");
    out.push_str(&format!(
        "n {} vs {}  mean {} vs {}\n",
        tiers.thin_count,
        tiers.deep_count,
        opt(tiers.thin_mean_abs_bias, 4),
        opt(tiers.deep_mean_abs_bias, 4)
    ));
    out.push_str(&test_line("Welch t", tiers.welch.as_ref()));
    out.push_str(&test_line("Mann-Whitney", tiers.mann_whitney.as_ref()));

    section(&mut out, "CORRELATIONS (Spearman)");
    for c in &bias.correlations {
        out.push_str(&test_line(&c.name, c.spearman.as_ref()));
    }

    if !report.strategies.is_empty() {
        section(&mut out, "STRATEGIES");
        for s in &report.strategies {
            out.push_str(&format!("{} ({} trades)\n", s.strategy, s.trades));
            if let Some(roi) = &s.roi {
                out.push_str(&format!(
                    "  ROI CI        {:+.2}% [{:+.2}%, {:+.2}%]\n",
                    roi.point_estimate * 100.0,
                    roi.ci_lower * 100.0,
                    roi.ci_upper * 100.0
                ));
            }
            if let Some(p) = &s.permutation {
                out.push_str(&format!(
                    "  Permutation   p {}{}\n",
                    opt(Some(p.p_value), 4),
                    if p.is_significant { "  *" } else { "" }
                ));
            }
        }
    }

    if !report.comparisons.is_empty() {
        section(&mut out, "STRATEGY RETURNS COMPARED");
        for c in &report.comparisons {
            out.push_str(&format!("{} vs {}\n", c.first, c.second));
            out.push_str(&format!("  {}", test_line("Welch t", c.welch.as_ref())));
            out.push_str(&format!("  {}", test_line("Mann-Whitney", c.mann_whitney.as_ref())));
        }
    }

    if !bias.notes.is_empty() {
        section(&mut out, "NOT TESTED");
        for note in &bias.notes {
            out.push_str(&format!("  {note}\n"));
        }
    }
    out
}
