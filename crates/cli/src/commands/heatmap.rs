//! Cross-sectional bias heatmaps.

use anyhow::{anyhow, Result};
use calib_backtest::{CrossSectionalSlicer, Heatmap, SliceDimension};
use clap::Args;
use serde::{Deserialize, Serialize};

use super::{footer, header, section, AnalysisContext};

#[derive(Args, Debug, Clone, Default)]
pub struct HeatmapArgs {
    /// Slice dimension: liquidity_tier, category, days_to_close, volume_tier
    /// (default: all)
    #[arg(long)]
    pub dimension: Option<String>,

    /// Snapshot horizon label (default: the configured analysis horizon)
    #[arg(long)]
    pub horizon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapReport {
    pub horizon: String,
    pub samples: usize,
    pub heatmaps: Vec<Heatmap>,
}

/// Parses a slice dimension from its name.
fn parse_dimension(s: &str) -> Result<SliceDimension> {
    let normalized = s.to_lowercase().replace('-', "_");
    SliceDimension::ALL
        .into_iter()
        .find(|d| d.name() == normalized)
        .ok_or_else(|| {
            anyhow!(
                "Unknown dimension: '{}'. Valid dimensions: liquidity_tier, category, days_to_close, volume_tier",
                s
            )
        })
}

/// Writes `heatmap.json` and prints each heatmap as a table.
///
/// # Errors
/// Returns an error for an unknown dimension or horizon, or if the report
/// cannot be written.
pub fn run_heatmap(ctx: &AnalysisContext, args: &HeatmapArgs) -> Result<HeatmapReport> {
    let dimensions = match &args.dimension {
        Some(name) => vec![parse_dimension(name)?],
        None => SliceDimension::ALL.to_vec(),
    };
    let (horizon, samples) = ctx.samples(args.horizon.as_deref())?;
    let slicer = CrossSectionalSlicer::new(ctx.estimator()?, ctx.config.calibration.min_cell_count);

    let report = HeatmapReport {
        horizon: horizon.label,
        samples: samples.len(),
        heatmaps: dimensions.iter().map(|&d| slicer.heatmap(&samples, d)).collect(),
    };
    let path = ctx.writer.write("heatmap", &report)?;

    let mut out = format_heatmaps(&report);
    footer(&mut out, &ctx.writer, &path);
    println!("{out}");
    Ok(report)
}

fn format_heatmaps(report: &HeatmapReport) -> String {
    let mut out = String::new();
    header(&mut out, "BIAS HEATMAPS (pp)");
    out.push_str(&format!("Horizon: {}  Samples: {}\n", report.horizon, report.samples));

    for map in &report.heatmaps {
        section(&mut out, &format!("BY {}", map.dimension.name().to_uppercase()));
        out.push_str(&format!("{:<14}", ""));
        for column in &map.columns {
            out.push_str(&format!("{column:>8}"));
        }
        out.push('\n');
        for row in &map.rows {
            out.push_str(&format!("{:<14}", row.slice));
            for cell in &row.cells {
                let text = match cell.bias_pp {
                    Some(v) if cell.sparse => format!("({v:+.0})"),
                    Some(v) => format!("{v:+.1}"),
                    None => ".".to_string(),
                };
                out.push_str(&format!("{text:>8}"));
            }
            out.push_str(&format!("  n={}\n", row.total));
        }
    }
    out.push_str(&format!(
        "\nValues in parentheses come from cells with fewer than {} samples.\n",
        report.heatmaps.first().map_or(0, |m| m.min_cell_count)
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimensions_parse_with_either_separator() {
        assert_eq!(parse_dimension("days-to-close").unwrap(), SliceDimension::DaysToClose);
        assert_eq!(parse_dimension("Volume_Tier").unwrap(), SliceDimension::VolumeTier);
        assert!(parse_dimension("region").is_err());
    }
}
