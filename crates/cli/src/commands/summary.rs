//! Dataset summary: load counts plus the resolved-market breakdown.

use anyhow::Result;
use calib_data::{LoadReport, ResolvedSummary};
use serde::{Deserialize, Serialize};

use super::{footer, header, section, AnalysisContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub load: LoadReport,
    pub resolved: ResolvedSummary,
}

/// Writes `summary.json` and prints the text report.
///
/// # Errors
/// Returns an error if the report cannot be written.
pub fn run_summary(ctx: &AnalysisContext) -> Result<DatasetSummary> {
    let summary = DatasetSummary {
        load: ctx.load_report.clone(),
        resolved: ResolvedSummary::compute(&ctx.dataset),
    };
    let path = ctx.writer.write("summary", &summary)?;

    let mut out = format_summary(&summary);
    footer(&mut out, &ctx.writer, &path);
    println!("{out}");
    Ok(summary)
}

fn format_summary(summary: &DatasetSummary) -> String {
    let load = &summary.load;
    let resolved = &summary.resolved;
    let mut out = String::new();
    header(&mut out, "RESOLVED MARKET SUMMARY");

    section(&mut out, "LOAD");
    out.push_str(&format!(
        "Markets:        {} loaded / {} read\n",
        load.markets_loaded, load.markets_read
    ));
    out.push_str(&format!(
        "Observations:   {} loaded / {} read\n",
        load.observations_loaded, load.observations_read
    ));
    for (reason, count) in load.skipped_markets.iter().chain(&load.skipped_observations) {
        out.push_str(&format!("  skipped {reason}: {count}\n"));
    }

    section(&mut out, "RESOLUTIONS");
    out.push_str(&format!("Total Resolved: {}\n", resolved.total_resolved));
    out.push_str(&format!(
        "Yes:            {} ({:.1}%)\n",
        resolved.yes_count, resolved.yes_ratio
    ));
    out.push_str(&format!(
        "No:             {} ({:.1}%)\n",
        resolved.no_count, resolved.no_ratio
    ));

    section(&mut out, "CATEGORIES");
    for (category, count) in &resolved.category_distribution {
        out.push_str(&format!("{category:<16}{count}\n"));
    }

    section(&mut out, "VOLUME");
    out.push_str(&format!("Total Volume:   ${:.0}\n", resolved.total_volume));
    out.push_str(&format!("Median Volume:  ${:.0}\n", resolved.median_volume));
    out.push_str(&format!(
        "Above Median:   {} Yes / {} No\n",
        resolved.high_volume_resolution.yes, resolved.high_volume_resolution.no
    ));
    out.push_str(&format!(
        "At/Below:       {} Yes / {} No\n",
        resolved.low_volume_resolution.yes, resolved.low_volume_resolution.no
    ));
    out
}
