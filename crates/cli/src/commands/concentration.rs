//! Concentration of holder balances and of market volume.

use std::collections::BTreeMap;

use anyhow::Result;
use calib_core::ConcentrationReport;
use calib_data::load_balances;
use tracing::info;

use super::{footer, header, section, AnalysisContext};

/// Writes `concentration.json`.
///
/// Holder balances are included when `data.balances_path` is set; market
/// volume and per-category volume are always reported.
///
/// # Errors
/// Returns an error if the balances file cannot be read or the report
/// cannot be written.
pub fn run_concentration(ctx: &AnalysisContext) -> Result<Vec<ConcentrationReport>> {
    let mut reports = Vec::new();
    if let Some(path) = &ctx.config.data.balances_path {
        let balances: Vec<f64> = load_balances(path)?.iter().map(|b| b.balance).collect();
        info!(holders = balances.len(), "Loaded balances");
        reports.push(ConcentrationReport::compute("holder_balances", &balances));
    }

    let volumes: Vec<f64> = ctx.dataset.markets().iter().map(|m| m.volume).collect();
    reports.push(ConcentrationReport::compute("market_volume", &volumes));

    let mut by_category: BTreeMap<&str, f64> = BTreeMap::new();
    for market in ctx.dataset.markets() {
        *by_category.entry(market.category.label()).or_default() += market.volume;
    }
    let category_volume: Vec<f64> = by_category.into_values().collect();
    reports.push(ConcentrationReport::compute("category_volume", &category_volume));

    let path = ctx.writer.write("concentration", &reports)?;

    let mut out = String::new();
    header(&mut out, "CONCENTRATION");
    for r in &reports {
        section(&mut out, &format!("{} ({} holders)", r.name.to_uppercase(), r.sample_size));
        out.push_str(&format!("Total:          {:.2}\n", r.total));
        out.push_str(&format!(
            "Top 5/10/20:    {:.1}% / {:.1}% / {:.1}%\n",
            r.top5_share, r.top10_share, r.top20_share
        ));
        out.push_str(&format!("Gini:           {:.4} ({:?})\n", r.gini, r.gini_band));
        out.push_str(&format!("HHI:            {:.0} ({:?})\n", r.hhi, r.hhi_band));
        out.push_str(&format!("Nakamoto:       {}\n", r.nakamoto));
        out.push_str(&format!(
            "Entropy:        {:.4} (normalized {:.4})\n",
            r.entropy, r.normalized_entropy
        ));
        out.push_str(&format!("Theil:          {:.4}\n", r.theil));
    }
    footer(&mut out, &ctx.writer, &path);
    println!("{out}");
    Ok(reports)
}
