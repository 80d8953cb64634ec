//! Oracle dispute summaries for UMA and Kleros.

use anyhow::{bail, Result};
use calib_core::{KlerosDisputeSummary, UmaDisputeSummary};
use calib_data::DisputeData;
use serde::{Deserialize, Serialize};

use super::{footer, header, opt, section, AnalysisContext};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeReport {
    pub uma: Option<UmaDisputeSummary>,
    pub kleros: Option<KlerosDisputeSummary>,
}

/// Writes `disputes.json` from the configured dispute exports.
///
/// # Errors
/// Returns an error if no request or dispute file is configured, a file
/// cannot be read, or the report cannot be written.
pub fn run_disputes(ctx: &AnalysisContext) -> Result<DisputeReport> {
    let data = DisputeData::load(&ctx.config.data)?;
    if data.is_empty() {
        bail!("No dispute records: set data.uma_requests_path or data.kleros_disputes_path");
    }
    let report = DisputeReport {
        uma: UmaDisputeSummary::compute(&data.uma_requests, &data.uma_votes),
        kleros: KlerosDisputeSummary::compute(&data.kleros_disputes, &data.kleros_votes),
    };
    let path = ctx.writer.write("disputes", &report)?;

    let mut out = format_disputes(&report);
    footer(&mut out, &ctx.writer, &path);
    println!("{out}");
    Ok(report)
}

fn format_disputes(report: &DisputeReport) -> String {
    let mut out = String::new();
    header(&mut out, "ORACLE DISPUTES");

    if let Some(uma) = &report.uma {
        section(&mut out, "UMA DVM");
        out.push_str(&format!("Requests:       {}\n", uma.total_requests));
        for (kind, count) in &uma.identifier_kinds {
            out.push_str(&format!("  {kind}: {count}\n"));
        }
        out.push_str(&format!("Avg voters:     {}\n", opt(uma.avg_voters_per_request, 1)));
        if let Some(v) = &uma.voters {
            out.push_str(&format!(
                "Voters:         {} unique, {} repeat ({:.1}%)\n",
                v.unique_voters, v.repeat_voters, v.repeat_voter_ratio
            ));
            out.push_str(&format!(
                "Top 5/10 share: {}% / {}%\n",
                opt(v.top5_token_share, 1),
                opt(v.top10_token_share, 1)
            ));
        }
        if let Some(q) = &uma.yes_no {
            out.push_str(&format!(
                "YES_OR_NO_QUERY {} (Yes {}, No {}, Indeterminate {}, Unresolvable {})\n",
                q.total, q.yes_count, q.no_count, q.indeterminate_count, q.unresolvable_count
            ));
            if let Some(c) = &q.consensus {
                out.push_str(&format!(
                    "  consensus mean {:.1}%  min {:.1}%  unanimous {:.1}%\n",
                    c.mean * 100.0,
                    c.min * 100.0,
                    c.unanimous_ratio
                ));
            }
        }
    }

    if let Some(kleros) = &report.kleros {
        section(&mut out, "KLEROS COURT");
        out.push_str(&format!(
            "Disputes:       {} ({} ruled, {:.1}%)\n",
            kleros.total_disputes, kleros.resolved_count, kleros.resolution_rate
        ));
        for (ruling, count) in &kleros.ruling_distribution {
            out.push_str(&format!("  Ruling {ruling}: {count}\n"));
        }
        out.push_str(&format!("Appeal rate:    {:.1}%\n", kleros.appeal_rate));
        if let Some(c) = &kleros.consensus {
            out.push_str(&format!(
                "Consensus:      mean {:.1}%  unanimous {:.1}%\n",
                c.mean * 100.0,
                c.unanimous_ratio
            ));
        }
        if let Some(j) = &kleros.jurors {
            out.push_str(&format!(
                "Jurors:         {} unique, {} repeat ({:.1}%)\n",
                j.unique_jurors, j.repeat_jurors, j.repeat_juror_ratio
            ));
        }
    }
    out
}
