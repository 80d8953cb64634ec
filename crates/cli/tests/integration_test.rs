use std::fs;
use std::path::Path;

use calib_cli::commands::{
    run_all, run_backtest, run_calibration, run_concentration, run_disputes, run_heatmap,
    run_significance, run_summary, HeatmapArgs, SignificanceArgs,
};
use calib_cli::{AnalysisConfig, AnalysisContext};
use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

/// Ten markets closing a month apart, alternating Yes and No, each quoted
/// at 0.9 eight days before close, plus one row with an unknown resolution.
fn write_fixture(dir: &Path) -> AnalysisConfig {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut markets = String::from("id,question,description,created_at,closed_at,resolution,volume\n");
    let mut prices = String::from("market_id,timestamp,price\n");

    for i in 0..10i64 {
        let closed = base + Duration::days(60 + 30 * i);
        let created = closed - Duration::days(60);
        let resolution = if i % 2 == 0 { "Yes" } else { "No" };
        markets.push_str(&format!(
            "m{i},Will the Fed cut rates in meeting {i}?,,{},{},{resolution},{}\n",
            created.to_rfc3339(),
            closed.to_rfc3339(),
            5_000 * (i + 1)
        ));
        prices.push_str(&format!("m{i},{},0.9\n", (closed - Duration::days(8)).to_rfc3339()));
    }
    markets.push_str(&format!(
        "bad,Unresolved market,,{},{},Pending,100\n",
        base.to_rfc3339(),
        (base + Duration::days(10)).to_rfc3339()
    ));

    fs::write(dir.join("markets.csv"), markets).unwrap();
    fs::write(dir.join("prices.csv"), prices).unwrap();
    fs::write(dir.join("balances.csv"), "holder,balance\nalice,900\nbob,50\ncarol,50\n").unwrap();

    let mut config = AnalysisConfig::default();
    config.data.markets_path = dir.join("markets.csv");
    config.data.prices_path = dir.join("prices.csv");
    config.data.balances_path = Some(dir.join("balances.csv"));
    config.data.output_dir = dir.join("out");
    config.statistics.bootstrap_iterations = 200;
    config.statistics.permutation_iterations = 200;
    config
}

fn read_report(dir: &Path, kind: &str) -> serde_json::Value {
    let text = fs::read_to_string(dir.join("out").join(format!("{kind}.json"))).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn test_load_counts_skipped_rows() {
    let dir = TempDir::new().unwrap();
    let ctx = AnalysisContext::load(write_fixture(dir.path())).unwrap();

    let summary = run_summary(&ctx).unwrap();
    assert_eq!(summary.load.markets_read, 11);
    assert_eq!(summary.load.markets_loaded, 10);
    assert_eq!(summary.load.skipped_markets.get("invalid_resolution"), Some(&1));
    assert_eq!(summary.resolved.yes_count, 5);
    assert_eq!(summary.resolved.no_count, 5);
    assert_eq!(summary.resolved.category_distribution.get("Economics"), Some(&10));
}

#[test]
fn test_overpriced_favourites_show_forty_point_bias() {
    let dir = TempDir::new().unwrap();
    let ctx = AnalysisContext::load(write_fixture(dir.path())).unwrap();

    let summary = run_calibration(&ctx).unwrap();
    let t7 = summary.horizon("t7d").unwrap();
    assert_eq!(t7.samples, 10);

    let bucket = t7.curve.buckets.iter().find(|b| b.label == "85-95%").unwrap();
    assert_eq!(bucket.count, 10);
    assert!((bucket.bias.unwrap() + 0.40).abs() < 1e-9);
    assert!((bucket.bias_pp.unwrap() + 40.0).abs() < 1e-9);

    // The only quote is eight days out, so nothing is quoted 30 days out.
    assert_eq!(summary.horizon("t30d").unwrap().samples, 0);
}

#[test]
fn test_heatmap_single_dimension() {
    let dir = TempDir::new().unwrap();
    let ctx = AnalysisContext::load(write_fixture(dir.path())).unwrap();

    let args = HeatmapArgs {
        dimension: Some("category".to_string()),
        horizon: None,
    };
    let report = run_heatmap(&ctx, &args).unwrap();
    assert_eq!(report.heatmaps.len(), 1);
    let cell = report.heatmaps[0].cell("Economics", "85-95%").unwrap();
    assert_eq!(cell.count, 10);
    // Ten samples meet the default minimum of ten.
    assert!(!cell.sparse);

    let unknown = HeatmapArgs {
        dimension: None,
        horizon: Some("t90d".to_string()),
    };
    assert!(run_heatmap(&ctx, &unknown).is_err());
}

#[test]
fn test_backtest_splits_chronologically() {
    let dir = TempDir::new().unwrap();
    let ctx = AnalysisContext::load(write_fixture(dir.path())).unwrap();

    let report = run_backtest(&ctx).unwrap();
    assert_eq!(report.train_markets, 7);
    assert_eq!(report.test_markets, 3);
    assert_eq!(report.variants.len(), 3);
    let labels: Vec<&str> = report.variants.iter().map(|v| v.label.as_str()).collect();
    assert_eq!(labels, ["Naive", "+Spread", "+Liquidity Filter"]);
}

#[test]
fn test_significance_compares_each_strategy_pair() {
    let dir = TempDir::new().unwrap();
    let ctx = AnalysisContext::load(write_fixture(dir.path())).unwrap();

    let report = run_significance(&ctx, &SignificanceArgs::default()).unwrap();
    assert_eq!(report.strategies.len(), 2);
    assert_eq!(report.comparisons.len(), 1);
    assert_eq!(report.comparisons[0].first, report.strategies[0].strategy);
    assert_eq!(report.comparisons[0].second, report.strategies[1].strategy);
}

#[test]
fn test_concentration_includes_balances() {
    let dir = TempDir::new().unwrap();
    let ctx = AnalysisContext::load(write_fixture(dir.path())).unwrap();

    let reports = run_concentration(&ctx).unwrap();
    let names: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["holder_balances", "market_volume", "category_volume"]);
    assert_eq!(reports[0].sample_size, 3);
    // One holder owns 90%.
    assert_eq!(reports[0].nakamoto, 1);
}

#[test]
fn test_run_all_writes_every_report_under_one_run_id() {
    let dir = TempDir::new().unwrap();
    let ctx = AnalysisContext::load(write_fixture(dir.path())).unwrap();
    run_all(&ctx).unwrap();

    let run_id = ctx.writer.run_id().to_string();
    for kind in [
        "summary",
        "calibration",
        "heatmap",
        "significance",
        "backtest",
        "rolling",
        "cross_validation",
        "concentration",
    ] {
        let report = read_report(dir.path(), kind);
        assert_eq!(report["kind"], kind);
        assert_eq!(report["run_id"], run_id.as_str());
    }
}

fn write_disputes(dir: &Path, config: &mut AnalysisConfig) {
    let requests = dir.join("uma_requests.csv");
    let votes = dir.join("uma_votes.csv");
    let disputes = dir.join("kleros_disputes.csv");
    fs::write(
        &requests,
        "round_id,identifier,resolution_label,num_voters,consensus_rate\n\
         1,YES_OR_NO_QUERY,Yes,30,1.0\n\
         2,YES_OR_NO_QUERY,No,25,0.7\n\
         3,Admin 41,,12,1.0\n",
    )
    .unwrap();
    fs::write(&votes, "round_id,voter,num_tokens\n1,0xa,900\n2,0xa,50\n2,0xb,50\n").unwrap();
    fs::write(
        &disputes,
        "dispute_id,ruling,num_votes,num_jurors_drawn,consensus_rate,num_appeals\n\
         10,1,3,3,1.0,0\n\
         11,,,,,1\n",
    )
    .unwrap();
    config.data.uma_requests_path = Some(requests);
    config.data.uma_votes_path = Some(votes);
    config.data.kleros_disputes_path = Some(disputes);
}

#[test]
fn test_disputes_summarise_uma_and_kleros() {
    let dir = TempDir::new().unwrap();
    let mut config = write_fixture(dir.path());
    write_disputes(dir.path(), &mut config);
    let ctx = AnalysisContext::load(config).unwrap();

    let report = run_disputes(&ctx).unwrap();
    let uma = report.uma.unwrap();
    assert_eq!(uma.total_requests, 3);
    let yes_no = uma.yes_no.unwrap();
    assert_eq!((yes_no.yes_count, yes_no.no_count), (1, 1));
    let voters = uma.voters.unwrap();
    assert_eq!(voters.repeat_voters, 1);
    assert!((voters.top5_token_share.unwrap() - 100.0).abs() < 1e-9);

    let kleros = report.kleros.unwrap();
    assert_eq!(kleros.resolved_count, 1);
    assert!((kleros.appeal_rate - 50.0).abs() < 1e-9);
    assert!(kleros.jurors.is_none());

    assert_eq!(read_report(dir.path(), "disputes")["kind"], "disputes");
}

#[test]
fn test_disputes_require_a_configured_file() {
    let dir = TempDir::new().unwrap();
    let ctx = AnalysisContext::load(write_fixture(dir.path())).unwrap();
    assert!(run_disputes(&ctx).is_err());
}

#[test]
fn test_missing_input_fails_to_load() {
    let dir = TempDir::new().unwrap();
    let mut config = write_fixture(dir.path());
    config.data.prices_path = dir.path().join("missing.csv");
    assert!(AnalysisContext::load(config).is_err());
}
