//! Immutable handle over a loaded set of resolved markets.
//!
//! The dataset owns its markets and their sorted price histories. Nothing is
//! cached globally; dropping the handle releases everything.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use calib_core::{CategoryClassifier, Horizon, LiquidityTier, Market, PriceObservation};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::records::{BalanceRecord, MarketRecord, PriceRecord, RecordError};
use crate::snapshots::{snapshot_at, CalibrationSample, Snapshot};
use crate::tiers::LiquidityTiering;

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub markets_path: PathBuf,
    pub prices_path: PathBuf,
    /// Optional holder balances for concentration metrics.
    pub balances_path: Option<PathBuf>,
    /// Optional oracle dispute exports for the dispute summaries.
    pub uma_requests_path: Option<PathBuf>,
    pub uma_votes_path: Option<PathBuf>,
    pub kleros_disputes_path: Option<PathBuf>,
    pub kleros_votes_path: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            markets_path: PathBuf::from("data/markets.csv"),
            prices_path: PathBuf::from("data/prices.csv"),
            balances_path: None,
            uma_requests_path: None,
            uma_votes_path: None,
            kleros_disputes_path: None,
            kleros_votes_path: None,
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Per-reason counts of rows that did not make it into the dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub markets_read: usize,
    pub markets_loaded: usize,
    pub observations_read: usize,
    pub observations_loaded: usize,
    pub skipped_markets: BTreeMap<String, usize>,
    pub skipped_observations: BTreeMap<String, usize>,
}

impl LoadReport {
    fn skip_market(&mut self, reason: &str) {
        *self.skipped_markets.entry(reason.to_string()).or_default() += 1;
    }

    fn skip_observation(&mut self, reason: &str) {
        *self.skipped_observations.entry(reason.to_string()).or_default() += 1;
    }

    #[must_use]
    pub fn markets_skipped(&self) -> usize {
        self.skipped_markets.values().sum()
    }

    #[must_use]
    pub fn observations_skipped(&self) -> usize {
        self.skipped_observations.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct MarketDataset {
    markets: Vec<Market>,
    index: HashMap<String, usize>,
    observations: HashMap<String, Vec<PriceObservation>>,
    tiering: LiquidityTiering,
}

impl MarketDataset {
    /// Loads `markets.csv` and `prices.csv` from the configured paths.
    ///
    /// # Errors
    /// Returns an error if either file cannot be opened or is not CSV.
    /// Individual bad rows are skipped and counted in the [`LoadReport`].
    pub fn load(
        config: &DataConfig,
        classifier: &CategoryClassifier,
    ) -> Result<(Self, LoadReport)> {
        let markets = File::open(&config.markets_path).with_context(|| {
            format!("Failed to open markets file: {}", config.markets_path.display())
        })?;
        let prices = File::open(&config.prices_path).with_context(|| {
            format!("Failed to open prices file: {}", config.prices_path.display())
        })?;
        Self::from_readers(markets, prices, classifier)
    }

    /// Loads from any pair of CSV readers with headers.
    ///
    /// # Errors
    /// Returns an error if a header row cannot be read.
    pub fn from_readers<M: Read, P: Read>(
        markets: M,
        prices: P,
        classifier: &CategoryClassifier,
    ) -> Result<(Self, LoadReport)> {
        let mut report = LoadReport::default();

        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(markets);
        reader.headers().context("Failed to read markets header")?;
        let mut parsed_markets = Vec::new();
        for (row, result) in reader.deserialize::<MarketRecord>().enumerate() {
            report.markets_read += 1;
            let market = result
                .map_err(|e| ("malformed_row", e.to_string()))
                .and_then(|record| {
                    record
                        .into_market(classifier)
                        .map_err(|e: RecordError| (e.reason(), e.to_string()))
                });
            match market {
                Ok(market) => parsed_markets.push(market),
                Err((reason, message)) => {
                    warn!(row = row + 2, reason, "Skipping market row: {}", message);
                    report.skip_market(reason);
                }
            }
        }

        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(prices);
        reader.headers().context("Failed to read prices header")?;
        let mut parsed_observations = Vec::new();
        for (row, result) in reader.deserialize::<PriceRecord>().enumerate() {
            report.observations_read += 1;
            let observation = result
                .map_err(|e| ("malformed_row", e.to_string()))
                .and_then(|record| {
                    record
                        .into_observation()
                        .map_err(|e: RecordError| (e.reason(), e.to_string()))
                });
            match observation {
                Ok(obs) => parsed_observations.push(obs),
                Err((reason, message)) => {
                    debug!(row = row + 2, reason, "Skipping price row: {}", message);
                    report.skip_observation(reason);
                }
            }
        }

        let dataset = Self::build(parsed_markets, parsed_observations, &mut report);

        if report.observations_skipped() > 0 {
            warn!(
                skipped = report.observations_skipped(),
                reasons = ?report.skipped_observations,
                "Skipped price observations"
            );
        }
        info!(
            markets = report.markets_loaded,
            markets_skipped = report.markets_skipped(),
            observations = report.observations_loaded,
            observations_skipped = report.observations_skipped(),
            "Loaded market dataset"
        );

        Ok((dataset, report))
    }

    /// Builds a dataset from already validated values. Duplicate ids,
    /// orphaned observations and observations after close are dropped with
    /// a warning.
    #[must_use]
    pub fn from_parts(markets: Vec<Market>, observations: Vec<PriceObservation>) -> Self {
        let mut report = LoadReport {
            markets_read: markets.len(),
            observations_read: observations.len(),
            ..LoadReport::default()
        };
        let dataset = Self::build(markets, observations, &mut report);
        if report.markets_skipped() + report.observations_skipped() > 0 {
            warn!(
                markets = ?report.skipped_markets,
                observations = ?report.skipped_observations,
                "Dropped inconsistent rows while building dataset"
            );
        }
        dataset
    }

    fn build(
        markets: Vec<Market>,
        observations: Vec<PriceObservation>,
        report: &mut LoadReport,
    ) -> Self {
        let mut kept = Vec::with_capacity(markets.len());
        let mut index = HashMap::with_capacity(markets.len());
        for market in markets {
            if index.contains_key(&market.id) {
                report.skip_market("duplicate_id");
                continue;
            }
            index.insert(market.id.clone(), kept.len());
            kept.push(market);
        }

        let mut by_market: HashMap<String, Vec<PriceObservation>> = HashMap::new();
        for obs in observations {
            let Some(&i) = index.get(&obs.market_id) else {
                report.skip_observation("unknown_market");
                continue;
            };
            if let Err(e) = obs.days_to_close(&kept[i]) {
                report.skip_observation(RecordError::from(e).reason());
                continue;
            }
            by_market.entry(obs.market_id.clone()).or_default().push(obs);
        }
        for series in by_market.values_mut() {
            series.sort_by_key(|o| o.timestamp);
        }

        report.markets_loaded = kept.len();
        report.observations_loaded = by_market.values().map(Vec::len).sum();

        let volumes: Vec<f64> = kept.iter().map(|m| m.volume).collect();
        Self {
            tiering: LiquidityTiering::from_volumes(&volumes),
            markets: kept,
            index,
            observations: by_market,
        }
    }

    /// Restricts the dataset to markets matching `keep`. The liquidity
    /// cut points of `self` carry over so tiers stay comparable between a
    /// full dataset and its folds.
    #[must_use]
    pub fn filter<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Market) -> bool,
    {
        let markets: Vec<Market> = self.markets.iter().filter(|m| keep(m)).cloned().collect();
        let ids: HashSet<&str> = markets.iter().map(|m| m.id.as_str()).collect();
        let observations = self
            .observations
            .iter()
            .filter(|(id, _)| ids.contains(id.as_str()))
            .map(|(id, obs)| (id.clone(), obs.clone()))
            .collect();
        let index = markets
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.clone(), i))
            .collect();
        Self {
            markets,
            index,
            observations,
            tiering: self.tiering,
        }
    }

    #[must_use]
    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    #[must_use]
    pub fn market(&self, id: &str) -> Option<&Market> {
        self.index.get(id).map(|&i| &self.markets[i])
    }

    /// Price history of a market, oldest first.
    #[must_use]
    pub fn observations(&self, market_id: &str) -> &[PriceObservation] {
        self.observations.get(market_id).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn tiering(&self) -> &LiquidityTiering {
        &self.tiering
    }

    #[must_use]
    pub fn liquidity_tier(&self, market: &Market) -> LiquidityTier {
        self.tiering.tier(market.volume)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.markets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }

    /// Earliest and latest close across all markets.
    #[must_use]
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.markets.iter().map(|m| m.closed_at).min()?;
        let end = self.markets.iter().map(|m| m.closed_at).max()?;
        Some((start, end))
    }

    #[must_use]
    pub fn snapshot(&self, market: &Market, horizon: &Horizon) -> Option<Snapshot> {
        snapshot_at(market, self.observations(&market.id), horizon)
    }

    /// One sample per market priced at `horizon`. Markets without a quote
    /// that early are left out.
    #[must_use]
    pub fn horizon_samples(&self, horizon: &Horizon) -> Vec<CalibrationSample> {
        self.markets
            .iter()
            .filter_map(|m| {
                let snap = self.snapshot(m, horizon)?;
                Some(CalibrationSample::new(
                    m,
                    self.liquidity_tier(m),
                    snap.price,
                    snap.days_to_close,
                ))
            })
            .collect()
    }
}

/// Reads `balances.csv` (`holder,balance`) for concentration metrics.
///
/// # Errors
/// Returns an error if the file cannot be opened or a row is malformed.
pub fn load_balances(path: &Path) -> Result<Vec<BalanceRecord>> {
    let balances: Vec<BalanceRecord> = read_csv(path, "balances")?;
    info!(holders = balances.len(), "Loaded balances");
    Ok(balances)
}

/// Deserializes every row of a headed CSV file, failing on the first bad row.
pub(crate) fn read_csv<T: DeserializeOwned>(path: &Path, kind: &str) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {kind} file: {}", path.display()))?;
    let mut rows = Vec::new();
    for (row, result) in reader.deserialize::<T>().enumerate() {
        rows.push(result.with_context(|| format!("Malformed {kind} row {}", row + 2))?);
    }
    Ok(rows)
}
