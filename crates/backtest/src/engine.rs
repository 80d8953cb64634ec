//! Backtest engine for trading against a learned calibration bias.
//!
//! A run trains a [`BiasTable`] on one dataset and replays a
//! [`StrategyRule`] over another:
//!
//! 1. Markets failing the liquidity, category or volume filter are skipped.
//! 2. The Yes price is read at the entry horizon (default `t7d`) and must
//!    fall inside the rule's band.
//! 3. The win probability of the chosen side is its price adjusted by the
//!    trained bias for that bucket.
//! 4. A fractional Kelly stake is sized on the fixed initial bankroll, an
//!    entry spread is charged by liquidity tier and the position is held to
//!    resolution.
//!
//! Trades are reported in (entry time, market id) order so that results do
//! not depend on the order markets were loaded in.

use std::fmt;

use calib_core::{Category, Horizon, KellySizer, LiquidityTier, Market, Side, StatsError};
use calib_data::MarketDataset;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calibration::{BiasTable, CalibrationEstimator};
use crate::metrics::StrategyMetrics;
use crate::spread::{SpreadModel, TieredSpread, ZeroSpread};

/// Which side to buy and the Yes-price band that triggers an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRule {
    pub name: String,
    pub side: Side,
    /// Inclusive lower bound on the Yes price.
    pub min_price: f64,
    /// Inclusive upper bound on the Yes price.
    pub max_price: f64,
}

impl StrategyRule {
    #[must_use]
    pub fn new(name: &str, side: Side, min_price: f64, max_price: f64) -> Self {
        Self {
            name: name.to_string(),
            side,
            min_price,
            max_price,
        }
    }

    /// Buy No when the market is undecided.
    #[must_use]
    pub fn buy_no_mid() -> Self {
        Self::new("buy_no_mid", Side::No, 0.35, 0.65)
    }

    /// Buy Yes on heavy favourites.
    #[must_use]
    pub fn buy_yes_high() -> Self {
        Self::new("buy_yes_high", Side::Yes, 0.85, 0.99)
    }

    #[must_use]
    pub fn matches(&self, yes_price: f64) -> bool {
        yes_price >= self.min_price && yes_price <= self.max_price
    }
}

/// Configuration for a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Bankroll every stake is sized against.
    pub initial_bankroll: Decimal,
    /// Fraction of full Kelly to stake.
    pub kelly_fraction: Decimal,
    /// Largest share of bankroll a single trade may take.
    pub max_bankroll_fraction: Decimal,
    pub max_stake: Decimal,
    /// Minimum edge (q - c) for a trade.
    pub min_edge: Decimal,
    /// Snapshot horizon at which positions are entered.
    pub entry_horizon: Horizon,
    /// Buckets trained on fewer samples are not traded.
    pub min_bias_samples: usize,
    pub spread: TieredSpread,
    /// Liquidity tiers that may be traded.
    pub liquidity_filter: Vec<LiquidityTier>,
    /// Categories that may be traded; empty admits all.
    pub categories: Vec<Category>,
    pub min_volume: f64,
    pub strategies: Vec<StrategyRule>,
    /// Share of markets, by close time, used for training in a single
    /// train/test backtest.
    pub train_fraction: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_bankroll: dec!(10000),
            kelly_fraction: dec!(0.25),
            max_bankroll_fraction: dec!(0.05),
            max_stake: dec!(1000),
            min_edge: dec!(0.01),
            entry_horizon: Horizon::new("t7d", 7),
            min_bias_samples: 5,
            spread: TieredSpread::default(),
            liquidity_filter: vec![
                LiquidityTier::Moderate,
                LiquidityTier::Deep,
                LiquidityTier::VeryDeep,
            ],
            categories: Vec::new(),
            min_volume: 0.0,
            strategies: vec![StrategyRule::buy_no_mid(), StrategyRule::buy_yes_high()],
            train_fraction: 0.7,
        }
    }
}

impl BacktestConfig {
    #[must_use]
    pub fn sizer(&self) -> KellySizer {
        KellySizer::new(
            self.kelly_fraction,
            self.max_bankroll_fraction,
            self.max_stake,
            self.min_edge,
        )
    }

    /// Whether a market passes the liquidity, category and volume filters.
    #[must_use]
    pub fn admits(&self, market: &Market, tier: LiquidityTier) -> bool {
        self.liquidity_filter.contains(&tier)
            && (self.categories.is_empty() || self.categories.contains(&market.category))
            && market.volume >= self.min_volume
    }
}

/// Cost assumptions compared side by side in a backtest report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostVariant {
    /// No spread and no liquidity filter.
    Naive,
    /// Tiered spread, every liquidity tier traded.
    WithSpread,
    /// Tiered spread and the configured liquidity filter.
    WithLiquidityFilter,
}

impl CostVariant {
    pub const ALL: [CostVariant; 3] = [
        CostVariant::Naive,
        CostVariant::WithSpread,
        CostVariant::WithLiquidityFilter,
    ];

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Naive => "Naive",
            Self::WithSpread => "+Spread",
            Self::WithLiquidityFilter => "+Liquidity Filter",
        }
    }

    /// The base configuration with this variant's costs and filter applied.
    #[must_use]
    pub fn configure(&self, base: &BacktestConfig) -> BacktestConfig {
        let mut config = base.clone();
        match self {
            Self::Naive => {
                config.spread = TieredSpread::zero();
                config.liquidity_filter = LiquidityTier::ALL.to_vec();
            }
            Self::WithSpread => {
                config.liquidity_filter = LiquidityTier::ALL.to_vec();
            }
            Self::WithLiquidityFilter => {}
        }
        config
    }
}

impl fmt::Display for CostVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One simulated position held to resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub market_id: String,
    pub strategy: String,
    pub side: Side,
    pub entry_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    /// Quoted Yes price at entry.
    pub yes_price: f64,
    /// Price paid for the chosen side.
    pub entry_price: Decimal,
    /// Bias-adjusted probability that the chosen side wins.
    pub win_probability: f64,
    pub liquidity_tier: LiquidityTier,
    pub category: Category,
    pub stake: Decimal,
    pub spread_cost: Decimal,
    pub won: bool,
    pub pnl: Decimal,
}

impl Trade {
    /// Net P&L of a binary position: a win pays `stake * (1 - c) / c`, a
    /// loss forfeits the stake, and the spread is paid either way.
    #[must_use]
    pub fn settle_pnl(stake: Decimal, entry_price: Decimal, spread_cost: Decimal, won: bool) -> Decimal {
        let gross = if won {
            stake * (Decimal::ONE - entry_price) / entry_price
        } else {
            -stake
        };
        gross - spread_cost
    }

    #[must_use]
    pub fn return_on_stake(&self) -> f64 {
        if self.stake.is_zero() {
            return 0.0;
        }
        (self.pnl / self.stake).to_f64().unwrap_or(0.0)
    }
}

/// Markets considered but not traded, by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    /// Failed the liquidity, category or volume filter.
    pub filtered: usize,
    /// No quote at the entry horizon.
    pub no_price: usize,
    /// Entry price outside the strategy band.
    pub out_of_band: usize,
    /// Price bucket without a trained bias.
    pub no_bias: usize,
    /// Sizer declined: edge below the minimum or negative EV.
    pub no_edge: usize,
}

impl SkipCounts {
    #[must_use]
    pub fn total(&self) -> usize {
        self.filtered + self.no_price + self.out_of_band + self.no_bias + self.no_edge
    }
}

/// Outcome of replaying one strategy over one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub strategy: String,
    pub side: Side,
    pub spread_model: String,
    pub markets_considered: usize,
    /// Markets that passed the filters.
    pub eligible: usize,
    pub skipped: SkipCounts,
    pub trades: Vec<Trade>,
    pub metrics: StrategyMetrics,
}

/// All strategies under one cost variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantResult {
    pub variant: CostVariant,
    pub label: String,
    pub results: Vec<StrategyResult>,
}

pub struct BacktestEngine {
    config: BacktestConfig,
    estimator: CalibrationEstimator,
    spread: Box<dyn SpreadModel>,
}

impl BacktestEngine {
    /// Builds an engine charging the configured tiered spread.
    #[must_use]
    pub fn new(config: BacktestConfig, estimator: CalibrationEstimator) -> Self {
        let spread: Box<dyn SpreadModel> = if config.spread == TieredSpread::zero() {
            Box::new(ZeroSpread)
        } else {
            Box::new(config.spread)
        };
        Self {
            config,
            estimator,
            spread,
        }
    }

    #[must_use]
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Learns per-bucket bias from the entry-horizon prices of `train`.
    #[must_use]
    pub fn train(&self, train: &MarketDataset) -> BiasTable {
        let samples = train.horizon_samples(&self.config.entry_horizon);
        let curve = self.estimator.estimate(&samples);
        let table = BiasTable::from_curve(&curve, self.config.min_bias_samples);
        debug!(
            samples = samples.len(),
            trained_buckets = table.trained_buckets(),
            "Trained bias table"
        );
        table
    }

    /// Replays `rule` over `test` using a previously trained table.
    #[must_use]
    pub fn run(&self, test: &MarketDataset, table: &BiasTable, rule: &StrategyRule) -> StrategyResult {
        let sizer = self.config.sizer();
        let mut skipped = SkipCounts::default();
        let mut trades = Vec::new();
        let mut eligible = 0;

        for market in test.markets() {
            let tier = test.liquidity_tier(market);
            if !self.config.admits(market, tier) {
                skipped.filtered += 1;
                continue;
            }
            eligible += 1;

            let Some(snapshot) = test.snapshot(market, &self.config.entry_horizon) else {
                skipped.no_price += 1;
                continue;
            };
            let yes_price = snapshot.price;
            if !rule.matches(yes_price) {
                skipped.out_of_band += 1;
                continue;
            }
            let Some(bias) = table.lookup(yes_price) else {
                skipped.no_bias += 1;
                continue;
            };

            let yes_probability = (yes_price + bias).clamp(0.0, 1.0);
            let win_probability = match rule.side {
                Side::Yes => yes_probability,
                Side::No => 1.0 - yes_probability,
            };
            let (Some(q), Some(c)) = (to_decimal(win_probability), to_decimal(rule.side.price(yes_price)))
            else {
                skipped.no_price += 1;
                continue;
            };

            let decision = sizer.size(q, c, self.config.initial_bankroll);
            if !decision.should_bet {
                skipped.no_edge += 1;
                continue;
            }

            let stake = decision.stake;
            let spread_cost = self.spread.spread_cost(stake, tier);
            let won = rule.side.wins(market.resolution);
            trades.push(Trade {
                market_id: market.id.clone(),
                strategy: rule.name.clone(),
                side: rule.side,
                entry_time: snapshot.timestamp,
                close_time: market.closed_at,
                yes_price,
                entry_price: c,
                win_probability,
                liquidity_tier: tier,
                category: market.category,
                stake,
                spread_cost,
                won,
                pnl: Trade::settle_pnl(stake, c, spread_cost, won),
            });
        }

        trades.sort_by(|a, b| {
            a.entry_time
                .cmp(&b.entry_time)
                .then_with(|| a.market_id.cmp(&b.market_id))
        });
        let metrics = StrategyMetrics::from_trades(&trades, self.config.initial_bankroll);

        info!(
            strategy = %rule.name,
            spread = self.spread.name(),
            trades = metrics.trades,
            roi = %metrics.roi.round_dp(4),
            skipped = skipped.total(),
            "Backtest complete"
        );

        StrategyResult {
            strategy: rule.name.clone(),
            side: rule.side,
            spread_model: self.spread.name().to_string(),
            markets_considered: test.len(),
            eligible,
            skipped,
            trades,
            metrics,
        }
    }

    /// Trains on `train` and replays every configured strategy on `test`.
    #[must_use]
    pub fn run_all(&self, train: &MarketDataset, test: &MarketDataset) -> Vec<StrategyResult> {
        let table = self.train(train);
        self.config
            .strategies
            .iter()
            .map(|rule| self.run(test, &table, rule))
            .collect()
    }
}

/// Runs every strategy under each [`CostVariant`] so the naive, spread
/// adjusted and liquidity filtered ROI can be reported together.
#[must_use]
pub fn run_variants(
    config: &BacktestConfig,
    estimator: &CalibrationEstimator,
    train: &MarketDataset,
    test: &MarketDataset,
) -> Vec<VariantResult> {
    CostVariant::ALL
        .iter()
        .map(|variant| {
            let engine = BacktestEngine::new(variant.configure(config), estimator.clone());
            VariantResult {
                variant: *variant,
                label: variant.label().to_string(),
                results: engine.run_all(train, test),
            }
        })
        .collect()
}

/// Splits at the close time of the market `train_fraction` of the way
/// through the close order: later closes test, and markets closing at
/// least `embargo` before the cutoff train. Markets resolving inside the
/// embargo are dropped because test trades are entered that long before
/// close.
///
/// # Errors
/// Rejects a fraction outside (0, 1) and datasets with fewer than two
/// markets.
pub fn chronological_split(
    dataset: &MarketDataset,
    train_fraction: f64,
    embargo: Duration,
) -> Result<(MarketDataset, MarketDataset), StatsError> {
    if !(train_fraction > 0.0 && train_fraction < 1.0) {
        return Err(StatsError::InvalidParameter {
            name: "train_fraction",
            reason: format!("{train_fraction} is not in (0, 1)"),
        });
    }
    let mut closes: Vec<DateTime<Utc>> = dataset.markets().iter().map(|m| m.closed_at).collect();
    if closes.len() < 2 {
        return Err(StatsError::InsufficientSamples {
            context: "chronological split",
            needed: 2,
            got: closes.len(),
        });
    }
    closes.sort();
    let idx = ((closes.len() as f64 * train_fraction) as usize).clamp(1, closes.len() - 1);
    let cutoff = closes[idx];
    let train_end = cutoff - embargo.max(Duration::zero());
    Ok((
        dataset.filter(|m| m.closed_at < train_end),
        dataset.filter(|m| m.closed_at >= cutoff),
    ))
}

fn to_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(6))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::calibration::BucketScheme;
    use calib_core::{PriceObservation, Resolution};
    use chrono::{Duration, TimeZone};

    pub(crate) fn ts(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day)
    }

    pub(crate) fn market(id: &str, created: i64, closed: i64, resolution: Resolution, volume: f64) -> Market {
        Market::try_new(id, "q", None, Category::Other, ts(created), ts(closed), resolution, volume).unwrap()
    }

    /// A market quoted once, eight days before close.
    pub(crate) fn quoted(
        id: &str,
        created: i64,
        closed: i64,
        resolution: Resolution,
        price: f64,
    ) -> (Market, PriceObservation) {
        (
            market(id, created, closed, resolution, 50_000.0),
            PriceObservation::try_new(id, ts(closed - 8), price).unwrap(),
        )
    }

    pub(crate) fn dataset(rows: Vec<(Market, PriceObservation)>) -> MarketDataset {
        let (markets, observations) = rows.into_iter().unzip();
        MarketDataset::from_parts(markets, observations)
    }

    pub(crate) fn trade(id: &str, day: i64, entry_price: Decimal, stake: Decimal, spread: Decimal, won: bool) -> Trade {
        Trade {
            market_id: id.to_string(),
            strategy: "test".to_string(),
            side: Side::Yes,
            entry_time: ts(day),
            close_time: ts(day + 7),
            yes_price: entry_price.to_f64().unwrap(),
            entry_price,
            win_probability: 0.5,
            liquidity_tier: LiquidityTier::Moderate,
            category: Category::Other,
            stake,
            spread_cost: spread,
            won,
            pnl: Trade::settle_pnl(stake, entry_price, spread, won),
        }
    }

    /// Ten markets at 0.9, half resolving Yes: bias -0.40 in the 85-95% bucket.
    pub(crate) fn overpriced_training() -> MarketDataset {
        dataset(
            (0..10)
                .map(|i| {
                    let res = if i % 2 == 0 { Resolution::Yes } else { Resolution::No };
                    quoted(&format!("train{i}"), 0, 20 + i, res, 0.9)
                })
                .collect(),
        )
    }

    fn engine(config: BacktestConfig) -> BacktestEngine {
        BacktestEngine::new(config, CalibrationEstimator::new(BucketScheme::default()).unwrap())
    }

    fn all_tiers_no_spread() -> BacktestConfig {
        BacktestConfig {
            spread: TieredSpread::zero(),
            liquidity_filter: LiquidityTier::ALL.to_vec(),
            ..BacktestConfig::default()
        }
    }

    fn fade_favourites() -> StrategyRule {
        StrategyRule::new("fade", Side::No, 0.85, 0.99)
    }

    fn test_rows() -> Vec<(Market, PriceObservation)> {
        vec![
            quoted("t1", 40, 60, Resolution::No, 0.9),
            quoted("t2", 40, 61, Resolution::Yes, 0.9),
            quoted("t3", 40, 62, Resolution::No, 0.9),
            quoted("t4", 40, 63, Resolution::Yes, 0.9),
        ]
    }

    // ============================================================
    // Strategy Rule Tests
    // ============================================================

    #[test]
    fn band_is_inclusive() {
        let rule = StrategyRule::buy_no_mid();
        assert!(rule.matches(0.35));
        assert!(rule.matches(0.65));
        assert!(!rule.matches(0.66));
        assert_eq!(StrategyRule::buy_yes_high().side, Side::Yes);
    }

    #[test]
    fn settle_pnl_pays_odds_net_of_spread() {
        assert_eq!(Trade::settle_pnl(dec!(100), dec!(0.25), dec!(2), true), dec!(298));
        assert_eq!(Trade::settle_pnl(dec!(100), dec!(0.25), dec!(2), false), dec!(-102));
    }

    // ============================================================
    // Engine Tests
    // ============================================================

    #[test]
    fn training_learns_bucket_bias() {
        let table = engine(BacktestConfig::default()).train(&overpriced_training());
        assert_eq!(table.trained_buckets(), 1);
        assert!((table.lookup(0.9).unwrap() + 0.4).abs() < 1e-9);
        assert!(table.lookup(0.5).is_none());
    }

    #[test]
    fn fading_overpriced_favourites_is_profitable() {
        let engine = engine(all_tiers_no_spread());
        let table = engine.train(&overpriced_training());
        let result = engine.run(&dataset(test_rows()), &table, &fade_favourites());

        // q(No) = 0.5 at c = 0.1: full Kelly 0.444, quarter Kelly capped at 5%.
        assert_eq!(result.trades.len(), 4);
        assert!(result.trades.iter().all(|t| t.stake == dec!(500)));
        assert!((result.trades[0].win_probability - 0.5).abs() < 1e-9);
        assert_eq!(result.trades[0].entry_price, dec!(0.1));

        // Two wins at +4500, two losses at -500.
        assert_eq!(result.metrics.net_pnl, dec!(8000));
        assert_eq!(result.metrics.roi, dec!(4));
        assert_eq!(result.eligible, 4);
        assert_eq!(result.skipped.total(), 0);
    }

    #[test]
    fn buying_overpriced_favourites_has_no_edge() {
        let engine = engine(all_tiers_no_spread());
        let table = engine.train(&overpriced_training());
        let result = engine.run(&dataset(test_rows()), &table, &StrategyRule::buy_yes_high());

        assert!(result.trades.is_empty());
        assert_eq!(result.skipped.no_edge, 4);
        assert_eq!(result.metrics.roi, Decimal::ZERO);
    }

    #[test]
    fn roi_does_not_depend_on_market_order() {
        let engine = engine(all_tiers_no_spread());
        let table = engine.train(&overpriced_training());

        let forward = engine.run(&dataset(test_rows()), &table, &fade_favourites());
        let mut reversed_rows = test_rows();
        reversed_rows.reverse();
        let reversed = engine.run(&dataset(reversed_rows), &table, &fade_favourites());

        assert_eq!(forward.trades, reversed.trades);
        assert_eq!(forward.metrics, reversed.metrics);
    }

    #[test]
    fn skips_are_counted_by_reason() {
        let engine = engine(all_tiers_no_spread());
        let table = engine.train(&overpriced_training());

        let mut rows = test_rows();
        rows.push(quoted("band", 40, 60, Resolution::No, 0.5));
        rows.push(quoted("untrained", 40, 60, Resolution::No, 0.97));
        let (late, _) = quoted("late", 55, 60, Resolution::No, 0.9);
        let late_obs = PriceObservation::try_new("late", ts(58), 0.9).unwrap();
        rows.push((late, late_obs));

        let result = engine.run(&dataset(rows), &table, &fade_favourites());
        assert_eq!(result.trades.len(), 4);
        assert_eq!(result.skipped.out_of_band, 1);
        assert_eq!(result.skipped.no_bias, 1);
        assert_eq!(result.skipped.no_price, 1);
        assert_eq!(result.markets_considered, 7);
    }

    #[test]
    fn spread_is_charged_by_tier() {
        // Equal volumes put every market at the first quartile: Thin, 4 cents.
        let config = BacktestConfig {
            liquidity_filter: LiquidityTier::ALL.to_vec(),
            ..BacktestConfig::default()
        };
        let engine = engine(config);
        let table = engine.train(&overpriced_training());
        let result = engine.run(&dataset(test_rows()), &table, &fade_favourites());

        assert!(result.trades.iter().all(|t| t.liquidity_tier == LiquidityTier::Thin));
        assert!(result.trades.iter().all(|t| t.spread_cost == dec!(20)));
        assert_eq!(result.metrics.net_pnl, dec!(7920));
        assert_eq!(result.spread_model, "tiered");
    }

    #[test]
    fn liquidity_filter_excludes_thin_markets() {
        let engine = engine(BacktestConfig::default());
        let table = engine.train(&overpriced_training());
        let result = engine.run(&dataset(test_rows()), &table, &fade_favourites());

        assert!(result.trades.is_empty());
        assert_eq!(result.skipped.filtered, 4);
        assert_eq!(result.eligible, 0);
    }

    #[test]
    fn chronological_split_trains_on_earlier_closes() {
        let data = overpriced_training();
        let (train, test) = chronological_split(&data, 0.7, Duration::zero()).unwrap();
        assert_eq!(train.len(), 7);
        assert_eq!(test.len(), 3);
        let last_train = train.markets().iter().map(|m| m.closed_at).max().unwrap();
        assert!(test.markets().iter().all(|m| m.closed_at > last_train));

        assert!(chronological_split(&data, 1.0, Duration::zero()).is_err());
    }

    #[test]
    fn chronological_split_embargoes_markets_resolving_after_test_entries() {
        // Closes on days 20..=29, cutoff at day 27. A test market closing
        // on day 27 is entered on day 24, so days 24..=26 are unknown then.
        let data = overpriced_training();
        let (train, test) = chronological_split(&data, 0.7, Duration::days(3)).unwrap();
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 4);
        let earliest_entry = test.markets().iter().map(|m| m.closed_at).min().unwrap() - Duration::days(3);
        assert!(train.markets().iter().all(|m| m.closed_at < earliest_entry));
    }

    #[test]
    fn variants_report_naive_spread_and_filtered_lines() {
        let config = BacktestConfig {
            strategies: vec![fade_favourites()],
            ..BacktestConfig::default()
        };
        let estimator = CalibrationEstimator::new(BucketScheme::default()).unwrap();
        let variants = run_variants(&config, &estimator, &overpriced_training(), &dataset(test_rows()));

        assert_eq!(variants.len(), 3);
        let pnl: Vec<Decimal> = variants.iter().map(|v| v.results[0].metrics.net_pnl).collect();
        assert_eq!(pnl, vec![dec!(8000), dec!(7920), Decimal::ZERO]);
        assert_eq!(variants[0].results[0].spread_model, "zero");
        assert_eq!(variants[2].label, "+Liquidity Filter");
    }
}
