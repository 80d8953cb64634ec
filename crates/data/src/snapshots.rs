//! Horizon snapshots and the flat samples fed to calibration.

use calib_core::{
    Category, DaysToCloseBucket, Horizon, LiquidityTier, Market, PriceObservation, VolumeTier,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Quoted price of one market at a fixed offset before close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub market_id: String,
    pub horizon: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub days_to_close: f64,
}

/// Latest observation at or before `closed_at - horizon`.
///
/// `observations` must be sorted by timestamp; the dataset keeps them that
/// way. Returns `None` when the market has no quote that early.
#[must_use]
pub fn snapshot_at(
    market: &Market,
    observations: &[PriceObservation],
    horizon: &Horizon,
) -> Option<Snapshot> {
    let cutoff = market.closed_at - horizon.offset();
    let idx = observations.partition_point(|o| o.timestamp <= cutoff);
    let obs = observations.get(idx.checked_sub(1)?)?;
    Some(Snapshot {
        market_id: market.id.clone(),
        horizon: horizon.label.clone(),
        timestamp: obs.timestamp,
        price: obs.price,
        days_to_close: (market.closed_at - obs.timestamp).num_seconds() as f64 / SECONDS_PER_DAY,
    })
}

/// A (price, outcome) pair carrying every key the slicer can group by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub market_id: String,
    pub price: f64,
    /// 1.0 when the market resolved Yes.
    pub outcome: f64,
    pub category: Category,
    pub liquidity_tier: LiquidityTier,
    pub volume_tier: VolumeTier,
    pub volume: f64,
    pub days_to_close: f64,
    pub closed_at: DateTime<Utc>,
}

impl CalibrationSample {
    #[must_use]
    pub fn new(market: &Market, tier: LiquidityTier, price: f64, days_to_close: f64) -> Self {
        Self {
            market_id: market.id.clone(),
            price,
            outcome: market.outcome(),
            category: market.category,
            liquidity_tier: tier,
            volume_tier: market.volume_tier(),
            volume: market.volume,
            days_to_close,
            closed_at: market.closed_at,
        }
    }

    #[must_use]
    pub fn days_bucket(&self) -> DaysToCloseBucket {
        DaysToCloseBucket::from_days(self.days_to_close)
    }

    /// Signed deviation of the outcome from the quote.
    #[must_use]
    pub fn bias(&self) -> f64 {
        self.outcome - self.price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calib_core::Resolution;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
    }

    fn market() -> Market {
        Market::try_new("m", "q", None, Category::Other, day(1), day(29), Resolution::No, 10.0).unwrap()
    }

    fn observations() -> Vec<PriceObservation> {
        [(2, 0.30), (10, 0.40), (21, 0.55), (22, 0.60), (28, 0.20)]
            .iter()
            .map(|(d, p)| PriceObservation::try_new("m", day(*d), *p).unwrap())
            .collect()
    }

    #[test]
    fn snapshot_takes_latest_quote_before_cutoff() {
        let obs = observations();
        let m = market();

        let t7 = snapshot_at(&m, &obs, &Horizon::new("t7d", 7)).unwrap();
        // cutoff is day 22 exactly, which is inclusive
        assert!((t7.price - 0.60).abs() < 1e-12);
        assert!((t7.days_to_close - 7.0).abs() < 1e-9);

        let t0 = snapshot_at(&m, &obs, &Horizon::new("t0", 0)).unwrap();
        assert!((t0.price - 0.20).abs() < 1e-12);

        let t1 = snapshot_at(&m, &obs, &Horizon::new("t1d", 1)).unwrap();
        assert!((t1.price - 0.20).abs() < 1e-12);
    }

    #[test]
    fn snapshot_missing_when_no_quote_is_early_enough() {
        let obs = observations();
        assert!(snapshot_at(&market(), &obs, &Horizon::new("t30d", 30)).is_none());
        assert!(snapshot_at(&market(), &[], &Horizon::new("t0", 0)).is_none());
    }

    #[test]
    fn sample_bias_is_outcome_minus_price() {
        let sample = CalibrationSample::new(&market(), LiquidityTier::Thin, 0.25, 3.0);
        assert!((sample.bias() + 0.25).abs() < 1e-12);
        assert_eq!(sample.days_bucket(), DaysToCloseBucket::UnderOneWeek);
    }
}
