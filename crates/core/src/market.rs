//! Resolved-market domain types.
//!
//! A [`Market`] is immutable once resolved. Its category is assigned by the
//! classifier when the dataset is built, and its liquidity tier is derived
//! from the volume distribution of whichever dataset it belongs to, so
//! neither is read from input files.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Topical bucket assigned by keyword classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Sports,
    Politics,
    Crypto,
    Geopolitics,
    Economics,
    Weather,
    #[serde(rename = "Social Media")]
    SocialMedia,
    Other,
}

impl Category {
    /// All categories in declaration order.
    pub const ALL: [Category; 8] = [
        Category::Sports,
        Category::Politics,
        Category::Crypto,
        Category::Geopolitics,
        Category::Economics,
        Category::Weather,
        Category::SocialMedia,
        Category::Other,
    ];

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Sports => "Sports",
            Self::Politics => "Politics",
            Self::Crypto => "Crypto",
            Self::Geopolitics => "Geopolitics",
            Self::Economics => "Economics",
            Self::Weather => "Weather",
            Self::SocialMedia => "Social Media",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Final resolution of a binary market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    Yes,
    No,
}

impl Resolution {
    /// Resolution as a 0/1 outcome for the Yes token.
    #[must_use]
    pub const fn outcome(&self) -> f64 {
        match self {
            Self::Yes => 1.0,
            Self::No => 0.0,
        }
    }

    /// Parses `Yes`/`No` case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "1" | "true" => Some(Self::Yes),
            "no" | "0" | "false" => Some(Self::No),
            _ => None,
        }
    }
}

/// Which token a simulated position buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    /// Price of this side's token given the quoted Yes probability.
    #[must_use]
    pub fn price(&self, yes_price: f64) -> f64 {
        match self {
            Self::Yes => yes_price,
            Self::No => 1.0 - yes_price,
        }
    }

    #[must_use]
    pub fn wins(&self, resolution: Resolution) -> bool {
        matches!(
            (self, resolution),
            (Self::Yes, Resolution::Yes) | (Self::No, Resolution::No)
        )
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => f.write_str("Yes"),
            Self::No => f.write_str("No"),
        }
    }
}

/// Fixed volume bands used in the tier analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VolumeTier {
    #[serde(rename = "<10K")]
    Under10K,
    #[serde(rename = "10K+")]
    Over10K,
    #[serde(rename = "100K+")]
    Over100K,
    #[serde(rename = "1M+")]
    Over1M,
}

impl VolumeTier {
    /// Highest tier first.
    pub const ALL: [VolumeTier; 4] = [
        VolumeTier::Over1M,
        VolumeTier::Over100K,
        VolumeTier::Over10K,
        VolumeTier::Under10K,
    ];

    /// Classifies a total traded volume in USD.
    #[must_use]
    pub fn from_volume(volume: f64) -> Self {
        if volume >= 1_000_000.0 {
            Self::Over1M
        } else if volume >= 100_000.0 {
            Self::Over100K
        } else if volume >= 10_000.0 {
            Self::Over10K
        } else {
            Self::Under10K
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Under10K => "<10K",
            Self::Over10K => "10K+",
            Self::Over100K => "100K+",
            Self::Over1M => "1M+",
        }
    }
}

impl fmt::Display for VolumeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Volume quartile of a market within its dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LiquidityTier {
    /// At or below the first quartile.
    Thin,
    /// Between the first quartile and the median.
    Moderate,
    /// Between the median and the third quartile.
    Deep,
    /// Above the third quartile.
    VeryDeep,
}

impl LiquidityTier {
    pub const ALL: [LiquidityTier; 4] = [
        LiquidityTier::Thin,
        LiquidityTier::Moderate,
        LiquidityTier::Deep,
        LiquidityTier::VeryDeep,
    ];

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Thin => "Thin",
            Self::Moderate => "Moderate",
            Self::Deep => "Deep",
            Self::VeryDeep => "VeryDeep",
        }
    }
}

impl fmt::Display for LiquidityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse days-to-close band for cross-sectional slicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DaysToCloseBucket {
    #[serde(rename = "0-1d")]
    UnderOneDay,
    #[serde(rename = "1-7d")]
    UnderOneWeek,
    #[serde(rename = "7-30d")]
    UnderOneMonth,
    #[serde(rename = "30-90d")]
    UnderOneQuarter,
    #[serde(rename = "90d+")]
    Longer,
}

impl DaysToCloseBucket {
    pub const ALL: [DaysToCloseBucket; 5] = [
        DaysToCloseBucket::UnderOneDay,
        DaysToCloseBucket::UnderOneWeek,
        DaysToCloseBucket::UnderOneMonth,
        DaysToCloseBucket::UnderOneQuarter,
        DaysToCloseBucket::Longer,
    ];

    #[must_use]
    pub fn from_days(days: f64) -> Self {
        if days < 1.0 {
            Self::UnderOneDay
        } else if days < 7.0 {
            Self::UnderOneWeek
        } else if days < 30.0 {
            Self::UnderOneMonth
        } else if days < 90.0 {
            Self::UnderOneQuarter
        } else {
            Self::Longer
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::UnderOneDay => "0-1d",
            Self::UnderOneWeek => "1-7d",
            Self::UnderOneMonth => "7-30d",
            Self::UnderOneQuarter => "30-90d",
            Self::Longer => "90d+",
        }
    }
}

impl fmt::Display for DaysToCloseBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Labelled offset before close at which a price snapshot is taken.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Horizon {
    /// Short label, e.g. `t7d`.
    pub label: String,
    /// Offset before close in days.
    pub offset_days: i64,
}

impl Horizon {
    #[must_use]
    pub fn new(label: &str, offset_days: i64) -> Self {
        Self {
            label: label.to_string(),
            offset_days,
        }
    }

    /// The four horizons tracked by the calibration study.
    #[must_use]
    pub fn standard() -> Vec<Horizon> {
        vec![
            Horizon::new("t0", 0),
            Horizon::new("t1d", 1),
            Horizon::new("t7d", 7),
            Horizon::new("t30d", 30),
        ]
    }

    #[must_use]
    pub fn offset(&self) -> Duration {
        Duration::days(self.offset_days)
    }
}

/// A resolved binary market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub question: String,
    pub description: Option<String>,
    pub category: Category,
    pub created_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub resolution: Resolution,
    /// Total traded volume in USD.
    pub volume: f64,
}

impl Market {
    /// Validates and builds a market.
    ///
    /// # Errors
    /// Returns a [`DomainError`] when the id is blank, the volume is negative
    /// or not finite, or the market closes before it was created.
    #[allow(clippy::too_many_arguments)]
    pub fn try_new(
        id: impl Into<String>,
        question: impl Into<String>,
        description: Option<String>,
        category: Category,
        created_at: DateTime<Utc>,
        closed_at: DateTime<Utc>,
        resolution: Resolution,
        volume: f64,
    ) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::EmptyMarketId);
        }
        if !volume.is_finite() || volume < 0.0 {
            return Err(DomainError::NegativeVolume { volume });
        }
        if closed_at < created_at {
            return Err(DomainError::CloseBeforeCreation { market_id: id });
        }
        Ok(Self {
            id,
            question: question.into(),
            description,
            category,
            created_at,
            closed_at,
            resolution,
            volume,
        })
    }

    /// Question and description joined for keyword matching.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.description {
            Some(desc) if !desc.is_empty() => format!("{} {}", self.question, desc),
            _ => self.question.clone(),
        }
    }

    #[must_use]
    pub fn outcome(&self) -> f64 {
        self.resolution.outcome()
    }

    #[must_use]
    pub fn volume_tier(&self) -> VolumeTier {
        VolumeTier::from_volume(self.volume)
    }

    /// Whether any part of `[created_at, closed_at]` falls in `[start, end)`.
    #[must_use]
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.created_at < end && self.closed_at >= start
    }
}

/// A quoted Yes probability at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub market_id: String,
    pub timestamp: DateTime<Utc>,
    /// Quoted probability in [0, 1].
    pub price: f64,
}

impl PriceObservation {
    /// Validates the quoted probability.
    ///
    /// # Errors
    /// Returns [`DomainError::PriceOutOfRange`] for prices outside [0, 1] or NaN.
    pub fn try_new(
        market_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        price: f64,
    ) -> Result<Self, DomainError> {
        if !(0.0..=1.0).contains(&price) {
            return Err(DomainError::PriceOutOfRange { price });
        }
        Ok(Self {
            market_id: market_id.into(),
            timestamp,
            price,
        })
    }

    /// Days remaining until `market` closes.
    ///
    /// # Errors
    /// Returns [`DomainError::ObservationAfterClose`] when the observation is
    /// later than the close, since days-to-close is never negative.
    pub fn days_to_close(&self, market: &Market) -> Result<f64, DomainError> {
        let days = (market.closed_at - self.timestamp).num_seconds() as f64 / SECONDS_PER_DAY;
        if days < 0.0 {
            return Err(DomainError::ObservationAfterClose {
                market_id: self.market_id.clone(),
                days: -days,
            });
        }
        Ok(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn market() -> Market {
        Market::try_new(
            "m1",
            "Will it rain?",
            None,
            Category::Weather,
            ts(1),
            ts(11),
            Resolution::Yes,
            25_000.0,
        )
        .unwrap()
    }

    #[test]
    fn try_new_rejects_close_before_creation() {
        let result = Market::try_new("m", "q", None, Category::Other, ts(5), ts(1), Resolution::No, 1.0);
        assert!(matches!(result, Err(DomainError::CloseBeforeCreation { .. })));
    }

    #[test]
    fn try_new_rejects_negative_volume() {
        let result = Market::try_new("m", "q", None, Category::Other, ts(1), ts(2), Resolution::No, -1.0);
        assert!(matches!(result, Err(DomainError::NegativeVolume { .. })));
    }

    #[test]
    fn try_new_rejects_blank_id() {
        let result = Market::try_new("  ", "q", None, Category::Other, ts(1), ts(2), Resolution::No, 1.0);
        assert_eq!(result, Err(DomainError::EmptyMarketId));
    }

    #[test]
    fn observation_rejects_out_of_range_price() {
        assert!(PriceObservation::try_new("m1", ts(2), 1.01).is_err());
        assert!(PriceObservation::try_new("m1", ts(2), -0.01).is_err());
        assert!(PriceObservation::try_new("m1", ts(2), f64::NAN).is_err());
        assert!(PriceObservation::try_new("m1", ts(2), 1.0).is_ok());
    }

    #[test]
    fn days_to_close_is_non_negative() {
        let m = market();
        let obs = PriceObservation::try_new("m1", ts(4), 0.4).unwrap();
        assert!((obs.days_to_close(&m).unwrap() - 7.0).abs() < 1e-9);

        let late = PriceObservation::try_new("m1", ts(12), 0.4).unwrap();
        assert!(late.days_to_close(&m).is_err());
    }

    #[test]
    fn volume_tier_thresholds() {
        assert_eq!(VolumeTier::from_volume(9_999.0), VolumeTier::Under10K);
        assert_eq!(VolumeTier::from_volume(10_000.0), VolumeTier::Over10K);
        assert_eq!(VolumeTier::from_volume(100_000.0), VolumeTier::Over100K);
        assert_eq!(VolumeTier::from_volume(2_000_000.0), VolumeTier::Over1M);
    }

    #[test]
    fn days_to_close_buckets() {
        assert_eq!(DaysToCloseBucket::from_days(0.5), DaysToCloseBucket::UnderOneDay);
        assert_eq!(DaysToCloseBucket::from_days(6.9), DaysToCloseBucket::UnderOneWeek);
        assert_eq!(DaysToCloseBucket::from_days(7.0), DaysToCloseBucket::UnderOneMonth);
        assert_eq!(DaysToCloseBucket::from_days(45.0), DaysToCloseBucket::UnderOneQuarter);
        assert_eq!(DaysToCloseBucket::from_days(400.0), DaysToCloseBucket::Longer);
    }

    #[test]
    fn overlaps_detects_lifetime_intersection() {
        let m = market();
        assert!(m.overlaps(ts(10), ts(20)));
        assert!(!m.overlaps(ts(12), ts(20)));
        assert!(m.overlaps(ts(1), ts(2)));
    }

    #[test]
    fn resolution_parse_accepts_common_spellings() {
        assert_eq!(Resolution::parse("Yes"), Some(Resolution::Yes));
        assert_eq!(Resolution::parse(" no "), Some(Resolution::No));
        assert_eq!(Resolution::parse("Unknown"), None);
    }

    #[test]
    fn side_prices_and_wins() {
        assert!((Side::No.price(0.9) - 0.1).abs() < 1e-12);
        assert!((Side::Yes.price(0.9) - 0.9).abs() < 1e-12);
        assert!(Side::No.wins(Resolution::No));
        assert!(!Side::Yes.wins(Resolution::No));
    }
}
