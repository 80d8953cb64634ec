//! Raw CSV rows and their conversion into validated domain types.
//!
//! Every field is read as text so that a bad value in one column becomes a
//! counted [`RecordError`] instead of aborting the whole file.

use calib_core::{CategoryClassifier, DomainError, Market, PriceObservation, Resolution};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a CSV row was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid timestamp in `{field}`: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("invalid number in `{field}`: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("unresolved or unknown resolution {0:?}")]
    InvalidResolution(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl RecordError {
    /// Stable key used to aggregate skip counts in a load report.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::InvalidTimestamp { .. } => "invalid_timestamp",
            Self::InvalidNumber { .. } => "invalid_number",
            Self::InvalidResolution(_) => "invalid_resolution",
            Self::Domain(DomainError::PriceOutOfRange { .. }) => "price_out_of_range",
            Self::Domain(DomainError::CloseBeforeCreation { .. }) => "close_before_creation",
            Self::Domain(DomainError::NegativeVolume { .. }) => "negative_volume",
            Self::Domain(DomainError::ObservationAfterClose { .. }) => "observation_after_close",
            Self::Domain(DomainError::EmptyMarketId) => "empty_market_id",
        }
    }
}

/// One row of `markets.csv`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub closed_at: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub volume: String,
}

impl MarketRecord {
    /// Validates the row and classifies its text.
    ///
    /// # Errors
    /// Returns a [`RecordError`] describing the first invalid field.
    pub fn into_market(self, classifier: &CategoryClassifier) -> Result<Market, RecordError> {
        let question = required("question", &self.question)?.to_string();
        let created_at = parse_timestamp("created_at", &self.created_at)?;
        let closed_at = parse_timestamp("closed_at", &self.closed_at)?;
        let resolution = Resolution::parse(required("resolution", &self.resolution)?)
            .ok_or_else(|| RecordError::InvalidResolution(self.resolution.clone()))?;
        let volume = parse_number("volume", &self.volume)?;
        let description = self.description.filter(|d| !d.trim().is_empty());

        let text = match &description {
            Some(desc) => format!("{question} {desc}"),
            None => question.clone(),
        };
        let category = classifier.classify(&text);

        Ok(Market::try_new(
            self.id.trim(),
            question,
            description,
            category,
            created_at,
            closed_at,
            resolution,
            volume,
        )?)
    }
}

/// One row of `prices.csv`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceRecord {
    #[serde(default)]
    pub market_id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub price: String,
}

impl PriceRecord {
    /// # Errors
    /// Returns a [`RecordError`] for a blank id, bad timestamp or a price
    /// outside [0, 1].
    pub fn into_observation(self) -> Result<PriceObservation, RecordError> {
        let market_id = required("market_id", &self.market_id)?.to_string();
        let timestamp = parse_timestamp("timestamp", &self.timestamp)?;
        let price = parse_number("price", &self.price)?;
        Ok(PriceObservation::try_new(market_id, timestamp, price)?)
    }
}

/// One row of `balances.csv`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub holder: String,
    pub balance: f64,
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, RecordError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(RecordError::MissingField(field))
    } else {
        Ok(trimmed)
    }
}

fn parse_number(field: &'static str, value: &str) -> Result<f64, RecordError> {
    let raw = required(field, value)?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RecordError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}

/// Accepts RFC 3339, unix seconds, `YYYY-MM-DD HH:MM:SS` (UTC) or a bare
/// `YYYY-MM-DD` date (midnight UTC).
///
/// # Errors
/// Returns [`RecordError::InvalidTimestamp`] when no format matches.
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, RecordError> {
    let raw = required(field, value)?;
    let invalid = || RecordError::InvalidTimestamp {
        field,
        value: raw.to_string(),
    };

    if let Ok(secs) = raw.parse::<i64>() {
        return Utc.timestamp_opt(secs, 0).single().ok_or_else(invalid);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
        return Ok(Utc.from_utc_datetime(&midnight));
    }
    Err(invalid())
}
