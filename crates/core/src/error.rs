//! Error types for domain invariants and statistical routines.
//!
//! Constructors that validate market data return [`DomainError`]; every
//! statistical test and resampling routine returns [`StatsError`] instead of
//! propagating NaN through downstream aggregates.

use thiserror::Error;

/// Errors that occur when a market-data invariant is violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Quoted probabilities must lie in [0, 1].
    #[error("price must be within [0, 1], got {price}")]
    PriceOutOfRange {
        /// The invalid price.
        price: f64,
    },

    /// A market cannot close before it was created.
    #[error("market {market_id} closes before it was created")]
    CloseBeforeCreation {
        /// Identifier of the offending market.
        market_id: String,
    },

    /// Volumes are non-negative totals.
    #[error("volume must be non-negative, got {volume}")]
    NegativeVolume {
        /// The invalid volume.
        volume: f64,
    },

    /// Observations must be taken at or before the market closes.
    #[error("observation for {market_id} is {days:.2} days after close")]
    ObservationAfterClose {
        /// Identifier of the observed market.
        market_id: String,
        /// How far past the close the observation lies.
        days: f64,
    },

    /// Market identifiers cannot be blank.
    #[error("market id cannot be empty")]
    EmptyMarketId,
}

/// Errors returned by statistical tests and resampling procedures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    /// The sample contains no observations.
    #[error("{context}: sample is empty")]
    EmptySample {
        /// Which statistic rejected the input.
        context: &'static str,
    },

    /// The sample is too small for the requested statistic.
    #[error("{context}: need at least {needed} observations, got {got}")]
    InsufficientSamples {
        /// Which statistic rejected the input.
        context: &'static str,
        /// Minimum sample size.
        needed: usize,
        /// Actual sample size.
        got: usize,
    },

    /// Paired inputs differ in length.
    #[error("{context}: length mismatch ({left} vs {right})")]
    LengthMismatch {
        /// Which statistic rejected the input.
        context: &'static str,
        /// Length of the first input.
        left: usize,
        /// Length of the second input.
        right: usize,
    },

    /// Every observation is identical so the statistic is undefined.
    #[error("{context}: sample has zero variance")]
    ZeroVariance {
        /// Which statistic rejected the input.
        context: &'static str,
    },

    /// A configuration parameter is outside its valid range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A sample contains NaN or infinite values.
    #[error("{context}: sample contains non-finite values")]
    NonFinite {
        /// Which statistic rejected the input.
        context: &'static str,
    },
}
