//! Spread cost models for simulated entries.
//!
//! A spread is charged once on entry, in cents per dollar staked, and
//! depends only on the market's liquidity tier.

use calib_core::LiquidityTier;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Trait for calculating entry spread costs.
pub trait SpreadModel: Send + Sync {
    /// Cost in the same units as `stake`.
    fn spread_cost(&self, stake: Decimal, tier: LiquidityTier) -> Decimal;

    /// Returns the name of this spread model.
    fn name(&self) -> &str;
}

/// Cents-per-dollar schedule by liquidity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TieredSpread {
    pub thin: Decimal,
    pub moderate: Decimal,
    pub deep: Decimal,
    pub very_deep: Decimal,
}

impl Default for TieredSpread {
    fn default() -> Self {
        Self {
            thin: dec!(4.0),
            moderate: dec!(2.0),
            deep: dec!(1.0),
            very_deep: dec!(0.5),
        }
    }
}

impl TieredSpread {
    /// A schedule charging nothing in every tier.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            thin: Decimal::ZERO,
            moderate: Decimal::ZERO,
            deep: Decimal::ZERO,
            very_deep: Decimal::ZERO,
        }
    }

    /// Cents per dollar for a tier.
    #[must_use]
    pub fn cents(&self, tier: LiquidityTier) -> Decimal {
        match tier {
            LiquidityTier::Thin => self.thin,
            LiquidityTier::Moderate => self.moderate,
            LiquidityTier::Deep => self.deep,
            LiquidityTier::VeryDeep => self.very_deep,
        }
    }
}

impl SpreadModel for TieredSpread {
    fn spread_cost(&self, stake: Decimal, tier: LiquidityTier) -> Decimal {
        stake * self.cents(tier) / dec!(100)
    }

    fn name(&self) -> &str {
        "tiered"
    }
}

/// A zero-cost model reproducing frictionless results.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ZeroSpread;

impl SpreadModel for ZeroSpread {
    fn spread_cost(&self, _stake: Decimal, _tier: LiquidityTier) -> Decimal {
        Decimal::ZERO
    }

    fn name(&self) -> &str {
        "zero"
    }
}
