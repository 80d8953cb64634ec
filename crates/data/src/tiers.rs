//! Liquidity tiers as volume quartiles of a dataset.

use calib_core::LiquidityTier;
use serde::{Deserialize, Serialize};

/// Quartile cut points of the volume distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityTiering {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

impl LiquidityTiering {
    /// Computes cut points with linear interpolation between order
    /// statistics. An empty slice yields all-zero cut points.
    #[must_use]
    pub fn from_volumes(volumes: &[f64]) -> Self {
        let mut sorted: Vec<f64> = volumes.iter().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);
        Self {
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
        }
    }

    #[must_use]
    pub fn tier(&self, volume: f64) -> LiquidityTier {
        if volume <= self.q1 {
            LiquidityTier::Thin
        } else if volume <= self.median {
            LiquidityTier::Moderate
        } else if volume <= self.q3 {
            LiquidityTier::Deep
        } else {
            LiquidityTier::VeryDeep
        }
    }
}

/// Quantile of an ascending slice, interpolating linearly.
#[must_use]
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}
