//! Per-horizon calibration summary: Brier score, sharpness, range
//! deviations and Brier score by volume tier.

use calib_core::{Horizon, VolumeTier};
use calib_data::{CalibrationSample, MarketDataset};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::calibration::{deviation_by_range, CalibrationCurve, CalibrationEstimator, RangeDeviation};

/// Volume tiers with fewer samples get no Brier score.
pub const MIN_TIER_SAMPLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierBrier {
    pub tier: VolumeTier,
    pub count: usize,
    pub brier_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonSummary {
    pub horizon: String,
    pub offset_days: i64,
    /// Markets with a quote at this horizon.
    pub samples: usize,
    pub brier_score: Option<f64>,
    pub sharpness: Option<f64>,
    pub yes_rate: Option<f64>,
    pub deviation_by_range: Vec<RangeDeviation>,
    pub volume_tier_brier: Vec<TierBrier>,
    pub curve: CalibrationCurve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub markets: usize,
    pub data_period: Option<DataPeriod>,
    pub horizons: Vec<HorizonSummary>,
}

impl CalibrationSummary {
    #[must_use]
    pub fn compute(dataset: &MarketDataset, estimator: &CalibrationEstimator, horizons: &[Horizon]) -> Self {
        let horizons = horizons
            .iter()
            .map(|h| summarize_horizon(h, &dataset.horizon_samples(h), estimator))
            .collect::<Vec<_>>();

        for h in &horizons {
            info!(
                horizon = %h.horizon,
                samples = h.samples,
                brier = ?h.brier_score,
                "Calibration summary"
            );
        }

        Self {
            markets: dataset.len(),
            data_period: dataset
                .time_range()
                .map(|(start, end)| DataPeriod { start, end }),
            horizons,
        }
    }

    #[must_use]
    pub fn horizon(&self, label: &str) -> Option<&HorizonSummary> {
        self.horizons.iter().find(|h| h.horizon == label)
    }
}

fn summarize_horizon(
    horizon: &Horizon,
    samples: &[CalibrationSample],
    estimator: &CalibrationEstimator,
) -> HorizonSummary {
    let curve = estimator.estimate(samples);
    HorizonSummary {
        horizon: horizon.label.clone(),
        offset_days: horizon.offset_days,
        samples: samples.len(),
        brier_score: curve.brier_score,
        sharpness: curve.sharpness,
        yes_rate: curve.yes_rate,
        deviation_by_range: deviation_by_range(&curve),
        volume_tier_brier: volume_tier_brier(samples),
        curve,
    }
}

/// Brier score per volume tier, for tiers with at least
/// [`MIN_TIER_SAMPLES`] samples.
#[must_use]
pub fn volume_tier_brier(samples: &[CalibrationSample]) -> Vec<TierBrier> {
    VolumeTier::ALL
        .iter()
        .filter_map(|&tier| {
            let errors: Vec<f64> = samples
                .iter()
                .filter(|s| s.volume_tier == tier)
                .map(|s| (s.price - s.outcome).powi(2))
                .collect();
            (errors.len() >= MIN_TIER_SAMPLES).then(|| TierBrier {
                tier,
                count: errors.len(),
                brier_score: errors.iter().sum::<f64>() / errors.len() as f64,
            })
        })
        .collect()
}
