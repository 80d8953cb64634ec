//! Calibration bias per price bucket.
//!
//! For each bucket the estimator reports how far realized resolution
//! frequency sits from the quoted price. Positive bias means the market
//! under-priced Yes; negative bias means it over-priced Yes.
//!
//! Empty buckets are reported with every derived value set to `None` and
//! are left out of the curve-level regression.

use std::collections::BTreeMap;

use calib_core::validation::wilson_ci;
use calib_core::{Horizon, StatsError};
use calib_data::CalibrationSample;
use serde::{Deserialize, Serialize};

/// Guards bucket edges against representation error (0.3 / 0.1 < 3).
const EDGE_EPS: f64 = 1e-9;

/// z for a two-sided 95% interval.
const Z_95: f64 = 1.96;

/// How the unit interval is cut into price buckets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BucketScheme {
    /// Edges at 0, w, 2w, ... 1. The last bucket is closed at 1.
    Uniform { width: f64 },
    /// Buckets centred on multiples of `step`; the two end buckets are
    /// half-width (`[0, step/2)` and `[1 - step/2, 1]`).
    Centered { step: f64 },
}

impl Default for BucketScheme {
    fn default() -> Self {
        Self::Centered { step: 0.1 }
    }
}

/// One bucket's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBucket {
    pub index: usize,
    pub lower: f64,
    pub upper: f64,
    pub midpoint: f64,
}

impl PriceBucket {
    #[must_use]
    pub fn label(&self) -> String {
        format!("{:.0}-{:.0}%", self.lower * 100.0, self.upper * 100.0)
    }
}

impl BucketScheme {
    /// # Errors
    /// Width must lie in (0, 1]; step in (0, 0.5]. Either must divide 1
    /// into a whole number of buckets.
    pub fn validate(&self) -> Result<(), StatsError> {
        match *self {
            Self::Uniform { width } if !(width > 0.0 && width <= 1.0) => {
                Err(StatsError::InvalidParameter {
                    name: "width",
                    reason: format!("must be in (0, 1], got {width}"),
                })
            }
            Self::Centered { step } if !(step > 0.0 && step <= 0.5) => {
                Err(StatsError::InvalidParameter {
                    name: "step",
                    reason: format!("must be in (0, 0.5], got {step}"),
                })
            }
            Self::Uniform { width } if !divides_unit(width) => Err(StatsError::InvalidParameter {
                name: "width",
                reason: format!("must divide 1 evenly, got {width}"),
            }),
            Self::Centered { step } if !divides_unit(step) => Err(StatsError::InvalidParameter {
                name: "step",
                reason: format!("must divide 1 evenly, got {step}"),
            }),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match *self {
            Self::Uniform { width } => ((1.0 / width) - EDGE_EPS).ceil().max(1.0) as usize,
            Self::Centered { step } => (1.0 / step).round() as usize + 1,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn buckets(&self) -> Vec<PriceBucket> {
        (0..self.len()).map(|i| self.bucket(i)).collect()
    }

    #[must_use]
    pub fn bucket(&self, index: usize) -> PriceBucket {
        match *self {
            Self::Uniform { width } => {
                let lower = index as f64 * width;
                let upper = ((index + 1) as f64 * width).min(1.0);
                PriceBucket {
                    index,
                    lower,
                    upper,
                    midpoint: (lower + upper) / 2.0,
                }
            }
            Self::Centered { step } => {
                let center = (index as f64 * step).min(1.0);
                PriceBucket {
                    index,
                    lower: (center - step / 2.0).max(0.0),
                    upper: (center + step / 2.0).min(1.0),
                    midpoint: center,
                }
            }
        }
    }

    /// Bucket containing `price`, or `None` outside [0, 1].
    #[must_use]
    pub fn index_of(&self, price: f64) -> Option<usize> {
        if !(0.0..=1.0).contains(&price) {
            return None;
        }
        let last = self.len().saturating_sub(1);
        let raw = match *self {
            Self::Uniform { width } => (price / width + EDGE_EPS).floor(),
            Self::Centered { step } => (price / step + 0.5 + EDGE_EPS).floor(),
        };
        Some((raw.max(0.0) as usize).min(last))
    }
}

fn divides_unit(size: f64) -> bool {
    ((1.0 / size).round() * size - 1.0).abs() < EDGE_EPS
}

/// Bias statistics for one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketBias {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub midpoint: f64,
    pub count: usize,
    pub mean_price: Option<f64>,
    pub realized_rate: Option<f64>,
    /// mean(outcome - price)
    pub bias: Option<f64>,
    /// `bias` in percentage points.
    pub bias_pp: Option<f64>,
    /// realized rate - bucket midpoint
    pub midpoint_bias: Option<f64>,
    /// 95% Wilson interval on the realized rate, shifted by the mean price.
    pub ci_lower: Option<f64>,
    pub ci_upper: Option<f64>,
}

impl BucketBias {
    fn from_samples(bucket: PriceBucket, samples: &[&CalibrationSample]) -> Self {
        let count = samples.len();
        let mut out = Self {
            label: bucket.label(),
            lower: bucket.lower,
            upper: bucket.upper,
            midpoint: bucket.midpoint,
            count,
            mean_price: None,
            realized_rate: None,
            bias: None,
            bias_pp: None,
            midpoint_bias: None,
            ci_lower: None,
            ci_upper: None,
        };
        if count == 0 {
            return out;
        }

        let n = count as f64;
        let mean_price = samples.iter().map(|s| s.price).sum::<f64>() / n;
        let wins = samples.iter().filter(|s| s.outcome >= 0.5).count();
        let realized = wins as f64 / n;
        let bias = samples.iter().map(|s| s.bias()).sum::<f64>() / n;
        let (lo, hi) = wilson_ci(wins, count, Z_95);

        out.mean_price = Some(mean_price);
        out.realized_rate = Some(realized);
        out.bias = Some(bias);
        out.bias_pp = Some(bias * 100.0);
        out.midpoint_bias = Some(realized - bucket.midpoint);
        out.ci_lower = Some(lo - mean_price);
        out.ci_upper = Some(hi - mean_price);
        out
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Count-weighted least-squares fit of realized rate on bucket midpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFit {
    pub slope: f64,
    pub intercept: f64,
    pub buckets_used: usize,
}

impl CalibrationFit {
    /// Needs two non-empty buckets with distinct midpoints.
    fn fit(buckets: &[BucketBias]) -> Option<Self> {
        let points: Vec<(f64, f64, f64)> = buckets
            .iter()
            .filter_map(|b| Some((b.midpoint, b.realized_rate?, b.count as f64)))
            .collect();
        if points.len() < 2 {
            return None;
        }
        let w: f64 = points.iter().map(|p| p.2).sum();
        let mx = points.iter().map(|p| p.0 * p.2).sum::<f64>() / w;
        let my = points.iter().map(|p| p.1 * p.2).sum::<f64>() / w;
        let sxx: f64 = points.iter().map(|p| p.2 * (p.0 - mx).powi(2)).sum();
        if sxx < 1e-15 {
            return None;
        }
        let sxy: f64 = points.iter().map(|p| p.2 * (p.0 - mx) * (p.1 - my)).sum();
        let slope = sxy / sxx;
        Some(Self {
            slope,
            intercept: my - slope * mx,
            buckets_used: points.len(),
        })
    }
}

/// Calibration curve over one set of samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCurve {
    pub scheme: BucketScheme,
    pub buckets: Vec<BucketBias>,
    pub total_samples: usize,
    /// mean((price - outcome)^2)
    pub brier_score: Option<f64>,
    /// mean((price - 0.5)^2); higher means more confident quotes.
    pub sharpness: Option<f64>,
    pub yes_rate: Option<f64>,
    pub regression: Option<CalibrationFit>,
}

impl CalibrationCurve {
    /// Bucket holding `price`.
    #[must_use]
    pub fn bucket_for(&self, price: f64) -> Option<&BucketBias> {
        self.scheme.index_of(price).and_then(|i| self.buckets.get(i))
    }

    /// Non-empty buckets only.
    pub fn populated(&self) -> impl Iterator<Item = &BucketBias> {
        self.buckets.iter().filter(|b| !b.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct CalibrationEstimator {
    scheme: BucketScheme,
}

impl CalibrationEstimator {
    /// # Errors
    /// Rejects an invalid bucket scheme.
    pub fn new(scheme: BucketScheme) -> Result<Self, StatsError> {
        scheme.validate()?;
        Ok(Self { scheme })
    }

    #[must_use]
    pub fn scheme(&self) -> BucketScheme {
        self.scheme
    }

    #[must_use]
    pub fn estimate(&self, samples: &[CalibrationSample]) -> CalibrationCurve {
        let refs: Vec<&CalibrationSample> = samples.iter().collect();
        self.estimate_refs(&refs)
    }

    /// Partitions samples by `key` and estimates one curve per slice.
    pub fn estimate_by<K, F>(
        &self,
        samples: &[CalibrationSample],
        key: F,
    ) -> BTreeMap<K, CalibrationCurve>
    where
        K: Ord,
        F: Fn(&CalibrationSample) -> K,
    {
        let mut slices: BTreeMap<K, Vec<&CalibrationSample>> = BTreeMap::new();
        for sample in samples {
            slices.entry(key(sample)).or_default().push(sample);
        }
        slices
            .into_iter()
            .map(|(k, refs)| (k, self.estimate_refs(&refs)))
            .collect()
    }

    pub(crate) fn estimate_refs(&self, samples: &[&CalibrationSample]) -> CalibrationCurve {
        let mut grouped: Vec<Vec<&CalibrationSample>> = vec![Vec::new(); self.scheme.len()];
        for sample in samples {
            if let Some(i) = self.scheme.index_of(sample.price) {
                grouped[i].push(sample);
            }
        }
        let buckets: Vec<BucketBias> = grouped
            .iter()
            .enumerate()
            .map(|(i, group)| BucketBias::from_samples(self.scheme.bucket(i), group))
            .collect();

        CalibrationCurve {
            scheme: self.scheme,
            total_samples: samples.len(),
            brier_score: mean_of(samples, |s| (s.price - s.outcome).powi(2)),
            sharpness: mean_of(samples, |s| (s.price - 0.5).powi(2)),
            yes_rate: mean_of(samples, |s| s.outcome),
            regression: CalibrationFit::fit(&buckets),
            buckets,
        }
    }
}

fn mean_of<F>(samples: &[&CalibrationSample], f: F) -> Option<f64>
where
    F: Fn(&CalibrationSample) -> f64,
{
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().map(|s| f(*s)).sum::<f64>() / samples.len() as f64)
}

/// Count-weighted midpoint bias over buckets whose midpoint falls in a
/// price range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeDeviation {
    pub name: String,
    pub range: String,
    pub count: usize,
    pub deviation: Option<f64>,
    pub deviation_pp: Option<f64>,
}

/// Low (5-25%), mid (35-65%) and high (75-95%) price ranges.
pub const DEVIATION_RANGES: [(&str, f64, f64); 3] =
    [("low", 0.05, 0.25), ("mid", 0.35, 0.65), ("high", 0.75, 0.95)];

#[must_use]
pub fn deviation_by_range(curve: &CalibrationCurve) -> Vec<RangeDeviation> {
    DEVIATION_RANGES
        .iter()
        .map(|&(name, lo, hi)| {
            let in_range: Vec<&BucketBias> = curve
                .populated()
                .filter(|b| b.midpoint >= lo - EDGE_EPS && b.midpoint <= hi + EDGE_EPS)
                .collect();
            let count: usize = in_range.iter().map(|b| b.count).sum();
            let deviation = (count > 0).then(|| {
                in_range
                    .iter()
                    .filter_map(|b| Some(b.midpoint_bias? * b.count as f64))
                    .sum::<f64>()
                    / count as f64
            });
            RangeDeviation {
                name: name.to_string(),
                range: format!("{:.0}-{:.0}%", lo * 100.0, hi * 100.0),
                count,
                deviation,
                deviation_pp: deviation.map(|d| d * 100.0),
            }
        })
        .collect()
}

/// Price-bucket bias learned on a training set, used to adjust win
/// probabilities in the backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasTable {
    pub scheme: BucketScheme,
    /// Bias per bucket; `None` when the bucket had fewer than the minimum
    /// sample count.
    pub biases: Vec<Option<f64>>,
}

impl BiasTable {
    #[must_use]
    pub fn from_curve(curve: &CalibrationCurve, min_count: usize) -> Self {
        Self {
            scheme: curve.scheme,
            biases: curve
                .buckets
                .iter()
                .map(|b| if b.count >= min_count.max(1) { b.bias } else { None })
                .collect(),
        }
    }

    /// Trained bias for the bucket containing a Yes price.
    #[must_use]
    pub fn lookup(&self, yes_price: f64) -> Option<f64> {
        self.scheme
            .index_of(yes_price)
            .and_then(|i| self.biases.get(i).copied().flatten())
    }

    #[must_use]
    pub fn trained_buckets(&self) -> usize {
        self.biases.iter().filter(|b| b.is_some()).count()
    }
}

/// Bucketing, horizons and heatmap density for the calibration study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub scheme: BucketScheme,
    /// Snapshot horizons to summarize.
    pub horizons: Vec<Horizon>,
    /// Heatmap cells with fewer samples are marked sparse.
    pub min_cell_count: usize,
    /// Horizon whose samples feed the heatmap and significance tests.
    pub analysis_horizon: Horizon,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            scheme: BucketScheme::default(),
            horizons: Horizon::standard(),
            min_cell_count: 10,
            analysis_horizon: Horizon::new("t7d", 7),
        }
    }
}

impl CalibrationConfig {
    /// # Errors
    /// Rejects an invalid bucket scheme.
    pub fn estimator(&self) -> Result<CalibrationEstimator, StatsError> {
        CalibrationEstimator::new(self.scheme)
    }
}
