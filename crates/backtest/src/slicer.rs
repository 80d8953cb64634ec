//! Cross-sectional slicing of calibration bias into heatmaps.

use std::collections::BTreeMap;
use std::fmt;

use calib_core::{Category, DaysToCloseBucket, LiquidityTier, VolumeTier};
use calib_data::CalibrationSample;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calibration::{CalibrationCurve, CalibrationEstimator};

/// Categorical key a heatmap groups rows by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceDimension {
    LiquidityTier,
    Category,
    DaysToClose,
    VolumeTier,
}

impl SliceDimension {
    pub const ALL: [SliceDimension; 4] = [
        SliceDimension::LiquidityTier,
        SliceDimension::Category,
        SliceDimension::DaysToClose,
        SliceDimension::VolumeTier,
    ];

    #[must_use]
    pub fn key(&self, sample: &CalibrationSample) -> &'static str {
        match self {
            Self::LiquidityTier => sample.liquidity_tier.label(),
            Self::Category => sample.category.label(),
            Self::DaysToClose => sample.days_bucket().label(),
            Self::VolumeTier => sample.volume_tier.label(),
        }
    }

    /// Every row label in display order.
    #[must_use]
    pub fn labels(&self) -> Vec<&'static str> {
        match self {
            Self::LiquidityTier => LiquidityTier::ALL.iter().map(LiquidityTier::label).collect(),
            Self::Category => Category::ALL.iter().map(Category::label).collect(),
            Self::DaysToClose => DaysToCloseBucket::ALL.iter().map(DaysToCloseBucket::label).collect(),
            Self::VolumeTier => VolumeTier::ALL.iter().map(VolumeTier::label).collect(),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LiquidityTier => "liquidity_tier",
            Self::Category => "category",
            Self::DaysToClose => "days_to_close",
            Self::VolumeTier => "volume_tier",
        }
    }
}

impl fmt::Display for SliceDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub count: usize,
    pub bias_pp: Option<f64>,
    /// Fewer samples than the configured minimum; shown but not trusted.
    pub sparse: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapRow {
    pub slice: String,
    pub total: usize,
    pub cells: Vec<HeatmapCell>,
}

/// Bias in pp with slices as rows and price buckets as columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heatmap {
    pub dimension: SliceDimension,
    pub columns: Vec<String>,
    pub rows: Vec<HeatmapRow>,
    pub min_cell_count: usize,
}

impl Heatmap {
    #[must_use]
    pub fn cell(&self, slice: &str, column: &str) -> Option<&HeatmapCell> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.iter().find(|r| r.slice == slice)?.cells.get(col)
    }
}

pub struct CrossSectionalSlicer {
    estimator: CalibrationEstimator,
    min_cell_count: usize,
}

impl CrossSectionalSlicer {
    #[must_use]
    pub fn new(estimator: CalibrationEstimator, min_cell_count: usize) -> Self {
        Self {
            estimator,
            min_cell_count,
        }
    }

    /// One calibration curve per slice value that has samples.
    #[must_use]
    pub fn curves(
        &self,
        samples: &[CalibrationSample],
        dimension: SliceDimension,
    ) -> BTreeMap<&'static str, CalibrationCurve> {
        self.estimator.estimate_by(samples, |s| dimension.key(s))
    }

    #[must_use]
    pub fn heatmap(&self, samples: &[CalibrationSample], dimension: SliceDimension) -> Heatmap {
        let mut curves = self.curves(samples, dimension);
        let columns = self
            .estimator
            .scheme()
            .buckets()
            .iter()
            .map(|b| b.label())
            .collect();

        let rows = dimension
            .labels()
            .into_iter()
            .filter_map(|label| {
                let curve = curves.remove(label)?;
                let cells = curve
                    .buckets
                    .iter()
                    .map(|b| HeatmapCell {
                        count: b.count,
                        bias_pp: b.bias_pp,
                        sparse: b.count < self.min_cell_count,
                    })
                    .collect();
                Some(HeatmapRow {
                    slice: label.to_string(),
                    total: curve.total_samples,
                    cells,
                })
            })
            .collect::<Vec<_>>();

        debug!(dimension = %dimension, rows = rows.len(), "Built heatmap");
        Heatmap {
            dimension,
            columns,
            rows,
            min_cell_count: self.min_cell_count,
        }
    }
}

/// Per-sample bias grouped by slice value, in display order, for
/// between-group significance tests.
#[must_use]
pub fn bias_groups(
    samples: &[CalibrationSample],
    dimension: SliceDimension,
) -> Vec<(&'static str, Vec<f64>)> {
    let mut groups: BTreeMap<&'static str, Vec<f64>> = BTreeMap::new();
    for sample in samples {
        groups.entry(dimension.key(sample)).or_default().push(sample.bias());
    }
    dimension
        .labels()
        .into_iter()
        .filter_map(|label| groups.remove(label).map(|g| (label, g)))
        .collect()
}
