//! Descriptive statistics over resolved markets.

use std::collections::BTreeMap;

use calib_core::{Category, Market, Resolution};
use serde::{Deserialize, Serialize};

use crate::dataset::MarketDataset;
use crate::tiers::quantile;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSplit {
    pub yes: usize,
    pub no: usize,
}

impl ResolutionSplit {
    fn count<'a>(markets: impl Iterator<Item = &'a Market>) -> Self {
        markets.fold(Self::default(), |mut split, m| {
            match m.resolution {
                Resolution::Yes => split.yes += 1,
                Resolution::No => split.no += 1,
            }
            split
        })
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.yes + self.no
    }
}

/// Yes/No balance, category mix and the volume split of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSummary {
    pub total_resolved: usize,
    pub yes_count: usize,
    pub no_count: usize,
    /// Percent of markets resolving Yes.
    pub yes_ratio: f64,
    pub no_ratio: f64,
    pub category_distribution: BTreeMap<String, usize>,
    pub total_volume: f64,
    pub median_volume: f64,
    /// Resolutions of markets with volume strictly above the median.
    pub high_volume_resolution: ResolutionSplit,
    /// Resolutions of markets at or below the median.
    pub low_volume_resolution: ResolutionSplit,
}

impl ResolvedSummary {
    #[must_use]
    pub fn compute(dataset: &MarketDataset) -> Self {
        let markets = dataset.markets();
        let all = ResolutionSplit::count(markets.iter());
        let total = markets.len();
        let denom = total.max(1) as f64;

        let mut category_distribution = BTreeMap::new();
        for category in Category::ALL {
            let n = markets.iter().filter(|m| m.category == category).count();
            if n > 0 {
                category_distribution.insert(category.label().to_string(), n);
            }
        }

        let mut volumes: Vec<f64> = markets.iter().map(|m| m.volume).collect();
        volumes.sort_by(f64::total_cmp);
        let median_volume = quantile(&volumes, 0.5);

        Self {
            total_resolved: total,
            yes_count: all.yes,
            no_count: all.no,
            yes_ratio: all.yes as f64 / denom * 100.0,
            no_ratio: all.no as f64 / denom * 100.0,
            category_distribution,
            total_volume: volumes.iter().sum(),
            median_volume,
            high_volume_resolution: ResolutionSplit::count(
                markets.iter().filter(|m| m.volume > median_volume),
            ),
            low_volume_resolution: ResolutionSplit::count(
                markets.iter().filter(|m| m.volume <= median_volume),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn market(id: &str, category: Category, resolution: Resolution, volume: f64) -> Market {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Market::try_new(id, "q", None, category, t, t, resolution, volume).unwrap()
    }

    #[test]
    fn summary_splits_by_median_volume() {
        let dataset = MarketDataset::from_parts(
            vec![
                market("a", Category::Crypto, Resolution::Yes, 10.0),
                market("b", Category::Crypto, Resolution::No, 20.0),
                market("c", Category::Sports, Resolution::No, 30.0),
                market("d", Category::Politics, Resolution::Yes, 40.0),
            ],
            vec![],
        );
        let summary = ResolvedSummary::compute(&dataset);

        assert_eq!(summary.total_resolved, 4);
        assert_eq!(summary.yes_count, 2);
        assert!((summary.yes_ratio - 50.0).abs() < 1e-12);
        assert_eq!(summary.category_distribution.get("Crypto"), Some(&2));
        assert!(!summary.category_distribution.contains_key("Weather"));
        assert!((summary.total_volume - 100.0).abs() < 1e-12);
        assert!((summary.median_volume - 25.0).abs() < 1e-12);
        assert_eq!(summary.high_volume_resolution, ResolutionSplit { yes: 1, no: 1 });
        assert_eq!(summary.low_volume_resolution, ResolutionSplit { yes: 1, no: 1 });
    }

    #[test]
    fn empty_dataset_has_zero_ratios() {
        let summary = ResolvedSummary::compute(&MarketDataset::from_parts(vec![], vec![]));
        assert_eq!(summary.total_resolved, 0);
        assert!(summary.yes_ratio.abs() < 1e-12);
        assert_eq!(summary.high_volume_resolution.total(), 0);
    }
}
