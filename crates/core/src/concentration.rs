//! Concentration and inequality metrics over non-negative holdings.
//!
//! Every metric ignores zero and negative entries, so a holder list padded
//! with empty wallets scores the same as the list without them. An input
//! with no positive entries scores 0 everywhere.

use serde::{Deserialize, Serialize};

/// Share of total supply that the Nakamoto coefficient must cover.
pub const NAKAMOTO_THRESHOLD: f64 = 0.51;

fn positive(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite() && *v > 0.0).collect()
}

fn sorted_desc(values: &[f64]) -> Vec<f64> {
    let mut v = positive(values);
    v.sort_by(|a, b| b.total_cmp(a));
    v
}

/// Gini coefficient: 0 is perfect equality, values approaching 1 mean one
/// holder owns nearly everything.
///
/// ```text
/// G = 2 * Σ(i * x_i) / (n * Σx) - (n + 1) / n     (x ascending, i from 1)
/// ```
#[must_use]
pub fn gini(values: &[f64]) -> f64 {
    let mut v = positive(values);
    if v.is_empty() {
        return 0.0;
    }
    v.sort_by(f64::total_cmp);
    let n = v.len() as f64;
    let total: f64 = v.iter().sum();
    let weighted: f64 = v.iter().enumerate().map(|(i, x)| (i + 1) as f64 * x).sum();
    2.0 * weighted / (n * total) - (n + 1.0) / n
}

/// Herfindahl-Hirschman index on the 0..=10_000 scale.
#[must_use]
pub fn hhi(values: &[f64]) -> f64 {
    let v = positive(values);
    let total: f64 = v.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    v.iter().map(|x| (x / total).powi(2)).sum::<f64>() * 10_000.0
}

/// Smallest number of holders that together control at least `threshold`
/// of the total.
#[must_use]
pub fn nakamoto(values: &[f64], threshold: f64) -> usize {
    let v = sorted_desc(values);
    let total: f64 = v.iter().sum();
    if total <= 0.0 {
        return 0;
    }
    let mut cumulative = 0.0;
    for (i, x) in v.iter().enumerate() {
        cumulative += x;
        if cumulative / total >= threshold {
            return i + 1;
        }
    }
    v.len()
}

/// Shannon entropy in bits.
#[must_use]
pub fn shannon_entropy(values: &[f64]) -> f64 {
    let v = positive(values);
    let total: f64 = v.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    -v.iter()
        .map(|x| {
            let p = x / total;
            p * p.log2()
        })
        .sum::<f64>()
}

/// Entropy divided by its maximum `log2(n)`; 1 means perfectly even holdings.
#[must_use]
pub fn normalized_entropy(values: &[f64]) -> f64 {
    let n = positive(values).len();
    if n < 2 {
        return 0.0;
    }
    shannon_entropy(values) / (n as f64).log2()
}

/// Theil T index. More sensitive to the extreme tail than Gini.
#[must_use]
pub fn theil(values: &[f64]) -> f64 {
    let v = positive(values);
    if v.is_empty() {
        return 0.0;
    }
    let n = v.len() as f64;
    let mean = v.iter().sum::<f64>() / n;
    v.iter()
        .map(|x| {
            let r = x / mean;
            r * r.ln()
        })
        .sum::<f64>()
        / n
}

/// Percentage (0..=100) of the total held by the `n` largest holders.
#[must_use]
pub fn top_n_share(values: &[f64], n: usize) -> f64 {
    let v = sorted_desc(values);
    let total: f64 = v.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    v.iter().take(n).sum::<f64>() / total * 100.0
}

/// Antitrust-style reading of an HHI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HhiBand {
    /// Below 1500.
    Competitive,
    /// 1500 to 2500.
    ModeratelyConcentrated,
    /// Above 2500.
    HighlyConcentrated,
}

impl HhiBand {
    #[must_use]
    pub fn from_hhi(hhi: f64) -> Self {
        if hhi < 1500.0 {
            Self::Competitive
        } else if hhi < 2500.0 {
            Self::ModeratelyConcentrated
        } else {
            Self::HighlyConcentrated
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GiniBand {
    Low,
    Moderate,
    High,
}

impl GiniBand {
    #[must_use]
    pub fn from_gini(gini: f64) -> Self {
        if gini < 0.4 {
            Self::Low
        } else if gini < 0.6 {
            Self::Moderate
        } else {
            Self::High
        }
    }
}

/// Every concentration metric for one population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcentrationReport {
    pub name: String,
    pub sample_size: usize,
    pub total: f64,
    pub top5_share: f64,
    pub top10_share: f64,
    pub top20_share: f64,
    pub gini: f64,
    pub hhi: f64,
    pub nakamoto: usize,
    pub entropy: f64,
    pub normalized_entropy: f64,
    pub theil: f64,
    pub hhi_band: HhiBand,
    pub gini_band: GiniBand,
}

impl ConcentrationReport {
    #[must_use]
    pub fn compute(name: &str, values: &[f64]) -> Self {
        let v = positive(values);
        let gini = gini(&v);
        let hhi = hhi(&v);
        Self {
            name: name.to_string(),
            sample_size: v.len(),
            total: v.iter().sum(),
            top5_share: top_n_share(&v, 5),
            top10_share: top_n_share(&v, 10),
            top20_share: top_n_share(&v, 20),
            gini,
            hhi,
            nakamoto: nakamoto(&v, NAKAMOTO_THRESHOLD),
            entropy: shannon_entropy(&v),
            normalized_entropy: normalized_entropy(&v),
            theil: theil(&v),
            hhi_band: HhiBand::from_hhi(hhi),
            gini_band: GiniBand::from_gini(gini),
        }
    }
}
