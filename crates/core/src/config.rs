use serde::{Deserialize, Serialize};

use crate::classifier::{default_rules, CategoryClassifier, ClassifierRule};

/// Settings shared by every seeded resampling procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Seed for bootstrap and permutation RNGs. Always set; there is no
    /// entropy-seeded path.
    pub seed: u64,
    pub bootstrap_iterations: usize,
    pub permutation_iterations: usize,
    pub confidence_level: f64,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            bootstrap_iterations: 10_000,
            permutation_iterations: 10_000,
            confidence_level: 0.95,
        }
    }
}

/// Keyword rules for the category classifier. An empty list selects the
/// built-in rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub rules: Vec<ClassifierRule>,
}

impl ClassifierConfig {
    #[must_use]
    pub fn classifier(&self) -> CategoryClassifier {
        if self.rules.is_empty() {
            CategoryClassifier::new(&default_rules())
        } else {
            CategoryClassifier::new(&self.rules)
        }
    }
}
