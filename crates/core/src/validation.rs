//! Statistical validation routines.
//!
//! Provides the aggregation contracts (mean, variance, ranks, correlation)
//! the analyses are built on, plus parametric and rank-based hypothesis
//! tests for comparing bias samples and strategy returns.
//!
//! Every test rejects degenerate input (empty samples, single observations,
//! zero variance) with a [`StatsError`] rather than returning NaN.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal, StudentsT};

use crate::error::StatsError;

/// Conventional significance level.
pub const ALPHA: f64 = 0.05;

/// Result of a hypothesis test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Name of the test that produced this result.
    pub test: String,
    /// Test statistic (t, W, U, H or rho depending on the test).
    pub statistic: f64,
    /// Two-sided p-value (upper tail for Kruskal-Wallis).
    pub p_value: f64,
    /// Total number of observations used.
    pub sample_size: usize,
    /// Whether `p_value < ALPHA`.
    pub is_significant: bool,
}

impl TestResult {
    fn new(test: &str, statistic: f64, p_value: f64, sample_size: usize) -> Self {
        let p_value = p_value.clamp(0.0, 1.0);
        Self {
            test: test.to_string(),
            statistic,
            p_value,
            sample_size,
            is_significant: p_value < ALPHA,
        }
    }
}

/// Win-rate validation for a set of settled trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinRateValidation {
    /// Win rate (proportion of winning trades)
    pub win_rate: f64,
    /// Wilson score confidence interval (lower bound)
    pub wilson_ci_lower: f64,
    /// Wilson score confidence interval (upper bound)
    pub wilson_ci_upper: f64,
    /// p-value from binomial test against `p0`
    pub p_value: f64,
    /// Number of samples
    pub sample_size: usize,
    /// Whether the result is statistically significant at alpha = 0.05
    pub is_significant: bool,
}

impl WinRateValidation {
    /// Creates a validation result from win counts, testing against `p0`
    /// (typically the average entry price, i.e. the market-implied win rate).
    #[must_use]
    pub fn from_counts(wins: usize, total: usize, p0: f64) -> Self {
        let win_rate = if total == 0 {
            0.0
        } else {
            wins as f64 / total as f64
        };

        let (wilson_ci_lower, wilson_ci_upper) = wilson_ci(wins, total, 1.96);
        let p_value = binomial_test(wins, total, p0);

        Self {
            win_rate,
            wilson_ci_lower,
            wilson_ci_upper,
            p_value,
            sample_size: total,
            is_significant: p_value < ALPHA,
        }
    }
}

// ============================================
// Aggregation contracts
// ============================================

fn ensure_finite(context: &'static str, sample: &[f64]) -> Result<(), StatsError> {
    if sample.iter().any(|x| !x.is_finite()) {
        return Err(StatsError::NonFinite { context });
    }
    Ok(())
}

fn ensure_min_len(context: &'static str, sample: &[f64], needed: usize) -> Result<(), StatsError> {
    if sample.is_empty() {
        return Err(StatsError::EmptySample { context });
    }
    if sample.len() < needed {
        return Err(StatsError::InsufficientSamples {
            context,
            needed,
            got: sample.len(),
        });
    }
    ensure_finite(context, sample)
}

/// Arithmetic mean.
///
/// # Errors
/// Returns [`StatsError::EmptySample`] for an empty slice.
pub fn mean(sample: &[f64]) -> Result<f64, StatsError> {
    ensure_min_len("mean", sample, 1)?;
    Ok(sample.iter().sum::<f64>() / sample.len() as f64)
}

/// Unbiased sample variance (n - 1 denominator).
///
/// # Errors
/// Requires at least two observations.
pub fn sample_variance(sample: &[f64]) -> Result<f64, StatsError> {
    ensure_min_len("variance", sample, 2)?;
    let m = sample.iter().sum::<f64>() / sample.len() as f64;
    Ok(sample.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (sample.len() - 1) as f64)
}

/// Sample standard deviation.
///
/// # Errors
/// Requires at least two observations.
pub fn std_dev(sample: &[f64]) -> Result<f64, StatsError> {
    sample_variance(sample).map(f64::sqrt)
}

/// 1-based ranks with ties sharing their average rank.
#[must_use]
pub fn ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut indexed: Vec<(usize, f64)> = values.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && (indexed[j].1 - indexed[i].1).abs() < f64::EPSILON {
            j += 1;
        }
        // positions i..j share ranks (i+1)..=j
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        for item in &indexed[i..j] {
            ranks[item.0] = avg_rank;
        }
        i = j;
    }
    ranks
}

/// Sum of `t^3 - t` over tie groups, used by rank-test variance corrections.
fn tie_term(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut total = 0.0;
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i + 1;
        while j < sorted.len() && (sorted[j] - sorted[i]).abs() < f64::EPSILON {
            j += 1;
        }
        let t = (j - i) as f64;
        total += t * t * t - t;
        i = j;
    }
    total
}

/// Pearson correlation coefficient.
///
/// # Errors
/// Requires equal-length inputs of at least two observations with non-zero
/// variance on both sides.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Result<f64, StatsError> {
    const CONTEXT: &str = "pearson correlation";
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch {
            context: CONTEXT,
            left: x.len(),
            right: y.len(),
        });
    }
    ensure_min_len(CONTEXT, x, 2)?;
    ensure_finite(CONTEXT, y)?;

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator < f64::EPSILON {
        return Err(StatsError::ZeroVariance { context: CONTEXT });
    }
    Ok(covariance / denominator)
}

// ============================================
// Distribution helpers
// ============================================

fn standard_normal() -> Result<Normal, StatsError> {
    Normal::new(0.0, 1.0).map_err(|e| StatsError::InvalidParameter {
        name: "normal",
        reason: e.to_string(),
    })
}

/// Two-sided p-value for a standard normal z-score.
fn normal_two_sided(z: f64) -> Result<f64, StatsError> {
    Ok(2.0 * (1.0 - standard_normal()?.cdf(z.abs())))
}

/// Two-sided p-value for a Student t statistic.
fn t_two_sided(t: f64, df: f64) -> Result<f64, StatsError> {
    let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| StatsError::InvalidParameter {
        name: "degrees of freedom",
        reason: e.to_string(),
    })?;
    Ok(2.0 * (1.0 - dist.cdf(t.abs())))
}

// ============================================
// Proportion tests
// ============================================

/// Calculates the Wilson score confidence interval for a proportion.
///
/// # Formula
/// ```text
/// CI = (p + z^2/(2n) +/- z * sqrt(p(1-p)/n + z^2/(4n^2))) / (1 + z^2/n)
/// ```
///
/// # Examples
/// ```
/// use calib_core::validation::wilson_ci;
///
/// let (lower, upper) = wilson_ci(50, 100, 1.96);
/// assert!(lower > 0.39 && lower < 0.41);
/// assert!(upper > 0.59 && upper < 0.61);
/// ```
#[must_use]
pub fn wilson_ci(wins: usize, n: usize, z: f64) -> (f64, f64) {
    if n == 0 {
        return (0.0, 0.0);
    }

    let n_f = n as f64;
    let p = wins as f64 / n_f;
    let z_sq = z * z;

    let denominator = 1.0 + z_sq / n_f;
    let center = p + z_sq / (2.0 * n_f);

    let variance_term = p * (1.0 - p) / n_f;
    let correction_term = z_sq / (4.0 * n_f * n_f);
    let spread = z * (variance_term + correction_term).sqrt();

    let lower = (center - spread) / denominator;
    let upper = (center + spread) / denominator;

    (lower.max(0.0), upper.min(1.0))
}

/// Two-tailed binomial test using the normal approximation with continuity
/// correction.
///
/// # Examples
/// ```
/// use calib_core::validation::binomial_test;
///
/// assert!(binomial_test(55, 100, 0.5) > 0.05);
/// assert!(binomial_test(65, 100, 0.5) < 0.05);
/// ```
#[must_use]
pub fn binomial_test(successes: usize, n: usize, p0: f64) -> f64 {
    if n == 0 {
        return 1.0;
    }

    let n_f = n as f64;
    let k = successes as f64;

    let expected = n_f * p0;
    let std_dev = (n_f * p0 * (1.0 - p0)).sqrt();

    if std_dev < f64::EPSILON {
        if (p0 < f64::EPSILON && successes == 0) || (p0 > 1.0 - f64::EPSILON && successes == n) {
            return 1.0;
        }
        return 0.0;
    }

    let z = (k - expected).abs() - 0.5;
    if z < 0.0 {
        return 1.0;
    }
    normal_two_sided(z / std_dev).unwrap_or(1.0)
}

// ============================================
// Location tests
// ============================================

/// One-sample t-test of `H0: mean = mu0`.
///
/// # Errors
/// Requires at least two observations with non-zero variance.
pub fn one_sample_t_test(sample: &[f64], mu0: f64) -> Result<TestResult, StatsError> {
    const CONTEXT: &str = "one-sample t-test";
    ensure_min_len(CONTEXT, sample, 2)?;

    let n = sample.len() as f64;
    let m = mean(sample)?;
    let sd = std_dev(sample)?;
    if sd < 1e-12 {
        return Err(StatsError::ZeroVariance { context: CONTEXT });
    }

    let t = (m - mu0) / (sd / n.sqrt());
    let p = t_two_sided(t, n - 1.0)?;
    Ok(TestResult::new(CONTEXT, t, p, sample.len()))
}

/// Welch's unequal-variance two-sample t-test of `H0: mean(a) = mean(b)`.
///
/// # Errors
/// Requires at least two observations per sample and non-zero pooled
/// standard error.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Result<TestResult, StatsError> {
    const CONTEXT: &str = "welch t-test";
    ensure_min_len(CONTEXT, a, 2)?;
    ensure_min_len(CONTEXT, b, 2)?;

    let (na, nb) = (a.len() as f64, b.len() as f64);
    let (va, vb) = (sample_variance(a)? / na, sample_variance(b)? / nb);
    let se = (va + vb).sqrt();
    if se < 1e-12 {
        return Err(StatsError::ZeroVariance { context: CONTEXT });
    }

    let t = (mean(a)? - mean(b)?) / se;
    // Welch-Satterthwaite degrees of freedom
    let df = (va + vb).powi(2) / (va.powi(2) / (na - 1.0) + vb.powi(2) / (nb - 1.0));
    let p = t_two_sided(t, df)?;
    Ok(TestResult::new(CONTEXT, t, p, a.len() + b.len()))
}

/// Wilcoxon signed-rank test of `H0: median = mu0`, normal approximation
/// with tie correction. Zero differences are dropped.
///
/// # Errors
/// Requires at least two non-zero differences.
pub fn wilcoxon_signed_rank(sample: &[f64], mu0: f64) -> Result<TestResult, StatsError> {
    const CONTEXT: &str = "wilcoxon signed-rank";
    ensure_min_len(CONTEXT, sample, 2)?;

    let diffs: Vec<f64> = sample
        .iter()
        .map(|x| x - mu0)
        .filter(|d| d.abs() > f64::EPSILON)
        .collect();
    if diffs.is_empty() {
        return Err(StatsError::ZeroVariance { context: CONTEXT });
    }
    if diffs.len() < 2 {
        return Err(StatsError::InsufficientSamples {
            context: CONTEXT,
            needed: 2,
            got: diffs.len(),
        });
    }

    let abs: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let r = ranks(&abs);
    let w_plus: f64 = diffs
        .iter()
        .zip(r.iter())
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, rank)| rank)
        .sum();

    let n = diffs.len() as f64;
    let expected = n * (n + 1.0) / 4.0;
    let variance = n * (n + 1.0) * (2.0 * n + 1.0) / 24.0 - tie_term(&abs) / 48.0;
    if variance <= 0.0 {
        return Err(StatsError::ZeroVariance { context: CONTEXT });
    }

    let z = (w_plus - expected) / variance.sqrt();
    let p = normal_two_sided(z)?;
    Ok(TestResult::new(CONTEXT, w_plus, p, diffs.len()))
}

/// Wilcoxon rank-sum (Mann-Whitney U) test for two independent samples,
/// normal approximation with tie correction. The statistic is `U` for `a`.
///
/// # Errors
/// Requires at least two observations per sample and non-constant pooled data.
pub fn mann_whitney_u(a: &[f64], b: &[f64]) -> Result<TestResult, StatsError> {
    const CONTEXT: &str = "mann-whitney u";
    ensure_min_len(CONTEXT, a, 2)?;
    ensure_min_len(CONTEXT, b, 2)?;

    let pooled: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    let r = ranks(&pooled);
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let total = n1 + n2;

    let rank_sum_a: f64 = r[..a.len()].iter().sum();
    let u = rank_sum_a - n1 * (n1 + 1.0) / 2.0;
    let expected = n1 * n2 / 2.0;
    let variance =
        n1 * n2 / 12.0 * ((total + 1.0) - tie_term(&pooled) / (total * (total - 1.0)));
    if variance <= 0.0 {
        return Err(StatsError::ZeroVariance { context: CONTEXT });
    }

    let z = (u - expected) / variance.sqrt();
    let p = normal_two_sided(z)?;
    Ok(TestResult::new(CONTEXT, u, p, pooled.len()))
}

/// Kruskal-Wallis H test across two or more independent groups, chi-squared
/// approximation with tie correction.
///
/// # Errors
/// Requires at least two groups, at least two observations per group, and
/// non-constant pooled data.
pub fn kruskal_wallis(groups: &[&[f64]]) -> Result<TestResult, StatsError> {
    const CONTEXT: &str = "kruskal-wallis";
    if groups.len() < 2 {
        return Err(StatsError::InsufficientSamples {
            context: CONTEXT,
            needed: 2,
            got: groups.len(),
        });
    }
    for group in groups {
        ensure_min_len(CONTEXT, group, 2)?;
    }

    let pooled: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let r = ranks(&pooled);
    let n = pooled.len() as f64;

    let mut offset = 0;
    let mut weighted = 0.0;
    for group in groups {
        let rank_sum: f64 = r[offset..offset + group.len()].iter().sum();
        weighted += rank_sum * rank_sum / group.len() as f64;
        offset += group.len();
    }
    let h = 12.0 / (n * (n + 1.0)) * weighted - 3.0 * (n + 1.0);

    let correction = 1.0 - tie_term(&pooled) / (n * n * n - n);
    if correction <= f64::EPSILON {
        return Err(StatsError::ZeroVariance { context: CONTEXT });
    }
    let h = h / correction;

    let df = (groups.len() - 1) as f64;
    let chi = ChiSquared::new(df).map_err(|e| StatsError::InvalidParameter {
        name: "degrees of freedom",
        reason: e.to_string(),
    })?;
    let p = 1.0 - chi.cdf(h.max(0.0));
    Ok(TestResult::new(CONTEXT, h, p, pooled.len()))
}

/// Spearman rank correlation with a t-approximation p-value.
///
/// # Errors
/// Requires equal-length inputs of at least three observations, neither of
/// them constant.
pub fn spearman_correlation(x: &[f64], y: &[f64]) -> Result<TestResult, StatsError> {
    const CONTEXT: &str = "spearman correlation";
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch {
            context: CONTEXT,
            left: x.len(),
            right: y.len(),
        });
    }
    ensure_min_len(CONTEXT, x, 3)?;
    ensure_finite(CONTEXT, y)?;

    let rho = pearson_correlation(&ranks(x), &ranks(y)).map_err(|e| match e {
        StatsError::ZeroVariance { .. } => StatsError::ZeroVariance { context: CONTEXT },
        other => other,
    })?;

    let n = x.len() as f64;
    let p = if (1.0 - rho.abs()) < 1e-12 {
        0.0
    } else {
        let t = rho * ((n - 2.0) / (1.0 - rho * rho)).sqrt();
        t_two_sided(t, n - 2.0)?
    };
    Ok(TestResult::new(CONTEXT, rho, p, x.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================
    // Aggregation Tests
    // ============================================

    #[test]
    fn mean_and_variance_of_known_sample() {
        let sample = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&sample).unwrap() - 5.0).abs() < 1e-12);
        // sum of squared deviations = 32, n - 1 = 7
        assert!((sample_variance(&sample).unwrap() - 32.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn mean_rejects_empty_sample() {
        assert!(matches!(mean(&[]), Err(StatsError::EmptySample { .. })));
    }

    #[test]
    fn variance_rejects_single_observation() {
        let err = sample_variance(&[1.0]).unwrap_err();
        assert!(matches!(
            err,
            StatsError::InsufficientSamples { needed: 2, got: 1, .. }
        ));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        assert!(matches!(
            mean(&[1.0, f64::NAN]),
            Err(StatsError::NonFinite { .. })
        ));
    }

    #[test]
    fn ranks_average_ties() {
        let r = ranks(&[10.0, 20.0, 20.0, 30.0]);
        assert_eq!(r, vec![1.0, 2.5, 2.5, 4.0]);
    }

    #[test]
    fn pearson_perfect_correlations() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let up = [2.0, 4.0, 6.0, 8.0];
        let down = [8.0, 6.0, 4.0, 2.0];
        assert!((pearson_correlation(&x, &up).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson_correlation(&x, &down).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_rejects_mismatched_lengths() {
        assert!(matches!(
            pearson_correlation(&[1.0, 2.0], &[1.0]),
            Err(StatsError::LengthMismatch { .. })
        ));
    }

    // ============================================
    // Proportion Tests
    // ============================================

    #[test]
    fn wilson_ci_50_percent_approximately_40_60() {
        let (lower, upper) = wilson_ci(50, 100, 1.96);
        assert!(lower > 0.39 && lower < 0.42, "lower was {lower}");
        assert!(upper > 0.58 && upper < 0.61, "upper was {upper}");
    }

    #[test]
    fn wilson_ci_zero_samples() {
        assert_eq!(wilson_ci(0, 0, 1.96), (0.0, 0.0));
    }

    #[test]
    fn wilson_ci_all_wins() {
        let (lower, upper) = wilson_ci(10, 10, 1.96);
        assert!(lower > 0.65, "lower was {lower}");
        assert!((upper - 1.0).abs() < 0.01, "upper was {upper}");
    }

    #[test]
    fn binomial_test_detects_departures_from_p0() {
        assert!(binomial_test(55, 100, 0.5) > 0.05);
        assert!(binomial_test(65, 100, 0.5) < 0.05);
        assert!((binomial_test(0, 0, 0.5) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn win_rate_validation_tests_against_implied_probability() {
        // 93 wins out of 100 at an implied 0.90 is not surprising
        let v = WinRateValidation::from_counts(93, 100, 0.90);
        assert!(!v.is_significant);
        // ...but 75 wins is
        let v = WinRateValidation::from_counts(75, 100, 0.90);
        assert!(v.is_significant);
        assert!((v.win_rate - 0.75).abs() < f64::EPSILON);
    }

    // ============================================
    // t-test Tests
    // ============================================

    #[test]
    fn one_sample_t_test_known_statistic() {
        // mean 5, sd sqrt(32/7), n 8 => t = 5 / (2.138/2.828) = 6.614
        let sample = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let result = one_sample_t_test(&sample, 0.0).unwrap();
        assert!((result.statistic - 6.614).abs() < 0.01, "t was {}", result.statistic);
        assert!(result.is_significant);
        assert_eq!(result.sample_size, 8);
    }

    #[test]
    fn one_sample_t_test_not_significant_around_mu0() {
        let sample = [-1.0, 1.0, -0.5, 0.5, 0.2, -0.2];
        let result = one_sample_t_test(&sample, 0.0).unwrap();
        assert!(result.p_value > 0.5);
        assert!(!result.is_significant);
    }

    #[test]
    fn one_sample_t_test_rejects_degenerate_samples() {
        assert!(matches!(
            one_sample_t_test(&[], 0.0),
            Err(StatsError::EmptySample { .. })
        ));
        assert!(matches!(
            one_sample_t_test(&[1.0], 0.0),
            Err(StatsError::InsufficientSamples { .. })
        ));
        assert!(matches!(
            one_sample_t_test(&[3.0, 3.0, 3.0], 0.0),
            Err(StatsError::ZeroVariance { .. })
        ));
    }

    #[test]
    fn welch_t_test_separates_shifted_samples() {
        let a = [1.0, 1.1, 0.9, 1.05, 0.95, 1.02];
        let b = [2.0, 2.1, 1.9, 2.05, 1.95, 2.02];
        let result = welch_t_test(&a, &b).unwrap();
        assert!(result.statistic < 0.0);
        assert!(result.p_value < 0.001);
    }

    // ============================================
    // Rank Test Tests
    // ============================================

    #[test]
    fn wilcoxon_signed_rank_all_positive() {
        let sample: Vec<f64> = (1..=20).map(f64::from).collect();
        let result = wilcoxon_signed_rank(&sample, 0.0).unwrap();
        // W+ = n(n+1)/2 = 210
        assert!((result.statistic - 210.0).abs() < 1e-9);
        assert!(result.is_significant);
    }

    #[test]
    fn wilcoxon_signed_rank_rejects_all_zero_differences() {
        assert!(matches!(
            wilcoxon_signed_rank(&[0.5, 0.5, 0.5], 0.5),
            Err(StatsError::ZeroVariance { .. })
        ));
    }

    #[test]
    fn mann_whitney_complete_separation() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let b = [11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0, 18.0];
        let result = mann_whitney_u(&a, &b).unwrap();
        assert!((result.statistic - 0.0).abs() < 1e-9);
        assert!(result.p_value < 0.01);
    }

    #[test]
    fn mann_whitney_rejects_single_element_sample() {
        assert!(matches!(
            mann_whitney_u(&[1.0], &[2.0, 3.0]),
            Err(StatsError::InsufficientSamples { .. })
        ));
    }

    #[test]
    fn kruskal_wallis_detects_group_differences() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [6.0, 7.0, 8.0, 9.0, 10.0];
        let c = [11.0, 12.0, 13.0, 14.0, 15.0];
        let result = kruskal_wallis(&[&a, &b, &c]).unwrap();
        // H = 12/(15*16) * (15^2/5 + 40^2/5 + 65^2/5) - 48 = 12.5
        assert!((result.statistic - 12.5).abs() < 1e-9, "H was {}", result.statistic);
        assert!(result.p_value < 0.01);
    }

    #[test]
    fn kruskal_wallis_identical_groups_not_significant() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [1.0, 2.0, 3.0, 4.0];
        let result = kruskal_wallis(&[&a, &b]).unwrap();
        assert!(result.statistic.abs() < 1e-9);
        assert!(!result.is_significant);
    }

    #[test]
    fn kruskal_wallis_rejects_degenerate_input() {
        let a = [1.0, 2.0];
        assert!(kruskal_wallis(&[&a]).is_err());
        let single = [3.0];
        assert!(kruskal_wallis(&[&a, &single]).is_err());
        let constant = [1.0, 1.0];
        assert!(matches!(
            kruskal_wallis(&[&constant, &constant]),
            Err(StatsError::ZeroVariance { .. })
        ));
    }

    #[test]
    fn spearman_monotonic_relationship() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let y = [1.0, 4.0, 9.0, 16.0, 25.0, 36.0];
        let result = spearman_correlation(&x, &y).unwrap();
        assert!((result.statistic - 1.0).abs() < 1e-12);
        assert!((result.p_value - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn spearman_rejects_constant_input() {
        let x = [1.0, 2.0, 3.0];
        let y = [5.0, 5.0, 5.0];
        assert!(matches!(
            spearman_correlation(&x, &y),
            Err(StatsError::ZeroVariance { .. })
        ));
    }
}
