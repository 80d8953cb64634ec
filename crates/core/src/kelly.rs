//! Fractional Kelly sizing for positions held to resolution.
//!
//! Stakes are capped both as a share of bankroll and in absolute terms.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sizes a position bought at price `c` with modelled win probability `p`.
///
/// With net odds `b = (1-c)/c` the full Kelly share of bankroll reduces to
/// `f* = (p - c) / (1 - c)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KellySizer {
    /// Multiplier on full Kelly, e.g. 0.25 for quarter Kelly
    pub fraction: Decimal,
    /// Largest share of bankroll a single bet may take
    pub max_fraction: Decimal,
    /// Absolute stake ceiling
    pub max_bet: Decimal,
    /// Minimum edge (p - c) required to place a bet
    pub min_edge: Decimal,
}

impl Default for KellySizer {
    fn default() -> Self {
        Self {
            fraction: Decimal::new(25, 2),     // 0.25 (quarter Kelly)
            max_fraction: Decimal::new(5, 2),  // 5% of bankroll
            max_bet: Decimal::new(1000, 0),    // $1000
            min_edge: Decimal::new(1, 2),      // 0.01
        }
    }
}

/// Outcome of sizing one candidate position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetDecision {
    /// False for every skip reason
    pub should_bet: bool,
    pub stake: Decimal,
    /// `f*` before the multiplier and caps
    pub full_kelly_fraction: Decimal,
    /// Share of bankroll actually staked after scaling and caps
    pub applied_fraction: Decimal,
    /// Expected profit per share at the modelled probability
    pub expected_value: Decimal,
    pub reason: BetReason,
}

impl BetDecision {
    fn skip(reason: BetReason, expected_value: Decimal) -> Self {
        Self {
            should_bet: false,
            stake: Decimal::ZERO,
            full_kelly_fraction: Decimal::ZERO,
            applied_fraction: Decimal::ZERO,
            expected_value,
            reason,
        }
    }
}

/// Why a position was or was not sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetReason {
    PositiveEdge,
    /// Edge below `min_edge`
    InsufficientEdge,
    /// Probability equals price
    NoEdge,
    NegativeEv,
    /// Probability outside [0, 1], price outside (0, 1) or empty bankroll
    InvalidInputs,
}

impl KellySizer {
    #[must_use]
    pub fn new(fraction: Decimal, max_fraction: Decimal, max_bet: Decimal, min_edge: Decimal) -> Self {
        Self {
            fraction,
            max_fraction,
            max_bet,
            min_edge,
        }
    }

    /// Calculates the bet size using fractional Kelly.
    ///
    /// # Arguments
    /// * `win_prob` - Modelled probability the position pays out
    /// * `price` - Cost per share (0 to 1)
    /// * `bankroll` - Bankroll to size the bet against
    ///
    /// # Examples
    /// ```
    /// use calib_core::kelly::KellySizer;
    /// use rust_decimal_macros::dec;
    ///
    /// let sizer = KellySizer::default();
    /// let decision = sizer.size(dec!(0.6), dec!(0.5), dec!(10000));
    ///
    /// assert!(decision.should_bet);
    /// assert!(decision.stake > dec!(0));
    /// ```
    #[must_use]
    pub fn size(&self, win_prob: Decimal, price: Decimal, bankroll: Decimal) -> BetDecision {
        if win_prob < Decimal::ZERO
            || win_prob > Decimal::ONE
            || price <= Decimal::ZERO
            || price >= Decimal::ONE
            || bankroll <= Decimal::ZERO
        {
            return BetDecision::skip(BetReason::InvalidInputs, Decimal::ZERO);
        }

        // EV per share = p * (1 - c) - (1 - p) * c
        let ev = Self::expected_value(win_prob, price);

        if win_prob == price {
            return BetDecision::skip(BetReason::NoEdge, Decimal::ZERO);
        }
        if ev <= Decimal::ZERO {
            return BetDecision::skip(BetReason::NegativeEv, ev);
        }
        if win_prob - price < self.min_edge {
            return BetDecision::skip(BetReason::InsufficientEdge, ev);
        }

        let full_kelly = (win_prob - price) / (Decimal::ONE - price);
        let applied_fraction = (full_kelly * self.fraction).min(self.max_fraction);
        let stake = (bankroll * applied_fraction).min(self.max_bet).max(Decimal::ZERO);

        BetDecision {
            should_bet: stake > Decimal::ZERO,
            stake,
            full_kelly_fraction: full_kelly,
            applied_fraction,
            expected_value: ev,
            reason: BetReason::PositiveEdge,
        }
    }

    /// Calculates expected value per share without sizing.
    ///
    /// EV = p * (1 - c) - (1 - p) * c
    #[must_use]
    pub fn expected_value(win_prob: Decimal, price: Decimal) -> Decimal {
        if price <= Decimal::ZERO || price >= Decimal::ONE {
            return Decimal::ZERO;
        }
        win_prob * (Decimal::ONE - price) - (Decimal::ONE - win_prob) * price
    }
}

/// Expected logarithmic bankroll growth per bet when staking `fraction` of
/// bankroll at `price` with true win probability `win_prob`.
///
/// ```text
/// g(f) = p * ln(1 + f(1-c)/c) + (1-p) * ln(1 - f)
/// ```
///
/// Returns `None` when the inputs leave the domain of the logarithm.
#[must_use]
pub fn expected_log_growth(win_prob: f64, price: f64, fraction: f64) -> Option<f64> {
    if !(0.0..=1.0).contains(&win_prob) || price <= 0.0 || price >= 1.0 || !(0.0..1.0).contains(&fraction) {
        return None;
    }
    let win = 1.0 + fraction * (1.0 - price) / price;
    let lose = 1.0 - fraction;
    Some(win_prob * win.ln() + (1.0 - win_prob) * lose.ln())
}

/// Growth rate at the full Kelly fraction, i.e. the best achievable
/// long-run log growth for the given edge.
#[must_use]
pub fn kelly_optimal_growth(win_prob: Decimal, price: Decimal) -> Option<f64> {
    if price <= Decimal::ZERO || price >= Decimal::ONE || win_prob <= price {
        return None;
    }
    let full = ((win_prob - price) / (Decimal::ONE - price)).to_f64()?;
    expected_log_growth(win_prob.to_f64()?, price.to_f64()?, full.min(0.999_999))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn uncapped(fraction: Decimal) -> KellySizer {
        KellySizer::new(fraction, dec!(1), dec!(1000000), dec!(0.01))
    }

    // ============================================
    // Basic Kelly Formula Tests
    // ============================================

    #[test]
    fn kelly_no_bet_when_prob_equals_price() {
        let sizer = KellySizer::default();
        let decision = sizer.size(dec!(0.5), dec!(0.5), dec!(10000));

        assert!(!decision.should_bet);
        assert_eq!(decision.stake, Decimal::ZERO);
        assert_eq!(decision.reason, BetReason::NoEdge);
    }

    #[test]
    fn kelly_positive_bet_when_prob_exceeds_price() {
        let decision = uncapped(dec!(1.0)).size(dec!(0.6), dec!(0.5), dec!(10000));

        assert!(decision.should_bet);
        assert_eq!(decision.reason, BetReason::PositiveEdge);

        // f* = (0.6 - 0.5) / (1 - 0.5) = 0.2, stake = 2000
        assert_eq!(decision.full_kelly_fraction, dec!(0.2));
        assert_eq!(decision.stake, dec!(2000));
    }

    #[test]
    fn kelly_no_bet_when_prob_below_price() {
        let decision = KellySizer::default().size(dec!(0.4), dec!(0.5), dec!(10000));

        assert!(!decision.should_bet);
        assert_eq!(decision.reason, BetReason::NegativeEv);
        assert!(decision.expected_value < Decimal::ZERO);
    }

    #[test]
    fn kelly_rejects_invalid_inputs() {
        let sizer = KellySizer::default();
        assert_eq!(sizer.size(dec!(1.2), dec!(0.5), dec!(100)).reason, BetReason::InvalidInputs);
        assert_eq!(sizer.size(dec!(0.6), dec!(1.0), dec!(100)).reason, BetReason::InvalidInputs);
        assert_eq!(sizer.size(dec!(0.6), dec!(0.5), dec!(0)).reason, BetReason::InvalidInputs);
    }

    // ============================================
    // Fractional Kelly and Cap Tests
    // ============================================

    #[test]
    fn kelly_quarter_fraction_reduces_bet() {
        let full = uncapped(dec!(1.0)).size(dec!(0.7), dec!(0.5), dec!(10000));
        let quarter = uncapped(dec!(0.25)).size(dec!(0.7), dec!(0.5), dec!(10000));

        assert_eq!(quarter.stake, full.stake * dec!(0.25));
    }

    #[test]
    fn kelly_caps_share_of_bankroll() {
        // Full Kelly 0.4 would stake 4000; the 5% cap allows 500
        let sizer = KellySizer::new(dec!(1.0), dec!(0.05), dec!(1000000), dec!(0.01));
        let decision = sizer.size(dec!(0.7), dec!(0.5), dec!(10000));

        assert_eq!(decision.applied_fraction, dec!(0.05));
        assert_eq!(decision.stake, dec!(500));
    }

    #[test]
    fn kelly_respects_max_bet_cap() {
        let sizer = KellySizer::new(dec!(1.0), dec!(1), dec!(300), dec!(0.01));
        let decision = sizer.size(dec!(0.7), dec!(0.5), dec!(10000));

        assert_eq!(decision.stake, dec!(300));
        assert!(decision.should_bet);
    }

    #[test]
    fn kelly_insufficient_edge_skips() {
        let sizer = KellySizer::new(dec!(0.25), dec!(0.05), dec!(1000), dec!(0.05));
        let decision = sizer.size(dec!(0.53), dec!(0.5), dec!(10000));

        assert!(!decision.should_bet);
        assert_eq!(decision.reason, BetReason::InsufficientEdge);
    }

    // ============================================
    // Growth Rate Tests
    // ============================================

    #[test]
    fn log_growth_zero_fraction_is_zero() {
        let g = expected_log_growth(0.6, 0.5, 0.0).unwrap();
        assert!(g.abs() < 1e-12);
    }

    #[test]
    fn log_growth_peaks_at_full_kelly() {
        // p = 0.6, c = 0.5 => f* = 0.2
        let at_kelly = expected_log_growth(0.6, 0.5, 0.2).unwrap();
        let below = expected_log_growth(0.6, 0.5, 0.1).unwrap();
        let above = expected_log_growth(0.6, 0.5, 0.3).unwrap();
        assert!(at_kelly > below);
        assert!(at_kelly > above);

        let optimal = kelly_optimal_growth(dec!(0.6), dec!(0.5)).unwrap();
        assert!((optimal - at_kelly).abs() < 1e-9);
    }

    #[test]
    fn log_growth_rejects_out_of_domain_inputs() {
        assert!(expected_log_growth(0.6, 0.5, 1.0).is_none());
        assert!(expected_log_growth(0.6, 0.0, 0.1).is_none());
        assert!(kelly_optimal_growth(dec!(0.4), dec!(0.5)).is_none());
    }
}
