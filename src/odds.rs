//! Odds conversion and no-vig math.
//!
//! American odds are the wire format on both books; everything internal works
//! in decimal odds and implied probabilities. De-vigging is proportional:
//! implied probabilities across all present outcomes of a market are
//! normalized to sum to 1, recovering the fair probability the sharp
//! reference book's prices encode underneath its margin.

/// Decimal odds this close to 1.0 or below carry no payout and are invalid.
pub const MIN_DECIMAL_ODDS: f64 = 1.0001;

/// Convert American odds to decimal odds. Zero is not a valid American price.
pub fn american_to_decimal(american: i32) -> Option<f64> {
    if american > 0 {
        Some(american as f64 / 100.0 + 1.0)
    } else if american < 0 {
        Some(100.0 / american.unsigned_abs() as f64 + 1.0)
    } else {
        None
    }
}

/// Convert decimal odds back to American, for display only.
pub fn decimal_to_american(decimal: f64) -> Option<i32> {
    if !decimal.is_finite() || decimal <= MIN_DECIMAL_ODDS {
        return None;
    }
    if decimal >= 2.0 {
        Some(((decimal - 1.0) * 100.0).round() as i32)
    } else {
        Some((-100.0 / (decimal - 1.0)).round() as i32)
    }
}

/// Implied probability of a decimal price.
pub fn implied_probability(decimal: f64) -> Option<f64> {
    if decimal.is_finite() && decimal > MIN_DECIMAL_ODDS {
        Some(1.0 / decimal)
    } else {
        None
    }
}

/// Proportionally de-vig a market: normalize the implied probabilities of all
/// present outcomes to sum to 1. Requires at least two valid outcomes; a
/// one-sided market has no recoverable fair probability.
pub fn no_vig_probabilities(decimals: &[f64]) -> Option<Vec<f64>> {
    if decimals.len() < 2 {
        return None;
    }
    let mut implied = Vec::with_capacity(decimals.len());
    for &d in decimals {
        implied.push(implied_probability(d)?);
    }
    let total: f64 = implied.iter().sum();
    if total <= 0.0 {
        return None;
    }
    Some(implied.into_iter().map(|p| p / total).collect())
}

/// Fair (no-vig) decimal prices for a market, one per outcome.
pub fn no_vig_prices(decimals: &[f64]) -> Option<Vec<f64>> {
    Some(
        no_vig_probabilities(decimals)?
            .into_iter()
            .map(|p| 1.0 / p)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_american_to_decimal() {
        assert_eq!(american_to_decimal(100), Some(2.0));
        assert_eq!(american_to_decimal(150), Some(2.5));
        assert_eq!(american_to_decimal(-200), Some(1.5));
        assert!((american_to_decimal(-110).unwrap() - 1.909090909).abs() < 1e-9);
        assert_eq!(american_to_decimal(0), None);
    }

    #[test]
    fn test_decimal_to_american_display_edge() {
        assert_eq!(decimal_to_american(2.0), Some(100));
        assert_eq!(decimal_to_american(1.0), None);
        assert_eq!(decimal_to_american(0.5), None);
        assert_eq!(decimal_to_american(f64::NAN), None);
    }

    #[test]
    fn test_american_round_trip() {
        for odds in [-110, 150, 100, -105, -200, 250, -350] {
            let decimal = american_to_decimal(odds).unwrap();
            assert_eq!(decimal_to_american(decimal), Some(odds), "odds {odds}");
        }
    }

    #[test]
    fn test_no_vig_probabilities_sum_to_one() {
        let decimals = [
            american_to_decimal(-110).unwrap(),
            american_to_decimal(-110).unwrap(),
        ];
        let probs = no_vig_probabilities(&decimals).unwrap();
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!((probs[0] - 0.5).abs() < 1e-9);
        assert!((probs[1] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_vig_three_way() {
        // Soccer moneyline with a draw: all three outcomes normalize together.
        let decimals = [2.10, 3.40, 3.60];
        let probs = no_vig_probabilities(&decimals).unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(probs[0] > probs[1] && probs[1] > probs[2]);
    }

    #[test]
    fn test_no_vig_rejects_one_sided_or_invalid_markets() {
        assert!(no_vig_probabilities(&[1.91]).is_none());
        assert!(no_vig_probabilities(&[1.91, 1.0]).is_none());
        assert!(no_vig_probabilities(&[]).is_none());
    }

    #[test]
    fn test_asymmetric_market_fair_prices() {
        // -120 / +105: favorite's fair price shortens less than the dog's.
        let decimals = [
            american_to_decimal(-120).unwrap(),
            american_to_decimal(105).unwrap(),
        ];
        let fair = no_vig_prices(&decimals).unwrap();
        assert!(fair[0] > decimals[0]);
        assert!(fair[1] > decimals[1]);
        let probs = no_vig_probabilities(&decimals).unwrap();
        assert!((probs[0] + probs[1] - 1.0).abs() < 1e-9);
        assert!(probs[0] > 0.5);
    }
}
