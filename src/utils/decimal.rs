//! Decimal conversion and rounding helpers.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Round a decimal to a number of places using banker's rounding.
pub fn round_half_even(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointNearestEven)
}

/// Magnitudes below this convert to zero.
const ZERO_CUTOFF: f64 = 1e-10;

/// Convert a float to its shortest round-trip decimal form (`0.1` stays `0.1`).
///
/// Magnitudes below 1e-10 become zero so the digit count stays within the
/// 28-place decimal scale. Magnitudes beyond `Decimal::MAX` saturate to
/// `Decimal::MAX` or `Decimal::MIN`. Returns `None` only for NaN and
/// infinities.
pub fn from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    if value.abs() < ZERO_CUTOFF {
        return Some(Decimal::ZERO);
    }
    match Decimal::from_str(&value.to_string()) {
        Ok(decimal) => Some(decimal),
        Err(_) if value.is_sign_negative() => Some(Decimal::MIN),
        Err(_) => Some(Decimal::MAX),
    }
}

/// Convert a decimal to a float, falling back to zero.
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Division that returns `None` when the divisor is zero.
pub fn checked_ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator == Decimal::ZERO {
        None
    } else {
        numerator.checked_div(denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_half_even() {
        assert_eq!(round_half_even(dec!(0.25), 1), dec!(0.2));
        assert_eq!(round_half_even(dec!(0.35), 1), dec!(0.4));
        assert_eq!(round_half_even(dec!(0.125), 2), dec!(0.12));
        assert_eq!(round_half_even(dec!(-0.0137), 2), dec!(-0.01));
    }

    #[test]
    fn test_from_f64_shortest_form() {
        assert_eq!(from_f64(0.42), Some(dec!(0.42)));
        assert_eq!(from_f64(0.0137), Some(dec!(0.0137)));
        assert_eq!(from_f64(f64::NAN), None);
        assert_eq!(from_f64(f64::INFINITY), None);
        assert_eq!(from_f64(1e30), Some(Decimal::MAX));
        assert_eq!(from_f64(-8e28), Some(Decimal::MIN));
        assert_eq!(from_f64(-1e-300), Some(Decimal::ZERO));
        assert_eq!(from_f64(1.5e-9), Some(dec!(0.0000000015)));
    }

    #[test]
    fn test_checked_ratio() {
        assert_eq!(checked_ratio(dec!(1.37), dec!(100)), Some(dec!(0.0137)));
        assert_eq!(checked_ratio(dec!(1), Decimal::ZERO), None);
    }
}
