//! Rounding modes and the checked integer division every fixed-point type uses.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{EngineError, EngineResult};

/// How a quotient with a non-zero remainder is rounded.
///
/// The engine never rounds implicitly: every operation that can produce a
/// fractional result at the target scale takes one of these as a parameter.
///
/// # Example
///
/// ```
/// use nomina_engine::fixed_point::{div_round, RoundingMode};
///
/// assert_eq!(div_round(25, 10, RoundingMode::HalfUp).unwrap(), 3);
/// assert_eq!(div_round(25, 10, RoundingMode::HalfEven).unwrap(), 2);
/// assert_eq!(div_round(-25, 10, RoundingMode::Floor).unwrap(), -3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Toward negative infinity.
    Floor,
    /// Toward positive infinity.
    Ceiling,
    /// Toward zero (truncation).
    TowardZero,
    /// To nearest, ties away from zero.
    HalfUp,
    /// To nearest, ties to the even neighbour (bankers rounding).
    HalfEven,
}

/// Divides `numerator` by `denominator`, rounding the quotient with `mode`.
///
/// Fails with [`EngineError::DivisionByZero`] on a zero denominator and with
/// [`EngineError::ArithmeticOverflow`] when the quotient does not fit.
pub fn div_round(numerator: i128, denominator: i128, mode: RoundingMode) -> EngineResult<i128> {
    if denominator == 0 {
        return Err(EngineError::DivisionByZero {
            operation: "fixed-point division".to_string(),
        });
    }

    let quotient = numerator
        .checked_div(denominator)
        .ok_or_else(|| EngineError::overflow("fixed-point division"))?;
    let remainder = numerator
        .checked_rem(denominator)
        .ok_or_else(|| EngineError::overflow("fixed-point division"))?;

    if remainder == 0 {
        return Ok(quotient);
    }

    let positive = (numerator < 0) == (denominator < 0);
    let rem_abs = remainder.unsigned_abs();
    let den_abs = denominator.unsigned_abs();
    // Compare the remainder against the other half of the divisor without doubling it.
    let half = rem_abs.cmp(&(den_abs - rem_abs));

    let away_from_zero = match mode {
        RoundingMode::TowardZero => false,
        RoundingMode::Floor => !positive,
        RoundingMode::Ceiling => positive,
        RoundingMode::HalfUp => half != Ordering::Less,
        RoundingMode::HalfEven => match half {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => quotient % 2 != 0,
        },
    };

    if !away_from_zero {
        return Ok(quotient);
    }

    let step = if positive { 1 } else { -1 };
    quotient
        .checked_add(step)
        .ok_or_else(|| EngineError::overflow("fixed-point rounding"))
}

/// Multiplies then divides with a single rounding step: `a * b / denominator`.
pub(crate) fn mul_div(a: i128, b: i128, denominator: i128, mode: RoundingMode) -> EngineResult<i128> {
    let product = a
        .checked_mul(b)
        .ok_or_else(|| EngineError::overflow("fixed-point multiplication"))?;
    div_round(product, denominator, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_division_ignores_mode() {
        for mode in [
            RoundingMode::Floor,
            RoundingMode::Ceiling,
            RoundingMode::TowardZero,
            RoundingMode::HalfUp,
            RoundingMode::HalfEven,
        ] {
            assert_eq!(div_round(100, 4, mode).unwrap(), 25);
            assert_eq!(div_round(-100, 4, mode).unwrap(), -25);
        }
    }

    #[test]
    fn test_floor_and_ceiling_follow_sign() {
        assert_eq!(div_round(7, 2, RoundingMode::Floor).unwrap(), 3);
        assert_eq!(div_round(-7, 2, RoundingMode::Floor).unwrap(), -4);
        assert_eq!(div_round(7, 2, RoundingMode::Ceiling).unwrap(), 4);
        assert_eq!(div_round(-7, 2, RoundingMode::Ceiling).unwrap(), -3);
        assert_eq!(div_round(7, -2, RoundingMode::Floor).unwrap(), -4);
    }

    #[test]
    fn test_half_up_rounds_ties_away_from_zero() {
        assert_eq!(div_round(5, 2, RoundingMode::HalfUp).unwrap(), 3);
        assert_eq!(div_round(-5, 2, RoundingMode::HalfUp).unwrap(), -3);
        assert_eq!(div_round(14, 10, RoundingMode::HalfUp).unwrap(), 1);
        assert_eq!(div_round(16, 10, RoundingMode::HalfUp).unwrap(), 2);
    }

    #[test]
    fn test_half_even_rounds_ties_to_even() {
        assert_eq!(div_round(5, 2, RoundingMode::HalfEven).unwrap(), 2);
        assert_eq!(div_round(7, 2, RoundingMode::HalfEven).unwrap(), 4);
        assert_eq!(div_round(-5, 2, RoundingMode::HalfEven).unwrap(), -2);
        assert_eq!(div_round(26, 10, RoundingMode::HalfEven).unwrap(), 3);
    }

    #[test]
    fn test_division_by_zero_is_reported() {
        let result = div_round(10, 0, RoundingMode::HalfUp);
        assert!(matches!(result, Err(EngineError::DivisionByZero { .. })));
    }

    #[test]
    fn test_min_over_minus_one_overflows() {
        let result = div_round(i128::MIN, -1, RoundingMode::TowardZero);
        assert!(matches!(
            result,
            Err(EngineError::ArithmeticOverflow { .. })
        ));
    }

    #[test]
    fn test_mul_div_overflow_is_reported() {
        let result = mul_div(i128::MAX, 2, 1, RoundingMode::HalfUp);
        assert!(matches!(
            result,
            Err(EngineError::ArithmeticOverflow { .. })
        ));
    }
}
