//! The [`Quantity`] type: days, hours, factors and UMA multiples.

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

use super::rounding::mul_div;
use super::{RoundingMode, FRACTION_DIGITS, SCALE};

/// A dimensionless fixed-point quantity with four fractional digits.
///
/// Used for hours worked, days in a window, the integration factor and
/// multiples of the UMA. Shares the money scale so the two combine without
/// rescaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity(i128);

impl Quantity {
    /// Zero.
    pub const ZERO: Quantity = Quantity(0);
    /// One.
    pub const ONE: Quantity = Quantity(SCALE);

    /// Creates a quantity from a whole number.
    #[inline]
    pub const fn from_int(value: i64) -> Self {
        Quantity(value as i128 * SCALE)
    }

    /// Creates a quantity from its raw representation (10,000 is 1).
    #[inline]
    pub const fn from_raw(raw: i128) -> Self {
        Quantity(raw)
    }

    /// Returns the raw representation.
    #[inline]
    pub const fn raw(self) -> i128 {
        self.0
    }

    /// Converts an exact decimal with at most four fractional digits.
    pub fn from_decimal(value: Decimal) -> EngineResult<Self> {
        super::decimal_to_raw(value).map(Quantity)
    }

    /// Builds `numerator / denominator` rounded with `mode`.
    pub fn from_ratio(numerator: i64, denominator: i64, mode: RoundingMode) -> EngineResult<Self> {
        mul_div(numerator as i128, SCALE, denominator as i128, mode).map(Quantity)
    }

    /// Converts back into an exact decimal.
    pub fn to_decimal(self) -> EngineResult<Decimal> {
        Decimal::try_from_i128_with_scale(self.0, FRACTION_DIGITS)
            .map(|d| d.normalize())
            .map_err(|_| EngineError::overflow("quantity to decimal conversion"))
    }

    /// Returns true for zero.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true when strictly greater than zero.
    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Quantity) -> EngineResult<Quantity> {
        self.0
            .checked_add(other.0)
            .map(Quantity)
            .ok_or_else(|| EngineError::overflow("quantity addition"))
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Quantity) -> EngineResult<Quantity> {
        self.0
            .checked_sub(other.0)
            .map(Quantity)
            .ok_or_else(|| EngineError::overflow("quantity subtraction"))
    }

    /// Multiplies two quantities.
    pub fn times(self, other: Quantity, mode: RoundingMode) -> EngineResult<Quantity> {
        mul_div(self.0, other.0, SCALE, mode).map(Quantity)
    }

    /// Divides two quantities.
    pub fn div_by(self, other: Quantity, mode: RoundingMode) -> EngineResult<Quantity> {
        mul_div(self.0, SCALE, other.0, mode).map(Quantity)
    }

    /// Rounds to a whole number with `mode`.
    pub fn round_to_int(self, mode: RoundingMode) -> EngineResult<i64> {
        let whole = super::rounding::div_round(self.0, SCALE, mode)?;
        i64::try_from(whole).map_err(|_| EngineError::overflow("quantity to integer"))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = SCALE as u128;
        let frac = abs % scale;
        if frac == 0 {
            return write!(f, "{}{}", sign, abs / scale);
        }
        let digits = format!("{:04}", frac);
        write!(f, "{}{}.{}", sign, abs / scale, digits.trim_end_matches('0'))
    }
}

impl FromStr for Quantity {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| EngineError::invalid_input("quantity", format!("'{}': {}", s, e)))?;
        Quantity::from_decimal(value)
    }
}

super::impl_decimal_string_serde!(Quantity, "a decimal string with at most four fractional digits");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_trims_trailing_zeros() {
        assert_eq!(Quantity::from_int(9).to_string(), "9");
        assert_eq!(Quantity::from_str("365.25").unwrap().to_string(), "365.25");
        assert_eq!(Quantity::from_str("30.4").unwrap().to_string(), "30.4");
    }

    #[test]
    fn test_from_ratio_rounds() {
        let third = Quantity::from_ratio(1, 3, RoundingMode::HalfEven).unwrap();
        assert_eq!(third.raw(), 3_333);
        let two_thirds = Quantity::from_ratio(2, 3, RoundingMode::HalfEven).unwrap();
        assert_eq!(two_thirds.raw(), 6_667);
    }

    #[test]
    fn test_times_and_div() {
        let days = Quantity::from_int(15);
        let prima = Quantity::from_str("0.25").unwrap();
        assert_eq!(
            days.times(prima, RoundingMode::HalfEven).unwrap(),
            Quantity::from_str("3.75").unwrap()
        );
        assert_eq!(
            Quantity::from_int(304)
                .div_by(Quantity::from_int(10), RoundingMode::HalfEven)
                .unwrap(),
            Quantity::from_str("30.4").unwrap()
        );
    }
}
