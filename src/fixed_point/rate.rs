//! The [`Rate`] type: percentages in basis points.
//!
//! One percentage point is 100 rate-bp and 100 % is 10,000 rate-bp. Rates
//! keep four more digits below the basis point so IMSS branch rates such as
//! 0.625 % (62.5 rate-bp) or a risk premium of 0.54355 % stay exact.

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

use super::rounding::div_round;
use super::{RoundingMode, RATE_ONE, RATE_SUB_BP};

/// A percentage rate.
///
/// # Example
///
/// ```
/// use nomina_engine::fixed_point::Rate;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let rate = Rate::from_percent(Decimal::from_str("1.125").unwrap()).unwrap();
/// assert_eq!(rate.to_string(), "1.125");
/// assert_eq!(Rate::from_bp(192).to_string(), "1.92");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Rate(i128);

impl Rate {
    /// 0 %.
    pub const ZERO: Rate = Rate(0);
    /// 100 %.
    pub const ONE_HUNDRED_PERCENT: Rate = Rate(RATE_ONE);

    /// Creates a rate from whole rate-bp (`192` is 1.92 %).
    #[inline]
    pub const fn from_bp(bp: i64) -> Self {
        Rate(bp as i128 * RATE_SUB_BP)
    }

    /// Creates a rate from its internal representation (10^8 is 100 %).
    #[inline]
    pub const fn from_raw(raw: i128) -> Self {
        Rate(raw)
    }

    /// Returns the internal representation (10^8 is 100 %).
    #[inline]
    pub const fn raw(self) -> i128 {
        self.0
    }

    /// Converts a percentage (`"6.40"` for 6.40 %). Up to six fractional digits
    /// of the percentage are exact; more fail with `PrecisionLoss`.
    pub fn from_percent(percent: Decimal) -> EngineResult<Self> {
        let normalized = percent.normalize();
        let scale = normalized.scale();
        if scale > 6 {
            return Err(EngineError::PrecisionLoss {
                value: percent.to_string(),
                max_digits: 6,
            });
        }
        let factor = 10_i128.pow(6 - scale);
        normalized
            .mantissa()
            .checked_mul(factor)
            .map(Rate)
            .ok_or_else(|| EngineError::overflow("rate conversion"))
    }

    /// Returns the rate in whole rate-bp, rounded with `mode`.
    pub fn bp(self, mode: RoundingMode) -> EngineResult<i128> {
        div_round(self.0, RATE_SUB_BP, mode)
    }

    /// Returns the percentage as an exact decimal.
    pub fn to_percent(self) -> EngineResult<Decimal> {
        Decimal::try_from_i128_with_scale(self.0, 6)
            .map(|d| d.normalize())
            .map_err(|_| EngineError::overflow("rate to decimal conversion"))
    }

    /// Checked addition.
    pub fn checked_add(self, other: Rate) -> EngineResult<Rate> {
        self.0
            .checked_add(other.0)
            .map(Rate)
            .ok_or_else(|| EngineError::overflow("rate addition"))
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Rate) -> EngineResult<Rate> {
        self.0
            .checked_sub(other.0)
            .map(Rate)
            .ok_or_else(|| EngineError::overflow("rate subtraction"))
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / 1_000_000;
        let frac = abs % 1_000_000;
        if frac == 0 {
            return write!(f, "{}{}", sign, whole);
        }
        let digits = format!("{:06}", frac);
        write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for Rate {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim().trim_end_matches('%'))
            .map_err(|e| EngineError::invalid_input("rate", format!("'{}': {}", s, e)))?;
        Rate::from_percent(value)
    }
}

super::impl_decimal_string_serde!(Rate, "a percentage as a decimal string");

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(s: &str) -> Rate {
        Rate::from_str(s).unwrap()
    }

    #[test]
    fn test_from_bp_matches_percent() {
        assert_eq!(Rate::from_bp(640), rate("6.40"));
        assert_eq!(Rate::from_bp(10_000), Rate::ONE_HUNDRED_PERCENT);
    }

    #[test]
    fn test_fractional_basis_points_are_exact() {
        let r = rate("0.54355");
        assert_eq!(r.raw(), 543_550);
        assert_eq!(r.bp(RoundingMode::HalfEven).unwrap(), 54);
        assert_eq!(r.to_string(), "0.54355");
    }

    #[test]
    fn test_too_many_digits_rejected() {
        let err = Rate::from_str("1.1234567").unwrap_err();
        assert!(matches!(err, EngineError::PrecisionLoss { .. }));
    }

    #[test]
    fn test_accepts_percent_sign() {
        assert_eq!(rate("25%"), Rate::from_bp(2_500));
    }

    #[test]
    fn test_to_percent_round_trip() {
        let r = rate("3.413");
        assert_eq!(r.to_percent().unwrap().to_string(), "3.413");
    }

    #[test]
    fn test_serializes_as_percent_string() {
        let json = serde_json::to_string(&rate("1.125")).unwrap();
        assert_eq!(json, "\"1.125\"");
        let back: Rate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rate("1.125"));
    }
}
