//! Fixed-point arithmetic substrate.
//!
//! Every monetary amount and rate in the engine is a checked 128-bit
//! integer:
//!
//! - [`Money`]: 1 peso = 10,000 money-bp
//! - [`Rate`]: 1 percentage point = 100 rate-bp (with four sub-bp digits)
//! - [`Quantity`]: days, hours, factors, UMA multiples (4 decimals)
//!
//! No binary floating point is involved. Overflow is reported as
//! [`EngineError::ArithmeticOverflow`], never wrapped, and every operation
//! that may leave a remainder takes an explicit [`RoundingMode`].
//!
//! The free functions below are the substrate's flat surface; the same
//! operations exist as methods on the types.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};

/// Implements string-based serde for a fixed-point newtype.
///
/// Values serialize as decimal strings. Deserialization accepts strings and
/// JSON integers, and rejects floats.
macro_rules! impl_decimal_string_serde {
    ($ty:ident, $expecting:literal) => {
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct FixedPointVisitor;

                impl<'de> serde::de::Visitor<'de> for FixedPointVisitor {
                    type Value = $ty;

                    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                        f.write_str($expecting)
                    }

                    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<$ty, E> {
                        v.parse::<$ty>().map_err(E::custom)
                    }

                    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<$ty, E> {
                        v.to_string().parse::<$ty>().map_err(E::custom)
                    }

                    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<$ty, E> {
                        v.to_string().parse::<$ty>().map_err(E::custom)
                    }
                }

                deserializer.deserialize_any(FixedPointVisitor)
            }
        }
    };
}

pub(crate) use impl_decimal_string_serde;

mod money;
mod quantity;
mod rate;
mod rounding;

pub use money::{Money, CENT_BP};
pub use quantity::Quantity;
pub use rate::Rate;
pub use rounding::{div_round, RoundingMode};

/// Fractional digits carried by [`Money`] and [`Quantity`].
pub const FRACTION_DIGITS: u32 = 4;

/// Raw units per whole peso / whole quantity.
pub const SCALE: i128 = 10_000;

/// Raw [`Rate`] units per rate-bp.
pub const RATE_SUB_BP: i128 = 10_000;

/// Raw [`Rate`] units for 100 %.
pub const RATE_ONE: i128 = 10_000 * RATE_SUB_BP;

/// Converts an exact decimal into raw units at scale 10^4.
fn decimal_to_raw(value: Decimal) -> EngineResult<i128> {
    let normalized = value.normalize();
    let scale = normalized.scale();
    if scale > FRACTION_DIGITS {
        return Err(EngineError::PrecisionLoss {
            value: value.to_string(),
            max_digits: FRACTION_DIGITS,
        });
    }
    normalized
        .mantissa()
        .checked_mul(10_i128.pow(FRACTION_DIGITS - scale))
        .ok_or_else(|| EngineError::overflow("decimal conversion"))
}

/// Converts a decimal into raw units at scale 10^4, rounding extra digits.
fn decimal_to_raw_rounded(value: Decimal, mode: RoundingMode) -> EngineResult<i128> {
    let normalized = value.normalize();
    let scale = normalized.scale();
    if scale <= FRACTION_DIGITS {
        return decimal_to_raw(normalized);
    }
    let divisor = 10_i128
        .checked_pow(scale - FRACTION_DIGITS)
        .ok_or_else(|| EngineError::overflow("decimal conversion"))?;
    div_round(normalized.mantissa(), divisor, mode)
}

/// `to_bp`: converts an exact decimal amount into money-bp.
pub fn to_bp(value: Decimal) -> EngineResult<Money> {
    Money::from_decimal(value)
}

/// `from_bp`: converts money-bp back into an exact decimal.
pub fn from_bp(amount: Money) -> EngineResult<Decimal> {
    amount.to_decimal()
}

/// `rate_to_bp`: converts a percentage into a [`Rate`].
pub fn rate_to_bp(percent: Decimal) -> EngineResult<Rate> {
    Rate::from_percent(percent)
}

/// `mul`: `amount * rate / 10000` in rate-bp terms, result in money-bp.
pub fn mul(amount: Money, rate: Rate, mode: RoundingMode) -> EngineResult<Money> {
    amount.apply_rate(rate, mode)
}

/// `div_floor`: divides an amount by an integer, rounding toward negative infinity.
pub fn div_floor(amount: Money, divisor: i128) -> EngineResult<Money> {
    amount.div_int(divisor, RoundingMode::Floor)
}

/// `div_round_half_to_even`: divides an amount by an integer with bankers rounding.
pub fn div_round_half_to_even(amount: Money, divisor: i128) -> EngineResult<Money> {
    amount.div_int(divisor, RoundingMode::HalfEven)
}

/// `add`: checked sum.
pub fn add(a: Money, b: Money) -> EngineResult<Money> {
    a.checked_add(b)
}

/// `sub`: checked difference.
pub fn sub(a: Money, b: Money) -> EngineResult<Money> {
    a.checked_sub(b)
}

/// `min` of two amounts.
pub fn min(a: Money, b: Money) -> Money {
    a.min(b)
}

/// `max` of two amounts.
pub fn max(a: Money, b: Money) -> Money {
    a.max(b)
}

/// `round_up_to_multiple`: rounds toward positive infinity to a multiple of `step`.
pub fn round_up_to_multiple(amount: Money, step: Money) -> EngineResult<Money> {
    amount.round_up_to_multiple(step.bp())
}

/// `round_down_to_multiple`: rounds toward negative infinity to a multiple of `step`.
pub fn round_down_to_multiple(amount: Money, step: Money) -> EngineResult<Money> {
    amount.round_down_to_multiple(step.bp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_to_bp_and_back() {
        let amount = to_bp(dec("500.0000")).unwrap();
        assert_eq!(amount.bp(), 5_000_000);
        assert_eq!(from_bp(amount).unwrap(), dec("500"));
    }

    #[test]
    fn test_rate_to_bp() {
        assert_eq!(rate_to_bp(dec("1.92")).unwrap(), Rate::from_bp(192));
    }

    #[test]
    fn test_rounded_conversion() {
        let amount = Money::from_decimal_rounded(dec("1.23455"), RoundingMode::HalfEven).unwrap();
        assert_eq!(amount.bp(), 12_346);
        let amount = Money::from_decimal_rounded(dec("1.23445"), RoundingMode::HalfEven).unwrap();
        assert_eq!(amount.bp(), 12_344);
    }

    #[test]
    fn test_div_helpers() {
        let amount = Money::from_bp(-7);
        assert_eq!(div_floor(amount, 2).unwrap(), Money::from_bp(-4));
        assert_eq!(
            div_round_half_to_even(Money::from_bp(5), 2).unwrap(),
            Money::from_bp(2)
        );
    }

    #[test]
    fn test_round_to_multiple_helpers() {
        let step = Money::from_units(1);
        let amount = Money::from_bp(12_345);
        assert_eq!(round_up_to_multiple(amount, step).unwrap(), Money::from_units(2));
        assert_eq!(round_down_to_multiple(amount, step).unwrap(), Money::from_units(1));
    }

    #[test]
    fn test_min_max_add_sub() {
        let a = Money::from_units(3);
        let b = Money::from_units(5);
        assert_eq!(min(a, b), a);
        assert_eq!(max(a, b), b);
        assert_eq!(add(a, b).unwrap(), Money::from_units(8));
        assert_eq!(sub(a, b).unwrap(), Money::from_units(-2));
    }

    proptest! {
        #[test]
        fn test_decimal_round_trip(mantissa in -1_000_000_000_000i64..1_000_000_000_000i64, scale in 0u32..=4) {
            let value = Decimal::new(mantissa, scale);
            let amount = to_bp(value).unwrap();
            prop_assert_eq!(from_bp(amount).unwrap(), value);
        }

        #[test]
        fn test_string_round_trip(bp in -10_000_000_000_000i64..10_000_000_000_000i64) {
            let amount = Money::from_bp(bp as i128);
            let parsed: Money = amount.to_string().parse().unwrap();
            prop_assert_eq!(parsed, amount);
        }
    }
}
