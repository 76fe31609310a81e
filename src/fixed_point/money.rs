//! The [`Money`] type: currency amounts in basis points.
//!
//! One peso is 10,000 money-bp, so every amount carries four fractional
//! digits. Intermediate results keep that precision; rounding to the cent
//! happens once, on the externally visible amount.

use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

use super::rounding::{div_round, mul_div};
use super::{Quantity, Rate, RoundingMode, FRACTION_DIGITS, RATE_ONE, SCALE};

/// Money-bp in one cent.
pub const CENT_BP: i128 = 100;

/// A monetary value stored as a signed 128-bit count of money-bp.
///
/// # Example
///
/// ```
/// use nomina_engine::fixed_point::{Money, Rate, RoundingMode};
///
/// let salary = Money::from_units(15_000);
/// assert_eq!(salary.bp(), 150_000_000);
///
/// let tax = salary.apply_rate(Rate::from_bp(1_792), RoundingMode::HalfEven).unwrap();
/// assert_eq!(tax.to_string(), "2688.0000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i128);

impl Money {
    /// Zero pesos.
    pub const ZERO: Money = Money(0);

    /// Creates a value from raw money-bp.
    #[inline]
    pub const fn from_bp(bp: i128) -> Self {
        Money(bp)
    }

    /// Creates a value from whole pesos.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units as i128 * SCALE)
    }

    /// Returns the raw money-bp.
    #[inline]
    pub const fn bp(self) -> i128 {
        self.0
    }

    /// Converts an exact decimal. Fails when the decimal has more than four
    /// fractional digits after normalisation.
    pub fn from_decimal(value: Decimal) -> EngineResult<Self> {
        super::decimal_to_raw(value).map(Money)
    }

    /// Converts a decimal, rounding extra fractional digits with `mode`.
    pub fn from_decimal_rounded(value: Decimal, mode: RoundingMode) -> EngineResult<Self> {
        super::decimal_to_raw_rounded(value, mode).map(Money)
    }

    /// Converts back into an exact decimal.
    pub fn to_decimal(self) -> EngineResult<Decimal> {
        Decimal::try_from_i128_with_scale(self.0, FRACTION_DIGITS)
            .map_err(|_| EngineError::overflow("money to decimal conversion"))
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

    /// Returns true when strictly less than zero.
    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Money) -> EngineResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| EngineError::overflow("money addition"))
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Money) -> EngineResult<Money> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or_else(|| EngineError::overflow("money subtraction"))
    }

    /// Checked negation.
    pub fn checked_neg(self) -> EngineResult<Money> {
        self.0
            .checked_neg()
            .map(Money)
            .ok_or_else(|| EngineError::overflow("money negation"))
    }

    /// Sums a sequence of amounts with overflow checking.
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> EngineResult<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, amount| acc.checked_add(amount))
    }

    /// `max(self, 0)`.
    #[inline]
    pub fn non_negative(self) -> Money {
        self.max(Money::ZERO)
    }

    /// Multiplies by a rate: `amount * rate_bp / 10000`, rounded to the money-bp.
    pub fn apply_rate(self, rate: Rate, mode: RoundingMode) -> EngineResult<Money> {
        mul_div(self.0, rate.raw(), RATE_ONE, mode).map(Money)
    }

    /// Multiplies by a quantity of days, hours or UMA multiples.
    pub fn times(self, quantity: Quantity, mode: RoundingMode) -> EngineResult<Money> {
        mul_div(self.0, quantity.raw(), SCALE, mode).map(Money)
    }

    /// Multiplies by an integer count.
    pub fn times_int(self, count: i128) -> EngineResult<Money> {
        self.0
            .checked_mul(count)
            .map(Money)
            .ok_or_else(|| EngineError::overflow("money multiplication"))
    }

    /// Divides by a quantity (e.g. an annual amount by 365.25 days).
    pub fn div_quantity(self, quantity: Quantity, mode: RoundingMode) -> EngineResult<Money> {
        mul_div(self.0, SCALE, quantity.raw(), mode).map(Money)
    }

    /// Multiplies by `numerator / denominator` with a single rounding step.
    ///
    /// Used for period proportions such as `days / 30.4`, where rounding the
    /// ratio first would lose precision.
    pub fn scale(
        self,
        numerator: Quantity,
        denominator: Quantity,
        mode: RoundingMode,
    ) -> EngineResult<Money> {
        mul_div(self.0, numerator.raw(), denominator.raw(), mode).map(Money)
    }

    /// Prorates by a ratio of two amounts: `self × part / whole`, rounded once.
    ///
    /// Used to split a pool in proportion to salaries earned.
    pub fn prorate(self, part: Money, whole: Money, mode: RoundingMode) -> EngineResult<Money> {
        mul_div(self.0, part.0, whole.0, mode).map(Money)
    }

    /// Divides by an integer count.
    pub fn div_int(self, count: i128, mode: RoundingMode) -> EngineResult<Money> {
        div_round(self.0, count, mode).map(Money)
    }

    /// Expresses `self / other` as a rate (e.g. an effective tax rate).
    pub fn ratio(self, other: Money, mode: RoundingMode) -> EngineResult<Rate> {
        mul_div(self.0, RATE_ONE, other.0, mode).map(Rate::from_raw)
    }

    /// Expresses `self / other` as a quantity (e.g. SBC as a UMA multiple).
    pub fn quotient(self, other: Money, mode: RoundingMode) -> EngineResult<Quantity> {
        mul_div(self.0, SCALE, other.0, mode).map(Quantity::from_raw)
    }

    /// Rounds to a multiple of `step_bp` using `mode`.
    pub fn round_to_multiple(self, step_bp: i128, mode: RoundingMode) -> EngineResult<Money> {
        let steps = div_round(self.0, step_bp, mode)?;
        steps
            .checked_mul(step_bp)
            .map(Money)
            .ok_or_else(|| EngineError::overflow("money rounding"))
    }

    /// Rounds up (toward positive infinity) to a multiple of `step_bp`.
    pub fn round_up_to_multiple(self, step_bp: i128) -> EngineResult<Money> {
        self.round_to_multiple(step_bp, RoundingMode::Ceiling)
    }

    /// Rounds down (toward negative infinity) to a multiple of `step_bp`.
    pub fn round_down_to_multiple(self, step_bp: i128) -> EngineResult<Money> {
        self.round_to_multiple(step_bp, RoundingMode::Floor)
    }

    /// Rounds to the cent.
    pub fn round_to_cent(self, mode: RoundingMode) -> EngineResult<Money> {
        self.round_to_multiple(CENT_BP, mode)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = SCALE as u128;
        write!(f, "{}{}.{:04}", sign, abs / scale, abs % scale)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| EngineError::invalid_input("money", format!("'{}': {}", s, e)))?;
        Money::from_decimal(value)
    }
}

super::impl_decimal_string_serde!(Money, "a decimal string with at most four fractional digits");

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    #[test]
    fn test_from_units_scales_by_ten_thousand() {
        assert_eq!(Money::from_units(500).bp(), 5_000_000);
        assert_eq!(Money::from_units(-3).bp(), -30_000);
    }

    #[test]
    fn test_display_pads_four_digits() {
        assert_eq!(Money::from_bp(5).to_string(), "0.0005");
        assert_eq!(Money::from_bp(-625_000).to_string(), "-62.5000");
        assert_eq!(Money::from_units(15_000).to_string(), "15000.0000");
    }

    #[test]
    fn test_parse_rejects_fifth_digit() {
        assert_eq!(money("62.50").bp(), 625_000);
        assert_eq!(money("1.50000").bp(), 15_000);
        let err = Money::from_str("0.00001").unwrap_err();
        assert!(matches!(err, EngineError::PrecisionLoss { .. }));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = Money::from_str("twelve").unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { .. }));
    }

    #[test]
    fn test_apply_rate_keeps_four_digits() {
        // 746.03 × 1.92% = 14.323776 → 14.3238
        let tax = money("746.03")
            .apply_rate(Rate::from_bp(192), RoundingMode::HalfEven)
            .unwrap();
        assert_eq!(tax, money("14.3238"));
    }

    #[test]
    fn test_apply_fractional_rate() {
        // 0.625% of 1000 = 6.25
        let rate = Rate::from_percent(Decimal::from_str("0.625").unwrap()).unwrap();
        let amount = Money::from_units(1000)
            .apply_rate(rate, RoundingMode::HalfEven)
            .unwrap();
        assert_eq!(amount, money("6.25"));
    }

    #[test]
    fn test_division_by_365_25_days() {
        let annual = Money::from_units(7_500); // 15 days × 500
        let days = Quantity::from_str("365.25").unwrap();
        let daily = annual.div_quantity(days, RoundingMode::HalfEven).unwrap();
        // 7500 / 365.25 = 20.53388...
        assert_eq!(daily, money("20.5339"));
    }

    #[test]
    fn test_round_to_cent_modes() {
        let value = money("10.0050");
        assert_eq!(
            value.round_to_cent(RoundingMode::HalfUp).unwrap(),
            money("10.01")
        );
        assert_eq!(
            value.round_to_cent(RoundingMode::HalfEven).unwrap(),
            money("10.00")
        );
        assert_eq!(value.round_down_to_multiple(CENT_BP).unwrap(), money("10.00"));
        assert_eq!(value.round_up_to_multiple(CENT_BP).unwrap(), money("10.01"));
    }

    #[test]
    fn test_checked_add_overflow() {
        let result = Money::from_bp(i128::MAX).checked_add(Money::from_bp(1));
        assert!(matches!(
            result,
            Err(EngineError::ArithmeticOverflow { .. })
        ));
    }

    #[test]
    fn test_prorate_by_salary_share() {
        let pool = money("1000");
        let share = pool
            .prorate(money("1"), money("3"), RoundingMode::Floor)
            .unwrap();
        assert_eq!(share, money("333.3333"));
        assert!(matches!(
            pool.prorate(money("1"), Money::ZERO, RoundingMode::Floor),
            Err(EngineError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn test_ratio_as_rate() {
        let rate = money("25")
            .ratio(money("100"), RoundingMode::HalfEven)
            .unwrap();
        assert_eq!(rate, Rate::from_bp(2_500));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&money("15000.25")).unwrap();
        assert_eq!(json, "\"15000.2500\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, money("15000.25"));
    }

    #[test]
    fn test_deserialize_rejects_float() {
        let result: Result<Money, _> = serde_json::from_str("0.1");
        assert!(result.is_err());
        let whole: Money = serde_json::from_str("42").unwrap();
        assert_eq!(whole, Money::from_units(42));
    }

    #[test]
    fn test_decimal_round_trip() {
        let value = money("-123.4567");
        let decimal = value.to_decimal().unwrap();
        assert_eq!(decimal.to_string(), "-123.4567");
        assert_eq!(Money::from_decimal(decimal).unwrap(), value);
    }
}
