//! Vacation pay and prima vacacional.
//!
//! ## Entitlement (LFT art. 76)
//!
//! | Service year | Days |
//! |--------------|------|
//! | 1            | 12   |
//! | 2 to 5       | +2 each year, up to 20 |
//! | 6 onward     | +2 every five years |
//!
//! Vacation pay is ordinary salary and fully taxable. The premium
//! (LFT art. 80, at least 25 %) is exempt up to 15 daily UMAs per year
//! (LISR art. 93 fr. XIV).

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fiscal::FiscalConfig;
use crate::fixed_point::{Money, Quantity, Rate};
use crate::models::AuditStep;

use super::exemption::{split_exempt, ExemptionSplit};

/// Statutory vacation days for the given service year (1-based).
///
/// Year 0, a worker who has not reached the first anniversary, is treated
/// as the first year.
///
/// # Examples
///
/// ```
/// use nomina_engine::calculation::vacation_days_for_service_year;
/// use nomina_engine::fixed_point::Quantity;
///
/// assert_eq!(vacation_days_for_service_year(1), Quantity::from_int(12));
/// assert_eq!(vacation_days_for_service_year(5), Quantity::from_int(20));
/// assert_eq!(vacation_days_for_service_year(6), Quantity::from_int(22));
/// assert_eq!(vacation_days_for_service_year(11), Quantity::from_int(24));
/// ```
pub fn vacation_days_for_service_year(service_year: u32) -> Quantity {
    let year = i64::from(service_year.max(1));
    let days = if year <= 5 {
        10 + 2 * year
    } else {
        20 + 2 * ((year - 5 + 4) / 5)
    };
    Quantity::from_int(days)
}

/// The result of a vacation calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacationResult {
    /// Vacation days paid.
    pub days: Quantity,
    /// `daily_salary × days`, fully taxable.
    pub vacation_pay: Money,
    /// The prima vacacional rate.
    pub premium_rate: Rate,
    /// The premium and its exempt/taxable split.
    pub premium: ExemptionSplit,
    /// Audit steps recording the calculation.
    pub audit_steps: Vec<AuditStep>,
}

/// Calculates vacation pay and the prima vacacional on `days` vacation days.
pub fn calculate_vacation(
    daily_salary: Money,
    days: Quantity,
    premium_rate: Rate,
    exempt_available: Option<Money>,
    fiscal: &FiscalConfig,
    step_number_start: u32,
) -> EngineResult<VacationResult> {
    if days < Quantity::ZERO {
        return Err(EngineError::invalid_input(
            "vacation_days",
            format!("must not be negative, got {}", days),
        ));
    }

    let rounding = &fiscal.rounding;
    let vacation_pay = daily_salary
        .times(days, rounding.intermediate)?
        .round_to_cent(rounding.payments)?;
    let premium_gross = vacation_pay
        .apply_rate(premium_rate, rounding.intermediate)?
        .round_to_cent(rounding.payments)?;

    let ceiling = fiscal.vacation_premium_exempt_cap()?;
    let premium = split_exempt(premium_gross, ceiling, exempt_available)?;

    let audit_steps = vec![
        AuditStep {
            step_number: step_number_start,
            rule_id: "vacation_pay".to_string(),
            rule_name: "Vacation Pay".to_string(),
            legal_ref: "LFT art. 76".to_string(),
            input: serde_json::json!({
                "daily_salary": daily_salary.to_string(),
                "days": days.to_string(),
            }),
            output: serde_json::json!({ "vacation_pay": vacation_pay.to_string() }),
            reasoning: format!("{} × {} days = {}", daily_salary, days, vacation_pay),
        },
        AuditStep {
            step_number: step_number_start + 1,
            rule_id: "vacation_premium".to_string(),
            rule_name: "Prima Vacacional".to_string(),
            legal_ref: "LFT art. 80; LISR art. 93 fr. XIV".to_string(),
            input: serde_json::json!({
                "vacation_pay": vacation_pay.to_string(),
                "rate": premium_rate.to_string(),
                "ceiling": ceiling.to_string(),
                "available": premium.available.map(|a| a.to_string()),
            }),
            output: serde_json::json!({
                "premium": premium.gross.to_string(),
                "exempt": premium.exempt.to_string(),
                "taxable": premium.taxable.to_string(),
            }),
            reasoning: format!(
                "{} × {}% = {}; exempt up to {}",
                vacation_pay, premium_rate, premium.gross, ceiling
            ),
        },
    ];

    Ok(VacationResult {
        days,
        vacation_pay,
        premium_rate,
        premium,
        audit_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fiscal_2026;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    #[test]
    fn test_entitlement_table() {
        let expected = [
            (0, 12),
            (1, 12),
            (2, 14),
            (3, 16),
            (4, 18),
            (5, 20),
            (6, 22),
            (10, 22),
            (11, 24),
            (15, 24),
            (16, 26),
            (21, 28),
        ];
        for (year, days) in expected {
            assert_eq!(
                vacation_days_for_service_year(year),
                Quantity::from_int(days),
                "service year {}",
                year
            );
        }
    }

    #[test]
    fn test_twelve_days_at_500() {
        let fiscal = fiscal_2026();
        let result = calculate_vacation(
            money("500"),
            Quantity::from_int(12),
            Rate::from_bp(2_500),
            None,
            &fiscal,
            1,
        )
        .unwrap();

        assert_eq!(result.vacation_pay, money("6000"));
        assert_eq!(result.premium.gross, money("1500"));
        // 15 × 117.31 = 1759.65
        assert_eq!(result.premium.exempt, money("1500"));
        assert_eq!(result.premium.taxable, Money::ZERO);
    }

    #[test]
    fn test_premium_above_ceiling() {
        let fiscal = fiscal_2026();
        let result = calculate_vacation(
            money("2000"),
            Quantity::from_int(20),
            Rate::from_bp(5_000),
            None,
            &fiscal,
            1,
        )
        .unwrap();

        assert_eq!(result.premium.gross, money("20000"));
        assert_eq!(result.premium.exempt, money("1759.65"));
        assert_eq!(result.premium.taxable, money("18240.35"));
    }

    #[test]
    fn test_negative_days_rejected() {
        let fiscal = fiscal_2026();
        let result = calculate_vacation(
            money("500"),
            Quantity::from_int(-1),
            Rate::from_bp(2_500),
            None,
            &fiscal,
            1,
        );
        assert!(matches!(result, Err(EngineError::InvalidInput { .. })));
    }
}
