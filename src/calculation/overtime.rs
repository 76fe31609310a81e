//! Overtime (horas extra) pay for one week.
//!
//! ## Rate Structure
//!
//! - First 9 hours of the week: 200 % of the hourly rate ("dobles", LFT art. 67)
//! - Beyond 9 hours: 300 % ("triples", LFT art. 68)
//!
//! The exempt portion is `min(total, 5 × minimum wage × 7)` per week; the
//! rest is taxable. Callers keep the two apart downstream.
//!
//! A week split between two periods is paid as one week: the second period
//! continues from the first one's hours and exemption.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fiscal::RoundingPolicy;
use crate::fixed_point::{Money, Quantity};
use crate::models::AuditStep;

/// Weekly hours paid at double rate before the triple rate applies.
pub const DOUBLE_HOURS_PER_WEEK: Quantity = Quantity::from_int(9);

/// The result of a weekly overtime calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeResult {
    /// Hours paid at 200 %.
    pub double_hours: Quantity,
    /// Hours paid at 300 %.
    pub triple_hours: Quantity,
    /// Ordinary hourly rate.
    pub hourly_rate: Money,
    /// Pay for the double hours.
    pub double_amount: Money,
    /// Pay for the triple hours.
    pub triple_amount: Money,
    /// `double_amount + triple_amount`.
    pub total: Money,
    /// What the weekly exemption ceiling leaves after earlier periods.
    pub exempt_cap: Money,
    /// `min(total, exempt_cap)`.
    pub exempt: Money,
    /// `total − exempt`.
    pub taxable: Money,
    /// Audit steps recording the calculation.
    pub audit_steps: Vec<AuditStep>,
}

/// Calculates one week's overtime pay and its exempt/taxable split.
///
/// # Arguments
///
/// * `hours` - Overtime hours worked in the week
/// * `hourly_rate` - The ordinary hourly rate
/// * `weekly_exempt_cap` - `5 × minimum wage × 7`, from
///   [`FiscalConfig::overtime_weekly_exempt_cap`](crate::fiscal::FiscalConfig::overtime_weekly_exempt_cap)
/// * `rounding` - The fiscal year's rounding policy
/// * `step_number_start` - The starting step number for the audit trail
///
/// # Example
///
/// ```
/// use nomina_engine::calculation::calculate_overtime;
/// use nomina_engine::fiscal::RoundingPolicy;
/// use nomina_engine::fixed_point::{Money, Quantity};
/// use std::str::FromStr;
///
/// let result = calculate_overtime(
///     Quantity::from_int(12),
///     Money::from_str("62.50").unwrap(),
///     Money::from_str("11026.40").unwrap(),
///     &RoundingPolicy::default(),
///     1,
/// )
/// .unwrap();
///
/// assert_eq!(result.total.to_string(), "1687.5000");
/// assert_eq!(result.taxable, Money::ZERO);
/// ```
pub fn calculate_overtime(
    hours: Quantity,
    hourly_rate: Money,
    weekly_exempt_cap: Money,
    rounding: &RoundingPolicy,
    step_number_start: u32,
) -> EngineResult<OvertimeResult> {
    calculate_overtime_after(
        Quantity::ZERO,
        Money::ZERO,
        hours,
        hourly_rate,
        weekly_exempt_cap,
        rounding,
        step_number_start,
    )
}

/// Like [`calculate_overtime`], for hours that continue a week already
/// partly paid by an earlier period.
///
/// `prior_hours` use up the double-rate allowance first and `prior_exempt`
/// uses up the week's exemption ceiling.
pub fn calculate_overtime_after(
    prior_hours: Quantity,
    prior_exempt: Money,
    hours: Quantity,
    hourly_rate: Money,
    weekly_exempt_cap: Money,
    rounding: &RoundingPolicy,
    step_number_start: u32,
) -> EngineResult<OvertimeResult> {
    if hours < Quantity::ZERO {
        return Err(EngineError::invalid_input(
            "overtime_hours",
            format!("must not be negative, got {}", hours),
        ));
    }
    if prior_hours < Quantity::ZERO || prior_exempt.is_negative() {
        return Err(EngineError::invalid_input(
            "overtime_week_to_date",
            format!(
                "must not be negative, got {} hours and {} exempt",
                prior_hours, prior_exempt
            ),
        ));
    }

    let double_allowance = DOUBLE_HOURS_PER_WEEK
        .checked_sub(prior_hours)?
        .max(Quantity::ZERO);
    let double_hours = hours.min(double_allowance);
    let triple_hours = hours.checked_sub(double_hours)?;
    let remaining_cap = weekly_exempt_cap
        .non_negative()
        .checked_sub(prior_exempt)?
        .non_negative();

    let double_amount = hourly_rate
        .times_int(2)?
        .times(double_hours, rounding.intermediate)?
        .round_to_cent(rounding.payments)?;
    let triple_amount = hourly_rate
        .times_int(3)?
        .times(triple_hours, rounding.intermediate)?
        .round_to_cent(rounding.payments)?;
    let total = double_amount.checked_add(triple_amount)?;

    let exempt = total.min(remaining_cap);
    let taxable = total.checked_sub(exempt)?;

    let mut step_number = step_number_start;
    let mut audit_steps = Vec::new();

    if double_hours.is_positive() {
        audit_steps.push(AuditStep {
            step_number,
            rule_id: "overtime_double".to_string(),
            rule_name: "Double-rate Overtime".to_string(),
            legal_ref: "LFT art. 67".to_string(),
            input: serde_json::json!({
                "hours": double_hours.to_string(),
                "prior_hours": prior_hours.to_string(),
                "hourly_rate": hourly_rate.to_string(),
                "multiplier": "2",
            }),
            output: serde_json::json!({ "amount": double_amount.to_string() }),
            reasoning: format!(
                "First {} hours at 200%: {} × {} × 2 = {}",
                double_hours, double_hours, hourly_rate, double_amount
            ),
        });
        step_number += 1;
    }

    if triple_hours.is_positive() {
        audit_steps.push(AuditStep {
            step_number,
            rule_id: "overtime_triple".to_string(),
            rule_name: "Triple-rate Overtime".to_string(),
            legal_ref: "LFT art. 68".to_string(),
            input: serde_json::json!({
                "hours": triple_hours.to_string(),
                "hourly_rate": hourly_rate.to_string(),
                "multiplier": "3",
            }),
            output: serde_json::json!({ "amount": triple_amount.to_string() }),
            reasoning: format!(
                "{} hours beyond {} at 300%: {} × {} × 3 = {}",
                triple_hours, DOUBLE_HOURS_PER_WEEK, triple_hours, hourly_rate, triple_amount
            ),
        });
        step_number += 1;
    }

    audit_steps.push(AuditStep {
        step_number,
        rule_id: "overtime_exemption".to_string(),
        rule_name: "Overtime Exemption".to_string(),
        legal_ref: "LISR art. 93 fr. I".to_string(),
        input: serde_json::json!({
            "total": total.to_string(),
            "exempt_cap": weekly_exempt_cap.to_string(),
            "prior_exempt": prior_exempt.to_string(),
        }),
        output: serde_json::json!({
            "exempt": exempt.to_string(),
            "taxable": taxable.to_string(),
        }),
        reasoning: format!(
            "min({}, {} - {}) = {} exempt, {} taxable",
            total, weekly_exempt_cap, prior_exempt, exempt, taxable
        ),
    });

    Ok(OvertimeResult {
        double_hours,
        triple_hours,
        hourly_rate,
        double_amount,
        triple_amount,
        total,
        exempt_cap: remaining_cap,
        exempt,
        taxable,
        audit_steps,
    })
}
