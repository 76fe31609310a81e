//! Aguinaldo (annual bonus) calculation.
//!
//! The bonus is `daily_salary × aguinaldo_days`, prorated by the days worked
//! in the calendar year when service is incomplete (LFT art. 87). It is
//! exempt up to 30 daily UMAs per year (LISR art. 93 fr. XIV).

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fiscal::{FiscalConfig, CALENDAR_DAYS_PER_YEAR};
use crate::fixed_point::{Money, Quantity};
use crate::models::{AuditStep, EmployeeProfile};

use super::exemption::{split_exempt, ExemptionSplit};

/// The result of an aguinaldo calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AguinaldoResult {
    /// Days worked in the window.
    pub days_worked: Quantity,
    /// The gross bonus and its exempt/taxable split.
    pub split: ExemptionSplit,
    /// Audit steps recording the calculation.
    pub audit_steps: Vec<AuditStep>,
}

/// Days worked in `year` up to and including `through`, counting from the
/// later of January 1 and the hire date. A full leap year counts as 365.
pub fn days_worked_in_year(
    employee: &EmployeeProfile,
    year: i32,
    through: NaiveDate,
) -> EngineResult<Quantity> {
    let january_first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| {
        EngineError::invalid_input("year", format!("{} is not a valid year", year))
    })?;
    if through.year() != year {
        return Err(EngineError::invalid_input(
            "through",
            format!("{} is not in {}", through, year),
        ));
    }
    let start = employee.hire_date.max(january_first);
    let days = ((through - start).num_days() + 1).clamp(0, 365);
    Ok(Quantity::from_int(days))
}

/// Calculates the aguinaldo for `days_worked` out of a 365-day year.
///
/// # Arguments
///
/// * `daily_salary` - The ordinary daily salary
/// * `aguinaldo_days` - Entitled days for a full year (15 at minimum)
/// * `days_worked` - Days worked in the year, at most 365
/// * `exempt_available` - What remains of the annual exemption in the ledger
/// * `fiscal` - The fiscal year's configuration
/// * `step_number_start` - The starting step number for the audit trail
pub fn calculate_aguinaldo(
    daily_salary: Money,
    aguinaldo_days: Quantity,
    days_worked: Quantity,
    exempt_available: Option<Money>,
    fiscal: &FiscalConfig,
    step_number_start: u32,
) -> EngineResult<AguinaldoResult> {
    if days_worked < Quantity::ZERO || days_worked > CALENDAR_DAYS_PER_YEAR {
        return Err(EngineError::invalid_input(
            "days_worked",
            format!("must be between 0 and 365, got {}", days_worked),
        ));
    }

    let full_year = daily_salary.times(aguinaldo_days, fiscal.rounding.intermediate)?;
    let gross = full_year
        .scale(days_worked, CALENDAR_DAYS_PER_YEAR, fiscal.rounding.intermediate)?
        .round_to_cent(fiscal.rounding.payments)?;

    let ceiling = fiscal.aguinaldo_exempt_cap()?;
    let split = split_exempt(gross, ceiling, exempt_available)?;

    let audit_steps = vec![
        AuditStep {
            step_number: step_number_start,
            rule_id: "aguinaldo_amount".to_string(),
            rule_name: "Aguinaldo".to_string(),
            legal_ref: "LFT art. 87".to_string(),
            input: serde_json::json!({
                "daily_salary": daily_salary.to_string(),
                "aguinaldo_days": aguinaldo_days.to_string(),
                "days_worked": days_worked.to_string(),
            }),
            output: serde_json::json!({ "gross": gross.to_string() }),
            reasoning: format!(
                "{} × {} days × {}/365 = {}",
                daily_salary, aguinaldo_days, days_worked, gross
            ),
        },
        AuditStep {
            step_number: step_number_start + 1,
            rule_id: "aguinaldo_exemption".to_string(),
            rule_name: "Aguinaldo Exemption".to_string(),
            legal_ref: "LISR art. 93 fr. XIV".to_string(),
            input: serde_json::json!({
                "gross": gross.to_string(),
                "ceiling": ceiling.to_string(),
                "available": split.available.map(|a| a.to_string()),
            }),
            output: serde_json::json!({
                "exempt": split.exempt.to_string(),
                "taxable": split.taxable.to_string(),
            }),
            reasoning: format!(
                "Exempt up to {} UMA-days ({}): {} exempt, {} taxable",
                fiscal.exemptions.aguinaldo_uma_days, ceiling, split.exempt, split.taxable
            ),
        },
    ];

    Ok(AguinaldoResult {
        days_worked,
        split,
        audit_steps,
    })
}
