//! ISR on extraordinary income: bonuses, PTU and separation payments.
//!
//! Extraordinary payments are not added to the period's ordinary income.
//! Instead an effective rate is derived from the employee's ordinary monthly
//! income and applied to the taxable part of the payment.
//!
//! ## Bonus and PTU (RLISR art. 174)
//!
//! 1. `proportion = taxable / 365 × 30.4`
//! 2. `rate = (ISR(ordinary + proportion) − ISR(ordinary)) / proportion`
//! 3. `tax = taxable × rate`
//!
//! ## Separation payments (LISR art. 96)
//!
//! When the taxable payment does not exceed the last ordinary monthly
//! salary it is taxed together with that salary. Otherwise
//! `rate = ISR(salary) / salary` is applied to the whole taxable payment.
//!
//! ISR here is the tariff tax before the employment subsidy.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fiscal::{FiscalConfig, CALENDAR_DAYS_PER_YEAR, DAYS_PER_FISCAL_MONTH};
use crate::fixed_point::{Money, Rate};
use crate::models::AuditStep;

use super::isr::tariff_tax;

/// How the rate of an extraordinary payment was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtraordinaryMethod {
    /// Monthly proportion of an annual bonus.
    Bonus,
    /// Monthly proportion of a PTU payment.
    Ptu,
    /// Separation payment no larger than the last salary, taxed with it.
    SeveranceWithSalary,
    /// Separation payment taxed at the last salary's effective rate.
    SeveranceEffectiveRate,
}

/// The result of an extraordinary ISR calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraordinaryIsrResult {
    /// The method used.
    pub method: ExtraordinaryMethod,
    /// Taxable part of the payment.
    pub taxable: Money,
    /// Ordinary monthly income used as context.
    pub ordinary_income: Money,
    /// Tariff tax on the ordinary income alone.
    pub ordinary_tax: Money,
    /// The applied rate.
    pub rate: Rate,
    /// Tax withheld on the payment, rounded to the cent.
    pub tax: Money,
    /// The audit step recording the calculation.
    pub audit_step: AuditStep,
}

/// ISR on the taxable part of an aguinaldo or other annual bonus.
///
/// # Example
///
/// ```
/// use nomina_engine::calculation::tax_on_bonus;
/// use nomina_engine::config::ConfigLoader;
/// use nomina_engine::fixed_point::Money;
///
/// let loader = ConfigLoader::load("config/mx").unwrap();
/// let fiscal = loader.fiscal_year(2026).unwrap();
/// let result = tax_on_bonus(Money::ZERO, Money::from_units(15_000), fiscal, 1).unwrap();
/// assert_eq!(result.tax, Money::ZERO);
/// ```
pub fn tax_on_bonus(
    taxable: Money,
    ordinary_monthly_income: Money,
    fiscal: &FiscalConfig,
    step_number: u32,
) -> EngineResult<ExtraordinaryIsrResult> {
    proportional_tax(
        ExtraordinaryMethod::Bonus,
        taxable,
        ordinary_monthly_income,
        fiscal,
        step_number,
    )
}

/// ISR on the taxable part of a PTU payment.
pub fn tax_on_ptu(
    taxable: Money,
    ordinary_monthly_income: Money,
    fiscal: &FiscalConfig,
    step_number: u32,
) -> EngineResult<ExtraordinaryIsrResult> {
    proportional_tax(
        ExtraordinaryMethod::Ptu,
        taxable,
        ordinary_monthly_income,
        fiscal,
        step_number,
    )
}

fn proportional_tax(
    method: ExtraordinaryMethod,
    taxable: Money,
    ordinary_income: Money,
    fiscal: &FiscalConfig,
    step_number: u32,
) -> EngineResult<ExtraordinaryIsrResult> {
    let mode = fiscal.rounding.intermediate;
    let table = &fiscal.isr_monthly;
    let (_, ordinary_tax) = tariff_tax(ordinary_income, table, mode)?;

    let proportion = if taxable.is_positive() {
        taxable.scale(DAYS_PER_FISCAL_MONTH, CALENDAR_DAYS_PER_YEAR, mode)?
    } else {
        Money::ZERO
    };
    // A sub-cent payment has no monthly proportion to derive a rate from.
    if !proportion.is_positive() {
        return Ok(ExtraordinaryIsrResult {
            method,
            taxable,
            ordinary_income,
            ordinary_tax,
            rate: Rate::ZERO,
            tax: Money::ZERO,
            audit_step: zero_step(method, taxable, step_number),
        });
    }
    let (_, combined_tax) = tariff_tax(ordinary_income.checked_add(proportion)?, table, mode)?;
    let difference = combined_tax.checked_sub(ordinary_tax)?;
    let rate = difference.ratio(proportion, mode)?;
    let tax = taxable
        .apply_rate(rate, mode)?
        .round_to_cent(fiscal.rounding.isr)?;

    let audit_step = AuditStep {
        step_number,
        rule_id: format!("isr_{}", method_id(method)),
        rule_name: format!("ISR on {}", method_name(method)),
        legal_ref: "RLISR art. 174".to_string(),
        input: serde_json::json!({
            "taxable": taxable.to_string(),
            "ordinary_income": ordinary_income.to_string(),
            "table": table.name(),
        }),
        output: serde_json::json!({
            "monthly_proportion": proportion.to_string(),
            "ordinary_tax": ordinary_tax.to_string(),
            "combined_tax": combined_tax.to_string(),
            "rate": rate.to_string(),
            "tax": tax.to_string(),
        }),
        reasoning: format!(
            "({} - {}) / {} = {}%; {} × {}% = {}",
            combined_tax, ordinary_tax, proportion, rate, taxable, rate, tax
        ),
    };

    Ok(ExtraordinaryIsrResult {
        method,
        taxable,
        ordinary_income,
        ordinary_tax,
        rate,
        tax,
        audit_step,
    })
}

/// ISR on the taxable part of a separation payment (indemnities and
/// seniority premium), given the last ordinary monthly salary.
///
/// # Errors
///
/// * `InvalidInput` when the payment is taxable but the last salary is not
///   positive
pub fn tax_on_severance(
    taxable: Money,
    last_monthly_salary: Money,
    fiscal: &FiscalConfig,
    step_number: u32,
) -> EngineResult<ExtraordinaryIsrResult> {
    let mode = fiscal.rounding.intermediate;
    let table = &fiscal.isr_monthly;

    if !taxable.is_positive() {
        let method = ExtraordinaryMethod::SeveranceEffectiveRate;
        return Ok(ExtraordinaryIsrResult {
            method,
            taxable,
            ordinary_income: last_monthly_salary,
            ordinary_tax: Money::ZERO,
            rate: Rate::ZERO,
            tax: Money::ZERO,
            audit_step: zero_step(method, taxable, step_number),
        });
    }
    if !last_monthly_salary.is_positive() {
        return Err(EngineError::invalid_input(
            "last_monthly_salary",
            format!("must be positive to tax a separation payment, got {}", last_monthly_salary),
        ));
    }

    let (_, ordinary_tax) = tariff_tax(last_monthly_salary, table, mode)?;

    let (method, rate, unrounded) = if taxable <= last_monthly_salary {
        let combined = last_monthly_salary.checked_add(taxable)?;
        let (_, combined_tax) = tariff_tax(combined, table, mode)?;
        let difference = combined_tax.checked_sub(ordinary_tax)?;
        (
            ExtraordinaryMethod::SeveranceWithSalary,
            difference.ratio(taxable, mode)?,
            difference,
        )
    } else {
        let rate = ordinary_tax.ratio(last_monthly_salary, mode)?;
        (
            ExtraordinaryMethod::SeveranceEffectiveRate,
            rate,
            taxable.apply_rate(rate, mode)?,
        )
    };
    let tax = unrounded.round_to_cent(fiscal.rounding.isr)?;

    let audit_step = AuditStep {
        step_number,
        rule_id: format!("isr_{}", method_id(method)),
        rule_name: format!("ISR on {}", method_name(method)),
        legal_ref: "LISR art. 96".to_string(),
        input: serde_json::json!({
            "taxable": taxable.to_string(),
            "last_monthly_salary": last_monthly_salary.to_string(),
            "table": table.name(),
        }),
        output: serde_json::json!({
            "ordinary_tax": ordinary_tax.to_string(),
            "rate": rate.to_string(),
            "tax": tax.to_string(),
        }),
        reasoning: match method {
            ExtraordinaryMethod::SeveranceWithSalary => format!(
                "Payment {} does not exceed the last salary {}; taxed with it: {}",
                taxable, last_monthly_salary, tax
            ),
            _ => format!(
                "{} / {} = {}%; {} × {}% = {}",
                ordinary_tax, last_monthly_salary, rate, taxable, rate, tax
            ),
        },
    };

    Ok(ExtraordinaryIsrResult {
        method,
        taxable,
        ordinary_income: last_monthly_salary,
        ordinary_tax,
        rate,
        tax,
        audit_step,
    })
}

fn method_id(method: ExtraordinaryMethod) -> &'static str {
    match method {
        ExtraordinaryMethod::Bonus => "bonus",
        ExtraordinaryMethod::Ptu => "ptu",
        ExtraordinaryMethod::SeveranceWithSalary => "severance_with_salary",
        ExtraordinaryMethod::SeveranceEffectiveRate => "severance_effective_rate",
    }
}

fn method_name(method: ExtraordinaryMethod) -> &'static str {
    match method {
        ExtraordinaryMethod::Bonus => "Annual Bonus",
        ExtraordinaryMethod::Ptu => "Profit Sharing",
        ExtraordinaryMethod::SeveranceWithSalary
        | ExtraordinaryMethod::SeveranceEffectiveRate => "Separation Payment",
    }
}

fn zero_step(method: ExtraordinaryMethod, taxable: Money, step_number: u32) -> AuditStep {
    AuditStep {
        step_number,
        rule_id: format!("isr_{}", method_id(method)),
        rule_name: format!("ISR on {}", method_name(method)),
        legal_ref: "LISR art. 96".to_string(),
        input: serde_json::json!({ "taxable": taxable.to_string() }),
        output: serde_json::json!({ "tax": Money::ZERO.to_string() }),
        reasoning: "Nothing taxable, no tax withheld".to_string(),
    }
}
