//! Integrated daily wage (SDI) and contribution base wage (SBC).
//!
//! The SDI adds to the daily salary the daily equivalent of every annual
//! fringe benefit (LSS art. 27). Annual amounts are spread over 365.25
//! days. The SBC is the SDI limited to the legal ceiling of
//! `UMA_daily × cap multiple` (LSS art. 28).

use crate::error::EngineResult;
use crate::fiscal::{FiscalConfig, RoundingPolicy, SDI_DAYS_PER_YEAR};
use crate::fixed_point::{Money, Quantity};
use crate::models::{AuditStep, WageFacts};

/// The result of an SDI calculation, including the audit step.
#[derive(Debug, Clone)]
pub struct SdiResult {
    /// The daily salary.
    pub daily_salary: Money,
    /// Daily equivalent of the annual aguinaldo.
    pub aguinaldo_daily: Money,
    /// Daily equivalent of the annual prima vacacional.
    pub vacation_premium_daily: Money,
    /// Daily equivalent of other annual benefits.
    pub other_benefits_daily: Money,
    /// The integrated daily wage.
    pub sdi: Money,
    /// `sdi / daily_salary`, for audit.
    pub integration_factor: Quantity,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates the SDI from wage facts.
///
/// When the wage facts carry an explicit integration factor,
/// `SDI = daily_salary × factor`. Otherwise
/// `SDI = daily_salary + (aguinaldo + prima vacacional + other benefits) / 365.25`,
/// where aguinaldo is `daily_salary × aguinaldo_days` and the prima is
/// `daily_salary × vacation_days × vacation_premium_rate`.
///
/// # Example
///
/// ```
/// use nomina_engine::calculation::calculate_sdi;
/// use nomina_engine::fiscal::RoundingPolicy;
/// use nomina_engine::fixed_point::Money;
/// use nomina_engine::models::WageFacts;
///
/// let facts = WageFacts::statutory_minimum(Money::from_units(500));
/// let result = calculate_sdi(&facts, &RoundingPolicy::default(), 1).unwrap();
/// assert_eq!(result.sdi.to_string(), "524.6407");
/// ```
pub fn calculate_sdi(
    wage: &WageFacts,
    rounding: &RoundingPolicy,
    step_number: u32,
) -> EngineResult<SdiResult> {
    let mode = rounding.intermediate;
    let salary = wage.daily_salary;

    if let Some(factor) = wage.integration_factor {
        let sdi = salary.times(factor, mode)?;
        let audit_step = AuditStep {
            step_number,
            rule_id: "sdi_explicit_factor".to_string(),
            rule_name: "SDI from Integration Factor".to_string(),
            legal_ref: "LSS art. 27".to_string(),
            input: serde_json::json!({
                "daily_salary": salary.to_string(),
                "integration_factor": factor.to_string(),
            }),
            output: serde_json::json!({ "sdi": sdi.to_string() }),
            reasoning: format!("{} × {} = {}", salary, factor, sdi),
        };
        return Ok(SdiResult {
            daily_salary: salary,
            aguinaldo_daily: Money::ZERO,
            vacation_premium_daily: Money::ZERO,
            other_benefits_daily: Money::ZERO,
            sdi,
            integration_factor: factor,
            audit_step,
        });
    }

    let aguinaldo_annual = salary.times(wage.aguinaldo_days, mode)?;
    let vacation_premium_annual = salary
        .times(wage.vacation_days, mode)?
        .apply_rate(wage.vacation_premium_rate, mode)?;

    let aguinaldo_daily = aguinaldo_annual.div_quantity(SDI_DAYS_PER_YEAR, mode)?;
    let vacation_premium_daily = vacation_premium_annual.div_quantity(SDI_DAYS_PER_YEAR, mode)?;
    let other_benefits_daily = wage
        .other_annual_benefits
        .div_quantity(SDI_DAYS_PER_YEAR, mode)?;

    let sdi = Money::checked_sum([
        salary,
        aguinaldo_daily,
        vacation_premium_daily,
        other_benefits_daily,
    ])?;
    let integration_factor = if salary.is_positive() {
        sdi.quotient(salary, mode)?
    } else {
        Quantity::ONE
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "sdi_integration".to_string(),
        rule_name: "Integrated Daily Wage".to_string(),
        legal_ref: "LSS art. 27".to_string(),
        input: serde_json::json!({
            "daily_salary": salary.to_string(),
            "aguinaldo_days": wage.aguinaldo_days.to_string(),
            "vacation_days": wage.vacation_days.to_string(),
            "vacation_premium_rate": wage.vacation_premium_rate.to_string(),
            "other_annual_benefits": wage.other_annual_benefits.to_string(),
        }),
        output: serde_json::json!({
            "aguinaldo_daily": aguinaldo_daily.to_string(),
            "vacation_premium_daily": vacation_premium_daily.to_string(),
            "other_benefits_daily": other_benefits_daily.to_string(),
            "sdi": sdi.to_string(),
            "integration_factor": integration_factor.to_string(),
        }),
        reasoning: format!(
            "{} + ({} + {} + {}) / {} = {}",
            salary,
            aguinaldo_annual,
            vacation_premium_annual,
            wage.other_annual_benefits,
            SDI_DAYS_PER_YEAR,
            sdi
        ),
    };

    Ok(SdiResult {
        daily_salary: salary,
        aguinaldo_daily,
        vacation_premium_daily,
        other_benefits_daily,
        sdi,
        integration_factor,
        audit_step,
    })
}

/// The result of an SBC calculation, including the audit step.
#[derive(Debug, Clone)]
pub struct SbcResult {
    /// The SDI the SBC was derived from.
    pub sdi: Money,
    /// The legal ceiling.
    pub cap: Money,
    /// `min(sdi, cap)`.
    pub sbc: Money,
    /// Whether the ceiling was applied.
    pub capped: bool,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates the SBC: `min(SDI, UMA_daily × sbc_cap_in_uma_multiples)`.
pub fn calculate_sbc(
    sdi: Money,
    fiscal: &FiscalConfig,
    step_number: u32,
) -> EngineResult<SbcResult> {
    let cap = fiscal.sbc_cap_daily()?;
    let sbc = sdi.min(cap);
    let capped = sdi > cap;

    let audit_step = AuditStep {
        step_number,
        rule_id: "sbc_cap".to_string(),
        rule_name: "Contribution Base Wage".to_string(),
        legal_ref: "LSS art. 28".to_string(),
        input: serde_json::json!({
            "sdi": sdi.to_string(),
            "uma_daily": fiscal.uma_daily.to_string(),
            "cap_multiple": fiscal.sbc_cap_in_uma_multiples.to_string(),
        }),
        output: serde_json::json!({
            "cap": cap.to_string(),
            "sbc": sbc.to_string(),
            "capped": capped,
        }),
        reasoning: if capped {
            format!("SDI {} exceeds the ceiling {}; SBC = {}", sdi, cap, sbc)
        } else {
            format!("SDI {} is within the ceiling {}", sdi, cap)
        },
    };

    Ok(SbcResult {
        sdi,
        cap,
        sbc,
        capped,
        audit_step,
    })
}
