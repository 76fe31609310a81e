//! ISR withholding on ordinary income.
//!
//! This module applies the progressive tariff of LISR art. 96 to a period's
//! taxable income and credits the employment subsidy against the result.

use crate::error::EngineResult;
use crate::fiscal::{IsrBracket, IsrTable, RoundingPolicy, SubsidyTable};
use crate::fixed_point::{Money, Rate, RoundingMode};
use crate::models::AuditStep;

/// The legal reference for the ordinary ISR tariff.
pub const ISR_TARIFF_REF: &str = "LISR art. 96";

/// The result of an ISR calculation, including the audit steps.
#[derive(Debug, Clone)]
pub struct IsrResult {
    /// Taxable income for the period.
    pub income: Money,
    /// Lower bound of the matched row.
    pub lower_bound: Money,
    /// `income - lower_bound`.
    pub excess: Money,
    /// Marginal rate of the matched row.
    pub marginal_rate: Rate,
    /// `excess × marginal_rate`.
    pub marginal_tax: Money,
    /// Fixed quota of the matched row.
    pub fixed_quota: Money,
    /// `fixed_quota + marginal_tax`, unrounded.
    pub tax_before_subsidy: Money,
    /// Subsidy the income is entitled to.
    pub subsidy_entitled: Money,
    /// Portion of the subsidy that reduced the tax.
    pub subsidy_applied: Money,
    /// Withheld ISR, rounded to the cent.
    pub final_tax: Money,
    /// `final_tax / income`; zero at zero income.
    pub effective_rate: Rate,
    /// The audit steps recording the calculation.
    pub audit_steps: Vec<AuditStep>,
}

impl IsrResult {
    /// No tax: the income is not positive or falls below the tariff's
    /// first row.
    fn untaxed(income: Money, reasoning: &str) -> Self {
        Self {
            income,
            lower_bound: Money::ZERO,
            excess: Money::ZERO,
            marginal_rate: Rate::ZERO,
            marginal_tax: Money::ZERO,
            fixed_quota: Money::ZERO,
            tax_before_subsidy: Money::ZERO,
            subsidy_entitled: Money::ZERO,
            subsidy_applied: Money::ZERO,
            final_tax: Money::ZERO,
            effective_rate: Rate::ZERO,
            audit_steps: vec![AuditStep {
                step_number: 1,
                rule_id: "isr_untaxed_income".to_string(),
                rule_name: "ISR on Untaxed Income".to_string(),
                legal_ref: ISR_TARIFF_REF.to_string(),
                input: serde_json::json!({ "income": income.to_string() }),
                output: serde_json::json!({ "final_tax": Money::ZERO.to_string() }),
                reasoning: reasoning.to_string(),
            }],
        }
    }
}

/// Tariff tax before any subsidy, at full four-decimal precision.
///
/// Returns the matched row with the tax. Income at or below zero, or below
/// the first row's lower bound, yields zero without a row.
pub fn tariff_tax<'a>(
    income: Money,
    table: &'a IsrTable,
    mode: RoundingMode,
) -> EngineResult<(Option<&'a IsrBracket>, Money)> {
    let below_first_row = table.rows().first().is_none_or(|first| income < first.lower);
    if !income.is_positive() || below_first_row {
        return Ok((None, Money::ZERO));
    }
    let row = table.lookup(income)?;
    let excess = income.checked_sub(row.lower)?;
    let marginal_tax = excess.apply_rate(row.marginal_rate, mode)?;
    let tax = row.fixed_quota.checked_add(marginal_tax)?;
    Ok((Some(row), tax))
}

/// Calculates the ISR withheld on a period's taxable income.
///
/// The algorithm finds the tariff row containing the income, applies the
/// marginal rate to the excess over its lower bound and adds the fixed
/// quota. When a subsidy table is given, the subsidy for the same income is
/// credited against the tax, never below zero:
/// `final = max(0, tax_before_subsidy - subsidy)`.
///
/// The withheld amount is rounded to the cent once, with the policy's ISR
/// mode; every intermediate value keeps four decimals.
///
/// # Arguments
///
/// * `income` - Taxable income for the period
/// * `isr_table` - The ISR tariff scaled to the period
/// * `subsidy_table` - The subsidy table scaled to the period, if the
///   employee is entitled to the subsidy
/// * `rounding` - The fiscal year's rounding policy
///
/// # Errors
///
/// * `ArithmeticOverflow` on overflow
///
/// # Example
///
/// ```
/// use nomina_engine::calculation::calculate_isr;
/// use nomina_engine::fiscal::{BracketTable, IsrBracket, RoundingPolicy};
/// use nomina_engine::fixed_point::{Money, Rate};
///
/// let table = BracketTable::new(
///     "isr_sample",
///     vec![
///         IsrBracket {
///             lower: Money::from_bp(100),
///             upper: Some(Money::from_units(1_000)),
///             fixed_quota: Money::ZERO,
///             marginal_rate: Rate::from_bp(192),
///         },
///         IsrBracket {
///             lower: Money::from_bp(10_000_100),
///             upper: None,
///             fixed_quota: Money::from_bp(192_000),
///             marginal_rate: Rate::from_bp(640),
///         },
///     ],
/// )
/// .unwrap();
///
/// let result = calculate_isr(Money::from_units(500), &table, None, &RoundingPolicy::default()).unwrap();
/// // (500.00 - 0.01) × 1.92 % = 9.5998 → 9.60
/// assert_eq!(result.final_tax, Money::from_bp(96_000));
/// ```
pub fn calculate_isr(
    income: Money,
    isr_table: &IsrTable,
    subsidy_table: Option<&SubsidyTable>,
    rounding: &RoundingPolicy,
) -> EngineResult<IsrResult> {
    if !income.is_positive() {
        return Ok(IsrResult::untaxed(income, "No taxable income, no tax withheld"));
    }
    let (row, tax_before_subsidy) = tariff_tax(income, isr_table, rounding.intermediate)?;
    let Some(row) = row else {
        return Ok(IsrResult::untaxed(
            income,
            "Income below the tariff's first row, no tax withheld",
        ));
    };
    let excess = income.checked_sub(row.lower)?;
    let marginal_tax = tax_before_subsidy.checked_sub(row.fixed_quota)?;

    let mut audit_steps = vec![AuditStep {
        step_number: 1,
        rule_id: "isr_tariff".to_string(),
        rule_name: "ISR Tariff".to_string(),
        legal_ref: ISR_TARIFF_REF.to_string(),
        input: serde_json::json!({
            "income": income.to_string(),
            "table": isr_table.name(),
        }),
        output: serde_json::json!({
            "lower_bound": row.lower.to_string(),
            "excess": excess.to_string(),
            "marginal_rate": row.marginal_rate.to_string(),
            "marginal_tax": marginal_tax.to_string(),
            "fixed_quota": row.fixed_quota.to_string(),
            "tax_before_subsidy": tax_before_subsidy.to_string(),
        }),
        reasoning: format!(
            "({} - {}) × {}% + {} = {}",
            income, row.lower, row.marginal_rate, row.fixed_quota, tax_before_subsidy
        ),
    }];

    let subsidy_entitled = match subsidy_table {
        Some(table) => table.lookup(income)?.subsidy_amount,
        None => Money::ZERO,
    };
    let subsidy_applied = subsidy_entitled.min(tax_before_subsidy);
    let final_tax = tax_before_subsidy
        .checked_sub(subsidy_applied)?
        .non_negative()
        .round_to_cent(rounding.isr)?;
    let effective_rate = final_tax.ratio(income, rounding.intermediate)?;

    audit_steps.push(AuditStep {
        step_number: 2,
        rule_id: "isr_subsidy_credit".to_string(),
        rule_name: "Employment Subsidy Credit".to_string(),
        legal_ref: "Decreto subsidio para el empleo".to_string(),
        input: serde_json::json!({
            "tax_before_subsidy": tax_before_subsidy.to_string(),
            "subsidy_table": subsidy_table.map(|t| t.name()),
        }),
        output: serde_json::json!({
            "subsidy_entitled": subsidy_entitled.to_string(),
            "subsidy_applied": subsidy_applied.to_string(),
            "final_tax": final_tax.to_string(),
            "effective_rate": effective_rate.to_string(),
        }),
        reasoning: format!(
            "max(0, {} - {}) rounded to the cent = {}",
            tax_before_subsidy, subsidy_applied, final_tax
        ),
    });

    Ok(IsrResult {
        income,
        lower_bound: row.lower,
        excess,
        marginal_rate: row.marginal_rate,
        marginal_tax,
        fixed_quota: row.fixed_quota,
        tax_before_subsidy,
        subsidy_entitled,
        subsidy_applied,
        final_tax,
        effective_rate,
        audit_steps,
    })
}
