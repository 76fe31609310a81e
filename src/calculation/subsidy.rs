//! Employment subsidy lookup.

use crate::error::EngineResult;
use crate::fiscal::SubsidyTable;
use crate::fixed_point::Money;
use crate::models::AuditStep;

/// The result of a subsidy lookup, including the audit step.
#[derive(Debug, Clone)]
pub struct SubsidyResult {
    /// Subsidy the income is entitled to.
    pub amount: Money,
    /// The audit step recording this lookup.
    pub audit_step: AuditStep,
}

/// Looks up the employment subsidy for a period's income.
///
/// The table is chosen by the caller from its fiscal year's configuration,
/// so subsidies of different years are never conflated. Income at or below
/// zero, or below the table's first row, is entitled to nothing.
pub fn employment_subsidy(
    income: Money,
    table: &SubsidyTable,
    step_number: u32,
) -> EngineResult<SubsidyResult> {
    let covered = table.rows().first().is_some_and(|first| income >= first.lower);
    let amount = if income.is_positive() && covered {
        table.lookup(income)?.subsidy_amount
    } else {
        Money::ZERO
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "employment_subsidy".to_string(),
        rule_name: "Employment Subsidy Lookup".to_string(),
        legal_ref: "Decreto subsidio para el empleo".to_string(),
        input: serde_json::json!({
            "income": income.to_string(),
            "table": table.name(),
        }),
        output: serde_json::json!({ "subsidy": amount.to_string() }),
        reasoning: format!("Income {} is entitled to a subsidy of {}", income, amount),
    };

    Ok(SubsidyResult { amount, audit_step })
}
