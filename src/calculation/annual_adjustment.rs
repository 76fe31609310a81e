//! Annual ISR reconciliation (ajuste anual, LISR art. 97).
//!
//! The year's period-level history is summed and the annual tax recomputed
//! with the annual tariff. The difference against what was withheld
//! period by period is either withheld in addition or refunded.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fiscal::FiscalConfig;
use crate::fixed_point::Money;
use crate::models::{AuditStep, EmployeeProfile};

use super::isr::tariff_tax;

/// Employers may not reconcile employees whose annual income exceeds this.
pub const RECONCILIATION_INCOME_LIMIT: Money = Money::from_units(400_000);

/// One payroll period's tax facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRecord {
    /// Last day of the period.
    pub period_end: NaiveDate,
    /// Taxable income paid in the period.
    pub taxable_income: Money,
    /// Exempt income paid in the period.
    #[serde(default)]
    pub exempt_income: Money,
    /// ISR withheld in the period, net of subsidy.
    pub isr_withheld: Money,
}

/// Which way the difference goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentDirection {
    /// More tax was withheld than owed.
    Refund,
    /// Less tax was withheld than owed.
    AdditionalWithholding,
    /// Withholding matched the annual tax.
    Balanced,
}

/// The result of an annual reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualAdjustmentResult {
    /// The fiscal year.
    pub fiscal_year: i32,
    /// Number of period records.
    pub periods: usize,
    /// Sum of taxable income.
    pub total_taxable: Money,
    /// Sum of exempt income.
    pub total_exempt: Money,
    /// Sum of withheld ISR.
    pub total_withheld: Money,
    /// Tax on `total_taxable` with the annual tariff.
    pub annual_tax: Money,
    /// `annual_tax − total_withheld`: positive is owed, negative is refunded.
    pub delta: Money,
    /// Direction of the delta.
    pub direction: AdjustmentDirection,
    /// Whether the employer may carry out this reconciliation.
    pub eligible: bool,
    /// Why the employer may not, when ineligible.
    pub ineligibility_reasons: Vec<String>,
    /// The audit step recording the calculation.
    pub audit_step: AuditStep,
}

/// Reconciles a fiscal year's withholding.
///
/// `separation_date` is the last day of employment when the employee left
/// during the year. The computation is reported even when the employee is
/// not eligible for an employer reconciliation.
///
/// # Errors
///
/// * `InvalidInput` when a record's period ends outside the fiscal year
pub fn calculate_annual_adjustment(
    employee: &EmployeeProfile,
    separation_date: Option<NaiveDate>,
    records: &[PeriodRecord],
    fiscal: &FiscalConfig,
) -> EngineResult<AnnualAdjustmentResult> {
    let year = fiscal.year;
    if let Some(record) = records
        .iter()
        .find(|r| r.period_end.year() != year)
    {
        return Err(EngineError::invalid_input(
            "records",
            format!("period ending {} is outside fiscal year {}", record.period_end, year),
        ));
    }

    let total_taxable = Money::checked_sum(records.iter().map(|r| r.taxable_income))?;
    let total_exempt = Money::checked_sum(records.iter().map(|r| r.exempt_income))?;
    let total_withheld = Money::checked_sum(records.iter().map(|r| r.isr_withheld))?;

    let (_, tax) = tariff_tax(total_taxable, &fiscal.isr_annual, fiscal.rounding.intermediate)?;
    let annual_tax = tax.round_to_cent(fiscal.rounding.isr)?;
    let delta = annual_tax.checked_sub(total_withheld)?;
    let direction = if delta.is_positive() {
        AdjustmentDirection::AdditionalWithholding
    } else if delta.is_negative() {
        AdjustmentDirection::Refund
    } else {
        AdjustmentDirection::Balanced
    };

    let mut ineligibility_reasons = Vec::new();
    let total_income = total_taxable.checked_add(total_exempt)?;
    if total_income > RECONCILIATION_INCOME_LIMIT {
        ineligibility_reasons.push(format!(
            "annual income {} exceeds {}",
            total_income, RECONCILIATION_INCOME_LIMIT
        ));
    }
    let year_start = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| EngineError::invalid_input("fiscal_year", year.to_string()))?;
    if employee.hire_date > year_start {
        ineligibility_reasons.push(format!("hired on {}, after January 1", employee.hire_date));
    }
    let december_first = NaiveDate::from_ymd_opt(year, 12, 1)
        .ok_or_else(|| EngineError::invalid_input("fiscal_year", year.to_string()))?;
    if let Some(separation) = separation_date.filter(|d| *d < december_first) {
        ineligibility_reasons.push(format!("separated on {}, before December 1", separation));
    }
    let eligible = ineligibility_reasons.is_empty();

    if !eligible {
        tracing::info!(
            employee_id = %employee.id,
            fiscal_year = year,
            reasons = ?ineligibility_reasons,
            "employee not eligible for employer annual reconciliation"
        );
    }

    let audit_step = AuditStep {
        step_number: 1,
        rule_id: "annual_adjustment".to_string(),
        rule_name: "Annual ISR Reconciliation".to_string(),
        legal_ref: "LISR arts. 97, 152".to_string(),
        input: serde_json::json!({
            "periods": records.len(),
            "total_taxable": total_taxable.to_string(),
            "total_withheld": total_withheld.to_string(),
            "table": fiscal.isr_annual.name(),
        }),
        output: serde_json::json!({
            "annual_tax": annual_tax.to_string(),
            "delta": delta.to_string(),
            "direction": direction,
            "eligible": eligible,
        }),
        reasoning: format!(
            "Annual tax {} - withheld {} = {}",
            annual_tax, total_withheld, delta
        ),
    };

    Ok(AnnualAdjustmentResult {
        fiscal_year: year,
        periods: records.len(),
        total_taxable,
        total_exempt,
        total_withheld,
        annual_tax,
        delta,
        direction,
        eligible,
        ineligibility_reasons,
        audit_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{employee, fiscal_2026};
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn month_end(month: u32) -> NaiveDate {
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(2027, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(2026, month + 1, 1)
        };
        next.unwrap().pred_opt().unwrap()
    }

    fn record(month: u32, taxable: &str, withheld: &str) -> PeriodRecord {
        PeriodRecord {
            period_end: month_end(month),
            taxable_income: money(taxable),
            exempt_income: Money::ZERO,
            isr_withheld: money(withheld),
        }
    }

    fn veteran() -> EmployeeProfile {
        employee(money("500"), NaiveDate::from_ymd_opt(2020, 3, 1).unwrap())
    }

    #[test]
    fn test_steady_income_balances() {
        let fiscal = fiscal_2026();
        let records: Vec<_> = (1..=12).map(|m| record(m, "15000", "1402.82")).collect();
        let result = calculate_annual_adjustment(&veteran(), None, &records, &fiscal).unwrap();

        assert_eq!(result.total_taxable, money("180000"));
        assert_eq!(result.annual_tax, money("16833.84"));
        assert_eq!(result.delta, Money::ZERO);
        assert_eq!(result.direction, AdjustmentDirection::Balanced);
        assert!(result.eligible);
    }

    #[test]
    fn test_uneven_income_owes_more() {
        let fiscal = fiscal_2026();
        let records: Vec<_> = (1..=12)
            .map(|m| {
                if m <= 6 {
                    record(m, "10000", "193.37")
                } else {
                    record(m, "20000", "2383.65")
                }
            })
            .collect();
        let result = calculate_annual_adjustment(&veteran(), None, &records, &fiscal).unwrap();

        assert_eq!(result.total_withheld, money("15462.12"));
        assert_eq!(result.delta, money("1371.72"));
        assert_eq!(result.direction, AdjustmentDirection::AdditionalWithholding);
    }

    #[test]
    fn test_over_withholding_is_refunded() {
        let fiscal = fiscal_2026();
        let records: Vec<_> = (1..=12).map(|m| record(m, "15000", "1500")).collect();
        let result = calculate_annual_adjustment(&veteran(), None, &records, &fiscal).unwrap();
        assert_eq!(result.delta, money("-1166.16"));
        assert_eq!(result.direction, AdjustmentDirection::Refund);
    }

    #[test]
    fn test_ineligibility_reasons() {
        let fiscal = fiscal_2026();
        let late_hire = employee(money("2000"), NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        let records: Vec<_> = (2..=10).map(|m| record(m, "60000", "12000")).collect();
        let result = calculate_annual_adjustment(
            &late_hire,
            NaiveDate::from_ymd_opt(2026, 10, 31),
            &records,
            &fiscal,
        )
        .unwrap();

        assert!(!result.eligible);
        assert_eq!(result.ineligibility_reasons.len(), 3);
        // The computation is still reported.
        assert!(result.annual_tax.is_positive());
    }

    #[test]
    fn test_record_outside_year_rejected() {
        let fiscal = fiscal_2026();
        let mut records = vec![record(1, "15000", "1402.82")];
        records[0].period_end = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        assert!(matches!(
            calculate_annual_adjustment(&veteran(), None, &records, &fiscal),
            Err(EngineError::InvalidInput { .. })
        ));
    }
}
