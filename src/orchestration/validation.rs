//! Validation rules run before and after a payroll is calculated.
//!
//! Errors block the run; warnings travel with the result.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::fiscal::FiscalConfig;
use crate::fixed_point::Quantity;
use crate::models::{ContractType, IncidentKind, PayrollResult, Periodicity, ValidationResult};

use super::concept::ConceptKind;
use super::run::PayrollInput;

/// When a rule runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationStage {
    /// Before any concept is calculated.
    PreCalculation,
    /// After every concept is calculated.
    PostCalculation,
}

/// What a rule can inspect.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// The run's input.
    pub input: &'a PayrollInput,
    /// The period's fiscal year.
    pub fiscal: &'a FiscalConfig,
    /// Codes of the planned concepts.
    pub concepts: &'a [String],
    /// The calculated payroll; only present after calculation.
    pub result: Option<&'a PayrollResult>,
}

impl ValidationContext<'_> {
    fn plans(&self, kind: ConceptKind) -> bool {
        self.concepts.iter().any(|code| code == kind.code())
    }
}

/// A validation rule.
pub trait ValidationRule: Send + Sync {
    /// Rule identifier, reported with each finding.
    fn id(&self) -> &str;

    /// When the rule runs.
    fn stage(&self) -> ValidationStage;

    /// Records findings for `ctx`.
    fn check(&self, ctx: &ValidationContext<'_>, findings: &mut ValidationResult);
}

/// Runs every rule of `stage`.
pub fn run_rules(
    rules: &[Arc<dyn ValidationRule>],
    stage: ValidationStage,
    ctx: &ValidationContext<'_>,
) -> ValidationResult {
    let mut findings = ValidationResult::default();
    for rule in rules.iter().filter(|rule| rule.stage() == stage) {
        rule.check(ctx, &mut findings);
    }
    if !findings.errors.is_empty() || !findings.warnings.is_empty() {
        tracing::debug!(
            employee_id = %ctx.input.employee.id,
            stage = ?stage,
            errors = findings.errors.len(),
            warnings = findings.warnings.len(),
            "validation findings"
        );
    }
    findings
}

/// The built-in rules.
pub fn default_rules() -> Vec<Arc<dyn ValidationRule>> {
    vec![
        Arc::new(PeriodSanity),
        Arc::new(IncidentsWithinPeriod),
        Arc::new(NonNegativeSalary),
        Arc::new(MinimumWage),
        Arc::new(ReportedSbcCap),
        Arc::new(SbcBelowMinimumWage),
        Arc::new(RequiredConcepts),
        Arc::new(ImssForbiddenForAssimilated),
        Arc::new(NegativeNetPay),
    ]
}

/// The period is well formed, of plausible length, in the loaded fiscal
/// year, and the employee was hired by its end.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodSanity;

impl ValidationRule for PeriodSanity {
    fn id(&self) -> &str {
        "period_sanity"
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PreCalculation
    }

    fn check(&self, ctx: &ValidationContext<'_>, findings: &mut ValidationResult) {
        let period = &ctx.input.period;
        if let Err(err) = period.validate() {
            findings.error(self.id(), "INVALID_PERIOD", err.to_string());
            return;
        }
        if period.fiscal_year() != ctx.fiscal.year {
            findings.error(
                self.id(),
                "FISCAL_YEAR_MISMATCH",
                format!(
                    "period ends in {} but fiscal configuration is for {}",
                    period.fiscal_year(),
                    ctx.fiscal.year
                ),
            );
        }
        let (min_days, max_days) = match period.periodicity {
            Periodicity::Daily => (1, 1),
            Periodicity::Weekly => (7, 7),
            Periodicity::TenDay => (10, 10),
            Periodicity::Biweekly => (13, 16),
            Periodicity::Monthly => (28, 31),
        };
        let calendar_days = period.calendar_days();
        if calendar_days < min_days || calendar_days > max_days {
            findings.warning(
                self.id(),
                "PERIOD_LENGTH_MISMATCH",
                format!(
                    "{:?} period spans {} calendar days",
                    period.periodicity, calendar_days
                ),
            );
        }
        if ctx.input.employee.hire_date > period.end {
            findings.error(
                self.id(),
                "NOT_YET_HIRED",
                format!(
                    "hired on {}, after the period ends on {}",
                    ctx.input.employee.hire_date, period.end
                ),
            );
        }
    }
}

/// Every incident falls inside the period and carries a non-negative
/// quantity. Carried overtime weeks are unique and non-negative.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncidentsWithinPeriod;

impl ValidationRule for IncidentsWithinPeriod {
    fn id(&self) -> &str {
        "incidents_within_period"
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PreCalculation
    }

    fn check(&self, ctx: &ValidationContext<'_>, findings: &mut ValidationResult) {
        for incident in &ctx.input.incidents {
            if !ctx.input.period.contains(incident.date) {
                findings.error(
                    self.id(),
                    "INCIDENT_OUTSIDE_PERIOD",
                    format!("incident {} on {} is outside the period", incident.id, incident.date),
                );
            }
            let quantity = match incident.kind {
                IncidentKind::Overtime { hours } => hours,
                IncidentKind::Absence { days }
                | IncidentKind::Leave { days, .. }
                | IncidentKind::Disability { days } => days,
            };
            if quantity < Quantity::ZERO {
                findings.error(
                    self.id(),
                    "NEGATIVE_INCIDENT",
                    format!("incident {} has negative quantity {}", incident.id, quantity),
                );
            }
        }

        let mut weeks = BTreeSet::new();
        for carried in &ctx.input.overtime_week_to_date {
            if !weeks.insert(carried.week()) {
                findings.error(
                    self.id(),
                    "DUPLICATE_OVERTIME_WEEK",
                    format!(
                        "week {}-W{:02} is carried more than once",
                        carried.iso_year, carried.iso_week
                    ),
                );
            }
            if carried.hours < Quantity::ZERO || carried.exempt.is_negative() {
                findings.error(
                    self.id(),
                    "NEGATIVE_OVERTIME_WEEK",
                    format!(
                        "week {}-W{:02} carries {} hours and {} exempt",
                        carried.iso_year, carried.iso_week, carried.hours, carried.exempt
                    ),
                );
            }
        }
    }
}

/// The daily salary is not negative.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonNegativeSalary;

impl ValidationRule for NonNegativeSalary {
    fn id(&self) -> &str {
        "non_negative_salary"
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PreCalculation
    }

    fn check(&self, ctx: &ValidationContext<'_>, findings: &mut ValidationResult) {
        let salary = ctx.input.employee.wage.daily_salary;
        if salary.is_negative() {
            findings.error(
                self.id(),
                "NEGATIVE_SALARY",
                format!("daily salary {} is negative", salary),
            );
        }
    }
}

/// Warns when a salaried worker earns less than the minimum wage.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinimumWage;

impl ValidationRule for MinimumWage {
    fn id(&self) -> &str {
        "minimum_wage"
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PreCalculation
    }

    fn check(&self, ctx: &ValidationContext<'_>, findings: &mut ValidationResult) {
        let employee = &ctx.input.employee;
        if employee.contract_type == ContractType::Assimilated {
            return;
        }
        let minimum = ctx.fiscal.minimum_wage(employee.border_zone);
        if employee.wage.daily_salary < minimum {
            findings.warning(
                self.id(),
                "BELOW_MINIMUM_WAGE",
                format!(
                    "daily salary {} is below the minimum wage {}",
                    employee.wage.daily_salary, minimum
                ),
            );
        }
    }
}

/// A reported SBC may not exceed the legal ceiling.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportedSbcCap;

impl ValidationRule for ReportedSbcCap {
    fn id(&self) -> &str {
        "sbc_cap"
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PreCalculation
    }

    fn check(&self, ctx: &ValidationContext<'_>, findings: &mut ValidationResult) {
        let Some(reported) = ctx.input.employee.wage.reported_sbc_daily else {
            return;
        };
        match ctx.fiscal.sbc_cap_daily() {
            Ok(cap) if reported > cap => findings.error(
                self.id(),
                "SBC_ABOVE_CAP",
                format!("reported SBC {} exceeds the ceiling {}", reported, cap),
            ),
            Ok(_) => {}
            Err(err) => findings.error(self.id(), "SBC_CAP_UNAVAILABLE", err.to_string()),
        }
    }
}

/// Warns when a reported SBC is below the minimum wage.
#[derive(Debug, Clone, Copy, Default)]
pub struct SbcBelowMinimumWage;

impl ValidationRule for SbcBelowMinimumWage {
    fn id(&self) -> &str {
        "sbc_minimum_wage"
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PreCalculation
    }

    fn check(&self, ctx: &ValidationContext<'_>, findings: &mut ValidationResult) {
        let employee = &ctx.input.employee;
        let Some(reported) = employee.wage.reported_sbc_daily else {
            return;
        };
        let minimum = ctx.fiscal.minimum_wage(employee.border_zone);
        if reported < minimum {
            findings.warning(
                self.id(),
                "SBC_BELOW_MINIMUM_WAGE",
                format!("reported SBC {} is below the minimum wage {}", reported, minimum),
            );
        }
    }
}

/// Salary and ISR are always calculated; IMSS too for employees subject to
/// it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredConcepts;

impl ValidationRule for RequiredConcepts {
    fn id(&self) -> &str {
        "required_concepts"
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PreCalculation
    }

    fn check(&self, ctx: &ValidationContext<'_>, findings: &mut ValidationResult) {
        let mut required = vec![ConceptKind::Salary, ConceptKind::Isr];
        if ctx.input.employee.contract_type.is_subject_to_imss() {
            required.push(ConceptKind::ImssWorker);
        }
        for kind in required {
            if !ctx.plans(kind) {
                findings.error(
                    self.id(),
                    "MISSING_REQUIRED_CONCEPT",
                    format!(
                        "{:?} contracts require concept '{}'",
                        ctx.input.employee.contract_type,
                        kind.code()
                    ),
                );
            }
        }
    }
}

/// Assimilated workers do not contribute to IMSS.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImssForbiddenForAssimilated;

impl ValidationRule for ImssForbiddenForAssimilated {
    fn id(&self) -> &str {
        "imss_assimilated"
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PreCalculation
    }

    fn check(&self, ctx: &ValidationContext<'_>, findings: &mut ValidationResult) {
        if !ctx.input.employee.contract_type.is_subject_to_imss()
            && ctx.plans(ConceptKind::ImssWorker)
        {
            findings.error(
                self.id(),
                "IMSS_NOT_ALLOWED",
                "assimilated contracts are not subject to IMSS",
            );
        }
    }
}

/// Deductions may not exceed earnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct NegativeNetPay;

impl ValidationRule for NegativeNetPay {
    fn id(&self) -> &str {
        "negative_net_pay"
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PostCalculation
    }

    fn check(&self, ctx: &ValidationContext<'_>, findings: &mut ValidationResult) {
        if let Some(result) = ctx.result {
            if result.totals.net.is_negative() {
                findings.error(
                    self.id(),
                    "NEGATIVE_NET_PAY",
                    format!("net pay {} is negative", result.totals.net),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_point::Money;
    use crate::models::{Incident, OvertimeWeekToDate, PayrollPeriod};
    use crate::orchestration::run::ExtraordinaryPayments;
    use crate::test_support::{employee, fiscal_2026};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn input() -> PayrollInput {
        PayrollInput {
            run_id: "run-1".to_string(),
            employee: employee(Money::from_units(500), date(2024, 1, 1)),
            period: PayrollPeriod::new(date(2026, 1, 1), date(2026, 1, 15), Periodicity::Biweekly)
                .unwrap(),
            incidents: vec![],
            overtime_week_to_date: vec![],
            extraordinary: ExtraordinaryPayments::default(),
            concepts: vec![],
        }
    }

    fn codes(kinds: &[ConceptKind]) -> Vec<String> {
        kinds.iter().map(|k| k.code().to_string()).collect()
    }

    fn check(input: &PayrollInput, concepts: &[String]) -> ValidationResult {
        let fiscal = fiscal_2026();
        let ctx = ValidationContext {
            input,
            fiscal: &fiscal,
            concepts,
            result: None,
        };
        run_rules(&default_rules(), ValidationStage::PreCalculation, &ctx)
    }

    fn error_codes(findings: &ValidationResult) -> Vec<&str> {
        findings.errors.iter().map(|e| e.code.as_str()).collect()
    }

    #[test]
    fn test_standard_input_is_clean() {
        let input = input();
        let findings = check(&input, &codes(&input.standard_concepts()));
        assert!(!findings.is_blocking());
        assert!(findings.warnings.is_empty());
    }

    #[test]
    fn test_incident_outside_period_blocks() {
        let mut input = input();
        input.incidents.push(Incident {
            id: "i1".to_string(),
            date: date(2026, 1, 20),
            kind: IncidentKind::Absence {
                days: Quantity::ONE,
            },
        });
        let findings = check(&input, &codes(&input.standard_concepts()));
        assert_eq!(error_codes(&findings), vec!["INCIDENT_OUTSIDE_PERIOD"]);
    }

    #[test]
    fn test_carried_overtime_weeks_must_be_unique_and_non_negative() {
        let mut input = input();
        let week = OvertimeWeekToDate {
            iso_year: 2026,
            iso_week: 3,
            hours: Quantity::from_int(6),
            exempt: Money::from_units(750),
        };
        input.overtime_week_to_date = vec![week, week];
        let findings = check(&input, &codes(&input.standard_concepts()));
        assert_eq!(error_codes(&findings), vec!["DUPLICATE_OVERTIME_WEEK"]);

        input.overtime_week_to_date = vec![OvertimeWeekToDate {
            hours: Quantity::from_int(-1),
            ..week
        }];
        let findings = check(&input, &codes(&input.standard_concepts()));
        assert_eq!(error_codes(&findings), vec!["NEGATIVE_OVERTIME_WEEK"]);
    }

    #[test]
    fn test_below_minimum_wage_only_warns() {
        let mut input = input();
        input.employee.wage.daily_salary = Money::from_units(300);
        let findings = check(&input, &codes(&input.standard_concepts()));
        assert!(!findings.is_blocking());
        assert_eq!(findings.warnings[0].code, "BELOW_MINIMUM_WAGE");
    }

    #[test]
    fn test_reported_sbc_above_cap_blocks() {
        let mut input = input();
        input.employee.wage.reported_sbc_daily = Some(Money::from_str("2932.76").unwrap());
        let findings = check(&input, &codes(&input.standard_concepts()));
        assert_eq!(error_codes(&findings), vec!["SBC_ABOVE_CAP"]);
    }

    #[test]
    fn test_reported_sbc_below_minimum_wage_warns() {
        let mut input = input();
        input.employee.wage.reported_sbc_daily = Some(Money::from_units(300));
        let findings = check(&input, &codes(&input.standard_concepts()));
        assert!(!findings.is_blocking());
        assert_eq!(findings.warnings[0].code, "SBC_BELOW_MINIMUM_WAGE");
    }

    #[test]
    fn test_missing_imss_for_employee_blocks() {
        let input = input();
        let findings = check(&input, &codes(&[ConceptKind::Salary, ConceptKind::Isr]));
        assert_eq!(error_codes(&findings), vec!["MISSING_REQUIRED_CONCEPT"]);
    }

    #[test]
    fn test_imss_forbidden_for_assimilated() {
        let mut input = input();
        input.employee.contract_type = ContractType::Assimilated;
        let findings = check(
            &input,
            &codes(&[ConceptKind::Salary, ConceptKind::Isr, ConceptKind::ImssWorker]),
        );
        assert_eq!(error_codes(&findings), vec!["IMSS_NOT_ALLOWED"]);
        assert!(!input.standard_concepts().contains(&ConceptKind::ImssWorker));
    }

    #[test]
    fn test_hire_after_period_and_wrong_year() {
        let mut input = input();
        input.employee.hire_date = date(2026, 2, 1);
        input.period =
            PayrollPeriod::new(date(2025, 1, 1), date(2025, 1, 15), Periodicity::Biweekly).unwrap();
        let findings = check(&input, &codes(&input.standard_concepts()));
        assert_eq!(
            error_codes(&findings),
            vec!["FISCAL_YEAR_MISMATCH", "NOT_YET_HIRED"]
        );
    }
}
