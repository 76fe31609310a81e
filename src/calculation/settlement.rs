//! Severance and settlement (finiquito / liquidación).
//!
//! The termination type alone selects the computation:
//!
//! - **Voluntary resignation** and **justified dismissal**: the finiquito,
//!   i.e. accrued wages, proportional aguinaldo, proportional vacation and
//!   its premium
//! - **Unjustified dismissal**: the finiquito plus three indemnities
//!   (LFT arts. 48, 50 and 162): 90 days of SDI, 20 days of SDI per year of
//!   service and a seniority premium of 12 days per year on
//!   `min(SDI, 2 × minimum wage)`
//!
//! Indemnities are exempt up to 90 UMA per year of service, where a
//! fraction of more than six months counts as a full year
//! (LISR art. 93 fr. XIII).

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fiscal::{FiscalConfig, CALENDAR_DAYS_PER_YEAR};
use crate::fixed_point::{Money, Quantity, RoundingMode};
use crate::models::{renumber_steps, AuditStep, EmployeeProfile};

use super::aguinaldo::{calculate_aguinaldo, days_worked_in_year};
use super::extraordinary_isr::{tax_on_severance, ExtraordinaryIsrResult};
use super::integrated_wage::calculate_sdi;
use super::vacation_premium::{calculate_vacation, vacation_days_for_service_year};

/// Days of the last ordinary monthly salary used to tax indemnities.
const SALARY_DAYS_PER_MONTH: Quantity = Quantity::from_int(30);

/// Why the relationship ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationType {
    /// The worker resigned.
    VoluntaryResignation,
    /// The employer dismissed the worker without legal cause.
    UnjustifiedDismissal,
    /// The employer dismissed the worker with legal cause (LFT art. 47).
    JustifiedDismissal,
}

impl TerminationType {
    /// True when indemnities are owed.
    pub fn owes_indemnities(self) -> bool {
        matches!(self, TerminationType::UnjustifiedDismissal)
    }
}

/// Facts of the termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementInput {
    /// Why the relationship ended.
    pub termination: TerminationType,
    /// Last day of the relationship.
    pub termination_date: NaiveDate,
    /// Worked days not yet paid.
    #[serde(default)]
    pub accrued_unpaid_days: Quantity,
    /// Vacation days already taken in the current service year.
    #[serde(default)]
    pub vacation_days_taken: Quantity,
    /// Unused vacation days carried from earlier service years.
    #[serde(default)]
    pub pending_vacation_days: Quantity,
}

/// Kinds of settlement components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Worked days not yet paid.
    AccruedWages,
    /// Aguinaldo for the days worked in the calendar year.
    ProportionalAguinaldo,
    /// Vacation accrued since the last anniversary, plus pending days.
    ProportionalVacation,
    /// Prima vacacional on the proportional vacation.
    VacationPremium,
    /// Three months of SDI (LFT art. 48).
    ConstitutionalIndemnity,
    /// 20 days of SDI per year of service (LFT art. 50 fr. II).
    TwentyDaysPerYear,
    /// 12 days per year on the capped salary (LFT art. 162).
    SeniorityPremium,
}

impl ComponentKind {
    /// True for indemnities, which share the severance exemption.
    pub fn is_indemnity(self) -> bool {
        matches!(
            self,
            ComponentKind::ConstitutionalIndemnity
                | ComponentKind::TwentyDaysPerYear
                | ComponentKind::SeniorityPremium
        )
    }
}

/// One component of a settlement with its taxable/exempt split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementComponent {
    /// The component.
    pub kind: ComponentKind,
    /// Gross amount.
    pub amount: Money,
    /// Exempt part.
    pub exempt: Money,
    /// Taxable part.
    pub taxable: Money,
    /// Audit steps for this component.
    pub trace: Vec<AuditStep>,
}

/// A complete settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    /// The termination type the computation followed.
    pub termination: TerminationType,
    /// Days of service, inclusive.
    pub days_of_service: i64,
    /// `days_of_service / 365`.
    pub years_of_service: Quantity,
    /// The SDI indemnities are based on.
    pub sdi: Money,
    /// Components in computation order.
    pub components: Vec<SettlementComponent>,
    /// Sum of finiquito components.
    pub finiquito_total: Money,
    /// Sum of indemnities; zero unless the dismissal was unjustified.
    pub severance_total: Money,
    /// `finiquito_total + severance_total`.
    pub total: Money,
    /// Sum of exempt parts.
    pub total_exempt: Money,
    /// Sum of taxable parts.
    pub total_taxable: Money,
    /// ISR on the taxable indemnities.
    pub severance_isr: ExtraordinaryIsrResult,
}

impl SettlementResult {
    /// The component of the given kind, if present.
    pub fn component(&self, kind: ComponentKind) -> Option<&SettlementComponent> {
        self.components.iter().find(|c| c.kind == kind)
    }
}

/// Calculates a settlement.
///
/// # Errors
///
/// * `InvalidInput` when the termination precedes the hire date, or when
///   vacation days taken exceed the days accrued
pub fn calculate_settlement(
    employee: &EmployeeProfile,
    input: &SettlementInput,
    fiscal: &FiscalConfig,
) -> EngineResult<SettlementResult> {
    let rounding = &fiscal.rounding;
    let wage = &employee.wage;
    let salary = wage.daily_salary;
    let date = input.termination_date;

    let days_of_service = employee.days_of_service(date)?;
    let years_of_service = Quantity::from_int(days_of_service)
        .div_by(CALENDAR_DAYS_PER_YEAR, rounding.intermediate)?;

    let mut components = Vec::new();

    if input.accrued_unpaid_days.is_positive() {
        let amount = salary
            .times(input.accrued_unpaid_days, rounding.intermediate)?
            .round_to_cent(rounding.payments)?;
        components.push(SettlementComponent {
            kind: ComponentKind::AccruedWages,
            amount,
            exempt: Money::ZERO,
            taxable: amount,
            trace: vec![AuditStep {
                step_number: 1,
                rule_id: "settlement_accrued_wages".to_string(),
                rule_name: "Accrued Wages".to_string(),
                legal_ref: "LFT art. 82".to_string(),
                input: serde_json::json!({
                    "daily_salary": salary.to_string(),
                    "days": input.accrued_unpaid_days.to_string(),
                }),
                output: serde_json::json!({ "amount": amount.to_string() }),
                reasoning: format!(
                    "{} × {} unpaid days = {}",
                    salary, input.accrued_unpaid_days, amount
                ),
            }],
        });
    }

    let year = date.year();
    let aguinaldo_days_worked = days_worked_in_year(employee, year, date)?;
    let aguinaldo = calculate_aguinaldo(
        salary,
        wage.aguinaldo_days,
        aguinaldo_days_worked,
        None,
        fiscal,
        1,
    )?;
    components.push(SettlementComponent {
        kind: ComponentKind::ProportionalAguinaldo,
        amount: aguinaldo.split.gross,
        exempt: aguinaldo.split.exempt,
        taxable: aguinaldo.split.taxable,
        trace: aguinaldo.audit_steps,
    });

    let vacation_days = proportional_vacation_days(employee, input, rounding.intermediate)?;
    let mut vacation = calculate_vacation(
        salary,
        vacation_days,
        wage.vacation_premium_rate,
        None,
        fiscal,
        1,
    )?;
    let premium_step = vacation.audit_steps.split_off(1);
    components.push(SettlementComponent {
        kind: ComponentKind::ProportionalVacation,
        amount: vacation.vacation_pay,
        exempt: Money::ZERO,
        taxable: vacation.vacation_pay,
        trace: vacation.audit_steps,
    });
    let mut premium_trace = premium_step;
    renumber_steps(&mut premium_trace, 1);
    components.push(SettlementComponent {
        kind: ComponentKind::VacationPremium,
        amount: vacation.premium.gross,
        exempt: vacation.premium.exempt,
        taxable: vacation.premium.taxable,
        trace: premium_trace,
    });

    let sdi = calculate_sdi(wage, rounding, 1)?;
    if input.termination.owes_indemnities() {
        components.extend(indemnities(
            sdi.sdi,
            years_of_service,
            employee.border_zone,
            fiscal,
        )?);
    }

    let finiquito_total = Money::checked_sum(
        components
            .iter()
            .filter(|c| !c.kind.is_indemnity())
            .map(|c| c.amount),
    )?;
    let severance_total = Money::checked_sum(
        components
            .iter()
            .filter(|c| c.kind.is_indemnity())
            .map(|c| c.amount),
    )?;
    let severance_taxable = Money::checked_sum(
        components
            .iter()
            .filter(|c| c.kind.is_indemnity())
            .map(|c| c.taxable),
    )?;
    let last_monthly_salary = salary.times(SALARY_DAYS_PER_MONTH, rounding.intermediate)?;
    let severance_isr = tax_on_severance(severance_taxable, last_monthly_salary, fiscal, 1)?;

    let total = finiquito_total.checked_add(severance_total)?;
    let total_exempt = Money::checked_sum(components.iter().map(|c| c.exempt))?;
    let total_taxable = Money::checked_sum(components.iter().map(|c| c.taxable))?;

    tracing::debug!(
        employee_id = %employee.id,
        termination = ?input.termination,
        days_of_service,
        total = %total,
        "calculated settlement"
    );

    Ok(SettlementResult {
        termination: input.termination,
        days_of_service,
        years_of_service,
        sdi: sdi.sdi,
        components,
        finiquito_total,
        severance_total,
        total,
        total_exempt,
        total_taxable,
        severance_isr,
    })
}

/// Vacation days owed at termination: the current service year's
/// entitlement prorated since the last anniversary, less days taken, plus
/// pending days from earlier years.
fn proportional_vacation_days(
    employee: &EmployeeProfile,
    input: &SettlementInput,
    mode: RoundingMode,
) -> EngineResult<Quantity> {
    let date = input.termination_date;
    let completed = employee.completed_years(date);
    let anniversary = employee
        .hire_date
        .checked_add_months(Months::new(12 * completed))
        .ok_or_else(|| EngineError::overflow("anniversary date"))?;
    let days_since_anniversary = (date - anniversary).num_days() + 1;

    let entitled = employee
        .wage
        .vacation_days
        .max(vacation_days_for_service_year(completed + 1));
    let accrued = entitled
        .times(Quantity::from_int(days_since_anniversary), mode)?
        .div_by(CALENDAR_DAYS_PER_YEAR, mode)?;

    let owed = accrued
        .checked_sub(input.vacation_days_taken)?
        .checked_add(input.pending_vacation_days)?;
    if owed < Quantity::ZERO {
        return Err(EngineError::invalid_input(
            "vacation_days_taken",
            format!(
                "{} days taken exceed the {} days accrued",
                input.vacation_days_taken, accrued
            ),
        ));
    }
    Ok(owed)
}

fn indemnities(
    sdi: Money,
    years_of_service: Quantity,
    border_zone: bool,
    fiscal: &FiscalConfig,
) -> EngineResult<Vec<SettlementComponent>> {
    let rounding = &fiscal.rounding;
    let mode = rounding.intermediate;

    let constitutional = sdi
        .times(Quantity::from_int(90), mode)?
        .round_to_cent(rounding.payments)?;
    let twenty_days = sdi
        .times(Quantity::from_int(20), mode)?
        .times(years_of_service, mode)?
        .round_to_cent(rounding.payments)?;
    let seniority_base = sdi.min(fiscal.minimum_wage(border_zone).times_int(2)?);
    let seniority = seniority_base
        .times(Quantity::from_int(12), mode)?
        .times(years_of_service, mode)?
        .round_to_cent(rounding.payments)?;

    // More than six months counts as a full year.
    let exempt_years = Quantity::from_int(years_of_service.round_to_int(RoundingMode::HalfUp)?);
    let mut exempt_remaining = fiscal
        .uma_daily
        .times(fiscal.exemptions.severance_uma_per_year, mode)?
        .times(exempt_years, mode)?;

    let parts = [
        (
            ComponentKind::ConstitutionalIndemnity,
            constitutional,
            "LFT arts. 48, 50 fr. III",
            format!("90 days × SDI {} = {}", sdi, constitutional),
        ),
        (
            ComponentKind::TwentyDaysPerYear,
            twenty_days,
            "LFT art. 50 fr. II",
            format!(
                "20 days × SDI {} × {} years = {}",
                sdi, years_of_service, twenty_days
            ),
        ),
        (
            ComponentKind::SeniorityPremium,
            seniority,
            "LFT art. 162",
            format!(
                "12 days × min(SDI, 2 × minimum wage) {} × {} years = {}",
                seniority_base, years_of_service, seniority
            ),
        ),
    ];

    let mut components = Vec::with_capacity(parts.len());
    for (kind, amount, legal_ref, reasoning) in parts {
        let exempt = amount.min(exempt_remaining);
        exempt_remaining = exempt_remaining.checked_sub(exempt)?;
        let taxable = amount.checked_sub(exempt)?;
        components.push(SettlementComponent {
            kind,
            amount,
            exempt,
            taxable,
            trace: vec![AuditStep {
                step_number: 1,
                rule_id: format!("settlement_{}", kind_id(kind)),
                rule_name: kind_name(kind).to_string(),
                legal_ref: format!("{}; LISR art. 93 fr. XIII", legal_ref),
                input: serde_json::json!({
                    "sdi": sdi.to_string(),
                    "years_of_service": years_of_service.to_string(),
                    "exempt_years": exempt_years.to_string(),
                }),
                output: serde_json::json!({
                    "amount": amount.to_string(),
                    "exempt": exempt.to_string(),
                    "taxable": taxable.to_string(),
                }),
                reasoning,
            }],
        });
    }
    Ok(components)
}

fn kind_id(kind: ComponentKind) -> &'static str {
    match kind {
        ComponentKind::AccruedWages => "accrued_wages",
        ComponentKind::ProportionalAguinaldo => "proportional_aguinaldo",
        ComponentKind::ProportionalVacation => "proportional_vacation",
        ComponentKind::VacationPremium => "vacation_premium",
        ComponentKind::ConstitutionalIndemnity => "constitutional_indemnity",
        ComponentKind::TwentyDaysPerYear => "twenty_days_per_year",
        ComponentKind::SeniorityPremium => "seniority_premium",
    }
}

fn kind_name(kind: ComponentKind) -> &'static str {
    match kind {
        ComponentKind::AccruedWages => "Accrued Wages",
        ComponentKind::ProportionalAguinaldo => "Proportional Aguinaldo",
        ComponentKind::ProportionalVacation => "Proportional Vacation",
        ComponentKind::VacationPremium => "Vacation Premium",
        ComponentKind::ConstitutionalIndemnity => "Constitutional Indemnity",
        ComponentKind::TwentyDaysPerYear => "Twenty Days per Year",
        ComponentKind::SeniorityPremium => "Seniority Premium",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{employee, fiscal_2026};
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn input(termination: TerminationType, termination_date: NaiveDate) -> SettlementInput {
        SettlementInput {
            termination,
            termination_date,
            accrued_unpaid_days: Quantity::ZERO,
            vacation_days_taken: Quantity::ZERO,
            pending_vacation_days: Quantity::ZERO,
        }
    }

    #[test]
    fn test_resignation_after_400_days() {
        let fiscal = fiscal_2026();
        let profile = employee(money("300"), date(2025, 1, 1));
        let result = calculate_settlement(
            &profile,
            &input(TerminationType::VoluntaryResignation, date(2026, 2, 4)),
            &fiscal,
        )
        .unwrap();

        assert_eq!(result.days_of_service, 400);
        // 300 × 15 × 35 / 365
        let aguinaldo = result.component(ComponentKind::ProportionalAguinaldo).unwrap();
        assert_eq!(aguinaldo.amount, money("431.51"));
        assert_eq!(aguinaldo.exempt, money("431.51"));
        // 14 days × 35 / 365 = 1.3425 days
        let vacation = result.component(ComponentKind::ProportionalVacation).unwrap();
        assert_eq!(vacation.amount, money("402.75"));
        let premium = result.component(ComponentKind::VacationPremium).unwrap();
        assert_eq!(premium.amount, money("100.69"));

        assert_eq!(result.severance_total, Money::ZERO);
        assert_eq!(result.total, money("934.95"));
        assert!(result.component(ComponentKind::SeniorityPremium).is_none());
        assert_eq!(result.severance_isr.tax, Money::ZERO);
    }

    #[test]
    fn test_accrued_wages_and_pending_vacation() {
        let fiscal = fiscal_2026();
        let profile = employee(money("300"), date(2025, 1, 1));
        let mut facts = input(TerminationType::JustifiedDismissal, date(2026, 2, 4));
        facts.accrued_unpaid_days = Quantity::from_int(4);
        facts.pending_vacation_days = Quantity::from_int(2);
        let result = calculate_settlement(&profile, &facts, &fiscal).unwrap();

        let wages = result.component(ComponentKind::AccruedWages).unwrap();
        assert_eq!(wages.amount, money("1200"));
        assert_eq!(wages.taxable, money("1200"));
        // (1.3425 + 2) × 300
        let vacation = result.component(ComponentKind::ProportionalVacation).unwrap();
        assert_eq!(vacation.amount, money("1002.75"));
        assert_eq!(result.severance_total, Money::ZERO);
    }

    #[test]
    fn test_vacation_taken_beyond_accrued_is_rejected() {
        let fiscal = fiscal_2026();
        let profile = employee(money("300"), date(2025, 1, 1));
        let mut facts = input(TerminationType::VoluntaryResignation, date(2026, 2, 4));
        facts.vacation_days_taken = Quantity::from_int(5);
        assert!(matches!(
            calculate_settlement(&profile, &facts, &fiscal),
            Err(EngineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_unjustified_dismissal_adds_indemnities() {
        let fiscal = fiscal_2026();
        let profile = employee(money("500"), date(2020, 3, 1));
        let result = calculate_settlement(
            &profile,
            &input(TerminationType::UnjustifiedDismissal, date(2026, 2, 28)),
            &fiscal,
        )
        .unwrap();

        assert_eq!(result.sdi, money("524.6407"));
        let constitutional = result
            .component(ComponentKind::ConstitutionalIndemnity)
            .unwrap();
        assert_eq!(constitutional.amount, money("47217.66"));

        // Seniority premium is based on 2 × 315.04 = 630.08 > SDI, so on SDI.
        let seniority = result.component(ComponentKind::SeniorityPremium).unwrap();
        let twenty = result.component(ComponentKind::TwentyDaysPerYear).unwrap();
        assert!(seniority.amount < twenty.amount);

        // Six years of service: 90 × 117.31 × 6 = 63347.40 exempt in total.
        let indemnity_exempt = Money::checked_sum(
            result
                .components
                .iter()
                .filter(|c| c.kind.is_indemnity())
                .map(|c| c.exempt),
        )
        .unwrap();
        assert_eq!(indemnity_exempt, money("63347.40"));
        assert!(result.severance_isr.tax.is_positive());
        assert_eq!(
            result.total,
            result.finiquito_total.checked_add(result.severance_total).unwrap()
        );
    }

    #[test]
    fn test_termination_type_selects_indemnities() {
        assert!(TerminationType::UnjustifiedDismissal.owes_indemnities());
        assert!(!TerminationType::JustifiedDismissal.owes_indemnities());
        assert!(!TerminationType::VoluntaryResignation.owes_indemnities());
    }
}
