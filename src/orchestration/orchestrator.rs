//! The payroll orchestrator: validates, plans and calculates one
//! employee's run.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calculation::{
    calculate_aguinaldo, calculate_imss, calculate_isr, calculate_overtime_after, calculate_ptu,
    calculate_sbc, calculate_sdi, calculate_vacation, days_worked_in_year, tax_on_bonus,
    tax_on_ptu, ImssInput,
};
use crate::config::ConfigLoader;
use crate::error::{EngineError, EngineResult};
use crate::fiscal::{FiscalConfig, DAYS_PER_FISCAL_MONTH};
use crate::fixed_point::{Money, Quantity, Rate};
use crate::ledger::{
    EmployeeLedger, ExemptionCap, ExemptionLedger, AGUINALDO_CAP, PTU_CAP, VACATION_PREMIUM_CAP,
};
use crate::models::{
    renumber_steps, AuditStep, CalculatedConcept, IncidentSummary, OvertimeWeekToDate,
    PayrollResult, PayrollTotals, ValidationResult, ValidationWarning,
};
use crate::ENGINE_VERSION;

use super::concept::{ConceptClass, ConceptContext, ConceptKind};
use super::registry::{ConceptNode, ConceptRegistry};
use super::run::{PayrollInput, PayrollRun, RunOutcome, RunStatus};
use super::validation::{default_rules, run_rules, ValidationContext, ValidationRule, ValidationStage};

/// Employer-level settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorOptions {
    /// The employer's work-risk premium (prima de riesgo de trabajo).
    pub work_risk_premium: Rate,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        // Minimum premium for a new class I employer.
        Self {
            work_risk_premium: Rate::from_raw(543_550),
        }
    }
}

/// Runs payrolls.
///
/// Cloning is cheap: configuration, plugins, rules and the ledger are
/// shared.
#[derive(Clone)]
pub struct PayrollOrchestrator {
    config: ConfigLoader,
    registry: ConceptRegistry,
    rules: Vec<Arc<dyn ValidationRule>>,
    ledger: Option<Arc<ExemptionLedger>>,
    options: OrchestratorOptions,
}

impl std::fmt::Debug for PayrollOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayrollOrchestrator")
            .field("years", &self.config.years().collect::<Vec<_>>())
            .field("registry", &self.registry)
            .field("rules", &self.rules.iter().map(|r| r.id()).collect::<Vec<_>>())
            .field("ledger", &self.ledger.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl PayrollOrchestrator {
    /// An orchestrator with the built-in rules, no plugins and no ledger.
    pub fn new(config: ConfigLoader) -> Self {
        Self {
            config,
            registry: ConceptRegistry::new(),
            rules: default_rules(),
            ledger: None,
            options: OrchestratorOptions::default(),
        }
    }

    /// Uses `registry` for plugin concepts.
    pub fn with_registry(mut self, registry: ConceptRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Adds a validation rule.
    pub fn with_rule(mut self, rule: Arc<dyn ValidationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Consumes capped exemptions from `ledger`.
    pub fn with_ledger(mut self, ledger: Arc<ExemptionLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Sets employer-level options.
    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs one employee's payroll.
    ///
    /// Never panics on bad input: failures are reported in the outcome.
    pub fn run(&self, input: &PayrollInput) -> RunOutcome {
        let mut outcome = RunOutcome {
            run: PayrollRun::new(&input.run_id, &input.employee.id),
            validation: ValidationResult::default(),
            result: None,
            error: None,
        };
        if let Err(error) = self.drive(input, &mut outcome) {
            let terminal = match outcome.run.status() {
                RunStatus::Calculating => RunStatus::Failed,
                _ => RunStatus::Rejected,
            };
            if outcome.run.status().can_transition_to(terminal) {
                // Legal by the match above; a failure here cannot be reported better.
                let _ = outcome.run.transition(terminal);
            }
            tracing::warn!(
                run_id = %input.run_id,
                employee_id = %input.employee.id,
                error = %error,
                "payroll run failed"
            );
            outcome.error = Some(error);
        }
        outcome
    }

    fn requested_codes(&self, input: &PayrollInput) -> Vec<String> {
        if !input.concepts.is_empty() {
            return input.concepts.clone();
        }
        input
            .standard_concepts()
            .into_iter()
            .map(|kind| kind.code().to_string())
            .chain(self.registry.plugin_codes().map(str::to_string))
            .collect()
    }

    fn drive(&self, input: &PayrollInput, outcome: &mut RunOutcome) -> EngineResult<()> {
        outcome.run.transition(RunStatus::Validating)?;
        let fiscal = self
            .config
            .shared(input.period.fiscal_year())
            .inspect_err(|error| record_error(&mut outcome.validation, "fiscal_year", error))?;
        let plan = self
            .registry
            .plan(&self.requested_codes(input))
            .inspect_err(|error| record_error(&mut outcome.validation, "concept_plan", error))?;
        let codes: Vec<String> = plan.iter().map(|node| node.code().to_string()).collect();

        let ctx = ValidationContext {
            input,
            fiscal: &fiscal,
            concepts: &codes,
            result: None,
        };
        outcome.validation = run_rules(&self.rules, ValidationStage::PreCalculation, &ctx);
        if outcome.validation.is_blocking() {
            tracing::info!(
                run_id = %input.run_id,
                employee_id = %input.employee.id,
                errors = outcome.validation.errors.len(),
                "payroll run rejected"
            );
            return outcome.run.transition(RunStatus::Rejected);
        }

        outcome.run.transition(RunStatus::Calculating)?;
        let pre_warnings = outcome.validation.warnings.clone();
        let (result, post) = match &self.ledger {
            Some(ledger) => ledger.with_employee(&input.employee.id, |employee_ledger| {
                self.calculate(input, &fiscal, &plan, &codes, pre_warnings, Some(employee_ledger))
            })?,
            None => self.calculate(input, &fiscal, &plan, &codes, pre_warnings, None)?,
        };
        let blocked = post.is_blocking();
        outcome.validation.merge(post);

        if blocked {
            return outcome.run.transition(RunStatus::Failed);
        }
        tracing::info!(
            run_id = %input.run_id,
            employee_id = %input.employee.id,
            concepts = result.concepts.len(),
            net = %result.totals.net,
            "payroll run completed"
        );
        outcome.result = Some(result);
        outcome.run.transition(RunStatus::Completed)
    }

    /// Calculates the plan, post-validates, and appends the exemptions
    /// consumed when the result is accepted.
    fn calculate(
        &self,
        input: &PayrollInput,
        fiscal: &FiscalConfig,
        plan: &[ConceptNode],
        codes: &[String],
        warnings: Vec<ValidationWarning>,
        mut ledger: Option<&mut EmployeeLedger>,
    ) -> EngineResult<(PayrollResult, ValidationResult)> {
        let mut state = RunState {
            input,
            fiscal,
            options: self.options,
            incidents: IncidentSummary::from_incidents(&input.incidents)?,
            classes: plan
                .iter()
                .map(|node| (node.code().to_string(), node.class()))
                .collect(),
            computed: BTreeMap::new(),
            caps: ExemptionCap::statutory(fiscal)?,
            ledger: ledger.as_deref(),
            consumptions: Vec::new(),
            overtime_weeks: Vec::new(),
        };

        let mut concepts = Vec::with_capacity(plan.len());
        for node in plan {
            let concept = match node {
                ConceptNode::Builtin(kind) => state.builtin(*kind)?,
                ConceptNode::Plugin(plugin) => {
                    let ctx = ConceptContext {
                        employee: &input.employee,
                        period: &input.period,
                        fiscal,
                        incidents: &state.incidents,
                        computed: &state.computed,
                    };
                    let concept = plugin.calculate(&ctx)?;
                    check_plugin_output(plugin.code(), plugin.class(), &concept)?;
                    Some(concept)
                }
            };
            if let Some(mut concept) = concept {
                renumber_steps(&mut concept.trace, 1);
                state
                    .computed
                    .insert(concept.concept_code.clone(), concept.clone());
                concepts.push(concept);
            }
        }
        let consumptions = std::mem::take(&mut state.consumptions);
        let overtime_week_to_date = std::mem::take(&mut state.overtime_weeks);
        drop(state);

        let result = PayrollResult {
            calculation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            engine_version: ENGINE_VERSION.to_string(),
            employee_id: input.employee.id.clone(),
            period: input.period.clone(),
            fiscal_year: fiscal.year,
            totals: PayrollTotals::from_concepts(&concepts)?,
            concepts,
            warnings,
            overtime_week_to_date,
        };

        let ctx = ValidationContext {
            input,
            fiscal,
            concepts: codes,
            result: Some(&result),
        };
        let post = run_rules(&self.rules, ValidationStage::PostCalculation, &ctx);
        if post.is_blocking() {
            return Ok((result, post));
        }

        if let Some(ledger) = ledger.as_deref_mut() {
            let month = Some(input.period.end.month());
            for (cap_id, amount) in consumptions.into_iter().filter(|(_, a)| a.is_positive()) {
                let key = consumption_key(input, cap_id);
                ledger.consume(cap_id, fiscal.year, month, amount, &key)?;
            }
        }
        let mut result = result;
        result.warnings.extend(post.warnings.iter().cloned());
        Ok((result, post))
    }
}

/// Reports a failure of a stage that runs before the rules, so callers
/// reading the validation findings see it too.
fn record_error(validation: &mut ValidationResult, stage: &str, error: &EngineError) {
    validation.error(stage, error.code(), error.to_string());
}

fn consumption_key(input: &PayrollInput, cap_id: &str) -> String {
    format!("{}/{}/{}", input.run_id, input.employee.id, cap_id)
}

fn check_plugin_output(
    code: &str,
    class: ConceptClass,
    concept: &CalculatedConcept,
) -> EngineResult<()> {
    if concept.concept_code != code {
        return Err(EngineError::invalid_input(
            "concept_code",
            format!("plugin '{}' returned concept '{}'", code, concept.concept_code),
        ));
    }
    if concept.is_deduction != (class == ConceptClass::Withholding) {
        return Err(EngineError::invalid_input(
            "is_deduction",
            format!("plugin '{}' returned a concept of the wrong class", code),
        ));
    }
    Ok(())
}

struct RunState<'a> {
    input: &'a PayrollInput,
    fiscal: &'a FiscalConfig,
    options: OrchestratorOptions,
    incidents: IncidentSummary,
    classes: BTreeMap<String, ConceptClass>,
    computed: BTreeMap<String, CalculatedConcept>,
    caps: Vec<ExemptionCap>,
    ledger: Option<&'a EmployeeLedger>,
    consumptions: Vec<(&'static str, Money)>,
    overtime_weeks: Vec<OvertimeWeekToDate>,
}

impl RunState<'_> {
    fn builtin(&mut self, kind: ConceptKind) -> EngineResult<Option<CalculatedConcept>> {
        match kind {
            ConceptKind::Salary => self.salary().map(Some),
            ConceptKind::Overtime => self.overtime(),
            ConceptKind::VacationPremium => self.vacation_premium().map(Some),
            ConceptKind::Aguinaldo => self.aguinaldo().map(Some),
            ConceptKind::Ptu => self.ptu().map(Some),
            ConceptKind::Isr => self.isr().map(Some),
            ConceptKind::ExtraordinaryIsr => self.extraordinary_isr(),
            ConceptKind::ImssWorker => self.imss_worker().map(Some),
        }
    }

    /// What the ledger leaves of a cap. A retried run gets back what it
    /// recorded the first time.
    fn available(&self, cap_id: &str) -> EngineResult<Option<Money>> {
        let Some(ledger) = self.ledger else {
            return Ok(None);
        };
        let Some(cap) = self.caps.iter().find(|cap| cap.id == cap_id) else {
            return Ok(None);
        };
        let available =
            ledger.available(cap, self.fiscal.year, Some(self.input.period.end.month()))?;
        let own = ledger
            .recorded(&consumption_key(self.input, cap_id))
            .map_or(Money::ZERO, |entry| entry.consumed_amount);
        available.map(|a| a.checked_add(own)).transpose()
    }

    fn taxable_of(&self, class: ConceptClass, excluding: Option<&str>) -> EngineResult<Money> {
        Money::checked_sum(
            self.computed
                .values()
                .filter(|c| self.classes.get(&c.concept_code) == Some(&class))
                .filter(|c| Some(c.concept_code.as_str()) != excluding)
                .map(|c| c.taxable_amount),
        )
    }

    fn salary(&self) -> EngineResult<CalculatedConcept> {
        let wage = &self.input.employee.wage;
        let period = &self.input.period;
        let unpaid = self.incidents.unpaid_days()?;
        let paid_days = period.days_in_period.checked_sub(unpaid)?.max(Quantity::ZERO);
        let amount = wage
            .daily_salary
            .times(paid_days, self.fiscal.rounding.intermediate)?
            .round_to_cent(self.fiscal.rounding.payments)?;

        let step = AuditStep {
            step_number: 1,
            rule_id: "salary".to_string(),
            rule_name: "Salary for Paid Days".to_string(),
            legal_ref: "LFT arts. 82, 89".to_string(),
            input: serde_json::json!({
                "daily_salary": wage.daily_salary.to_string(),
                "days_in_period": period.days_in_period.to_string(),
                "unpaid_days": unpaid.to_string(),
            }),
            output: serde_json::json!({
                "paid_days": paid_days.to_string(),
                "amount": amount.to_string(),
            }),
            reasoning: format!("{} × {} paid days = {}", wage.daily_salary, paid_days, amount),
        };
        CalculatedConcept::earning(ConceptKind::Salary.code(), amount, Money::ZERO, vec![step])
    }

    fn overtime(&mut self) -> EngineResult<Option<CalculatedConcept>> {
        if self.incidents.overtime_by_week.is_empty() {
            return Ok(None);
        }
        let employee = &self.input.employee;
        let hourly_rate = employee
            .wage
            .hourly_rate(self.fiscal.rounding.intermediate)?;
        let cap = self.fiscal.overtime_weekly_exempt_cap(employee.border_zone)?;

        let mut taxable = Money::ZERO;
        let mut exempt = Money::ZERO;
        let mut trace = Vec::new();
        for (&(iso_year, iso_week), hours) in &self.incidents.overtime_by_week {
            let prior = self
                .input
                .overtime_week_to_date
                .iter()
                .find(|carried| carried.week() == (iso_year, iso_week))
                .copied()
                .unwrap_or_else(|| OvertimeWeekToDate::empty(iso_year, iso_week));
            let week = calculate_overtime_after(
                prior.hours,
                prior.exempt,
                *hours,
                hourly_rate,
                cap,
                &self.fiscal.rounding,
                trace.len() as u32 + 1,
            )?;
            taxable = taxable.checked_add(week.taxable)?;
            exempt = exempt.checked_add(week.exempt)?;
            trace.extend(week.audit_steps);
            self.overtime_weeks.push(OvertimeWeekToDate {
                hours: prior.hours.checked_add(*hours)?,
                exempt: prior.exempt.checked_add(week.exempt)?,
                ..prior
            });
        }
        CalculatedConcept::earning(ConceptKind::Overtime.code(), taxable, exempt, trace).map(Some)
    }

    fn vacation_premium(&mut self) -> EngineResult<CalculatedConcept> {
        let wage = &self.input.employee.wage;
        let days = self
            .input
            .extraordinary
            .vacation_days
            .unwrap_or(Quantity::ZERO);
        let result = calculate_vacation(
            wage.daily_salary,
            days,
            wage.vacation_premium_rate,
            self.available(VACATION_PREMIUM_CAP)?,
            self.fiscal,
            1,
        )?;
        self.consumptions
            .push((VACATION_PREMIUM_CAP, result.premium.exempt));
        CalculatedConcept::earning(
            ConceptKind::VacationPremium.code(),
            result.premium.taxable,
            result.premium.exempt,
            result.audit_steps,
        )
    }

    fn aguinaldo(&mut self) -> EngineResult<CalculatedConcept> {
        let employee = &self.input.employee;
        let days = days_worked_in_year(employee, self.fiscal.year, self.input.period.end)?;
        let result = calculate_aguinaldo(
            employee.wage.daily_salary,
            employee.wage.aguinaldo_days,
            days,
            self.available(AGUINALDO_CAP)?,
            self.fiscal,
            1,
        )?;
        self.consumptions.push((AGUINALDO_CAP, result.split.exempt));
        CalculatedConcept::earning(
            ConceptKind::Aguinaldo.code(),
            result.split.taxable,
            result.split.exempt,
            result.audit_steps,
        )
    }

    fn ptu(&mut self) -> EngineResult<CalculatedConcept> {
        let amount = self.input.extraordinary.ptu.unwrap_or(Money::ZERO);
        let result = calculate_ptu(amount, self.available(PTU_CAP)?, self.fiscal, 1)?;
        self.consumptions.push((PTU_CAP, result.split.exempt));
        CalculatedConcept::earning(
            ConceptKind::Ptu.code(),
            result.split.taxable,
            result.split.exempt,
            vec![result.audit_step],
        )
    }

    fn isr(&self) -> EngineResult<CalculatedConcept> {
        let base = self.taxable_of(ConceptClass::OrdinaryEarning, None)?;
        let days = self.input.period.tax_table_days();
        let isr_table = self.fiscal.isr_table_for_days(days)?;
        let subsidy_table = if self.input.employee.contract_type.is_subject_to_imss() {
            Some(self.fiscal.subsidy_table_for_days(days)?)
        } else {
            None
        };
        let result = calculate_isr(base, &isr_table, subsidy_table.as_ref(), &self.fiscal.rounding)?;
        Ok(CalculatedConcept::deduction(
            ConceptKind::Isr.code(),
            result.final_tax,
            result.audit_steps,
        ))
    }

    fn extraordinary_isr(&self) -> EngineResult<Option<CalculatedConcept>> {
        let ptu_taxable = self
            .computed
            .get(ConceptKind::Ptu.code())
            .map_or(Money::ZERO, |c| c.taxable_amount);
        let bonus_taxable =
            self.taxable_of(ConceptClass::ExtraordinaryEarning, Some(ConceptKind::Ptu.code()))?;
        if !bonus_taxable.is_positive() && !ptu_taxable.is_positive() {
            return Ok(None);
        }

        let monthly_salary = self
            .input
            .employee
            .wage
            .daily_salary
            .times(DAYS_PER_FISCAL_MONTH, self.fiscal.rounding.intermediate)?;
        let mut tax = Money::ZERO;
        let mut trace = Vec::new();
        if bonus_taxable.is_positive() {
            let bonus = tax_on_bonus(bonus_taxable, monthly_salary, self.fiscal, 1)?;
            tax = tax.checked_add(bonus.tax)?;
            trace.push(bonus.audit_step);
        }
        if ptu_taxable.is_positive() {
            let ptu = tax_on_ptu(ptu_taxable, monthly_salary, self.fiscal, trace.len() as u32 + 1)?;
            tax = tax.checked_add(ptu.tax)?;
            trace.push(ptu.audit_step);
        }
        Ok(Some(CalculatedConcept::deduction(
            ConceptKind::ExtraordinaryIsr.code(),
            tax,
            trace,
        )))
    }

    fn imss_worker(&self) -> EngineResult<CalculatedConcept> {
        let employee = &self.input.employee;
        let mut trace = Vec::new();
        let sbc = match employee.wage.reported_sbc_daily {
            Some(reported) => reported,
            None => {
                let sdi = calculate_sdi(&employee.wage, &self.fiscal.rounding, 1)?;
                let sbc = calculate_sbc(sdi.sdi, self.fiscal, 2)?;
                trace.push(sdi.audit_step);
                trace.push(sbc.audit_step);
                sbc.sbc
            }
        };
        let input = ImssInput {
            sbc,
            days: self.input.period.days_in_period,
            absence_days: self.incidents.absence_days,
            work_risk_premium: self.options.work_risk_premium,
            minimum_wage_earner: employee.wage.daily_salary
                <= self.fiscal.minimum_wage(employee.border_zone),
        };
        let result = calculate_imss(&input, self.fiscal, trace.len() as u32 + 1)?;
        trace.push(result.audit_step);
        Ok(CalculatedConcept::deduction(
            ConceptKind::ImssWorker.code(),
            result.worker_total,
            trace,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ContractType, Incident, IncidentKind, PayrollPeriod, Periodicity,
    };
    use crate::orchestration::concept::ConceptCalculator;
    use crate::orchestration::run::ExtraordinaryPayments;
    use crate::test_support::{employee, loader};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly_input() -> PayrollInput {
        PayrollInput {
            run_id: "2026-01".to_string(),
            employee: employee(Money::from_units(500), date(2020, 3, 1)),
            period: PayrollPeriod::new(date(2026, 1, 1), date(2026, 1, 31), Periodicity::Monthly)
                .unwrap(),
            incidents: vec![],
            overtime_week_to_date: vec![],
            extraordinary: ExtraordinaryPayments::default(),
            concepts: vec![],
        }
    }

    fn orchestrator() -> PayrollOrchestrator {
        PayrollOrchestrator::new(loader().clone())
    }

    #[test]
    fn test_monthly_15000_payroll() {
        let outcome = orchestrator().run(&monthly_input());
        assert_eq!(outcome.status(), RunStatus::Completed);

        let result = outcome.result.unwrap();
        assert_eq!(result.concept("salary").unwrap().amount, money("15000"));
        assert_eq!(result.concept("isr").unwrap().amount, money("1402.82"));
        assert_eq!(result.concept("imss_worker").unwrap().amount, money("394.54"));
        assert!(result.concept("overtime").is_none());
        assert_eq!(result.totals.net, money("13202.64"));
        assert_eq!(result.engine_version, ENGINE_VERSION);
    }

    #[test]
    fn test_run_history() {
        let outcome = orchestrator().run(&monthly_input());
        assert_eq!(
            outcome.run.history(),
            &[
                RunStatus::Pending,
                RunStatus::Validating,
                RunStatus::Calculating,
                RunStatus::Completed
            ]
        );
    }

    #[test]
    fn test_absence_reduces_salary_and_imss_days() {
        let mut input = monthly_input();
        input.incidents.push(Incident {
            id: "a1".to_string(),
            date: date(2026, 1, 12),
            kind: IncidentKind::Absence {
                days: Quantity::ONE,
            },
        });
        let result = orchestrator().run(&input).result.unwrap();
        assert_eq!(result.concept("salary").unwrap().amount, money("14500"));
        let imss = result.concept("imss_worker").unwrap();
        assert!(imss.amount < money("394.54"));
    }

    #[test]
    fn test_overtime_is_paid_per_week() {
        let mut input = monthly_input();
        input.incidents.push(Incident {
            id: "o1".to_string(),
            date: date(2026, 1, 6),
            kind: IncidentKind::Overtime {
                hours: Quantity::from_int(12),
            },
        });
        let result = orchestrator().run(&input).result.unwrap();
        let overtime = result.concept("overtime").unwrap();
        // 9 h × 125 + 3 h × 187.50, within the weekly exemption.
        assert_eq!(overtime.amount, money("1687.50"));
        assert_eq!(overtime.exempt_amount, money("1687.50"));
        // Exempt overtime does not change the ISR base.
        assert_eq!(result.concept("isr").unwrap().amount, money("1402.82"));
    }

    #[test]
    fn test_week_split_between_biweekly_periods_is_paid_once() {
        let overtime_on = |day: u32| Incident {
            id: format!("o{}", day),
            date: date(2026, 1, day),
            kind: IncidentKind::Overtime {
                hours: Quantity::from_int(6),
            },
        };
        // ISO week 2026-W03 runs from Monday 12 to Sunday 18 January.
        let mut first = monthly_input();
        first.period =
            PayrollPeriod::new(date(2026, 1, 1), date(2026, 1, 15), Periodicity::Biweekly).unwrap();
        first.incidents.push(overtime_on(13));
        let first = orchestrator().run(&first).result.unwrap();
        assert_eq!(first.concept("overtime").unwrap().amount, money("750"));
        assert_eq!(
            first.overtime_week_to_date,
            vec![OvertimeWeekToDate {
                iso_year: 2026,
                iso_week: 3,
                hours: Quantity::from_int(6),
                exempt: money("750"),
            }]
        );

        let mut second = monthly_input();
        second.period =
            PayrollPeriod::new(date(2026, 1, 16), date(2026, 1, 31), Periodicity::Biweekly).unwrap();
        second.incidents.push(overtime_on(16));
        second.overtime_week_to_date = first.overtime_week_to_date.clone();
        let second = orchestrator().run(&second).result.unwrap();

        // 3 double hours remain, then 3 triple: 375 + 562.50.
        let overtime = second.concept("overtime").unwrap();
        assert_eq!(overtime.amount, money("937.50"));
        assert_eq!(
            first.concept("overtime").unwrap().amount.checked_add(overtime.amount).unwrap(),
            money("1687.50")
        );
        assert_eq!(second.overtime_week_to_date[0].hours, Quantity::from_int(12));
        assert_eq!(second.overtime_week_to_date[0].exempt, money("1687.50"));
    }

    #[test]
    fn test_aguinaldo_goes_to_extraordinary_isr() {
        let mut input = monthly_input();
        input.period =
            PayrollPeriod::new(date(2026, 12, 1), date(2026, 12, 31), Periodicity::Monthly).unwrap();
        input.extraordinary.aguinaldo = true;
        let result = orchestrator().run(&input).result.unwrap();

        let aguinaldo = result.concept("aguinaldo").unwrap();
        assert_eq!(aguinaldo.amount, money("7500"));
        assert_eq!(aguinaldo.taxable_amount, money("3980.70"));
        assert!(result.concept("isr_extraordinary").unwrap().amount.is_positive());
        // Ordinary ISR ignores the aguinaldo.
        assert_eq!(result.concept("isr").unwrap().amount, money("1402.82"));
    }

    #[test]
    fn test_ptu_and_vacation_premium() {
        let mut input = monthly_input();
        input.period =
            PayrollPeriod::new(date(2026, 5, 1), date(2026, 5, 31), Periodicity::Monthly).unwrap();
        input.extraordinary.ptu = Some(Money::from_units(10_000));
        input.extraordinary.vacation_days = Some(Quantity::from_int(4));
        let result = orchestrator().run(&input).result.unwrap();

        // 15 UMA = 1759.65 exempt.
        let ptu = result.concept("ptu").unwrap();
        assert_eq!(ptu.exempt_amount, money("1759.65"));
        assert_eq!(ptu.taxable_amount, money("8240.35"));
        // 25 % of 4 × 500, under its own 15-UMA cap.
        let premium = result.concept("vacation_premium").unwrap();
        assert_eq!(premium.amount, money("500"));
        assert_eq!(premium.exempt_amount, money("500"));

        let extraordinary = result.concept("isr_extraordinary").unwrap();
        assert!(extraordinary.amount.is_positive());
        assert_eq!(extraordinary.trace.len(), 1);
    }

    #[test]
    fn test_ledger_limits_second_aguinaldo_instalment() {
        let ledger = Arc::new(ExemptionLedger::new());
        let orchestrator = orchestrator().with_ledger(Arc::clone(&ledger));
        let mut input = monthly_input();
        input.period =
            PayrollPeriod::new(date(2026, 12, 1), date(2026, 12, 31), Periodicity::Monthly).unwrap();
        input.extraordinary.aguinaldo = true;

        let first = orchestrator.run(&input).result.unwrap();
        assert_eq!(first.concept("aguinaldo").unwrap().exempt_amount, money("3519.30"));

        // A retry of the same run sees its own consumption and records nothing new.
        let retry = orchestrator.run(&input).result.unwrap();
        assert_eq!(retry.concept("aguinaldo").unwrap().exempt_amount, money("3519.30"));
        assert_eq!(ledger.entries().unwrap().len(), 1);

        input.run_id = "2026-12-b".to_string();
        let second = orchestrator.run(&input).result.unwrap();
        assert_eq!(second.concept("aguinaldo").unwrap().exempt_amount, Money::ZERO);
        assert_eq!(second.concept("aguinaldo").unwrap().taxable_amount, money("7500"));
        assert_eq!(ledger.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_assimilated_has_no_imss_or_subsidy() {
        let mut input = monthly_input();
        input.employee.contract_type = ContractType::Assimilated;
        input.employee.wage.daily_salary = Money::from_units(300);
        let result = orchestrator().run(&input).result.unwrap();

        assert!(result.concept("imss_worker").is_none());
        // 9000 with the 2026 table, no subsidy: (9000 − 7168.52) × 10.88 % + 420.95
        assert_eq!(result.concept("isr").unwrap().amount, money("620.22"));
    }

    #[test]
    fn test_pre_validation_rejects() {
        let mut input = monthly_input();
        input.employee.wage.daily_salary = money("-1");
        let outcome = orchestrator().run(&input);
        assert_eq!(outcome.status(), RunStatus::Rejected);
        assert!(outcome.result.is_none());
        assert!(outcome
            .validation
            .errors
            .iter()
            .any(|e| e.code == "NEGATIVE_SALARY"));
    }

    #[test]
    fn test_unknown_year_rejects_with_error() {
        let mut input = monthly_input();
        input.period =
            PayrollPeriod::new(date(2019, 1, 1), date(2019, 1, 31), Periodicity::Monthly).unwrap();
        let outcome = orchestrator().run(&input);
        assert_eq!(outcome.status(), RunStatus::Rejected);
        assert_eq!(
            outcome.error,
            Some(EngineError::FiscalYearNotFound { year: 2019 })
        );
        assert_eq!(outcome.validation.errors[0].code, "FISCAL_YEAR_NOT_FOUND");
    }

    #[test]
    fn test_unknown_concept_is_reported_in_validation() {
        let mut input = monthly_input();
        input.concepts = vec!["salary".to_string(), "bonus".to_string()];
        let outcome = orchestrator().run(&input);

        assert_eq!(outcome.status(), RunStatus::Rejected);
        assert!(matches!(outcome.error, Some(EngineError::UnknownConcept { .. })));
        assert_eq!(outcome.validation.errors.len(), 1);
        assert_eq!(outcome.validation.errors[0].rule_id, "concept_plan");
        assert_eq!(outcome.validation.errors[0].code, "UNKNOWN_CONCEPT");
        assert!(outcome.validation.is_blocking());
    }

    struct Garnishment;

    impl ConceptCalculator for Garnishment {
        fn code(&self) -> &str {
            "garnishment"
        }

        fn class(&self) -> ConceptClass {
            ConceptClass::Withholding
        }

        fn calculate(&self, ctx: &ConceptContext<'_>) -> EngineResult<CalculatedConcept> {
            let earnings = Money::checked_sum(
                ctx.computed
                    .values()
                    .filter(|c| !c.is_deduction)
                    .map(|c| c.amount),
            )?;
            Ok(CalculatedConcept::deduction(
                "garnishment",
                earnings.checked_add(Money::from_units(1))?,
                vec![],
            ))
        }
    }

    #[test]
    fn test_plugin_runs_and_negative_net_fails_without_consuming() {
        let mut registry = ConceptRegistry::new();
        registry.register(Arc::new(Garnishment)).unwrap();
        let ledger = Arc::new(ExemptionLedger::new());
        let orchestrator = orchestrator()
            .with_registry(registry)
            .with_ledger(Arc::clone(&ledger));

        let mut input = monthly_input();
        input.period =
            PayrollPeriod::new(date(2026, 12, 1), date(2026, 12, 31), Periodicity::Monthly).unwrap();
        input.extraordinary.aguinaldo = true;
        let outcome = orchestrator.run(&input);

        assert_eq!(outcome.status(), RunStatus::Failed);
        assert_eq!(outcome.validation.errors[0].code, "NEGATIVE_NET_PAY");
        assert!(outcome.result.is_none());
        assert!(ledger.entries().unwrap().is_empty());
    }
}
