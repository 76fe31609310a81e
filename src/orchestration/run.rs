//! Payroll run inputs, lifecycle and outcome.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fixed_point::{Money, Quantity};
use crate::models::{
    EmployeeProfile, Incident, OvertimeWeekToDate, PayrollPeriod, PayrollResult, ValidationResult,
};

use super::concept::ConceptKind;

/// Occasional payments made in the period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraordinaryPayments {
    /// Pay the aguinaldo for the days worked in the year so far.
    #[serde(default)]
    pub aguinaldo: bool,
    /// Vacation days enjoyed in the period; their premium is paid.
    #[serde(default)]
    pub vacation_days: Option<Quantity>,
    /// PTU paid in the period.
    #[serde(default)]
    pub ptu: Option<Money>,
}

impl ExtraordinaryPayments {
    /// True when any occasional payment is made.
    pub fn any(&self) -> bool {
        self.aguinaldo || self.vacation_days.is_some() || self.ptu.is_some()
    }
}

/// Everything one employee's payroll run needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollInput {
    /// Caller-assigned run identifier, stable across retries. Ledger
    /// appends are keyed by it.
    pub run_id: String,
    /// The employee.
    pub employee: EmployeeProfile,
    /// The period.
    pub period: PayrollPeriod,
    /// Reported incidents.
    #[serde(default)]
    pub incidents: Vec<Incident>,
    /// Overtime already paid by earlier periods in the ISO weeks this
    /// period shares with them. Taken from the previous run's
    /// [`PayrollResult::overtime_week_to_date`].
    #[serde(default)]
    pub overtime_week_to_date: Vec<OvertimeWeekToDate>,
    /// Occasional payments.
    #[serde(default)]
    pub extraordinary: ExtraordinaryPayments,
    /// Concept codes to calculate. Empty means the standard set for the
    /// contract type plus every registered plugin.
    #[serde(default)]
    pub concepts: Vec<String>,
}

impl PayrollInput {
    /// The standard built-in concepts for this input.
    pub fn standard_concepts(&self) -> Vec<ConceptKind> {
        let mut kinds = vec![ConceptKind::Salary, ConceptKind::Isr];
        if self.employee.contract_type.accrues_benefits() {
            kinds.push(ConceptKind::Overtime);
            if self.extraordinary.aguinaldo {
                kinds.push(ConceptKind::Aguinaldo);
            }
            if self.extraordinary.vacation_days.is_some() {
                kinds.push(ConceptKind::VacationPremium);
            }
            if self.extraordinary.ptu.is_some() {
                kinds.push(ConceptKind::Ptu);
            }
            if self.extraordinary.any() {
                kinds.push(ConceptKind::ExtraordinaryIsr);
            }
        }
        if self.employee.contract_type.is_subject_to_imss() {
            kinds.push(ConceptKind::ImssWorker);
        }
        kinds
    }
}

/// Lifecycle of a run.
///
/// `Pending → Validating → {Rejected | Calculating} → {Completed | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, not started.
    Pending,
    /// Pre-calculation rules are running.
    Validating,
    /// A pre-calculation rule raised an error.
    Rejected,
    /// Concepts are being calculated.
    Calculating,
    /// Calculated and post-validated.
    Completed,
    /// Calculation or post-validation failed.
    Failed,
}

impl RunStatus {
    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Pending, RunStatus::Validating)
                | (RunStatus::Validating, RunStatus::Rejected)
                | (RunStatus::Validating, RunStatus::Calculating)
                | (RunStatus::Calculating, RunStatus::Completed)
                | (RunStatus::Calculating, RunStatus::Failed)
        )
    }

    /// True for the states a run ends in.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Rejected | RunStatus::Completed | RunStatus::Failed
        )
    }
}

/// A run's identity and state, with the transitions it went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollRun {
    /// The run id.
    pub run_id: String,
    /// The employee.
    pub employee_id: String,
    status: RunStatus,
    history: Vec<RunStatus>,
}

impl PayrollRun {
    /// A pending run.
    pub fn new(run_id: impl Into<String>, employee_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            employee_id: employee_id.into(),
            status: RunStatus::Pending,
            history: vec![RunStatus::Pending],
        }
    }

    /// The current state.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Every state the run has been in, oldest first.
    pub fn history(&self) -> &[RunStatus] {
        &self.history
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// * `InvalidInput` for a transition the lifecycle does not allow
    pub fn transition(&mut self, next: RunStatus) -> EngineResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(EngineError::invalid_input(
                "run_status",
                format!("cannot move from {:?} to {:?}", self.status, next),
            ));
        }
        tracing::info!(
            run_id = %self.run_id,
            employee_id = %self.employee_id,
            from = ?self.status,
            to = ?next,
            "payroll run transition"
        );
        self.status = next;
        self.history.push(next);
        Ok(())
    }
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The run and its final state.
    pub run: PayrollRun,
    /// Findings of the pre- and post-calculation rules.
    pub validation: ValidationResult,
    /// The payroll, for completed runs.
    pub result: Option<PayrollResult>,
    /// The error that failed the run.
    pub error: Option<EngineError>,
}

impl RunOutcome {
    /// The final state.
    pub fn status(&self) -> RunStatus {
        self.run.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        let mut run = PayrollRun::new("r1", "emp_001");
        run.transition(RunStatus::Validating).unwrap();
        run.transition(RunStatus::Calculating).unwrap();
        run.transition(RunStatus::Completed).unwrap();
        assert!(run.status().is_terminal());
        assert_eq!(
            run.history(),
            &[
                RunStatus::Pending,
                RunStatus::Validating,
                RunStatus::Calculating,
                RunStatus::Completed
            ]
        );
    }

    #[test]
    fn test_illegal_transitions_are_rejected() {
        let mut run = PayrollRun::new("r1", "emp_001");
        assert!(run.transition(RunStatus::Calculating).is_err());
        run.transition(RunStatus::Validating).unwrap();
        run.transition(RunStatus::Rejected).unwrap();
        assert!(run.transition(RunStatus::Calculating).is_err());
        assert_eq!(run.status(), RunStatus::Rejected);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&RunStatus::Calculating).unwrap(),
            "\"calculating\""
        );
    }
}
