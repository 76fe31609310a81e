//! Payroll orchestration.
//!
//! A run resolves the requested concepts (built-in kinds and registered
//! plugins), orders them by dependency, validates the input, calculates
//! each concept in order and validates the result. Capped exemptions are
//! read from and appended to the [`ExemptionLedger`](crate::ledger::ExemptionLedger)
//! under the employee's lock.

mod batch;
mod concept;
mod orchestrator;
mod registry;
mod run;
mod validation;

pub use batch::{BatchOutcome, BatchSummary};
pub use concept::{ConceptCalculator, ConceptClass, ConceptContext, ConceptKind};
pub use orchestrator::{OrchestratorOptions, PayrollOrchestrator};
pub use registry::{ConceptNode, ConceptRegistry};
pub use run::{ExtraordinaryPayments, PayrollInput, PayrollRun, RunOutcome, RunStatus};
pub use validation::{
    ImssForbiddenForAssimilated, IncidentsWithinPeriod, MinimumWage, NegativeNetPay,
    NonNegativeSalary, PeriodSanity, ReportedSbcCap, RequiredConcepts, SbcBelowMinimumWage,
    ValidationContext, ValidationRule, ValidationStage, default_rules, run_rules,
};
