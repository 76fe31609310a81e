//! Core data models for the payroll engine.
//!
//! This module contains all the domain models used throughout the engine.

mod calculation_result;
mod employee;
mod incident;
mod payroll_period;

pub use calculation_result::{
    AuditStep, CalculatedConcept, PayrollResult, PayrollTotals, ValidationError,
    ValidationResult, ValidationWarning, renumber_steps,
};
pub use employee::{ContractType, EmployeeProfile, WageFacts};
pub use incident::{Incident, IncidentKind, IncidentSummary, OvertimeWeekToDate};
pub use payroll_period::{PayrollPeriod, Periodicity};
