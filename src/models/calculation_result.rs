//! Calculation result models for the payroll engine.
//!
//! This module contains the [`PayrollResult`] type and its associated
//! structures: calculated concepts with their taxable/exempt split, the
//! audit trace every concept carries, and the validation findings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::fixed_point::Money;

use super::{OvertimeWeekToDate, PayrollPeriod};

/// A single step in the audit trace recording a calculation decision.
///
/// Each step captures the input, output, and reasoning for a rule application.
///
/// # Example
///
/// ```
/// use nomina_engine::models::AuditStep;
///
/// let step = AuditStep {
///     step_number: 1,
///     rule_id: "isr_bracket_lookup".to_string(),
///     rule_name: "ISR Bracket Lookup".to_string(),
///     legal_ref: "LISR art. 96".to_string(),
///     input: serde_json::json!({ "income": "15000.0000" }),
///     output: serde_json::json!({ "lower": "14644.6500" }),
///     reasoning: "Income falls in the row starting at 14644.65".to_string(),
/// };
/// assert_eq!(step.step_number, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// Reference to the statute or regulation for this rule.
    pub legal_ref: String,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// Renumbers a list of audit steps so they run `start, start + 1, ...`.
pub fn renumber_steps(steps: &mut [AuditStep], start: u32) {
    for (offset, step) in steps.iter_mut().enumerate() {
        step.step_number = start + offset as u32;
    }
}

/// One earning or deduction in a payroll result.
///
/// For earnings `amount = taxable_amount + exempt_amount`; deductions carry
/// their whole amount as neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatedConcept {
    /// Concept code, e.g. `salary` or `isr`.
    pub concept_code: String,
    /// Amount paid or withheld.
    pub amount: Money,
    /// Portion subject to ordinary ISR.
    pub taxable_amount: Money,
    /// Portion exempt from ISR.
    pub exempt_amount: Money,
    /// Whether this concept is withheld from the employee.
    pub is_deduction: bool,
    /// Ordered audit steps explaining the amount.
    pub trace: Vec<AuditStep>,
}

impl CalculatedConcept {
    /// An earning split into taxable and exempt parts.
    pub fn earning(
        code: impl Into<String>,
        taxable_amount: Money,
        exempt_amount: Money,
        trace: Vec<AuditStep>,
    ) -> EngineResult<Self> {
        Ok(Self {
            concept_code: code.into(),
            amount: taxable_amount.checked_add(exempt_amount)?,
            taxable_amount,
            exempt_amount,
            is_deduction: false,
            trace,
        })
    }

    /// A deduction withheld from the employee.
    pub fn deduction(code: impl Into<String>, amount: Money, trace: Vec<AuditStep>) -> Self {
        Self {
            concept_code: code.into(),
            amount,
            taxable_amount: Money::ZERO,
            exempt_amount: Money::ZERO,
            is_deduction: true,
            trace,
        }
    }
}

/// A blocking business-rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// The rule that produced the finding.
    pub rule_id: String,
    /// A code identifying the violation.
    pub code: String,
    /// A human-readable description.
    pub message: String,
}

/// A non-blocking finding attached to the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// The rule that produced the finding.
    pub rule_id: String,
    /// A code identifying the warning.
    pub code: String,
    /// A human-readable description.
    pub message: String,
}

/// Findings of a validation pass. Errors block persistence; warnings do not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Blocking errors.
    pub errors: Vec<ValidationError>,
    /// Non-blocking warnings.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Returns true when any error was found.
    pub fn is_blocking(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Appends another result's findings.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Records an error.
    pub fn error(&mut self, rule_id: &str, code: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            rule_id: rule_id.to_string(),
            code: code.to_string(),
            message: message.into(),
        });
    }

    /// Records a warning.
    pub fn warning(&mut self, rule_id: &str, code: &str, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            rule_id: rule_id.to_string(),
            code: code.to_string(),
            message: message.into(),
        });
    }
}

/// Aggregated totals of a payroll result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollTotals {
    /// Sum of all earnings.
    pub earnings: Money,
    /// Taxable part of the earnings.
    pub taxable: Money,
    /// Exempt part of the earnings.
    pub exempt: Money,
    /// Sum of all deductions.
    pub deductions: Money,
    /// `earnings - deductions`.
    pub net: Money,
}

impl PayrollTotals {
    /// Sums a list of concepts.
    pub fn from_concepts(concepts: &[CalculatedConcept]) -> EngineResult<Self> {
        let mut totals = PayrollTotals::default();
        for concept in concepts {
            if concept.is_deduction {
                totals.deductions = totals.deductions.checked_add(concept.amount)?;
            } else {
                totals.earnings = totals.earnings.checked_add(concept.amount)?;
                totals.taxable = totals.taxable.checked_add(concept.taxable_amount)?;
                totals.exempt = totals.exempt.checked_add(concept.exempt_amount)?;
            }
        }
        totals.net = totals.earnings.checked_sub(totals.deductions)?;
        Ok(totals)
    }
}

/// The complete result of one employee's payroll for one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollResult {
    /// Unique identifier for this calculation.
    pub calculation_id: Uuid,
    /// When the calculation was performed.
    pub timestamp: DateTime<Utc>,
    /// The version of the engine that performed the calculation.
    pub engine_version: String,
    /// The ID of the employee the calculation is for.
    pub employee_id: String,
    /// The pay period.
    pub period: PayrollPeriod,
    /// The fiscal year whose tables were used.
    pub fiscal_year: i32,
    /// Concepts in calculation order.
    pub concepts: Vec<CalculatedConcept>,
    /// Aggregated totals.
    pub totals: PayrollTotals,
    /// Non-blocking findings.
    pub warnings: Vec<ValidationWarning>,
    /// Overtime paid so far in each ISO week with overtime in the period,
    /// including what earlier periods paid.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overtime_week_to_date: Vec<OvertimeWeekToDate>,
}

impl PayrollResult {
    /// Finds a concept by code.
    pub fn concept(&self, code: &str) -> Option<&CalculatedConcept> {
        self.concepts.iter().find(|c| c.concept_code == code)
    }
}
