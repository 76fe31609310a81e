//! Payroll concepts: the built-in kinds and the plugin trait.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::fiscal::FiscalConfig;
use crate::models::{CalculatedConcept, EmployeeProfile, IncidentSummary, PayrollPeriod};

/// How a concept takes part in the payroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptClass {
    /// Regular pay; its taxable part is the base of the ordinary ISR.
    OrdinaryEarning,
    /// Bonuses and other occasional pay, taxed under RLISR art. 174.
    ExtraordinaryEarning,
    /// A deduction computed from the earnings; runs after all of them.
    Withholding,
}

impl ConceptClass {
    /// True for both earning classes.
    pub fn is_earning(self) -> bool {
        !matches!(self, ConceptClass::Withholding)
    }
}

/// The concepts the engine computes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConceptKind {
    /// Salary for the paid days of the period.
    Salary,
    /// Overtime, split per ISO week.
    Overtime,
    /// Prima vacacional.
    VacationPremium,
    /// Aguinaldo.
    Aguinaldo,
    /// Profit sharing.
    Ptu,
    /// ISR on ordinary income, net of subsidy.
    Isr,
    /// ISR on extraordinary income.
    ExtraordinaryIsr,
    /// The worker's IMSS contributions.
    ImssWorker,
}

impl ConceptKind {
    /// Every built-in kind.
    pub const ALL: [ConceptKind; 8] = [
        ConceptKind::Salary,
        ConceptKind::Overtime,
        ConceptKind::VacationPremium,
        ConceptKind::Aguinaldo,
        ConceptKind::Ptu,
        ConceptKind::Isr,
        ConceptKind::ExtraordinaryIsr,
        ConceptKind::ImssWorker,
    ];

    /// The concept code.
    pub fn code(self) -> &'static str {
        match self {
            ConceptKind::Salary => "salary",
            ConceptKind::Overtime => "overtime",
            ConceptKind::VacationPremium => "vacation_premium",
            ConceptKind::Aguinaldo => "aguinaldo",
            ConceptKind::Ptu => "ptu",
            ConceptKind::Isr => "isr",
            ConceptKind::ExtraordinaryIsr => "isr_extraordinary",
            ConceptKind::ImssWorker => "imss_worker",
        }
    }

    /// Looks a built-in kind up by code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// The kind's class.
    pub fn class(self) -> ConceptClass {
        match self {
            ConceptKind::Salary | ConceptKind::Overtime => ConceptClass::OrdinaryEarning,
            ConceptKind::VacationPremium | ConceptKind::Aguinaldo | ConceptKind::Ptu => {
                ConceptClass::ExtraordinaryEarning
            }
            ConceptKind::Isr | ConceptKind::ExtraordinaryIsr | ConceptKind::ImssWorker => {
                ConceptClass::Withholding
            }
        }
    }

    /// Explicit dependencies. Withholdings also depend on every earning in
    /// the run.
    pub fn dependencies(self) -> &'static [ConceptKind] {
        match self {
            ConceptKind::Isr | ConceptKind::ExtraordinaryIsr => &[ConceptKind::Salary],
            ConceptKind::Salary
            | ConceptKind::Overtime
            | ConceptKind::VacationPremium
            | ConceptKind::Aguinaldo
            | ConceptKind::Ptu
            | ConceptKind::ImssWorker => &[],
        }
    }
}

impl fmt::Display for ConceptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// What a plugin concept can see when it is calculated.
#[derive(Debug, Clone, Copy)]
pub struct ConceptContext<'a> {
    /// The employee.
    pub employee: &'a EmployeeProfile,
    /// The pay period.
    pub period: &'a PayrollPeriod,
    /// The period's fiscal year.
    pub fiscal: &'a FiscalConfig,
    /// The period's incidents, aggregated.
    pub incidents: &'a IncidentSummary,
    /// Concepts already calculated, by code.
    pub computed: &'a BTreeMap<String, CalculatedConcept>,
}

impl ConceptContext<'_> {
    /// A concept calculated earlier in this run.
    pub fn computed(&self, code: &str) -> Option<&CalculatedConcept> {
        self.computed.get(code)
    }
}

/// A client-defined concept.
///
/// Plugins are calculated in dependency order with the built-ins. An
/// [`ConceptClass::OrdinaryEarning`] plugin's taxable part joins the
/// ordinary ISR base; an extraordinary one joins the RLISR art. 174 base.
pub trait ConceptCalculator: Send + Sync {
    /// Unique concept code; must not collide with a built-in code.
    fn code(&self) -> &str;

    /// The concept's class.
    fn class(&self) -> ConceptClass;

    /// Codes this concept reads from [`ConceptContext::computed`].
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Calculates the concept.
    fn calculate(&self, ctx: &ConceptContext<'_>) -> EngineResult<CalculatedConcept>;
}
