//! Exemption-cap ledger.
//!
//! Several exemptions are capped per fiscal year (or month) and consumed
//! across many payroll runs: an aguinaldo paid in two instalments shares one
//! 30-UMA ceiling. The ledger is an append-only record of what each employee
//! has consumed against each cap. Appends are keyed, so retrying a run never
//! consumes twice.
//!
//! Read-calculate-append for one employee must not interleave with another
//! run for the same employee; [`ExemptionLedger::with_employee`] holds that
//! employee's lock for the whole closure.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fiscal::FiscalConfig;
use crate::fixed_point::Money;

/// Cap id of the aguinaldo exemption.
pub const AGUINALDO_CAP: &str = "aguinaldo";
/// Cap id of the prima vacacional exemption.
pub const VACATION_PREMIUM_CAP: &str = "vacation_premium";
/// Cap id of the PTU exemption.
pub const PTU_CAP: &str = "ptu";

/// A capped exemption with its limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExemptionCap {
    /// Identifier shared by every ledger entry against this cap.
    pub id: String,
    /// Limit per fiscal year.
    pub annual_limit: Option<Money>,
    /// Limit per calendar month.
    pub monthly_limit: Option<Money>,
}

impl ExemptionCap {
    /// A cap with only an annual limit.
    pub fn annual(id: impl Into<String>, limit: Money) -> Self {
        Self {
            id: id.into(),
            annual_limit: Some(limit),
            monthly_limit: None,
        }
    }

    /// The annual caps a fiscal year defines.
    pub fn statutory(fiscal: &FiscalConfig) -> EngineResult<Vec<ExemptionCap>> {
        Ok(vec![
            ExemptionCap::annual(AGUINALDO_CAP, fiscal.aguinaldo_exempt_cap()?),
            ExemptionCap::annual(VACATION_PREMIUM_CAP, fiscal.vacation_premium_exempt_cap()?),
            ExemptionCap::annual(PTU_CAP, fiscal.ptu_exempt_cap()?),
        ])
    }
}

/// A consumption window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "window")]
pub enum CapWindow {
    /// A whole fiscal year.
    Annual {
        /// The fiscal year.
        fiscal_year: i32,
    },
    /// One month of a fiscal year.
    Monthly {
        /// The fiscal year.
        fiscal_year: i32,
        /// The month, 1 to 12.
        month: u32,
    },
}

impl CapWindow {
    fn contains(&self, entry: &LedgerEntry) -> bool {
        match *self {
            CapWindow::Annual { fiscal_year } => entry.fiscal_year == fiscal_year,
            CapWindow::Monthly { fiscal_year, month } => {
                entry.fiscal_year == fiscal_year && entry.month == Some(month)
            }
        }
    }
}

/// A cap's cumulative consumption after an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumedTotals {
    /// Consumed in the entry's fiscal year.
    pub annual: Money,
    /// Consumed in the entry's month, for entries recorded with one.
    pub monthly: Option<Money>,
}

/// One recorded consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// The employee.
    pub employee_id: String,
    /// The cap consumed against.
    pub concept_cap_id: String,
    /// Fiscal year of the consumption.
    pub fiscal_year: i32,
    /// Month of the consumption, when known.
    pub month: Option<u32>,
    /// Exempt amount consumed.
    pub consumed_amount: Money,
    /// Unique key of the append.
    pub idempotency_key: String,
    /// When the entry was first recorded.
    pub recorded_at: DateTime<Utc>,
}

/// One employee's entries, accessed under that employee's lock.
#[derive(Debug, Default)]
pub struct EmployeeLedger {
    employee_id: String,
    entries: Vec<LedgerEntry>,
    by_key: HashMap<String, usize>,
}

impl EmployeeLedger {
    fn new(employee_id: &str) -> Self {
        Self {
            employee_id: employee_id.to_string(),
            ..Self::default()
        }
    }

    /// The entry recorded under `idempotency_key`, if any.
    pub fn recorded(&self, idempotency_key: &str) -> Option<&LedgerEntry> {
        self.by_key
            .get(idempotency_key)
            .and_then(|&index| self.entries.get(index))
    }

    /// Total consumed against `cap_id` within `window`.
    pub fn consumed(&self, cap_id: &str, window: CapWindow) -> EngineResult<Money> {
        Money::checked_sum(
            self.entries
                .iter()
                .filter(|e| e.concept_cap_id == cap_id && window.contains(e))
                .map(|e| e.consumed_amount),
        )
    }

    /// What remains of `cap` for a consumption in `fiscal_year` (and `month`).
    ///
    /// Each limited window gives `max(0, limit − consumed)`; the result is
    /// the minimum over them, or `None` when the cap has no limit at all.
    pub fn available(
        &self,
        cap: &ExemptionCap,
        fiscal_year: i32,
        month: Option<u32>,
    ) -> EngineResult<Option<Money>> {
        let mut available: Option<Money> = None;
        if let Some(limit) = cap.annual_limit {
            let used = self.consumed(&cap.id, CapWindow::Annual { fiscal_year })?;
            available = Some(limit.checked_sub(used)?.non_negative());
        }
        if let (Some(limit), Some(month)) = (cap.monthly_limit, month) {
            let used = self.consumed(&cap.id, CapWindow::Monthly { fiscal_year, month })?;
            let remaining = limit.checked_sub(used)?.non_negative();
            available = Some(available.map_or(remaining, |a| a.min(remaining)));
        }
        Ok(available)
    }

    /// Cumulative consumption of `cap_id` in the windows of an entry.
    pub fn totals(
        &self,
        cap_id: &str,
        fiscal_year: i32,
        month: Option<u32>,
    ) -> EngineResult<ConsumedTotals> {
        let annual = self.consumed(cap_id, CapWindow::Annual { fiscal_year })?;
        let monthly = month
            .map(|month| self.consumed(cap_id, CapWindow::Monthly { fiscal_year, month }))
            .transpose()?;
        Ok(ConsumedTotals { annual, monthly })
    }

    /// Appends a consumption and returns the cap's cumulative consumption
    /// in the entry's year and, when it has one, its month.
    ///
    /// Replaying a key with the same cap, year, month and amount changes
    /// nothing.
    ///
    /// # Errors
    ///
    /// * `InvalidInput` for a negative amount or a month outside 1..=12
    /// * `LedgerConflict` when the key was recorded with a different cap,
    ///   year, month or amount
    pub fn consume(
        &mut self,
        cap_id: &str,
        fiscal_year: i32,
        month: Option<u32>,
        amount: Money,
        idempotency_key: &str,
    ) -> EngineResult<ConsumedTotals> {
        if amount.is_negative() {
            return Err(EngineError::invalid_input(
                "consumed_amount",
                format!("must not be negative, got {}", amount),
            ));
        }
        if let Some(m) = month.filter(|m| !(1..=12).contains(m)) {
            return Err(EngineError::invalid_input(
                "month",
                format!("must be between 1 and 12, got {}", m),
            ));
        }

        if let Some(existing) = self.recorded(idempotency_key) {
            let same = existing.consumed_amount == amount
                && existing.concept_cap_id == cap_id
                && existing.fiscal_year == fiscal_year
                && existing.month == month;
            if !same {
                tracing::warn!(
                    employee_id = %self.employee_id,
                    key = idempotency_key,
                    recorded = %existing.consumed_amount,
                    attempted = %amount,
                    "ledger key replayed with a different consumption"
                );
                return Err(EngineError::LedgerConflict {
                    key: idempotency_key.to_string(),
                    message: format!(
                        "recorded {} against '{}' in {}/{:?}, attempted {} against '{}' in {}/{:?}",
                        existing.consumed_amount,
                        existing.concept_cap_id,
                        existing.fiscal_year,
                        existing.month,
                        amount,
                        cap_id,
                        fiscal_year,
                        month
                    ),
                });
            }
            return self.totals(cap_id, fiscal_year, month);
        }

        self.push(LedgerEntry {
            employee_id: self.employee_id.clone(),
            concept_cap_id: cap_id.to_string(),
            fiscal_year,
            month,
            consumed_amount: amount,
            idempotency_key: idempotency_key.to_string(),
            recorded_at: Utc::now(),
        });
        self.totals(cap_id, fiscal_year, month)
    }

    fn push(&mut self, entry: LedgerEntry) {
        self.by_key
            .insert(entry.idempotency_key.clone(), self.entries.len());
        self.entries.push(entry);
    }
}

/// The shared ledger, locked per employee.
#[derive(Debug, Default)]
pub struct ExemptionLedger {
    employees: Mutex<HashMap<String, Arc<Mutex<EmployeeLedger>>>>,
}

fn unavailable<T>(_: std::sync::PoisonError<T>) -> EngineError {
    EngineError::LedgerUnavailable {
        message: "a ledger lock holder panicked".to_string(),
    }
}

impl ExemptionLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from persisted entries.
    ///
    /// # Errors
    ///
    /// * `LedgerConflict` when two entries of one employee share a key
    pub fn from_entries(entries: impl IntoIterator<Item = LedgerEntry>) -> EngineResult<Self> {
        let ledger = Self::new();
        for entry in entries {
            let employee_id = entry.employee_id.clone();
            ledger.with_employee(&employee_id, |employee| {
                if employee.by_key.contains_key(&entry.idempotency_key) {
                    return Err(EngineError::LedgerConflict {
                        key: entry.idempotency_key.clone(),
                        message: "duplicate key in persisted entries".to_string(),
                    });
                }
                employee.push(entry);
                Ok(())
            })?;
        }
        Ok(ledger)
    }

    fn employee(&self, employee_id: &str) -> EngineResult<Arc<Mutex<EmployeeLedger>>> {
        let mut employees = self.employees.lock().map_err(unavailable)?;
        Ok(Arc::clone(
            employees
                .entry(employee_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(EmployeeLedger::new(employee_id)))),
        ))
    }

    /// Runs `f` while holding `employee_id`'s lock.
    ///
    /// Other employees are not blocked.
    pub fn with_employee<R>(
        &self,
        employee_id: &str,
        f: impl FnOnce(&mut EmployeeLedger) -> EngineResult<R>,
    ) -> EngineResult<R> {
        let employee = self.employee(employee_id)?;
        let mut guard: MutexGuard<'_, EmployeeLedger> = employee.lock().map_err(unavailable)?;
        f(&mut guard)
    }

    /// See [`EmployeeLedger::consume`].
    pub fn consume(
        &self,
        employee_id: &str,
        cap_id: &str,
        fiscal_year: i32,
        month: Option<u32>,
        amount: Money,
        idempotency_key: &str,
    ) -> EngineResult<ConsumedTotals> {
        self.with_employee(employee_id, |ledger| {
            ledger.consume(cap_id, fiscal_year, month, amount, idempotency_key)
        })
    }

    /// See [`EmployeeLedger::consumed`].
    pub fn consumed(&self, employee_id: &str, cap_id: &str, window: CapWindow) -> EngineResult<Money> {
        self.with_employee(employee_id, |ledger| ledger.consumed(cap_id, window))
    }

    /// See [`EmployeeLedger::available`].
    pub fn available(
        &self,
        employee_id: &str,
        cap: &ExemptionCap,
        fiscal_year: i32,
        month: Option<u32>,
    ) -> EngineResult<Option<Money>> {
        self.with_employee(employee_id, |ledger| ledger.available(cap, fiscal_year, month))
    }

    /// Every entry, grouped by employee id in ascending order and in
    /// append order within an employee.
    pub fn entries(&self) -> EngineResult<Vec<LedgerEntry>> {
        let employees: Vec<(String, Arc<Mutex<EmployeeLedger>>)> = {
            let map = self.employees.lock().map_err(unavailable)?;
            let mut pairs: Vec<_> = map
                .iter()
                .map(|(id, ledger)| (id.clone(), Arc::clone(ledger)))
                .collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            pairs
        };
        let mut entries = Vec::new();
        for (_, ledger) in employees {
            let guard = ledger.lock().map_err(unavailable)?;
            entries.extend(guard.entries.iter().cloned());
        }
        Ok(entries)
    }
}
