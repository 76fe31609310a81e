//! Reported attendance events.

use chrono::{Datelike, IsoWeek, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::EngineResult;
use crate::fixed_point::{Money, Quantity};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum IncidentKind {
    /// Overtime hours worked on the date.
    Overtime {
        /// Hours.
        hours: Quantity,
    },
    /// Unjustified absence.
    Absence {
        /// Days.
        days: Quantity,
    },
    /// Leave of absence.
    Leave {
        /// Days.
        days: Quantity,
        /// Whether the leave is paid.
        paid: bool,
    },
    /// IMSS-certified disability (incapacidad).
    Disability {
        /// Days.
        days: Quantity,
    },
}

/// One reported event for one employee in one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    /// Identifier from the reporting system.
    pub id: String,
    /// Date of the event.
    pub date: NaiveDate,
    /// The event.
    pub kind: IncidentKind,
}

/// Overtime already paid in one ISO week, carried between periods.
///
/// A week that straddles two periods shares one 9-hour double-rate
/// allowance and one exemption ceiling. The run that pays the first part of
/// the week reports its week-to-date totals; the next run receives them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeWeekToDate {
    /// ISO week-numbering year.
    pub iso_year: i32,
    /// ISO week, 1 to 53.
    pub iso_week: u32,
    /// Overtime hours paid in the week so far.
    pub hours: Quantity,
    /// Exempt overtime pay granted in the week so far.
    pub exempt: Money,
}

impl OvertimeWeekToDate {
    /// Nothing paid yet in the week.
    pub fn empty(iso_year: i32, iso_week: u32) -> Self {
        Self {
            iso_year,
            iso_week,
            hours: Quantity::ZERO,
            exempt: Money::ZERO,
        }
    }

    /// The `(iso_year, iso_week)` key used by [`IncidentSummary`].
    pub fn week(&self) -> (i32, u32) {
        (self.iso_year, self.iso_week)
    }
}

/// Totals of the incidents reported for a period.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncidentSummary {
    /// Overtime hours grouped by ISO week, in week order.
    pub overtime_by_week: BTreeMap<(i32, u32), Quantity>,
    /// Unjustified absence days.
    pub absence_days: Quantity,
    /// Unpaid leave days.
    pub unpaid_leave_days: Quantity,
    /// Disability days.
    pub disability_days: Quantity,
}

impl IncidentSummary {
    /// Folds the incidents into per-kind totals.
    pub fn from_incidents(incidents: &[Incident]) -> EngineResult<Self> {
        let mut summary = IncidentSummary::default();
        for incident in incidents {
            match incident.kind {
                IncidentKind::Overtime { hours } => {
                    let week: IsoWeek = incident.date.iso_week();
                    let entry = summary
                        .overtime_by_week
                        .entry((week.year(), week.week()))
                        .or_insert(Quantity::ZERO);
                    *entry = entry.checked_add(hours)?;
                }
                IncidentKind::Absence { days } => {
                    summary.absence_days = summary.absence_days.checked_add(days)?;
                }
                IncidentKind::Leave { days, paid: false } => {
                    summary.unpaid_leave_days = summary.unpaid_leave_days.checked_add(days)?;
                }
                IncidentKind::Leave { paid: true, .. } => {}
                IncidentKind::Disability { days } => {
                    summary.disability_days = summary.disability_days.checked_add(days)?;
                }
            }
        }
        Ok(summary)
    }

    /// Days that are not paid as salary: absences, unpaid leave and disability.
    pub fn unpaid_days(&self) -> EngineResult<Quantity> {
        self.absence_days
            .checked_add(self.unpaid_leave_days)?
            .checked_add(self.disability_days)
    }

    /// Total overtime hours.
    pub fn overtime_hours(&self) -> EngineResult<Quantity> {
        self.overtime_by_week
            .values()
            .try_fold(Quantity::ZERO, |acc, hours| acc.checked_add(*hours))
    }
}
