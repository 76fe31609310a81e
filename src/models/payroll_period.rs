//! Payroll period model.
//!
//! This module contains the [`PayrollPeriod`] and [`Periodicity`] types that
//! define the calculation window and drive period-to-period conversion of
//! tax tables.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fiscal::DAYS_PER_FISCAL_MONTH;
use crate::fixed_point::Quantity;

/// How often the employee is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Periodicity {
    /// One day.
    Daily,
    /// Seven days.
    Weekly,
    /// Ten days (decenal).
    TenDay,
    /// Fifteen days (quincenal).
    Biweekly,
    /// A calendar month.
    Monthly,
}

impl Periodicity {
    /// Standard number of paid days.
    pub fn standard_days(self) -> Quantity {
        match self {
            Periodicity::Daily => Quantity::from_int(1),
            Periodicity::Weekly => Quantity::from_int(7),
            Periodicity::TenDay => Quantity::from_int(10),
            Periodicity::Biweekly => Quantity::from_int(15),
            Periodicity::Monthly => Quantity::from_int(30),
        }
    }
}

/// A pay period.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use nomina_engine::fixed_point::Quantity;
/// use nomina_engine::models::{PayrollPeriod, Periodicity};
///
/// let period = PayrollPeriod::new(
///     NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
///     Periodicity::Biweekly,
/// )
/// .unwrap();
///
/// assert_eq!(period.days_in_period, Quantity::from_int(15));
/// assert_eq!(period.fiscal_year(), 2026);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollPeriod {
    /// First day, inclusive.
    pub start: NaiveDate,
    /// Last day, inclusive.
    pub end: NaiveDate,
    /// Periodicity.
    pub periodicity: Periodicity,
    /// Paid days in the period.
    pub days_in_period: Quantity,
}

impl PayrollPeriod {
    /// Builds a period whose paid days follow the periodicity's standard
    /// (a monthly period always pays 30 days).
    pub fn new(start: NaiveDate, end: NaiveDate, periodicity: Periodicity) -> EngineResult<Self> {
        let period = Self {
            start,
            end,
            periodicity,
            days_in_period: periodicity.standard_days(),
        };
        period.validate()?;
        Ok(period)
    }

    /// Checks that the dates are ordered and the paid days are positive.
    pub fn validate(&self) -> EngineResult<()> {
        if self.end < self.start {
            return Err(EngineError::invalid_input(
                "period",
                format!("end {} precedes start {}", self.end, self.start),
            ));
        }
        if !self.days_in_period.is_positive() {
            return Err(EngineError::invalid_input(
                "days_in_period",
                format!("must be positive, got {}", self.days_in_period),
            ));
        }
        Ok(())
    }

    /// The fiscal year the period is taxed in: the year of its last day.
    pub fn fiscal_year(&self) -> i32 {
        self.end.year()
    }

    /// Calendar days covered, both ends inclusive.
    pub fn calendar_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Whether `date` falls within the period, inclusive of both ends.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Days the ISR tariff is scaled to: 30.4 for monthly periods, the paid
    /// days otherwise.
    pub fn tax_table_days(&self) -> Quantity {
        match self.periodicity {
            Periodicity::Monthly => DAYS_PER_FISCAL_MONTH,
            _ => self.days_in_period,
        }
    }
}
