//! Employee model and related types.
//!
//! This module defines the [`EmployeeProfile`], its [`WageFacts`] and the
//! [`ContractType`] enum for representing workers on the payroll.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fixed_point::{Money, Quantity, Rate, RoundingMode};

/// The legal nature of the working relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    /// Indefinite-term employment.
    Indefinite,
    /// Fixed-term employment (obra o tiempo determinado).
    FixedTerm,
    /// Seasonal employment.
    Seasonal,
    /// Income assimilated to salary (asimilados): ISR only, no IMSS.
    Assimilated,
}

impl ContractType {
    /// Returns true when the relationship is registered with IMSS.
    pub fn is_subject_to_imss(self) -> bool {
        !matches!(self, ContractType::Assimilated)
    }

    /// Returns true when the worker accrues statutory benefits
    /// (aguinaldo, vacations, PTU).
    pub fn accrues_benefits(self) -> bool {
        !matches!(self, ContractType::Assimilated)
    }
}

fn default_daily_hours() -> Quantity {
    Quantity::from_int(8)
}

/// The wage facts SDI, SBC and the benefit calculators read.
///
/// Owned by the external employee record and passed by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WageFacts {
    /// Ordinary daily salary.
    pub daily_salary: Money,
    /// Explicit integration factor; when present SDI = salary × factor.
    #[serde(default)]
    pub integration_factor: Option<Quantity>,
    /// Vacation days for the current service year.
    pub vacation_days: Quantity,
    /// Aguinaldo days per year.
    pub aguinaldo_days: Quantity,
    /// Prima vacacional rate.
    pub vacation_premium_rate: Rate,
    /// Other fringe benefits paid per year that integrate into the SDI.
    #[serde(default)]
    pub other_annual_benefits: Money,
    /// Ordinary hours per working day.
    #[serde(default = "default_daily_hours")]
    pub daily_hours: Quantity,
    /// SBC currently registered with IMSS, if any.
    #[serde(default)]
    pub reported_sbc_daily: Option<Money>,
}

impl WageFacts {
    /// Statutory minimum benefits for a first-year worker: 12 vacation days,
    /// 15 aguinaldo days, 25 % prima vacacional, 8-hour days.
    ///
    /// # Examples
    ///
    /// ```
    /// use nomina_engine::fixed_point::{Money, Quantity};
    /// use nomina_engine::models::WageFacts;
    ///
    /// let facts = WageFacts::statutory_minimum(Money::from_units(500));
    /// assert_eq!(facts.aguinaldo_days, Quantity::from_int(15));
    /// ```
    pub fn statutory_minimum(daily_salary: Money) -> Self {
        Self {
            daily_salary,
            integration_factor: None,
            vacation_days: Quantity::from_int(12),
            aguinaldo_days: Quantity::from_int(15),
            vacation_premium_rate: Rate::from_bp(2_500),
            other_annual_benefits: Money::ZERO,
            daily_hours: default_daily_hours(),
            reported_sbc_daily: None,
        }
    }

    /// The ordinary hourly rate: daily salary / daily hours.
    pub fn hourly_rate(&self, mode: RoundingMode) -> EngineResult<Money> {
        if !self.daily_hours.is_positive() {
            return Err(EngineError::invalid_input(
                "daily_hours",
                format!("must be positive, got {}", self.daily_hours),
            ));
        }
        self.daily_salary.div_quantity(self.daily_hours, mode)
    }
}

/// An employee on the payroll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    /// Unique identifier for the employee.
    pub id: String,
    /// The kind of contract.
    pub contract_type: ContractType,
    /// Date the relationship started.
    pub hire_date: NaiveDate,
    /// Wage facts.
    pub wage: WageFacts,
    /// Whether the workplace is in the northern border free zone.
    #[serde(default)]
    pub border_zone: bool,
}

impl EmployeeProfile {
    /// Days of service from the hire date to `as_of`, both inclusive.
    ///
    /// Fails when `as_of` precedes the hire date.
    pub fn days_of_service(&self, as_of: NaiveDate) -> EngineResult<i64> {
        let days = (as_of - self.hire_date).num_days() + 1;
        if days <= 0 {
            return Err(EngineError::invalid_input(
                "as_of",
                format!("{} precedes hire date {}", as_of, self.hire_date),
            ));
        }
        Ok(days)
    }

    /// Completed anniversaries at `as_of`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use nomina_engine::fixed_point::Money;
    /// use nomina_engine::models::{ContractType, EmployeeProfile, WageFacts};
    ///
    /// let employee = EmployeeProfile {
    ///     id: "emp_001".to_string(),
    ///     contract_type: ContractType::Indefinite,
    ///     hire_date: NaiveDate::from_ymd_opt(2020, 3, 15).unwrap(),
    ///     wage: WageFacts::statutory_minimum(Money::from_units(400)),
    ///     border_zone: false,
    /// };
    /// let as_of = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
    /// assert_eq!(employee.completed_years(as_of), 5);
    /// ```
    pub fn completed_years(&self, as_of: NaiveDate) -> u32 {
        let mut years = as_of.year() - self.hire_date.year();
        if (as_of.month(), as_of.day()) < (self.hire_date.month(), self.hire_date.day()) {
            years -= 1;
        }
        years.max(0) as u32
    }
}
