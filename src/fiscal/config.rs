//! The year-scoped fiscal configuration bundle.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fixed_point::{Money, Quantity, RoundingMode};

use super::contributions::{CesantiaEmployerTable, ContributionRate};
use super::tables::{IsrTable, SubsidyTable};

/// Days in the fiscal month used to derive period tables (30.4).
pub const DAYS_PER_FISCAL_MONTH: Quantity = Quantity::from_raw(304_000);

/// Days per year used to spread annual benefits into the SDI (365.25).
pub const SDI_DAYS_PER_YEAR: Quantity = Quantity::from_raw(3_652_500);

/// Calendar days per year used by the extraordinary-income method.
pub const CALENDAR_DAYS_PER_YEAR: Quantity = Quantity::from_raw(3_650_000);

/// Rounding modes per legal context.
///
/// Intermediate values keep four decimals; these modes govern the single
/// cent rounding applied to externally visible amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundingPolicy {
    /// Sub-money-bp residue of intermediate products.
    pub intermediate: RoundingMode,
    /// Withheld ISR.
    pub isr: RoundingMode,
    /// IMSS contributions.
    pub imss: RoundingMode,
    /// Earnings paid to the employee.
    pub payments: RoundingMode,
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        Self {
            intermediate: RoundingMode::HalfEven,
            isr: RoundingMode::HalfUp,
            imss: RoundingMode::HalfUp,
            payments: RoundingMode::HalfUp,
        }
    }
}

/// Statutory exemption ceilings, expressed in reference units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExemptionLimits {
    /// Aguinaldo exempt up to this many daily UMAs per year.
    pub aguinaldo_uma_days: Quantity,
    /// Prima vacacional exempt up to this many daily UMAs per year.
    pub vacation_premium_uma_days: Quantity,
    /// PTU exempt up to this many daily UMAs per year.
    pub ptu_uma_days: Quantity,
    /// Overtime exempt up to this many daily minimum wages, times seven, per week.
    pub overtime_weekly_minimum_wages: Quantity,
    /// Indemnities exempt up to this many UMAs per year of service.
    pub severance_uma_per_year: Quantity,
}

impl Default for ExemptionLimits {
    fn default() -> Self {
        Self {
            aguinaldo_uma_days: Quantity::from_int(30),
            vacation_premium_uma_days: Quantity::from_int(15),
            ptu_uma_days: Quantity::from_int(15),
            overtime_weekly_minimum_wages: Quantity::from_int(5),
            severance_uma_per_year: Quantity::from_int(90),
        }
    }
}

/// Everything the calculators need for one fiscal year.
///
/// Loaded once per year and never mutated; a new year is a new value. The
/// caller resolves the year explicitly and passes this bundle to every
/// calculator, so tables of different years cannot be mixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiscalConfig {
    /// The fiscal year.
    pub year: i32,
    /// Daily UMA.
    pub uma_daily: Money,
    /// Monthly UMA.
    pub uma_monthly: Money,
    /// Annual UMA.
    pub uma_annual: Money,
    /// General daily minimum wage.
    pub minimum_wage_daily: Money,
    /// Daily minimum wage in the northern border free zone.
    pub minimum_wage_border_daily: Money,
    /// SBC ceiling as a multiple of the daily UMA (25).
    pub sbc_cap_in_uma_multiples: Quantity,
    /// Monthly ISR tariff.
    pub isr_monthly: IsrTable,
    /// Annual ISR tariff.
    pub isr_annual: IsrTable,
    /// Monthly employment subsidy table.
    pub subsidy_monthly: SubsidyTable,
    /// IMSS contribution lines.
    pub imss_branches: Vec<ContributionRate>,
    /// Employer cesantía y vejez bands.
    pub cesantia_employer: CesantiaEmployerTable,
    /// Exemption ceilings.
    pub exemptions: ExemptionLimits,
    /// Rounding per legal context.
    pub rounding: RoundingPolicy,
}

impl FiscalConfig {
    /// The SBC ceiling in money: `uma_daily × sbc_cap_in_uma_multiples`.
    pub fn sbc_cap_daily(&self) -> EngineResult<Money> {
        self.uma_daily
            .times(self.sbc_cap_in_uma_multiples, self.rounding.intermediate)
    }

    /// The applicable daily minimum wage.
    pub fn minimum_wage(&self, border_zone: bool) -> Money {
        if border_zone {
            self.minimum_wage_border_daily
        } else {
            self.minimum_wage_daily
        }
    }

    /// ISR tariff for a period of `days` days.
    ///
    /// Monthly periods of exactly 30.4 days use the published table; other
    /// lengths are derived by proportion `days / 30.4`.
    pub fn isr_table_for_days(&self, days: Quantity) -> EngineResult<IsrTable> {
        if days == DAYS_PER_FISCAL_MONTH {
            return Ok(self.isr_monthly.clone());
        }
        check_period_days(days)?;
        self.isr_monthly.scaled(
            format!("isr_{}d_{}", days, self.year),
            days,
            DAYS_PER_FISCAL_MONTH,
        )
    }

    /// Subsidy table for a period of `days` days, derived like
    /// [`FiscalConfig::isr_table_for_days`].
    pub fn subsidy_table_for_days(&self, days: Quantity) -> EngineResult<SubsidyTable> {
        if days == DAYS_PER_FISCAL_MONTH {
            return Ok(self.subsidy_monthly.clone());
        }
        check_period_days(days)?;
        self.subsidy_monthly.scaled(
            format!("subsidy_{}d_{}", days, self.year),
            days,
            DAYS_PER_FISCAL_MONTH,
        )
    }

    /// The aguinaldo exemption ceiling in money.
    pub fn aguinaldo_exempt_cap(&self) -> EngineResult<Money> {
        self.uma_daily
            .times(self.exemptions.aguinaldo_uma_days, self.rounding.intermediate)
    }

    /// The prima vacacional exemption ceiling in money.
    pub fn vacation_premium_exempt_cap(&self) -> EngineResult<Money> {
        self.uma_daily.times(
            self.exemptions.vacation_premium_uma_days,
            self.rounding.intermediate,
        )
    }

    /// The PTU exemption ceiling in money.
    pub fn ptu_exempt_cap(&self) -> EngineResult<Money> {
        self.uma_daily
            .times(self.exemptions.ptu_uma_days, self.rounding.intermediate)
    }

    /// The weekly overtime exemption ceiling: `k × minimum wage × 7`.
    pub fn overtime_weekly_exempt_cap(&self, border_zone: bool) -> EngineResult<Money> {
        self.minimum_wage(border_zone)
            .times(
                self.exemptions.overtime_weekly_minimum_wages,
                self.rounding.intermediate,
            )?
            .times_int(7)
    }
}

fn check_period_days(days: Quantity) -> EngineResult<()> {
    if !days.is_positive() {
        return Err(EngineError::invalid_input(
            "days_in_period",
            format!("must be positive, got {}", days),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn quantity(s: &str) -> EngineResult<Quantity> {
        Quantity::from_str(s)
    }

    #[test]
    fn test_constants() {
        assert_eq!(DAYS_PER_FISCAL_MONTH, quantity("30.4").unwrap());
        assert_eq!(SDI_DAYS_PER_YEAR, quantity("365.25").unwrap());
        assert_eq!(CALENDAR_DAYS_PER_YEAR, quantity("365").unwrap());
    }

    #[test]
    fn test_default_rounding_policy() {
        let policy = RoundingPolicy::default();
        assert_eq!(policy.intermediate, RoundingMode::HalfEven);
        assert_eq!(policy.isr, RoundingMode::HalfUp);
    }
}
