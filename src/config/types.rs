//! Configuration types for fiscal-year files.
//!
//! These structures mirror the YAML layout under `config/mx/fiscal/` and are
//! deserialized with exact decimals. They are converted into the checked
//! fixed-point [`FiscalConfig`] by [`FiscalYearFile::into_fiscal_config`].

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::fiscal::{
    BracketTable, BranchRate, CesantiaBand, CesantiaEmployerTable, ContributionBase,
    ContributionRate, ExemptionLimits, FiscalConfig, IsrBracket, Payer, RoundingPolicy,
    SubsidyBracket,
};
use crate::fixed_point::{Money, Quantity, Rate};

/// UMA values for the year.
#[derive(Debug, Clone, Deserialize)]
pub struct UmaConfig {
    /// Daily UMA.
    pub daily: Decimal,
    /// Monthly UMA.
    pub monthly: Decimal,
    /// Annual UMA.
    pub annual: Decimal,
}

/// Daily minimum wages for the year.
#[derive(Debug, Clone, Deserialize)]
pub struct MinimumWageConfig {
    /// General zone.
    pub general: Decimal,
    /// Northern border free zone.
    pub border: Decimal,
}

/// One ISR tariff row as written in YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct IsrRowConfig {
    /// Inclusive lower bound.
    pub lower: Decimal,
    /// Inclusive upper bound; omitted on the top row.
    #[serde(default)]
    pub upper: Option<Decimal>,
    /// Fixed quota.
    pub fixed_quota: Decimal,
    /// Marginal rate in percent.
    pub rate: Decimal,
}

/// One subsidy row as written in YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct SubsidyRowConfig {
    /// Inclusive lower bound.
    pub lower: Decimal,
    /// Inclusive upper bound; omitted on the top row.
    #[serde(default)]
    pub upper: Option<Decimal>,
    /// Subsidy amount.
    pub subsidy: Decimal,
}

/// ISR tariffs.
#[derive(Debug, Clone, Deserialize)]
pub struct IsrConfig {
    /// Monthly tariff (Anexo 8, art. 96).
    pub monthly: Vec<IsrRowConfig>,
    /// Annual tariff (art. 152); derived as monthly × 12 when absent.
    #[serde(default)]
    pub annual: Option<Vec<IsrRowConfig>>,
}

/// Employment subsidy tables.
#[derive(Debug, Clone, Deserialize)]
pub struct SubsidyConfig {
    /// Monthly table.
    pub monthly: Vec<SubsidyRowConfig>,
}

/// Where an employer rate comes from when it is not a fixed percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployerRateSource {
    /// The cesantía y vejez band table.
    CesantiaBands,
    /// The employer's registered work-risk premium.
    WorkRiskPremium,
}

/// Base kinds as written in YAML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseKindConfig {
    /// The SBC.
    Sbc,
    /// The excess of the SBC over `excess_multiple` daily UMAs.
    ExcessOverUma,
    /// The daily UMA.
    Uma,
}

fn default_true() -> bool {
    true
}

/// One IMSS branch. A branch yields up to two contribution lines, one per payer.
#[derive(Debug, Clone, Deserialize)]
pub struct BranchConfig {
    /// Branch name.
    pub branch: String,
    /// Employer percentage, when fixed.
    #[serde(default)]
    pub employer_rate: Option<Decimal>,
    /// Employer rate source, when not fixed.
    #[serde(default)]
    pub employer_rate_source: Option<EmployerRateSource>,
    /// Worker percentage.
    #[serde(default)]
    pub worker_rate: Option<Decimal>,
    /// Base kind.
    pub base: BaseKindConfig,
    /// UMA multiple excluded by `excess_over_uma` bases.
    #[serde(default)]
    pub excess_multiple: Option<Decimal>,
    /// Whether the SBC ceiling applies.
    #[serde(default = "default_true")]
    pub capped: bool,
    /// Whether unjustified absences reduce the contribution days.
    #[serde(default)]
    pub reduced_by_absences: bool,
}

/// One employer cesantía band.
#[derive(Debug, Clone, Deserialize)]
pub struct CesantiaBandConfig {
    /// Inclusive upper bound as a UMA multiple; omitted on the top band.
    #[serde(default)]
    pub up_to_uma: Option<Decimal>,
    /// Employer percentage.
    pub rate: Decimal,
}

/// Employer cesantía y vejez table.
#[derive(Debug, Clone, Deserialize)]
pub struct CesantiaConfig {
    /// Rate for SBCs at the minimum wage.
    pub minimum_wage_rate: Decimal,
    /// Progressive bands.
    pub bands: Vec<CesantiaBandConfig>,
}

/// IMSS section.
#[derive(Debug, Clone, Deserialize)]
pub struct ImssConfig {
    /// Branches.
    pub branches: Vec<BranchConfig>,
    /// Employer cesantía bands.
    pub cesantia_employer: CesantiaConfig,
}

/// Exemption ceilings; each field falls back to the statutory default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExemptionConfig {
    /// Aguinaldo, in UMA-days.
    #[serde(default)]
    pub aguinaldo_uma_days: Option<Decimal>,
    /// Prima vacacional, in UMA-days.
    #[serde(default)]
    pub vacation_premium_uma_days: Option<Decimal>,
    /// PTU, in UMA-days.
    #[serde(default)]
    pub ptu_uma_days: Option<Decimal>,
    /// Overtime, in daily minimum wages per week (times seven).
    #[serde(default)]
    pub overtime_weekly_minimum_wages: Option<Decimal>,
    /// Indemnities, in UMAs per year of service.
    #[serde(default)]
    pub severance_uma_per_year: Option<Decimal>,
}

/// A complete `config/mx/fiscal/<year>.yaml` file.
#[derive(Debug, Clone, Deserialize)]
pub struct FiscalYearFile {
    /// Fiscal year.
    pub year: i32,
    /// UMA values.
    pub uma: UmaConfig,
    /// Minimum wages.
    pub minimum_wage: MinimumWageConfig,
    /// SBC ceiling as a UMA multiple.
    pub sbc_cap_uma_multiples: Decimal,
    /// ISR tariffs.
    pub isr: IsrConfig,
    /// Subsidy tables.
    pub subsidy: SubsidyConfig,
    /// IMSS branches.
    pub imss: ImssConfig,
    /// Exemption ceilings.
    #[serde(default)]
    pub exemptions: ExemptionConfig,
    /// Rounding policy.
    #[serde(default)]
    pub rounding: RoundingPolicy,
}

fn money(value: Decimal) -> EngineResult<Money> {
    Money::from_decimal(value)
}

fn quantity(value: Decimal) -> EngineResult<Quantity> {
    Quantity::from_decimal(value)
}

fn rate(value: Decimal) -> EngineResult<Rate> {
    Rate::from_percent(value)
}

fn optional_quantity(value: Option<Decimal>, default: Quantity) -> EngineResult<Quantity> {
    value.map(quantity).transpose().map(|q| q.unwrap_or(default))
}

fn positive_money(field: &str, value: Decimal) -> EngineResult<Money> {
    let amount = money(value)?;
    if !amount.is_positive() {
        return Err(EngineError::invalid_input(field, "must be positive"));
    }
    Ok(amount)
}

fn isr_rows(rows: &[IsrRowConfig]) -> EngineResult<Vec<IsrBracket>> {
    rows.iter()
        .map(|row| {
            Ok(IsrBracket {
                lower: money(row.lower)?,
                upper: row.upper.map(money).transpose()?,
                fixed_quota: money(row.fixed_quota)?,
                marginal_rate: rate(row.rate)?,
            })
        })
        .collect()
}

fn branch_lines(branch: &BranchConfig) -> EngineResult<Vec<ContributionRate>> {
    let base = match branch.base {
        BaseKindConfig::Sbc => ContributionBase::Sbc,
        BaseKindConfig::Uma => ContributionBase::Uma,
        BaseKindConfig::ExcessOverUma => ContributionBase::ExcessOverUma {
            multiple: optional_quantity(branch.excess_multiple, Quantity::from_int(3))?,
        },
    };

    let employer = match (branch.employer_rate, branch.employer_rate_source) {
        (Some(_), Some(_)) => {
            return Err(EngineError::invalid_input(
                format!("imss.branches.{}", branch.branch),
                "employer_rate and employer_rate_source are mutually exclusive",
            ));
        }
        (Some(value), None) => Some(BranchRate::Fixed { rate: rate(value)? }),
        (None, Some(EmployerRateSource::CesantiaBands)) => Some(BranchRate::CesantiaBands),
        (None, Some(EmployerRateSource::WorkRiskPremium)) => Some(BranchRate::WorkRiskPremium),
        (None, None) => None,
    };
    let worker = branch
        .worker_rate
        .map(|value| rate(value).map(|rate| BranchRate::Fixed { rate }))
        .transpose()?;

    let line = |payer: Payer, rate: BranchRate| ContributionRate {
        branch: branch.branch.clone(),
        payer,
        rate,
        base,
        is_capped: branch.capped,
        reduced_by_absences: branch.reduced_by_absences,
    };

    let mut lines = Vec::with_capacity(2);
    if let Some(rate) = employer {
        lines.push(line(Payer::Employer, rate));
    }
    if let Some(rate) = worker {
        lines.push(line(Payer::Worker, rate));
    }
    if lines.is_empty() {
        return Err(EngineError::invalid_input(
            format!("imss.branches.{}", branch.branch),
            "branch has neither an employer nor a worker rate",
        ));
    }
    Ok(lines)
}

impl FiscalYearFile {
    /// Converts the file into a validated [`FiscalConfig`].
    ///
    /// Fails with `PrecisionLoss` on values that do not fit the fixed-point
    /// scale, `InvalidTable` on malformed tables and `InvalidInput` on
    /// non-positive reference values.
    pub fn into_fiscal_config(self) -> EngineResult<FiscalConfig> {
        let year = self.year;

        let isr_monthly = BracketTable::new(
            format!("isr_monthly_{}", year),
            isr_rows(&self.isr.monthly)?,
        )?;
        let isr_annual = match &self.isr.annual {
            Some(rows) => BracketTable::new(format!("isr_annual_{}", year), isr_rows(rows)?)?,
            None => isr_monthly.scaled(
                format!("isr_annual_{}", year),
                Quantity::from_int(12),
                Quantity::ONE,
            )?,
        };

        let subsidy_rows = self
            .subsidy
            .monthly
            .iter()
            .map(|row| {
                Ok(SubsidyBracket {
                    lower: money(row.lower)?,
                    upper: row.upper.map(money).transpose()?,
                    subsidy_amount: money(row.subsidy)?,
                })
            })
            .collect::<EngineResult<Vec<_>>>()?;
        let subsidy_monthly = BracketTable::new(format!("subsidy_monthly_{}", year), subsidy_rows)?;

        let mut imss_branches = Vec::new();
        for branch in &self.imss.branches {
            imss_branches.extend(branch_lines(branch)?);
        }

        let bands = self
            .imss
            .cesantia_employer
            .bands
            .iter()
            .map(|band| {
                Ok(CesantiaBand {
                    up_to_uma_multiple: band.up_to_uma.map(quantity).transpose()?,
                    rate: rate(band.rate)?,
                })
            })
            .collect::<EngineResult<Vec<_>>>()?;
        let cesantia_employer =
            CesantiaEmployerTable::new(rate(self.imss.cesantia_employer.minimum_wage_rate)?, bands)?;

        let defaults = ExemptionLimits::default();
        let exemptions = ExemptionLimits {
            aguinaldo_uma_days: optional_quantity(
                self.exemptions.aguinaldo_uma_days,
                defaults.aguinaldo_uma_days,
            )?,
            vacation_premium_uma_days: optional_quantity(
                self.exemptions.vacation_premium_uma_days,
                defaults.vacation_premium_uma_days,
            )?,
            ptu_uma_days: optional_quantity(self.exemptions.ptu_uma_days, defaults.ptu_uma_days)?,
            overtime_weekly_minimum_wages: optional_quantity(
                self.exemptions.overtime_weekly_minimum_wages,
                defaults.overtime_weekly_minimum_wages,
            )?,
            severance_uma_per_year: optional_quantity(
                self.exemptions.severance_uma_per_year,
                defaults.severance_uma_per_year,
            )?,
        };

        let sbc_cap_in_uma_multiples = quantity(self.sbc_cap_uma_multiples)?;
        if !sbc_cap_in_uma_multiples.is_positive() {
            return Err(EngineError::invalid_input(
                "sbc_cap_uma_multiples",
                "must be positive",
            ));
        }

        Ok(FiscalConfig {
            year,
            uma_daily: positive_money("uma.daily", self.uma.daily)?,
            uma_monthly: positive_money("uma.monthly", self.uma.monthly)?,
            uma_annual: positive_money("uma.annual", self.uma.annual)?,
            minimum_wage_daily: positive_money("minimum_wage.general", self.minimum_wage.general)?,
            minimum_wage_border_daily: positive_money(
                "minimum_wage.border",
                self.minimum_wage.border,
            )?,
            sbc_cap_in_uma_multiples,
            isr_monthly,
            isr_annual,
            subsidy_monthly,
            imss_branches,
            cesantia_employer,
            exemptions,
            rounding: self.rounding,
        })
    }
}
