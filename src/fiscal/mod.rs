//! The fiscal table model.
//!
//! Bracket tables, IMSS contribution lines and the per-year [`FiscalConfig`]
//! bundle. Everything here is validated when built and immutable afterwards.

mod config;
mod contributions;
mod tables;

pub use config::{
    CALENDAR_DAYS_PER_YEAR, DAYS_PER_FISCAL_MONTH, ExemptionLimits, FiscalConfig,
    RoundingPolicy, SDI_DAYS_PER_YEAR,
};
pub use contributions::{
    BranchRate, CesantiaBand, CesantiaEmployerTable, ContributionBase, ContributionRate, Payer,
};
pub use tables::{BracketRow, BracketTable, IsrBracket, IsrTable, SubsidyBracket, SubsidyTable};
