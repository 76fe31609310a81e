//! Configuration loading for the payroll engine.
//!
//! Fiscal data (UMA, minimum wages, ISR and subsidy tables, IMSS branches,
//! exemption ceilings, rounding policy) is read from one YAML file per
//! year and converted into an immutable [`FiscalConfig`](crate::fiscal::FiscalConfig).
//!
//! # Example
//!
//! ```no_run
//! use nomina_engine::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load("./config/mx").unwrap();
//! println!("UMA 2025: {}", loader.fiscal_year(2025).unwrap().uma_daily);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    BaseKindConfig, BranchConfig, CesantiaBandConfig, CesantiaConfig, EmployerRateSource,
    ExemptionConfig, FiscalYearFile, ImssConfig, IsrConfig, IsrRowConfig, MinimumWageConfig,
    SubsidyConfig, SubsidyRowConfig, UmaConfig,
};
