//! Shared fixtures for unit tests.

use std::sync::{Arc, OnceLock};

use chrono::NaiveDate;

use crate::config::ConfigLoader;
use crate::fiscal::FiscalConfig;
use crate::fixed_point::Money;
use crate::models::{ContractType, EmployeeProfile, WageFacts};

/// The configuration shipped in `config/mx`, loaded once.
pub fn loader() -> &'static ConfigLoader {
    static LOADER: OnceLock<ConfigLoader> = OnceLock::new();
    LOADER.get_or_init(|| ConfigLoader::load("./config/mx").expect("fiscal config loads"))
}

/// The 2025 fiscal configuration shipped in `config/mx`.
pub fn fiscal_2025() -> Arc<FiscalConfig> {
    loader().shared(2025).expect("2025 configured")
}

/// The 2026 fiscal configuration shipped in `config/mx`.
pub fn fiscal_2026() -> Arc<FiscalConfig> {
    loader().shared(2026).expect("2026 configured")
}

/// An indefinite-term employee with statutory minimum benefits.
pub fn employee(daily_salary: Money, hire_date: NaiveDate) -> EmployeeProfile {
    EmployeeProfile {
        id: "emp_001".to_string(),
        contract_type: ContractType::Indefinite,
        hire_date,
        wage: WageFacts::statutory_minimum(daily_salary),
        border_zone: false,
    }
}
