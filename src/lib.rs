//! Payroll Calculation Engine for Mexican Labor Law
//!
//! This crate calculates Mexican payroll with checked fixed-point arithmetic:
//! ISR with the employment subsidy, IMSS contributions, SDI/SBC, aguinaldo,
//! prima vacacional, PTU, overtime, settlements and the annual adjustment,
//! plus a net-to-gross solver. Fiscal parameters are loaded per year from
//! YAML, and every amount carries an audit trail.

#![warn(missing_docs)]

pub mod calculation;
pub mod config;
pub mod error;
pub mod fiscal;
pub mod fixed_point;
pub mod ledger;
pub mod models;
pub mod orchestration;

#[cfg(test)]
pub(crate) mod test_support;

/// Version stamped on every [`models::PayrollResult`].
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
