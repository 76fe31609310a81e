//! Calculation logic for the payroll engine.
//!
//! This module contains the pure calculators: ISR withholding and the
//! employment subsidy, SDI/SBC derivation, IMSS contributions, overtime with
//! its weekly exemption, statutory benefits (aguinaldo, prima vacacional,
//! PTU), ISR on extraordinary income, settlements, the annual
//! reconciliation and the net-to-gross solver.
//!
//! Every calculator takes the [`FiscalConfig`](crate::fiscal::FiscalConfig)
//! of the year it computes for and returns its result together with the
//! audit steps that explain it.

mod aguinaldo;
mod annual_adjustment;
mod exemption;
mod extraordinary_isr;
mod imss;
mod integrated_wage;
mod isr;
mod net_to_gross;
mod overtime;
mod ptu;
mod settlement;
mod subsidy;
mod vacation_premium;

pub use aguinaldo::{AguinaldoResult, calculate_aguinaldo, days_worked_in_year};
pub use annual_adjustment::{
    AdjustmentDirection, AnnualAdjustmentResult, PeriodRecord, RECONCILIATION_INCOME_LIMIT,
    calculate_annual_adjustment,
};
pub use exemption::{ExemptionSplit, split_exempt};
pub use extraordinary_isr::{
    ExtraordinaryIsrResult, ExtraordinaryMethod, tax_on_bonus, tax_on_ptu, tax_on_severance,
};
pub use imss::{IMSS_LEGAL_REF, ImssInput, ImssLine, ImssResult, calculate_imss};
pub use integrated_wage::{SbcResult, SdiResult, calculate_sbc, calculate_sdi};
pub use isr::{ISR_TARIFF_REF, IsrResult, calculate_isr, tariff_tax};
pub use net_to_gross::{
    NetBreakdown, NetToGrossContext, NetToGrossResult, SolverConfig, forward_net,
    solve_net_to_gross,
};
pub use overtime::{
    DOUBLE_HOURS_PER_WEEK, OvertimeResult, calculate_overtime, calculate_overtime_after,
};
pub use ptu::{
    PtuDistribution, PtuParticipant, PtuResult, PtuShare, calculate_ptu, distribute_ptu,
};
pub use settlement::{
    ComponentKind, SettlementComponent, SettlementInput, SettlementResult, TerminationType,
    calculate_settlement,
};
pub use subsidy::{SubsidyResult, employment_subsidy};
pub use vacation_premium::{VacationResult, calculate_vacation, vacation_days_for_service_year};
