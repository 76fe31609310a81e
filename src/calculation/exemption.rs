//! Taxable/exempt decomposition against a statutory ceiling.

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::fixed_point::Money;

/// A gross amount split into its exempt and taxable parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExemptionSplit {
    /// The gross amount.
    pub gross: Money,
    /// The statutory ceiling for the concept.
    pub ceiling: Money,
    /// What remained of the ceiling in the ledger, when one was consulted.
    pub available: Option<Money>,
    /// `min(gross, ceiling, available)`.
    pub exempt: Money,
    /// `gross − exempt`.
    pub taxable: Money,
}

/// Splits `gross` into exempt and taxable parts.
///
/// The exempt part is limited by the statutory `ceiling` and, when given,
/// by the ceiling still `available` after earlier payments in the window.
pub fn split_exempt(
    gross: Money,
    ceiling: Money,
    available: Option<Money>,
) -> EngineResult<ExemptionSplit> {
    let limit = match available {
        Some(available) => ceiling.min(available),
        None => ceiling,
    };
    let exempt = gross.min(limit).non_negative();
    let taxable = gross.checked_sub(exempt)?;

    Ok(ExemptionSplit {
        gross,
        ceiling,
        available,
        exempt,
        taxable,
    })
}
