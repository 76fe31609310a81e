//! IMSS contribution branches ("ramos") and the cesantía y vejez bands.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fixed_point::{Quantity, Rate};

/// Who pays a contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payer {
    /// Withheld from the worker's pay.
    Worker,
    /// Borne by the employer.
    Employer,
}

/// The daily base a branch applies its rate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ContributionBase {
    /// The contribution base wage.
    Sbc,
    /// `max(0, SBC - multiple × UMA)`.
    ExcessOverUma {
        /// How many daily UMAs are excluded (three for the E&M surplus).
        multiple: Quantity,
    },
    /// The daily UMA itself (cuota fija).
    Uma,
}

/// Where a branch's rate comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BranchRate {
    /// A constant statutory rate.
    Fixed {
        /// The rate.
        rate: Rate,
    },
    /// The employer cesantía y vejez rate chosen from the SBC band.
    CesantiaBands,
    /// The employer's own work-risk premium.
    WorkRiskPremium,
}

/// One configured contribution line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRate {
    /// Branch name, e.g. `invalidez_vida`.
    pub branch: String,
    /// Who pays this line.
    pub payer: Payer,
    /// How the rate is determined.
    pub rate: BranchRate,
    /// The daily base.
    pub base: ContributionBase,
    /// Whether the base is capped at the SBC ceiling (25 UMA).
    pub is_capped: bool,
    /// Whether unjustified absences reduce the contribution days.
    pub reduced_by_absences: bool,
}

impl ContributionRate {
    /// True when the base is the excess over a UMA multiple.
    pub fn uses_excess_over_reference_multiple(&self) -> bool {
        matches!(self.base, ContributionBase::ExcessOverUma { .. })
    }
}

/// One band of the employer cesantía y vejez table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CesantiaBand {
    /// Inclusive upper bound as a multiple of the daily UMA; `None` on the top band.
    pub up_to_uma_multiple: Option<Quantity>,
    /// Employer rate for the band.
    pub rate: Rate,
}

/// The progressive employer cesantía y vejez rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CesantiaEmployerTable {
    /// Rate for workers whose SBC does not exceed the minimum wage.
    pub minimum_wage_rate: Rate,
    bands: Vec<CesantiaBand>,
}

impl CesantiaEmployerTable {
    /// Builds the table, checking ascending bounds and an open top band.
    pub fn new(minimum_wage_rate: Rate, bands: Vec<CesantiaBand>) -> EngineResult<Self> {
        let invalid = |message: &str| EngineError::InvalidTable {
            table: "cesantia_employer".to_string(),
            message: message.to_string(),
        };

        let Some(last) = bands.last() else {
            return Err(invalid("no bands configured"));
        };
        if last.up_to_uma_multiple.is_some() {
            return Err(invalid("top band must be open-ended"));
        }

        let bounds: Vec<Quantity> = bands
            .iter()
            .take(bands.len() - 1)
            .map(|band| band.up_to_uma_multiple.ok_or_else(|| invalid("only the top band may be open-ended")))
            .collect::<EngineResult<_>>()?;
        if bounds.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(invalid("band bounds must be strictly ascending"));
        }

        Ok(Self {
            minimum_wage_rate,
            bands,
        })
    }

    /// The configured bands.
    pub fn bands(&self) -> &[CesantiaBand] {
        &self.bands
    }

    /// Rate for an SBC expressed as a multiple of the daily UMA.
    pub fn rate_for_multiple(&self, uma_multiple: Quantity) -> Rate {
        self.bands
            .iter()
            .find(|band| match band.up_to_uma_multiple {
                Some(bound) => uma_multiple <= bound,
                None => true,
            })
            .map(|band| band.rate)
            .unwrap_or(self.minimum_wage_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn q(s: &str) -> Quantity {
        Quantity::from_str(s).unwrap()
    }

    fn rate(s: &str) -> Rate {
        Rate::from_str(s).unwrap()
    }

    fn table() -> CesantiaEmployerTable {
        CesantiaEmployerTable::new(
            rate("3.150"),
            vec![
                CesantiaBand { up_to_uma_multiple: Some(q("1.50")), rate: rate("4.523") },
                CesantiaBand { up_to_uma_multiple: Some(q("2.00")), rate: rate("6.293") },
                CesantiaBand { up_to_uma_multiple: None, rate: rate("10.238") },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_band_selection_is_inclusive_of_upper_bound() {
        let table = table();
        assert_eq!(table.rate_for_multiple(q("1.50")), rate("4.523"));
        assert_eq!(table.rate_for_multiple(q("1.5001")), rate("6.293"));
        assert_eq!(table.rate_for_multiple(q("7")), rate("10.238"));
    }

    #[test]
    fn test_rejects_closed_top_band() {
        let result = CesantiaEmployerTable::new(
            rate("3.150"),
            vec![CesantiaBand { up_to_uma_multiple: Some(q("1.50")), rate: rate("4.523") }],
        );
        assert!(matches!(result, Err(EngineError::InvalidTable { .. })));
    }

    #[test]
    fn test_rejects_descending_bands() {
        let result = CesantiaEmployerTable::new(
            rate("3.150"),
            vec![
                CesantiaBand { up_to_uma_multiple: Some(q("2.00")), rate: rate("4.523") },
                CesantiaBand { up_to_uma_multiple: Some(q("1.50")), rate: rate("6.293") },
                CesantiaBand { up_to_uma_multiple: None, rate: rate("10.238") },
            ],
        );
        assert!(matches!(result, Err(EngineError::InvalidTable { .. })));
    }

    #[test]
    fn test_excess_flag() {
        let line = ContributionRate {
            branch: "em_excedente".to_string(),
            payer: Payer::Worker,
            rate: BranchRate::Fixed { rate: rate("0.40") },
            base: ContributionBase::ExcessOverUma { multiple: Quantity::from_int(3) },
            is_capped: true,
            reduced_by_absences: false,
        };
        assert!(line.uses_excess_over_reference_multiple());
    }
}
