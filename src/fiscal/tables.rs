//! Versioned bracket tables for ISR and the employment subsidy.
//!
//! A table is a list of contiguous, non-overlapping rows ordered by their
//! lower bound, with an open-ended top row. Tables are validated once when
//! built and are immutable afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fixed_point::{Money, Quantity, Rate, RoundingMode, CENT_BP};

/// Common behaviour of a bracket row.
pub trait BracketRow: Clone {
    /// Inclusive lower bound.
    fn lower(&self) -> Money;

    /// Inclusive upper bound, or `None` for the open-ended top row.
    fn upper(&self) -> Option<Money>;

    /// Returns a copy of the row with new bounds.
    fn with_bounds(&self, lower: Money, upper: Option<Money>) -> Self;

    /// Scales the row's monetary amounts (quotas, subsidy) by `numerator / denominator`.
    fn scale_amounts(&self, numerator: Quantity, denominator: Quantity) -> EngineResult<Self>;
}

/// One row of an ISR tariff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsrBracket {
    /// Inclusive lower bound.
    pub lower: Money,
    /// Inclusive upper bound; `None` on the top row.
    pub upper: Option<Money>,
    /// Tax on the lower bound.
    pub fixed_quota: Money,
    /// Rate applied to the excess over the lower bound.
    pub marginal_rate: Rate,
}

impl BracketRow for IsrBracket {
    fn lower(&self) -> Money {
        self.lower
    }

    fn upper(&self) -> Option<Money> {
        self.upper
    }

    fn with_bounds(&self, lower: Money, upper: Option<Money>) -> Self {
        IsrBracket {
            lower,
            upper,
            ..self.clone()
        }
    }

    fn scale_amounts(&self, numerator: Quantity, denominator: Quantity) -> EngineResult<Self> {
        Ok(IsrBracket {
            fixed_quota: scale_to_cent(self.fixed_quota, numerator, denominator)?,
            ..self.clone()
        })
    }
}

/// One row of an employment subsidy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsidyBracket {
    /// Inclusive lower bound.
    pub lower: Money,
    /// Inclusive upper bound; `None` on the top row.
    pub upper: Option<Money>,
    /// Subsidy granted to incomes in this row.
    pub subsidy_amount: Money,
}

impl BracketRow for SubsidyBracket {
    fn lower(&self) -> Money {
        self.lower
    }

    fn upper(&self) -> Option<Money> {
        self.upper
    }

    fn with_bounds(&self, lower: Money, upper: Option<Money>) -> Self {
        SubsidyBracket {
            lower,
            upper,
            ..self.clone()
        }
    }

    fn scale_amounts(&self, numerator: Quantity, denominator: Quantity) -> EngineResult<Self> {
        Ok(SubsidyBracket {
            subsidy_amount: scale_to_cent(self.subsidy_amount, numerator, denominator)?,
            ..self.clone()
        })
    }
}

/// Scales a published amount and rounds it to the cent, as the published
/// period tables are.
fn scale_to_cent(amount: Money, numerator: Quantity, denominator: Quantity) -> EngineResult<Money> {
    amount
        .scale(numerator, denominator, RoundingMode::HalfEven)?
        .round_to_cent(RoundingMode::HalfUp)
}

/// A validated, immutable bracket table.
///
/// # Example
///
/// ```
/// use nomina_engine::fiscal::{BracketTable, SubsidyBracket};
/// use nomina_engine::fixed_point::Money;
///
/// let table = BracketTable::new(
///     "subsidy_monthly_2025",
///     vec![
///         SubsidyBracket {
///             lower: Money::from_bp(100),
///             upper: Some(Money::from_units(10_171)),
///             subsidy_amount: Money::from_bp(4_746_500),
///         },
///         SubsidyBracket {
///             lower: Money::from_bp(101_710_100),
///             upper: None,
///             subsidy_amount: Money::ZERO,
///         },
///     ],
/// )
/// .unwrap();
///
/// let row = table.lookup(Money::from_units(9_000)).unwrap();
/// assert_eq!(row.subsidy_amount, Money::from_bp(4_746_500));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BracketTable<R> {
    name: String,
    rows: Vec<R>,
}

/// An ISR tariff.
pub type IsrTable = BracketTable<IsrBracket>;

/// An employment subsidy table.
pub type SubsidyTable = BracketTable<SubsidyBracket>;

impl<R: BracketRow> BracketTable<R> {
    /// Builds a table, checking that rows are ordered, contiguous (gaps of at
    /// most one cent) and that only the last row is open-ended.
    pub fn new(name: impl Into<String>, rows: Vec<R>) -> EngineResult<Self> {
        let name = name.into();
        let invalid = |message: String| EngineError::InvalidTable {
            table: name.clone(),
            message,
        };

        if rows.is_empty() {
            return Err(invalid("table has no rows".to_string()));
        }

        for (index, row) in rows.iter().enumerate() {
            let is_last = index + 1 == rows.len();
            match row.upper() {
                None if !is_last => {
                    return Err(invalid(format!("row {} is open-ended but not last", index)));
                }
                Some(_) if is_last => {
                    return Err(invalid("top row must be open-ended".to_string()));
                }
                Some(upper) if upper < row.lower() => {
                    return Err(invalid(format!(
                        "row {} has upper {} below lower {}",
                        index,
                        upper,
                        row.lower()
                    )));
                }
                _ => {}
            }

            if let Some(next) = rows.get(index + 1) {
                // Only the last row has no upper bound, checked above.
                let upper = row.upper().unwrap_or(row.lower());
                let gap = next.lower().checked_sub(upper)?;
                if gap.bp() <= 0 || gap.bp() > CENT_BP {
                    return Err(invalid(format!(
                        "rows {} and {} are not contiguous ({} then {})",
                        index,
                        index + 1,
                        upper,
                        next.lower()
                    )));
                }
            }
        }

        Ok(Self { name, rows })
    }

    /// The table's name, used in errors and audit steps.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The table's rows, ordered by lower bound.
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Finds the row covering `amount`.
    ///
    /// Amounts between a row's upper bound and the next row's lower bound
    /// (a sub-cent gap) belong to the lower row. Amounts below the first
    /// row are a [`EngineError::TableLookupMiss`].
    pub fn lookup(&self, amount: Money) -> EngineResult<&R> {
        let index = self.rows.partition_point(|row| row.lower() <= amount);
        if index == 0 {
            return Err(EngineError::TableLookupMiss {
                table: self.name.clone(),
                amount,
            });
        }
        Ok(&self.rows[index - 1])
    }

    /// Derives a table for a different period length by proportion
    /// `numerator / denominator` (e.g. 15 days / 30.4 for a biweekly table).
    ///
    /// Upper bounds and amounts are rounded to the cent; each lower bound is
    /// re-chained one cent above the previous upper bound.
    pub fn scaled(
        &self,
        name: impl Into<String>,
        numerator: Quantity,
        denominator: Quantity,
    ) -> EngineResult<Self> {
        let mut rows = Vec::with_capacity(self.rows.len());
        let mut previous_upper: Option<Money> = None;

        for row in &self.rows {
            let lower = match previous_upper {
                Some(upper) => upper.checked_add(Money::from_bp(CENT_BP))?,
                None => row.lower(),
            };
            let upper = match row.upper() {
                Some(upper) => Some(scale_to_cent(upper, numerator, denominator)?),
                None => None,
            };
            rows.push(row.with_bounds(lower, upper).scale_amounts(numerator, denominator)?);
            previous_upper = upper;
        }

        Self::new(name, rows)
    }
}
