//! IMSS contribution calculation.
//!
//! Every configured [`ContributionRate`] line produces one
//! [`ImssLine`]. Lines are partitioned by who bears them and summed
//! independently; the grand total is the sum of both partitions.
//!
//! ## Bases
//!
//! - `sbc`: the contribution base wage, optionally capped at 25 UMA
//! - `excess_over_uma`: `max(0, SBC − k × UMA)`, the E&M surplus
//! - `uma`: the daily UMA itself (cuota fija)
//!
//! Each line's amount is `base × rate × days`, rounded to the cent once.

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::fiscal::{BranchRate, ContributionBase, ContributionRate, FiscalConfig, Payer};
use crate::fixed_point::{Money, Quantity, Rate, RoundingMode};
use crate::models::AuditStep;

/// Legal reference for contribution bases and rates.
pub const IMSS_LEGAL_REF: &str = "LSS arts. 25, 106, 107, 147, 168, 211";

/// Inputs of one IMSS calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImssInput {
    /// Daily contribution base wage.
    pub sbc: Money,
    /// Contribution days in the period.
    pub days: Quantity,
    /// Unjustified absences in the period.
    pub absence_days: Quantity,
    /// The employer's work-risk premium.
    pub work_risk_premium: Rate,
    /// True when the worker earns the minimum wage; the employer then bears
    /// the worker's share (LSS art. 36) and the minimum-wage cesantía rate applies.
    pub minimum_wage_earner: bool,
}

/// One computed contribution line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImssLine {
    /// Branch name.
    pub branch: String,
    /// Whose share this line is by statute.
    pub payer: Payer,
    /// Who actually pays it.
    pub paid_by: Payer,
    /// The daily base the rate applies to.
    pub base_daily: Money,
    /// The applied rate.
    pub rate: Rate,
    /// Contribution days.
    pub days: Quantity,
    /// The contribution, rounded to the cent.
    pub amount: Money,
}

/// The result of an IMSS calculation.
#[derive(Debug, Clone)]
pub struct ImssResult {
    /// One line per configured branch and payer.
    pub lines: Vec<ImssLine>,
    /// Sum of lines paid by the worker.
    pub worker_total: Money,
    /// Sum of lines paid by the employer.
    pub employer_total: Money,
    /// `worker_total + employer_total`.
    pub total: Money,
    /// The audit step recording this calculation.
    pub audit_step: AuditStep,
}

/// Calculates IMSS contributions for one worker and period.
///
/// # Example
///
/// ```
/// use nomina_engine::calculation::{calculate_imss, ImssInput};
/// use nomina_engine::config::ConfigLoader;
/// use nomina_engine::fixed_point::{Money, Quantity, Rate};
///
/// let loader = ConfigLoader::load("config/mx").unwrap();
/// let fiscal = loader.fiscal_year(2026).unwrap();
/// let input = ImssInput {
///     sbc: Money::from_units(600),
///     days: Quantity::from_int(30),
///     absence_days: Quantity::ZERO,
///     work_risk_premium: Rate::from_raw(543_550),
///     minimum_wage_earner: false,
/// };
///
/// let result = calculate_imss(&input, fiscal, 1).unwrap();
/// assert_eq!(
///     result.total,
///     result.worker_total.checked_add(result.employer_total).unwrap()
/// );
/// ```
pub fn calculate_imss(
    input: &ImssInput,
    fiscal: &FiscalConfig,
    step_number: u32,
) -> EngineResult<ImssResult> {
    let cap = fiscal.sbc_cap_daily()?;
    let mode = fiscal.rounding.intermediate;

    let mut lines = Vec::with_capacity(fiscal.imss_branches.len());
    for contribution in &fiscal.imss_branches {
        lines.push(contribution_line(contribution, input, fiscal, cap, mode)?);
    }

    let worker_total = Money::checked_sum(
        lines
            .iter()
            .filter(|line| line.paid_by == Payer::Worker)
            .map(|line| line.amount),
    )?;
    let employer_total = Money::checked_sum(
        lines
            .iter()
            .filter(|line| line.paid_by == Payer::Employer)
            .map(|line| line.amount),
    )?;
    let total = Money::checked_sum(lines.iter().map(|line| line.amount))?;

    let audit_step = AuditStep {
        step_number,
        rule_id: "imss_contributions".to_string(),
        rule_name: "IMSS Contributions".to_string(),
        legal_ref: IMSS_LEGAL_REF.to_string(),
        input: serde_json::json!({
            "sbc": input.sbc.to_string(),
            "days": input.days.to_string(),
            "absence_days": input.absence_days.to_string(),
            "work_risk_premium": input.work_risk_premium.to_string(),
            "minimum_wage_earner": input.minimum_wage_earner,
            "fiscal_year": fiscal.year,
        }),
        output: serde_json::json!({
            "lines": lines,
            "worker_total": worker_total.to_string(),
            "employer_total": employer_total.to_string(),
            "total": total.to_string(),
        }),
        reasoning: format!(
            "{} branch lines: worker {} + employer {} = {}",
            lines.len(),
            worker_total,
            employer_total,
            total
        ),
    };

    Ok(ImssResult {
        lines,
        worker_total,
        employer_total,
        total,
        audit_step,
    })
}

fn contribution_line(
    contribution: &ContributionRate,
    input: &ImssInput,
    fiscal: &FiscalConfig,
    cap: Money,
    mode: RoundingMode,
) -> EngineResult<ImssLine> {
    let sbc = if contribution.is_capped {
        input.sbc.min(cap)
    } else {
        input.sbc
    };

    let base_daily = match contribution.base {
        ContributionBase::Sbc => sbc,
        ContributionBase::ExcessOverUma { multiple } => sbc
            .checked_sub(fiscal.uma_daily.times(multiple, mode)?)?
            .non_negative(),
        ContributionBase::Uma => fiscal.uma_daily,
    };

    let rate = match contribution.rate {
        BranchRate::Fixed { rate } => rate,
        BranchRate::WorkRiskPremium => input.work_risk_premium,
        BranchRate::CesantiaBands if input.minimum_wage_earner => {
            fiscal.cesantia_employer.minimum_wage_rate
        }
        BranchRate::CesantiaBands => {
            // A base even slightly above a band bound belongs to the next band.
            let multiple = sbc.quotient(fiscal.uma_daily, RoundingMode::Ceiling)?;
            fiscal.cesantia_employer.rate_for_multiple(multiple)
        }
    };

    let days = if contribution.reduced_by_absences {
        match input.days.checked_sub(input.absence_days)? {
            days if days.is_positive() => days,
            _ => Quantity::ZERO,
        }
    } else {
        input.days
    };

    let amount = base_daily
        .times(days, mode)?
        .apply_rate(rate, mode)?
        .round_to_cent(fiscal.rounding.imss)?;

    let paid_by = if input.minimum_wage_earner {
        Payer::Employer
    } else {
        contribution.payer
    };

    Ok(ImssLine {
        branch: contribution.branch.clone(),
        payer: contribution.payer,
        paid_by,
        base_daily,
        rate,
        days,
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fiscal_2026;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn input(sbc: &str) -> ImssInput {
        ImssInput {
            sbc: money(sbc),
            days: Quantity::from_int(30),
            absence_days: Quantity::ZERO,
            work_risk_premium: Rate::from_str("0.54355").unwrap(),
            minimum_wage_earner: false,
        }
    }

    fn line<'a>(result: &'a ImssResult, branch: &str, payer: Payer) -> &'a ImssLine {
        result
            .lines
            .iter()
            .find(|line| line.branch == branch && line.payer == payer)
            .unwrap()
    }

    #[test]
    fn test_lines_for_500_daily_salary() {
        let fiscal = fiscal_2026();
        let result = calculate_imss(&input("524.6407"), &fiscal, 1).unwrap();

        // 117.31 × 30 × 20.40 %
        assert_eq!(
            line(&result, "em_cuota_fija", Payer::Employer).amount,
            money("717.94")
        );
        // (524.6407 − 3 × 117.31) × 30 × 0.40 %
        assert_eq!(
            line(&result, "em_excedente", Payer::Worker).amount,
            money("20.73")
        );
        // 524.6407 × 30 × 0.625 %
        assert_eq!(
            line(&result, "invalidez_vida", Payer::Worker).amount,
            money("98.37")
        );
        // 4.4723 UMA → top band, 10.238 %
        let cesantia = line(&result, "cesantia_vejez", Payer::Employer);
        assert_eq!(cesantia.rate, Rate::from_str("10.238").unwrap());
        assert_eq!(cesantia.amount, money("1611.38"));
    }

    #[test]
    fn test_worker_total_for_500_daily_salary() {
        let fiscal = fiscal_2026();
        let result = calculate_imss(&input("524.6407"), &fiscal, 1).unwrap();
        // Surplus 20.73, then 0.25 % + 0.375 % + 0.625 % + 1.125 % of 15739.221
        // = 39.35 + 59.02 + 98.37 + 177.07
        assert_eq!(result.worker_total, money("394.54"));
    }

    #[test]
    fn test_surplus_above_three_uma() {
        let fiscal = fiscal_2026();
        let result = calculate_imss(&input("600"), &fiscal, 1).unwrap();
        let surplus = line(&result, "em_excedente", Payer::Worker);
        // 600 − 3 × 117.31 = 248.07
        assert_eq!(surplus.base_daily, money("248.07"));
        // 248.07 × 30 × 0.40 % = 29.7684
        assert_eq!(surplus.amount, money("29.77"));
    }

    #[test]
    fn test_capped_branches_use_25_uma() {
        let fiscal = fiscal_2026();
        let result = calculate_imss(&input("5000"), &fiscal, 1).unwrap();
        assert_eq!(
            line(&result, "retiro", Payer::Employer).base_daily,
            money("2932.75")
        );
    }

    #[test]
    fn test_absences_reduce_only_marked_branches() {
        let fiscal = fiscal_2026();
        let mut with_absences = input("524.6407");
        with_absences.absence_days = Quantity::from_int(2);
        let result = calculate_imss(&with_absences, &fiscal, 1).unwrap();

        assert_eq!(
            line(&result, "invalidez_vida", Payer::Worker).days,
            Quantity::from_int(28)
        );
        assert_eq!(
            line(&result, "em_prestaciones_dinero", Payer::Worker).days,
            Quantity::from_int(30)
        );
    }

    #[test]
    fn test_absences_beyond_period_floor_at_zero() {
        let fiscal = fiscal_2026();
        let mut with_absences = input("524.6407");
        with_absences.absence_days = Quantity::from_int(45);
        let result = calculate_imss(&with_absences, &fiscal, 1).unwrap();
        assert_eq!(line(&result, "retiro", Payer::Employer).amount, Money::ZERO);
    }

    #[test]
    fn test_minimum_wage_earner_shifts_worker_share() {
        let fiscal = fiscal_2026();
        let mut minimum = input("330.5734");
        minimum.minimum_wage_earner = true;
        let result = calculate_imss(&minimum, &fiscal, 1).unwrap();

        assert_eq!(result.worker_total, Money::ZERO);
        assert_eq!(result.employer_total, result.total);
        assert_eq!(
            line(&result, "cesantia_vejez", Payer::Employer).rate,
            Rate::from_str("3.150").unwrap()
        );
    }

    #[test]
    fn test_cesantia_band_bound_is_inclusive() {
        let fiscal = fiscal_2026();
        // Exactly 1.5 UMA.
        let result = calculate_imss(&input("175.965"), &fiscal, 1).unwrap();
        assert_eq!(
            line(&result, "cesantia_vejez", Payer::Employer).rate,
            Rate::from_str("4.523").unwrap()
        );
        let result = calculate_imss(&input("175.9651"), &fiscal, 1).unwrap();
        assert_eq!(
            line(&result, "cesantia_vejez", Payer::Employer).rate,
            Rate::from_str("6.293").unwrap()
        );
    }

    proptest! {
        #[test]
        fn prop_total_is_worker_plus_employer(sbc_cents in 1i128..1_000_000, days in 1i64..32, minimum in any::<bool>()) {
            let fiscal = fiscal_2026();
            let imss_input = ImssInput {
                sbc: Money::from_bp(sbc_cents * 100),
                days: Quantity::from_int(days),
                absence_days: Quantity::ZERO,
                work_risk_premium: Rate::from_str("0.54355").unwrap(),
                minimum_wage_earner: minimum,
            };
            let result = calculate_imss(&imss_input, &fiscal, 1).unwrap();
            prop_assert_eq!(
                result.total.bp(),
                result.worker_total.bp() + result.employer_total.bp()
            );
        }
    }
}
