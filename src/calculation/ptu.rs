//! PTU (profit sharing): per-employee exemption and company-pool distribution.
//!
//! The pool is split in two halves (LFT art. 123): one distributed in
//! proportion to days worked, the other in proportion to salary earned.
//! Each worker's share is limited to the greater of three months of salary
//! or their average PTU over the last three years (LFT art. 127 fr. VIII).
//! Amounts above the limit are reported, not redistributed.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fiscal::FiscalConfig;
use crate::fixed_point::{Money, Quantity, RoundingMode};
use crate::models::AuditStep;

use super::exemption::{split_exempt, ExemptionSplit};

/// The result of a PTU payment's exemption split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtuResult {
    /// The payment and its exempt/taxable split.
    pub split: ExemptionSplit,
    /// The audit step recording the split.
    pub audit_step: AuditStep,
}

/// Splits a PTU payment into exempt (up to 15 daily UMAs) and taxable parts.
pub fn calculate_ptu(
    amount: Money,
    exempt_available: Option<Money>,
    fiscal: &FiscalConfig,
    step_number: u32,
) -> EngineResult<PtuResult> {
    if amount.is_negative() {
        return Err(EngineError::invalid_input(
            "ptu_amount",
            format!("must not be negative, got {}", amount),
        ));
    }
    let ceiling = fiscal.ptu_exempt_cap()?;
    let split = split_exempt(amount, ceiling, exempt_available)?;

    let audit_step = AuditStep {
        step_number,
        rule_id: "ptu_exemption".to_string(),
        rule_name: "PTU Exemption".to_string(),
        legal_ref: "LISR art. 93 fr. XIV".to_string(),
        input: serde_json::json!({
            "amount": amount.to_string(),
            "ceiling": ceiling.to_string(),
            "available": split.available.map(|a| a.to_string()),
        }),
        output: serde_json::json!({
            "exempt": split.exempt.to_string(),
            "taxable": split.taxable.to_string(),
        }),
        reasoning: format!(
            "PTU {} exempt up to {}: {} exempt, {} taxable",
            amount, ceiling, split.exempt, split.taxable
        ),
    };

    Ok(PtuResult { split, audit_step })
}

/// One worker's facts for the pool distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtuParticipant {
    /// Employee identifier.
    pub employee_id: String,
    /// Days worked in the fiscal year.
    pub days_worked: Quantity,
    /// Salary earned in the fiscal year.
    pub salary_earned: Money,
    /// Current monthly salary, for the three-month limit.
    pub monthly_salary: Money,
    /// Average PTU received over the last three years.
    #[serde(default)]
    pub average_last_three_years: Money,
}

/// One worker's share of the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtuShare {
    /// Employee identifier.
    pub employee_id: String,
    /// Share from the days-worked half.
    pub by_days: Money,
    /// Share from the salary half.
    pub by_salary: Money,
    /// The individual limit.
    pub limit: Money,
    /// Amount paid: `min(by_days + by_salary, limit)`, floored to the cent.
    pub amount: Money,
    /// Amount above the limit.
    pub excess: Money,
}

/// The distributed pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtuDistribution {
    /// The company pool.
    pub pool: Money,
    /// Shares in participant order.
    pub shares: Vec<PtuShare>,
    /// Sum of paid shares.
    pub distributed: Money,
    /// `pool − distributed`: limit excesses plus cent residue.
    pub undistributed: Money,
}

/// Distributes a company PTU pool among participants.
///
/// Shares are floored to the cent so the distributed total never exceeds
/// the pool.
///
/// # Errors
///
/// * `InvalidInput` when there are no participants, the pool is negative,
///   or days worked or salaries sum to zero
pub fn distribute_ptu(pool: Money, participants: &[PtuParticipant]) -> EngineResult<PtuDistribution> {
    if participants.is_empty() {
        return Err(EngineError::invalid_input("participants", "no participants"));
    }
    if pool.is_negative() {
        return Err(EngineError::invalid_input(
            "pool",
            format!("must not be negative, got {}", pool),
        ));
    }

    let total_days = participants
        .iter()
        .try_fold(Quantity::ZERO, |sum, p| sum.checked_add(p.days_worked))?;
    let total_salary = Money::checked_sum(participants.iter().map(|p| p.salary_earned))?;
    if !total_days.is_positive() || !total_salary.is_positive() {
        return Err(EngineError::invalid_input(
            "participants",
            "days worked and salaries must sum to a positive amount",
        ));
    }

    let days_half = pool.div_int(2, RoundingMode::Floor)?;
    let salary_half = pool.checked_sub(days_half)?;

    let mut shares = Vec::with_capacity(participants.len());
    for participant in participants {
        let by_days = days_half.scale(participant.days_worked, total_days, RoundingMode::Floor)?;
        let by_salary =
            salary_half.prorate(participant.salary_earned, total_salary, RoundingMode::Floor)?;
        let limit = participant
            .monthly_salary
            .times_int(3)?
            .max(participant.average_last_three_years);

        let earned = by_days.checked_add(by_salary)?;
        let amount = earned.min(limit).round_to_cent(RoundingMode::Floor)?;
        let excess = earned.checked_sub(limit)?.non_negative();

        shares.push(PtuShare {
            employee_id: participant.employee_id.clone(),
            by_days,
            by_salary,
            limit,
            amount,
            excess,
        });
    }

    let distributed = Money::checked_sum(shares.iter().map(|share| share.amount))?;
    let undistributed = pool.checked_sub(distributed)?;

    tracing::debug!(
        pool = %pool,
        participants = participants.len(),
        distributed = %distributed,
        undistributed = %undistributed,
        "distributed PTU pool"
    );

    Ok(PtuDistribution {
        pool,
        shares,
        distributed,
        undistributed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fiscal_2026;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn participant(id: &str, days: i64, salary: &str, monthly: &str) -> PtuParticipant {
        PtuParticipant {
            employee_id: id.to_string(),
            days_worked: Quantity::from_int(days),
            salary_earned: money(salary),
            monthly_salary: money(monthly),
            average_last_three_years: Money::ZERO,
        }
    }

    #[test]
    fn test_ptu_exemption_is_15_uma() {
        let fiscal = fiscal_2026();
        let result = calculate_ptu(money("5000"), None, &fiscal, 1).unwrap();
        assert_eq!(result.split.exempt, money("1759.65"));
        assert_eq!(result.split.taxable, money("3240.35"));
    }

    #[test]
    fn test_negative_ptu_rejected() {
        let fiscal = fiscal_2026();
        assert!(calculate_ptu(money("-1"), None, &fiscal, 1).is_err());
    }

    #[test]
    fn test_pool_split_by_days_and_salary() {
        let participants = vec![
            participant("a", 365, "180000", "15000"),
            participant("b", 365, "60000", "5000"),
        ];
        let distribution = distribute_ptu(money("20000"), &participants).unwrap();

        // Days half: 5000 each. Salary half: 7500 and 2500.
        assert_eq!(distribution.shares[0].by_days, money("5000"));
        assert_eq!(distribution.shares[0].by_salary, money("7500"));
        assert_eq!(distribution.shares[0].amount, money("12500"));
        assert_eq!(distribution.shares[1].amount, money("7500"));
        assert_eq!(distribution.undistributed, Money::ZERO);
    }

    #[test]
    fn test_share_limited_to_three_months() {
        let participants = vec![
            participant("a", 365, "180000", "15000"),
            participant("b", 365, "24000", "2000"),
        ];
        let distribution = distribute_ptu(money("40000"), &participants).unwrap();

        // b: 10000 + 20000 × 24000 / 204000 = 12352.94..., limited to 6000.
        let b = &distribution.shares[1];
        assert_eq!(b.limit, money("6000"));
        assert_eq!(b.amount, money("6000"));
        assert!(b.excess.is_positive());
        assert!(distribution.distributed <= distribution.pool);
    }

    #[test]
    fn test_three_year_average_raises_limit() {
        let mut b = participant("b", 365, "24000", "2000");
        b.average_last_three_years = money("9000");
        let participants = vec![participant("a", 365, "180000", "15000"), b];
        let distribution = distribute_ptu(money("40000"), &participants).unwrap();
        assert_eq!(distribution.shares[1].limit, money("9000"));
        assert_eq!(distribution.shares[1].amount, money("9000"));
    }

    #[test]
    fn test_empty_participants_rejected() {
        assert!(matches!(
            distribute_ptu(money("1000"), &[]),
            Err(EngineError::InvalidInput { .. })
        ));
    }
}
