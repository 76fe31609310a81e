//! Parallel payroll batches.
//!
//! Employees run on the rayon pool, one task per input. A failing employee
//! only fails its own outcome.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::orchestrator::PayrollOrchestrator;
use super::run::{PayrollInput, RunOutcome, RunStatus};

/// Counts of a batch's outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Runs submitted.
    pub total: usize,
    /// Completed runs.
    pub completed: usize,
    /// Runs rejected by pre-calculation validation.
    pub rejected: usize,
    /// Runs that failed during or after calculation.
    pub failed: usize,
}

impl BatchSummary {
    /// Tallies `outcomes`.
    pub fn from_outcomes(outcomes: &[RunOutcome]) -> Self {
        outcomes
            .iter()
            .fold(BatchSummary::default(), |mut summary, outcome| {
                summary.total += 1;
                match outcome.status() {
                    RunStatus::Completed => summary.completed += 1,
                    RunStatus::Rejected => summary.rejected += 1,
                    _ => summary.failed += 1,
                }
                summary
            })
    }
}

/// A batch's outcomes, in input order.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// One outcome per input.
    pub outcomes: Vec<RunOutcome>,
    /// Counts by final state.
    pub summary: BatchSummary,
}

impl PayrollOrchestrator {
    /// Runs every input in parallel.
    ///
    /// Inputs for the same employee are serialized by the ledger when one
    /// is attached; their relative order is not defined.
    pub fn run_batch(&self, inputs: &[PayrollInput]) -> BatchOutcome {
        let outcomes: Vec<RunOutcome> = inputs.par_iter().map(|input| self.run(input)).collect();
        let summary = BatchSummary::from_outcomes(&outcomes);
        tracing::info!(
            total = summary.total,
            completed = summary.completed,
            rejected = summary.rejected,
            failed = summary.failed,
            "payroll batch finished"
        );
        BatchOutcome { outcomes, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_point::Money;
    use crate::models::{PayrollPeriod, Periodicity};
    use crate::orchestration::run::ExtraordinaryPayments;
    use crate::test_support::{employee, loader};
    use chrono::NaiveDate;

    fn input(id: &str, daily: Money) -> PayrollInput {
        let mut employee = employee(daily, NaiveDate::from_ymd_opt(2022, 5, 1).unwrap());
        employee.id = id.to_string();
        PayrollInput {
            run_id: "2026-01-q1".to_string(),
            employee,
            period: PayrollPeriod::new(
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
                Periodicity::Biweekly,
            )
            .unwrap(),
            incidents: vec![],
            overtime_week_to_date: vec![],
            extraordinary: ExtraordinaryPayments::default(),
            concepts: vec![],
        }
    }

    #[test]
    fn test_failures_are_isolated() {
        let orchestrator = PayrollOrchestrator::new(loader().clone());
        let inputs: Vec<PayrollInput> = (0..40)
            .map(|i| {
                let daily = if i % 10 == 3 {
                    Money::from_units(-1)
                } else {
                    Money::from_units(400 + i)
                };
                input(&format!("emp_{:03}", i), daily)
            })
            .collect();

        let batch = orchestrator.run_batch(&inputs);

        assert_eq!(
            batch.summary,
            BatchSummary {
                total: 40,
                completed: 36,
                rejected: 4,
                failed: 0
            }
        );
        for (input, outcome) in inputs.iter().zip(&batch.outcomes) {
            assert_eq!(outcome.run.employee_id, input.employee.id);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let orchestrator = PayrollOrchestrator::new(loader().clone());
        let inputs: Vec<PayrollInput> = (0..16)
            .map(|i| input(&format!("emp_{:03}", i), Money::from_units(350 + 25 * i)))
            .collect();

        let batch = orchestrator.run_batch(&inputs);
        for (input, outcome) in inputs.iter().zip(&batch.outcomes) {
            let sequential = orchestrator.run(input).result.unwrap();
            let parallel = outcome.result.as_ref().unwrap();
            assert_eq!(parallel.concepts, sequential.concepts);
            assert_eq!(parallel.totals, sequential.totals);
        }
    }
}
