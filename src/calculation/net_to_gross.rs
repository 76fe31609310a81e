//! Inverse solver: the gross pay that yields a desired net pay.
//!
//! `net(g) = g − ISR(g) − IMSS_worker(g)` is evaluated with the same
//! calculators used for ordinary payroll, and the gross is found by
//! bisection over cent-rounded candidates. The function is not monotonic
//! (the employment subsidy disappears abruptly at its upper bound), so the
//! solver keeps a bracket `net(lo) < target ≤ net(hi)` rather than relying
//! on monotonicity.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::fiscal::{FiscalConfig, IsrTable, SubsidyTable};
use crate::fixed_point::{Money, Quantity, Rate, RoundingMode, CENT_BP};
use crate::models::PayrollPeriod;

use super::imss::{calculate_imss, ImssInput};
use super::isr::calculate_isr;

/// Solver limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Largest acceptable `|net(g) − target|`.
    pub tolerance: Money,
    /// Maximum evaluations of `net(g)`, bracket expansion included.
    pub max_iterations: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: Money::from_bp(CENT_BP),
            max_iterations: 128,
        }
    }
}

/// Everything `net(g)` depends on besides `g`.
#[derive(Debug, Clone)]
pub struct NetToGrossContext<'a> {
    fiscal: &'a FiscalConfig,
    days: Quantity,
    isr_table: IsrTable,
    subsidy_table: SubsidyTable,
    integration_factor: Quantity,
    subject_to_imss: bool,
    minimum_wage: Money,
}

impl<'a> NetToGrossContext<'a> {
    /// Builds the context for one pay period.
    ///
    /// The period tables are derived once here, not on every evaluation.
    pub fn new(
        fiscal: &'a FiscalConfig,
        period: &PayrollPeriod,
        integration_factor: Quantity,
        subject_to_imss: bool,
        border_zone: bool,
    ) -> EngineResult<Self> {
        period.validate()?;
        if integration_factor < Quantity::ONE {
            return Err(EngineError::invalid_input(
                "integration_factor",
                format!("must be at least 1, got {}", integration_factor),
            ));
        }
        let tax_days = period.tax_table_days();
        Ok(Self {
            fiscal,
            days: period.days_in_period,
            isr_table: fiscal.isr_table_for_days(tax_days)?,
            subsidy_table: fiscal.subsidy_table_for_days(tax_days)?,
            integration_factor,
            subject_to_imss,
            minimum_wage: fiscal.minimum_wage(border_zone),
        })
    }
}

/// The decomposition of one gross candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetBreakdown {
    /// Gross pay for the period.
    pub gross: Money,
    /// ISR withheld, net of the applied subsidy.
    pub isr: Money,
    /// Subsidy credited against the ISR.
    pub subsidy_applied: Money,
    /// Worker IMSS contributions.
    pub imss_worker: Money,
    /// `gross − isr − imss_worker`.
    pub net: Money,
}

/// A converged solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetToGrossResult {
    /// The requested net.
    pub target_net: Money,
    /// The solution and its decomposition.
    pub breakdown: NetBreakdown,
    /// `net − target_net`.
    pub residual: Money,
    /// Evaluations spent.
    pub iterations: u32,
}

/// Evaluates `net(gross)` for a period.
pub fn forward_net(gross: Money, ctx: &NetToGrossContext<'_>) -> EngineResult<NetBreakdown> {
    let rounding = &ctx.fiscal.rounding;
    let isr = calculate_isr(gross, &ctx.isr_table, Some(&ctx.subsidy_table), rounding)?;

    let imss_worker = if ctx.subject_to_imss && gross.is_positive() {
        let daily = gross.div_quantity(ctx.days, rounding.intermediate)?;
        let sdi = daily.times(ctx.integration_factor, rounding.intermediate)?;
        let input = ImssInput {
            sbc: sdi.min(ctx.fiscal.sbc_cap_daily()?),
            days: ctx.days,
            absence_days: Quantity::ZERO,
            work_risk_premium: Rate::ZERO,
            minimum_wage_earner: daily <= ctx.minimum_wage,
        };
        calculate_imss(&input, ctx.fiscal, 1)?.worker_total
    } else {
        Money::ZERO
    };

    let net = gross.checked_sub(isr.final_tax)?.checked_sub(imss_worker)?;
    Ok(NetBreakdown {
        gross,
        isr: isr.final_tax,
        subsidy_applied: isr.subsidy_applied,
        imss_worker,
        net,
    })
}

struct Search<'s, 'a> {
    ctx: &'s NetToGrossContext<'a>,
    config: SolverConfig,
    target: Money,
    iterations: u32,
    best: Option<(Money, Money)>,
}

impl Search<'_, '_> {
    fn probe(&mut self, gross: Money) -> EngineResult<NetBreakdown> {
        self.iterations += 1;
        let breakdown = forward_net(gross, self.ctx)?;
        let residual = breakdown.net.checked_sub(self.target)?;
        let improves = match self.best {
            Some((_, best)) => residual.bp().unsigned_abs() < best.bp().unsigned_abs(),
            None => true,
        };
        if improves {
            self.best = Some((gross, residual));
        }
        Ok(breakdown)
    }

    fn converged(&self, breakdown: &NetBreakdown) -> EngineResult<Option<NetToGrossResult>> {
        let residual = breakdown.net.checked_sub(self.target)?;
        if residual.bp().unsigned_abs() > self.config.tolerance.bp().unsigned_abs() {
            return Ok(None);
        }
        tracing::debug!(
            target_net = %self.target,
            gross = %breakdown.gross,
            residual = %residual,
            iterations = self.iterations,
            "net-to-gross solver converged"
        );
        Ok(Some(NetToGrossResult {
            target_net: self.target,
            breakdown: *breakdown,
            residual,
            iterations: self.iterations,
        }))
    }

    fn exhausted(&self) -> bool {
        self.iterations >= self.config.max_iterations
    }

    fn failure(&self) -> EngineError {
        let (best_gross, residual) = self.best.unwrap_or((Money::ZERO, Money::ZERO));
        tracing::warn!(
            target_net = %self.target,
            best_gross = %best_gross,
            residual = %residual,
            iterations = self.iterations,
            "net-to-gross solver did not converge"
        );
        EngineError::ConvergenceFailure {
            best_gross,
            residual,
            iterations: self.iterations,
        }
    }
}

/// Finds the gross pay whose net is within `config.tolerance` of
/// `target_net`.
///
/// # Errors
///
/// * `InvalidInput` when the target is not positive
/// * `ConvergenceFailure` when the evaluation budget runs out, or when no
///   cent candidate is left inside the bracket
pub fn solve_net_to_gross(
    target_net: Money,
    ctx: &NetToGrossContext<'_>,
    config: SolverConfig,
) -> EngineResult<NetToGrossResult> {
    if !target_net.is_positive() {
        return Err(EngineError::invalid_input(
            "target_net",
            format!("must be positive, got {}", target_net),
        ));
    }
    let cent = Money::from_bp(CENT_BP);
    let mut search = Search {
        ctx,
        config,
        target: target_net,
        iterations: 0,
        best: None,
    };

    // Deductions are never negative, so net(target) ≤ target.
    let mut lo = target_net.round_to_cent(RoundingMode::Ceiling)?;
    let first = search.probe(lo)?;
    if let Some(result) = search.converged(&first)? {
        return Ok(result);
    }

    let mut hi = lo.times_int(2)?;
    loop {
        if search.exhausted() {
            return Err(search.failure());
        }
        let probe = search.probe(hi)?;
        if let Some(result) = search.converged(&probe)? {
            return Ok(result);
        }
        if probe.net >= target_net {
            break;
        }
        lo = hi;
        hi = hi.times_int(2)?;
    }

    loop {
        if search.exhausted() || hi.checked_sub(lo)? <= cent {
            return Err(search.failure());
        }
        let mid = lo
            .checked_add(hi)?
            .div_int(2, RoundingMode::Floor)?
            .round_to_cent(RoundingMode::Floor)?;
        let probe = search.probe(mid)?;
        if let Some(result) = search.converged(&probe)? {
            return Ok(result);
        }
        if probe.net < target_net {
            lo = mid;
        } else {
            hi = mid;
        }
    }
}
