//! Standard (non-AS-RTI) preparation step — spec §4.3.

use std::time::Instant;

use rti_common::residuals::Residuals;
use rti_common::traits::{ConstraintsModule, CostModule, DynamicsModule, GlobalizationModule, QpSolver, RegularizeModule};

use crate::driver::RtiDriver;
use crate::error::RtiError;
use crate::options::RtiPhase;

/// Levenberg–Marquardt damping factor added to the Hessian during
/// linearization, matching the original's fixed factor of `1.0`.
const LM_FACTOR: f64 = 1.0;

/// Runs the measurement-independent preparation: linearize, add the L-M
/// term, and (when `rti_phase == PREPARATION`) regularize and condense the
/// left-hand side.
pub fn run<Dyn, Cost, Cons, Reg, Qp, Glob>(
    driver: &mut RtiDriver<'_, Dyn, Cost, Cons, Reg, Qp, Glob>,
) -> Result<(), RtiError>
where
    Dyn: DynamicsModule,
    Cost: CostModule,
    Cons: ConstraintsModule,
    Reg: RegularizeModule,
    Qp: QpSolver,
    Glob: GlobalizationModule,
{
    linearize(driver)?;
    add_levenberg_marquardt(driver);

    if matches!(driver.opts.rti_phase, RtiPhase::Preparation) {
        let t0 = Instant::now();
        for stage in 0..driver.dims.num_stages() {
            driver.regularize.regularize_lhs(stage)?;
        }
        driver.qp_solver.condense_lhs()?;
        driver.timings.time_reg += t0.elapsed().as_secs_f64();
    }
    Ok(())
}

/// Evaluates cost/constraint/dynamics Jacobians and writes them into the
/// stage-structured QP data; tracked under `time_lin`.
pub fn linearize<Dyn, Cost, Cons, Reg, Qp, Glob>(
    driver: &mut RtiDriver<'_, Dyn, Cost, Cons, Reg, Qp, Glob>,
) -> Result<(), RtiError>
where
    Dyn: DynamicsModule,
    Cost: CostModule,
    Cons: ConstraintsModule,
    Reg: RegularizeModule,
    Qp: QpSolver,
    Glob: GlobalizationModule,
{
    let t0 = Instant::now();
    for stage in 0..driver.dims.num_stages() {
        driver.dynamics.compute_fun_and_adj(stage)?;
        driver.cost.compute_gradient(stage)?;
        driver.constraints.update_qp_matrices(stage)?;
    }
    driver.timings.time_lin += t0.elapsed().as_secs_f64();
    Ok(())
}

/// Adds the Levenberg–Marquardt term to the Hessian blocks with the fixed
/// damping factor. The original applies this unconditionally after
/// linearization, regardless of `rti_phase`.
pub fn add_levenberg_marquardt<Dyn, Cost, Cons, Reg, Qp, Glob>(
    driver: &mut RtiDriver<'_, Dyn, Cost, Cons, Reg, Qp, Glob>,
) where
    Dyn: DynamicsModule,
    Cost: CostModule,
    Cons: ConstraintsModule,
    Reg: RegularizeModule,
    Qp: QpSolver,
    Glob: GlobalizationModule,
{
    for stage in 0..driver.dims.num_stages() {
        driver.cost.add_levenberg_marquardt(stage, LM_FACTOR);
    }
}

/// Evaluates NLP KKT residuals at the current iterate and linearization.
/// Used both by the feedback step's residual logging and by
/// `RtiDriver::eval_kkt_residual`.
pub fn compute_residuals<Dyn, Cost, Cons, Reg, Qp, Glob>(
    driver: &RtiDriver<'_, Dyn, Cost, Cons, Reg, Qp, Glob>,
) -> Residuals
where
    Dyn: DynamicsModule,
    Cost: CostModule,
    Cons: ConstraintsModule,
    Reg: RegularizeModule,
    Qp: QpSolver,
    Glob: GlobalizationModule,
{
    let mut stat = 0.0_f64;
    let mut eq = 0.0_f64;
    for stage in 0..driver.dims.num_stages() {
        for &v in driver.cost.grad_ptr(stage) {
            stat = stat.max(v.abs());
        }
        for &v in driver.dynamics.fun_ptr(stage) {
            eq = eq.max(v.abs());
        }
    }
    let mut ineq = 0.0_f64;
    for stage in 0..driver.dims.num_stages() {
        for &v in driver.constraints.adj_ptr(stage) {
            ineq = ineq.max(v.abs());
        }
    }
    Residuals { stat, eq, ineq, comp: 0.0 }
}

/// `rayon-stages` counterpart of [`compute_residuals`], folding each residual
/// component across stages with `into_par_iter` instead of a sequential
/// `for`. Every stage's contribution reads already-computed per-stage data
/// through `&self` accessors (`grad_ptr`/`fun_ptr`/`adj_ptr`), so — unlike
/// `linearize`, which dispatches through a single `&mut self` collaborator
/// per type and so cannot be split across stages without restructuring the
/// driver — this reduction is genuinely safe to run in parallel.
///
/// Kept as a separate function, rather than a `cfg`-swapped definition of
/// `compute_residuals` itself, so the added `Sync` bounds apply only to
/// `RtiDriver::eval_kkt_residual` (the diagnostic entry point that calls
/// this) and not to every generic caller in `feedback.rs` — the
/// `Rc<RefCell<_>>`-based mocks the test suite builds its drivers from are
/// never `Sync`, and still don't need to be.
#[cfg(feature = "rayon-stages")]
pub fn compute_residuals_parallel<Dyn, Cost, Cons, Reg, Qp, Glob>(
    driver: &RtiDriver<'_, Dyn, Cost, Cons, Reg, Qp, Glob>,
) -> Residuals
where
    Dyn: DynamicsModule + Sync,
    Cost: CostModule + Sync,
    Cons: ConstraintsModule + Sync,
    Reg: RegularizeModule,
    Qp: QpSolver,
    Glob: GlobalizationModule,
{
    use rayon::prelude::*;

    let num_stages = driver.dims.num_stages();
    let stat = (0..num_stages)
        .into_par_iter()
        .map(|stage| driver.cost.grad_ptr(stage).iter().fold(0.0_f64, |acc, &v| acc.max(v.abs())))
        .reduce(|| 0.0_f64, f64::max);
    let eq = (0..num_stages)
        .into_par_iter()
        .map(|stage| driver.dynamics.fun_ptr(stage).iter().fold(0.0_f64, |acc, &v| acc.max(v.abs())))
        .reduce(|| 0.0_f64, f64::max);
    let ineq = (0..num_stages)
        .into_par_iter()
        .map(|stage| driver.constraints.adj_ptr(stage).iter().fold(0.0_f64, |acc, &v| acc.max(v.abs())))
        .reduce(|| 0.0_f64, f64::max);
    Residuals { stat, eq, ineq, comp: 0.0 }
}
