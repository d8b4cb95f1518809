//! AS-RTI (Advanced-Step RTI) preparation variants — spec §4.5.
//!
//! Executed instead of the standard preparation when `as_rti_strategy !=
//! Standard`. Every variant ends by running the same standard LHS
//! preparation tail (linearize, add L-M, regularize LHS, condense LHS); the
//! level-specific inner loop just does extra nonlinear work first, ahead of
//! the next measurement.

use std::time::Instant;

use rti_common::status::NlpStatus;
use rti_common::traits::{ConstraintsModule, CostModule, DynamicsModule, GlobalizationModule, QpSolver, RegularizeModule};

use crate::driver::RtiDriver;
use crate::error::RtiError;
use crate::options::{AdvancementStrategy, AsRtiStrategy};
use crate::preparation;

pub fn run_preparation<Dyn, Cost, Cons, Reg, Qp, Glob>(
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
    let strategy = driver.opts.as_rti_strategy;
    let is_first_call = driver.mem.is_first_call;

    if !is_first_call {
        advance_initial_state(driver)?;
    } else {
        sanity_checks(driver)?;
    }

    // LEVEL_D's inner loop runs unconditionally, including on the first
    // call; LEVEL_A/B/C's inner loops are skipped on the first call (there is
    // no backed-up iterate / no prior linearization to reuse yet), so on the
    // first call they fall through to plain standard preparation below.
    match strategy {
        AsRtiStrategy::LevelA => {
            if !is_first_call {
                level_a(driver)?;
            }
        }
        AsRtiStrategy::LevelB { k } => {
            if !is_first_call {
                for _ in 0..k {
                    level_b_iter(driver)?;
                }
            }
        }
        AsRtiStrategy::LevelC { k } => {
            if !is_first_call {
                for _ in 0..k {
                    level_c_iter(driver)?;
                }
            }
        }
        AsRtiStrategy::LevelD { k } => {
            for _ in 0..k {
                level_d_iter(driver)?;
            }
        }
        AsRtiStrategy::Standard => unreachable!("run_preparation is only called for non-standard strategies"),
    }

    // Every variant ends with the standard LHS preparation.
    preparation::linearize(driver)?;
    preparation::add_levenberg_marquardt(driver);
    let t0 = Instant::now();
    for stage in 0..driver.dims.num_stages() {
        driver.regularize.regularize_lhs(stage)?;
    }
    driver.qp_solver.condense_lhs()?;
    driver.timings.time_reg += t0.elapsed().as_secs_f64();

    if matches!(strategy, AsRtiStrategy::LevelA) {
        backup_iterate(driver);
    }

    Ok(())
}

/// Moves the initial-state box constraint to an estimate of the next
/// measurement. Skipped on the first call (there is no prior iterate to
/// extrapolate from).
fn advance_initial_state<Dyn, Cost, Cons, Reg, Qp, Glob>(
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
    let x1_offset = driver.dims.x_offset(1);
    let nx1 = driver.dims.nx[1];

    match driver.opts.as_rti_advancement {
        AdvancementStrategy::NoAdvance => {}
        AdvancementStrategy::ShiftAdvance => {
            tracing::trace!("AS-RTI: shift-advancing initial state box to x[1]");
            let x1 = &driver.ux[x1_offset..x1_offset + nx1];
            driver.constraints.set_initial_state_bound(x1);
        }
        AdvancementStrategy::SimulateAdvance => {
            tracing::trace!("AS-RTI: simulate-advancing initial state box via dynamics");
            driver.dynamics.compute_fun(0)?;
            // `fun_ptr(0)` holds `phi(x[0], u[0]) - x_next`; adding the
            // current `x[1]` back recovers `phi`, the simulated next state.
            let phi_minus_xnext = driver.dynamics.fun_ptr(0);
            driver.ws.advance_scratch[..nx1].copy_from_slice(phi_minus_xnext);
            for i in 0..nx1 {
                driver.ws.advance_scratch[i] += driver.ux[x1_offset + i];
            }
            driver.constraints.set_initial_state_bound(&driver.ws.advance_scratch[..nx1]);
        }
    }
    Ok(())
}

/// First-call-only sanity checks the original performs lazily on first use
/// rather than at `precompute` time. Preserved here at the same point in
/// the call sequence; `RtiDriver::precompute` additionally runs the
/// dimension check eagerly so misconfiguration surfaces before the first
/// cycle too.
fn sanity_checks<Dyn, Cost, Cons, Reg, Qp, Glob>(
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
    driver.dims.check_as_rti_shiftable()?;
    match driver.opts.as_rti_strategy {
        AsRtiStrategy::LevelC { .. } => {
            for stage in 0..driver.dims.num_stages() {
                let module_ng = driver.constraints.dims_get_ng(stage);
                let qp_ng = driver.qp_solver.dims_get_ng(stage);
                if module_ng != qp_ng {
                    return Err(
                        rti_common::error::ValidationError::NonlinearInequalitiesForbidden {
                            stage,
                            module_ng,
                            qp_ng,
                        }
                        .into(),
                    );
                }
            }
        }
        AsRtiStrategy::LevelB { .. } => {
            if let Some(stage) = driver.dims.ns.iter().position(|&ns| ns > 0) {
                return Err(rti_common::error::ValidationError::SoftConstraintsForbidden {
                    stage,
                    ns: driver.dims.ns[stage],
                }
                .into());
            }
        }
        _ => {}
    }
    Ok(())
}

/// LEVEL_A: restores the iterate backed up at the end of the previous
/// cycle, then runs a full shadow feedback step against it. Residuals are
/// evaluated twice by design — once inside the restored-iterate feedback,
/// once (if logging is enabled) by the caller after `run_preparation`
/// returns — to keep every submodule's internal memory consistent with the
/// restored iterate rather than the iterate that was current on entry.
fn level_a<Dyn, Cost, Cons, Reg, Qp, Glob>(
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
    let len = driver.ux.len();
    driver.ux[..len].copy_from_slice(&driver.mem.backup_iterate[..len]);
    crate::feedback::run(driver)?;
    tracing::debug!(label = AsRtiStrategy::LevelA.label(), "AS-RTI shadow feedback complete");
    Ok(())
}

/// LEVEL_B inner iteration: zero-order QP update (reuse LHS, refresh RHS
/// only), RHS regularization, solve, globalization. Forbidden on problems
/// with soft constraints (checked by [`sanity_checks`] on the first call).
fn level_b_iter<Dyn, Cost, Cons, Reg, Qp, Glob>(
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
    inner_update(driver, AsRtiStrategy::LevelB { k: 0 }, |qp| qp.zero_order_qp_update())
}

/// LEVEL_C inner iteration: full-order update on problems with linear
/// inequalities everywhere (checked by [`sanity_checks`] on the first call).
fn level_c_iter<Dyn, Cost, Cons, Reg, Qp, Glob>(
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
    inner_update(driver, AsRtiStrategy::LevelC { k: 0 }, |qp| qp.level_c_update())
}

fn inner_update<Dyn, Cost, Cons, Reg, Qp, Glob>(
    driver: &mut RtiDriver<'_, Dyn, Cost, Cons, Reg, Qp, Glob>,
    label_of: AsRtiStrategy,
    update: impl FnOnce(&mut Qp) -> Result<(), rti_common::traits::QpError>,
) -> Result<(), RtiError>
where
    Dyn: DynamicsModule,
    Cost: CostModule,
    Cons: ConstraintsModule,
    Reg: RegularizeModule,
    Qp: QpSolver,
    Glob: GlobalizationModule,
{
    let row = driver.mem.iter;
    update(&mut driver.qp_solver)?;
    for stage in 0..driver.dims.num_stages() {
        driver.regularize.regularize_rhs(stage)?;
    }
    let (status, iters) = driver.qp_solver.solve_qp_and_correct_dual(true)?;
    driver.mem.stats.record_qp(row, status, iters);
    driver.mem.iter += 1;
    if !status.is_acceptable() {
        driver.mem.status = NlpStatus::QpFailure;
        return Ok(());
    }
    for stage in 0..driver.dims.num_stages() {
        driver.regularize.correct_dual_sol(stage)?;
    }
    if let Err(err) =
        driver.globalization.find_acceptable_iterate(&mut driver.ux[..], &mut driver.pi[..], &mut driver.lam[..])
    {
        tracing::warn!(label = label_of.label(), %err, "AS-RTI inner-loop globalization did not converge");
    }

    // A zero-/full-order update only refreshes the QP vectors, not the
    // underlying Jacobians; computing a meaningful residual here needs the
    // extra dynamics/cost/constraint evaluations that
    // `rti_log_only_available_residuals` exists to skip.
    if driver.opts.rti_log_residuals && !driver.opts.rti_log_only_available_residuals {
        for stage in 0..driver.dims.num_stages() {
            driver.dynamics.compute_fun_and_adj(stage)?;
            driver.cost.compute_gradient(stage)?;
            driver.constraints.update_qp_matrices(stage)?;
        }
        let res = preparation::compute_residuals(driver);
        driver.mem.stats.record_nlp_residuals(row, res);
    }
    Ok(())
}

/// LEVEL_D inner iteration: a full SQP step (linearize, L-M, full
/// regularization, solve, globalization) — equivalent to one standalone SQP
/// iteration, run `as_rti_iter` times ahead of the measurement.
fn level_d_iter<Dyn, Cost, Cons, Reg, Qp, Glob>(
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
    let row = driver.mem.iter;
    preparation::linearize(driver)?;
    preparation::add_levenberg_marquardt(driver);
    let t0 = Instant::now();
    for stage in 0..driver.dims.num_stages() {
        driver.regularize.regularize(stage)?;
    }
    driver.timings.time_reg += t0.elapsed().as_secs_f64();

    let (status, iters) = driver.qp_solver.solve_qp_and_correct_dual(false)?;
    driver.mem.stats.record_qp(row, status, iters);
    driver.mem.iter += 1;
    if !status.is_acceptable() {
        driver.mem.status = NlpStatus::QpFailure;
        return Ok(());
    }
    if let Err(err) =
        driver.globalization.find_acceptable_iterate(&mut driver.ux[..], &mut driver.pi[..], &mut driver.lam[..])
    {
        tracing::warn!(label = AsRtiStrategy::LevelD { k: 0 }.label(), %err, "AS-RTI inner-loop globalization did not converge");
    }

    // Unlike the zero-/full-order updates, this iteration already ran a full
    // linearization, so the residual is available from data already on hand
    // with no extra evaluation to gate behind `rti_log_only_available_residuals`.
    if driver.opts.rti_log_residuals {
        let res = preparation::compute_residuals(driver);
        driver.mem.stats.record_nlp_residuals(row, res);
    }
    Ok(())
}

/// Copies the current iterate into `mem.backup_iterate` so LEVEL_A's next
/// cycle can restore it as the shadow-feedback starting point.
fn backup_iterate<Dyn, Cost, Cons, Reg, Qp, Glob>(
    driver: &mut RtiDriver<'_, Dyn, Cost, Cons, Reg, Qp, Glob>,
) where
    Dyn: DynamicsModule,
    Cost: CostModule,
    Cons: ConstraintsModule,
    Reg: RegularizeModule,
    Qp: QpSolver,
    Glob: GlobalizationModule,
{
    let len = driver.ux.len();
    driver.mem.backup_iterate[..len].copy_from_slice(&driver.ux[..len]);
}
