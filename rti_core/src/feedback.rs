//! Feedback step — spec §4.4.

use std::time::Instant;

use rti_common::status::NlpStatus;
use rti_common::traits::{ConstraintsModule, CostModule, DynamicsModule, GlobalizationModule, QpSolver, RegularizeModule};

use crate::driver::RtiDriver;
use crate::error::RtiError;
use crate::options::RtiPhase;
use crate::preparation::compute_residuals;

/// Runs the measurement-dependent feedback step: RHS approximation,
/// regularization, QP solve, globalization, iterate update.
///
/// Preconditions: the LHS is already condensed (when `rti_phase ==
/// FEEDBACK`, by a prior preparation call) or is condensed here as part of
/// the QP solve (when `rti_phase == PREPARATION_AND_FEEDBACK`).
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
    let pre_row = driver.mem.iter;

    // 1. Approximate QP RHS (primal step + absolute duals).
    let t0 = Instant::now();
    for stage in 0..driver.dims.num_stages() {
        driver.dynamics.compute_fun(stage)?;
        driver.cost.compute_gradient(stage)?;
    }
    driver.timings.time_lin += t0.elapsed().as_secs_f64();

    // 2. Optional residual logging, before incrementing `iter`; this is the
    // only log that belongs at the pre-increment row.
    if driver.opts.rti_log_residuals {
        let res = compute_residuals(driver);
        driver.mem.stats.record_nlp_residuals(pre_row, res);
    }

    // 3. Advance the iteration counter. Everything recorded from here on
    // (qp_status, qp residuals, the step-11 re-evaluated residuals) is
    // written at the post-increment row.
    driver.mem.iter += 1;
    let row = driver.mem.iter;

    // 4. Regularize: RHS only if the LHS was already condensed by a prior
    //    preparation, full regularization when this call also builds the LHS.
    let precondensed_lhs = !matches!(driver.opts.rti_phase, RtiPhase::PreparationAndFeedback);
    let t_reg = Instant::now();
    for stage in 0..driver.dims.num_stages() {
        if precondensed_lhs {
            driver.regularize.regularize_rhs(stage)?;
        } else {
            driver.regularize.regularize(stage)?;
        }
    }
    driver.timings.time_reg += t_reg.elapsed().as_secs_f64();

    // 5. First-call warm-start policy.
    let restore_warm_start = if driver.mem.is_first_call {
        if !driver.opts.shared.warm_start_first_qp {
            driver.qp_solver.opts_set("warm_start", 0.0)?;
            true
        } else if driver.opts.shared.warm_start_first_qp_from_nlp {
            driver.qp_solver.opts_set("warm_start_from_nlp", 1.0)?;
            true
        } else {
            false
        }
    } else {
        false
    };

    // 6. Solve the condensed QP.
    let t_qp = Instant::now();
    let (qp_status, qp_iter) = driver.qp_solver.solve_qp_and_correct_dual(precondensed_lhs)?;
    driver.timings.time_qp_sol += t_qp.elapsed().as_secs_f64();
    driver.mem.stats.record_qp(row, qp_status, qp_iter);

    // 7. Reject unacceptable QP statuses (MAXITER is tolerated).
    if !qp_status.is_acceptable() {
        driver.mem.status = NlpStatus::QpFailure;
        return Ok(());
    }

    // 8. Restore the default warm-start setting after the first call.
    if restore_warm_start {
        driver.qp_solver.opts_set("warm_start", 1.0)?;
    }

    // 9. Optional external QP residuals.
    if driver.opts.shared.ext_qp_res {
        let res = compute_residuals(driver);
        driver.mem.stats.record_qp_residuals(row, res);
    }

    // 10. Globalization; non-success is logged but not fatal.
    let t_glob = Instant::now();
    driver.ws.snapshot(&driver.ux[..driver.ux.len()]);
    match driver.globalization.find_acceptable_iterate(&mut driver.ux[..], &mut driver.pi[..], &mut driver.lam[..]) {
        Ok((status, _step_size)) => {
            tracing::trace!(?status, "globalization accepted step");
        }
        Err(err) => {
            tracing::warn!(%err, "globalization did not find an acceptable step; keeping partial iterate");
        }
    }
    driver.timings.time_glob += t_glob.elapsed().as_secs_f64();

    driver.mem.status = NlpStatus::Success;
    driver.mem.is_first_call = false;

    // 11. Optional residual re-evaluation at the new iterate.
    if driver.opts.rti_log_residuals && !driver.opts.rti_log_only_available_residuals {
        for stage in 0..driver.dims.num_stages() {
            driver.dynamics.compute_fun_and_adj(stage)?;
            driver.cost.compute_gradient(stage)?;
            driver.constraints.update_qp_matrices(stage)?;
        }
        let res = compute_residuals(driver);
        driver.mem.stats.record_nlp_residuals(row, res);
    }

    Ok(())
}
