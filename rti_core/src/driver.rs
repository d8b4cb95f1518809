//! The RTI driver: public entry point, precompute, and auxiliary getters.

use std::time::Instant;

use rti_common::dims::Dims;
use rti_common::error::ValidationError;
use rti_common::residuals::Residuals;
use rti_common::status::NlpStatus;
use rti_common::timings::Timings;
use rti_common::traits::{ConstraintsModule, CostModule, DynamicsModule, GlobalizationModule, QpSolver, RegularizeModule};

use crate::as_rti;
use crate::error::RtiError;
use crate::feedback;
use crate::memory::RtiMemory;
use crate::options::{AsRtiStrategy, RtiOpts, RtiPhase};
use crate::preparation;
use crate::workspace::RtiWorkspace;
use crate::MAX_PRIMAL_DIM;

/// The RTI driver, generic over the six collaborator interfaces it
/// orchestrates. An embedding application supplies concrete types (an
/// explicit-RK integrator for `Dyn`, a Gauss-Newton cost for `Cost`, an
/// active-set condensing QP for `Qp`, ...).
pub struct RtiDriver<'a, Dyn, Cost, Cons, Reg, Qp, Glob> {
    pub dims: Dims,
    pub opts: &'a mut RtiOpts,
    pub mem: RtiMemory<'a>,
    pub ws: RtiWorkspace<'a>,
    pub timings: Timings,

    pub dynamics: Dyn,
    pub cost: Cost,
    pub constraints: Cons,
    pub regularize: Reg,
    pub qp_solver: Qp,
    pub globalization: Glob,

    /// Stacked primal iterate (`u`, `x` per stage), flattened across stages.
    pub ux: heapless::Vec<f64, MAX_PRIMAL_DIM>,
    /// Equality-constraint (dynamics) multipliers, per stage transition.
    pub pi: heapless::Vec<f64, MAX_PRIMAL_DIM>,
    /// Inequality-constraint multipliers, per stage.
    pub lam: heapless::Vec<f64, MAX_PRIMAL_DIM>,
}

impl<'a, Dyn, Cost, Cons, Reg, Qp, Glob> RtiDriver<'a, Dyn, Cost, Cons, Reg, Qp, Glob>
where
    Dyn: DynamicsModule,
    Cost: CostModule,
    Cons: ConstraintsModule,
    Reg: RegularizeModule,
    Qp: QpSolver,
    Glob: GlobalizationModule,
{
    /// Validates options against dims and runs the AS-RTI sanity checks that
    /// the original performs lazily on first use; here they run eagerly so a
    /// misconfigured driver fails at construction rather than mid-cycle.
    pub fn precompute(&mut self) -> Result<(), ValidationError> {
        self.opts.validate(&self.dims)?;
        if let AsRtiStrategy::LevelC { .. } = self.opts.as_rti_strategy {
            for stage in 0..self.dims.num_stages() {
                let module_ng = self.constraints.dims_get_ng(stage);
                let qp_ng = self.qp_solver.dims_get_ng(stage);
                if module_ng != qp_ng {
                    return Err(ValidationError::NonlinearInequalitiesForbidden {
                        stage,
                        module_ng,
                        qp_ng,
                    });
                }
            }
        }
        Ok(())
    }

    /// The public cycle entry point. Dispatches on `rti_phase` and
    /// `as_rti_strategy` per the driver evaluation table.
    ///
    /// `iter`/the stats table and the sub-phase timers (`time_lin`,
    /// `time_reg`, `time_qp_sol`, `time_glob`) are reset only when this call
    /// enters a preparation (`PREPARATION` or `PREPARATION_AND_FEEDBACK`),
    /// mirroring the original's `reset_stats_and_sub_timers` being called
    /// only from the preparation entry points. A `FEEDBACK`-only call
    /// therefore continues writing at the `iter`/timer values the preceding
    /// preparation call left, so that running `PREPARATION` then `FEEDBACK`
    /// as two separate calls accumulates the same totals as a single
    /// `PREPARATION_AND_FEEDBACK` call.
    pub fn evaluate(&mut self) -> Result<(), RtiError> {
        let call_start = Instant::now();

        match (self.opts.rti_phase, self.opts.as_rti_strategy.is_standard()) {
            (RtiPhase::Feedback, _) => {
                let t0 = Instant::now();
                feedback::run(self)?;
                self.timings.time_feedback = t0.elapsed().as_secs_f64();
            }
            (RtiPhase::Preparation, true) => {
                self.mem.reset_for_preparation();
                self.timings.reset();
                let t0 = Instant::now();
                preparation::run(self)?;
                self.timings.time_preparation = t0.elapsed().as_secs_f64();
            }
            (RtiPhase::Preparation, false) => {
                self.mem.reset_for_preparation();
                self.timings.reset();
                let t0 = Instant::now();
                as_rti::run_preparation(self)?;
                self.timings.time_preparation = t0.elapsed().as_secs_f64();
            }
            (RtiPhase::PreparationAndFeedback, true) => {
                self.mem.reset_for_preparation();
                self.timings.reset();
                let t0 = Instant::now();
                preparation::run(self)?;
                self.timings.time_preparation = t0.elapsed().as_secs_f64();
                let t1 = Instant::now();
                feedback::run(self)?;
                self.timings.time_feedback = t1.elapsed().as_secs_f64();
            }
            (RtiPhase::PreparationAndFeedback, false) => {
                return Err(RtiError::Validation(ValidationError::AsRtiRequiresSplitPhases));
            }
        }

        self.timings.time_tot = call_start.elapsed().as_secs_f64();
        Ok(())
    }

    /// Builds `qp_in` from the current iterate and asks the QP solver to
    /// factorize, without running a full preparation cycle. Used by callers
    /// that need a fresh factorization ahead of a sensitivity evaluation.
    pub fn setup_qp_matrices_and_factorize(&mut self) -> Result<(), RtiError> {
        for stage in 0..self.dims.num_stages() {
            self.dynamics.compute_fun_and_adj(stage)?;
            self.cost.compute_gradient(stage)?;
            self.constraints.update_qp_matrices(stage)?;
        }
        self.qp_solver.condense_lhs()?;
        Ok(())
    }

    /// Resets the QP solver's internal memory and forces the warm-start
    /// policy to re-run on the next feedback, as if it were the first call.
    pub fn memory_reset_qp_solver(&mut self) {
        self.qp_solver.memory_reset();
        self.mem.force_first_call();
    }

    /// Diagnostic entry point independent of the phase state machine:
    /// re-initializes submodules, re-approximates both QP matrices and
    /// vectors, then computes KKT residuals at the current iterate.
    #[cfg(not(feature = "rayon-stages"))]
    pub fn eval_kkt_residual(&mut self) -> Result<Residuals, RtiError> {
        for stage in 0..self.dims.num_stages() {
            self.dynamics.compute_fun_and_adj(stage)?;
            self.cost.compute_gradient(stage)?;
            self.constraints.update_qp_matrices(stage)?;
        }
        Ok(preparation::compute_residuals(self))
    }

    /// Thin forward to the shared NLP layer's parametric-sensitivity
    /// evaluation; times itself into `time_solution_sensitivities`.
    pub fn eval_param_sens(&mut self) -> Result<(), RtiError> {
        let t0 = Instant::now();
        self.setup_qp_matrices_and_factorize()?;
        self.timings.time_solution_sensitivities += t0.elapsed().as_secs_f64();
        Ok(())
    }

    /// Thin forward: Lagrangian-gradient-with-respect-to-parameters.
    pub fn eval_lagr_grad_p(&mut self) -> Result<(), RtiError> {
        for stage in 0..self.dims.num_stages() {
            self.cost.compute_gradient(stage)?;
        }
        Ok(())
    }

    /// Thin forward: adjoint-direction solution sensitivity.
    pub fn eval_solution_sens_adj_p(&mut self) -> Result<(), RtiError> {
        let t0 = Instant::now();
        for stage in 0..self.dims.num_stages() {
            self.dynamics.compute_fun_and_adj(stage)?;
        }
        self.timings.time_solution_sensitivities += t0.elapsed().as_secs_f64();
        Ok(())
    }

    /// Dotted-field getter mirroring the original's single `get` entry
    /// point. `"time.<x>"` forwards to [`RtiDriver::get_time`];
    /// `"stat_m"`/`"stat_n"` return table dimensions; `"status"` and
    /// `"is_first_call"` return the driver's bookkeeping flags as numeric
    /// codes. The original's `"stat"`/`"statistics"` hand back a raw
    /// pointer into caller-owned memory — Rust's ownership rules make that
    /// shape wrong here, so those stay on the dedicated typed methods
    /// ([`RtiDriver::statistics`], [`RtiMemory::stats`]) instead of this
    /// generic getter.
    pub fn get(&self, field: &str) -> Option<f64> {
        if let Some(rest) = field.strip_prefix("time.") {
            return self.get_time(rest);
        }
        match field {
            "stat_m" => Some(self.stat_m() as f64),
            "stat_n" => Some(self.stat_n() as f64),
            "status" => Some(self.status() as u8 as f64),
            "is_first_call" => Some(self.is_first_call() as u8 as f64),
            _ => None,
        }
    }

    /// Applies a primal/dual step scaled by `alpha`: `ux += alpha * dux`,
    /// and likewise for `pi`/`lam`. The original's `config->step_update` is
    /// the generic SQP variable-update routine shared by every NLP solver
    /// (full-step SQP, DDP, RTI); a [`GlobalizationModule`] applies the
    /// equivalent update internally as part of `find_acceptable_iterate`,
    /// but this is exposed directly for callers — tests, or a
    /// globalization implementation that wants to delegate the actual
    /// write — that need to apply an already-chosen step without going
    /// through that trait.
    pub fn step_update(&mut self, dux: &[f64], dpi: &[f64], dlam: &[f64], alpha: f64) {
        for (x, dx) in self.ux.iter_mut().zip(dux) {
            *x += alpha * dx;
        }
        for (p, dp) in self.pi.iter_mut().zip(dpi) {
            *p += alpha * dp;
        }
        for (l, dl) in self.lam.iter_mut().zip(dlam) {
            *l += alpha * dl;
        }
    }

    pub fn get_time(&self, field: &str) -> Option<f64> {
        match field {
            "time_lin" => Some(self.timings.time_lin),
            "time_reg" => Some(self.timings.time_reg),
            "time_qp_sol" => Some(self.timings.time_qp_sol),
            "time_glob" => Some(self.timings.time_glob),
            "time_preparation" => Some(self.timings.time_preparation),
            "time_feedback" => Some(self.timings.time_feedback),
            "time_tot" => Some(self.timings.time_tot),
            "time_solution_sensitivities" => Some(self.timings.time_solution_sensitivities),
            _ => None,
        }
    }

    pub fn stat_m(&self) -> usize {
        self.mem.stats.rows()
    }

    pub fn stat_n(&self) -> usize {
        self.mem.stats.cols()
    }

    /// Writes the transposed statistics view into `out` (see
    /// [`crate::stats::StatsTable::transposed`]).
    pub fn statistics(&self, out: &mut [f64]) {
        self.mem.stats.transposed(self.mem.iter, out);
    }

    pub fn status(&self) -> NlpStatus {
        self.mem.status
    }

    pub fn is_first_call(&self) -> bool {
        self.mem.is_first_call
    }

    /// Always true: this driver only implements the real-time SQP-RTI
    /// algorithm, never a batch full-step solver.
    pub fn is_real_time_algorithm(&self) -> bool {
        true
    }

    /// Releases the QP solver's externally-owned resources. The arena buffer
    /// itself is owned by the caller and released by dropping it.
    pub fn terminate(&mut self) {
        self.qp_solver.terminate();
    }
}

/// `rayon-stages` counterpart of [`RtiDriver::eval_kkt_residual`], in a
/// separate impl block so the added `Sync` bounds fall only on this one
/// diagnostic entry point rather than every generic method above.
#[cfg(feature = "rayon-stages")]
impl<'a, Dyn, Cost, Cons, Reg, Qp, Glob> RtiDriver<'a, Dyn, Cost, Cons, Reg, Qp, Glob>
where
    Dyn: DynamicsModule + Sync,
    Cost: CostModule + Sync,
    Cons: ConstraintsModule + Sync,
    Reg: RegularizeModule,
    Qp: QpSolver,
    Glob: GlobalizationModule,
{
    pub fn eval_kkt_residual(&mut self) -> Result<Residuals, RtiError> {
        for stage in 0..self.dims.num_stages() {
            self.dynamics.compute_fun_and_adj(stage)?;
            self.cost.compute_gradient(stage)?;
            self.constraints.update_qp_matrices(stage)?;
        }
        Ok(preparation::compute_residuals_parallel(self))
    }
}
