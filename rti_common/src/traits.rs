//! Collaborator interfaces consumed by the RTI driver.
//!
//! The driver does not implement dynamics integration, cost/constraint
//! evaluation, regularization, QP solution, or globalization; it orchestrates
//! calls into these traits in a fixed order. An embedding application
//! provides concrete implementations (e.g. an ERK integrator for
//! [`DynamicsModule`], an active-set QP for [`QpSolver`]).
//!
//! All methods take `stage: usize` so one trait object per stage-kind can
//! serve all `N + 1` stages, or a single object can dispatch internally —
//! the driver only calls through the trait, it never matches on a concrete
//! stage type.

use crate::status::QpStatus;

/// Evaluates the discrete dynamics `x_{k+1} = phi(x_k, u_k)` and its adjoint
/// sensitivities, writing Jacobians into the caller-owned `qp_in` stage block.
pub trait DynamicsModule {
    /// Evaluates `phi(x, u) - x_next` at `stage`, without sensitivities.
    fn compute_fun(&mut self, stage: usize) -> Result<(), DynamicsError>;

    /// Evaluates the function value together with the adjoint-direction
    /// sensitivity product, writing both into the stage's QP block.
    fn compute_fun_and_adj(&mut self, stage: usize) -> Result<(), DynamicsError>;

    /// Returns the most recently computed function residual `phi(x, u) - x_next`.
    fn fun_ptr(&self, stage: usize) -> &[f64];

    /// Returns the most recently computed adjoint-direction product.
    fn adj_ptr(&self, stage: usize) -> &[f64];
}

/// Evaluates the (possibly Gauss-Newton approximated) cost gradient and Hessian.
pub trait CostModule {
    fn compute_gradient(&mut self, stage: usize) -> Result<(), CostError>;
    fn grad_ptr(&self, stage: usize) -> &[f64];

    /// Adds a Levenberg-Marquardt diagonal term, scaled by `factor`, to the
    /// stage's Hessian block of `qp_in`. Called unconditionally by the
    /// driver directly after linearization, regardless of `rti_phase` — the
    /// cost module owns the Hessian's storage, so the driver can only ask
    /// for the damping to be applied, not apply it itself.
    fn add_levenberg_marquardt(&mut self, stage: usize, factor: f64);
}

/// Evaluates nonlinear path/terminal constraints and writes their linearization
/// into the stage's QP block.
pub trait ConstraintsModule {
    fn update_qp_matrices(&mut self, stage: usize) -> Result<(), ConstraintsError>;
    fn adj_ptr(&self, stage: usize) -> &[f64];
    /// Number of general inequality constraints this module produces at `stage`.
    fn dims_get_ng(&self, stage: usize) -> usize;

    /// Sets stage 0's initial-state box constraint `lbx[0] = ubx[0] = value`.
    /// Called by AS-RTI advancement (shift or simulate, spec §4.5) before
    /// linearization, to move the "initial state" onto an estimate of the
    /// next measurement; the constraints module owns the box-bound storage,
    /// so the driver can only hand over the computed value.
    fn set_initial_state_bound(&mut self, value: &[f64]);
}

/// Adds damping/regularization to the QP left- and/or right-hand side.
pub trait RegularizeModule {
    /// Applies both LHS and RHS regularization (used by PREPARATION_AND_FEEDBACK
    /// and by the LEVEL_D inner loop).
    fn regularize(&mut self, stage: usize) -> Result<(), RegularizeError>;
    /// Applies LHS-only regularization (standard preparation path).
    fn regularize_lhs(&mut self, stage: usize) -> Result<(), RegularizeError>;
    /// Applies RHS-only regularization (feedback path, LHS already regularized).
    fn regularize_rhs(&mut self, stage: usize) -> Result<(), RegularizeError>;
    /// Maps the regularized dual solution back to the original problem's duals.
    fn correct_dual_sol(&mut self, stage: usize) -> Result<(), RegularizeError>;
}

/// The condensing QP solver.
pub trait QpSolver {
    /// Sets a solver option by dotted field name (the portion of an RTI option
    /// key after a leading `"qp."` prefix is forwarded here verbatim).
    fn opts_set(&mut self, field: &str, value: f64) -> Result<(), crate::error::ValidationError>;

    /// Condenses the stage-structured left-hand side into the solver's
    /// internal dense representation. Skipped when the feedback phase is
    /// reusing a condensation performed by a prior preparation call.
    fn condense_lhs(&mut self) -> Result<(), QpError>;

    /// Solves the (possibly already condensed) QP and maps the dense dual
    /// solution back onto the stage-structured duals.
    ///
    /// `precondensed_lhs` is `true` when the LHS was condensed by a previous
    /// preparation call and should be reused as-is; `false` when this call
    /// must condense first (`PREPARATION_AND_FEEDBACK`).
    fn solve_qp_and_correct_dual(&mut self, precondensed_lhs: bool) -> Result<(QpStatus, u32), QpError>;

    /// Resets warm-start and internal solver memory to the empty state.
    fn memory_reset(&mut self);

    /// Releases any solver-owned resources external to the arena (e.g. a
    /// factorization library's internal handle).
    fn terminate(&mut self);

    /// Number of inequality rows the solver expects at `stage` (used by the
    /// LEVEL_C sanity check to confirm agreement with the constraints module).
    fn dims_get_ng(&self, stage: usize) -> usize;

    /// Applies a zero-order update: keeps the last condensed LHS, refreshes
    /// only the RHS vectors from the current linearization.
    fn zero_order_qp_update(&mut self) -> Result<(), QpError>;

    /// Applies a full-order update on problems with linear inequalities: like
    /// [`zero_order_qp_update`](Self::zero_order_qp_update) but also refreshes
    /// the inequality bound vectors (not the constraint Jacobian itself).
    fn level_c_update(&mut self) -> Result<(), QpError>;
}

/// Step-size / merit-function acceptance for the outer SQP iteration.
pub trait GlobalizationModule {
    /// Attempts to find an acceptable step along the QP direction, writing
    /// the accepted primal/dual iterate directly into `ux`/`pi`/`lam`.
    /// Returns the accepted step size.
    ///
    /// A non-success status is not fatal to the driver: the partially-updated
    /// iterate is kept and the next cycle will re-linearize around it.
    fn find_acceptable_iterate(
        &mut self,
        ux: &mut [f64],
        pi: &mut [f64],
        lam: &mut [f64],
    ) -> Result<(GlobalizationStatus, f64), GlobalizationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlobalizationStatus {
    Success,
    MaxIter,
    NoProgress,
}

macro_rules! collaborator_error {
    ($name:ident, $what:literal) => {
        #[derive(Debug, Clone, thiserror::Error)]
        #[error(concat!($what, " failed at stage {stage}: {reason}"))]
        pub struct $name {
            pub stage: usize,
            pub reason: String,
        }
    };
}

collaborator_error!(DynamicsError, "dynamics evaluation");
collaborator_error!(CostError, "cost evaluation");
collaborator_error!(ConstraintsError, "constraints evaluation");
collaborator_error!(RegularizeError, "regularization");

#[derive(Debug, Clone, thiserror::Error)]
#[error("QP solver failure: {reason}")]
pub struct QpError {
    pub reason: String,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("globalization failure: {reason}")]
pub struct GlobalizationError {
    pub reason: String,
}
