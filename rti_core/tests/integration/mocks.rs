//! Mock collaborators used across the integration tests.
//!
//! Two families live here:
//! - `lqr`: a genuinely-solving tiny LQR problem, used wherever a test needs
//!   a real numeric trajectory (convergence, phase-split equivalence).
//! - the generic `Recording*`/`Mock*` types below: no-op or
//!   injectable-behavior stand-ins used wherever a test only cares about
//!   driver orchestration (call order, status propagation, instrumentation).

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use rti_common::dims::Dims;
use rti_common::error::ValidationError;
use rti_common::status::QpStatus;
use rti_common::traits::{
    ConstraintsError, ConstraintsModule, CostError, CostModule, DynamicsError, DynamicsModule,
    GlobalizationError, GlobalizationModule, GlobalizationStatus, QpError, QpSolver, RegularizeError,
    RegularizeModule,
};

/// Zero-valued, call-counting collaborators for tests that only care about
/// driver orchestration, not numerical results.
pub struct RecordingDynamics {
    fun: Vec<Vec<f64>>,
    adj: Vec<Vec<f64>>,
    pub calls: Rc<RefCell<u32>>,
}

impl RecordingDynamics {
    pub fn new(dims: &Dims) -> Self {
        Self {
            fun: (0..dims.num_stages()).map(|k| vec![0.0; dims.nx[k]]).collect(),
            adj: (0..dims.num_stages()).map(|k| vec![0.0; dims.nx[k]]).collect(),
            calls: Rc::new(RefCell::new(0)),
        }
    }
}

impl DynamicsModule for RecordingDynamics {
    fn compute_fun(&mut self, stage: usize) -> Result<(), DynamicsError> {
        *self.calls.borrow_mut() += 1;
        self.fun[stage].iter_mut().for_each(|v| *v = 0.0);
        Ok(())
    }

    fn compute_fun_and_adj(&mut self, stage: usize) -> Result<(), DynamicsError> {
        self.compute_fun(stage)?;
        self.adj[stage].iter_mut().for_each(|v| *v = 0.0);
        Ok(())
    }

    fn fun_ptr(&self, stage: usize) -> &[f64] {
        &self.fun[stage]
    }

    fn adj_ptr(&self, stage: usize) -> &[f64] {
        &self.adj[stage]
    }
}

pub struct RecordingCost {
    grad: Vec<Vec<f64>>,
    pub lm_calls: Rc<RefCell<Vec<(usize, f64)>>>,
}

impl RecordingCost {
    pub fn new(dims: &Dims) -> Self {
        Self {
            grad: (0..dims.num_stages()).map(|k| vec![0.0; dims.nx[k] + dims.nu[k]]).collect(),
            lm_calls: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl CostModule for RecordingCost {
    fn compute_gradient(&mut self, stage: usize) -> Result<(), CostError> {
        self.grad[stage].iter_mut().for_each(|v| *v = 0.0);
        Ok(())
    }

    fn grad_ptr(&self, stage: usize) -> &[f64] {
        &self.grad[stage]
    }

    fn add_levenberg_marquardt(&mut self, stage: usize, factor: f64) {
        self.lm_calls.borrow_mut().push((stage, factor));
    }
}

pub struct RecordingConstraints {
    ng: Vec<usize>,
    adj: Vec<Vec<f64>>,
    pub last_bound: Rc<RefCell<Option<Vec<f64>>>>,
}

impl RecordingConstraints {
    pub fn new(dims: &Dims) -> Self {
        Self {
            ng: dims.ng.iter().copied().collect(),
            adj: dims.ng.iter().map(|&ng| vec![0.0; ng]).collect(),
            last_bound: Rc::new(RefCell::new(None)),
        }
    }
}

impl ConstraintsModule for RecordingConstraints {
    fn update_qp_matrices(&mut self, stage: usize) -> Result<(), ConstraintsError> {
        self.adj[stage].iter_mut().for_each(|v| *v = 0.0);
        Ok(())
    }

    fn adj_ptr(&self, stage: usize) -> &[f64] {
        &self.adj[stage]
    }

    fn dims_get_ng(&self, stage: usize) -> usize {
        self.ng[stage]
    }

    fn set_initial_state_bound(&mut self, value: &[f64]) {
        *self.last_bound.borrow_mut() = Some(value.to_vec());
    }
}

#[derive(Default)]
pub struct NoopRegularize;

impl RegularizeModule for NoopRegularize {
    fn regularize(&mut self, _stage: usize) -> Result<(), RegularizeError> {
        Ok(())
    }
    fn regularize_lhs(&mut self, _stage: usize) -> Result<(), RegularizeError> {
        Ok(())
    }
    fn regularize_rhs(&mut self, _stage: usize) -> Result<(), RegularizeError> {
        Ok(())
    }
    fn correct_dual_sol(&mut self, _stage: usize) -> Result<(), RegularizeError> {
        Ok(())
    }
}

/// A QP solver stand-in whose outcome (and instrumentation) is fully
/// controlled by the test: a queue of statuses to return (falling back to
/// `default_status` once exhausted) and a log of every `opts_set` call and
/// every `precondensed_lhs` flag it was solved with.
pub struct MockQp {
    ng: Vec<usize>,
    pub opts_log: Rc<RefCell<Vec<(String, f64)>>>,
    pub precondensed_log: Rc<RefCell<Vec<bool>>>,
    pub status_queue: Rc<RefCell<VecDeque<(QpStatus, u32)>>>,
    pub default_status: (QpStatus, u32),
    pub reset_calls: Rc<RefCell<u32>>,
}

impl MockQp {
    pub fn new(dims: &Dims) -> Self {
        Self {
            ng: dims.ng.iter().copied().collect(),
            opts_log: Rc::new(RefCell::new(Vec::new())),
            precondensed_log: Rc::new(RefCell::new(Vec::new())),
            status_queue: Rc::new(RefCell::new(VecDeque::new())),
            default_status: (QpStatus::Success, 1),
            reset_calls: Rc::new(RefCell::new(0)),
        }
    }
}

impl QpSolver for MockQp {
    fn opts_set(&mut self, field: &str, value: f64) -> Result<(), ValidationError> {
        self.opts_log.borrow_mut().push((field.to_string(), value));
        Ok(())
    }

    fn condense_lhs(&mut self) -> Result<(), QpError> {
        Ok(())
    }

    fn solve_qp_and_correct_dual(&mut self, precondensed_lhs: bool) -> Result<(QpStatus, u32), QpError> {
        self.precondensed_log.borrow_mut().push(precondensed_lhs);
        let next = self.status_queue.borrow_mut().pop_front();
        Ok(next.unwrap_or(self.default_status))
    }

    fn memory_reset(&mut self) {
        *self.reset_calls.borrow_mut() += 1;
    }

    fn terminate(&mut self) {}

    fn dims_get_ng(&self, stage: usize) -> usize {
        self.ng[stage]
    }

    fn zero_order_qp_update(&mut self) -> Result<(), QpError> {
        Ok(())
    }

    fn level_c_update(&mut self) -> Result<(), QpError> {
        Ok(())
    }
}

/// Globalization stand-in that always accepts with step size 1.0 and leaves
/// the iterate untouched (appropriate for tests that only check status/stats
/// propagation, not numerical movement).
#[derive(Default)]
pub struct PassthroughGlobalization {
    pub calls: Rc<RefCell<u32>>,
}

impl GlobalizationModule for PassthroughGlobalization {
    fn find_acceptable_iterate(
        &mut self,
        _ux: &mut [f64],
        _pi: &mut [f64],
        _lam: &mut [f64],
    ) -> Result<(GlobalizationStatus, f64), GlobalizationError> {
        *self.calls.borrow_mut() += 1;
        Ok((GlobalizationStatus::Success, 1.0))
    }
}

/// A tiny LQR problem solved exactly: linear scalar dynamics `x1 = a*x0 +
/// b*u0` and quadratic cost `q*x0^2 + r*u0^2 + qf*x1^2`, `x0` fixed by the
/// initial-state bound. Because both dynamics and cost are already exactly
/// linear/quadratic, a single SQP/QP step lands on the exact minimizer from
/// any starting iterate — this is what lets the mock "solve" the NLP in one
/// call instead of approximating it.
pub mod lqr {
    use super::*;

    pub struct LqrShared {
        pub a: f64,
        pub b: f64,
        pub q: f64,
        pub r: f64,
        pub qf: f64,
        pub x0: f64,
        pub u0: f64,
        pub x1: f64,
        pub pi: f64,
        step: Option<(f64, f64, f64)>,
    }

    impl LqrShared {
        pub fn new(a: f64, b: f64, q: f64, r: f64, qf: f64, x0: f64) -> Rc<RefCell<Self>> {
            Rc::new(RefCell::new(Self {
                a,
                b,
                q,
                r,
                qf,
                x0,
                u0: 0.0,
                x1: 0.0,
                pi: 0.0,
                step: None,
            }))
        }
    }

    pub struct LqrDynamics {
        shared: Rc<RefCell<LqrShared>>,
        fun0: [f64; 1],
    }

    impl LqrDynamics {
        pub fn new(shared: Rc<RefCell<LqrShared>>) -> Self {
            Self { shared, fun0: [0.0] }
        }
    }

    impl DynamicsModule for LqrDynamics {
        fn compute_fun(&mut self, stage: usize) -> Result<(), DynamicsError> {
            if stage == 0 {
                let s = self.shared.borrow();
                self.fun0[0] = s.a * s.x0 + s.b * s.u0 - s.x1;
            }
            Ok(())
        }

        fn compute_fun_and_adj(&mut self, stage: usize) -> Result<(), DynamicsError> {
            self.compute_fun(stage)
        }

        fn fun_ptr(&self, stage: usize) -> &[f64] {
            if stage == 0 {
                &self.fun0
            } else {
                &[]
            }
        }

        fn adj_ptr(&self, _stage: usize) -> &[f64] {
            &[]
        }
    }

    pub struct LqrCost {
        shared: Rc<RefCell<LqrShared>>,
        grad: [f64; 1],
    }

    impl LqrCost {
        pub fn new(shared: Rc<RefCell<LqrShared>>) -> Self {
            Self { shared, grad: [0.0] }
        }
    }

    impl CostModule for LqrCost {
        fn compute_gradient(&mut self, stage: usize) -> Result<(), CostError> {
            let s = self.shared.borrow();
            self.grad[0] = match stage {
                0 => 2.0 * s.r * s.u0 + s.pi * s.b,
                1 => 2.0 * s.qf * s.x1 - s.pi,
                _ => 0.0,
            };
            Ok(())
        }

        fn grad_ptr(&self, _stage: usize) -> &[f64] {
            &self.grad
        }

        fn add_levenberg_marquardt(&mut self, _stage: usize, _factor: f64) {
            // The closed-form solve below ignores Hessian damping entirely
            // (the point of this mock is exactness, not regularization
            // behavior), so there is nothing to add the term to.
        }
    }

    #[derive(Default)]
    pub struct LqrConstraints;

    impl ConstraintsModule for LqrConstraints {
        fn update_qp_matrices(&mut self, _stage: usize) -> Result<(), ConstraintsError> {
            Ok(())
        }
        fn adj_ptr(&self, _stage: usize) -> &[f64] {
            &[]
        }
        fn dims_get_ng(&self, _stage: usize) -> usize {
            0
        }
        fn set_initial_state_bound(&mut self, _value: &[f64]) {}
    }

    /// Solves the exact Newton step for the full KKT system in closed form
    /// and stashes it on the shared problem for `LqrGlobalization` to apply.
    pub struct LqrQp {
        shared: Rc<RefCell<LqrShared>>,
        pub precondensed_log: Rc<RefCell<Vec<bool>>>,
    }

    impl LqrQp {
        pub fn new(shared: Rc<RefCell<LqrShared>>) -> Self {
            Self { shared, precondensed_log: Rc::new(RefCell::new(Vec::new())) }
        }
    }

    impl QpSolver for LqrQp {
        fn opts_set(&mut self, _field: &str, _value: f64) -> Result<(), ValidationError> {
            Ok(())
        }

        fn condense_lhs(&mut self) -> Result<(), QpError> {
            Ok(())
        }

        fn solve_qp_and_correct_dual(&mut self, precondensed_lhs: bool) -> Result<(QpStatus, u32), QpError> {
            self.precondensed_log.borrow_mut().push(precondensed_lhs);
            let mut s = self.shared.borrow_mut();
            let u0_star = -s.qf * s.a * s.b * s.x0 / (s.r + s.qf * s.b * s.b);
            let x1_star = s.a * s.x0 + s.b * u0_star;
            let pi_star = 2.0 * s.qf * x1_star;
            s.step = Some((u0_star - s.u0, x1_star - s.x1, pi_star - s.pi));
            Ok((QpStatus::Success, 1))
        }

        fn memory_reset(&mut self) {}
        fn terminate(&mut self) {}
        fn dims_get_ng(&self, _stage: usize) -> usize {
            0
        }
        fn zero_order_qp_update(&mut self) -> Result<(), QpError> {
            Ok(())
        }
        fn level_c_update(&mut self) -> Result<(), QpError> {
            Ok(())
        }
    }

    /// Applies the step `LqrQp` stashed on the shared problem, in full
    /// (`alpha = 1`), to both the driver's flattened iterate and the shared
    /// problem state so the next cycle's linearization reads it back.
    pub struct LqrGlobalization {
        shared: Rc<RefCell<LqrShared>>,
        u0_offset: usize,
        x1_offset: usize,
    }

    impl LqrGlobalization {
        pub fn new(shared: Rc<RefCell<LqrShared>>, u0_offset: usize, x1_offset: usize) -> Self {
            Self { shared, u0_offset, x1_offset }
        }
    }

    impl GlobalizationModule for LqrGlobalization {
        fn find_acceptable_iterate(
            &mut self,
            ux: &mut [f64],
            pi: &mut [f64],
            _lam: &mut [f64],
        ) -> Result<(GlobalizationStatus, f64), GlobalizationError> {
            let mut s = self.shared.borrow_mut();
            let (du0, dx1, dpi) = s.step.take().unwrap_or((0.0, 0.0, 0.0));
            s.u0 += du0;
            s.x1 += dx1;
            s.pi += dpi;
            ux[self.u0_offset] = s.u0;
            ux[self.x1_offset] = s.x1;
            if let Some(p) = pi.first_mut() {
                *p = s.pi;
            }
            Ok((GlobalizationStatus::Success, 1.0))
        }
    }
}
