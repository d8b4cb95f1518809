//! Per-phase timing accumulators, in seconds.

/// Durations of each phase of the most recent `evaluate` call.
///
/// All fields are reset to zero at the start of every `evaluate`; they are
/// not cumulative across calls (the stats ring, not `Timings`, is the
/// per-iteration history).
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Timings {
    /// Linearization: Jacobian/Hessian evaluation of dynamics, cost, constraints.
    pub time_lin: f64,
    /// Regularization of the QP left- and/or right-hand side.
    pub time_reg: f64,
    /// Condensing of the QP left-hand side.
    pub time_qp_sol: f64,
    /// Globalization (step-size / merit-function acceptance).
    pub time_glob: f64,
    /// Total time spent in the preparation phase.
    pub time_preparation: f64,
    /// Total time spent in the feedback phase.
    pub time_feedback: f64,
    /// Total time for the whole `evaluate` call (preparation + feedback, if both ran).
    pub time_tot: f64,
    /// Time spent in `eval_solution_sens_adj_p` / parametric-sensitivity forwards.
    pub time_solution_sensitivities: f64,
}

impl Timings {
    /// A fresh, all-zero timings block.
    pub const fn new() -> Self {
        Self {
            time_lin: 0.0,
            time_reg: 0.0,
            time_qp_sol: 0.0,
            time_glob: 0.0,
            time_preparation: 0.0,
            time_feedback: 0.0,
            time_tot: 0.0,
            time_solution_sensitivities: 0.0,
        }
    }

    /// Resets every field to zero, e.g. at the start of an `evaluate` call.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Sum of the four constituent sub-phase timers.
    pub fn sub_phase_sum(&self) -> f64 {
        self.time_lin + self.time_reg + self.time_qp_sol + self.time_glob
    }
}
