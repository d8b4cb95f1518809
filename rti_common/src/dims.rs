//! Problem dimensions for a time-discretized optimal control problem.

use crate::error::ValidationError;
use crate::MAX_STAGES;

/// Per-stage and horizon-wide dimensions of the OCP.
///
/// Stage `k` runs from `0` to `n` inclusive (`n + 1` stages), matching the
/// convention that stage `n` is the terminal stage and carries no inputs.
/// All per-stage arrays are fixed-capacity `heapless::Vec`s sized to
/// [`MAX_STAGES`] so that [`RtiOpts`](../../rti_core/struct.RtiOpts.html)-style
/// arena sizing never allocates.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dims {
    /// Horizon length (number of shooting intervals).
    pub n: usize,
    /// Number of states at each stage, `nx[0..=n]`.
    pub nx: heapless::Vec<usize, MAX_STAGES>,
    /// Number of inputs at each stage, `nu[0..=n]` (`nu[n] == 0` by convention).
    pub nu: heapless::Vec<usize, MAX_STAGES>,
    /// Number of general linear/nonlinear inequality constraints per stage.
    pub ng: heapless::Vec<usize, MAX_STAGES>,
    /// Number of soft-constrained slacks per stage.
    pub ns: heapless::Vec<usize, MAX_STAGES>,
}

impl Dims {
    /// Builds dims for a horizon of `n` intervals with uniform per-stage sizes.
    pub fn uniform(n: usize, nx: usize, nu: usize, ng: usize, ns: usize) -> Result<Self, ValidationError> {
        if n + 1 > MAX_STAGES {
            return Err(ValidationError::HorizonTooLong { n, max: MAX_STAGES - 1 });
        }
        let mut nx_v = heapless::Vec::new();
        let mut nu_v = heapless::Vec::new();
        let mut ng_v = heapless::Vec::new();
        let mut ns_v = heapless::Vec::new();
        for k in 0..=n {
            let _ = nx_v.push(nx);
            let _ = nu_v.push(if k == n { 0 } else { nu });
            let _ = ng_v.push(ng);
            let _ = ns_v.push(ns);
        }
        Ok(Self { n, nx: nx_v, nu: nu_v, ng: ng_v, ns: ns_v })
    }

    /// Number of stages, `n + 1`.
    #[inline]
    pub const fn num_stages(&self) -> usize {
        self.n + 1
    }

    /// Whether any stage carries soft-constraint slacks.
    pub fn has_soft_constraints(&self) -> bool {
        self.ns.iter().any(|&ns| ns > 0)
    }

    /// Validates internal consistency (array lengths match the horizon).
    pub fn validate(&self) -> Result<(), ValidationError> {
        let expected = self.num_stages();
        if self.nx.len() != expected || self.nu.len() != expected || self.ng.len() != expected || self.ns.len() != expected {
            return Err(ValidationError::DimsLengthMismatch { expected });
        }
        Ok(())
    }

    /// Element offset where stage `k`'s `[u_k, x_k]` block starts in the
    /// flattened primal vector (`RtiDriver::ux`).
    pub fn stage_offset(&self, stage: usize) -> usize {
        (0..stage).map(|k| self.nu[k] + self.nx[k]).sum()
    }

    /// Element offset of stage `k`'s state sub-block `x_k` within the
    /// flattened primal vector: `stage_offset(k) + nu[k]`.
    pub fn x_offset(&self, stage: usize) -> usize {
        self.stage_offset(stage) + self.nu[stage]
    }

    /// Required by AS-RTI: the initial-state box constraint dimension must
    /// match the second-stage state dimension so that advancement can set
    /// `lbx[0] = ubx[0] = x[1]`.
    pub fn check_as_rti_shiftable(&self) -> Result<(), ValidationError> {
        if self.n < 1 {
            return Err(ValidationError::HorizonTooShortForAsRti { n: self.n });
        }
        if self.nx[0] != self.nx[1] {
            return Err(ValidationError::NxMismatch { nx0: self.nx[0], nx1: self.nx[1] });
        }
        Ok(())
    }
}
