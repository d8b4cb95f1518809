//! Driver memory: statistics ring, bookkeeping flags, and the LEVEL_A backup
//! iterate.

use rti_common::dims::Dims;
use rti_common::status::NlpStatus;

use crate::arena::ByteArena;
use crate::options::RtiOpts;
use crate::stats::StatsTable;
use crate::MAX_PRIMAL_DIM;

/// Mutable driver state carved out of the arena at `assign` time and reused
/// (never reallocated) across every subsequent `evaluate` call.
pub struct RtiMemory<'a> {
    pub stats: StatsTable<'a>,
    /// True until the first successful feedback completes; controls the
    /// warm-start policy and the first-call sanity-check/advancement gating
    /// for AS-RTI.
    pub is_first_call: bool,
    /// Inner-iteration counter, reset to 0 only when an `evaluate` call
    /// enters a preparation; see `reset_for_preparation`.
    pub iter: usize,
    pub status: NlpStatus,
    /// LEVEL_A's backup of the iterate taken at the end of the previous
    /// cycle's preparation; restored at the start of the next LEVEL_A
    /// preparation's shadow-feedback step. Flat storage sized to the largest
    /// primal vector the arena was configured for; unused by other levels.
    pub backup_iterate: &'a mut [f64],
}

impl<'a> RtiMemory<'a> {
    pub fn calculate_size(dims: &Dims, opts: &RtiOpts) -> usize {
        let as_rti_iter = opts.as_rti_strategy.inner_iters();
        StatsTable::calculate_size(as_rti_iter, opts.rti_log_residuals, opts.shared.ext_qp_res)
            + ByteArena::size_for::<f64>(primal_dim(dims).min(MAX_PRIMAL_DIM))
    }

    pub fn assign(arena: &mut ByteArena<'a>, dims: &Dims, opts: &RtiOpts) -> Self {
        let as_rti_iter = opts.as_rti_strategy.inner_iters();
        let stats = StatsTable::assign(arena, as_rti_iter, opts.rti_log_residuals, opts.shared.ext_qp_res);
        let backup_iterate = arena.alloc_slice::<f64>(primal_dim(dims).min(MAX_PRIMAL_DIM));
        Self {
            stats,
            is_first_call: true,
            iter: 0,
            status: NlpStatus::Ready,
            backup_iterate,
        }
    }

    /// Resets `iter` and clears the stats table. Called only when an
    /// `evaluate` call enters a preparation (PREPARATION or
    /// PREPARATION_AND_FEEDBACK); a FEEDBACK-only call continues from the
    /// `iter`/stats rows the preceding preparation left, matching the
    /// original's `reset_stats_and_sub_timers` being called only from the
    /// preparation entry points.
    pub fn reset_for_preparation(&mut self) {
        self.iter = 0;
        self.stats.clear();
    }

    /// Called by `memory_reset_qp_solver`: forces the warm-start policy to
    /// re-run on the next feedback as if it were the first call.
    pub fn force_first_call(&mut self) {
        self.is_first_call = true;
    }
}

/// Flattened primal dimension `sum(nx[k] + nu[k])`, used to size the LEVEL_A
/// backup buffer.
fn primal_dim(dims: &Dims) -> usize {
    (0..dims.num_stages()).map(|k| dims.nx[k] + dims.nu[k]).sum()
}
