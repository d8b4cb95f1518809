//! Scratch buffers reused across `evaluate` calls.
//!
//! Unlike [`crate::memory::RtiMemory`], nothing here is bookkeeping state —
//! every field is overwritten before it is read within a single call. It
//! exists purely so the hot path never allocates a temporary.

use rti_common::dims::Dims;

use crate::arena::ByteArena;
use crate::MAX_PRIMAL_DIM;

/// Per-call scratch space.
pub struct RtiWorkspace<'a> {
    /// Snapshot of the iterate taken before globalization, available to an
    /// embedding application that wants strict rollback semantics (the
    /// driver itself does not roll back automatically on a non-success
    /// globalization outcome — see `DESIGN.md`).
    pub iterate_snapshot: &'a mut [f64],
    /// Scratch for the simulate-advance dynamics evaluation:
    /// `phi(x[0], u[0])`, length `nx[1]`.
    pub advance_scratch: &'a mut [f64],
}

impl<'a> RtiWorkspace<'a> {
    pub fn calculate_size(dims: &Dims) -> usize {
        let primal = primal_dim(dims).min(MAX_PRIMAL_DIM);
        let nx1 = dims.nx.get(1).copied().unwrap_or(0);
        ByteArena::size_for::<f64>(primal) + ByteArena::size_for::<f64>(nx1)
    }

    pub fn assign(arena: &mut ByteArena<'a>, dims: &Dims) -> Self {
        let primal = primal_dim(dims).min(MAX_PRIMAL_DIM);
        let nx1 = dims.nx.get(1).copied().unwrap_or(0);
        let iterate_snapshot = arena.alloc_slice::<f64>(primal);
        let advance_scratch = arena.alloc_slice::<f64>(nx1);
        Self { iterate_snapshot, advance_scratch }
    }

    /// Copies `iterate` into the snapshot slot. `iterate.len()` must not
    /// exceed the snapshot's capacity (it was sized from the same `dims`).
    pub fn snapshot(&mut self, iterate: &[f64]) {
        self.iterate_snapshot[..iterate.len()].copy_from_slice(iterate);
    }

    /// Restores `iterate` from the snapshot slot.
    pub fn restore(&self, iterate: &mut [f64]) {
        iterate.copy_from_slice(&self.iterate_snapshot[..iterate.len()]);
    }

    /// Dotted-field getter, mirroring `work_get`. The original only
    /// recognizes `"nlp_work"`, returning a pointer to the nested NLP
    /// workspace; the closest analogue here is reading back one of this
    /// workspace's own scratch slices by name.
    pub fn get(&self, field: &str) -> Option<&[f64]> {
        match field {
            "iterate_snapshot" => Some(self.iterate_snapshot),
            "advance_scratch" => Some(self.advance_scratch),
            _ => None,
        }
    }
}

fn primal_dim(dims: &Dims) -> usize {
    (0..dims.num_stages()).map(|k| dims.nx[k] + dims.nu[k]).sum()
}
