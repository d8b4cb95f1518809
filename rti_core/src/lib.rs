//! # RTI Core
//!
//! Real-Time Iteration (RTI) driver for nonlinear model predictive control.
//! Executes one (or a few) SQP iterations per control cycle, split into a
//! measurement-independent preparation phase and a measurement-dependent
//! feedback phase, plus the Advanced-Step RTI (AS-RTI) family of variants
//! that spend spare preparation time doing extra nonlinear work ahead of the
//! next measurement.
//!
//! ## Zero-Allocation Cycle
//!
//! [`arena`] carves every driver structure out of a single caller-supplied
//! byte buffer at `assign` time. No allocation happens afterwards:
//! `evaluate` never touches the global heap.
//!
//! ## Module Structure
//!
//! - [`arena`] — bump allocator and the `calculate_size`/`assign` pattern
//! - [`options`] — `RtiPhase`, `AsRtiStrategy`, `RtiOpts`
//! - [`stats`] — the fixed-capacity per-iteration statistics table
//! - [`memory`] — driver bookkeeping state (`RtiMemory`)
//! - [`workspace`] — per-call scratch buffers (`RtiWorkspace`)
//! - [`driver`] — `RtiDriver`, the public `evaluate` entry point and getters
//! - [`preparation`] — the standard (non-AS-RTI) preparation step
//! - [`feedback`] — the feedback step
//! - [`as_rti`] — AS-RTI preparation variants A–D
//! - [`error`] — `RtiError`

#![deny(clippy::disallowed_types)]

pub mod arena;
pub mod as_rti;
pub mod driver;
pub mod error;
pub mod feedback;
pub mod memory;
pub mod options;
pub mod preparation;
pub mod stats;
pub mod workspace;

/// Hard upper bound on the flattened primal vector length (`sum(nx+nu)`)
/// that the arena sizing functions will budget for.
pub const MAX_PRIMAL_DIM: usize = 2048;

/// Hard upper bound on the number of stat-table rows kept resident,
/// independent of `as_rti_iter` — guards the arena size against a
/// pathologically large inner-iteration count.
pub const MAX_STAT_ROWS: usize = 256;
