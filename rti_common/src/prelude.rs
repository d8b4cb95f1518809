//! Prelude module for common re-exports.
//!
//! This module provides convenient re-exports of commonly used types
//! so that consumers can do `use rti_common::prelude::*;` and get
//! the most important types without listing individual paths.
//!
//! # Usage
//!
//! ```rust
//! use rti_common::prelude::*;
//! ```

// ─── Dimensions ─────────────────────────────────────────────────────
pub use crate::dims::Dims;

// ─── Status / Timing / Residuals ────────────────────────────────────
pub use crate::residuals::Residuals;
pub use crate::status::{NlpStatus, QpStatus};
pub use crate::timings::Timings;

// ─── Errors ─────────────────────────────────────────────────────────
pub use crate::error::ValidationError;

// ─── Collaborator interfaces ────────────────────────────────────────
pub use crate::traits::{
    ConstraintsModule, CostModule, DynamicsModule, GlobalizationModule, QpSolver,
    RegularizeModule,
};
