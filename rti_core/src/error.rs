//! Driver-level error type.
//!
//! [`rti_common::error::ValidationError`] covers configuration mistakes
//! caught before or at the start of a cycle. `RtiError` additionally wraps
//! whatever a collaborator module reports mid-cycle, so `evaluate` has a
//! single `Result` error type to propagate through `?`.

use rti_common::error::ValidationError;
use rti_common::traits::{ConstraintsError, CostError, DynamicsError, GlobalizationError, QpError, RegularizeError};

#[derive(Debug, Clone, thiserror::Error)]
pub enum RtiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Dynamics(#[from] DynamicsError),

    #[error(transparent)]
    Cost(#[from] CostError),

    #[error(transparent)]
    Constraints(#[from] ConstraintsError),

    #[error(transparent)]
    Regularize(#[from] RegularizeError),

    #[error(transparent)]
    Qp(#[from] QpError),

    #[error(transparent)]
    Globalization(#[from] GlobalizationError),
}
