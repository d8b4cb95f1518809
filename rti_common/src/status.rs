//! NLP and QP status codes.

/// Overall status of the RTI driver, stored in `nlp_mem.status`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum NlpStatus {
    /// Post-assign, before the first `evaluate` call.
    Ready = 0,
    /// Last `evaluate` call produced a usable iterate.
    Success = 1,
    /// The QP returned a status other than SUCCESS/MAXITER; iterate may be partial.
    QpFailure = 2,
    /// Reserved for parity with the wider NLP config (minor-iteration cap on
    /// non-RTI solvers); the RTI driver never sets this itself.
    MaxIter = 3,
}

impl NlpStatus {
    /// Converts a raw status code, returning `None` for out-of-range values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ready),
            1 => Some(Self::Success),
            2 => Some(Self::QpFailure),
            3 => Some(Self::MaxIter),
            _ => None,
        }
    }

    /// Whether this status represents a usable iterate.
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl Default for NlpStatus {
    fn default() -> Self {
        Self::Ready
    }
}

/// Status returned by the condensed QP solve.
///
/// `Success` and `MaxIter` are both treated as acceptable steps by the RTI
/// driver (RTI trades convergence guarantees for latency); any other status
/// is a hard failure of the current cycle.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum QpStatus {
    Success = 0,
    MaxIter = 1,
    Infeasible = 2,
    /// Solver-internal numerical failure (e.g. factorization breakdown).
    SolverFailure = 3,
}

impl QpStatus {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Success),
            1 => Some(Self::MaxIter),
            2 => Some(Self::Infeasible),
            3 => Some(Self::SolverFailure),
            _ => None,
        }
    }

    /// Whether the RTI driver should accept this QP's solution as a step.
    #[inline]
    pub const fn is_acceptable(&self) -> bool {
        matches!(self, Self::Success | Self::MaxIter)
    }
}
