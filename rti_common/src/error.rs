//! Validation errors raised at precompute / option-set time.
//!
//! These replace the original solver's `printf`-and-`exit(1)` diagnostics
//! with a structured, `Display`-formatted error the embedding application
//! decides how to act on.

/// A fatal, programmer-facing configuration or dimension error.
///
/// None of these are expected to be recovered from at runtime; they indicate
/// that the driver was assembled with inconsistent dims/options. Surfacing
/// them as `Result` (rather than aborting the process) keeps the decision of
/// *what to do about it* with the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Horizon exceeds the fixed per-stage array capacity.
    #[error("horizon length {n} exceeds maximum supported stage count {max}")]
    HorizonTooLong { n: usize, max: usize },

    /// Dims array lengths don't match `n + 1`.
    #[error("dims arrays must have length {expected} (n + 1 stages)")]
    DimsLengthMismatch { expected: usize },

    /// AS-RTI requires at least one shooting interval to advance into.
    #[error("AS-RTI requires horizon length >= 1, got n={n}")]
    HorizonTooShortForAsRti { n: usize },

    /// AS-RTI requires `nx[0] == nx[1]` so the initial-state box can be shifted.
    #[error("AS-RTI requires nx[0] == nx[1], got nx[0]={nx0}, nx[1]={nx1}")]
    NxMismatch { nx0: usize, nx1: usize },

    /// LEVEL_B forbids soft constraints at any stage.
    #[error("AS-RTI LEVEL_B requires ns[k] == 0 for all stages, but stage {stage} has ns={ns}")]
    SoftConstraintsForbidden { stage: usize, ns: usize },

    /// LEVEL_C requires linear inequality constraints at every stage.
    #[error(
        "AS-RTI LEVEL_C requires linear inequalities at stage {stage}: constraint module reports ng={module_ng}, qp solver reports ng={qp_ng}"
    )]
    NonlinearInequalitiesForbidden { stage: usize, module_ng: usize, qp_ng: usize },

    /// `rti_phase` outside `{0, 1, 2}`.
    #[error("rti_phase must be 0 (PREPARATION_AND_FEEDBACK), 1 (PREPARATION), or 2 (FEEDBACK); got {value}")]
    InvalidRtiPhase { value: i32 },

    /// `as_rti_iter` combined with a phase/level combination that is undefined.
    #[error("rti_phase=PREPARATION_AND_FEEDBACK is not supported with as_rti_level != STANDARD_RTI")]
    AsRtiRequiresSplitPhases,

    /// Unknown option field passed to a string-keyed setter.
    #[error("unknown option field '{field}'")]
    UnknownField { field: String },

    /// Option value out of the field's valid range.
    #[error("invalid value for option field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
