//! RTI phase/level options and the arena-backed options struct.

use rti_common::dims::Dims;
use rti_common::error::ValidationError;

use crate::arena::ByteArena;

/// Which half (or both) of an RTI cycle a call to `evaluate` performs.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RtiPhase {
    /// Both preparation and feedback in one call (only valid with STANDARD_RTI).
    PreparationAndFeedback = 0,
    /// Measurement-independent linearization and condensing only.
    Preparation = 1,
    /// Measurement-dependent RHS update, QP solve, globalization.
    Feedback = 2,
}

impl RtiPhase {
    pub const fn from_i32(value: i32) -> Result<Self, ValidationError> {
        match value {
            0 => Ok(Self::PreparationAndFeedback),
            1 => Ok(Self::Preparation),
            2 => Ok(Self::Feedback),
            _ => Err(ValidationError::InvalidRtiPhase { value }),
        }
    }
}

impl Default for RtiPhase {
    fn default() -> Self {
        Self::PreparationAndFeedback
    }
}

/// Advanced-step RTI variant selector.
///
/// Replaces the original's C-union-style dispatch on an integer level with a
/// sum type: each non-standard variant carries the inner-iteration count it
/// needs, so there is no way to construct e.g. `LevelB` without an iteration
/// count, and the driver's `match` is exhaustive at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AsRtiStrategy {
    /// Plain RTI: one QP solve per feedback call, no advanced preparation.
    Standard,
    /// One-shot shadow feedback on a backed-up iterate (skipped on first call).
    LevelA,
    /// `k` zero-order QP updates (forbids soft constraints).
    LevelB { k: u32 },
    /// `k` full-order QP updates (requires linear inequalities everywhere).
    LevelC { k: u32 },
    /// `k` full SQP iterations (runs even on the first call).
    LevelD { k: u32 },
}

impl AsRtiStrategy {
    /// Numeric level code, for the stats table and diagnostics — matches the
    /// original's `LEVEL_A..LEVEL_D, STANDARD_RTI` ordering.
    pub const fn level_code(&self) -> u8 {
        match self {
            Self::LevelA => 0,
            Self::LevelB { .. } => 1,
            Self::LevelC { .. } => 2,
            Self::LevelD { .. } => 3,
            Self::Standard => 4,
        }
    }

    pub const fn is_standard(&self) -> bool {
        matches!(self, Self::Standard)
    }

    /// Inner-iteration count, `0` for `Standard`/`LevelA`.
    pub const fn inner_iters(&self) -> u32 {
        match self {
            Self::Standard | Self::LevelA => 0,
            Self::LevelB { k } | Self::LevelC { k } | Self::LevelD { k } => *k,
        }
    }

    /// Human-readable label for diagnostics. The original mislabels both
    /// LEVEL_B and LEVEL_C's informational print as `"B-iter"`; this gives
    /// each variant its own correct label instead of preserving that bug.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::LevelA => "A-iter",
            Self::LevelB { .. } => "B-iter",
            Self::LevelC { .. } => "C-iter",
            Self::LevelD { .. } => "D-iter",
        }
    }
}

impl Default for AsRtiStrategy {
    fn default() -> Self {
        Self::Standard
    }
}

/// How the initial-state box constraint is advanced before an AS-RTI
/// preparation call (skipped on the very first call, see
/// [`crate::as_rti`]).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AdvancementStrategy {
    /// Leave the initial-state box constraint untouched.
    NoAdvance = 0,
    /// Set `lbx[0] = ubx[0] = x[1]` of the current iterate.
    ShiftAdvance = 1,
    /// Simulate one step forward and set the box to the simulated state.
    SimulateAdvance = 2,
}

impl Default for AdvancementStrategy {
    fn default() -> Self {
        Self::SimulateAdvance
    }
}

/// Shared NLP-level options read by the feedback step (named at this layer
/// because the feedback algorithm's warm-start policy depends on them, even
/// though they are not RTI-specific).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SharedNlpOptions {
    pub warm_start_first_qp: bool,
    pub warm_start_first_qp_from_nlp: bool,
    pub ext_qp_res: bool,
    pub print_level: u32,
}

impl Default for SharedNlpOptions {
    fn default() -> Self {
        Self {
            warm_start_first_qp: true,
            warm_start_first_qp_from_nlp: true,
            ext_qp_res: false,
            print_level: 0,
        }
    }
}

/// Fully-resolved RTI options, as carved into the caller's arena.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RtiOpts {
    pub rti_phase: RtiPhase,
    pub as_rti_strategy: AsRtiStrategy,
    pub as_rti_advancement: AdvancementStrategy,
    pub rti_log_residuals: bool,
    pub rti_log_only_available_residuals: bool,
    pub shared: SharedNlpOptions,
}

impl Default for RtiOpts {
    fn default() -> Self {
        Self {
            rti_phase: RtiPhase::default(),
            as_rti_strategy: AsRtiStrategy::default(),
            as_rti_advancement: AdvancementStrategy::default(),
            rti_log_residuals: false,
            rti_log_only_available_residuals: false,
            shared: SharedNlpOptions::default(),
        }
    }
}

// `RtiOpts` is carved directly out of the arena as a single POD value, so it
// must be `Copy`; this assertion keeps it that way if a field is ever added.
static_assertions::assert_impl_all!(RtiOpts: Copy);

impl RtiOpts {
    /// Bytes needed to carve one `RtiOpts` out of an arena.
    pub fn calculate_size(_dims: &Dims) -> usize {
        ByteArena::size_for::<RtiOpts>(1)
    }

    /// Carves a default-initialized `RtiOpts` out of `arena`.
    pub fn assign<'a>(arena: &mut ByteArena<'a>, _dims: &Dims) -> &'a mut RtiOpts {
        arena.alloc(RtiOpts::default())
    }

    /// Equivalent to [`RtiOpts::default`], named to match the original's
    /// `opts_initialize_default` entry point in the public API table.
    pub fn initialize_default() -> Self {
        Self::default()
    }

    /// Recomputes any field derived from `dims` after the caller has mutated
    /// fields directly (bypassing [`RtiOpts::set`]). The original forwards
    /// this to the shared NLP options layer, which refreshes its own
    /// dims-dependent fields; nothing in `RtiOpts` itself is derived from
    /// `dims` (`stat_m`/`stat_n` are fixed once at `assign` time from
    /// `as_rti_iter`/the logging flags, not recomputed here), so this is a
    /// no-op kept for API parity.
    pub fn update(&mut self, _dims: &Dims) {}

    /// `"module.field"`-style option setter. A leading `"qp."` is stripped and
    /// left for the caller to forward to the QP solver's own setter; anything
    /// else is resolved here.
    pub fn set(&mut self, field: &str, value: f64) -> Result<(), ValidationError> {
        if let Some(_qp_field) = field.strip_prefix("qp.") {
            return Err(ValidationError::UnknownField { field: field.to_string() });
        }
        match field {
            "rti_phase" => {
                self.rti_phase = RtiPhase::from_i32(value as i32)?;
            }
            "as_rti_iter" => {
                let k = value as u32;
                self.as_rti_strategy = match self.as_rti_strategy {
                    AsRtiStrategy::LevelB { .. } => AsRtiStrategy::LevelB { k },
                    AsRtiStrategy::LevelC { .. } => AsRtiStrategy::LevelC { k },
                    AsRtiStrategy::LevelD { .. } => AsRtiStrategy::LevelD { k },
                    other => other,
                };
            }
            "rti_log_residuals" => self.rti_log_residuals = value != 0.0,
            "rti_log_only_available_residuals" => {
                self.rti_log_only_available_residuals = value != 0.0
            }
            "warm_start_first_qp" => self.shared.warm_start_first_qp = value != 0.0,
            "warm_start_first_qp_from_nlp" => {
                self.shared.warm_start_first_qp_from_nlp = value != 0.0
            }
            "ext_qp_res" => self.shared.ext_qp_res = value != 0.0,
            "print_level" => self.shared.print_level = value as u32,
            _ => return Err(ValidationError::UnknownField { field: field.to_string() }),
        }
        Ok(())
    }

    /// Sets the AS-RTI level, independent of its inner-iteration count (which
    /// defaults to 0 until `set("as_rti_iter", k)` is called).
    pub fn set_as_rti_level(&mut self, level: &str) -> Result<(), ValidationError> {
        let k = self.as_rti_strategy.inner_iters();
        self.as_rti_strategy = match level {
            "LEVEL_A" => AsRtiStrategy::LevelA,
            "LEVEL_B" => AsRtiStrategy::LevelB { k },
            "LEVEL_C" => AsRtiStrategy::LevelC { k },
            "LEVEL_D" => AsRtiStrategy::LevelD { k },
            "STANDARD_RTI" => AsRtiStrategy::Standard,
            _ => {
                return Err(ValidationError::InvalidValue {
                    field: "as_rti_level".into(),
                    reason: format!("unknown level '{level}'"),
                })
            }
        };
        Ok(())
    }

    /// Stage-indexed setter; RTI has no per-stage options today, so this
    /// exists purely to satisfy the uniform `config.opts_set_at_stage` entry
    /// point other NLP solvers expose.
    pub fn set_at_stage(&mut self, _stage: usize, field: &str, value: f64) -> Result<(), ValidationError> {
        self.set(field, value)
    }

    /// Dotted-field getter, mirroring `opts_get`. The original's
    /// `opts_get` only recognizes `"nlp_opts"`, returning a pointer to the
    /// nested shared-options struct; there is no pointer-shaped analogue
    /// here, so `"shared"` returns a copy of [`SharedNlpOptions`] instead.
    /// Scalar fields settable via [`RtiOpts::set`] are readable back by the
    /// same name.
    pub fn get(&self, field: &str) -> Result<f64, ValidationError> {
        match field {
            "rti_phase" => Ok(self.rti_phase as u8 as i32 as f64),
            "as_rti_iter" => Ok(self.as_rti_strategy.inner_iters() as f64),
            "rti_log_residuals" => Ok(self.rti_log_residuals as u8 as f64),
            "rti_log_only_available_residuals" => {
                Ok(self.rti_log_only_available_residuals as u8 as f64)
            }
            "warm_start_first_qp" => Ok(self.shared.warm_start_first_qp as u8 as f64),
            "warm_start_first_qp_from_nlp" => {
                Ok(self.shared.warm_start_first_qp_from_nlp as u8 as f64)
            }
            "ext_qp_res" => Ok(self.shared.ext_qp_res as u8 as f64),
            "print_level" => Ok(self.shared.print_level as f64),
            _ => Err(ValidationError::UnknownField { field: field.to_string() }),
        }
    }

    /// Returns the shared NLP-level options block, the Rust analogue of the
    /// original's `opts_get(..., "nlp_opts", ...)`.
    pub fn shared(&self) -> &SharedNlpOptions {
        &self.shared
    }

    pub fn validate(&self, dims: &Dims) -> Result<(), ValidationError> {
        if !self.as_rti_strategy.is_standard() {
            dims.check_as_rti_shiftable()?;
            if let AsRtiStrategy::LevelB { .. } = self.as_rti_strategy {
                if let Some(stage) = dims.ns.iter().position(|&ns| ns > 0) {
                    return Err(ValidationError::SoftConstraintsForbidden { stage, ns: dims.ns[stage] });
                }
            }
        }
        if matches!(self.rti_phase, RtiPhase::PreparationAndFeedback) && !self.as_rti_strategy.is_standard() {
            return Err(ValidationError::AsRtiRequiresSplitPhases);
        }
        Ok(())
    }
}
