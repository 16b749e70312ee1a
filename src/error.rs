//! Error kinds for the terminal engine.
//!
//! Hostile input is never a panic: the parser records diagnostics and keeps
//! going, the sequencer returns a three-way outcome instead of `Result`, and
//! only genuinely exceptional resource conditions use `thiserror`.

use thiserror::Error;

/// A non-fatal parser diagnostic (unknown transition, malformed parameter
/// list). Pushed onto `Parser`'s diagnostics ring; never returned as an
/// `Err` from `feed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserDiagnostic {
    pub message: String,
    pub byte: Option<u8>,
}

/// Outcome of dispatching one recognized sequence to the Screen.
///
/// Mirrors the spec's `Ok | Invalid | Unsupported` three-way result. This is
/// a control-flow value, not a failure type, so it isn't a `thiserror` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ok,
    /// Recognized function, but parameters/state made it impossible to
    /// apply (e.g. out-of-range rectangle).
    Invalid,
    /// Looked up in the function table but not implemented.
    Unsupported,
}

/// Resource-limit errors: pools and stacks that can legitimately run out of
/// budget under adversarial or just enthusiastic input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("image pool already holds the maximum of {max} images")]
    TooManyImages { max: usize },
    #[error("image pool exhausted: no capacity for a new image")]
    ImagePoolExhausted,
    #[error("sixel image of {width}x{height} exceeds the configured maximum")]
    OversizedSixel { width: u32, height: u32 },
    #[error("palette stack is at its maximum depth of {max}")]
    PaletteStackFull { max: usize },
}

/// Top-level error aggregation for the crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TerminalError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    /// Grid bounds / cursor-outside-margins / negative dimension class of
    /// bug. In debug builds, `invariant!` asserts on this condition instead
    /// of constructing it; in release it is logged and the caller clamps.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Assert `$cond` in debug builds; in release, log via `crate::diag` and
/// fall through so the caller can clamp instead of crashing.
///
/// Mirrors "Invariant violations... in debug mode they trigger assertions;
/// in release mode they clamp and log."
#[macro_export]
macro_rules! invariant {
    ($cond:expr, $msg:expr) => {
        if !$cond {
            #[cfg(debug_assertions)]
            {
                panic!("invariant violated: {}", $msg);
            }
            #[cfg(not(debug_assertions))]
            {
                $crate::diag::warn(&format!("invariant violated: {}", $msg));
            }
        }
    };
}
