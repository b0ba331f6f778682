// src/error.rs
//
// Typed error kinds for the pipeline. None of these is fatal to the
// process: the pipeline degrades to "no new information this tick"
// instead of halting.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A channel holds fewer samples than the minimum window size.
    /// The tick is skipped and the buffer keeps accumulating.
    #[error("insufficient data: channel {channel} has {have} samples, need {need}")]
    InsufficientData {
        channel: &'static str,
        have: usize,
        need: usize,
    },

    /// The external model call failed or returned malformed output.
    /// The tick degrades to an `unknown` observation.
    #[error("classification failed: {0}")]
    Classification(String),

    /// A save/load failure, surfaced to the caller. Session data stays
    /// in memory; retrying is the caller's responsibility.
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// Start while running or stop while stopped. Callers treat this
    /// as a no-op.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}
