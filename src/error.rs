//! Error types shared across the crate
//!
//! Three failure classes exist:
//! - configuration errors, raised by `validate()` before training starts
//! - insufficient-data errors, raised when sampling an empty replay buffer
//! - shape mismatches, raised when weight tensors cannot be copied between
//!   incompatible network topologies
//!
//! Orchestration code propagates these through `anyhow::Result`.

use thiserror::Error;

/// Errors produced by the evolutionary training core
#[derive(Debug, Error)]
pub enum EvolveError {
    /// Malformed configuration detected before the run starts
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Sampling was attempted on an empty replay buffer
    #[error("replay buffer is empty; cannot sample {requested} transitions")]
    InsufficientData {
        /// Number of transitions the caller asked for
        requested: usize,
    },

    /// Weight tensors could not be copied between incompatible shapes
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// Convenience alias for results carrying an [`EvolveError`]
pub type Result<T> = std::result::Result<T, EvolveError>;
