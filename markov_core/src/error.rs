//! Error types for chain construction and simulation.

use thiserror::Error;

/// Errors raised while validating simulation inputs.
///
/// Every check runs before the first random draw, so a caller never sees a
/// partially simulated result alongside one of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    /// Matrix is empty, not square, has a bad entry, or a row is not stochastic
    #[error("Invalid transition matrix: {reason}")]
    InvalidMatrix { reason: String },

    /// Initial state lies outside 1..=num_states
    #[error("Initial state {state} out of range 1..={num_states}")]
    InvalidInitialState { state: usize, num_states: usize },

    /// Step count must be at least one
    #[error("Invalid step count {0}: must be >= 1")]
    InvalidStepCount(usize),

    /// Replicate count must be at least one
    #[error("Invalid replicate count {0}: must be >= 1")]
    InvalidReplicateCount(usize),
}

impl ChainError {
    /// Creates a matrix error.
    pub fn matrix(reason: impl Into<String>) -> Self {
        Self::InvalidMatrix {
            reason: reason.into(),
        }
    }

    /// Creates an initial-state error.
    pub fn initial_state(state: usize, num_states: usize) -> Self {
        Self::InvalidInitialState { state, num_states }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChainError>;
