//! Error types for the scenario harness.

use markov_core::ChainError;
use thiserror::Error;

/// Errors that can occur while configuring, running or exporting a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid chain input (matrix, start state, counts)
    #[error("Simulation error: {0}")]
    Chain(#[from] ChainError),

    /// Reading a matrix file or writing an export failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Harness configuration is unusable
    #[error("Config error: {0}")]
    Config(String),
}

impl SimError {
    /// Creates a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
