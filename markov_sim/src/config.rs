//! Harness configuration.

use crate::error::SimError;
use markov_core::{State, TransitionMatrix};
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Configuration for a batch of experiments.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Steps per replicate in the ensemble experiments
    pub steps: usize,

    /// Replicates per starting state
    pub reps: usize,

    /// Starting state of the single long run
    pub long_run_init: State,

    /// Length of the single long run
    pub long_run_steps: usize,

    /// Max pairwise total variation between final-step distributions
    pub ergodicity_tolerance: f64,

    /// Max total variation between time average and ensemble
    pub long_run_tolerance: f64,

    /// Max |empirical - true| transition probability
    pub transition_tolerance: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            steps: 100,
            reps: 1000,
            long_run_init: 2,
            long_run_steps: 10_000,
            ergodicity_tolerance: 0.12,
            long_run_tolerance: 0.08,
            transition_tolerance: 0.03,
        }
    }
}

impl SimConfig {
    /// Rejects tolerances that would make every comparison meaningless.
    ///
    /// Counts and states are checked by the core on each run.
    pub fn validate(&self) -> Result<(), SimError> {
        let tolerances = [
            ("ergodicity_tolerance", self.ergodicity_tolerance),
            ("long_run_tolerance", self.long_run_tolerance),
            ("transition_tolerance", self.transition_tolerance),
        ];
        for (name, value) in tolerances {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimError::config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Loads a transition matrix from a JSON file holding an array of rows.
pub fn load_matrix(path: impl AsRef<Path>) -> Result<TransitionMatrix, SimError> {
    let json = fs::read_to_string(path)?;
    Ok(TransitionMatrix::from_json_str(&json)?)
}

/// Log filter for the CLI: `rust_log` directives when they parse, otherwise
/// `debug` with `verbose` and `info` without.
pub fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let fallback = if verbose { "debug" } else { "info" };
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}
