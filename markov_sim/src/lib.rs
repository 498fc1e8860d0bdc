//! Markov Sim - Monte Carlo ergodicity harness
//!
//! Drives [`markov_core`] through repeatable experiments on one chain:
//!
//! - **Ergodicity**: replicates from every start state, compared at the
//!   final step
//! - **LongRun**: one long trajectory's time average vs the ensemble
//! - **MarkovProperty**: observed transition frequencies vs the matrix
//!
//! All randomness is derived from a single 64-bit seed, so any failing run
//! is reproducible from its seed number.
//!
//! # Usage
//!
//! ```ignore
//! use markov_sim::{ScenarioRunner, SimConfig, ScenarioId};
//!
//! let runner = ScenarioRunner::bouncing_blob(SimConfig::default())?;
//! let result = runner.run(ScenarioId::Ergodicity)?;
//! assert!(result.passed);
//! ```

mod config;
mod error;
mod exporter;
mod runner;
pub mod scenarios;

pub use config::{load_matrix, log_filter, SimConfig};
pub use error::SimError;
pub use exporter::SimExport;
pub use runner::{LabeledDistribution, ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
