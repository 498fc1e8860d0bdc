//! Markov Core - discrete-time Markov chain simulation
//!
//! Simulates trajectories of a finite-state chain from a row-stochastic
//! transition matrix, and runs many independent replicates of it for Monte
//! Carlo estimates of where the chain ends up.
//!
//! # Architecture
//!
//! ```text
//!   TransitionMatrix ──► ChainSimulator ──► Trajectory
//!                              ▲
//!                              │ one seeded stream per replicate
//!   SeedSequence ──► ReplicateRunner ──► SimulationRecord ──► stats
//! ```
//!
//! States are 1-based everywhere in the public API.
//!
//! # Usage
//!
//! ```
//! use markov_core::{simulate_replicates, stats, TransitionMatrix};
//!
//! let blob = TransitionMatrix::bouncing_blob();
//! let record = simulate_replicates(&blob, 1, 100, 200, 42).unwrap();
//! assert_eq!(record.len(), 100 * 200);
//!
//! let at_end = stats::cross_section(&record, 100);
//! assert_eq!(at_end.total(), 200);
//! ```

pub mod error;
pub mod matrix;
pub mod record;
pub mod replicates;
pub mod seeds;
pub mod simulator;
pub mod stats;

/// A 1-based state index.
pub type State = usize;

// Re-export key types for convenience
pub use error::{ChainError, Result};
pub use matrix::{TransitionMatrix, BOUNCING_BLOB, ROW_SUM_TOLERANCE};
pub use record::{RecordRow, SimulationRecord};
pub use replicates::{simulate_replicates, ReplicateRunner};
pub use seeds::SeedSequence;
pub use simulator::{simulate, ChainSimulator, Trajectory};
pub use stats::{StateDistribution, TransitionCounts};
