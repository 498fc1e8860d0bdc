//! Replicate runner: many independent trajectories from one starting state.

use crate::error::{ChainError, Result};
use crate::matrix::TransitionMatrix;
use crate::record::SimulationRecord;
use crate::seeds::SeedSequence;
use crate::simulator::{ChainSimulator, Trajectory};
use crate::State;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Runs `reps` independent trajectories of `steps` steps each.
///
/// Replicate `r` always draws from `SeedSequence::replicate_rng(r)`, so a
/// replicate's path depends only on the master seed and its own id. Growing
/// `reps` appends new replicates without disturbing existing ones, and the
/// sequential and `parallel` builds agree row for row.
#[derive(Debug, Clone)]
pub struct ReplicateRunner {
    seeds: SeedSequence,
    steps: usize,
    reps: usize,
}

impl ReplicateRunner {
    /// Creates a runner with 100 steps and 1000 replicates.
    pub fn new(seed: u64) -> Self {
        Self {
            seeds: SeedSequence::new(seed),
            steps: 100,
            reps: 1000,
        }
    }

    /// Sets the number of steps per trajectory.
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the number of replicates.
    pub fn with_reps(mut self, reps: usize) -> Self {
        self.reps = reps;
        self
    }

    /// Replaces the seed sequence (e.g. with a child of a sweep's root).
    pub fn with_seeds(mut self, seeds: SeedSequence) -> Self {
        self.seeds = seeds;
        self
    }

    /// Steps per trajectory.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Replicate count.
    pub fn reps(&self) -> usize {
        self.reps
    }

    /// Runs every replicate from `initial_state`.
    ///
    /// All inputs are checked before the first draw; on error nothing is
    /// simulated.
    pub fn run(
        &self,
        simulator: &ChainSimulator,
        initial_state: State,
    ) -> Result<SimulationRecord> {
        simulator.validate(initial_state, self.steps)?;
        if self.reps == 0 {
            return Err(ChainError::InvalidReplicateCount(self.reps));
        }

        debug!(
            "Running {} replicates x {} steps from state {} (seed={})",
            self.reps,
            self.steps,
            initial_state,
            self.seeds.master_seed()
        );

        let trajectories = self.simulate_all(simulator, initial_state)?;

        Ok(SimulationRecord::from_trajectories(
            simulator.num_states(),
            initial_state,
            self.steps,
            trajectories,
        ))
    }

    fn simulate_one(
        &self,
        simulator: &ChainSimulator,
        initial_state: State,
        rep: usize,
    ) -> Result<Trajectory> {
        let mut rng = self.seeds.replicate_rng(rep);
        simulator.simulate(initial_state, self.steps, &mut rng)
    }

    #[cfg(not(feature = "parallel"))]
    fn simulate_all(
        &self,
        simulator: &ChainSimulator,
        initial_state: State,
    ) -> Result<Vec<Trajectory>> {
        (1..=self.reps)
            .map(|rep| self.simulate_one(simulator, initial_state, rep))
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn simulate_all(
        &self,
        simulator: &ChainSimulator,
        initial_state: State,
    ) -> Result<Vec<Trajectory>> {
        (1..=self.reps)
            .into_par_iter()
            .map(|rep| self.simulate_one(simulator, initial_state, rep))
            .collect()
    }
}

/// One-shot form: `reps` independent trajectories from `initial_state`,
/// seeded from `seed`.
pub fn simulate_replicates(
    matrix: &TransitionMatrix,
    initial_state: State,
    steps: usize,
    reps: usize,
    seed: u64,
) -> Result<SimulationRecord> {
    let simulator = ChainSimulator::new(matrix)?;
    ReplicateRunner::new(seed)
        .with_steps(steps)
        .with_reps(reps)
        .run(&simulator, initial_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_row_count_and_replicate_ids() {
        let blob = TransitionMatrix::bouncing_blob();
        let record = simulate_replicates(&blob, 4, 25, 40, 42).unwrap();

        assert_eq!(record.len(), 25 * 40);

        let mut per_rep: BTreeMap<usize, usize> = BTreeMap::new();
        for row in record.rows() {
            *per_rep.entry(row.rep).or_default() += 1;
        }
        assert_eq!(per_rep.keys().copied().collect::<Vec<_>>(), (1..=40).collect::<Vec<_>>());
        assert!(per_rep.values().all(|&n| n == 25));
    }

    #[test]
    fn test_every_replicate_starts_at_init() {
        let blob = TransitionMatrix::bouncing_blob();
        let record = simulate_replicates(&blob, 2, 10, 50, 7).unwrap();

        assert!(record.states_at_step(1).iter().all(|&s| s == 2));
        assert!(record.rows().iter().all(|r| r.init == 2));
    }

    #[test]
    fn test_invalid_inputs_fail_whole_call() {
        let blob = TransitionMatrix::bouncing_blob();

        assert_eq!(
            simulate_replicates(&blob, 6, 10, 10, 42),
            Err(ChainError::initial_state(6, 5))
        );
        assert_eq!(
            simulate_replicates(&blob, 1, 0, 10, 42),
            Err(ChainError::InvalidStepCount(0))
        );
        assert_eq!(
            simulate_replicates(&blob, 1, 10, 0, 42),
            Err(ChainError::InvalidReplicateCount(0))
        );
    }

    #[test]
    fn test_replicates_are_not_identical() {
        let blob = TransitionMatrix::bouncing_blob();
        let record = simulate_replicates(&blob, 1, 50, 2, 42).unwrap();

        // Two 50-step walks on a 5-state chain colliding exactly is
        // astronomically unlikely unless they share a stream
        assert_ne!(record.replicate_states(1), record.replicate_states(2));
    }

    #[test]
    fn test_growing_reps_keeps_existing_replicates() {
        let blob = TransitionMatrix::bouncing_blob();
        let small = simulate_replicates(&blob, 3, 30, 5, 42).unwrap();
        let large = simulate_replicates(&blob, 3, 30, 20, 42).unwrap();

        for rep in 1..=5 {
            assert_eq!(small.replicate(rep), large.replicate(rep));
        }
    }

    #[test]
    fn test_same_seed_same_record() {
        let blob = TransitionMatrix::bouncing_blob();
        let a = simulate_replicates(&blob, 5, 40, 30, 2024).unwrap();
        let b = simulate_replicates(&blob, 5, 40, 30, 2024).unwrap();
        let c = simulate_replicates(&blob, 5, 40, 30, 2025).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_runner_builder() {
        let blob = TransitionMatrix::bouncing_blob();
        let simulator = ChainSimulator::new(&blob).unwrap();
        let runner = ReplicateRunner::new(1).with_steps(12).with_reps(3);

        assert_eq!(runner.steps(), 12);
        assert_eq!(runner.reps(), 3);

        let record = runner.run(&simulator, 1).unwrap();
        assert_eq!(record.steps(), 12);
        assert_eq!(record.reps(), 3);
        assert_eq!(record.num_states(), 5);
        assert_eq!(record.init(), 1);
    }
}
