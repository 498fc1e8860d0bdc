//! Single-chain simulation.
//!
//! The chain is a strictly sequential walk: step `k` is drawn from the row of
//! the matrix selected by step `k - 1`, and nothing else.

use crate::error::{ChainError, Result};
use crate::matrix::TransitionMatrix;
use crate::State;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::Serialize;

/// One realized path of the chain, initial state included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trajectory {
    states: Vec<State>,
}

impl Trajectory {
    pub(crate) fn from_states(states: Vec<State>) -> Self {
        debug_assert!(!states.is_empty());
        Self { states }
    }

    /// The starting state (step 1).
    pub fn initial(&self) -> State {
        self.states[0]
    }

    /// All states in step order.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Number of steps, including the initial one.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Always false for a simulated trajectory (steps >= 1).
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// State at 1-based `step`.
    pub fn state_at(&self, step: usize) -> Option<State> {
        step.checked_sub(1).and_then(|i| self.states.get(i).copied())
    }

    /// The last state reached.
    pub fn final_state(&self) -> State {
        self.states[self.states.len() - 1]
    }

    /// Consecutive `(from, to)` pairs.
    pub fn transitions(&self) -> impl Iterator<Item = (State, State)> + '_ {
        self.states.windows(2).map(|w| (w[0], w[1]))
    }

    /// Consumes the trajectory, returning its states.
    pub fn into_states(self) -> Vec<State> {
        self.states
    }
}

/// Simulates trajectories of one fixed chain.
///
/// Building the simulator indexes every row of the matrix into a categorical
/// sampler once; each trajectory then costs one draw per step.
#[derive(Debug, Clone)]
pub struct ChainSimulator {
    matrix: TransitionMatrix,
    samplers: Vec<WeightedIndex<f64>>,
}

impl ChainSimulator {
    /// Creates a simulator for `matrix`.
    pub fn new(matrix: &TransitionMatrix) -> Result<Self> {
        let samplers = matrix
            .to_rows()
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                WeightedIndex::new(row).map_err(|e| {
                    ChainError::matrix(format!("row {} is not samplable: {}", i + 1, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            matrix: matrix.clone(),
            samplers,
        })
    }

    /// The chain being simulated.
    pub fn matrix(&self) -> &TransitionMatrix {
        &self.matrix
    }

    /// Number of states N.
    pub fn num_states(&self) -> usize {
        self.samplers.len()
    }

    /// Checks the starting state and step count without drawing anything.
    pub fn validate(&self, initial_state: State, steps: usize) -> Result<()> {
        if !self.matrix.contains_state(initial_state) {
            return Err(ChainError::initial_state(initial_state, self.num_states()));
        }
        if steps == 0 {
            return Err(ChainError::InvalidStepCount(steps));
        }
        Ok(())
    }

    /// Simulates one trajectory of length `steps` starting at `initial_state`.
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        initial_state: State,
        steps: usize,
        rng: &mut R,
    ) -> Result<Trajectory> {
        self.validate(initial_state, steps)?;

        let mut states = Vec::with_capacity(steps);
        let mut current = initial_state;
        states.push(current);

        for _ in 1..steps {
            current = self.next_state(current, rng);
            states.push(current);
        }

        Ok(Trajectory::from_states(states))
    }

    /// Draws the successor of a valid 1-based `state`.
    pub(crate) fn next_state<R: Rng + ?Sized>(&self, state: State, rng: &mut R) -> State {
        self.samplers[state - 1].sample(rng) + 1
    }
}

/// One-shot form: validate, index the matrix and simulate a single trajectory.
pub fn simulate<R: Rng + ?Sized>(
    matrix: &TransitionMatrix,
    initial_state: State,
    steps: usize,
    rng: &mut R,
) -> Result<Trajectory> {
    let simulator = ChainSimulator::new(matrix)?;
    simulator.simulate(initial_state, steps, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_trajectory_shape() {
        let blob = TransitionMatrix::bouncing_blob();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let traj = simulate(&blob, 3, 100, &mut rng).unwrap();

        assert_eq!(traj.len(), 100);
        assert_eq!(traj.initial(), 3);
        assert_eq!(traj.state_at(1), Some(3));
        assert!(traj.states().iter().all(|s| (1..=5).contains(s)));
        assert_eq!(traj.transitions().count(), 99);
        assert_eq!(traj.state_at(0), None);
        assert_eq!(traj.state_at(101), None);
    }

    #[test]
    fn test_single_step_is_just_initial_state() {
        let blob = TransitionMatrix::bouncing_blob();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let traj = simulate(&blob, 5, 1, &mut rng).unwrap();
        assert_eq!(traj.states(), &[5]);
        assert_eq!(traj.final_state(), 5);
    }

    #[test]
    fn test_invalid_initial_state() {
        let blob = TransitionMatrix::bouncing_blob();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        assert_eq!(
            simulate(&blob, 0, 10, &mut rng),
            Err(ChainError::initial_state(0, 5))
        );
        assert_eq!(
            simulate(&blob, 6, 10, &mut rng),
            Err(ChainError::initial_state(6, 5))
        );
    }

    #[test]
    fn test_invalid_step_count() {
        let blob = TransitionMatrix::bouncing_blob();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        assert_eq!(
            simulate(&blob, 1, 0, &mut rng),
            Err(ChainError::InvalidStepCount(0))
        );
    }

    #[test]
    fn test_validation_draws_nothing() {
        let blob = TransitionMatrix::bouncing_blob();
        let mut used = ChaCha8Rng::seed_from_u64(42);
        let mut fresh = ChaCha8Rng::seed_from_u64(42);

        assert!(simulate(&blob, 9, 10, &mut used).is_err());

        // A failed call must leave the stream untouched
        let a = simulate(&blob, 1, 50, &mut used).unwrap();
        let b = simulate(&blob, 1, 50, &mut fresh).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let blob = TransitionMatrix::bouncing_blob();

        let mut rng1 = ChaCha8Rng::seed_from_u64(1234);
        let mut rng2 = ChaCha8Rng::seed_from_u64(1234);

        let t1 = simulate(&blob, 2, 500, &mut rng1).unwrap();
        let t2 = simulate(&blob, 2, 500, &mut rng2).unwrap();
        assert_eq!(t1, t2);
    }

    #[test]
    fn test_zero_probability_transitions_never_taken() {
        let blob = TransitionMatrix::bouncing_blob();
        let mut rng = ChaCha8Rng::seed_from_u64(99);

        let traj = simulate(&blob, 2, 20_000, &mut rng).unwrap();
        for (from, to) in traj.transitions() {
            assert!(
                blob.probability(from, to).unwrap() > 0.0,
                "impossible transition {} -> {}",
                from,
                to
            );
        }
    }

    #[test]
    fn test_absorbing_state_stays_absorbed() {
        let absorbing = TransitionMatrix::from_rows(&[[1.0, 0.0], [0.5, 0.5]]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let traj = simulate(&absorbing, 1, 200, &mut rng).unwrap();
        assert!(traj.states().iter().all(|&s| s == 1));
    }

    #[test]
    fn test_deterministic_cycle() {
        let cycle =
            TransitionMatrix::from_rows(&[[0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]])
                .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let traj = simulate(&cycle, 2, 7, &mut rng).unwrap();
        assert_eq!(traj.into_states(), vec![2, 3, 1, 2, 3, 1, 2]);
    }
}
