//! Flattened tabular output of a replicate run.

use crate::simulator::Trajectory;
use crate::State;
use serde::{Deserialize, Serialize};

/// One `(replicate, step)` observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRow {
    /// Starting state, constant across the whole record
    pub init: State,
    /// 1-based position within the trajectory
    pub step: usize,
    /// Realized state at this step
    pub state: State,
    /// 1-based replicate id
    pub rep: usize,
}

/// All rows of a replicate run, ordered by replicate then step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRecord {
    num_states: usize,
    init: State,
    steps: usize,
    reps: usize,
    rows: Vec<RecordRow>,
}

impl SimulationRecord {
    /// Flattens trajectories, tagging the `i`-th with replicate id `i + 1`.
    pub(crate) fn from_trajectories(
        num_states: usize,
        init: State,
        steps: usize,
        trajectories: Vec<Trajectory>,
    ) -> Self {
        let reps = trajectories.len();
        let mut rows = Vec::with_capacity(reps * steps);

        for (i, trajectory) in trajectories.into_iter().enumerate() {
            let rep = i + 1;
            rows.extend(
                trajectory
                    .into_states()
                    .into_iter()
                    .enumerate()
                    .map(|(k, state)| RecordRow {
                        init,
                        step: k + 1,
                        state,
                        rep,
                    }),
            );
        }

        Self {
            num_states,
            init,
            steps,
            reps,
            rows,
        }
    }

    /// All rows.
    pub fn rows(&self) -> &[RecordRow] {
        &self.rows
    }

    /// Total row count (`reps * steps`).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True only for a record with no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of states in the simulated chain.
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// Shared starting state.
    pub fn init(&self) -> State {
        self.init
    }

    /// Steps per replicate.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Number of replicates.
    pub fn reps(&self) -> usize {
        self.reps
    }

    /// Replicate ids in order (`1..=reps`).
    pub fn replicate_ids(&self) -> impl Iterator<Item = usize> {
        1..=self.reps
    }

    /// Rows of replicate `rep` in step order.
    pub fn replicate(&self, rep: usize) -> Option<&[RecordRow]> {
        if rep == 0 || rep > self.reps {
            return None;
        }
        let start = (rep - 1) * self.steps;
        self.rows.get(start..start + self.steps)
    }

    /// States of replicate `rep` in step order.
    pub fn replicate_states(&self, rep: usize) -> Option<Vec<State>> {
        self.replicate(rep)
            .map(|rows| rows.iter().map(|r| r.state).collect())
    }

    /// The state of every replicate at 1-based `step`, in replicate order.
    ///
    /// Empty when `step` is out of range.
    pub fn states_at_step(&self, step: usize) -> Vec<State> {
        if step == 0 || step > self.steps {
            return Vec::new();
        }
        self.rows
            .iter()
            .skip(step - 1)
            .step_by(self.steps)
            .map(|r| r.state)
            .collect()
    }
}
