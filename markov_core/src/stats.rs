//! Empirical Distribution Helpers
//! ==============================
//!
//! Frequency summaries for comparing simulated chains:
//! - **Cross-section**: states at one step across all replicates
//! - **Time average**: states along one trajectory
//! - **Transition counts**: observed `i -> j` moves, normalized into an
//!   empirical matrix
//!
//! These are plain Monte Carlo estimates. There is no stationary solver here.

use crate::matrix::TransitionMatrix;
use crate::record::SimulationRecord;
use crate::simulator::Trajectory;
use crate::State;
use nalgebra::DMatrix;
use serde::Serialize;

// =============================================================================
// STATE DISTRIBUTION
// =============================================================================

/// Observed counts over states `1..=N`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateDistribution {
    counts: Vec<u64>,
}

impl StateDistribution {
    /// An empty distribution over `num_states` states.
    pub fn new(num_states: usize) -> Self {
        Self {
            counts: vec![0; num_states],
        }
    }

    /// Tallies `states`; anything outside `1..=num_states` is ignored.
    pub fn from_states<I>(num_states: usize, states: I) -> Self
    where
        I: IntoIterator<Item = State>,
    {
        let mut dist = Self::new(num_states);
        for state in states {
            dist.record(state);
        }
        dist
    }

    /// Adds one observation.
    pub fn record(&mut self, state: State) {
        if let Some(count) = state.checked_sub(1).and_then(|i| self.counts.get_mut(i)) {
            *count += 1;
        }
    }

    /// Merges another distribution over the same states into this one.
    ///
    /// Distributions over a different number of states are ignored.
    pub fn merge(&mut self, other: &StateDistribution) {
        if self.counts.len() != other.counts.len() {
            return;
        }
        for (mine, theirs) in self.counts.iter_mut().zip(&other.counts) {
            *mine += theirs;
        }
    }

    pub fn num_states(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Count for 1-based `state` (0 when out of range).
    pub fn count(&self, state: State) -> u64 {
        state
            .checked_sub(1)
            .and_then(|i| self.counts.get(i).copied())
            .unwrap_or(0)
    }

    /// Relative frequency of `state`; 0 for an empty distribution.
    pub fn proportion(&self, state: State) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.count(state) as f64 / total as f64
    }

    /// Relative frequencies in state order.
    pub fn proportions(&self) -> Vec<f64> {
        (1..=self.num_states()).map(|s| self.proportion(s)).collect()
    }

    /// The most frequent state (lowest index on ties), if any were observed.
    pub fn mode(&self) -> Option<State> {
        if self.total() == 0 {
            return None;
        }
        let mut best = 0;
        for (i, &count) in self.counts.iter().enumerate() {
            if count > self.counts[best] {
                best = i;
            }
        }
        Some(best + 1)
    }

    /// Total variation distance: `0.5 * sum |p(s) - q(s)|`.
    ///
    /// States missing from the shorter distribution count as probability 0.
    pub fn total_variation(&self, other: &StateDistribution) -> f64 {
        0.5 * self.abs_diffs(other).sum::<f64>()
    }

    /// Largest per-state difference in proportion.
    pub fn max_abs_diff(&self, other: &StateDistribution) -> f64 {
        self.abs_diffs(other).fold(0.0, f64::max)
    }

    fn abs_diffs<'a>(&'a self, other: &'a StateDistribution) -> impl Iterator<Item = f64> + 'a {
        let n = self.num_states().max(other.num_states());
        (1..=n).map(move |s| (self.proportion(s) - other.proportion(s)).abs())
    }
}

/// Distribution of states at 1-based `step` across all replicates.
pub fn cross_section(record: &SimulationRecord, step: usize) -> StateDistribution {
    StateDistribution::from_states(record.num_states(), record.states_at_step(step))
}

/// Distribution of states along one trajectory.
pub fn time_average(num_states: usize, trajectory: &Trajectory) -> StateDistribution {
    StateDistribution::from_states(num_states, trajectory.states().iter().copied())
}

/// Time average of replicate `rep` within a record.
pub fn time_average_of(record: &SimulationRecord, rep: usize) -> Option<StateDistribution> {
    record.replicate(rep).map(|rows| {
        StateDistribution::from_states(record.num_states(), rows.iter().map(|r| r.state))
    })
}

// =============================================================================
// TRANSITION COUNTS
// =============================================================================

/// Observed `from -> to` transition counts.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionCounts {
    counts: DMatrix<u64>,
}

impl TransitionCounts {
    pub fn new(num_states: usize) -> Self {
        Self {
            counts: DMatrix::zeros(num_states, num_states),
        }
    }

    /// Counts every consecutive pair in a trajectory.
    pub fn from_trajectory(num_states: usize, trajectory: &Trajectory) -> Self {
        let mut counts = Self::new(num_states);
        for (from, to) in trajectory.transitions() {
            counts.record(from, to);
        }
        counts
    }

    /// Counts consecutive pairs within each replicate of a record.
    ///
    /// Pairs never straddle two replicates.
    pub fn from_record(record: &SimulationRecord) -> Self {
        let mut counts = Self::new(record.num_states());
        for rep in record.replicate_ids() {
            if let Some(rows) = record.replicate(rep) {
                for pair in rows.windows(2) {
                    counts.record(pair[0].state, pair[1].state);
                }
            }
        }
        counts
    }

    /// Adds one observed move; out-of-range states are ignored.
    pub fn record(&mut self, from: State, to: State) {
        let n = self.counts.nrows();
        if (1..=n).contains(&from) && (1..=n).contains(&to) {
            self.counts[(from - 1, to - 1)] += 1;
        }
    }

    /// Adds another set of counts over the same states.
    ///
    /// Counts over a different number of states are ignored.
    pub fn merge(&mut self, other: &TransitionCounts) {
        if self.counts.shape() == other.counts.shape() {
            self.counts += &other.counts;
        }
    }

    pub fn num_states(&self) -> usize {
        self.counts.nrows()
    }

    pub fn count(&self, from: State, to: State) -> u64 {
        let n = self.counts.nrows();
        if (1..=n).contains(&from) && (1..=n).contains(&to) {
            self.counts[(from - 1, to - 1)]
        } else {
            0
        }
    }

    /// Number of observed moves out of `from`.
    pub fn row_total(&self, from: State) -> u64 {
        if from == 0 || from > self.counts.nrows() {
            return 0;
        }
        self.counts.row(from - 1).iter().sum()
    }

    /// Row-normalized counts. Rows never left stay all zero.
    pub fn empirical_matrix(&self) -> DMatrix<f64> {
        let n = self.counts.nrows();
        DMatrix::from_fn(n, n, |i, j| {
            let total = self.row_total(i + 1);
            if total == 0 {
                0.0
            } else {
                self.counts[(i, j)] as f64 / total as f64
            }
        })
    }

    /// States that were never left, in order.
    pub fn unvisited_rows(&self) -> Vec<State> {
        (1..=self.num_states())
            .filter(|&s| self.row_total(s) == 0)
            .collect()
    }

    /// Largest `|empirical - true|` entry over rows that were visited.
    ///
    /// `None` when the sizes differ or no row was visited at all.
    pub fn max_abs_deviation(&self, matrix: &TransitionMatrix) -> Option<f64> {
        let n = self.counts.nrows();
        if n != matrix.num_states() {
            return None;
        }

        let empirical = self.empirical_matrix();
        let truth = matrix.as_dmatrix();

        let mut worst: Option<f64> = None;
        for i in 0..n {
            if self.row_total(i + 1) == 0 {
                continue;
            }
            for j in 0..n {
                let diff = (empirical[(i, j)] - truth[(i, j)]).abs();
                worst = Some(worst.map_or(diff, |w| w.max(diff)));
            }
        }
        worst
    }
}
