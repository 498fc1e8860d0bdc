//! Row-stochastic transition matrices.
//!
//! A [`TransitionMatrix`] can only be built through a validating constructor,
//! so every matrix handed to the simulator is square, non-negative and has
//! rows summing to 1 within [`ROW_SUM_TOLERANCE`].

use crate::error::{ChainError, Result};
use crate::State;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Maximum allowed `|row_sum - 1|` for a row to count as stochastic.
pub const ROW_SUM_TOLERANCE: f64 = 1e-8;

/// The five-state "bouncing blob" chain.
///
/// States 1 and 5 jump uniformly anywhere; states 2-4 bounce between
/// neighbours.
pub const BOUNCING_BLOB: [[f64; 5]; 5] = [
    [0.2, 0.2, 0.2, 0.2, 0.2],
    [0.2, 0.3, 0.5, 0.0, 0.0],
    [0.0, 0.3, 0.4, 0.3, 0.0],
    [0.0, 0.0, 0.5, 0.3, 0.2],
    [0.2, 0.2, 0.2, 0.2, 0.2],
];

/// A validated N×N transition probability matrix.
///
/// Entry `(i, j)` is the probability of moving from state `i` to state `j`.
/// States are 1-based at the API surface; storage is 0-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct TransitionMatrix {
    probabilities: DMatrix<f64>,
}

impl TransitionMatrix {
    /// Builds a matrix from its rows.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let n = rows.len();
        if n == 0 {
            return Err(ChainError::matrix("matrix has no rows"));
        }

        let mut data = Vec::with_capacity(n * n);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != n {
                return Err(ChainError::matrix(format!(
                    "not square: row {} has {} entries, expected {}",
                    i + 1,
                    row.len(),
                    n
                )));
            }
            data.extend_from_slice(row);
        }

        Self::from_dmatrix(DMatrix::from_row_slice(n, n, &data))
    }

    /// Wraps an existing nalgebra matrix after validating it.
    pub fn from_dmatrix(probabilities: DMatrix<f64>) -> Result<Self> {
        validate(&probabilities)?;
        Ok(Self { probabilities })
    }

    /// Parses a JSON array of rows, e.g. `[[0.5, 0.5], [0.1, 0.9]]`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let rows: Vec<Vec<f64>> = serde_json::from_str(json)
            .map_err(|e| ChainError::matrix(format!("malformed JSON: {}", e)))?;
        Self::from_rows(&rows)
    }

    /// The five-state bouncing blob matrix.
    pub fn bouncing_blob() -> Self {
        Self {
            probabilities: DMatrix::from_fn(5, 5, |i, j| BOUNCING_BLOB[i][j]),
        }
    }

    /// Number of states N.
    pub fn num_states(&self) -> usize {
        self.probabilities.nrows()
    }

    /// Returns true if `state` is a valid 1-based state index.
    pub fn contains_state(&self, state: State) -> bool {
        (1..=self.num_states()).contains(&state)
    }

    /// Probability of moving from `from` to `to` (both 1-based).
    ///
    /// Returns `None` when either index is out of range.
    pub fn probability(&self, from: State, to: State) -> Option<f64> {
        if !self.contains_state(from) || !self.contains_state(to) {
            return None;
        }
        Some(self.probabilities[(from - 1, to - 1)])
    }

    /// The outgoing distribution of `state` (1-based), if it exists.
    pub fn row(&self, state: State) -> Option<Vec<f64>> {
        if !self.contains_state(state) {
            return None;
        }
        Some(self.probabilities.row(state - 1).iter().copied().collect())
    }

    /// All rows, in state order.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (1..=self.num_states())
            .filter_map(|state| self.row(state))
            .collect()
    }

    /// Borrow the underlying nalgebra matrix.
    pub fn as_dmatrix(&self) -> &DMatrix<f64> {
        &self.probabilities
    }
}

impl TryFrom<Vec<Vec<f64>>> for TransitionMatrix {
    type Error = ChainError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self> {
        Self::from_rows(&rows)
    }
}

impl From<TransitionMatrix> for Vec<Vec<f64>> {
    fn from(matrix: TransitionMatrix) -> Self {
        matrix.to_rows()
    }
}

fn validate(m: &DMatrix<f64>) -> Result<()> {
    if m.nrows() == 0 || m.ncols() == 0 {
        return Err(ChainError::matrix("matrix has no rows"));
    }
    if m.nrows() != m.ncols() {
        return Err(ChainError::matrix(format!(
            "not square: {}x{}",
            m.nrows(),
            m.ncols()
        )));
    }

    for (i, row) in m.row_iter().enumerate() {
        if let Some(bad) = row.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(ChainError::matrix(format!(
                "row {} contains invalid probability {}",
                i + 1,
                bad
            )));
        }

        let sum: f64 = row.iter().sum();
        if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(ChainError::matrix(format!(
                "row {} sums to {}, expected 1",
                i + 1,
                sum
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bouncing_blob_is_valid() {
        let blob = TransitionMatrix::bouncing_blob();
        assert_eq!(blob.num_states(), 5);

        // Constructing through the validating path must agree
        let validated = TransitionMatrix::from_rows(&BOUNCING_BLOB).unwrap();
        assert_eq!(blob, validated);

        assert_relative_eq!(blob.probability(2, 3).unwrap(), 0.5);
        assert_relative_eq!(blob.probability(4, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_row_summing_to_point_nine_rejected() {
        let mut rows = BOUNCING_BLOB.to_vec();
        rows[2] = [0.0, 0.3, 0.3, 0.3, 0.0];

        let err = TransitionMatrix::from_rows(&rows).unwrap_err();
        assert!(matches!(err, ChainError::InvalidMatrix { .. }));
        assert!(err.to_string().contains("row 3"));
    }

    #[test]
    fn test_non_square_rejected() {
        let rows = vec![vec![0.5, 0.5], vec![1.0]];
        assert!(matches!(
            TransitionMatrix::from_rows(&rows),
            Err(ChainError::InvalidMatrix { .. })
        ));

        let wide = DMatrix::from_row_slice(1, 2, &[0.5, 0.5]);
        assert!(matches!(
            TransitionMatrix::from_dmatrix(wide),
            Err(ChainError::InvalidMatrix { .. })
        ));
    }

    #[test]
    fn test_empty_rejected() {
        let rows: Vec<Vec<f64>> = Vec::new();
        assert!(matches!(
            TransitionMatrix::from_rows(&rows),
            Err(ChainError::InvalidMatrix { .. })
        ));
    }

    #[test]
    fn test_negative_and_nan_rejected() {
        let negative = [[1.2, -0.2], [0.5, 0.5]];
        assert!(TransitionMatrix::from_rows(&negative).is_err());

        let nan = [[f64::NAN, 1.0], [0.5, 0.5]];
        assert!(TransitionMatrix::from_rows(&nan).is_err());
    }

    #[test]
    fn test_tolerance_boundary() {
        // Off by well under 1e-8: accepted
        let close = [[0.5, 0.5 + 1e-10], [0.0, 1.0]];
        assert!(TransitionMatrix::from_rows(&close).is_ok());

        // Off by 1e-6: rejected
        let far = [[0.5, 0.5 + 1e-6], [0.0, 1.0]];
        assert!(TransitionMatrix::from_rows(&far).is_err());
    }

    #[test]
    fn test_out_of_range_lookups() {
        let blob = TransitionMatrix::bouncing_blob();
        assert!(blob.probability(0, 1).is_none());
        assert!(blob.probability(1, 6).is_none());
        assert!(blob.row(6).is_none());
        assert!(!blob.contains_state(0));
        assert!(blob.contains_state(5));
    }

    #[test]
    fn test_json_roundtrip_and_errors() {
        let m = TransitionMatrix::from_json_str("[[0.5, 0.5], [0.1, 0.9]]").unwrap();
        assert_eq!(m.num_states(), 2);
        assert_eq!(m.row(2).unwrap(), vec![0.1, 0.9]);

        let json = serde_json::to_string(&m).unwrap();
        let back: TransitionMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(m, back);

        assert!(TransitionMatrix::from_json_str("[[0.5, 0.4], [0.1, 0.9]]").is_err());
        assert!(TransitionMatrix::from_json_str("not json").is_err());

        // Deserialize goes through validation as well
        let bad: std::result::Result<TransitionMatrix, _> =
            serde_json::from_str("[[0.5], [0.5]]");
        assert!(bad.is_err());
    }
}
