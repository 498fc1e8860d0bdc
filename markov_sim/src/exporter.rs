//! JSON exporter for replicate runs.
//!
//! Writes the flattened `init, step, state, rep` table together with the
//! summaries a plotting tool usually wants.

use crate::error::SimError;
use markov_core::stats::{cross_section, time_average_of};
use markov_core::{RecordRow, SimulationRecord, State, TransitionMatrix};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Complete export of one replicate run.
#[derive(Debug, Clone, Serialize)]
pub struct SimExport {
    /// Seed used
    pub seed: u64,

    /// Transition matrix rows
    pub matrix: Vec<Vec<f64>>,

    /// Shared starting state
    pub init: State,

    pub steps: usize,
    pub reps: usize,
    pub num_states: usize,

    /// One row per (replicate, step)
    pub rows: Vec<RecordRow>,

    /// State proportions at the final step across replicates
    pub final_step_distribution: Vec<f64>,

    /// State proportions along replicate 1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_average: Option<Vec<f64>>,
}

impl SimExport {
    /// Builds an export from a finished run.
    pub fn new(seed: u64, matrix: &TransitionMatrix, record: &SimulationRecord) -> Self {
        Self {
            seed,
            matrix: matrix.to_rows(),
            init: record.init(),
            steps: record.steps(),
            reps: record.reps(),
            num_states: record.num_states(),
            rows: record.rows().to_vec(),
            final_step_distribution: cross_section(record, record.steps()).proportions(),
            time_average: time_average_of(record, 1).map(|d| d.proportions()),
        }
    }

    /// Writes pretty JSON to `writer`.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), SimError> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
