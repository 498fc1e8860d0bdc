//! Ergodicity experiments.

use serde::Serialize;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// Final-step distribution is the same from every start
    Ergodicity,

    /// One long run's time average matches the ensemble
    LongRun,

    /// Observed transition frequencies match the matrix
    MarkovProperty,
}

impl ScenarioId {
    /// Returns a list of all scenarios, in run order.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Ergodicity,
            ScenarioId::LongRun,
            ScenarioId::MarkovProperty,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Ergodicity => "ergodicity",
            ScenarioId::LongRun => "long_run",
            ScenarioId::MarkovProperty => "markov_property",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Ergodicity => {
                "Replicates from every start state agree at the final step"
            }
            ScenarioId::LongRun => {
                "Single long run time average matches the cross-replicate distribution"
            }
            ScenarioId::MarkovProperty => {
                "Empirical transition frequencies converge to the matrix rows"
            }
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ergodicity" | "ergodic" => Ok(ScenarioId::Ergodicity),
            "long_run" | "longrun" => Ok(ScenarioId::LongRun),
            "markov_property" | "markovproperty" | "markov" => Ok(ScenarioId::MarkovProperty),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
