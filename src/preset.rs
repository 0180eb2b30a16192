//! Built-in scenario sets.

use crate::config::PlannedScenario;
use clap::ValueEnum;
use loadtest_client::Surface;
use loadtest_engine::{Model, Operation, ScenarioProfile, Stage};
use std::time::Duration;

/// Named preset selectable from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PresetName {
    /// Consumer operations at a steady arrival rate
    Baseline,
    /// Producer operations under a concurrency ramp
    Stress,
    /// Consumer operations held at rate for half an hour
    Soak,
}

impl std::fmt::Display for PresetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PresetName::Baseline => write!(f, "baseline"),
            PresetName::Stress => write!(f, "stress"),
            PresetName::Soak => write!(f, "soak"),
        }
    }
}

/// Operations driven against the consumer side of the API.
const CONSUMER_OPERATIONS: [Operation; 4] = [
    Operation::Count,
    Operation::Read,
    Operation::Search,
    Operation::SearchPost,
];

/// Operations driven against the producer side of the API.
const PRODUCER_OPERATIONS: [Operation; 5] = [
    Operation::Create,
    Operation::Read,
    Operation::Update,
    Operation::Delete,
    Operation::Upsert,
];

impl PresetName {
    /// Scenario plan for this preset.
    pub fn scenarios(&self) -> Vec<PlannedScenario> {
        match self {
            PresetName::Baseline => CONSUMER_OPERATIONS
                .into_iter()
                .map(|operation| PlannedScenario {
                    surface: Surface::Consumer,
                    profile: ScenarioProfile {
                        name: None,
                        operation,
                        model: Model::ArrivalRate,
                        start_level: 1,
                        preallocated_workers: 5,
                        stages: vec![
                            stage(5, Duration::from_secs(30)),
                            stage(5, Duration::from_secs(60)),
                        ],
                    },
                })
                .collect(),
            PresetName::Stress => PRODUCER_OPERATIONS
                .into_iter()
                .map(|operation| PlannedScenario {
                    surface: Surface::Producer,
                    profile: ScenarioProfile {
                        name: None,
                        operation,
                        model: Model::ConcurrencyRamp,
                        start_level: 1,
                        preallocated_workers: 5,
                        stages: vec![
                            stage(10, Duration::from_secs(30)),
                            stage(10, Duration::from_secs(60)),
                        ],
                    },
                })
                .collect(),
            PresetName::Soak => CONSUMER_OPERATIONS
                .into_iter()
                .map(|operation| PlannedScenario {
                    surface: Surface::Consumer,
                    profile: ScenarioProfile {
                        name: None,
                        operation,
                        model: Model::ArrivalRate,
                        start_level: 0,
                        preallocated_workers: 5,
                        stages: vec![
                            stage(10, Duration::from_secs(5 * 60)),
                            stage(10, Duration::from_secs(30 * 60)),
                            stage(0, Duration::from_secs(60)),
                        ],
                    },
                })
                .collect(),
        }
    }
}

fn stage(target: u64, duration: Duration) -> Stage {
    Stage { target, duration }
}
