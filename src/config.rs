//! Scenario configuration files.

use anyhow::Context;
use loadtest_client::Surface;
use loadtest_engine::ScenarioProfile;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One scenario ready to run: the traffic profile plus the API surface its
/// requests target.
#[derive(Debug, Clone)]
pub struct PlannedScenario {
    pub surface: Surface,
    pub profile: ScenarioProfile,
}

/// Top level of a scenario YAML file.
#[derive(Debug, Serialize, Deserialize)]
struct ScenarioFile {
    scenarios: Vec<ScenarioEntry>,
}

/// One scenario as written in YAML; `surface` defaults per operation.
#[derive(Debug, Serialize, Deserialize)]
struct ScenarioEntry {
    #[serde(default)]
    surface: Option<Surface>,
    #[serde(flatten)]
    profile: ScenarioProfile,
}

/// Load and validate scenario profiles from a YAML file.
pub fn load_scenarios(path: &Path) -> anyhow::Result<Vec<PlannedScenario>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario file {}", path.display()))?;
    let file: ScenarioFile = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse scenario file {}", path.display()))?;

    if file.scenarios.is_empty() {
        anyhow::bail!("scenario file {} defines no scenarios", path.display());
    }

    let mut planned = Vec::with_capacity(file.scenarios.len());
    for entry in file.scenarios {
        entry
            .profile
            .validate()
            .with_context(|| format!("invalid scenario in {}", path.display()))?;
        planned.push(PlannedScenario {
            surface: entry
                .surface
                .unwrap_or_else(|| Surface::default_for(entry.profile.operation)),
            profile: entry.profile,
        });
    }
    Ok(planned)
}
