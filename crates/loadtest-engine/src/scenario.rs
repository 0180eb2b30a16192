//! Scenario profiles: traffic shapes staged over time.

use crate::outcome::Operation;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Concurrency model for a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Model {
    /// Target request-issuance rate (requests per second) staged over time
    ArrivalRate,
    /// Target number of concurrently active workers staged over time
    ConcurrencyRamp,
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Model::ArrivalRate => write!(f, "arrival-rate"),
            Model::ConcurrencyRamp => write!(f, "concurrency-ramp"),
        }
    }
}

/// One segment of a scenario's time-varying load profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Target level at the end of the stage (workers or requests/second)
    pub target: u64,
    /// How long the stage lasts
    #[serde(with = "duration_str")]
    pub duration: Duration,
}

/// Immutable configuration for one named scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioProfile {
    /// Scenario name; defaults to the operation's full name
    #[serde(default)]
    pub name: Option<String>,
    pub operation: Operation,
    pub model: Model,
    /// Level the first stage ramps from
    #[serde(default)]
    pub start_level: u64,
    /// Worker pool size for the arrival-rate model
    #[serde(default = "default_preallocated_workers")]
    pub preallocated_workers: usize,
    pub stages: Vec<Stage>,
}

fn default_preallocated_workers() -> usize {
    5
}

/// Errors raised when a scenario profile is invalid at start.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("scenario {name}: no stages defined")]
    NoStages { name: String },

    #[error("scenario {name}: stage {stage} has zero duration")]
    ZeroDuration { name: String, stage: usize },

    #[error("scenario {name}: arrival-rate model needs at least one preallocated worker")]
    NoWorkers { name: String },
}

impl ScenarioProfile {
    /// Effective scenario name.
    pub fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.operation.to_string())
    }

    /// Validate the profile before the scenario starts.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.stages.is_empty() {
            return Err(ScenarioError::NoStages { name: self.name() });
        }
        for (i, stage) in self.stages.iter().enumerate() {
            if stage.duration.is_zero() {
                return Err(ScenarioError::ZeroDuration {
                    name: self.name(),
                    stage: i,
                });
            }
        }
        if self.model == Model::ArrivalRate && self.preallocated_workers == 0 {
            return Err(ScenarioError::NoWorkers { name: self.name() });
        }
        Ok(())
    }

    /// Total duration of all stages.
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// Stage index active at `elapsed`, or `None` once all stages elapsed.
    pub fn stage_at(&self, elapsed: Duration) -> Option<usize> {
        let mut end = Duration::ZERO;
        for (i, stage) in self.stages.iter().enumerate() {
            end += stage.duration;
            if elapsed < end {
                return Some(i);
            }
        }
        None
    }

    /// Target level at `elapsed`, interpolated linearly within each stage
    /// from the previous stage's target (or `start_level` for the first).
    pub fn level_at(&self, elapsed: Duration) -> f64 {
        let mut previous = self.start_level as f64;
        let mut start = Duration::ZERO;

        for stage in &self.stages {
            let end = start + stage.duration;
            if elapsed < end {
                let fraction =
                    (elapsed - start).as_secs_f64() / stage.duration.as_secs_f64();
                return previous + (stage.target as f64 - previous) * fraction;
            }
            previous = stage.target as f64;
            start = end;
        }

        self.stages.last().map(|s| s.target as f64).unwrap_or(0.0)
    }
}

/// Parse a human-readable duration such as `500ms`, `30s`, `5m`, or `1h`.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("empty duration".to_string());
    }

    let (number, unit) = if let Some(n) = value.strip_suffix("ms") {
        (n, "ms")
    } else if let Some(n) = value.strip_suffix('s') {
        (n, "s")
    } else if let Some(n) = value.strip_suffix('m') {
        (n, "m")
    } else if let Some(n) = value.strip_suffix('h') {
        (n, "h")
    } else {
        return Err(format!("duration {value:?} missing unit (ms, s, m, h)"));
    };

    let number: u64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration number in {value:?}"))?;

    Ok(match unit {
        "ms" => Duration::from_millis(number),
        "s" => Duration::from_secs(number),
        "m" => Duration::from_secs(number * 60),
        _ => Duration::from_secs(number * 3600),
    })
}

/// Format a duration back into the config notation.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis % 1000 != 0 {
        return format!("{millis}ms");
    }
    let secs = duration.as_secs();
    if secs % 3600 == 0 && secs > 0 {
        format!("{}h", secs / 3600)
    } else if secs % 60 == 0 && secs > 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

mod duration_str {
    use super::{format_duration, parse_duration};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let value = String::deserialize(deserializer)?;
        parse_duration(&value).map_err(serde::de::Error::custom)
    }
}
