//! Scenario-driven load engine for pointer-loadtest.
//!
//! This crate turns declarative traffic profiles into concurrently executing
//! request cycles and aggregates their outcomes:
//!
//! - [`scenario`] — profiles, stages, the two concurrency models, and
//!   duration parsing.
//! - [`cycle`] — the seam between the scheduler and whatever executes one
//!   request (HTTP in production, fakes in tests).
//! - [`scheduler`] — the staged ramp state machine and worker lifecycle.
//! - [`outcome`] — per-request outcomes and operation types.
//! - [`recorder`] — concurrent outcome collection, latency distribution,
//!   and run summaries.

pub mod cycle;
pub mod outcome;
pub mod recorder;
pub mod scenario;
pub mod scheduler;

pub use cycle::RequestCycle;
pub use outcome::{Operation, RequestOutcome};
pub use recorder::{OutcomeRecorder, RunSummary};
pub use scenario::{parse_duration, Model, ScenarioError, ScenarioProfile, Stage};
pub use scheduler::{ScenarioResult, ScenarioRunner, ScenarioState};
