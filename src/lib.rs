//! Scenario-driven load harness for the document-pointer API.
//!
//! The binary wires the workspace crates together: `loadtest-data` supplies
//! the reference corpus and record templates, `loadtest-client` builds and
//! sends the HTTP requests, and `loadtest-engine` schedules workers and
//! aggregates outcomes. This crate owns configuration and orchestration only.

pub mod cli;
pub mod config;
pub mod preset;
pub mod run;

pub use cli::{Cli, Commands};
pub use preset::PresetName;
