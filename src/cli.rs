//! Command-line interface definitions.

use crate::preset::PresetName;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pointer-loadtest")]
#[command(about = "Scenario-driven load harness for the document-pointer API")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run load scenarios against a target environment
    Run(RunArgs),

    /// Validate the reference corpus and print the pool partition
    CheckData(CheckDataArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Target host, e.g. api.example.net
    #[arg(long, env = "HOST")]
    pub host: String,

    /// Environment name selecting the client TLS identity
    #[arg(long, env = "ENV_TYPE", default_value = "dev")]
    pub env_type: String,

    /// Reference corpus file
    #[arg(long, default_value = "reference-data.json")]
    pub reference_data: PathBuf,

    /// Scenario configuration file (overrides --preset)
    #[arg(long)]
    pub scenarios: Option<PathBuf>,

    /// Built-in scenario set to run when no --scenarios file is given
    #[arg(long, value_enum, default_value_t = PresetName::Baseline)]
    pub preset: PresetName,

    /// Base seed for all random draws
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Pointer IDs reserved for single-use delete requests
    #[arg(long, default_value_t = 3500)]
    pub delete_pool_size: usize,

    /// ODS organisation code stamped into records and headers
    #[arg(long, default_value = "Y05868")]
    pub ods_code: String,

    /// Directory holding client certificate pairs
    #[arg(long, default_value = "truststore/client")]
    pub truststore_dir: PathBuf,

    /// Write the JSON run report here
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct CheckDataArgs {
    /// Reference corpus file
    #[arg(long, default_value = "reference-data.json")]
    pub reference_data: PathBuf,

    /// Pointer IDs reserved for single-use delete requests
    #[arg(long, default_value_t = 3500)]
    pub delete_pool_size: usize,
}
