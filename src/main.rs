//! Command-line interface for pointer-loadtest
//!
//! # Usage Examples
//!
//! ```bash
//! # Baseline consumer load against a dev environment
//! pointer-loadtest run \
//!   --host api.dev.example.net \
//!   --env-type dev \
//!   --reference-data reference-data.json
//!
//! # Producer stress preset with a JSON report
//! pointer-loadtest run \
//!   --host api.dev.example.net \
//!   --preset stress \
//!   --output report.json
//!
//! # Custom scenario file
//! pointer-loadtest run \
//!   --host api.dev.example.net \
//!   --scenarios scenarios.yaml
//!
//! # Validate the reference corpus without sending traffic
//! pointer-loadtest check-data --reference-data reference-data.json
//! ```

use clap::Parser;
use pointer_loadtest::{run, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = execute().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn execute() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let all_passed = run::execute(args).await?;
            if !all_passed {
                std::process::exit(1);
            }
        }
        Commands::CheckData(args) => run::check_data(args)?,
    }

    Ok(())
}
