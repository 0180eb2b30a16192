//! Run orchestration: wiring the corpus, client, and scheduler together.

use crate::cli::{CheckDataArgs, RunArgs};
use crate::config;
use anyhow::Context;
use chrono::{DateTime, Utc};
use loadtest_client::{ApiClient, ClientConfig, HttpRequestCycle, RequestFactory, RunContext};
use loadtest_data::{DocumentReference, ReferenceDataset};
use loadtest_engine::{OutcomeRecorder, RunSummary, ScenarioResult, ScenarioRunner};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Seed offset between scenarios so their workers draw independent streams.
const SCENARIO_SEED_STRIDE: u64 = 1000;

/// JSON run report written with `--output`.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub host: String,
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub scenarios: Vec<ScenarioResult>,
    pub summary: RunSummary,
    /// Pointer ids this run created on the target, for later cleanup
    pub created_pointer_ids: Vec<String>,
}

/// Execute a full load run. Returns whether every request check passed.
pub async fn execute(args: RunArgs) -> anyhow::Result<bool> {
    let profiles = match &args.scenarios {
        Some(path) => config::load_scenarios(path)?,
        None => {
            info!(preset = %args.preset, "using built-in scenario set");
            args.preset.scenarios()
        }
    };
    for planned in &profiles {
        planned
            .profile
            .validate()
            .with_context(|| format!("invalid scenario {}", planned.profile.name()))?;
    }

    let dataset = Arc::new(
        ReferenceDataset::load(&args.reference_data, args.delete_pool_size).with_context(
            || {
                format!(
                    "failed to load reference data from {}",
                    args.reference_data.display()
                )
            },
        )?,
    );

    let template =
        DocumentReference::default_template().context("invalid built-in record template")?;
    let identity = loadtest_client::load_identity(&args.truststore_dir, &args.env_type)
        .context("failed to load client tls identity")?;
    let client = Arc::new(ApiClient::new(identity).context("failed to build http client")?);

    let client_config = ClientConfig::new(base_url(&args.host), args.ods_code.clone());
    let factory = Arc::new(
        RequestFactory::new(Arc::clone(&dataset), client_config, template)
            .context("failed to build request factory")?,
    );
    let run_context = Arc::new(RunContext::new());
    let recorder = Arc::new(OutcomeRecorder::new());

    info!(
        host = %args.host,
        env = %args.env_type,
        seed = args.seed,
        scenarios = profiles.len(),
        "starting load run"
    );

    let started_at = Utc::now();
    let mut handles = Vec::new();
    for (index, planned) in profiles.into_iter().enumerate() {
        let cycle = Arc::new(
            HttpRequestCycle::new(
                planned.profile.operation,
                Arc::clone(&factory),
                Arc::clone(&client),
                Arc::clone(&run_context),
            )
            .on_surface(planned.surface),
        );
        let runner = ScenarioRunner::new(
            planned.profile,
            cycle,
            Arc::clone(&recorder),
            args.seed + index as u64 * SCENARIO_SEED_STRIDE,
        );
        handles.push(tokio::spawn(runner.run()));
    }

    let mut scenarios = Vec::new();
    for handle in handles {
        let result = handle.await.context("scenario task panicked")??;
        scenarios.push(result);
    }
    let completed_at = Utc::now();

    let summary = recorder.summary();
    println!("{}", summary.format_table());

    info!(
        created = run_context.created_count(),
        delete_pool_remaining = dataset.delete_pool().remaining(),
        "run teardown"
    );

    let all_passed = summary.all_passed();
    if all_passed {
        info!(total = summary.total, "all request checks passed");
    } else {
        warn!(
            failed = summary.failed,
            total = summary.total,
            "run recorded failed request checks"
        );
    }

    let report = RunReport {
        host: args.host,
        seed: args.seed,
        started_at,
        completed_at,
        scenarios,
        summary,
        created_pointer_ids: run_context.created_ids(),
    };
    if let Some(path) = &args.output {
        let json =
            serde_json::to_string_pretty(&report).context("failed to serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("failed to write run report to {}", path.display()))?;
        info!(path = %path.display(), "run report written");
    }

    Ok(all_passed)
}

/// Validate the reference corpus without sending any traffic.
pub fn check_data(args: CheckDataArgs) -> anyhow::Result<()> {
    let dataset = ReferenceDataset::load(&args.reference_data, args.delete_pool_size)
        .with_context(|| {
            format!(
                "failed to load reference data from {}",
                args.reference_data.display()
            )
        })?;
    println!("{}", dataset.describe());
    Ok(())
}

/// Hosts are given bare; a scheme in the argument is kept as-is.
fn base_url(host: &str) -> String {
    if host.contains("://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{host}")
    }
}
