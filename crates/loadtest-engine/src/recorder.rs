//! Concurrent outcome collection and run summaries.

use crate::outcome::{Operation, RequestOutcome};
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::error;

/// Collects per-request outcomes from any number of concurrent workers.
///
/// Recording is append-only behind a mutex held just long enough to push;
/// failed checks are logged immediately with their diagnostics so they are
/// visible during long-running scenarios.
#[derive(Debug, Default)]
pub struct OutcomeRecorder {
    outcomes: Mutex<Vec<RequestOutcome>>,
}

impl OutcomeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome. Safe to call from any worker.
    pub fn record(&self, outcome: RequestOutcome) {
        if !outcome.success {
            error!(
                operation = %outcome.operation,
                status = ?outcome.status,
                diagnostic = outcome.diagnostic.as_deref().unwrap_or("-"),
                "request check failed"
            );
        }
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(outcome);
    }

    /// Number of outcomes recorded so far.
    pub fn len(&self) -> usize {
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when no recorded outcome failed its check.
    pub fn all_passed(&self) -> bool {
        self.outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .all(|o| o.success)
    }

    /// Aggregate counts and latency distribution across all outcomes.
    pub fn summary(&self) -> RunSummary {
        let outcomes = self.outcomes.lock().unwrap_or_else(|e| e.into_inner());

        let mut operations = Vec::new();
        for operation in Operation::ALL {
            let mut latencies_ms: Vec<f64> = Vec::new();
            let mut passed = 0u64;
            let mut failed = 0u64;

            for outcome in outcomes.iter().filter(|o| o.operation == operation) {
                latencies_ms.push(outcome.latency.as_secs_f64() * 1000.0);
                if outcome.success {
                    passed += 1;
                } else {
                    failed += 1;
                }
            }

            if passed + failed == 0 {
                continue;
            }

            operations.push(OperationSummary {
                operation,
                requests: passed + failed,
                passed,
                failed,
                latency: LatencySummary::from_millis(&mut latencies_ms),
            });
        }

        let total = outcomes.len() as u64;
        let failed = outcomes.iter().filter(|o| !o.success).count() as u64;

        RunSummary {
            total,
            passed: total - failed,
            failed,
            operations,
        }
    }
}

/// Latency distribution in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencySummary {
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
}

impl LatencySummary {
    fn from_millis(values: &mut [f64]) -> Self {
        if values.is_empty() {
            return Self {
                min_ms: 0.0,
                mean_ms: 0.0,
                p50_ms: 0.0,
                p90_ms: 0.0,
                p95_ms: 0.0,
                max_ms: 0.0,
            };
        }
        values.sort_by(|a, b| a.total_cmp(b));
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Self {
            min_ms: values[0],
            mean_ms: mean,
            p50_ms: percentile(values, 0.50),
            p90_ms: percentile(values, 0.90),
            p95_ms: percentile(values, 0.95),
            max_ms: values[values.len() - 1],
        }
    }
}

/// Nearest-rank percentile over sorted values.
fn percentile(sorted: &[f64], quantile: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (quantile * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Per-operation aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSummary {
    pub operation: Operation,
    pub requests: u64,
    pub passed: u64,
    pub failed: u64,
    pub latency: LatencySummary,
}

/// Aggregate counts for the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub operations: Vec<OperationSummary>,
}

impl RunSummary {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Format the summary as a table for terminal output.
    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            "Operation", "Requests", "Passed", "Failed", "p50 (ms)", "p95 (ms)", "Max (ms)",
            "Status",
        ]);

        for op in &self.operations {
            let status_cell = if op.failed == 0 {
                Cell::new("OK").fg(Color::Green)
            } else {
                Cell::new("FAILED").fg(Color::Red)
            };
            table.add_row(vec![
                Cell::new(op.operation.to_string()),
                Cell::new(op.requests),
                Cell::new(op.passed),
                Cell::new(op.failed),
                Cell::new(format!("{:.1}", op.latency.p50_ms)),
                Cell::new(format!("{:.1}", op.latency.p95_ms)),
                Cell::new(format!("{:.1}", op.latency.max_ms)),
                status_cell,
            ]);
        }

        table.add_row(vec![
            Cell::new("TOTAL").fg(Color::Cyan),
            Cell::new(self.total),
            Cell::new(self.passed),
            Cell::new(self.failed),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new("-"),
            if self.all_passed() {
                Cell::new("OK").fg(Color::Green)
            } else {
                Cell::new("FAILED").fg(Color::Red)
            },
        ]);

        table.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn outcome(operation: Operation, success: bool, millis: u64) -> RequestOutcome {
        if success {
            RequestOutcome::passed(operation, operation.expected_status(), Duration::from_millis(millis))
        } else {
            RequestOutcome::failed(
                operation,
                Some(500),
                Duration::from_millis(millis),
                "boom".to_string(),
            )
        }
    }

    #[test]
    fn test_summary_counts_by_operation() {
        let recorder = OutcomeRecorder::new();
        recorder.record(outcome(Operation::Create, true, 10));
        recorder.record(outcome(Operation::Create, false, 20));
        recorder.record(outcome(Operation::Read, true, 5));

        let summary = recorder.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.all_passed());

        let create = &summary.operations[0];
        assert_eq!(create.operation, Operation::Create);
        assert_eq!(create.requests, 2);
        assert_eq!(create.failed, 1);
    }

    #[test]
    fn test_latency_distribution() {
        let recorder = OutcomeRecorder::new();
        for millis in [10, 20, 30, 40, 50, 60, 70, 80, 90, 100] {
            recorder.record(outcome(Operation::Search, true, millis));
        }

        let summary = recorder.summary();
        let latency = &summary.operations[0].latency;
        assert_eq!(latency.min_ms, 10.0);
        assert_eq!(latency.max_ms, 100.0);
        assert_eq!(latency.p50_ms, 50.0);
        assert_eq!(latency.p90_ms, 90.0);
        assert_eq!(latency.mean_ms, 55.0);
    }

    #[test]
    fn test_concurrent_recording() {
        let recorder = Arc::new(OutcomeRecorder::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let recorder = Arc::clone(&recorder);
            handles.push(std::thread::spawn(move || {
                for _ in 0..250 {
                    recorder.record(outcome(Operation::Count, true, 1));
                }
            }));
        }
        for handle in handles {
            handle.join().expect("thread panicked");
        }

        assert_eq!(recorder.len(), 2000);
        assert!(recorder.all_passed());
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let recorder = OutcomeRecorder::new();
        recorder.record(outcome(Operation::Delete, true, 12));
        let json = serde_json::to_value(recorder.summary()).expect("serializes");
        assert_eq!(json["total"], 1);
        assert_eq!(json["operations"][0]["operation"], "delete");
    }
}
