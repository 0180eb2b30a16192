//! HTTP transport and response classification.

use crate::error::ClientError;
use crate::executor::{RequestDescriptor, RequestFactory, RunContext};
use crate::headers::Surface;
use async_trait::async_trait;
use loadtest_engine::{Operation, RequestCycle, RequestOutcome};
use rand::rngs::StdRng;
use reqwest::Identity;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Per-request timeout; a slower response is a failed outcome, not a hang.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on captured diagnostic bodies.
const MAX_DIAGNOSTIC_LEN: usize = 2048;

/// Thin wrapper over a shared `reqwest::Client`.
pub struct ApiClient {
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(identity: Option<Identity>) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(REQUEST_TIMEOUT);
        if let Some(identity) = identity {
            builder = builder.identity(identity);
        }
        Ok(Self {
            http: builder.build()?,
        })
    }

    /// Send one request and classify the response.
    ///
    /// Every path out of here is an outcome; transport errors and unexpected
    /// statuses never propagate as errors, so one bad cycle cannot take a
    /// scenario down.
    pub async fn send(&self, descriptor: &RequestDescriptor) -> RequestOutcome {
        let start = Instant::now();
        let mut request = self
            .http
            .request(descriptor.method.clone(), descriptor.url.clone())
            .headers(descriptor.headers.clone());
        if let Some(body) = &descriptor.body {
            request = request.body(body.clone());
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                let latency = start.elapsed();
                if status == descriptor.expected_status {
                    return RequestOutcome::passed(descriptor.operation, status, latency);
                }
                // Capture the body before reporting so diagnostics survive
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|e| format!("<body unavailable: {e}>"));
                classify_failure(descriptor.operation, Some(status), latency, body)
            }
            Err(e) => classify_failure(
                descriptor.operation,
                e.status().map(|s| s.as_u16()),
                start.elapsed(),
                e.to_string(),
            ),
        }
    }
}

/// Build a failed outcome with its diagnostic trimmed to a sane size.
fn classify_failure(
    operation: Operation,
    status: Option<u16>,
    latency: Duration,
    diagnostic: String,
) -> RequestOutcome {
    let diagnostic = if diagnostic.len() > MAX_DIAGNOSTIC_LEN {
        let mut end = MAX_DIAGNOSTIC_LEN;
        while !diagnostic.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &diagnostic[..end])
    } else {
        diagnostic
    };
    RequestOutcome::failed(operation, status, latency, diagnostic)
}

/// One operation bound to the factory, transport, and run context.
///
/// The scheduler drives this through the request-cycle trait; each worker
/// passes its own seeded RNG, so corpus draws stay reproducible per worker.
pub struct HttpRequestCycle {
    operation: Operation,
    surface: Surface,
    factory: Arc<RequestFactory>,
    client: Arc<ApiClient>,
    run: Arc<RunContext>,
}

impl HttpRequestCycle {
    pub fn new(
        operation: Operation,
        factory: Arc<RequestFactory>,
        client: Arc<ApiClient>,
        run: Arc<RunContext>,
    ) -> Self {
        Self {
            operation,
            surface: Surface::default_for(operation),
            factory,
            client,
            run,
        }
    }

    /// Pin the cycle to a specific surface instead of the operation default.
    pub fn on_surface(mut self, surface: Surface) -> Self {
        self.surface = surface;
        self
    }
}

#[async_trait]
impl RequestCycle for HttpRequestCycle {
    async fn execute(&self, rng: &mut StdRng) -> Option<RequestOutcome> {
        let descriptor = match self.factory.build_on(self.operation, self.surface, rng) {
            Ok(Some(descriptor)) => descriptor,
            Ok(None) => {
                debug!(operation = %self.operation, "nothing left to do, idling");
                return None;
            }
            Err(e) => {
                return Some(RequestOutcome::failed(
                    self.operation,
                    None,
                    Duration::ZERO,
                    e.to_string(),
                ))
            }
        };

        let outcome = self.client.send(&descriptor).await;
        if outcome.success {
            if let Some(id) = descriptor.created_id {
                self.run.record_created(id);
            }
        }
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_status_yields_diagnostic() {
        let outcome = classify_failure(
            Operation::Create,
            Some(500),
            Duration::from_millis(12),
            r#"{"issue":[{"diagnostics":"internal error"}]}"#.to_string(),
        );

        assert!(!outcome.success);
        assert_eq!(outcome.status, Some(500));
        let diagnostic = outcome.diagnostic.expect("diagnostic captured");
        assert!(diagnostic.contains("internal error"));
    }

    #[test]
    fn test_transport_failure_has_no_status() {
        let outcome = classify_failure(
            Operation::Read,
            None,
            Duration::from_millis(3),
            "connection refused".to_string(),
        );

        assert!(!outcome.success);
        assert_eq!(outcome.status, None);
        assert_eq!(outcome.diagnostic.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_oversized_diagnostics_are_truncated() {
        let outcome = classify_failure(
            Operation::Search,
            Some(502),
            Duration::from_millis(1),
            "x".repeat(10_000),
        );

        let diagnostic = outcome.diagnostic.expect("diagnostic captured");
        assert!(diagnostic.len() < 10_000);
        assert!(diagnostic.ends_with("[truncated]"));
    }
}
