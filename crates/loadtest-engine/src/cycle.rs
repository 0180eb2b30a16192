//! The request-cycle seam between the scheduler and request execution.

use crate::outcome::RequestOutcome;
use async_trait::async_trait;
use rand::rngs::StdRng;

/// One request cycle: build a request, send it, classify the response.
///
/// The scheduler drives implementations of this trait without knowing about
/// HTTP; each worker passes its own seeded RNG so draws stay reproducible.
/// Returning `None` signals an idle cycle (nothing left to do for this
/// operation, e.g. the delete pool ran dry) and must not be recorded as a
/// failure.
#[async_trait]
pub trait RequestCycle: Send + Sync {
    async fn execute(&self, rng: &mut StdRng) -> Option<RequestOutcome>;
}
