//! HTTP request construction and execution against the document-pointer API.
//!
//! The crate splits one request cycle into two halves: [`RequestFactory`]
//! builds a [`RequestDescriptor`] from the reference corpus (pure, no I/O),
//! and [`ApiClient`] sends it and classifies the response into a
//! [`loadtest_engine::RequestOutcome`]. [`HttpRequestCycle`] glues the two
//! behind the scheduler's request-cycle trait.

pub mod client;
pub mod error;
pub mod executor;
pub mod headers;
pub mod tls;

pub use client::{ApiClient, HttpRequestCycle};
pub use error::ClientError;
pub use executor::{ClientConfig, RequestDescriptor, RequestFactory, RunContext};
pub use headers::Surface;
pub use tls::load_identity;
