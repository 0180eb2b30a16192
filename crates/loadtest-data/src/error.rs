//! Error types for reference data loading and partitioning.

use std::path::PathBuf;

/// Errors raised while loading or partitioning the reference corpus.
///
/// All of these are fatal: they abort the run before any scenario starts.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceDataError {
    /// Reference file could not be read
    #[error("failed to read reference data file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reference file is not valid JSON or is missing a required key
    #[error("malformed reference data file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A document body could not be decoded
    #[error("invalid document body for pointer {id}: {source}")]
    InvalidDocument {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// The pointer-ID universe is empty
    #[error("reference data contains no pointer IDs")]
    EmptyUniverse,

    /// Requested delete pool exceeds the available pointer-ID universe
    #[error("delete pool of {requested} pointer IDs requested but only {available} available")]
    InsufficientData { requested: usize, available: usize },
}
