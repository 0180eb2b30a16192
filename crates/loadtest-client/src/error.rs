//! Client-side error types.

use std::path::PathBuf;

/// Errors raised while building or sending requests.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("reference corpus has no {what}")]
    EmptyCorpus { what: &'static str },

    #[error("no stored document for pointer id {id}")]
    UnknownDocument { id: String },

    #[error("invalid request url {url}: {detail}")]
    InvalidUrl { url: String, detail: String },

    #[error("invalid value for header {name}")]
    InvalidHeader {
        name: &'static str,
        source: reqwest::header::InvalidHeaderValue,
    },

    #[error("failed to serialize request body")]
    Body(#[from] serde_json::Error),

    #[error("failed to read tls material from {path}")]
    TlsRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid tls client identity for environment {env}")]
    TlsIdentity { env: String, source: reqwest::Error },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
