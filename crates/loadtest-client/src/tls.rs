//! Mutual-TLS client identity loading.
//!
//! Environments that require a client certificate keep the pair under
//! `truststore/client/{env}.crt` and `{env}.key`. A missing pair is not an
//! error: plain environments run without one.

use crate::error::ClientError;
use reqwest::Identity;
use std::path::Path;
use tracing::{info, warn};

/// Load the client identity for `env_type` from `truststore_dir`, if present.
pub fn load_identity(truststore_dir: &Path, env_type: &str) -> Result<Option<Identity>, ClientError> {
    let cert_path = truststore_dir.join(format!("{env_type}.crt"));
    let key_path = truststore_dir.join(format!("{env_type}.key"));

    if !cert_path.exists() || !key_path.exists() {
        warn!(
            env = env_type,
            dir = %truststore_dir.display(),
            "no client certificate pair found, connecting without client tls"
        );
        return Ok(None);
    }

    let mut pem = std::fs::read(&cert_path).map_err(|source| ClientError::TlsRead {
        path: cert_path.clone(),
        source,
    })?;
    pem.extend(std::fs::read(&key_path).map_err(|source| ClientError::TlsRead {
        path: key_path,
        source,
    })?);

    let identity = Identity::from_pem(&pem).map_err(|source| ClientError::TlsIdentity {
        env: env_type.to_string(),
        source,
    })?;

    info!(env = env_type, cert = %cert_path.display(), "loaded client tls identity");
    Ok(Some(identity))
}
