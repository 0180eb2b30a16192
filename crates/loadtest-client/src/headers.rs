//! Metadata headers attached to every request.
//!
//! The gateway authorises callers from two JSON-encoded headers:
//! `NHSD-Connection-Metadata` names the organisation, its permitted pointer
//! types, and the application id; `NHSD-Client-RP-Details` names the
//! registered application. Producer requests carry the permitted types under
//! `nrl.pointer-types`, consumer requests under `nrl.test-pointer-types`.

use crate::error::ClientError;
use loadtest_data::PointerType;
use loadtest_engine::Operation;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const FHIR_CONTENT_TYPE: &str = "application/fhir+json";

/// Which side of the API a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Producer,
    Consumer,
}

impl Surface {
    pub fn path_segment(&self) -> &'static str {
        match self {
            Surface::Producer => "producer",
            Surface::Consumer => "consumer",
        }
    }

    /// Surface an operation targets when the scenario does not pick one.
    ///
    /// Read, search, and search-post exist on both sides of the API; the
    /// producer side is the default for read (it owns the pointers), the
    /// consumer side for the searches. The remaining operations only exist
    /// on one side.
    pub fn default_for(operation: Operation) -> Surface {
        match operation {
            Operation::Create
            | Operation::Read
            | Operation::Update
            | Operation::Delete
            | Operation::Upsert => Surface::Producer,
            Operation::Search | Operation::SearchPost | Operation::Count => Surface::Consumer,
        }
    }
}

impl std::fmt::Display for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}

/// JSON payload for the `NHSD-Connection-Metadata` header.
pub fn connection_metadata(
    surface: Surface,
    ods_code: &str,
    pointer_types: &[PointerType],
    app_id: &str,
) -> String {
    let qualified: Vec<String> = pointer_types.iter().map(PointerType::qualified).collect();
    let types_key = match surface {
        Surface::Producer => "nrl.pointer-types",
        Surface::Consumer => "nrl.test-pointer-types",
    };
    let mut metadata = Map::new();
    metadata.insert("nrl.ods-code".to_string(), json!(ods_code));
    metadata.insert(types_key.to_string(), json!(qualified));
    metadata.insert("nrl.app-id".to_string(), json!(app_id));
    Value::Object(metadata).to_string()
}

/// JSON payload for the `NHSD-Client-RP-Details` header.
pub fn client_rp_details(app_id: &str) -> String {
    json!({
        "developer.app.name": app_id,
        "developer.app.id": app_id,
    })
    .to_string()
}

/// Full header map for one surface, built once per run and cloned per request.
pub fn header_map(
    surface: Surface,
    ods_code: &str,
    pointer_types: &[PointerType],
    app_id: &str,
) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(FHIR_CONTENT_TYPE));
    headers.insert(
        "NHSD-Connection-Metadata",
        header_value(
            "NHSD-Connection-Metadata",
            &connection_metadata(surface, ods_code, pointer_types, app_id),
        )?,
    );
    headers.insert(
        "NHSD-Client-RP-Details",
        header_value("NHSD-Client-RP-Details", &client_rp_details(app_id))?,
    );
    if surface == Surface::Producer {
        headers.insert("X-Request-Id", header_value("X-Request-Id", app_id)?);
        headers.insert(
            "NHSD-Correlation-Id",
            header_value("NHSD-Correlation-Id", app_id)?,
        );
    }
    Ok(headers)
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, ClientError> {
    HeaderValue::from_str(value).map_err(|source| ClientError::InvalidHeader { name, source })
}
