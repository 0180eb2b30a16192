//! Document-pointer record construction.
//!
//! Records are value types: executors clone the shared base template and stamp
//! per-request fields into the copy, so no mutable record is ever shared
//! between concurrent workers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A pointer type: SNOMED code plus its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerType {
    pub code: String,
    pub display: String,
}

impl PointerType {
    pub fn new(code: &str, display: &str) -> Self {
        Self {
            code: code.to_string(),
            display: display.to_string(),
        }
    }

    /// Fully-qualified form used in search parameters and metadata headers.
    pub fn qualified(&self) -> String {
        format!("http://snomed.info/sct|{}", self.code)
    }
}

/// A single coding entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coding {
    pub system: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Codeable concept wrapping a list of codings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeableConcept {
    pub coding: Vec<Coding>,
}

/// System/value identifier pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    pub system: String,
    pub value: String,
}

/// A reference carrying an identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierReference {
    pub identifier: Identifier,
}

/// Clinical context of the document, of which only the source patient
/// reference is stamped by the harness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    #[serde(rename = "sourcePatientInfo")]
    pub source_patient_info: IdentifierReference,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Attachment within a content entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "contentType", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Content entry of a document reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub attachment: Attachment,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A document-pointer payload.
///
/// Fields the harness never touches (status, custodian, author, ...) ride
/// along in `extra` so stored documents round-trip unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: CodeableConcept,
    pub subject: IdentifierReference,
    pub context: Context,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Content>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Base template mirroring the shape the target system accepts.
pub const DEFAULT_TEMPLATE: &str = r#"{
  "resourceType": "DocumentReference",
  "status": "current",
  "type": {
    "coding": [
      {
        "system": "http://snomed.info/sct",
        "code": "736253002",
        "display": "Mental Health Crisis Plan"
      }
    ]
  },
  "subject": {
    "identifier": {
      "system": "https://fhir.nhs.uk/Id/nhs-number",
      "value": "9278693472"
    }
  },
  "custodian": {
    "identifier": {
      "system": "https://fhir.nhs.uk/Id/ods-organization-code",
      "value": "Y05868"
    }
  },
  "author": [
    {
      "identifier": {
        "system": "https://fhir.nhs.uk/Id/ods-organization-code",
        "value": "Y05868"
      }
    }
  ],
  "content": [
    {
      "attachment": {
        "contentType": "application/pdf",
        "url": "https://example.org/my-doc.pdf"
      }
    }
  ],
  "context": {
    "sourcePatientInfo": {
      "identifier": {
        "system": "https://fhir.nhs.uk/Id/nhs-number",
        "value": "9278693472"
      }
    }
  }
}"#;

impl DocumentReference {
    /// Parse the built-in base template.
    pub fn default_template() -> Result<Self, serde_json::Error> {
        serde_json::from_str(DEFAULT_TEMPLATE)
    }
}

/// Build a fresh record from the base template.
///
/// The template is cloned, never mutated: each call yields an independent
/// record with a unique `{ods_code}-{uuid}` id, the requested pointer type
/// coding, and the patient identifier stamped into both the subject and the
/// source patient reference.
pub fn create_record(
    template: &DocumentReference,
    ods_code: &str,
    nhs_number: &str,
    pointer_type: &PointerType,
) -> DocumentReference {
    let mut record = template.clone();

    record.id = Some(format!("{ods_code}-{}", Uuid::new_v4()));

    if let Some(coding) = record.type_.coding.first_mut() {
        coding.code = pointer_type.code.clone();
        coding.display = Some(pointer_type.display.clone());
    }

    record.subject.identifier.value = nhs_number.to_string();
    record.context.source_patient_info.identifier.value = nhs_number.to_string();

    record
}
