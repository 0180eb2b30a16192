//! Per-request outcome types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Target operation driven by a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Upsert,
    Search,
    SearchPost,
    Count,
}

impl Operation {
    /// All operations, in reporting order.
    pub const ALL: [Operation; 8] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
        Operation::Upsert,
        Operation::Search,
        Operation::SearchPost,
        Operation::Count,
    ];

    /// HTTP status expected on success: 201 for record creation, 200 otherwise.
    pub fn expected_status(&self) -> u16 {
        match self {
            Operation::Create | Operation::Upsert => 201,
            _ => 200,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::Create => "createDocumentReference",
            Operation::Read => "readDocumentReference",
            Operation::Update => "updateDocumentReference",
            Operation::Delete => "deleteDocumentReference",
            Operation::Upsert => "upsertDocumentReference",
            Operation::Search => "searchDocumentReference",
            Operation::SearchPost => "searchPostDocumentReference",
            Operation::Count => "countDocumentReference",
        };
        write!(f, "{name}")
    }
}

/// Result of one request cycle.
#[derive(Debug, Clone)]
pub struct RequestOutcome {
    pub operation: Operation,
    /// Response status, `None` when the transport failed before a response
    pub status: Option<u16>,
    pub latency: Duration,
    pub success: bool,
    /// Response body or error detail captured for failed checks
    pub diagnostic: Option<String>,
}

impl RequestOutcome {
    /// Successful outcome with the given latency.
    pub fn passed(operation: Operation, status: u16, latency: Duration) -> Self {
        Self {
            operation,
            status: Some(status),
            latency,
            success: true,
            diagnostic: None,
        }
    }

    /// Failed outcome carrying response diagnostics.
    pub fn failed(
        operation: Operation,
        status: Option<u16>,
        latency: Duration,
        diagnostic: String,
    ) -> Self {
        Self {
            operation,
            status,
            latency,
            success: false,
            diagnostic: Some(diagnostic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_status_per_operation() {
        assert_eq!(Operation::Create.expected_status(), 201);
        assert_eq!(Operation::Upsert.expected_status(), 201);
        for op in [
            Operation::Read,
            Operation::Update,
            Operation::Delete,
            Operation::Search,
            Operation::SearchPost,
            Operation::Count,
        ] {
            assert_eq!(op.expected_status(), 200);
        }
    }

    #[test]
    fn test_operation_serde_names() {
        assert_eq!(
            serde_json::to_string(&Operation::SearchPost).expect("serializes"),
            "\"search-post\""
        );
        let op: Operation = serde_json::from_str("\"create\"").expect("parses");
        assert_eq!(op, Operation::Create);
    }

    #[test]
    fn test_display_matches_scenario_names() {
        assert_eq!(Operation::Count.to_string(), "countDocumentReference");
    }
}
