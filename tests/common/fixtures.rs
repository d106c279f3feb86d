//! Query templates and result payloads used across workflow tests

use serde_json::{Value, json};

/// Saved template with all three filters, nested three levels deep
pub fn nested_template() -> Value {
    json!({
        "startDateTime": "2023-11-01T00:00:00Z",
        "endDateTime": "2023-11-01T06:00:00Z",
        "recordLimit": 100,
        "subject": {
            "orientation": "client",
            "ipAddresses": {
                "includes": [["10.0.0.0/8", ["10.1.0.0/16"]]],
                "excludes": ["10.9.9.9"]
            }
        },
        "peer": {
            "ipAddresses": {"includes": ["203.0.113.7"], "excludes": []}
        },
        "flow": {
            "ports": {"includes": [{"protocol": "tcp", "values": [22, 3389]}]}
        }
    })
}

/// A realistic raw results body; formatting is deliberately irregular
pub const RAW_RESULTS: &str = "{\"data\":{\"flows\":[{\"id\":9001,\"subject\":{\"ipAddress\":\"10.1.2.3\"},\"peer\":{\"ipAddress\":\"203.0.113.7\"}}]},\n  \"errors\": []}\n";
