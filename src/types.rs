//! Core types for flowq

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Identifier the service assigns to a submitted query
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create a JobId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// Some deployments return numeric ids
impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) if s.is_empty() => {
                Err(serde::de::Error::custom("query id must not be empty"))
            }
            Raw::Text(s) => Ok(JobId(s)),
            Raw::Number(n) => Ok(JobId(n.to_string())),
        }
    }
}

/// A query accepted by the service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryJob {
    /// Query identifier used for status and result lookups
    pub id: JobId,
    /// Initial status text reported at submission
    #[serde(default)]
    pub status: Option<String>,
    /// Progress reported at submission, if any
    #[serde(default)]
    pub percent_complete: Option<f64>,
}

/// Progress snapshot from the status endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryProgress {
    /// Completion percentage, 0–100
    pub percent_complete: f64,
    /// Status text, if the service includes one
    #[serde(default)]
    pub status: Option<String>,
}

impl QueryProgress {
    /// Whether the query has finished server-side
    pub fn is_complete(&self) -> bool {
        self.percent_complete >= 100.0
    }
}

/// `{"data": {"query": ...}}` wrapper used by the query endpoints
#[derive(Debug, Deserialize)]
pub(crate) struct QueryEnvelope<T> {
    pub data: QueryData<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryData<T> {
    pub query: T,
}

/// How a run ended when it did not abort
#[derive(Clone, Debug, PartialEq)]
pub enum QueryOutcome {
    /// Results were downloaded and written to `path`
    Saved {
        /// Query that produced the results
        job_id: JobId,
        /// Output file
        path: PathBuf,
        /// Number of bytes written
        bytes: usize,
    },
    /// The query completed but its results could not be retrieved
    ResultsUnavailable {
        /// Query whose results were requested
        job_id: JobId,
        /// Human-readable failure text
        message: String,
    },
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_envelope_parses_string_id() {
        let json = r#"{"data": {"query": {"id": "abc123", "status": "PENDING"}}}"#;
        let envelope: QueryEnvelope<QueryJob> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.data.query.id, JobId::new("abc123"));
        assert_eq!(envelope.data.query.status.as_deref(), Some("PENDING"));
        assert_eq!(envelope.data.query.percent_complete, None);
    }

    #[test]
    fn numeric_id_is_stringified() {
        let json = r#"{"data": {"query": {"id": 90210}}}"#;
        let envelope: QueryEnvelope<QueryJob> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.data.query.id.as_str(), "90210");
    }

    #[test]
    fn empty_id_is_rejected() {
        let json = r#"{"data": {"query": {"id": ""}}}"#;
        assert!(serde_json::from_str::<QueryEnvelope<QueryJob>>(json).is_err());
    }

    #[test]
    fn progress_completes_at_one_hundred() {
        let json = r#"{"data": {"query": {"percentComplete": 55}}}"#;
        let envelope: QueryEnvelope<QueryProgress> = serde_json::from_str(json).unwrap();
        assert!(!envelope.data.query.is_complete());

        let done = QueryProgress {
            percent_complete: 100.0,
            status: Some("COMPLETED".to_string()),
        };
        assert!(done.is_complete());
    }

    #[test]
    fn progress_without_percent_is_an_error() {
        let json = r#"{"data": {"query": {"status": "RUNNING"}}}"#;
        assert!(serde_json::from_str::<QueryEnvelope<QueryProgress>>(json).is_err());
    }
}
