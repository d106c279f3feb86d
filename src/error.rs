//! Error types for flowq
//!
//! Every failure in the query workflow maps to one [`Error`] variant. Variants
//! carry the remote status code and a short response excerpt where one exists,
//! so an operator can see what the analytics service said without re-running
//! the query.
//!
//! Error messages never include credentials. The authentication variant only
//! reports the username-free status and reason.

use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for flowq operations
pub type Result<T> = std::result::Result<T, Error>;

/// Maximum number of response body characters kept in an error message
const MAX_BODY_EXCERPT: usize = 512;

/// Main error type for flowq
#[derive(Debug, Error)]
pub enum Error {
    /// Authentication was rejected or did not yield an anti-forgery token
    #[error("authentication failed: {reason}")]
    Auth {
        /// HTTP status returned by the authentication endpoint, if any
        status: Option<StatusCode>,
        /// Human-readable reason
        reason: String,
    },

    /// Query submission did not return 201 Created
    #[error("query submission failed with status {status}: {body}")]
    Submission {
        /// HTTP status returned by the submission endpoint
        status: StatusCode,
        /// Excerpt of the response body
        body: String,
    },

    /// A status poll returned an unexpected, non-transient status
    #[error("status poll for query {job_id} failed with status {status}: {body}")]
    Poll {
        /// The query job being polled
        job_id: String,
        /// HTTP status returned by the status endpoint
        status: StatusCode,
        /// Excerpt of the response body
        body: String,
    },

    /// Result retrieval did not return 200 OK
    ///
    /// This is the only non-fatal failure: the workflow reports it and ends normally.
    #[error("result retrieval for query {job_id} failed with status {status}: {body}")]
    ResultFetch {
        /// The query job whose results were requested
        job_id: String,
        /// HTTP status returned by the results endpoint
        status: StatusCode,
        /// Excerpt of the response body
        body: String,
    },

    /// Saved query template is missing, unreadable, or not a JSON object
    #[error("query template {path}: {reason}")]
    Template {
        /// Template file path
        path: PathBuf,
        /// Why the template could not be used
        reason: String,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// The query did not reach 100% within the configured polling timeout
    #[error("query {job_id} did not complete within {waited:?} (last progress {last_percent}%)")]
    Timeout {
        /// The query job being polled
        job_id: String,
        /// How long the client waited
        waited: std::time::Duration,
        /// Last percentComplete value observed
        last_percent: f64,
    },

    /// The operator cancelled the workflow (Ctrl+C / SIGTERM)
    #[error("cancelled while waiting for query {job_id}")]
    Cancelled {
        /// The query job that was being polled
        job_id: String,
    },

    /// An operation was attempted from the wrong session state
    #[error("cannot {operation} while session is {state}")]
    InvalidState {
        /// The operation that was attempted
        operation: &'static str,
        /// The session state at the time
        state: String,
    },

    /// The service answered with a success status but an unexpected body shape
    #[error("unexpected response from {endpoint}: {reason}")]
    InvalidResponse {
        /// Which endpoint produced the response
        endpoint: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Reading the secret from the terminal failed
    #[error("failed to read password: {0}")]
    Prompt(std::io::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error tied to a specific setting
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Whether this error aborts the invocation.
    ///
    /// A failed result download is reported but treated as the natural end of the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::ResultFetch { .. })
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::ResultFetch { .. } => 0,
            Error::Auth { .. } => 2,
            Error::Submission { .. } | Error::Poll { .. } => 3,
            Error::Template { .. } | Error::Config { .. } => 4,
            Error::Io(_) | Error::Prompt(_) => 5,
            Error::Timeout { .. } => 6,
            Error::Cancelled { .. } => 130,
            Error::InvalidState { .. }
            | Error::InvalidResponse { .. }
            | Error::Network(_)
            | Error::Serialization(_) => 1,
        }
    }
}

/// Trim a response body to a short, single-line excerpt for error messages
pub(crate) fn body_excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }
    let mut excerpt: String = trimmed
        .chars()
        .take(MAX_BODY_EXCERPT)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if trimmed.chars().count() > MAX_BODY_EXCERPT {
        excerpt.push('…');
    }
    excerpt
}
