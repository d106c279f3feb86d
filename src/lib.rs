//! # flowq
//!
//! Client for the asynchronous flow query API of a network telemetry
//! analytics service.
//!
//! A run authenticates with a username and password, takes the anti-forgery
//! token from the `XSRF-TOKEN` session cookie, submits a flow query (built
//! from scratch or from a saved template), polls until the service reports the
//! query 100% complete, and writes the raw result payload to a file. Result
//! records are never parsed or transformed.
//!
//! ## Quick Start
//!
//! ```no_run
//! use flowq::{Config, Credentials, FlowQuerySession, QueryRequestOptions};
//! use flowq::config::ApiConfig;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         api: ApiConfig {
//!             base_url: "https://sna.example.com".to_string(),
//!             tenant: "301".to_string(),
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     };
//!
//!     let credentials = Credentials::prompt("admin")?;
//!     let options = QueryRequestOptions {
//!         record_limit: 500,
//!         hours: 4,
//!         ..Default::default()
//!     };
//!
//!     let mut session = FlowQuerySession::new(config)?;
//!     let cancel = CancellationToken::new();
//!     let outcome = session
//!         .run(credentials, &options, "flows.json".as_ref(), &cancel)
//!         .await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Command line interface
pub mod cli;
/// Configuration types
pub mod config;
/// Operator credentials
pub mod credentials;
/// Error types
pub mod error;
/// Flow query request construction
pub mod query;
/// Retry logic with exponential backoff
pub mod retry;
/// Query session state machine and HTTP workflow
pub mod session;
/// Logging setup
pub mod telemetry;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use query::{QueryParameters, QueryRequestOptions, build_query};
pub use session::{FlowQuerySession, SessionState};
pub use types::{JobId, QueryJob, QueryOutcome, QueryProgress};

use tokio_util::sync::CancellationToken;

/// Cancel `token` on the first SIGINT or SIGTERM (Ctrl+C elsewhere).
///
/// Must be called from within a tokio runtime.
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        if let Some(signal) = termination_signal().await {
            tracing::info!(signal, "stopping query");
            token.cancel();
        }
    });
}

// None when no handler could be installed; the run then ends only on its own.
#[cfg(unix)]
async fn termination_signal() -> Option<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "could not register SIGTERM handler");
            return tokio::signal::ctrl_c().await.ok().map(|()| "SIGINT");
        }
    };
    tokio::select! {
        _ = sigterm.recv() => Some("SIGTERM"),
        res = tokio::signal::ctrl_c() => match res {
            Ok(()) => Some("SIGINT"),
            Err(e) => {
                tracing::warn!(error = %e, "could not register SIGINT handler");
                sigterm.recv().await.map(|()| "SIGTERM")
            }
        },
    }
}

#[cfg(not(unix))]
async fn termination_signal() -> Option<&'static str> {
    match tokio::signal::ctrl_c().await {
        Ok(()) => Some("Ctrl+C"),
        Err(e) => {
            tracing::warn!(error = %e, "could not listen for Ctrl+C");
            None
        }
    }
}
