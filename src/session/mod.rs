//! Flow query session: authenticate, submit, poll, and download.
//!
//! A [`FlowQuerySession`] walks one query through its lifecycle:
//!
//! ```text
//! Unauthenticated -> Authenticated -> QuerySubmitted -> Polling -> Completed
//!         \______________\_________________\______________\_____-> Failed
//! ```
//!
//! Every request after authentication reuses the client's cookie store and
//! carries the anti-forgery token taken from the `XSRF-TOKEN` cookie. Calling
//! an operation out of order returns [`Error::InvalidState`] without touching
//! the network.

mod endpoints;


use crate::config::Config;
use crate::credentials::Credentials;
use crate::error::{Error, Result, body_excerpt};
use crate::query::{QueryParameters, QueryRequestOptions, build_query};
use crate::retry::with_retry;
use crate::types::{JobId, QueryEnvelope, QueryJob, QueryOutcome, QueryProgress};
use crate::utils::write_atomic;
use endpoints::Endpoints;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cookie the service sets on successful authentication
pub const CSRF_COOKIE: &str = "XSRF-TOKEN";

/// Header that must echo the cookie value on every later request
pub const CSRF_HEADER: &str = "X-XSRF-TOKEN";

const JSON: &str = "application/json";

// Poll timeouts beyond this behave as "no deadline"
const MAX_POLL_WAIT: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Where a session is in the query lifecycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No successful authentication yet
    Unauthenticated,
    /// Holding a session cookie and CSRF token
    Authenticated,
    /// Query accepted by the service
    QuerySubmitted(JobId),
    /// Waiting for the query to reach 100%
    Polling(JobId),
    /// Query finished server-side; results can be fetched
    Completed(JobId),
    /// A step failed; the session cannot continue
    Failed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Unauthenticated => write!(f, "unauthenticated"),
            SessionState::Authenticated => write!(f, "authenticated"),
            SessionState::QuerySubmitted(id) => write!(f, "query {id} submitted"),
            SessionState::Polling(id) => write!(f, "polling query {id}"),
            SessionState::Completed(id) => write!(f, "query {id} completed"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// One authenticated conversation with the analytics service
pub struct FlowQuerySession {
    http: reqwest::Client,
    config: Config,
    endpoints: Endpoints,
    csrf_token: Option<String>,
    state: SessionState,
}

impl FlowQuerySession {
    /// Create a session from a validated configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        if config.api.accept_invalid_certs {
            tracing::warn!(
                base_url = %config.api.base_url,
                "TLS certificate validation is disabled"
            );
        }

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.api.request_timeout)
            .danger_accept_invalid_certs(config.api.accept_invalid_certs)
            .build()?;

        Ok(Self {
            endpoints: Endpoints::new(&config.api),
            http,
            config,
            csrf_token: None,
            state: SessionState::Unauthenticated,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Run the whole workflow: authenticate, build and submit the query,
    /// wait for it, and save its results to `output`.
    ///
    /// A failed result download is reported as
    /// [`QueryOutcome::ResultsUnavailable`] instead of an error; every other
    /// failure aborts with the corresponding [`Error`].
    pub async fn run(
        &mut self,
        credentials: Credentials,
        options: &QueryRequestOptions,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<QueryOutcome> {
        self.authenticate(credentials).await?;

        let params = build_query(options, chrono::Utc::now());
        let params = self.record(params)?;

        let job = self.submit_query(&params).await?;
        self.wait_for_completion(&job, cancel).await?;

        match self.fetch_results(&job).await {
            Ok(body) => {
                let written = write_atomic(output, &body).map_err(Error::from);
                self.record(written)?;
                tracing::info!(
                    job_id = %job.id,
                    path = %output.display(),
                    bytes = body.len(),
                    "saved query results"
                );
                Ok(QueryOutcome::Saved {
                    job_id: job.id,
                    path: output.to_path_buf(),
                    bytes: body.len(),
                })
            }
            Err(e) if !e.is_fatal() => {
                tracing::warn!(job_id = %job.id, error = %e, "query results unavailable");
                Ok(QueryOutcome::ResultsUnavailable {
                    job_id: job.id,
                    message: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Log in and capture the anti-forgery token
    ///
    /// The credentials are consumed; their secret is zeroed when this returns.
    pub async fn authenticate(&mut self, credentials: Credentials) -> Result<()> {
        self.require("authenticate", |s| *s == SessionState::Unauthenticated)?;
        let result = self.authenticate_inner(credentials).await;
        self.record(result)?;
        self.state = SessionState::Authenticated;
        Ok(())
    }

    async fn authenticate_inner(&mut self, credentials: Credentials) -> Result<()> {
        tracing::info!(username = credentials.username(), "authenticating");

        let response = self
            .http
            .post(self.endpoints.authenticate())
            .form(&[
                ("username", credentials.username()),
                ("password", credentials.password()),
            ])
            .send()
            .await;
        drop(credentials);
        let response = response?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Auth {
                status: Some(status),
                reason: format!("service returned {status}"),
            });
        }

        let token = response
            .cookies()
            .find(|c| c.name() == CSRF_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Auth {
                status: Some(status),
                reason: format!("response did not set the {CSRF_COOKIE} cookie"),
            })?;

        self.csrf_token = Some(token);
        tracing::info!("authenticated");
        Ok(())
    }

    /// Submit a query; the service must answer 201 Created
    pub async fn submit_query(&mut self, params: &QueryParameters) -> Result<QueryJob> {
        self.require("submit a query", |s| *s == SessionState::Authenticated)?;
        let result = self.submit_inner(params).await;
        let job = self.record(result)?;
        self.state = SessionState::QuerySubmitted(job.id.clone());
        Ok(job)
    }

    async fn submit_inner(&self, params: &QueryParameters) -> Result<QueryJob> {
        let body = params.to_json_body()?;
        let response = self
            .http
            .post(self.endpoints.queries())
            .header(CSRF_HEADER, self.csrf_token())
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT, JSON)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status != StatusCode::CREATED {
            return Err(Error::Submission {
                status,
                body: body_excerpt(&text),
            });
        }

        let envelope: QueryEnvelope<QueryJob> =
            serde_json::from_str(&text).map_err(|e| Error::InvalidResponse {
                endpoint: "query submission",
                reason: e.to_string(),
            })?;
        let job = envelope.data.query;
        tracing::info!(
            job_id = %job.id,
            status = job.status.as_deref().unwrap_or("unknown"),
            "query submitted"
        );
        Ok(job)
    }

    /// Poll the query's status until it reports 100%
    ///
    /// Polls once immediately, then every `poll.interval`. Gives up with
    /// [`Error::Timeout`] after `poll.timeout`, or [`Error::Cancelled`] as soon
    /// as `cancel` fires. Transient failures on a single poll are retried.
    pub async fn wait_for_completion(
        &mut self,
        job: &QueryJob,
        cancel: &CancellationToken,
    ) -> Result<QueryProgress> {
        self.require("poll", |s| {
            matches!(s, SessionState::QuerySubmitted(id) if *id == job.id)
        })?;
        self.state = SessionState::Polling(job.id.clone());

        let result = self.poll_until_complete(job, cancel).await;
        let progress = self.record(result)?;
        self.state = SessionState::Completed(job.id.clone());
        Ok(progress)
    }

    async fn poll_until_complete(
        &self,
        job: &QueryJob,
        cancel: &CancellationToken,
    ) -> Result<QueryProgress> {
        let interval = self.config.poll.interval;
        let started = Instant::now();
        let deadline = started + self.config.poll.timeout.min(MAX_POLL_WAIT);
        let mut last_percent = job.percent_complete.unwrap_or(0.0);
        let mut polls: u32 = 0;

        let timed_out = |last_percent: f64| Error::Timeout {
            job_id: job.id.to_string(),
            waited: started.elapsed(),
            last_percent,
        };
        let cancelled = || Error::Cancelled {
            job_id: job.id.to_string(),
        };

        loop {
            let attempt = with_retry(&self.config.retry, || self.fetch_progress(&job.id));
            let progress = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                result = tokio::time::timeout_at(deadline, attempt) => match result {
                    Ok(progress) => progress?,
                    Err(_) => return Err(timed_out(last_percent)),
                },
            };
            polls += 1;

            tracing::info!(
                job_id = %job.id,
                percent = progress.percent_complete,
                polls,
                "query progress"
            );
            if progress.is_complete() {
                return Ok(progress);
            }
            last_percent = progress.percent_complete;

            let wake = Instant::now()
                .checked_add(interval)
                .map_or(deadline, |at| at.min(deadline));
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                _ = tokio::time::sleep_until(wake) => {}
            }
            if Instant::now() >= deadline {
                return Err(timed_out(last_percent));
            }
        }
    }

    async fn fetch_progress(&self, job_id: &JobId) -> Result<QueryProgress> {
        let response = self
            .http
            .get(self.endpoints.query(job_id))
            .header(CSRF_HEADER, self.csrf_token())
            .header(ACCEPT, JSON)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if status != StatusCode::OK {
            return Err(Error::Poll {
                job_id: job_id.to_string(),
                status,
                body: body_excerpt(&text),
            });
        }

        let envelope: QueryEnvelope<QueryProgress> =
            serde_json::from_str(&text).map_err(|e| Error::InvalidResponse {
                endpoint: "query status",
                reason: e.to_string(),
            })?;
        Ok(envelope.data.query)
    }

    /// Download the raw result payload of a completed query
    pub async fn fetch_results(&mut self, job: &QueryJob) -> Result<Vec<u8>> {
        self.require("fetch results", |s| {
            matches!(s, SessionState::Completed(id) if *id == job.id)
        })?;
        let result = self.fetch_results_inner(&job.id).await;
        self.record(result)
    }

    async fn fetch_results_inner(&self, job_id: &JobId) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(self.endpoints.results(job_id))
            .header(CSRF_HEADER, self.csrf_token())
            .header(ACCEPT, JSON)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::ResultFetch {
                job_id: job_id.to_string(),
                status,
                body: body_excerpt(&text),
            });
        }

        let body = response.bytes().await?;
        tracing::debug!(job_id = %job_id, bytes = body.len(), "downloaded query results");
        Ok(body.to_vec())
    }

    fn csrf_token(&self) -> &str {
        self.csrf_token.as_deref().unwrap_or_default()
    }

    fn require(
        &self,
        operation: &'static str,
        allowed: impl Fn(&SessionState) -> bool,
    ) -> Result<()> {
        if allowed(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    /// Move to `Failed` when `result` is an error
    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            tracing::debug!(state = %self.state, error = %e, "session failed");
            self.state = SessionState::Failed;
        }
        result
    }
}
