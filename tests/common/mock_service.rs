//! Mock analytics service built on wiremock

use flowq::Config;
use flowq::config::{ApiConfig, PollConfig, RetryConfig};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Tenant used by every mock
pub const TENANT: &str = "301";

/// Token the mock service issues
pub const XSRF: &str = "mock-xsrf-token";

/// Query submission path for [`TENANT`]
pub fn queries_path() -> String {
    format!("/sw-reporting/v2/tenants/{TENANT}/flows/queries")
}

/// Status path for a query id
pub fn status_path(id: &str) -> String {
    format!("{}/{}", queries_path(), id)
}

/// Results path for a query id
pub fn results_path(id: &str) -> String {
    format!("{}/{}/results", queries_path(), id)
}

/// Config pointed at `server` with fast polling
pub fn config_for(server: &MockServer) -> Config {
    Config {
        api: ApiConfig {
            base_url: server.uri(),
            tenant: TENANT.to_string(),
            ..Default::default()
        },
        poll: PollConfig {
            interval: Duration::from_millis(10),
            timeout: Duration::from_secs(5),
        },
        retry: RetryConfig {
            max_attempts: 1,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 1.0,
            jitter: false,
        },
    }
}

/// Authentication succeeds and sets the XSRF cookie
pub async fn mount_auth(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token/v2/authenticate"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("XSRF-TOKEN={XSRF}; Path=/").as_str()),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Authentication fails with `status`
pub async fn mount_auth_failure(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/token/v2/authenticate"))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(server)
        .await;
}

/// Submission returns 201 with `id`; expects exactly `times` submissions
pub async fn mount_submit(server: &MockServer, id: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path(queries_path()))
        .and(header("X-XSRF-TOKEN", XSRF))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"data": {"query": {"id": id, "status": "PENDING"}}})),
        )
        .expect(times)
        .mount(server)
        .await;
}

/// Status polls return `percents` in order, each exactly once
pub async fn mount_progress_sequence(server: &MockServer, id: &str, percents: &[u32]) {
    for (i, percent) in percents.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path(status_path(id)))
            .and(header("X-XSRF-TOKEN", XSRF))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"data": {"query": {"percentComplete": percent}}}),
            ))
            .up_to_n_times(1)
            .with_priority(u8::try_from(i + 1).unwrap_or(u8::MAX))
            .expect(1)
            .mount(server)
            .await;
    }
}

/// Results endpoint answers `status` with `body`
pub async fn mount_results(server: &MockServer, id: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(results_path(id)))
        .and(header("X-XSRF-TOKEN", XSRF))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}
