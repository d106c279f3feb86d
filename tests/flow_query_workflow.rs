//! End-to-end workflow tests against a mock analytics service
//!
//! Each test drives [`FlowQuerySession::run`] through the public API, the same
//! path the `flowq` binary takes.

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use flowq::{
    Credentials, Error, FlowQuerySession, JobId, QueryOutcome, QueryRequestOptions, SessionState,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

fn admin() -> Credentials {
    Credentials::new("admin", "hunter2")
}

fn submitted_body(requests: &[wiremock::Request]) -> Value {
    let submission = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == queries_path())
        .expect("query was submitted");
    serde_json::from_slice(&submission.body).unwrap()
}

#[tokio::test]
async fn test_full_run_saves_results_after_three_polls() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_submit(&server, "q-100", 1).await;
    mount_progress_sequence(&server, "q-100", &[10, 55, 100]).await;
    mount_results(&server, "q-100", 200, RAW_RESULTS).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("flows.json");
    let mut session = FlowQuerySession::new(config_for(&server)).unwrap();

    let outcome = session
        .run(
            admin(),
            &QueryRequestOptions::default(),
            &output,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    match outcome {
        QueryOutcome::Saved {
            job_id,
            path,
            bytes,
        } => {
            assert_eq!(job_id.as_str(), "q-100");
            assert_eq!(path, output);
            assert_eq!(bytes, RAW_RESULTS.len());
        }
        other => panic!("expected Saved, got {other:?}"),
    }
    assert_eq!(std::fs::read_to_string(&output).unwrap(), RAW_RESULTS);
    assert_eq!(*session.state(), SessionState::Completed(JobId::new("q-100")));

    let body = submitted_body(&server.received_requests().await.unwrap());
    assert_eq!(body["recordLimit"], 2000);
    assert!(body.get("subject").is_none());
    // polls are verified by each mock's expect(1) on drop
}

#[tokio::test]
async fn test_auth_failure_never_submits() {
    let server = MockServer::start().await;
    mount_auth_failure(&server, 401).await;
    mount_submit(&server, "never", 0).await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("flows.json");
    let mut session = FlowQuerySession::new(config_for(&server)).unwrap();

    let err = session
        .run(
            admin(),
            &QueryRequestOptions::default(),
            &output,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Auth { .. }), "got {err:?}");
    assert_eq!(err.exit_code(), 2);
    assert!(!err.to_string().contains("hunter2"));
    assert_eq!(*session.state(), SessionState::Failed);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_unavailable_results_are_not_fatal() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_submit(&server, "q-7", 1).await;
    mount_progress_sequence(&server, "q-7", &[100]).await;
    mount_results(&server, "q-7", 500, "{\"error\":\"results expired\"}").await;

    let dir = TempDir::new().unwrap();
    let output = dir.path().join("flows.json");
    let mut session = FlowQuerySession::new(config_for(&server)).unwrap();

    let outcome = session
        .run(
            admin(),
            &QueryRequestOptions::default(),
            &output,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    match outcome {
        QueryOutcome::ResultsUnavailable { job_id, message } => {
            assert_eq!(job_id.as_str(), "q-7");
            assert!(message.contains("500"), "message: {message}");
        }
        other => panic!("expected ResultsUnavailable, got {other:?}"),
    }
    assert!(!output.exists());
}

#[tokio::test]
async fn test_saved_template_drives_next_run() {
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("flow_query.json");
    std::fs::write(&template, nested_template().to_string()).unwrap();

    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_submit(&server, "q-tpl", 1).await;
    mount_progress_sequence(&server, "q-tpl", &[100]).await;
    mount_results(&server, "q-tpl", 200, RAW_RESULTS).await;

    let resaved = dir.path().join("resaved.json");
    let options = QueryRequestOptions {
        record_limit: 50,
        hours: 2,
        load: Some(template.clone()),
        save: Some(resaved.clone()),
        peer: Some(json!({"ipAddresses": {"includes": ["198.51.100.1"]}})),
        ..Default::default()
    };

    let mut session = FlowQuerySession::new(config_for(&server)).unwrap();
    session
        .run(
            admin(),
            &options,
            &dir.path().join("flows.json"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let sent = submitted_body(&server.received_requests().await.unwrap());
    let original = nested_template();

    // template filters survive unless overridden
    assert_eq!(sent["subject"], original["subject"]);
    assert_eq!(sent["flow"], original["flow"]);
    assert_eq!(sent["peer"]["ipAddresses"]["includes"][0], "198.51.100.1");

    // window and limit always come from this run
    assert_eq!(sent["recordLimit"], 50);
    assert_ne!(sent["startDateTime"], original["startDateTime"]);
    assert_ne!(sent["endDateTime"], original["endDateTime"]);

    // the saved template is exactly what was submitted
    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&resaved).unwrap()).unwrap();
    assert_eq!(saved, sent);
}

#[tokio::test]
async fn test_missing_template_fails_before_submission() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_submit(&server, "never", 0).await;

    let dir = TempDir::new().unwrap();
    let options = QueryRequestOptions {
        load: Some(dir.path().join("does-not-exist.json")),
        ..Default::default()
    };

    let mut session = FlowQuerySession::new(config_for(&server)).unwrap();
    let err = session
        .run(
            admin(),
            &options,
            &dir.path().join("flows.json"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Template { .. }), "got {err:?}");
    assert_eq!(err.exit_code(), 4);
    assert_eq!(*session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_cancelled_run_reports_cancellation() {
    let server = MockServer::start().await;
    mount_auth(&server).await;
    mount_submit(&server, "q-c", 1).await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let dir = TempDir::new().unwrap();
    let mut session = FlowQuerySession::new(config_for(&server)).unwrap();
    let err = session
        .run(
            admin(),
            &QueryRequestOptions::default(),
            &dir.path().join("flows.json"),
            &cancel,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled { .. }), "got {err:?}");
    assert_eq!(err.exit_code(), 130);
}
