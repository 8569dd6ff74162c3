//! Integration tests for `GET /status/{id}`.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get};
use posegen_core::job::{JobRecord, JobStatus};

// ---------------------------------------------------------------------------
// Test: a tracked job returns its status and outputs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn starting_job_returns_200_with_empty_outputs() {
    let test = build_test_app();
    test.store()
        .put("abc123", JobRecord::starting("abc123", None))
        .await
        .unwrap();

    let response = get(test.app(), "/status/abc123").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "starting");
    assert_eq!(json["outputs"], serde_json::json!([]));
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn succeeded_job_returns_outputs() {
    let test = build_test_app();
    let mut record = JobRecord::starting("abc123", None);
    record.overwrite(
        JobStatus::Succeeded,
        vec!["https://x/pose.png".into(), "https://x/out.png".into()],
        None,
    );
    test.store().put("abc123", record).await.unwrap();

    let response = get(test.app(), "/status/abc123").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "succeeded");
    assert_eq!(
        json["outputs"],
        serde_json::json!(["https://x/pose.png", "https://x/out.png"])
    );
}

#[tokio::test]
async fn failed_job_returns_error_message() {
    let test = build_test_app();
    let mut record = JobRecord::starting("abc123", None);
    record.overwrite(JobStatus::Failed, Vec::new(), Some("CUDA out of memory".into()));
    test.store().put("abc123", record).await.unwrap();

    let json = body_json(get(test.app(), "/status/abc123").await).await;

    assert_eq!(json["status"], "failed");
    assert_eq!(json["error"], "CUDA out of memory");
}

// ---------------------------------------------------------------------------
// Test: an unknown id is a 404 that does not echo the id
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_id_returns_404() {
    let test = build_test_app();

    let response = get(test.app(), "/status/unknown-xyz").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Prediction ID not found");
    assert_eq!(json["code"], "NOT_FOUND");
    assert!(!json.to_string().contains("unknown-xyz"));
}

#[tokio::test]
async fn status_is_read_only() {
    let test = build_test_app();
    test.store()
        .put("abc123", JobRecord::starting("abc123", None))
        .await
        .unwrap();
    let before = test.store().get("abc123").await.unwrap();

    get(test.app(), "/status/abc123").await;
    get(test.app(), "/status/missing").await;

    assert_eq!(test.store().get("abc123").await.unwrap(), before);
    assert_eq!(test.store().len().await, 1);
}
