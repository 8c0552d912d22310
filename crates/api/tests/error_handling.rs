//! Tests for `AppError` → HTTP response mapping, directly and through the
//! router.

mod common;

use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use common::call;
use http_body_util::BodyExt;
use serde_json::json;
use storyreel_api::error::AppError;
use storyreel_core::approval::ApprovalStatus;
use storyreel_core::error::CoreError;
use storyreel_core::segment::ApprovalField;
use storyreel_pipeline::WorkflowError;
use storyreel_providers::ProviderError;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let (status, json) = error_to_response(AppError::Core(CoreError::NotFound {
        entity: "Project",
        id: 42,
    }))
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Project with id 42 not found");
}

#[tokio::test]
async fn invalid_transition_returns_409_naming_the_field() {
    let (status, json) = error_to_response(AppError::Core(CoreError::InvalidTransition {
        field: ApprovalField::Audio,
        from: ApprovalStatus::Draft,
        to: ApprovalStatus::Approved,
    }))
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "INVALID_TRANSITION");
    assert_eq!(json["error"], "Cannot move audio from draft to approved");
}

#[tokio::test]
async fn precondition_returns_422() {
    let (status, json) =
        error_to_response(AppError::Core(CoreError::Precondition("no video".into()))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "PRECONDITION_FAILED");
}

#[tokio::test]
async fn concurrency_conflict_returns_409() {
    let (status, json) =
        error_to_response(AppError::Core(CoreError::Conflict("stale value".into()))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
    assert_eq!(json["error"], "stale value");
}

#[tokio::test]
async fn upstream_failure_returns_502() {
    let err: AppError = WorkflowError::Upstream(ProviderError::Api {
        status: 503,
        body: "overloaded".into(),
    })
    .into();
    let (status, json) = error_to_response(err).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn internal_error_is_sanitized() {
    let (status, json) =
        error_to_response(AppError::InternalError("connection string leaked".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

#[tokio::test]
async fn unknown_stage_is_a_validation_error() {
    let app = common::build_test_app();
    let (status, json) = call(&app, Method::POST, "/api/v1/segments/1/stages/audio/approve", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn unknown_task_returns_404() {
    let app = common::build_test_app();
    let (status, json) = call(&app, Method::GET, "/api/v1/tasks/not-a-task", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "UNKNOWN_TASK");
}

#[tokio::test]
async fn empty_project_name_is_a_bad_request() {
    let app = common::build_test_app();
    let (status, json) = call(&app, Method::POST, "/api/v1/projects", Some(json!({ "name": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let app = common::build_test_app();
    let (status, json) = call(
        &app,
        Method::POST,
        "/api/v1/segments/1/transition",
        Some(json!({ "fields": ["script"], "to": "finished" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn approving_empty_project_fails_precondition() {
    let app = common::build_test_app();
    let (_, created) = call(&app, Method::POST, "/api/v1/projects", Some(json!({ "name": "Empty" }))).await;
    let id = created["data"]["id"].as_i64().unwrap();

    let (status, json) = call(&app, Method::POST, &format!("/api/v1/projects/{id}/stages/script/approve"), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "PRECONDITION_FAILED");
}
