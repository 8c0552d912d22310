#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use storyreel_core::task::PollPolicy;
use storyreel_pipeline::{MemoryStore, TaskTracker, WorkflowController};
use storyreel_providers::simulated::SimulatedProvider;
use storyreel_providers::Providers;
use tower::ServiceExt;

use storyreel_api::config::ServerConfig;
use storyreel_api::router::build_app_router;
use storyreel_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        json_logs: false,
    }
}

/// Build the full application router over an in-memory store and the
/// simulated AI services. Simulated video tasks complete on the third poll.
pub fn build_test_app() -> Router {
    let store = Arc::new(MemoryStore::new());
    let sim = Arc::new(SimulatedProvider::new(2));
    let providers = Providers {
        script: sim.clone(),
        speech: sim.clone(),
        image: sim.clone(),
        video: sim,
    };
    let policy = PollPolicy {
        interval: Duration::from_millis(10),
        max_attempts: Some(20),
        max_duration: None,
    };

    let tracker = Arc::new(TaskTracker::new(store.clone(), providers.video.clone(), policy));
    let controller = Arc::new(WorkflowController::new(store, providers));
    let config = test_config();
    let state = AppState {
        controller,
        tracker,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Send a request and return its status with the parsed JSON body.
pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let response = send(app, method, uri, body).await;
    let status = response.status();
    (status, body_json(response).await)
}

/// Create a project and generate its segments; returns the project id and
/// segment ids in playback order.
pub async fn project_with_segments(app: &Router, description: &str) -> (i64, Vec<i64>) {
    let (status, created) = call(
        app,
        Method::POST,
        "/api/v1/projects",
        Some(serde_json::json!({ "name": "Harbor lights", "description": description })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let project_id = created["data"]["id"].as_i64().unwrap();

    let (status, view) = call(
        app,
        Method::POST,
        &format!("/api/v1/projects/{project_id}/segments/regenerate"),
        Some(serde_json::json!({ "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let segment_ids = view["data"]["segments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_i64().unwrap())
        .collect();
    (project_id, segment_ids)
}
