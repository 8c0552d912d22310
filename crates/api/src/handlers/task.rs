//! Handlers for asynchronous video tasks: submit, poll, cancel.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use storyreel_core::types::DbId;
use storyreel_pipeline::tracker::{VideoParams, DEFAULT_DURATION_SECS};
use storyreel_providers::VideoMode;
use validator::Validate;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitVideoRequest {
    pub image_url: Option<String>,
    #[validate(length(min = 1, max = 4000))]
    pub prompt: Option<String>,
    #[serde(default = "default_duration")]
    #[validate(range(min = 1, max = 60))]
    pub duration_secs: u32,
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub mode: VideoMode,
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_SECS
}

/// POST /api/v1/segments/{id}/videos
///
/// Returns as soon as the task is accepted; poll `/tasks/{task_handle}`.
pub async fn submit_video(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    payload: Result<Json<SubmitVideoRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    input.validate()?;

    let candidate = state
        .tracker
        .submit(
            id,
            VideoParams {
                image_url: input.image_url,
                prompt: input.prompt,
                duration_secs: input.duration_secs,
                negative_prompt: input.negative_prompt,
                mode: input.mode,
            },
        )
        .await?;

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: candidate })))
}

/// GET /api/v1/tasks/{task_handle}
pub async fn poll(
    State(state): State<AppState>,
    Path(task_handle): Path<String>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.tracker.poll(&task_handle).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/candidates/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let candidate = state.tracker.cancel(id).await?;
    Ok(Json(DataResponse { data: candidate }))
}
