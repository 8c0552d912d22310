//! Handlers for segment approvals and history.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use storyreel_core::approval::ApprovalStatus;
use storyreel_core::segment::ApprovalField;
use storyreel_core::stage::ReviewStage;
use storyreel_core::types::DbId;
use validator::Validate;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RejectRequest {
    #[validate(length(max = 2000))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransitionRequest {
    #[validate(length(min = 1, max = 5))]
    pub fields: Vec<ApprovalField>,
    pub to: ApprovalStatus,
    #[validate(length(max = 2000))]
    pub reason: Option<String>,
}

/// GET /api/v1/segments/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let segment = state.controller.get_segment(id).await?;
    Ok(Json(DataResponse { data: segment }))
}

/// POST /api/v1/segments/{id}/stages/{stage}/approve
///
/// Approves every field of the stage; the script stage covers both script
/// and audio.
pub async fn approve(
    State(state): State<AppState>,
    Path((id, stage)): Path<(DbId, String)>,
) -> AppResult<impl IntoResponse> {
    let stage: ReviewStage = stage.parse()?;
    let outcome = state.controller.approve(id, stage).await?;

    tracing::info!(segment_id = id, stage = stage.as_str(), "Segment stage approved");
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/segments/{id}/stages/{stage}/reject
pub async fn reject(
    State(state): State<AppState>,
    Path((id, stage)): Path<(DbId, String)>,
    payload: Result<Json<RejectRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let stage: ReviewStage = stage.parse()?;
    let Json(input) = payload?;
    input.validate()?;

    let outcome = state
        .controller
        .reject(id, stage, input.reason.as_deref())
        .await?;

    tracing::info!(
        segment_id = id,
        stage = stage.as_str(),
        reason = ?input.reason,
        "Segment stage rejected",
    );
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/segments/{id}/transition
///
/// Generic batch transition (submit, start processing, withdraw, reopen).
pub async fn transition(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    payload: Result<Json<TransitionRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    input.validate()?;

    let outcome = state
        .controller
        .transition(id, &input.fields, input.to, input.reason.as_deref())
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// GET /api/v1/segments/{id}/history
pub async fn history(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let events = state.controller.history(id).await?;
    Ok(Json(DataResponse { data: events }))
}
