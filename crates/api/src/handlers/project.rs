//! Handlers for the `/projects` resource.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use storyreel_core::stage::ReviewStage;
use storyreel_core::types::DbId;
use storyreel_pipeline::controller::RegenerateParams;
use storyreel_pipeline::store::NewProject;
use validator::Validate;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RegenerateRequest {
    #[serde(default)]
    pub confirm: bool,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    #[validate(length(max = 10000))]
    pub system_instruction: Option<String>,
}

/// POST /api/v1/projects
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    input.validate()?;

    let project = state
        .controller
        .create_project(NewProject {
            name: input.name,
            description: input.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/projects
pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let projects = state.controller.list_projects().await?;
    Ok(Json(DataResponse { data: projects }))
}

/// GET /api/v1/projects/{id}
///
/// Stage and status are recomputed from the segments on every read.
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let view = state.controller.get_project(id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// DELETE /api/v1/projects/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.controller.delete_project(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/projects/{id}/segments/regenerate
///
/// Destructive: replaces every segment. Requires `{ "confirm": true }`.
pub async fn regenerate_segments(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    payload: Result<Json<RegenerateRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    input.validate()?;

    let view = state
        .controller
        .regenerate_all(
            id,
            RegenerateParams {
                confirm: input.confirm,
                description: input.description,
                system_instruction: input.system_instruction,
            },
        )
        .await?;

    tracing::info!(project_id = id, segments = view.segments.len(), "Segments regenerated via API");
    Ok(Json(DataResponse { data: view }))
}

/// POST /api/v1/projects/{id}/stages/{stage}/approve
pub async fn approve_stage(
    State(state): State<AppState>,
    Path((id, stage)): Path<(DbId, String)>,
) -> AppResult<impl IntoResponse> {
    let stage: ReviewStage = stage.parse()?;
    let view = state.controller.approve_stage_for_project(id, stage).await?;
    Ok(Json(DataResponse { data: view }))
}
