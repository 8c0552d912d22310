//! Handlers for synchronous media generation and candidate selection.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use storyreel_core::candidate::MediaKind;
use storyreel_core::types::DbId;
use storyreel_pipeline::controller::{AudioParams, ImageParams};
use validator::Validate;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct GenerateImageRequest {
    #[validate(length(min = 1, max = 4000))]
    pub prompt: Option<String>,
    pub aspect_ratio: Option<String>,
    pub model: Option<String>,
    pub safety_filter_level: Option<String>,
    pub person_generation: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct GenerateAudioRequest {
    #[validate(length(min = 1, max = 100))]
    pub voice: Option<String>,
    pub model: Option<String>,
}

/// POST /api/v1/segments/{id}/images
pub async fn generate_image(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    payload: Result<Json<GenerateImageRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    input.validate()?;

    let candidate = state
        .controller
        .generate_image(
            id,
            ImageParams {
                prompt: input.prompt,
                aspect_ratio: input.aspect_ratio,
                model: input.model,
                safety_filter_level: input.safety_filter_level,
                person_generation: input.person_generation,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: candidate })))
}

/// POST /api/v1/segments/{id}/audios
pub async fn generate_audio(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    payload: Result<Json<GenerateAudioRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(input) = payload?;
    input.validate()?;

    let candidate = state
        .controller
        .generate_audio(
            id,
            AudioParams {
                voice: input.voice,
                model: input.model,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: candidate })))
}

/// PUT /api/v1/segments/{id}/candidates/{kind}/{candidate_id}/select
pub async fn select(
    State(state): State<AppState>,
    Path((id, kind, candidate_id)): Path<(DbId, String, DbId)>,
) -> AppResult<impl IntoResponse> {
    let kind: MediaKind = kind.parse()?;
    let candidate = state
        .controller
        .select_candidate(id, kind, candidate_id)
        .await?;
    Ok(Json(DataResponse { data: candidate }))
}
