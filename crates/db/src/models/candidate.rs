//! Media candidate entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storyreel_core::candidate::{CandidateStatus, MediaCandidate, MediaKind};
use storyreel_core::error::CoreError;
use storyreel_core::types::{DbId, TaskHandle, Timestamp};

/// A row from the `media_candidates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MediaCandidateRow {
    pub id: DbId,
    pub segment_id: DbId,
    pub kind: String,
    pub url: Option<String>,
    pub status: String,
    pub is_selected: bool,
    pub task_handle: Option<String>,
    pub metadata: serde_json::Value,
    pub poll_attempts: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<MediaCandidateRow> for MediaCandidate {
    type Error = CoreError;

    fn try_from(row: MediaCandidateRow) -> Result<Self, Self::Error> {
        Ok(MediaCandidate {
            id: row.id,
            segment_id: row.segment_id,
            kind: row.kind.parse()?,
            url: row.url,
            status: row.status.parse()?,
            is_selected: row.is_selected,
            task_handle: row.task_handle,
            metadata: row.metadata,
            poll_attempts: row.poll_attempts,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// DTO for inserting a new candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMediaCandidate {
    pub segment_id: DbId,
    pub kind: MediaKind,
    pub url: Option<String>,
    pub status: CandidateStatus,
    pub is_selected: bool,
    pub task_handle: Option<TaskHandle>,
    pub metadata: serde_json::Value,
}
