//! Persistence seam for the workflow.
//!
//! [`WorkflowStore`] is implemented for Postgres ([`postgres::PgStore`])
//! and in memory ([`memory::MemoryStore`]). Implementations must apply
//! every multi-row mutation atomically: approval batches are
//! compare-and-set on each field's prior value, and candidate insertion
//! and selection leave at most one selected candidate per segment and kind.

use async_trait::async_trait;
use serde::Serialize;
use storyreel_core::audit::StatusChangeEvent;
use storyreel_core::candidate::{CandidateStatus, MediaCandidate, MediaKind};
use storyreel_core::segment::{FieldChange, SegmentState};
use storyreel_core::stage::{ProjectStatus, StageSummary, WorkflowStage};
use storyreel_core::task::CandidateUpdate;
use storyreel_core::types::{DbId, TaskHandle, Timestamp};

use crate::error::StoreError;

pub mod memory;
pub mod postgres;

/// A stored project with its cached stage and status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectRecord {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub current_stage: WorkflowStage,
    pub status: ProjectStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSegment {
    pub order: i32,
    pub script: String,
    pub video_prompt: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub segment_id: DbId,
    pub kind: MediaKind,
    pub url: Option<String>,
    pub status: CandidateStatus,
    pub is_selected: bool,
    pub task_handle: Option<TaskHandle>,
    pub metadata: serde_json::Value,
}

#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn create_project(&self, input: &NewProject) -> Result<ProjectRecord, StoreError>;

    /// Most recently created first.
    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, StoreError>;

    async fn find_project(&self, id: DbId) -> Result<Option<ProjectRecord>, StoreError>;

    /// Delete a project with its segments, candidates and history.
    async fn delete_project(&self, id: DbId) -> Result<bool, StoreError>;

    /// Write the derived stage/status cache when it differs from the stored
    /// value. Returns `true` if a write happened.
    async fn update_project_cache(
        &self,
        id: DbId,
        summary: StageSummary,
    ) -> Result<bool, StoreError>;

    /// Segments in playback order, with their candidates.
    async fn list_segments(&self, project_id: DbId) -> Result<Vec<SegmentState>, StoreError>;

    async fn find_segment(&self, id: DbId) -> Result<Option<SegmentState>, StoreError>;

    /// Replace every segment of a project. Returns `None` if the project
    /// does not exist.
    async fn replace_segments(
        &self,
        project_id: DbId,
        segments: &[NewSegment],
    ) -> Result<Option<Vec<SegmentState>>, StoreError>;

    /// Apply validated changes as one atomic compare-and-set batch and
    /// append one audit event per change.
    ///
    /// Fails with `CoreError::Conflict` if any field no longer holds its
    /// expected prior value and `CoreError::NotFound` for a missing
    /// segment; nothing is written in either case.
    async fn apply_status_changes(
        &self,
        changes: &[FieldChange],
        reason: Option<&str>,
    ) -> Result<Vec<StatusChangeEvent>, StoreError>;

    /// Insert a candidate, demoting selected siblings when it arrives
    /// selected.
    async fn insert_candidate(&self, input: &NewCandidate) -> Result<MediaCandidate, StoreError>;

    /// Make `candidate_id` the only selected candidate of its segment and
    /// kind.
    async fn select_candidate(
        &self,
        segment_id: DbId,
        kind: MediaKind,
        candidate_id: DbId,
    ) -> Result<MediaCandidate, StoreError>;

    async fn find_candidate(&self, id: DbId) -> Result<Option<MediaCandidate>, StoreError>;

    async fn find_candidate_by_task(
        &self,
        task_handle: &str,
    ) -> Result<Option<MediaCandidate>, StoreError>;

    /// Video candidates with a task handle that are not yet terminal.
    async fn list_in_flight_videos(&self) -> Result<Vec<MediaCandidate>, StoreError>;

    /// Compare-and-set a reconciled candidate state. Returns `None` when
    /// the stored status no longer equals `expected`.
    async fn update_candidate_if(
        &self,
        id: DbId,
        expected: CandidateStatus,
        update: &CandidateUpdate,
    ) -> Result<Option<MediaCandidate>, StoreError>;

    /// Count one upstream poll; returns the new count.
    async fn record_poll_attempt(&self, id: DbId) -> Result<Option<i32>, StoreError>;

    /// History of one segment, oldest first.
    async fn list_status_changes(
        &self,
        segment_id: DbId,
    ) -> Result<Vec<StatusChangeEvent>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
