//! Postgres-backed [`WorkflowStore`] over the `storyreel-db` repositories.

use async_trait::async_trait;
use sqlx::PgPool;
use storyreel_core::audit::StatusChangeEvent;
use storyreel_core::candidate::{CandidateStatus, MediaCandidate, MediaKind};
use storyreel_core::error::CoreError;
use storyreel_core::segment::{FieldChange, SegmentState};
use storyreel_core::stage::StageSummary;
use storyreel_core::task::CandidateUpdate;
use storyreel_core::types::DbId;
use storyreel_db::models::candidate::{CreateMediaCandidate, MediaCandidateRow};
use storyreel_db::models::project::{CreateProject, Project};
use storyreel_db::models::segment::{CreateSegment, Segment};
use storyreel_db::repositories::{
    ApplyOutcome, CandidateRepo, ProjectRepo, SegmentRepo, SelectOutcome, StatusChangeRepo,
};

use super::{NewCandidate, NewProject, NewSegment, ProjectRecord, WorkflowStore};
use crate::error::StoreError;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_segments(&self, rows: Vec<Segment>) -> Result<Vec<SegmentState>, StoreError> {
        let ids: Vec<DbId> = rows.iter().map(|s| s.id).collect();
        let candidates = CandidateRepo::list_by_segments(&self.pool, &ids)
            .await?
            .into_iter()
            .map(to_candidate)
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|row| {
                let own: Vec<MediaCandidate> = candidates
                    .iter()
                    .filter(|c| c.segment_id == row.id)
                    .cloned()
                    .collect();
                row.into_state(own).map_err(corrupt)
            })
            .collect()
    }
}

/// A stored value that fails to parse is an internal fault, not bad input.
fn corrupt(err: CoreError) -> StoreError {
    StoreError::Domain(CoreError::Internal(format!("Corrupt row: {err}")))
}

fn to_candidate(row: MediaCandidateRow) -> Result<MediaCandidate, StoreError> {
    MediaCandidate::try_from(row).map_err(corrupt)
}

fn to_project(row: Project) -> Result<ProjectRecord, StoreError> {
    Ok(ProjectRecord {
        current_stage: row.cached_stage().map_err(corrupt)?,
        status: row.cached_status().map_err(corrupt)?,
        id: row.id,
        name: row.name,
        description: row.description,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl WorkflowStore for PgStore {
    async fn create_project(&self, input: &NewProject) -> Result<ProjectRecord, StoreError> {
        let row = ProjectRepo::create(
            &self.pool,
            &CreateProject {
                name: input.name.clone(),
                description: input.description.clone(),
            },
        )
        .await?;
        to_project(row)
    }

    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, StoreError> {
        ProjectRepo::list(&self.pool)
            .await?
            .into_iter()
            .map(to_project)
            .collect()
    }

    async fn find_project(&self, id: DbId) -> Result<Option<ProjectRecord>, StoreError> {
        ProjectRepo::find_by_id(&self.pool, id)
            .await?
            .map(to_project)
            .transpose()
    }

    async fn delete_project(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(ProjectRepo::delete(&self.pool, id).await?)
    }

    async fn update_project_cache(
        &self,
        id: DbId,
        summary: StageSummary,
    ) -> Result<bool, StoreError> {
        Ok(ProjectRepo::update_cache(&self.pool, id, summary.current_stage, summary.status).await?)
    }

    async fn list_segments(&self, project_id: DbId) -> Result<Vec<SegmentState>, StoreError> {
        let rows = SegmentRepo::list_by_project(&self.pool, project_id).await?;
        self.load_segments(rows).await
    }

    async fn find_segment(&self, id: DbId) -> Result<Option<SegmentState>, StoreError> {
        let Some(row) = SegmentRepo::find_by_id(&self.pool, id).await? else {
            return Ok(None);
        };
        Ok(self.load_segments(vec![row]).await?.pop())
    }

    async fn replace_segments(
        &self,
        project_id: DbId,
        segments: &[NewSegment],
    ) -> Result<Option<Vec<SegmentState>>, StoreError> {
        let inputs: Vec<CreateSegment> = segments
            .iter()
            .map(|s| CreateSegment {
                order_index: s.order,
                script: s.script.clone(),
                video_prompt: s.video_prompt.clone(),
            })
            .collect();
        match SegmentRepo::replace_for_project(&self.pool, project_id, &inputs).await? {
            Some(rows) => Ok(Some(self.load_segments(rows).await?)),
            None => Ok(None),
        }
    }

    async fn apply_status_changes(
        &self,
        changes: &[FieldChange],
        reason: Option<&str>,
    ) -> Result<Vec<StatusChangeEvent>, StoreError> {
        match SegmentRepo::apply_changes(&self.pool, changes, reason).await? {
            ApplyOutcome::Applied(rows) => rows
                .into_iter()
                .map(|row| StatusChangeEvent::try_from(row).map_err(corrupt))
                .collect(),
            ApplyOutcome::MissingSegment(id) => Err(StoreError::Domain(CoreError::NotFound {
                entity: "Segment",
                id,
            })),
            ApplyOutcome::Stale(change) => Err(StoreError::Domain(CoreError::Conflict(format!(
                "Segment {} {} changed concurrently, expected {}",
                change.segment_id, change.field, change.from
            )))),
            ApplyOutcome::VideoNotReady {
                segment_id,
                selected: Some((id, status)),
            } => Err(StoreError::Domain(CoreError::Precondition(format!(
                "Selected video candidate {id} of segment {segment_id} is {status}, not completed"
            )))),
            ApplyOutcome::VideoNotReady {
                segment_id,
                selected: None,
            } => Err(StoreError::Domain(CoreError::Precondition(format!(
                "Segment {segment_id} has no selected video candidate to approve"
            )))),
        }
    }

    async fn insert_candidate(&self, input: &NewCandidate) -> Result<MediaCandidate, StoreError> {
        let row = CandidateRepo::insert(
            &self.pool,
            &CreateMediaCandidate {
                segment_id: input.segment_id,
                kind: input.kind,
                url: input.url.clone(),
                status: input.status,
                is_selected: input.is_selected,
                task_handle: input.task_handle.clone(),
                metadata: input.metadata.clone(),
            },
        )
        .await?
        .ok_or(StoreError::Domain(CoreError::NotFound {
            entity: "Segment",
            id: input.segment_id,
        }))?;
        to_candidate(row)
    }

    async fn select_candidate(
        &self,
        segment_id: DbId,
        kind: MediaKind,
        candidate_id: DbId,
    ) -> Result<MediaCandidate, StoreError> {
        match CandidateRepo::select(&self.pool, segment_id, kind, candidate_id).await? {
            SelectOutcome::Selected(row) => to_candidate(row),
            SelectOutcome::MissingSegment => Err(StoreError::Domain(CoreError::NotFound {
                entity: "Segment",
                id: segment_id,
            })),
            SelectOutcome::NotFound => Err(StoreError::Domain(CoreError::NotFound {
                entity: "MediaCandidate",
                id: candidate_id,
            })),
            SelectOutcome::NotSelectable(_) => Err(StoreError::Domain(CoreError::Precondition(
                format!("Candidate {candidate_id} has failed and cannot be selected"),
            ))),
        }
    }

    async fn find_candidate(&self, id: DbId) -> Result<Option<MediaCandidate>, StoreError> {
        CandidateRepo::find_by_id(&self.pool, id)
            .await?
            .map(to_candidate)
            .transpose()
    }

    async fn find_candidate_by_task(
        &self,
        task_handle: &str,
    ) -> Result<Option<MediaCandidate>, StoreError> {
        CandidateRepo::find_by_task_handle(&self.pool, task_handle)
            .await?
            .map(to_candidate)
            .transpose()
    }

    async fn list_in_flight_videos(&self) -> Result<Vec<MediaCandidate>, StoreError> {
        CandidateRepo::list_in_flight_videos(&self.pool)
            .await?
            .into_iter()
            .map(to_candidate)
            .collect()
    }

    async fn update_candidate_if(
        &self,
        id: DbId,
        expected: CandidateStatus,
        update: &CandidateUpdate,
    ) -> Result<Option<MediaCandidate>, StoreError> {
        CandidateRepo::update_status_if(
            &self.pool,
            id,
            expected,
            update.status,
            update.url.as_deref(),
            &update.metadata,
        )
        .await?
        .map(to_candidate)
        .transpose()
    }

    async fn record_poll_attempt(&self, id: DbId) -> Result<Option<i32>, StoreError> {
        Ok(CandidateRepo::record_poll_attempt(&self.pool, id).await?)
    }

    async fn list_status_changes(
        &self,
        segment_id: DbId,
    ) -> Result<Vec<StatusChangeEvent>, StoreError> {
        StatusChangeRepo::list_by_segment(&self.pool, segment_id)
            .await?
            .into_iter()
            .map(|row| StatusChangeEvent::try_from(row).map_err(corrupt))
            .collect()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(storyreel_db::health_check(&self.pool).await?)
    }
}
