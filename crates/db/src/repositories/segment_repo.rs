//! Repository for the `segments` table.

use sqlx::PgPool;
use storyreel_core::approval::ApprovalStatus;
use storyreel_core::candidate::{CandidateStatus, MediaKind};
use storyreel_core::segment::{ApprovalField, FieldChange};
use storyreel_core::types::DbId;

use crate::models::segment::{CreateSegment, Segment};
use crate::models::status_change::StatusChangeRow;
use crate::repositories::StatusChangeRepo;

const COLUMNS: &str = "id, project_id, order_index, script, video_prompt, \
    script_approval_status, image_approval_status, video_approval_status, \
    audio_approval_status, final_approval_status, created_at, updated_at";

/// Result of applying an approval batch.
#[derive(Debug)]
pub enum ApplyOutcome {
    /// Every change was written; the recorded events in order.
    Applied(Vec<StatusChangeRow>),
    /// The segment is gone. Nothing was written.
    MissingSegment(DbId),
    /// A field no longer held its expected prior value. Nothing was written.
    Stale(FieldChange),
    /// Video approval requested but the selected video is not completed
    /// (or nothing is selected). Nothing was written.
    VideoNotReady {
        segment_id: DbId,
        selected: Option<(DbId, String)>,
    },
}

pub struct SegmentRepo;

impl SegmentRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Segment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM segments WHERE id = $1");
        sqlx::query_as::<_, Segment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Segments of a project in playback order.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Segment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM segments WHERE project_id = $1 ORDER BY order_index ASC, id ASC"
        );
        sqlx::query_as::<_, Segment>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Delete every segment of a project and insert `inputs` in its place.
    ///
    /// Runs in one transaction holding the project row lock. Returns `None`
    /// if the project does not exist.
    pub async fn replace_for_project(
        pool: &PgPool,
        project_id: DbId,
        inputs: &[CreateSegment],
    ) -> Result<Option<Vec<Segment>>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let locked: Option<(DbId,)> = sqlx::query_as("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
            .bind(project_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Ok(None);
        }

        sqlx::query("DELETE FROM segments WHERE project_id = $1")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO segments (project_id, order_index, script, video_prompt)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let segment = sqlx::query_as::<_, Segment>(&query)
                .bind(project_id)
                .bind(input.order_index)
                .bind(&input.script)
                .bind(&input.video_prompt)
                .fetch_one(&mut *tx)
                .await?;
            created.push(segment);
        }

        tx.commit().await?;
        Ok(Some(created))
    }

    /// Apply validated approval changes as one compare-and-set batch and
    /// append an audit event per change.
    ///
    /// Touched segment rows are locked in id order. Each change only applies
    /// when the column still holds `change.from`; the first mismatch rolls
    /// the whole batch back.
    pub async fn apply_changes(
        pool: &PgPool,
        changes: &[FieldChange],
        reason: Option<&str>,
    ) -> Result<ApplyOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let mut segment_ids: Vec<DbId> = changes.iter().map(|c| c.segment_id).collect();
        segment_ids.sort_unstable();
        segment_ids.dedup();
        for &segment_id in &segment_ids {
            let locked: Option<(DbId,)> =
                sqlx::query_as("SELECT id FROM segments WHERE id = $1 FOR UPDATE")
                    .bind(segment_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if locked.is_none() {
                return Ok(ApplyOutcome::MissingSegment(segment_id));
            }
        }

        let mut events = Vec::with_capacity(changes.len());
        for change in changes {
            if change.field == ApprovalField::Video && change.to == ApprovalStatus::Approved {
                let selected: Option<(DbId, String)> = sqlx::query_as(
                    "SELECT id, status FROM media_candidates \
                     WHERE segment_id = $1 AND kind = $2 AND is_selected",
                )
                .bind(change.segment_id)
                .bind(MediaKind::Video.as_str())
                .fetch_optional(&mut *tx)
                .await?;
                let ready = matches!(
                    &selected,
                    Some((_, status)) if status == CandidateStatus::Completed.as_str()
                );
                if !ready {
                    return Ok(ApplyOutcome::VideoNotReady {
                        segment_id: change.segment_id,
                        selected,
                    });
                }
            }

            let column = change.field.column();
            let query = format!("UPDATE segments SET {column} = $3 WHERE id = $1 AND {column} = $2");
            let result = sqlx::query(&query)
                .bind(change.segment_id)
                .bind(change.from.as_str())
                .bind(change.to.as_str())
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Ok(ApplyOutcome::Stale(*change));
            }
            events.push(StatusChangeRepo::insert(&mut tx, change, reason).await?);
        }

        tx.commit().await?;
        Ok(ApplyOutcome::Applied(events))
    }
}
