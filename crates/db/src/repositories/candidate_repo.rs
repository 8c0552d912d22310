//! Repository for the `media_candidates` table.
//!
//! Selection changes lock the owning segment row so that demote-then-select
//! is serialized per segment; the partial unique index
//! `uq_media_candidates_selected` backs the same invariant in storage.

use sqlx::{PgConnection, PgPool};
use storyreel_core::candidate::{CandidateStatus, MediaKind};
use storyreel_core::types::DbId;

use crate::models::candidate::{CreateMediaCandidate, MediaCandidateRow};

const COLUMNS: &str = "id, segment_id, kind, url, status, is_selected, task_handle, \
    metadata, poll_attempts, created_at, updated_at";

/// Result of a selection request.
#[derive(Debug)]
pub enum SelectOutcome {
    Selected(MediaCandidateRow),
    /// The segment does not exist.
    MissingSegment,
    /// No candidate with that id exists for the segment and kind.
    NotFound,
    /// The candidate exists but has failed; nothing was changed.
    NotSelectable(MediaCandidateRow),
}

pub struct CandidateRepo;

impl CandidateRepo {
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<MediaCandidateRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM media_candidates WHERE id = $1");
        sqlx::query_as::<_, MediaCandidateRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_task_handle(
        pool: &PgPool,
        task_handle: &str,
    ) -> Result<Option<MediaCandidateRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM media_candidates WHERE task_handle = $1");
        sqlx::query_as::<_, MediaCandidateRow>(&query)
            .bind(task_handle)
            .fetch_optional(pool)
            .await
    }

    /// Candidates of the given segments, oldest first.
    pub async fn list_by_segments(
        pool: &PgPool,
        segment_ids: &[DbId],
    ) -> Result<Vec<MediaCandidateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_candidates
             WHERE segment_id = ANY($1)
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, MediaCandidateRow>(&query)
            .bind(segment_ids)
            .fetch_all(pool)
            .await
    }

    /// Video candidates still waiting on the upstream service.
    pub async fn list_in_flight_videos(
        pool: &PgPool,
    ) -> Result<Vec<MediaCandidateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM media_candidates
             WHERE kind = 'video'
               AND status IN ('pending', 'processing', 'staged')
               AND task_handle IS NOT NULL
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, MediaCandidateRow>(&query)
            .fetch_all(pool)
            .await
    }

    /// Insert a candidate. When it arrives selected, siblings of the same
    /// kind are demoted in the same transaction.
    ///
    /// Returns `None` if the segment does not exist.
    pub async fn insert(
        pool: &PgPool,
        input: &CreateMediaCandidate,
    ) -> Result<Option<MediaCandidateRow>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if !lock_segment(&mut tx, input.segment_id).await? {
            return Ok(None);
        }

        let is_selected = input.is_selected && input.status.is_selectable();
        if is_selected {
            demote_siblings(&mut tx, input.segment_id, input.kind).await?;
        }

        let query = format!(
            "INSERT INTO media_candidates
                (segment_id, kind, url, status, is_selected, task_handle, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, MediaCandidateRow>(&query)
            .bind(input.segment_id)
            .bind(input.kind.as_str())
            .bind(&input.url)
            .bind(input.status.as_str())
            .bind(is_selected)
            .bind(&input.task_handle)
            .bind(&input.metadata)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(row))
    }

    /// Make `candidate_id` the only selected candidate of its segment and
    /// kind. Selecting the already-selected candidate is a no-op success.
    pub async fn select(
        pool: &PgPool,
        segment_id: DbId,
        kind: MediaKind,
        candidate_id: DbId,
    ) -> Result<SelectOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if !lock_segment(&mut tx, segment_id).await? {
            return Ok(SelectOutcome::MissingSegment);
        }

        let query = format!(
            "SELECT {COLUMNS} FROM media_candidates
             WHERE id = $1 AND segment_id = $2 AND kind = $3"
        );
        let Some(target) = sqlx::query_as::<_, MediaCandidateRow>(&query)
            .bind(candidate_id)
            .bind(segment_id)
            .bind(kind.as_str())
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(SelectOutcome::NotFound);
        };

        if target.status == CandidateStatus::Failed.as_str() {
            return Ok(SelectOutcome::NotSelectable(target));
        }
        if target.is_selected {
            return Ok(SelectOutcome::Selected(target));
        }

        demote_siblings(&mut tx, segment_id, kind).await?;
        let query = format!(
            "UPDATE media_candidates SET is_selected = true WHERE id = $1 RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, MediaCandidateRow>(&query)
            .bind(candidate_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(SelectOutcome::Selected(row))
    }

    /// Compare-and-set the reconciled state of a candidate.
    ///
    /// Only applies while the stored status still equals `expected`. A failed
    /// candidate loses its selection flag. Returns `None` when the row moved
    /// on or no longer exists.
    pub async fn update_status_if(
        pool: &PgPool,
        id: DbId,
        expected: CandidateStatus,
        status: CandidateStatus,
        url: Option<&str>,
        metadata: &serde_json::Value,
    ) -> Result<Option<MediaCandidateRow>, sqlx::Error> {
        let query = format!(
            "UPDATE media_candidates SET
                status = $3,
                url = $4,
                metadata = $5,
                is_selected = is_selected AND $3 <> 'failed'
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MediaCandidateRow>(&query)
            .bind(id)
            .bind(expected.as_str())
            .bind(status.as_str())
            .bind(url)
            .bind(metadata)
            .fetch_optional(pool)
            .await
    }

    /// Count one upstream poll. Returns the new attempt count.
    pub async fn record_poll_attempt(pool: &PgPool, id: DbId) -> Result<Option<i32>, sqlx::Error> {
        let row: Option<(i32,)> = sqlx::query_as(
            "UPDATE media_candidates SET poll_attempts = poll_attempts + 1
             WHERE id = $1
             RETURNING poll_attempts",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(attempts,)| attempts))
    }
}

async fn lock_segment(conn: &mut PgConnection, segment_id: DbId) -> Result<bool, sqlx::Error> {
    let locked: Option<(DbId,)> = sqlx::query_as("SELECT id FROM segments WHERE id = $1 FOR UPDATE")
        .bind(segment_id)
        .fetch_optional(conn)
        .await?;
    Ok(locked.is_some())
}

async fn demote_siblings(
    conn: &mut PgConnection,
    segment_id: DbId,
    kind: MediaKind,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE media_candidates SET is_selected = false
         WHERE segment_id = $1 AND kind = $2 AND is_selected",
    )
    .bind(segment_id)
    .bind(kind.as_str())
    .execute(conn)
    .await?;
    Ok(())
}
