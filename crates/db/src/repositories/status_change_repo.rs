//! Repository for the append-only `status_change_events` table.

use sqlx::{PgConnection, PgPool};
use storyreel_core::segment::FieldChange;
use storyreel_core::types::DbId;

use crate::models::status_change::StatusChangeRow;

const COLUMNS: &str = "id, segment_id, field, from_status, to_status, reason, created_at";

pub struct StatusChangeRepo;

impl StatusChangeRepo {
    /// Append one event. Runs on the caller's connection so it joins the
    /// transaction that applied the change.
    pub async fn insert(
        conn: &mut PgConnection,
        change: &FieldChange,
        reason: Option<&str>,
    ) -> Result<StatusChangeRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO status_change_events (segment_id, field, from_status, to_status, reason)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StatusChangeRow>(&query)
            .bind(change.segment_id)
            .bind(change.field.as_str())
            .bind(change.from.as_str())
            .bind(change.to.as_str())
            .bind(reason)
            .fetch_one(conn)
            .await
    }

    /// History of one segment, oldest first.
    pub async fn list_by_segment(
        pool: &PgPool,
        segment_id: DbId,
    ) -> Result<Vec<StatusChangeRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM status_change_events
             WHERE segment_id = $1
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, StatusChangeRow>(&query)
            .bind(segment_id)
            .fetch_all(pool)
            .await
    }
}
