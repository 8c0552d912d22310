//! Status change audit model.

use serde::Serialize;
use sqlx::FromRow;
use storyreel_core::audit::StatusChangeEvent;
use storyreel_core::error::CoreError;
use storyreel_core::types::{DbId, Timestamp};

/// A row from the append-only `status_change_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusChangeRow {
    pub id: DbId,
    pub segment_id: DbId,
    pub field: String,
    pub from_status: String,
    pub to_status: String,
    pub reason: Option<String>,
    pub created_at: Timestamp,
}

impl TryFrom<StatusChangeRow> for StatusChangeEvent {
    type Error = CoreError;

    fn try_from(row: StatusChangeRow) -> Result<Self, Self::Error> {
        Ok(StatusChangeEvent {
            id: row.id,
            segment_id: row.segment_id,
            field: row.field.parse()?,
            from_status: row.from_status.parse()?,
            to_status: row.to_status.parse()?,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}
