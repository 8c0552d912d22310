//! Append-only log of approval status changes.

use serde::{Deserialize, Serialize};

use crate::approval::ApprovalStatus;
use crate::error::CoreError;
use crate::segment::ApprovalField;
use crate::types::{DbId, Timestamp};

/// One recorded approval field change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangeEvent {
    pub id: DbId,
    pub segment_id: DbId,
    pub field: ApprovalField,
    pub from_status: ApprovalStatus,
    pub to_status: ApprovalStatus,
    pub reason: Option<String>,
    pub created_at: Timestamp,
}

/// Order events chronologically, breaking timestamp ties by id.
pub fn sort_history(events: &mut [StatusChangeEvent]) {
    events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

/// Rebuild the value of `field` by replaying `events` from `initial`.
///
/// Events for other fields are skipped. Each applied event must start where
/// the previous one ended and be a legal transition.
pub fn replay(
    initial: ApprovalStatus,
    events: &[StatusChangeEvent],
    field: ApprovalField,
) -> Result<ApprovalStatus, CoreError> {
    let mut current = initial;
    for event in events.iter().filter(|e| e.field == field) {
        if event.from_status != current {
            return Err(CoreError::Internal(format!(
                "History gap on {field}: event {} starts at {} but field was {current}",
                event.id, event.from_status
            )));
        }
        if !event.from_status.can_transition_to(event.to_status) {
            return Err(CoreError::InvalidTransition {
                field,
                from: event.from_status,
                to: event.to_status,
            });
        }
        current = event.to_status;
    }
    Ok(current)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
