//! Helpers shared by the controller and the tracker: review staging,
//! stage cache refresh and change logging.

use storyreel_core::audit::StatusChangeEvent;
use storyreel_core::error::CoreError;
use storyreel_core::segment::{plan_review_staging, ApprovalField};
use storyreel_core::stage::{self, StageSummary};
use storyreel_core::types::DbId;

use crate::error::WorkflowError;
use crate::store::WorkflowStore;

/// Walk `field` of a segment to `processing` so new content awaits review.
/// Approved and already-processing fields are left alone.
pub(crate) async fn stage_review(
    store: &dyn WorkflowStore,
    segment_id: DbId,
    field: ApprovalField,
    reason: &str,
) -> Result<Vec<StatusChangeEvent>, WorkflowError> {
    let segment = store
        .find_segment(segment_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Segment",
            id: segment_id,
        })?;

    let changes = plan_review_staging(&segment, field);
    if changes.is_empty() {
        return Ok(Vec::new());
    }

    let events = store.apply_status_changes(&changes, Some(reason)).await?;
    log_changes(&events);
    refresh_stage(store, segment.project_id).await?;
    Ok(events)
}

/// Recompute the project stage from its segments and write the cache if it
/// moved.
pub(crate) async fn refresh_stage(
    store: &dyn WorkflowStore,
    project_id: DbId,
) -> Result<StageSummary, WorkflowError> {
    let segments = store.list_segments(project_id).await?;
    let summary = stage::summarize(&segments);
    if store.update_project_cache(project_id, summary).await? {
        tracing::info!(
            project_id,
            stage = %summary.current_stage,
            status = %summary.status,
            "Project stage changed",
        );
    }
    Ok(summary)
}

pub(crate) fn log_changes(events: &[StatusChangeEvent]) {
    for event in events {
        tracing::info!(
            segment_id = event.segment_id,
            field = %event.field,
            from = %event.from_status,
            to = %event.to_status,
            reason = event.reason.as_deref().unwrap_or(""),
            "Approval status changed",
        );
    }
}
