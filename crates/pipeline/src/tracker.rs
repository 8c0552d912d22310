//! Submit/poll/cancel protocol for asynchronous video generation tasks.
//!
//! A submitted task is stored as a selected video candidate carrying the
//! provider's task handle. Polls reconcile the remote state onto that
//! candidate with a compare-and-set, so concurrent pollers of the same
//! task never overwrite each other and a terminal candidate is never
//! reopened.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use storyreel_core::candidate::{CandidateStatus, MediaCandidate, MediaKind};
use storyreel_core::error::CoreError;
use storyreel_core::segment::ApprovalField;
use storyreel_core::task::{
    failure_update, reconcile, CandidateUpdate, PollPolicy, RemoteTaskState, TaskStatus,
    REASON_CANCELLED, REASON_TIMED_OUT,
};
use storyreel_core::types::DbId;
use storyreel_providers::{VideoGenerator, VideoMode, VideoRequest};
use tokio_util::sync::CancellationToken;

use crate::error::WorkflowError;
use crate::review;
use crate::store::{NewCandidate, WorkflowStore};

/// Default clip length requested from the video service.
pub const DEFAULT_DURATION_SECS: u32 = 5;

#[derive(Debug, Clone)]
pub struct VideoParams {
    /// Defaults to the segment's selected completed image.
    pub image_url: Option<String>,
    /// Defaults to the segment's video prompt, then its script.
    pub prompt: Option<String>,
    pub duration_secs: u32,
    pub negative_prompt: Option<String>,
    pub mode: VideoMode,
}

impl Default for VideoParams {
    fn default() -> Self {
        Self {
            image_url: None,
            prompt: None,
            duration_secs: DEFAULT_DURATION_SECS,
            negative_prompt: None,
            mode: VideoMode::default(),
        }
    }
}

/// Result of one poll.
#[derive(Debug, Clone, Serialize)]
pub struct PollOutcome {
    /// Candidate state after this poll.
    pub candidate: MediaCandidate,
    /// Whether this poll wrote a new candidate state.
    pub refreshed: bool,
    /// Set when the upstream query failed; the candidate is left as it was.
    pub upstream_error: Option<String>,
    /// Raw upstream answer, when one was obtained.
    pub remote: Option<RemoteTaskState>,
}

impl PollOutcome {
    fn unchanged(candidate: MediaCandidate) -> Self {
        Self {
            candidate,
            refreshed: false,
            upstream_error: None,
            remote: None,
        }
    }
}

pub struct TaskTracker {
    store: Arc<dyn WorkflowStore>,
    video: Arc<dyn VideoGenerator>,
    policy: PollPolicy,
}

impl TaskTracker {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        video: Arc<dyn VideoGenerator>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            store,
            video,
            policy,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Submit a video generation task for a segment and store it as the
    /// selected, in-flight video candidate.
    ///
    /// Nothing is stored when the service rejects the submission.
    pub async fn submit(
        &self,
        segment_id: DbId,
        params: VideoParams,
    ) -> Result<MediaCandidate, WorkflowError> {
        let segment = self
            .store
            .find_segment(segment_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Segment",
                id: segment_id,
            })?;

        let image_url = match params.image_url {
            Some(url) => url,
            None => segment
                .selected(MediaKind::Image)
                .filter(|c| c.status == CandidateStatus::Completed)
                .and_then(|c| c.url.clone())
                .ok_or_else(|| {
                    CoreError::Precondition(format!(
                        "Segment {segment_id} has no completed image to animate"
                    ))
                })?,
        };

        let request = VideoRequest {
            image_url,
            prompt: params
                .prompt
                .or_else(|| segment.video_prompt.clone())
                .unwrap_or_else(|| segment.script.clone()),
            duration_secs: params.duration_secs,
            negative_prompt: params.negative_prompt,
            mode: params.mode,
        };

        let submission = self.video.submit(&request).await.map_err(|e| {
            tracing::warn!(segment_id, error = %e, "Video submission failed");
            e
        })?;

        let status = match submission.status {
            TaskStatus::Queued => CandidateStatus::Staged,
            _ => CandidateStatus::Pending,
        };
        let candidate = self
            .store
            .insert_candidate(&NewCandidate {
                segment_id,
                kind: MediaKind::Video,
                url: None,
                status,
                is_selected: true,
                task_handle: Some(submission.task_id.clone()),
                metadata: serde_json::json!({
                    "image_url": request.image_url,
                    "prompt": request.prompt,
                    "duration_secs": request.duration_secs,
                    "negative_prompt": request.negative_prompt,
                    "mode": request.mode,
                }),
            })
            .await?;

        tracing::info!(
            segment_id,
            candidate_id = candidate.id,
            task_handle = %submission.task_id,
            status = %candidate.status,
            "Video task submitted",
        );
        Ok(candidate)
    }

    /// Query the provider for a task and reconcile the result.
    ///
    /// A completed candidate is returned without contacting the provider.
    /// A task past the polling guard is marked failed instead of polled.
    /// Upstream errors are reported on the outcome and leave the candidate
    /// unchanged.
    pub async fn poll(&self, task_handle: &str) -> Result<PollOutcome, WorkflowError> {
        let mut candidate = self
            .store
            .find_candidate_by_task(task_handle)
            .await?
            .ok_or_else(|| CoreError::UnknownTask(task_handle.to_string()))?;

        if candidate.status == CandidateStatus::Completed {
            return Ok(PollOutcome::unchanged(candidate));
        }

        if candidate.status.is_pending() {
            let elapsed = (Utc::now() - candidate.created_at)
                .to_std()
                .unwrap_or_default();
            let attempts = u32::try_from(candidate.poll_attempts).unwrap_or(0);
            if self.policy.is_exhausted(attempts, elapsed) {
                return self.give_up(candidate, elapsed).await;
            }
            if let Some(count) = self.store.record_poll_attempt(candidate.id).await? {
                candidate.poll_attempts = count;
            }
        }

        let remote = match self.video.poll(task_handle).await {
            Ok(remote) => remote,
            Err(e) => {
                tracing::warn!(
                    candidate_id = candidate.id,
                    task_handle,
                    error = %e,
                    "Video task poll failed",
                );
                return Ok(PollOutcome {
                    candidate,
                    refreshed: false,
                    upstream_error: Some(e.to_string()),
                    remote: None,
                });
            }
        };

        let Some(update) = reconcile(&candidate, &remote) else {
            return Ok(PollOutcome {
                candidate,
                refreshed: false,
                upstream_error: None,
                remote: Some(remote),
            });
        };

        let (candidate, refreshed) = self.write(candidate, &update).await?;
        if refreshed {
            tracing::info!(
                candidate_id = candidate.id,
                task_handle,
                status = %candidate.status,
                "Video task state updated",
            );
            if candidate.status == CandidateStatus::Completed && candidate.is_selected {
                review::stage_review(
                    self.store.as_ref(),
                    candidate.segment_id,
                    ApprovalField::Video,
                    "video generated",
                )
                .await?;
            }
        }

        Ok(PollOutcome {
            candidate,
            refreshed,
            upstream_error: None,
            remote: Some(remote),
        })
    }

    /// Cancel an in-flight video task and mark its candidate failed.
    pub async fn cancel(&self, candidate_id: DbId) -> Result<MediaCandidate, WorkflowError> {
        let candidate = self
            .store
            .find_candidate(candidate_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "MediaCandidate",
                id: candidate_id,
            })?;

        if candidate.kind != MediaKind::Video {
            return Err(CoreError::Precondition(format!(
                "Candidate {candidate_id} is not a video task"
            ))
            .into());
        }
        let Some(handle) = candidate.task_handle.clone() else {
            return Err(CoreError::Precondition(format!(
                "Candidate {candidate_id} has no task to cancel"
            ))
            .into());
        };
        if candidate.status.is_terminal() {
            return Err(CoreError::Precondition(format!(
                "Candidate {candidate_id} is already {}",
                candidate.status
            ))
            .into());
        }

        self.video.cancel(&handle).await?;

        let update = failure_update(&candidate, REASON_CANCELLED);
        let (candidate, written) = self.write(candidate, &update).await?;
        if !written {
            return Err(CoreError::Conflict(format!(
                "Candidate {candidate_id} changed while being cancelled"
            ))
            .into());
        }
        tracing::info!(candidate_id, task_handle = %handle, "Video task cancelled");
        Ok(candidate)
    }

    /// Poll a candidate's task at the policy interval until it is terminal
    /// or `cancel` fires. Returns the last known candidate state.
    pub async fn watch(
        &self,
        candidate_id: DbId,
        cancel: CancellationToken,
    ) -> Result<MediaCandidate, WorkflowError> {
        let mut candidate = self
            .store
            .find_candidate(candidate_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "MediaCandidate",
                id: candidate_id,
            })?;
        let Some(handle) = candidate.task_handle.clone() else {
            return Err(CoreError::Precondition(format!(
                "Candidate {candidate_id} has no task to watch"
            ))
            .into());
        };

        let mut ticker = tokio::time::interval(self.policy.interval);
        while !candidate.status.is_terminal() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(candidate_id, "Stopped watching video task");
                    break;
                }
                _ = ticker.tick() => {
                    candidate = self.poll(&handle).await?.candidate;
                }
            }
        }
        Ok(candidate)
    }

    // ---- private helpers ----

    async fn give_up(
        &self,
        candidate: MediaCandidate,
        elapsed: std::time::Duration,
    ) -> Result<PollOutcome, WorkflowError> {
        tracing::warn!(
            candidate_id = candidate.id,
            attempts = candidate.poll_attempts,
            elapsed_secs = elapsed.as_secs(),
            "Video task exceeded polling limits, marking failed",
        );
        let update = failure_update(&candidate, REASON_TIMED_OUT);
        let (candidate, refreshed) = self.write(candidate, &update).await?;
        Ok(PollOutcome {
            candidate,
            refreshed,
            upstream_error: None,
            remote: None,
        })
    }

    /// Compare-and-set `update` against the candidate's current status.
    /// When another writer got there first, the stored state is returned.
    async fn write(
        &self,
        candidate: MediaCandidate,
        update: &CandidateUpdate,
    ) -> Result<(MediaCandidate, bool), WorkflowError> {
        if let Some(updated) = self
            .store
            .update_candidate_if(candidate.id, candidate.status, update)
            .await?
        {
            return Ok((updated, true));
        }
        tracing::debug!(candidate_id = candidate.id, "Candidate changed concurrently");
        let current = self
            .store
            .find_candidate(candidate.id)
            .await?
            .unwrap_or(candidate);
        Ok((current, false))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
