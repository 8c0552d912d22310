//! Asynchronous video task tracking: remote task states, the polling guard,
//! and reconciliation of a remote state onto a local candidate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::candidate::{CandidateStatus, MediaCandidate};

/// Default interval between polls of one task.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(12);

/// Default cap on upstream polls per task (~30 minutes at the default interval).
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 150;

/// Default cap on task age before it is given up on.
pub const DEFAULT_MAX_POLL_DURATION: Duration = Duration::from_secs(30 * 60);

/// Metadata key carrying the reason a candidate failed.
pub const FAILURE_REASON_KEY: &str = "failure_reason";

/// Failure reason written when the polling guard gives up on a task.
pub const REASON_TIMED_OUT: &str = "timed out waiting for video generation";

/// Failure reason written when a task is cancelled by the user.
pub const REASON_CANCELLED: &str = "cancelled";

/// Task state as reported by the video generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Accepted but waiting in the provider's queue.
    Queued,
    Pending,
    #[serde(alias = "running")]
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl From<TaskStatus> for CandidateStatus {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Queued => CandidateStatus::Staged,
            TaskStatus::Pending => CandidateStatus::Pending,
            TaskStatus::Processing => CandidateStatus::Processing,
            TaskStatus::Completed => CandidateStatus::Completed,
            TaskStatus::Failed => CandidateStatus::Failed,
        }
    }
}

/// One poll response from the video generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTaskState {
    pub status: TaskStatus,
    pub video_url: Option<String>,
    pub progress: Option<f32>,
    pub error: Option<String>,
}

/// Bounds on client-side polling of a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub max_duration: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: Some(DEFAULT_MAX_POLL_ATTEMPTS),
            max_duration: Some(DEFAULT_MAX_POLL_DURATION),
        }
    }
}

impl PollPolicy {
    /// Whether a task polled `attempts` times over `elapsed` should be
    /// abandoned.
    pub fn is_exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
            || self.max_duration.is_some_and(|max| elapsed >= max)
    }
}

/// The new state to write onto a candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateUpdate {
    pub status: CandidateStatus,
    pub url: Option<String>,
    pub metadata: serde_json::Value,
}

/// Map a remote state onto `candidate`.
///
/// Returns `None` when nothing needs writing: the candidate is already
/// terminal, the remote status equals the local one, the remote state
/// would move the candidate backwards, or a completion carries no URL.
pub fn reconcile(candidate: &MediaCandidate, remote: &RemoteTaskState) -> Option<CandidateUpdate> {
    if candidate.status.is_terminal() {
        return None;
    }

    let next = CandidateStatus::from(remote.status);
    if next == candidate.status || !candidate.status.can_transition_to(next) {
        return None;
    }

    let url = match next {
        CandidateStatus::Completed => Some(remote.video_url.clone()?),
        _ => candidate.url.clone(),
    };

    let mut metadata = object_or_empty(&candidate.metadata);
    if let Some(progress) = remote.progress {
        metadata.insert("progress".into(), serde_json::json!(progress));
    }
    if next == CandidateStatus::Failed {
        let reason = remote
            .error
            .clone()
            .unwrap_or_else(|| "video generation failed".to_string());
        metadata.insert(FAILURE_REASON_KEY.into(), serde_json::Value::String(reason));
    }

    Some(CandidateUpdate {
        status: next,
        url,
        metadata: serde_json::Value::Object(metadata),
    })
}

/// Update that marks `candidate` failed with `reason`.
pub fn failure_update(candidate: &MediaCandidate, reason: &str) -> CandidateUpdate {
    let mut metadata = object_or_empty(&candidate.metadata);
    metadata.insert(
        FAILURE_REASON_KEY.into(),
        serde_json::Value::String(reason.to_string()),
    );
    CandidateUpdate {
        status: CandidateStatus::Failed,
        url: candidate.url.clone(),
        metadata: serde_json::Value::Object(metadata),
    }
}

fn object_or_empty(value: &serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    value.as_object().cloned().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
