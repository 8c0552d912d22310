//! Media candidates and the single-selection invariant.
//!
//! A segment owns several generated candidates per [`MediaKind`]. At most
//! one candidate per (segment, kind) is selected at any time; adding a
//! selected candidate or selecting an existing one demotes every sibling.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::segment::ApprovalField;
use crate::types::{DbId, TaskHandle, Timestamp};

// ---------------------------------------------------------------------------
// MediaKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub const ALL: [MediaKind; 3] = [MediaKind::Image, MediaKind::Video, MediaKind::Audio];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    /// The approval field that reviews candidates of this kind.
    pub fn approval_field(self) -> ApprovalField {
        match self {
            MediaKind::Image => ApprovalField::Image,
            MediaKind::Video => ApprovalField::Video,
            MediaKind::Audio => ApprovalField::Audio,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid media kind '{s}'. Must be one of: image, video, audio"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// CandidateStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a generated candidate.
///
/// ```text
/// staged  -> pending, processing, completed, failed
/// pending -> processing, completed, failed
/// processing -> completed, failed
/// ```
///
/// `completed` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Staged,
}

impl CandidateStatus {
    pub const ALL: [CandidateStatus; 5] = [
        CandidateStatus::Pending,
        CandidateStatus::Processing,
        CandidateStatus::Completed,
        CandidateStatus::Failed,
        CandidateStatus::Staged,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CandidateStatus::Pending => "pending",
            CandidateStatus::Processing => "processing",
            CandidateStatus::Completed => "completed",
            CandidateStatus::Failed => "failed",
            CandidateStatus::Staged => "staged",
        }
    }

    /// Still waiting on the upstream service; keep polling.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            CandidateStatus::Pending | CandidateStatus::Processing | CandidateStatus::Staged
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CandidateStatus::Completed | CandidateStatus::Failed)
    }

    /// Failed candidates are never selectable.
    pub fn is_selectable(self) -> bool {
        self != CandidateStatus::Failed
    }

    pub fn can_transition_to(self, next: CandidateStatus) -> bool {
        use CandidateStatus::*;
        match self {
            Staged => matches!(next, Pending | Processing | Completed | Failed),
            Pending => matches!(next, Processing | Completed | Failed),
            Processing => matches!(next, Completed | Failed),
            Completed | Failed => false,
        }
    }
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CandidateStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CandidateStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid candidate status '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// MediaCandidate
// ---------------------------------------------------------------------------

/// One generated artifact for a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaCandidate {
    pub id: DbId,
    pub segment_id: DbId,
    pub kind: MediaKind,
    pub url: Option<String>,
    pub status: CandidateStatus,
    pub is_selected: bool,
    pub task_handle: Option<TaskHandle>,
    /// Generation parameters plus upstream progress / failure details.
    pub metadata: serde_json::Value,
    pub poll_attempts: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MediaCandidate {
    /// Human-readable failure reason recorded in the metadata, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        self.metadata.get("failure_reason").and_then(|v| v.as_str())
    }
}

/// Append `candidate` to `list`.
///
/// When the candidate arrives selected, every existing candidate is demoted
/// first so the list never holds two selected entries. A failed candidate
/// is never stored as selected.
pub fn add_candidate(list: &mut Vec<MediaCandidate>, mut candidate: MediaCandidate) {
    if !candidate.status.is_selectable() {
        candidate.is_selected = false;
    }
    if candidate.is_selected {
        for existing in list.iter_mut() {
            existing.is_selected = false;
        }
    }
    list.push(candidate);
}

/// Make `candidate_id` the only selected candidate in `list`.
///
/// Selecting the already-selected candidate is a no-op success.
pub fn select_candidate(
    list: &mut [MediaCandidate],
    candidate_id: DbId,
) -> Result<&MediaCandidate, CoreError> {
    let target = list
        .iter()
        .position(|c| c.id == candidate_id)
        .ok_or(CoreError::NotFound {
            entity: "MediaCandidate",
            id: candidate_id,
        })?;

    if !list[target].status.is_selectable() {
        return Err(CoreError::Precondition(format!(
            "Candidate {candidate_id} has failed and cannot be selected"
        )));
    }

    for (i, candidate) in list.iter_mut().enumerate() {
        candidate.is_selected = i == target;
    }
    Ok(&list[target])
}

/// The selected candidate, falling back to the first one when none is
/// marked selected.
pub fn selected_candidate(list: &[MediaCandidate]) -> Option<&MediaCandidate> {
    list.iter().find(|c| c.is_selected).or_else(|| list.first())
}

/// Number of candidates flagged as selected. Always 0 or 1 for a list
/// maintained through [`add_candidate`] and [`select_candidate`].
pub fn selected_count(list: &[MediaCandidate]) -> usize {
    list.iter().filter(|c| c.is_selected).count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
