//! Segment state: five independent approval fields plus candidate lists.
//!
//! Approval batches are planned here as pure functions so that every
//! validation error is raised before any storage mutation happens.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::approval::{transition_path, ApprovalStatus};
use crate::candidate::{selected_candidate, CandidateStatus, MediaCandidate, MediaKind};
use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// ApprovalField
// ---------------------------------------------------------------------------

/// One of the five independently approved pipeline fields of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalField {
    Script,
    Image,
    Video,
    Audio,
    Final,
}

impl ApprovalField {
    pub const ALL: [ApprovalField; 5] = [
        ApprovalField::Script,
        ApprovalField::Image,
        ApprovalField::Video,
        ApprovalField::Audio,
        ApprovalField::Final,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalField::Script => "script",
            ApprovalField::Image => "image",
            ApprovalField::Video => "video",
            ApprovalField::Audio => "audio",
            ApprovalField::Final => "final",
        }
    }

    /// Column holding this field in the `segments` table.
    pub fn column(self) -> &'static str {
        match self {
            ApprovalField::Script => "script_approval_status",
            ApprovalField::Image => "image_approval_status",
            ApprovalField::Video => "video_approval_status",
            ApprovalField::Audio => "audio_approval_status",
            ApprovalField::Final => "final_approval_status",
        }
    }

    /// Candidate kind reviewed by this field, if it has one.
    pub fn media_kind(self) -> Option<MediaKind> {
        match self {
            ApprovalField::Image => Some(MediaKind::Image),
            ApprovalField::Video => Some(MediaKind::Video),
            ApprovalField::Audio => Some(MediaKind::Audio),
            ApprovalField::Script | ApprovalField::Final => None,
        }
    }
}

impl fmt::Display for ApprovalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApprovalField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid approval field '{s}'. Must be one of: script, image, video, audio, final"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// SegmentState
// ---------------------------------------------------------------------------

/// One scene of a project with its approvals and generated candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentState {
    pub id: DbId,
    pub project_id: DbId,
    pub order: i32,
    pub script: String,
    pub video_prompt: Option<String>,
    pub script_approval_status: ApprovalStatus,
    pub image_approval_status: ApprovalStatus,
    pub video_approval_status: ApprovalStatus,
    pub audio_approval_status: ApprovalStatus,
    pub final_approval_status: ApprovalStatus,
    pub images: Vec<MediaCandidate>,
    pub videos: Vec<MediaCandidate>,
    pub audios: Vec<MediaCandidate>,
}

impl SegmentState {
    pub fn status(&self, field: ApprovalField) -> ApprovalStatus {
        match field {
            ApprovalField::Script => self.script_approval_status,
            ApprovalField::Image => self.image_approval_status,
            ApprovalField::Video => self.video_approval_status,
            ApprovalField::Audio => self.audio_approval_status,
            ApprovalField::Final => self.final_approval_status,
        }
    }

    pub fn set_status(&mut self, field: ApprovalField, status: ApprovalStatus) {
        let slot = match field {
            ApprovalField::Script => &mut self.script_approval_status,
            ApprovalField::Image => &mut self.image_approval_status,
            ApprovalField::Video => &mut self.video_approval_status,
            ApprovalField::Audio => &mut self.audio_approval_status,
            ApprovalField::Final => &mut self.final_approval_status,
        };
        *slot = status;
    }

    pub fn candidates(&self, kind: MediaKind) -> &[MediaCandidate] {
        match kind {
            MediaKind::Image => &self.images,
            MediaKind::Video => &self.videos,
            MediaKind::Audio => &self.audios,
        }
    }

    pub fn candidates_mut(&mut self, kind: MediaKind) -> &mut Vec<MediaCandidate> {
        match kind {
            MediaKind::Image => &mut self.images,
            MediaKind::Video => &mut self.videos,
            MediaKind::Audio => &mut self.audios,
        }
    }

    pub fn selected(&self, kind: MediaKind) -> Option<&MediaCandidate> {
        selected_candidate(self.candidates(kind))
    }
}

// ---------------------------------------------------------------------------
// Transition planning
// ---------------------------------------------------------------------------

/// A single validated field change, carrying the expected prior value so
/// storage can apply it as a compare-and-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub segment_id: DbId,
    pub field: ApprovalField,
    pub from: ApprovalStatus,
    pub to: ApprovalStatus,
}

/// Validate moving every field in `fields` to `to` on one segment.
///
/// All-or-nothing: the first invalid field aborts the whole batch and is
/// named in the returned error. Duplicate fields are collapsed. Approving
/// the video field additionally requires the selected video candidate to
/// be `completed`.
pub fn plan_transition(
    segment: &SegmentState,
    fields: &[ApprovalField],
    to: ApprovalStatus,
) -> Result<Vec<FieldChange>, CoreError> {
    if fields.is_empty() {
        return Err(CoreError::Validation(
            "At least one approval field is required".to_string(),
        ));
    }

    let mut changes: Vec<FieldChange> = Vec::with_capacity(fields.len());
    for &field in fields {
        if changes.iter().any(|c| c.field == field) {
            continue;
        }
        let from = segment.status(field);
        if !from.can_transition_to(to) {
            return Err(CoreError::InvalidTransition { field, from, to });
        }
        if field == ApprovalField::Video && to == ApprovalStatus::Approved {
            ensure_video_completed(segment)?;
        }
        changes.push(FieldChange {
            segment_id: segment.id,
            field,
            from,
            to,
        });
    }
    Ok(changes)
}

/// Approval looks only at the explicitly selected video; the first-candidate
/// fallback of [`SegmentState::selected`] does not apply here.
pub fn ensure_video_completed(segment: &SegmentState) -> Result<(), CoreError> {
    let selected = segment
        .candidates(MediaKind::Video)
        .iter()
        .find(|c| c.is_selected);
    match selected {
        Some(video) if video.status == CandidateStatus::Completed => Ok(()),
        Some(video) => Err(CoreError::Precondition(format!(
            "Selected video candidate {} is {}, not completed",
            video.id, video.status
        ))),
        None => Err(CoreError::Precondition(format!(
            "Segment {} has no selected video candidate to approve",
            segment.id
        ))),
    }
}

/// Changes that bring `field` to `processing` (awaiting review) after new
/// content has been produced for it.
///
/// Fields in `draft`, `submitted` or `rejected` are walked along legal
/// hops; `processing` and `approved` fields are left untouched.
pub fn plan_review_staging(segment: &SegmentState, field: ApprovalField) -> Vec<FieldChange> {
    let current = segment.status(field);
    if matches!(current, ApprovalStatus::Processing | ApprovalStatus::Approved) {
        return Vec::new();
    }

    let Some(path) = transition_path(current, ApprovalStatus::Processing) else {
        return Vec::new();
    };

    let mut from = current;
    path.into_iter()
        .map(|to| {
            let change = FieldChange {
                segment_id: segment.id,
                field,
                from,
                to,
            };
            from = to;
            change
        })
        .collect()
}

/// Apply already-validated changes to an in-memory segment.
pub fn apply_changes(segment: &mut SegmentState, changes: &[FieldChange]) {
    let id = segment.id;
    for change in changes.iter().filter(|c| c.segment_id == id) {
        segment.set_status(change.field, change.to);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
