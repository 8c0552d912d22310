//! Stage gating over a project's segments.
//!
//! The project stage and status are derived values. They are recomputed
//! from segment approvals on every read and stored only as a cache.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::segment::{ApprovalField, SegmentState};

/// Linear workflow position of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    ScriptGeneration,
    ImageGeneration,
    VideoGeneration,
    FinalAssembly,
    Completed,
}

impl WorkflowStage {
    pub const ALL: [WorkflowStage; 5] = [
        WorkflowStage::ScriptGeneration,
        WorkflowStage::ImageGeneration,
        WorkflowStage::VideoGeneration,
        WorkflowStage::FinalAssembly,
        WorkflowStage::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStage::ScriptGeneration => "script_generation",
            WorkflowStage::ImageGeneration => "image_generation",
            WorkflowStage::VideoGeneration => "video_generation",
            WorkflowStage::FinalAssembly => "final_assembly",
            WorkflowStage::Completed => "completed",
        }
    }

    /// Field that must be approved on every segment to leave this stage.
    pub fn gate_field(self) -> Option<ApprovalField> {
        match self {
            WorkflowStage::ScriptGeneration => Some(ApprovalField::Script),
            WorkflowStage::ImageGeneration => Some(ApprovalField::Image),
            WorkflowStage::VideoGeneration => Some(ApprovalField::Video),
            WorkflowStage::FinalAssembly => Some(ApprovalField::Final),
            WorkflowStage::Completed => None,
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid workflow stage '{s}'")))
    }
}

/// Aggregate project status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProjectStatus::Draft),
            "completed" => Ok(ProjectStatus::Completed),
            other => Err(CoreError::Validation(format!("Invalid project status '{other}'"))),
        }
    }
}

/// A reviewable stage as seen by the approve/reject intents. The script
/// stage approves the script and its narration audio together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStage {
    Script,
    Image,
    Video,
    Final,
}

impl ReviewStage {
    pub fn fields(self) -> &'static [ApprovalField] {
        match self {
            ReviewStage::Script => &[ApprovalField::Script, ApprovalField::Audio],
            ReviewStage::Image => &[ApprovalField::Image],
            ReviewStage::Video => &[ApprovalField::Video],
            ReviewStage::Final => &[ApprovalField::Final],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReviewStage::Script => "script",
            ReviewStage::Image => "image",
            ReviewStage::Video => "video",
            ReviewStage::Final => "final",
        }
    }
}

impl FromStr for ReviewStage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "script" => Ok(ReviewStage::Script),
            "image" => Ok(ReviewStage::Image),
            "video" => Ok(ReviewStage::Video),
            "final" => Ok(ReviewStage::Final),
            other => Err(CoreError::Validation(format!(
                "Invalid review stage '{other}'. Must be one of: script, image, video, final"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Gate functions
// ---------------------------------------------------------------------------

/// Every segment has `field` approved. Vacuously true for no segments;
/// use [`can_advance`] when an empty project must not count as complete.
pub fn all_approved(segments: &[SegmentState], field: ApprovalField) -> bool {
    segments.iter().all(|s| s.status(field).is_ready_for_next())
}

/// Furthest stage the project is in, evaluated as a strict linear gate.
pub fn current_stage(segments: &[SegmentState]) -> WorkflowStage {
    if segments.is_empty() {
        return WorkflowStage::ScriptGeneration;
    }
    WorkflowStage::ALL
        .into_iter()
        .find(|stage| match stage.gate_field() {
            Some(field) => !all_approved(segments, field),
            None => true,
        })
        .unwrap_or(WorkflowStage::Completed)
}

pub fn project_status(segments: &[SegmentState]) -> ProjectStatus {
    if can_advance(segments, ApprovalField::Final) {
        ProjectStatus::Completed
    } else {
        ProjectStatus::Draft
    }
}

/// Non-empty and every segment has `field` approved.
pub fn can_advance(segments: &[SegmentState], field: ApprovalField) -> bool {
    !segments.is_empty() && all_approved(segments, field)
}

/// Derived stage and status, computed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    pub current_stage: WorkflowStage,
    pub status: ProjectStatus,
}

pub fn summarize(segments: &[SegmentState]) -> StageSummary {
    StageSummary {
        current_stage: current_stage(segments),
        status: project_status(segments),
    }
}

impl StageSummary {
    /// Whether a cached copy differs and needs a write-through.
    pub fn differs_from(&self, cached_stage: WorkflowStage, cached_status: ProjectStatus) -> bool {
        self.current_stage != cached_stage || self.status != cached_status
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::ApprovalStatus::*;
    use crate::segment::tests::segment;

    fn approve(segments: &mut [SegmentState], field: ApprovalField) {
        for s in segments.iter_mut() {
            s.set_status(field, Approved);
        }
    }

    #[test]
    fn empty_project_is_at_script_generation_and_draft() {
        assert_eq!(current_stage(&[]), WorkflowStage::ScriptGeneration);
        assert_eq!(project_status(&[]), ProjectStatus::Draft);
        assert!(all_approved(&[], ApprovalField::Final));
        assert!(!can_advance(&[], ApprovalField::Final));
    }

    #[test]
    fn single_draft_segment_stays_at_script_generation() {
        let mut segs = vec![segment(1)];
        assert_eq!(current_stage(&segs), WorkflowStage::ScriptGeneration);

        segs[0].script_approval_status = Approved;
        segs[0].audio_approval_status = Approved;
        assert_eq!(current_stage(&segs), WorkflowStage::ImageGeneration);
        assert!(!all_approved(&segs, ApprovalField::Image));
    }

    #[test]
    fn stage_is_non_decreasing_under_forward_approvals() {
        let mut segs = vec![segment(1), segment(2), segment(3)];
        let mut last = current_stage(&segs);

        for field in [
            ApprovalField::Script,
            ApprovalField::Image,
            ApprovalField::Video,
            ApprovalField::Final,
        ] {
            for i in 0..segs.len() {
                segs[i].set_status(field, Approved);
                let now = current_stage(&segs);
                assert!(now >= last, "{now} regressed from {last}");
                last = now;
            }
        }
        assert_eq!(last, WorkflowStage::Completed);
        assert_eq!(project_status(&segs), ProjectStatus::Completed);
    }

    #[test]
    fn later_approvals_cannot_jump_the_gate() {
        let mut segs = vec![segment(1), segment(2)];
        approve(&mut segs, ApprovalField::Image);
        approve(&mut segs, ApprovalField::Video);
        approve(&mut segs, ApprovalField::Final);
        segs[1].script_approval_status = Rejected;

        assert_eq!(current_stage(&segs), WorkflowStage::ScriptGeneration);
        assert_eq!(project_status(&segs), ProjectStatus::Completed);
    }

    #[test]
    fn revoking_an_approval_regresses_the_stage() {
        let mut segs = vec![segment(1)];
        approve(&mut segs, ApprovalField::Script);
        approve(&mut segs, ApprovalField::Image);
        assert_eq!(current_stage(&segs), WorkflowStage::VideoGeneration);

        segs[0].image_approval_status = Draft;
        assert_eq!(current_stage(&segs), WorkflowStage::ImageGeneration);
    }

    #[test]
    fn summary_detects_stale_cache() {
        let segs = vec![segment(1)];
        let summary = summarize(&segs);
        assert!(!summary.differs_from(WorkflowStage::ScriptGeneration, ProjectStatus::Draft));
        assert!(summary.differs_from(WorkflowStage::Completed, ProjectStatus::Completed));
    }

    #[test]
    fn review_stage_field_mapping() {
        assert_eq!(
            ReviewStage::Script.fields(),
            &[ApprovalField::Script, ApprovalField::Audio]
        );
        assert_eq!("video".parse::<ReviewStage>().unwrap(), ReviewStage::Video);
        assert!("audio".parse::<ReviewStage>().is_err());
    }
}
