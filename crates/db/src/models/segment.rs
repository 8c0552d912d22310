//! Segment entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storyreel_core::candidate::{MediaCandidate, MediaKind};
use storyreel_core::error::CoreError;
use storyreel_core::segment::SegmentState;
use storyreel_core::types::{DbId, Timestamp};

/// A segment row from the `segments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Segment {
    pub id: DbId,
    pub project_id: DbId,
    pub order_index: i32,
    pub script: String,
    pub video_prompt: Option<String>,
    pub script_approval_status: String,
    pub image_approval_status: String,
    pub video_approval_status: String,
    pub audio_approval_status: String,
    pub final_approval_status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Segment {
    /// Build the domain state from this row and the segment's candidates.
    ///
    /// Candidates belonging to other segments are ignored; the rest are
    /// partitioned by kind, keeping their input order.
    pub fn into_state(self, candidates: Vec<MediaCandidate>) -> Result<SegmentState, CoreError> {
        let mut state = SegmentState {
            id: self.id,
            project_id: self.project_id,
            order: self.order_index,
            script: self.script,
            video_prompt: self.video_prompt,
            script_approval_status: self.script_approval_status.parse()?,
            image_approval_status: self.image_approval_status.parse()?,
            video_approval_status: self.video_approval_status.parse()?,
            audio_approval_status: self.audio_approval_status.parse()?,
            final_approval_status: self.final_approval_status.parse()?,
            images: Vec::new(),
            videos: Vec::new(),
            audios: Vec::new(),
        };
        for candidate in candidates.into_iter().filter(|c| c.segment_id == self.id) {
            let list: &mut Vec<MediaCandidate> = match candidate.kind {
                MediaKind::Image => &mut state.images,
                MediaKind::Video => &mut state.videos,
                MediaKind::Audio => &mut state.audios,
            };
            list.push(candidate);
        }
        Ok(state)
    }
}

/// DTO for one segment produced by script generation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSegment {
    pub order_index: i32,
    pub script: String,
    pub video_prompt: Option<String>,
}
