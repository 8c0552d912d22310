//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod candidate_repo;
pub mod project_repo;
pub mod segment_repo;
pub mod status_change_repo;

pub use candidate_repo::{CandidateRepo, SelectOutcome};
pub use project_repo::ProjectRepo;
pub use segment_repo::{ApplyOutcome, SegmentRepo};
pub use status_change_repo::StatusChangeRepo;
