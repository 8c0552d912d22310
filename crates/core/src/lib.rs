//! Storyreel workflow domain.
//!
//! Pure types and functions with no I/O: the approval state machine,
//! media candidate selection, stage gating, async task reconciliation,
//! and the status change audit model. Persistence and external services
//! live in `storyreel-db`, `storyreel-providers` and `storyreel-pipeline`.

pub mod approval;
pub mod audit;
pub mod candidate;
pub mod error;
pub mod segment;
pub mod stage;
pub mod task;
pub mod types;
