//! Row models and create DTOs.
//!
//! Enumerated columns are stored as TEXT and converted into the domain
//! types from `storyreel-core` at the repository boundary.

pub mod candidate;
pub mod project;
pub mod segment;
pub mod status_change;
