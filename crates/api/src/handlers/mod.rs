pub mod candidate;
pub mod project;
pub mod segment;
pub mod task;
