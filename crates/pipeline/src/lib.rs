//! Workflow orchestration.
//!
//! [`WorkflowController`] applies approve/reject intents and generation
//! requests; [`TaskTracker`] owns the submit/poll/cancel protocol for
//! video tasks; [`TaskSweeper`] reconciles every in-flight task in the
//! background. All of them reach persistence through [`WorkflowStore`].

pub mod config;
pub mod controller;
pub mod error;
mod review;
pub mod store;
pub mod sweeper;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use config::TrackerConfig;
pub use controller::WorkflowController;
pub use error::{StoreError, WorkflowError};
pub use store::memory::MemoryStore;
pub use store::postgres::PgStore;
pub use store::WorkflowStore;
pub use sweeper::TaskSweeper;
pub use tracker::TaskTracker;
