use std::sync::Arc;

use storyreel_pipeline::{TaskTracker, WorkflowController};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<WorkflowController>,
    pub tracker: Arc<TaskTracker>,
    pub config: Arc<ServerConfig>,
}
