//! Asynchronous video generation contract: submit, poll, cancel.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storyreel_core::task::{RemoteTaskState, TaskStatus};
use storyreel_core::types::TaskHandle;

use crate::error::ProviderError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoMode {
    #[default]
    Standard,
    Pro,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoRequest {
    pub image_url: String,
    pub prompt: String,
    pub duration_secs: u32,
    pub negative_prompt: Option<String>,
    pub mode: VideoMode,
}

/// Acknowledgement of a submitted task.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoSubmission {
    pub task_id: TaskHandle,
    pub status: TaskStatus,
}

#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Start a generation task. Returns as soon as the service accepts it.
    async fn submit(&self, request: &VideoRequest) -> Result<VideoSubmission, ProviderError>;

    /// Current state of a task.
    async fn poll(&self, task_id: &str) -> Result<RemoteTaskState, ProviderError>;

    async fn cancel(&self, task_id: &str) -> Result<(), ProviderError>;
}
