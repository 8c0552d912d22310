//! Project entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use storyreel_core::error::CoreError;
use storyreel_core::stage::{ProjectStatus, WorkflowStage};
use storyreel_core::types::{DbId, Timestamp};

/// A project row from the `projects` table.
///
/// `current_stage` and `status` are a cache of values derived from the
/// project's segments.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub current_stage: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Project {
    pub fn cached_stage(&self) -> Result<WorkflowStage, CoreError> {
        self.current_stage.parse()
    }

    pub fn cached_status(&self) -> Result<ProjectStatus, CoreError> {
        self.status.parse()
    }
}

/// DTO for creating a new project.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
}
