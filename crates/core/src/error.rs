use crate::approval::ApprovalStatus;
use crate::segment::ApprovalField;
use crate::types::DbId;

/// Domain error taxonomy shared by every layer above the core.
///
/// Validation-type errors (`NotFound`, `InvalidTransition`, `Precondition`,
/// `Validation`) are always raised before any mutation is attempted.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Unknown task handle: {0}")]
    UnknownTask(String),

    #[error("Invalid transition for {field}: {from} -> {to}")]
    InvalidTransition {
        field: ApprovalField,
        from: ApprovalStatus,
        to: ApprovalStatus,
    },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
