use storyreel_core::error::CoreError;
use storyreel_providers::ProviderError;

/// Errors raised by a [`WorkflowStore`](crate::store::WorkflowStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A domain rule enforced at the storage boundary: missing rows,
    /// compare-and-set conflicts, unselectable candidates, corrupt values.
    #[error(transparent)]
    Domain(#[from] CoreError),
}

/// Unified error for workflow operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Store(sqlx::Error),

    #[error("Upstream service error: {0}")]
    Upstream(#[from] ProviderError),
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => WorkflowError::Store(e),
            StoreError::Domain(e) => WorkflowError::Core(e),
        }
    }
}

impl From<sqlx::Error> for WorkflowError {
    fn from(err: sqlx::Error) -> Self {
        WorkflowError::Store(err)
    }
}
