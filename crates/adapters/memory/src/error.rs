//! Storage-specific error type for the in-memory adapter.

use scenehub_domain::error::SceneHubError;
use scenehub_domain::id::TaskId;

/// Errors originating from the in-memory storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A result was recorded for a task whose start was never recorded.
    #[error("no execution record for task {0}")]
    UnknownTask(TaskId),
}

impl From<StorageError> for SceneHubError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
