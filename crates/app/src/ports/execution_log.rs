//! Execution-log port — records the outcome of every scheduled task.

use std::future::Future;
use std::sync::Arc;

use scenehub_domain::error::SceneHubError;
use scenehub_domain::id::TaskId;
use scenehub_domain::task_log::{LogTarget, TaskOutcome};

pub trait ExecutionLog {
    /// A task started executing.
    fn record_task_start(
        &self,
        task_id: TaskId,
        parent_id: Option<TaskId>,
        target: LogTarget,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send;

    /// A task finished; `error` carries the failure message, if any.
    fn record_task_result(
        &self,
        task_id: TaskId,
        outcome: TaskOutcome,
        error: Option<String>,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send;
}

impl<T: ExecutionLog + Send + Sync> ExecutionLog for Arc<T> {
    fn record_task_start(
        &self,
        task_id: TaskId,
        parent_id: Option<TaskId>,
        target: LogTarget,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        (**self).record_task_start(task_id, parent_id, target)
    }

    fn record_task_result(
        &self,
        task_id: TaskId,
        outcome: TaskOutcome,
        error: Option<String>,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        (**self).record_task_result(task_id, outcome, error)
    }
}
