//! Execution log records for scheduled tasks.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SceneHubError;
use crate::id::{DeviceId, SceneId, TaskId};
use crate::time::Timestamp;

/// What a scheduled task acted upon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogTarget {
    Scene {
        id: SceneId,
        name: String,
        auto_run: bool,
    },
    Device {
        id: DeviceId,
        name: String,
    },
    /// Engine-internal work such as the daily arrangement.
    Internal { label: String },
}

impl fmt::Display for LogTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scene {
                name,
                auto_run: true,
                ..
            } => write!(f, "auto scene {name:?}"),
            Self::Scene { name, .. } => write!(f, "manual scene {name:?}"),
            Self::Device { name, .. } => write!(f, "device {name:?}"),
            Self::Internal { label } => f.write_str(label),
        }
    }
}

/// Final classification of a task execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Success,
    PartialSuccess,
    Failed,
    Timeout,
    DeviceAlreadyDeleted,
    DeviceOffline,
    SceneAlreadyDeleted,
}

impl TaskOutcome {
    /// Classify the result returned by a task body.
    #[must_use]
    pub fn from_result(result: &Result<(), SceneHubError>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(SceneHubError::NotFound(err)) if err.is_scene() => Self::SceneAlreadyDeleted,
            Err(SceneHubError::NotFound(err)) if err.is_device() => Self::DeviceAlreadyDeleted,
            Err(SceneHubError::DeviceOffline(_)) => Self::DeviceOffline,
            Err(SceneHubError::Timeout(_)) => Self::Timeout,
            Err(_) => Self::Failed,
        }
    }

    /// Aggregate the outcomes of sibling tasks into one.
    ///
    /// `None` when there is nothing to aggregate. All successes yield
    /// `Success`, a mix yields `PartialSuccess`, and uniform failures keep
    /// their shared reason; mixed failures collapse to `Failed`.
    #[must_use]
    pub fn summarize(outcomes: &[Self]) -> Option<Self> {
        let first = *outcomes.first()?;
        let successes = outcomes.iter().filter(|o| o.is_success()).count();
        let summary = if successes == outcomes.len() {
            Self::Success
        } else if successes > 0 {
            Self::PartialSuccess
        } else if outcomes.iter().all(|o| *o == first) {
            first
        } else {
            Self::Failed
        };
        Some(summary)
    }

    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::PartialSuccess => "partial_success",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::DeviceAlreadyDeleted => "device_already_deleted",
            Self::DeviceOffline => "device_offline",
            Self::SceneAlreadyDeleted => "scene_already_deleted",
        })
    }
}

/// One execution of one scheduled task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLog {
    pub task_id: TaskId,
    pub parent_id: Option<TaskId>,
    pub target: LogTarget,
    /// Outcome of the task's own body. `None` while running.
    pub outcome: Option<TaskOutcome>,
    pub error: Option<String>,
    /// Aggregate over finished child tasks, kept apart from `outcome`.
    pub children_outcome: Option<TaskOutcome>,
    pub created_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl TaskLog {
    #[must_use]
    pub fn started(
        task_id: TaskId,
        parent_id: Option<TaskId>,
        target: LogTarget,
        at: Timestamp,
    ) -> Self {
        Self {
            task_id,
            parent_id,
            target,
            outcome: None,
            error: None,
            children_outcome: None,
            created_at: at,
            finished_at: None,
        }
    }

    pub fn finish(&mut self, outcome: TaskOutcome, error: Option<String>, at: Timestamp) {
        self.outcome = Some(outcome);
        self.error = error;
        self.finished_at = Some(at);
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }
}
