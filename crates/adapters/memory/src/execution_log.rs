//! In-memory implementation of [`ExecutionLog`].
//!
//! Each task gets one [`TaskLog`] record. When a child task finishes, the
//! parent's `children_outcome` is recomputed from every finished sibling, so
//! a scene firing reports whether its commands succeeded without touching
//! the outcome of the firing itself.
//!
//! The log keeps at most `capacity` records. Starting a task beyond that
//! evicts the oldest record.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use scenehub_app::ports::ExecutionLog;
use scenehub_domain::error::SceneHubError;
use scenehub_domain::id::TaskId;
use scenehub_domain::task_log::{LogTarget, TaskLog, TaskOutcome};

use crate::error::StorageError;

/// Number of records kept by [`InMemoryExecutionLog::new`].
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Default)]
struct Records {
    by_id: HashMap<TaskId, TaskLog>,
    /// Task ids in start order.
    order: VecDeque<TaskId>,
}

/// In-memory execution log.
pub struct InMemoryExecutionLog {
    records: RwLock<Records>,
    capacity: usize,
}

impl Default for InMemoryExecutionLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl InMemoryExecutionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log retaining the `capacity` most recently started tasks.
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RwLock::new(Records::default()),
            capacity: capacity.max(1),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn get(&self, task_id: TaskId) -> Option<TaskLog> {
        self.read().by_id.get(&task_id).cloned()
    }

    /// Records whose parent is `parent_id`, in start order.
    #[must_use]
    pub fn children_of(&self, parent_id: TaskId) -> Vec<TaskLog> {
        let records = self.read();
        records
            .order
            .iter()
            .filter_map(|id| records.by_id.get(id))
            .filter(|log| log.parent_id == Some(parent_id))
            .cloned()
            .collect()
    }

    /// Every record, in start order.
    #[must_use]
    pub fn all(&self) -> Vec<TaskLog> {
        let records = self.read();
        records
            .order
            .iter()
            .filter_map(|id| records.by_id.get(id))
            .cloned()
            .collect()
    }

    fn finish(
        &self,
        task_id: TaskId,
        outcome: TaskOutcome,
        error: Option<String>,
    ) -> Result<(), StorageError> {
        let mut records = self.write();
        let log = records
            .by_id
            .get_mut(&task_id)
            .ok_or(StorageError::UnknownTask(task_id))?;
        log.finish(outcome, error, scenehub_domain::time::now());
        let parent_id = log.parent_id;

        if let Some(parent_id) = parent_id {
            let siblings: Vec<TaskOutcome> = records
                .by_id
                .values()
                .filter(|log| log.parent_id == Some(parent_id))
                .filter_map(|log| log.outcome)
                .collect();
            if let Some(parent) = records.by_id.get_mut(&parent_id) {
                parent.children_outcome = TaskOutcome::summarize(&siblings);
            }
        }
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Records> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Records> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ExecutionLog for InMemoryExecutionLog {
    fn record_task_start(
        &self,
        task_id: TaskId,
        parent_id: Option<TaskId>,
        target: LogTarget,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        tracing::debug!(%task_id, %target, "task started");
        let log = TaskLog::started(task_id, parent_id, target, scenehub_domain::time::now());
        let mut records = self.write();
        if records.by_id.insert(task_id, log).is_none() {
            records.order.push_back(task_id);
        }
        while records.order.len() > self.capacity {
            if let Some(evicted) = records.order.pop_front() {
                records.by_id.remove(&evicted);
            }
        }
        drop(records);
        async { Ok(()) }
    }

    fn record_task_result(
        &self,
        task_id: TaskId,
        outcome: TaskOutcome,
        error: Option<String>,
    ) -> impl Future<Output = Result<(), SceneHubError>> + Send {
        tracing::debug!(%task_id, %outcome, "task finished");
        let r = self
            .finish(task_id, outcome, error)
            .map_err(SceneHubError::from);
        async { r }
    }
}
