//! Task — a unit of deferred work held by the queue.
//!
//! A task owns its body, the absolute instant it becomes due (its priority),
//! an optional parent and a chain of wrappers. Wrappers decorate the body in
//! the order they were added, so the last wrapper added runs outermost.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use scenehub_domain::error::SceneHubError;
use scenehub_domain::id::TaskId;
use scenehub_domain::time::Timestamp;

pub type TaskResult = Result<(), SceneHubError>;

/// Boxed future returned by a task body.
pub type TaskFuture = Pin<Box<dyn Future<Output = TaskResult> + Send>>;

/// Type-erased task body.
pub type TaskFn = Box<dyn FnOnce(TaskHandle) -> TaskFuture + Send>;

/// Decorator applied around a task body before it runs.
pub type TaskWrapper = Box<dyn FnOnce(TaskFn) -> TaskFn + Send>;

/// Metadata describing a task, handed to its body and wrappers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub id: TaskId,
    pub parent_id: Option<TaskId>,
    /// Instant at which the task becomes due.
    pub priority: Timestamp,
    /// Free-form label, used in logs.
    pub value: String,
}

pub struct Task {
    handle: TaskHandle,
    func: TaskFn,
    wrappers: Vec<TaskWrapper>,
}

impl Task {
    /// Create a task that becomes due at `at`.
    pub fn new_at<F, Fut>(at: Timestamp, func: F) -> Self
    where
        F: FnOnce(TaskHandle) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        Self {
            handle: TaskHandle {
                id: TaskId::new(),
                parent_id: None,
                priority: at,
                value: String::new(),
            },
            func: Box::new(move |handle| -> TaskFuture { Box::pin(func(handle)) }),
            wrappers: Vec::new(),
        }
    }

    /// Create a task that becomes due `delay` after `from`.
    pub fn new_after<F, Fut>(from: Timestamp, delay: Duration, func: F) -> Self
    where
        F: FnOnce(TaskHandle) -> Fut + Send + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        let delay = chrono::TimeDelta::from_std(delay).unwrap_or(chrono::TimeDelta::MAX);
        let at = from.checked_add_signed(delay).unwrap_or(from);
        Self::new_at(at, func)
    }

    /// Record `parent` as the task that spawned this one.
    ///
    /// The parent is set once; later calls are ignored.
    #[must_use]
    pub fn with_parent(mut self, parent: &TaskHandle) -> Self {
        if self.handle.parent_id.is_none() {
            self.handle.parent_id = Some(parent.id);
        }
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.handle.value = value.into();
        self
    }

    #[must_use]
    pub fn with_wrapper<W>(mut self, wrapper: W) -> Self
    where
        W: FnOnce(TaskFn) -> TaskFn + Send + 'static,
    {
        self.wrappers.push(Box::new(wrapper));
        self
    }

    #[must_use]
    pub fn id(&self) -> TaskId {
        self.handle.id
    }

    #[must_use]
    pub fn priority(&self) -> Timestamp {
        self.handle.priority
    }

    #[must_use]
    pub fn handle(&self) -> &TaskHandle {
        &self.handle
    }

    pub(crate) fn set_priority(&mut self, at: Timestamp) {
        self.handle.priority = at;
    }

    /// Execute the wrapped body. Errors are logged and returned.
    pub async fn run(self) -> TaskResult {
        let Self {
            handle,
            func,
            wrappers,
        } = self;
        let body = wrappers.into_iter().fold(func, |inner, wrap| wrap(inner));

        let id = handle.id;
        let value = handle.value.clone();
        let result = body(handle).await;
        if let Err(err) = &result {
            tracing::warn!(%err, task_id = %id, task = %value, "task failed");
        }
        result
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("handle", &self.handle)
            .field("wrappers", &self.wrappers.len())
            .finish_non_exhaustive()
    }
}
