//! Queue server — the single loop that dispatches due tasks.
//!
//! The loop owns a wake-up timer. When the earliest task is not due yet the
//! timer is armed for exactly the remaining time; when the heap is empty it
//! idles for [`IDLE_TICK`]; after a dispatch, or whenever a task is pushed,
//! it re-checks after [`DEFAULT_TICK`]. Due tasks run on their own tokio task
//! so a slow body never delays the loop.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Notify, watch};

use scenehub_domain::id::TaskId;
use scenehub_domain::time::Timestamp;

use super::heap::PriorityQueue;
use crate::ports::Clock;
use crate::task::{Task, TaskHandle};

/// Re-check interval after a dispatch or a push.
pub const DEFAULT_TICK: Duration = Duration::from_micros(200);

/// Sleep interval when nothing is queued.
pub const IDLE_TICK: Duration = Duration::from_secs(5 * 60);

/// Result of one scheduling step.
#[derive(Debug)]
pub enum Tick {
    /// Nothing is queued.
    Idle,
    /// The earliest task becomes due after this duration.
    Wait(Duration),
    /// This task is due and has been taken off the heap.
    Ready(Task),
}

#[derive(Default)]
struct Inner {
    heap: Mutex<PriorityQueue>,
    notify: Notify,
}

/// Shared handle to the task queue. Clones refer to the same queue.
#[derive(Clone, Default)]
pub struct QueueServer {
    inner: Arc<Inner>,
}

impl QueueServer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task and wake the loop.
    pub fn push(&self, task: Task) -> TaskId {
        let id = task.id();
        tracing::debug!(task_id = %id, task = %task.handle().value, at = %task.priority(), "task queued");
        self.lock().push(task);
        self.inner.notify.notify_one();
        id
    }

    /// Drop a queued task. Returns `false` if it already left the queue.
    pub fn remove(&self, id: TaskId) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Move a queued task to a new due instant and wake the loop.
    pub fn reschedule(&self, id: TaskId, at: Timestamp) -> bool {
        let moved = self.lock().update(id, at);
        if moved {
            self.inner.notify.notify_one();
        }
        moved
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Handles of every queued task, earliest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TaskHandle> {
        self.lock().snapshot()
    }

    /// Take the earliest task if it is due at `now`.
    #[must_use]
    pub fn tick(&self, now: Timestamp) -> Tick {
        let mut heap = self.lock();
        let Some(task) = heap.pop() else {
            return Tick::Idle;
        };
        if task.priority() > now {
            let wait = (task.priority() - now).to_std().unwrap_or(DEFAULT_TICK);
            heap.push(task);
            return Tick::Wait(wait);
        }
        Tick::Ready(task)
    }

    /// Dispatch due tasks until `shutdown` turns `true` or its sender drops.
    ///
    /// Due-ness is judged against `clock`, the same source the priorities were
    /// computed from. In-flight task bodies are not cancelled on shutdown.
    pub async fn run<C>(&self, clock: &C, mut shutdown: watch::Receiver<bool>)
    where
        C: Clock + ?Sized,
    {
        tracing::info!("task queue started");
        let mut wait = DEFAULT_TICK;
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                () = self.inner.notify.notified() => {
                    wait = DEFAULT_TICK;
                    continue;
                }
                () = tokio::time::sleep(wait) => {}
            }

            wait = match self.tick(clock.now().with_timezone(&Utc)) {
                Tick::Idle => IDLE_TICK,
                Tick::Wait(remaining) => remaining,
                Tick::Ready(task) => {
                    tracing::debug!(task_id = %task.id(), task = %task.handle().value, "dispatching task");
                    tokio::spawn(async move {
                        let _ = task.run().await;
                    });
                    DEFAULT_TICK
                }
            };
        }
        tracing::info!(pending = self.len(), "task queue stopped");
    }

    fn lock(&self) -> MutexGuard<'_, PriorityQueue> {
        self.inner
            .heap
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
