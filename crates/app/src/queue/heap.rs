//! Binary min-heap of tasks keyed by their due instant.
//!
//! The heap keeps a position index so queued tasks can be removed or
//! re-prioritized by id in O(log n). Ties between equal instants are broken
//! arbitrarily.

use std::collections::HashMap;

use scenehub_domain::id::TaskId;
use scenehub_domain::time::Timestamp;

use crate::task::{Task, TaskHandle};

#[derive(Debug, Default)]
pub struct PriorityQueue {
    items: Vec<Task>,
    positions: HashMap<TaskId, usize>,
}

impl PriorityQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: TaskId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn push(&mut self, task: Task) {
        let index = self.items.len();
        self.positions.insert(task.id(), index);
        self.items.push(task);
        self.sift_up(index);
    }

    /// The task that becomes due first.
    #[must_use]
    pub fn peek(&self) -> Option<&Task> {
        self.items.first()
    }

    pub fn pop(&mut self) -> Option<Task> {
        self.remove_at(0)
    }

    /// Remove a queued task by id.
    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        let index = *self.positions.get(&id)?;
        self.remove_at(index)
    }

    /// Move a queued task to a new due instant. Returns `false` when the
    /// task is not queued.
    pub fn update(&mut self, id: TaskId, at: Timestamp) -> bool {
        let Some(&index) = self.positions.get(&id) else {
            return false;
        };
        self.items[index].set_priority(at);
        self.fix(index);
        true
    }

    /// Handles of every queued task, earliest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TaskHandle> {
        let mut handles: Vec<_> = self.items.iter().map(|t| t.handle().clone()).collect();
        handles.sort_by_key(|h| h.priority);
        handles
    }

    fn remove_at(&mut self, index: usize) -> Option<Task> {
        if index >= self.items.len() {
            return None;
        }
        let last = self.items.len() - 1;
        self.swap(index, last);
        let task = self.items.pop()?;
        self.positions.remove(&task.id());
        if index < self.items.len() {
            self.fix(index);
        }
        Some(task)
    }

    fn fix(&mut self, index: usize) {
        if !self.sift_down(index) {
            self.sift_up(index);
        }
    }

    fn less(&self, a: usize, b: usize) -> bool {
        self.items[a].priority() < self.items[b].priority()
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.items.swap(a, b);
        self.positions.insert(self.items[a].id(), a);
        self.positions.insert(self.items[b].id(), b);
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if !self.less(index, parent) {
                break;
            }
            self.swap(index, parent);
            index = parent;
        }
    }

    /// Returns `true` when the element moved.
    fn sift_down(&mut self, start: usize) -> bool {
        let len = self.items.len();
        let mut index = start;
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(child, index) {
                break;
            }
            self.swap(index, child);
            index = child;
        }
        index > start
    }
}
