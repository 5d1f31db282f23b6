use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use gramsieve_common::WorkItem;

/// Thread-safe pool of pending work items. The queue is seeded once at
/// startup and only drained: items are claimed by exactly one worker and
/// never re-enqueued.
pub struct WorkQueue {
    items: Mutex<VecDeque<WorkItem>>,
}

impl WorkQueue {
    pub fn new(items: Vec<WorkItem>) -> Self {
        Self {
            items: Mutex::new(items.into()),
        }
    }

    /// Non-blocking claim. `None` means the queue is exhausted.
    pub fn claim(&self) -> Option<WorkItem> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<WorkItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
