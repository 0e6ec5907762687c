//! Deferred entity construction
//!
//! The placement search never creates entities itself. It queues tasks that
//! the host runs later on its own thread against an [`EntityHost`], which
//! keeps entity mutation single-threaded.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::concept::EntityDesc;

/// Host side of entity construction
pub trait EntityHost {
    /// Construct and link an entity
    fn spawn(&mut self, desc: EntityDesc);
}

impl EntityHost for Vec<EntityDesc> {
    fn spawn(&mut self, desc: EntityDesc) {
        self.push(desc);
    }
}

/// A deferred unit of host work
pub type Task = Box<dyn FnOnce(&mut dyn EntityHost) + Send>;

/// Thread-safe FIFO of deferred tasks
#[derive(Default)]
pub struct TaskQueue {
    tasks: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task; callable from any thread
    pub fn enqueue<F>(&self, task: F)
    where
        F: FnOnce(&mut dyn EntityHost) + Send + 'static,
    {
        self.tasks.lock().push_back(Box::new(task));
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    /// Run every queued task in order on the calling thread. Tasks queued
    /// while running wait for the next call.
    pub fn run_pending(&self, host: &mut dyn EntityHost) -> usize {
        let pending = std::mem::take(&mut *self.tasks.lock());
        let count = pending.len();
        for task in pending {
            task(host);
        }
        count
    }
}
