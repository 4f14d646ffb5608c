//! Task registry
//!
//! Correlates one client request with the single response line that
//! eventually completes it. Every pending task owns a single-assignment
//! result slot: the first completion wins, any later attempt is a no-op,
//! because a dispatch retry may race a slow original response.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tokio::sync::oneshot;

struct PendingTask {
    operation: String,
    created_at: Instant,
    sender: oneshot::Sender<String>,
}

/// Coordinator-side registry of in-flight tasks.
pub struct TaskRegistry {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, PendingTask>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a task id without registering a pending task. Used for
    /// responses to malformed requests, which never become tasks.
    pub fn next_task_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Register a new task and hand back the receiving end of its result
    /// slot. The caller awaits the receiver under its own deadline.
    pub fn register(&self, operation: &str) -> (u64, oneshot::Receiver<String>) {
        let task_id = self.next_task_id();
        let (sender, receiver) = oneshot::channel();
        let task = PendingTask {
            operation: operation.to_string(),
            created_at: Instant::now(),
            sender,
        };
        self.pending.lock().unwrap().insert(task_id, task);
        (task_id, receiver)
    }

    /// Complete a task with its response line. Returns false when the task
    /// was already completed or removed, in which case the line is dropped.
    pub fn complete(&self, task_id: u64, line: String) -> bool {
        let task = self.pending.lock().unwrap().remove(&task_id);
        match task {
            Some(task) => {
                tracing::debug!(
                    "task {} ({}) completed after {:?}",
                    task_id,
                    task.operation,
                    task.created_at.elapsed()
                );
                task.sender.send(line).is_ok()
            }
            None => false,
        }
    }

    /// Drop a task that will never be completed (timeout already delivered
    /// to the client). A late completion then becomes a no-op.
    pub fn remove(&self, task_id: u64) {
        self.pending.lock().unwrap().remove(&task_id);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}
