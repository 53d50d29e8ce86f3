// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Ordered single-consumer execution queue.
//!
//! Work submitted to an [`ExecutionQueue`] runs one unit at a time, in
//! submission order, on a dedicated Tokio task, regardless of which task
//! submitted it. The queue can be paused (work accumulates but does not run)
//! and work can be pushed to the head so it runs next once resumed.
//!
//! The subscription engine uses two queues: one to process publish responses
//! and one to deliver notifications to monitored items.

use std::collections::VecDeque;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Tasks run back to back before the worker yields to the runtime.
const TASKS_PER_YIELD: usize = 16;

struct QueueState {
    tasks: VecDeque<Task>,
    paused: bool,
    closed: bool,
}

struct Inner {
    name: &'static str,
    state: Mutex<QueueState>,
    notify: Notify,
}

impl Inner {
    fn set_paused(&self, paused: bool) {
        self.state.lock().paused = paused;
        if !paused {
            self.notify.notify_one();
        }
    }
}

/// FIFO work queue drained by a single worker task.
pub struct ExecutionQueue {
    inner: Arc<Inner>,
}

impl ExecutionQueue {
    /// Creates a queue and spawns its worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(name: &'static str) -> Self {
        let inner = Arc::new(Inner {
            name,
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                paused: false,
                closed: false,
            }),
            notify: Notify::new(),
        });

        tokio::spawn(run_worker(Arc::clone(&inner)));

        Self { inner }
    }

    /// Appends `task` to the tail of the queue.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Box::new(task), false);
    }

    /// Pushes `task` to the head of the queue so it runs next.
    pub fn submit_to_head<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Box::new(task), true);
    }

    fn push(&self, task: Task, head: bool) {
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                tracing::trace!(queue = self.inner.name, "Task submitted to closed queue dropped");
                return;
            }
            if head {
                state.tasks.push_front(task);
            } else {
                state.tasks.push_back(task);
            }
        }
        self.inner.notify.notify_one();
    }

    /// Stops running tasks until [`resume`](Self::resume) is called.
    pub fn pause(&self) {
        self.inner.set_paused(true);
    }

    /// Resumes running tasks.
    pub fn resume(&self) {
        self.inner.set_paused(false);
    }

    /// Pauses the queue and returns a guard that resumes it when dropped.
    ///
    /// The guard is `'static` and may be moved into a spawned task, so the
    /// queue resumes even if that task panics.
    pub fn pause_guard(&self) -> PauseGuard {
        self.pause();
        PauseGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Returns `true` if the queue is paused.
    pub fn is_paused(&self) -> bool {
        self.inner.state.lock().paused
    }

    /// Number of tasks waiting to run.
    pub fn len(&self) -> usize {
        self.inner.state.lock().tasks.len()
    }

    /// Returns `true` if no tasks are waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops pending tasks and stops the worker.
    pub fn close(&self) {
        {
            let mut state = self.inner.state.lock();
            state.closed = true;
            state.tasks.clear();
        }
        self.inner.notify.notify_one();
    }
}

impl Drop for ExecutionQueue {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ExecutionQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ExecutionQueue")
            .field("name", &self.inner.name)
            .field("pending", &state.tasks.len())
            .field("paused", &state.paused)
            .field("closed", &state.closed)
            .finish()
    }
}

/// Resumes an [`ExecutionQueue`] when dropped.
#[must_use = "the queue resumes as soon as the guard is dropped"]
pub struct PauseGuard {
    inner: Arc<Inner>,
}

impl Drop for PauseGuard {
    fn drop(&mut self) {
        self.inner.set_paused(false);
    }
}

impl fmt::Debug for PauseGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PauseGuard")
            .field("queue", &self.inner.name)
            .finish()
    }
}

async fn run_worker(inner: Arc<Inner>) {
    let mut ran = 0usize;
    loop {
        let next = {
            let mut state = inner.state.lock();
            if state.closed {
                break;
            }
            if state.paused {
                None
            } else {
                state.tasks.pop_front()
            }
        };

        match next {
            Some(task) => {
                if std::panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                    tracing::error!(queue = inner.name, "Queued task panicked");
                }
                ran += 1;
                if ran % TASKS_PER_YIELD == 0 {
                    tokio::task::yield_now().await;
                }
            }
            None => {
                ran = 0;
                inner.notify.notified().await;
            }
        }
    }

    tracing::trace!(queue = inner.name, "Execution queue worker stopped");
}

// =============================================================================
// Tests
// =============================================================================
