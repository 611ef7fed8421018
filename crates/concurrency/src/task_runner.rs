//! Bounded task queue drained by scoped worker threads.
//!
//! Used when the unit of parallelism is "one array" rather than "one index
//! range". Tasks may borrow from the caller's stack: workers live inside a
//! [`std::thread::scope`] and are joined before [`ParallelTaskRunner::scope`]
//! returns.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, error, warn};

use crate::config::ParallelConfig;

type Task<'env> = Box<dyn FnOnce() + Send + 'env>;

/// Runner metrics snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRunnerStats {
    /// Number of tasks waiting in the queue.
    pub queue_depth: usize,
    /// Number of tasks currently being executed by workers.
    pub active_tasks: usize,
    /// Tasks that ran to completion, including panicked ones.
    pub tasks_completed: u64,
    /// Tasks that panicked.
    pub tasks_failed: u64,
    /// Number of worker threads (0 when running inline).
    pub worker_count: usize,
}

/// Queue of independent closures with a bounded number in flight.
///
/// `execute` blocks while `max_pending_tasks` tasks are queued or running.
/// With parallelism disabled every task runs inline inside `execute`.
/// A panicking task is logged and counted; it never takes a worker down.
pub struct ParallelTaskRunner<'env> {
    queue: Mutex<VecDeque<Task<'env>>>,
    work_ready: Condvar,
    slot_free: Condvar,
    drain_cond: Condvar,
    shutdown: AtomicBool,
    inline: AtomicBool,
    queue_depth: AtomicUsize,
    active_tasks: AtomicUsize,
    max_pending: usize,
    tasks_completed: AtomicU64,
    tasks_failed: AtomicU64,
    worker_count: AtomicUsize,
}

impl<'env> ParallelTaskRunner<'env> {
    fn new(config: &ParallelConfig) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            work_ready: Condvar::new(),
            slot_free: Condvar::new(),
            drain_cond: Condvar::new(),
            shutdown: AtomicBool::new(false),
            inline: AtomicBool::new(!config.enabled),
            queue_depth: AtomicUsize::new(0),
            active_tasks: AtomicUsize::new(0),
            max_pending: config.max_pending_tasks.max(1),
            tasks_completed: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            worker_count: AtomicUsize::new(0),
        }
    }

    /// Run `body` with a runner whose tasks may borrow anything outliving `'env`.
    ///
    /// Workers are named `structura-task-0`, `structura-task-1`, etc. All
    /// submitted tasks have finished and all workers have exited when this
    /// returns.
    pub fn scope<R>(config: &ParallelConfig, body: impl FnOnce(&ParallelTaskRunner<'env>) -> R) -> R {
        let runner = ParallelTaskRunner::new(config);
        if runner.inline.load(Ordering::Acquire) {
            return body(&runner);
        }

        std::thread::scope(|s| {
            for i in 0..config.thread_count() {
                let worker = &runner;
                let spawned = std::thread::Builder::new()
                    .name(format!("structura-task-{}", i))
                    .spawn_scoped(s, move || worker_loop(worker));
                match spawned {
                    Ok(_) => {
                        runner.worker_count.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        warn!(target: "structura::parallel", error = %e, "Failed to spawn task worker");
                        break;
                    }
                }
            }
            if runner.worker_count.load(Ordering::Relaxed) == 0 {
                runner.inline.store(true, Ordering::Release);
            }
            debug!(
                target: "structura::parallel",
                workers = runner.worker_count.load(Ordering::Relaxed),
                "Task runner started"
            );

            // Also runs while `body` unwinds, so the scope can join its workers.
            let _stop = StopGuard { runner: &runner };
            body(&runner)
        })
    }

    /// Submit a task, blocking while the in-flight limit is reached.
    pub fn execute(&self, task: impl FnOnce() + Send + 'env) {
        if self.inline.load(Ordering::Acquire) {
            self.active_tasks.fetch_add(1, Ordering::Release);
            let _guard = ActiveTaskGuard { runner: self };
            self.run_task(Box::new(task));
            return;
        }

        let mut queue = self.queue.lock();
        while self.queue_depth.load(Ordering::Acquire) + self.active_tasks.load(Ordering::Acquire)
            >= self.max_pending
        {
            self.slot_free.wait(&mut queue);
        }
        queue.push_back(Box::new(task));
        self.queue_depth.fetch_add(1, Ordering::Release);
        drop(queue);
        self.work_ready.notify_one();
    }

    /// Block until all queued and in-flight tasks have completed.
    ///
    /// Workers remain running after this returns.
    pub fn wait(&self) {
        let mut queue = self.queue.lock();
        while self.queue_depth.load(Ordering::Acquire) > 0
            || self.active_tasks.load(Ordering::Acquire) > 0
        {
            self.drain_cond.wait(&mut queue);
        }
    }

    /// Return a snapshot of runner metrics.
    pub fn stats(&self) -> TaskRunnerStats {
        TaskRunnerStats {
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
            worker_count: self.worker_count.load(Ordering::Relaxed),
        }
    }

    fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        // Holding the lock while notifying: a worker between its shutdown
        // check and `wait` still holds it, so the wakeup cannot be lost.
        let _queue = self.queue.lock();
        self.work_ready.notify_all();
    }

    fn run_task(&self, task: Task<'env>) {
        if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)) {
            self.tasks_failed.fetch_add(1, Ordering::Relaxed);
            error!(
                target: "structura::parallel",
                "task panicked: {:?}",
                e.downcast_ref::<&str>().copied().unwrap_or("(non-string panic)")
            );
        }
    }
}

/// RAII guard that decrements `active_tasks` and wakes waiters on drop.
///
/// Bookkeeping stays correct even if a task panics past `catch_unwind`.
/// Drains the queue and releases the workers when dropped
struct StopGuard<'r, 'env> {
    runner: &'r ParallelTaskRunner<'env>,
}

impl Drop for StopGuard<'_, '_> {
    fn drop(&mut self) {
        self.runner.wait();
        self.runner.stop();
    }
}

struct ActiveTaskGuard<'r, 'env> {
    runner: &'r ParallelTaskRunner<'env>,
}

impl Drop for ActiveTaskGuard<'_, '_> {
    fn drop(&mut self) {
        let runner = self.runner;
        runner.active_tasks.fetch_sub(1, Ordering::Release);
        runner.tasks_completed.fetch_add(1, Ordering::Relaxed);

        let _queue = runner.queue.lock();
        runner.slot_free.notify_one();
        if runner.queue_depth.load(Ordering::Acquire) == 0
            && runner.active_tasks.load(Ordering::Acquire) == 0
        {
            runner.drain_cond.notify_all();
        }
    }
}

fn worker_loop(runner: &ParallelTaskRunner<'_>) {
    loop {
        let task = {
            let mut queue = runner.queue.lock();
            loop {
                if let Some(task) = queue.pop_front() {
                    runner.queue_depth.fetch_sub(1, Ordering::Release);
                    runner.active_tasks.fetch_add(1, Ordering::Release);
                    break task;
                }
                if runner.shutdown.load(Ordering::Acquire) {
                    return;
                }
                runner.work_ready.wait(&mut queue);
            }
        };

        let _guard = ActiveTaskGuard { runner };
        runner.run_task(task);
    }
}
