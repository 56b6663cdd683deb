//! Work Queue
//!
//! A fixed pool of OS worker threads draining one shared FIFO of boxed jobs.
//!
//! ```text
//!   enqueue(job) ──▶ [ job | job | job ] ──▶ worker 0 ─┐
//!                       (Mutex + Condvar)  ──▶ worker 1 ─┼─▶ job()
//!                                          ──▶ worker N ─┘
//! ```
//!
//! - `enqueue` never blocks on job execution. It takes the queue lock, pushes,
//!   and wakes one sleeping worker.
//! - `stop` drains: jobs already queued still run before the workers exit.
//! - A pool with zero workers (or one that has been stopped) runs jobs
//!   synchronously on the calling thread instead of dropping them.
//! - A panicking job is caught and logged; the worker keeps going.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use crate::errors::Result;

/// A deferred unit of work with no return value.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    should_terminate: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<QueueState>,
    condition: Condvar,
}

/// Generic background thread pool with a FIFO job queue.
pub struct WorkQueue {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkQueue {
    /// Spawns `worker_count` workers named `{thread_name}-{index}`.
    ///
    /// `worker_count == 0` is valid: every job then runs inline in `enqueue`.
    pub fn start(worker_count: usize, thread_name: &str) -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let mut workers = Vec::with_capacity(worker_count);

        for index in 0..worker_count {
            let worker_shared = Arc::clone(&shared);
            let spawned = std::thread::Builder::new()
                .name(format!("{thread_name}-{index}"))
                .spawn(move || worker_loop(&worker_shared));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    // Tear down what we already started before reporting.
                    let mut partial = Self { shared, workers };
                    partial.stop();
                    return Err(e.into());
                }
            }
        }

        log::debug!("WorkQueue started with {worker_count} worker(s)");
        Ok(Self { shared, workers })
    }

    /// Starts one worker per available hardware thread.
    pub fn with_available_parallelism(thread_name: &str) -> Result<Self> {
        Self::start(default_worker_count(), thread_name)
    }

    /// Number of live worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Appends a job and wakes exactly one waiting worker.
    pub fn enqueue<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.workers.is_empty() {
            run_job(Box::new(job));
            return;
        }

        self.shared.state.lock().jobs.push_back(Box::new(job));
        self.shared.condition.notify_one();
    }

    /// Returns `true` while jobs are waiting to be picked up.
    ///
    /// Diagnostic only: a `false` result says nothing about jobs that are
    /// currently executing.
    #[must_use]
    pub fn busy(&self) -> bool {
        !self.shared.state.lock().jobs.is_empty()
    }

    /// Requests termination, wakes every worker and joins them.
    ///
    /// Queued jobs are drained, not discarded. Calling `stop` twice is a no-op.
    pub fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }

        self.shared.state.lock().should_terminate = true;
        self.shared.condition.notify_all();

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("WorkQueue worker exited with a panic");
            }
        }
        log::debug!("WorkQueue stopped");
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Available hardware parallelism, falling back to a single worker.
#[must_use]
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

fn worker_loop(shared: &Shared) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if let Some(job) = state.jobs.pop_front() {
                    break job;
                }
                if state.should_terminate {
                    return;
                }
                shared.condition.wait(&mut state);
            }
        };
        run_job(job);
    }
}

fn run_job(job: Job) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
        log::error!("WorkQueue job panicked: {}", panic_message(payload.as_ref()));
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
