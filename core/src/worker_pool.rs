//! Fixed-size CPU worker pool.
//!
//! Jobs are queued with [`WorkerPool::push`], released to the workers with
//! [`WorkerPool::start`], and awaited with [`WorkerPool::join`]. The pool is
//! meant for CPU-side precomputation (asset decoding, batch preparation); it
//! never records GPU commands.
//!
//! ```ignore
//! let pool = WorkerPool::new(4);
//! for chunk in chunks {
//!     pool.push(move || process(chunk));
//! }
//! pool.start();
//! pool.join();
//! ```

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct PoolState {
    queue: VecDeque<Job>,
    running: usize,
    started: bool,
    shutdown: bool,
}

impl PoolState {
    fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.running == 0
    }
}

struct Shared {
    state: Mutex<PoolState>,
    work_ready: Condvar,
    work_done: Condvar,
}

/// A bounded pool of worker threads fed from one queue.
pub struct WorkerPool {
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `thread_count` workers (at least one).
    pub fn new(thread_count: usize) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState::default()),
            work_ready: Condvar::new(),
            work_done: Condvar::new(),
        });

        let threads = (0..thread_count.max(1))
            .map(|index| {
                let shared = Arc::clone(&shared);
                std::thread::Builder::new()
                    .name(format!("prism-worker-{index}"))
                    .spawn(move || worker_loop(&shared))
                    .unwrap_or_else(|e| panic!("failed to spawn worker thread {index}: {e}"))
            })
            .collect();

        log::debug!("WorkerPool started with {} threads", thread_count.max(1));

        Self { shared, threads }
    }

    /// Pool sized to the available parallelism.
    pub fn with_default_threads() -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);
        Self::new(threads)
    }

    /// Number of worker threads.
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Queue a job. Jobs pushed after [`start`](Self::start) run immediately.
    pub fn push<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.shared.state.lock();
        state.queue.push_back(Box::new(job));
        if state.started {
            self.shared.work_ready.notify_one();
        }
    }

    /// Release queued jobs to the workers.
    pub fn start(&self) {
        let mut state = self.shared.state.lock();
        state.started = true;
        self.shared.work_ready.notify_all();
    }

    /// Block until the queue is drained and no job is running.
    ///
    /// Starts the pool first if [`start`](Self::start) was never called.
    pub fn join(&self) {
        let mut state = self.shared.state.lock();
        if !state.started {
            state.started = true;
            self.shared.work_ready.notify_all();
        }
        while !state.is_idle() {
            self.shared.work_done.wait(&mut state);
        }
    }

    /// Returns true when no job is queued or running.
    pub fn is_finished(&self) -> bool {
        self.shared.state.lock().is_idle()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            self.shared.work_ready.notify_all();
        }
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let job = {
            let mut state = shared.state.lock();
            loop {
                if state.shutdown {
                    return;
                }
                if state.started
                    && let Some(job) = state.queue.pop_front()
                {
                    state.running += 1;
                    break job;
                }
                shared.work_ready.wait(&mut state);
            }
        };

        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            log::error!("WorkerPool job panicked");
        }

        let mut state = shared.state.lock();
        state.running -= 1;
        if state.is_idle() {
            shared.work_done.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn runs_every_job_before_join_returns() {
        let pool = WorkerPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.push(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        pool.start();
        pool.join();

        assert_eq!(counter.load(Ordering::SeqCst), 100);
        assert!(pool.is_finished());
    }

    #[test]
    fn jobs_wait_for_start() {
        let pool = WorkerPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let counter = Arc::clone(&counter);
            pool.push(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!pool.is_finished());

        pool.join();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_job_does_not_hang_join() {
        let pool = WorkerPool::new(1);
        pool.push(|| panic!("boom"));
        pool.push(|| {});
        pool.join();
        assert!(pool.is_finished());
    }

    #[test]
    fn thread_count_is_at_least_one() {
        assert_eq!(WorkerPool::new(0).thread_count(), 1);
        assert_eq!(WorkerPool::new(3).thread_count(), 3);
    }

    #[test]
    fn pool_is_reusable_after_join() {
        let pool = WorkerPool::new(2);
        let counter = Arc::new(AtomicUsize::new(0));
        for round in 0..3 {
            for _ in 0..10 {
                let counter = Arc::clone(&counter);
                pool.push(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
            pool.join();
            assert_eq!(counter.load(Ordering::SeqCst), (round + 1) * 10);
        }
    }
}
