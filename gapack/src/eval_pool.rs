use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Results of evaluating a batch of tasks
#[derive(Debug)]
pub struct EvalOutcome<T> {
    /// Task index and result of every task that completed, in completion order
    pub results: Vec<(usize, T)>,
    /// Tasks that returned an error or panicked
    pub n_failed: usize,
    /// True if the deadline passed before every task reported back
    pub timed_out: bool,
}

/// Bounded set of worker threads evaluating independent tasks.
///
/// Tasks are fanned out to the workers, results are fanned back in over a channel.
/// A failing or panicking task only loses its own result.
pub struct EvalPool {
    pool: ThreadPool,
    timeout: Duration,
}

impl EvalPool {
    /// `n_workers` defaults to the available parallelism
    pub fn new(n_workers: Option<usize>, timeout: Duration) -> Result<Self> {
        let n_threads = match n_workers {
            Some(n) => n,
            None => std::thread::available_parallelism().map_or(1, |n| n.get()),
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("ga-worker-{i}"))
            .build()
            .context("failed to build evaluation thread pool")?;
        debug!("[POOL] started {n_threads} workers");
        Ok(Self { pool, timeout })
    }

    pub fn n_workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `task(i)` for every `i` in `0..n_tasks` and waits for the results until the deadline.
    ///
    /// A timeout beyond what [`Instant`] can represent waits for every task.
    /// Once the deadline passes, tasks which did not start yet are skipped
    /// and the results of tasks still running are discarded.
    pub fn evaluate<T, F>(&self, n_tasks: usize, task: F) -> EvalOutcome<T>
    where
        T: Send + 'static,
        F: Fn(usize) -> Result<T> + Send + Sync + 'static,
    {
        let task = Arc::new(task);
        let cancelled = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<(usize, Option<T>)>();

        for i in 0..n_tasks {
            let (task, cancelled, tx) = (task.clone(), cancelled.clone(), tx.clone());
            self.pool.spawn(move || {
                if cancelled.load(Ordering::Relaxed) {
                    return;
                }
                let result = run_isolated(i, &*task);
                // the receiver is gone if the deadline passed
                let _ = tx.send((i, result));
            });
        }
        drop(tx);

        // timeouts too large to represent mean waiting without a deadline
        let deadline = Instant::now().checked_add(self.timeout);
        let mut outcome = EvalOutcome {
            results: Vec::with_capacity(n_tasks),
            n_failed: 0,
            timed_out: false,
        };
        for _ in 0..n_tasks {
            let received = match deadline {
                Some(d) => rx.recv_timeout(d.saturating_duration_since(Instant::now())),
                None => rx.recv().map_err(|_| mpsc::RecvTimeoutError::Disconnected),
            };
            match received {
                Ok((i, Some(r))) => outcome.results.push((i, r)),
                Ok((_, None)) => outcome.n_failed += 1,
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    cancelled.store(true, Ordering::Relaxed);
                    outcome.timed_out = true;
                    warn!(
                        "[POOL] deadline of {:?} passed, abandoning {} of {n_tasks} tasks",
                        self.timeout,
                        n_tasks - outcome.results.len() - outcome.n_failed
                    );
                    break;
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
        outcome
    }
}

/// Runs a single task, turning errors and panics into `None`
pub fn run_isolated<T>(i: usize, task: &(impl Fn(usize) -> Result<T> + ?Sized)) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(|| task(i))) {
        Ok(Ok(r)) => Some(r),
        Ok(Err(e)) => {
            warn!("[POOL] task {i} failed: {e:#}");
            None
        }
        Err(panic) => {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown cause".to_string());
            warn!("[POOL] task {i} panicked: {msg}");
            None
        }
    }
}
