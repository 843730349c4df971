//! Worker pool (§4.5): a bounded queue of work items drained by a fixed
//! number of tokio tasks, with an optional priority ordering.
//!
//! Two independent pools are built from this: the general pool for engine
//! operations, and a dedicated script pool whose process function
//! additionally serializes through a single mutex (the script runtime is
//! not re-entrant).

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, Notify};
use tracing::warn;

use vxd_core::DaemonError;

/// Submission priority class. Only meaningful when the pool was built with
/// `priority_queue: true`; ignored (pure FIFO) otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Drained last among distinct classes.
    Low,
    /// Default priority.
    Normal,
    /// Drained first among distinct classes.
    High,
}

type Job = Box<dyn FnOnce(usize) + Send + 'static>;

struct QueuedJob {
    priority: Priority,
    job: Job,
}

/// Three FIFO lanes, one per [`Priority`]. When priority ordering is
/// disabled every submission lands in the `Normal` lane, which makes
/// draining equivalent to a single plain FIFO queue.
#[derive(Default)]
struct Lanes {
    high: VecDeque<QueuedJob>,
    normal: VecDeque<QueuedJob>,
    low: VecDeque<QueuedJob>,
}

impl Lanes {
    fn push(&mut self, item: QueuedJob) {
        match item.priority {
            Priority::High => self.high.push_back(item),
            Priority::Normal => self.normal.push_back(item),
            Priority::Low => self.low.push_back(item),
        }
    }

    /// Pop the next item in priority order (High, then Normal, then Low),
    /// FIFO within a class.
    fn pop(&mut self) -> Option<QueuedJob> {
        self.high.pop_front().or_else(|| self.normal.pop_front()).or_else(|| self.low.pop_front())
    }
}

/// Point-in-time counters, snapshotted on `stats()`.
#[derive(Debug, Clone, Copy)]
pub struct PoolStats {
    /// Items that completed (successfully or not).
    pub processed: u64,
    /// Items whose process function reported failure via `record_failure`.
    pub failed: u64,
    /// Items currently queued, not yet picked up by a worker.
    pub queue_depth: usize,
    /// Running average latency across all processed items, in microseconds.
    pub avg_latency_micros: u64,
}

#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    failed: AtomicU64,
    total_latency_micros: AtomicU64,
}

/// A bounded, optionally-priority-ordered pool of worker tasks.
pub struct WorkerPool {
    queue: Arc<Mutex<Lanes>>,
    notify: Arc<Notify>,
    queue_depth: Arc<AtomicUsize>,
    queue_capacity: usize,
    priority_queue: bool,
    stopped: Arc<AtomicBool>,
    counters: Arc<Counters>,
    workers: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl WorkerPool {
    /// Build and start a pool with `worker_count` tasks draining a queue of
    /// `queue_capacity`. When `priority_queue` is true, workers drain High
    /// before Normal before Low (FIFO within a class); otherwise submissions
    /// are treated as plain FIFO regardless of the `Priority` they carry.
    #[must_use]
    pub fn start(worker_count: usize, queue_capacity: usize, priority_queue: bool) -> Self {
        let queue = Arc::new(Mutex::new(Lanes::default()));
        let notify = Arc::new(Notify::new());
        let queue_depth = Arc::new(AtomicUsize::new(0));
        let stopped = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count.max(1) {
            let queue = Arc::clone(&queue);
            let notify = Arc::clone(&notify);
            let queue_depth = Arc::clone(&queue_depth);
            let stopped = Arc::clone(&stopped);
            let counters = Arc::clone(&counters);
            workers.push(tokio::spawn(async move {
                loop {
                    let item = {
                        let mut lanes = queue.lock().await;
                        lanes.pop()
                    };
                    let Some(queued) = item else {
                        if stopped.load(Ordering::Acquire) {
                            break;
                        }
                        notify.notified().await;
                        continue;
                    };
                    queue_depth.fetch_sub(1, Ordering::AcqRel);
                    let started = Instant::now();
                    (queued.job)(worker_id);
                    let elapsed = started.elapsed();
                    counters.processed.fetch_add(1, Ordering::Relaxed);
                    counters
                        .total_latency_micros
                        .fetch_add(u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX), Ordering::Relaxed);
                }
            }));
        }

        Self {
            queue,
            notify,
            queue_depth,
            queue_capacity,
            priority_queue,
            stopped,
            counters,
            workers: Mutex::new(workers),
        }
    }

    /// Submit a unit of work. Non-blocking: returns
    /// [`DaemonError::QueueFull`] if the bounded queue has no room, or
    /// [`DaemonError::Internal`] if the pool has been stopped.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn submit<F>(&self, priority: Priority, job: F) -> Result<(), DaemonError>
    where
        F: FnOnce(usize) + Send + 'static,
    {
        if self.stopped.load(Ordering::Acquire) {
            return Err(DaemonError::Internal("worker pool stopped".into()));
        }
        let priority = if self.priority_queue { priority } else { Priority::Normal };
        // Reserve capacity optimistically; release it back if the queue was
        // actually full by the time we hold the lock.
        if self.queue_depth.fetch_add(1, Ordering::AcqRel) >= self.queue_capacity {
            self.queue_depth.fetch_sub(1, Ordering::AcqRel);
            return Err(DaemonError::QueueFull);
        }
        let mut lanes = match self.queue.try_lock() {
            Ok(lanes) => lanes,
            Err(_) => {
                self.queue_depth.fetch_sub(1, Ordering::AcqRel);
                return Err(DaemonError::QueueFull);
            }
        };
        lanes.push(QueuedJob { priority, job: Box::new(job) });
        drop(lanes);
        self.notify.notify_one();
        Ok(())
    }

    /// Record a failed item; called by the process function itself since
    /// only it knows whether the unit of work succeeded.
    pub fn record_failure(&self) {
        self.counters.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Stop accepting new submissions. Existing queued/in-flight items run
    /// to completion; callers that want to wait for drain should join the
    /// handles via `shutdown`.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Stop and wait for every worker task to finish draining.
    pub async fn shutdown(&self) {
        self.stop();
        let mut workers = self.workers.lock().await;
        for handle in workers.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task panicked during shutdown");
            }
        }
    }

    /// Snapshot the pool's counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let processed = self.counters.processed.load(Ordering::Relaxed);
        let total_latency = self.counters.total_latency_micros.load(Ordering::Relaxed);
        PoolStats {
            processed,
            failed: self.counters.failed.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Acquire),
            avg_latency_micros: if processed == 0 { 0 } else { total_latency / processed },
        }
    }
}

/// Default submitter timeout for script execution, per §4.5.
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum submitter timeout for script execution.
pub const MAX_SCRIPT_TIMEOUT: Duration = Duration::from_secs(300);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    #[tokio::test]
    async fn submitted_job_runs_and_is_counted() {
        let pool = WorkerPool::start(2, 8, false);
        let ran = Arc::new(StdAtomicUsize::new(0));
        let ran2 = Arc::clone(&ran);
        pool.submit(Priority::Normal, move |_worker_id| {
            ran2.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(pool.stats().processed, 1);
    }

    #[tokio::test]
    async fn queue_full_is_reported() {
        // No `.await` runs between these two submits, so the worker task
        // has no chance to drain the first item before the second lands.
        let pool = WorkerPool::start(1, 1, false);
        pool.submit(Priority::Normal, |_| {}).unwrap();
        let err = pool.submit(Priority::Normal, |_| {});
        assert!(matches!(err, Err(DaemonError::QueueFull)));
    }

    #[tokio::test]
    async fn stopped_pool_rejects_submissions() {
        let pool = WorkerPool::start(1, 4, false);
        pool.shutdown().await;
        let err = pool.submit(Priority::Normal, |_| {});
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn priority_queue_drains_high_before_normal_before_low() {
        // A single worker, held back until every item is queued, so the
        // drain order is fully deterministic.
        let pool = WorkerPool::start(0, 16, true);
        let order = Arc::new(Mutex::new(Vec::new()));

        pool.submit(Priority::Low, {
            let order = Arc::clone(&order);
            move |_| order.try_lock().unwrap().push(Priority::Low)
        })
        .unwrap();
        pool.submit(Priority::Normal, {
            let order = Arc::clone(&order);
            move |_| order.try_lock().unwrap().push(Priority::Normal)
        })
        .unwrap();
        pool.submit(Priority::High, {
            let order = Arc::clone(&order);
            move |_| order.try_lock().unwrap().push(Priority::High)
        })
        .unwrap();
        pool.submit(Priority::Normal, {
            let order = Arc::clone(&order);
            move |_| order.try_lock().unwrap().push(Priority::Normal)
        })
        .unwrap();

        // Drain manually, mirroring what a worker task does, since this
        // pool was started with zero workers.
        loop {
            let item = {
                let mut lanes = pool.queue.lock().await;
                lanes.pop()
            };
            let Some(queued) = item else { break };
            (queued.job)(0);
        }

        let observed = order.lock().await.clone();
        assert_eq!(observed, vec![Priority::High, Priority::Normal, Priority::Normal, Priority::Low]);
    }

    #[tokio::test]
    async fn non_priority_pool_ignores_priority_and_stays_fifo() {
        let pool = WorkerPool::start(0, 16, false);
        let order = Arc::new(Mutex::new(Vec::new()));

        pool.submit(Priority::Low, {
            let order = Arc::clone(&order);
            move |_| order.try_lock().unwrap().push(1)
        })
        .unwrap();
        pool.submit(Priority::High, {
            let order = Arc::clone(&order);
            move |_| order.try_lock().unwrap().push(2)
        })
        .unwrap();

        loop {
            let item = {
                let mut lanes = pool.queue.lock().await;
                lanes.pop()
            };
            let Some(queued) = item else { break };
            (queued.job)(0);
        }

        assert_eq!(*order.lock().await, vec![1, 2]);
    }
}
