//! Fixed-size worker pool draining a bounded job queue.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::config::WorkerConfig;
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::observability::metrics;
use crate::resilience::CallContext;
use crate::worker::job::{Job, JobRegistry};

/// Outcome of a submission. A dropped job is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Queued,
    Dropped,
}

/// Counters since the pool started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub queued: u64,
    /// Dequeued and handed to a handler (unknown types included).
    pub processed: u64,
    /// Rejected at submission: queue full or pool shut down.
    pub dropped: u64,
    /// Dequeued but cancelled or past deadline before or while running.
    pub skipped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    processed: AtomicU64,
    dropped: AtomicU64,
    skipped: AtomicU64,
}

struct Envelope {
    job: Job,
    ctx: CallContext,
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<Envelope>>>;

/// Background workers sharing one bounded queue.
///
/// Submissions never block: when the queue is full the job is dropped and
/// logged. Jobs are not acknowledged, retried or persisted.
pub struct WorkerPool {
    tx: mpsc::Sender<Envelope>,
    rx: SharedReceiver,
    capacity: usize,
    accepting: AtomicBool,
    shutdown: Shutdown,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl WorkerPool {
    /// Spawn `worker_count` workers on the current Tokio runtime.
    ///
    /// # Panics
    /// If `worker_count` or `capacity` is zero, or outside a Tokio runtime.
    pub fn start(worker_count: usize, capacity: usize, registry: JobRegistry) -> Self {
        assert!(worker_count > 0, "worker pool needs at least one worker");
        assert!(capacity > 0, "worker queue capacity must be at least 1");

        let (tx, rx) = mpsc::channel(capacity);
        let rx: SharedReceiver = Arc::new(tokio::sync::Mutex::new(rx));
        let registry = Arc::new(registry);
        let counters = Arc::new(Counters::default());
        let shutdown = Shutdown::new();

        let workers = (1..=worker_count)
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    rx.clone(),
                    registry.clone(),
                    counters.clone(),
                    shutdown.subscribe(),
                ))
            })
            .collect();

        tracing::info!(workers = worker_count, capacity, "Started background workers");

        Self {
            tx,
            rx,
            capacity,
            accepting: AtomicBool::new(true),
            shutdown,
            workers: Mutex::new(workers),
            counters,
        }
    }

    pub fn from_config(config: &WorkerConfig, registry: JobRegistry) -> Self {
        Self::start(config.count, config.queue_capacity, registry)
    }

    /// Enqueue a job without blocking.
    pub fn submit(&self, kind: impl Into<String>, payload: serde_json::Value) -> Submission {
        self.submit_job(Job::new(kind, payload), CallContext::none())
    }

    /// Enqueue a job that is skipped if `ctx` fires before a worker finishes it.
    pub fn submit_with(&self, kind: impl Into<String>, payload: serde_json::Value, ctx: CallContext) -> Submission {
        self.submit_job(Job::new(kind, payload), ctx)
    }

    pub fn submit_job(&self, job: Job, ctx: CallContext) -> Submission {
        if !self.accepting.load(Ordering::Acquire) {
            tracing::warn!(job_id = %job.id, kind = %job.kind, "Worker pool shut down, dropping job");
            return self.record_drop();
        }

        let (id, kind) = (job.id, job.kind.clone());
        match self.tx.try_send(Envelope { job, ctx }) {
            Ok(()) => {
                tracing::debug!(job_id = %id, kind = %kind, "Job added to queue");
                self.counters.queued.fetch_add(1, Ordering::Relaxed);
                metrics::record_job("queued");
                Submission::Queued
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(job_id = %id, kind = %kind, capacity = self.capacity, "Job queue full, dropping job");
                self.record_drop()
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(job_id = %id, kind = %kind, "Job queue closed, dropping job");
                self.record_drop()
            }
        }
    }

    fn record_drop(&self) -> Submission {
        self.counters.dropped.fetch_add(1, Ordering::Relaxed);
        metrics::record_job("dropped");
        Submission::Dropped
    }

    /// Jobs waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            queued: self.counters.queued.load(Ordering::Relaxed),
            processed: self.counters.processed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
        }
    }

    /// Stop intake, let every worker finish its current job, and wait for them.
    ///
    /// Jobs still queued are abandoned; returns how many. Idempotent.
    pub async fn shutdown(&self) -> usize {
        self.accepting.store(false, Ordering::Release);
        self.shutdown.trigger();

        let workers = std::mem::take(&mut *self.workers.lock());
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker task failed");
            }
        }

        let mut rx = self.rx.lock().await;
        let mut abandoned = 0;
        while rx.try_recv().is_ok() {
            abandoned += 1;
        }
        rx.close();

        if abandoned > 0 {
            tracing::warn!(abandoned, "Worker pool stopped with queued jobs");
        } else {
            tracing::info!("Worker pool stopped");
        }
        abandoned
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

async fn worker_loop(
    id: usize,
    rx: SharedReceiver,
    registry: Arc<JobRegistry>,
    counters: Arc<Counters>,
    mut shutdown: ShutdownSignal,
) {
    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.recv() => None,
            envelope = async { rx.lock().await.recv().await } => envelope,
        };
        let Some(Envelope { job, ctx }) = next else {
            break;
        };

        if let Err(why) = ctx.check() {
            tracing::warn!(worker = id, job_id = %job.id, kind = %job.kind, reason = %why, "Skipping job");
            counters.skipped.fetch_add(1, Ordering::Relaxed);
            metrics::record_job("skipped");
            continue;
        }

        let Some(handler) = registry.handler(&job.kind) else {
            tracing::warn!(worker = id, job_id = %job.id, kind = %job.kind, "Unknown job type");
            counters.processed.fetch_add(1, Ordering::Relaxed);
            metrics::record_job("processed");
            continue;
        };

        tracing::debug!(worker = id, job_id = %job.id, kind = %job.kind, "Processing job");
        match ctx.run(handler.handle(&job)).await {
            Ok(()) => {
                tracing::debug!(worker = id, job_id = %job.id, kind = %job.kind, "Completed job");
                counters.processed.fetch_add(1, Ordering::Relaxed);
                metrics::record_job("processed");
            }
            Err(why) => {
                tracing::warn!(worker = id, job_id = %job.id, kind = %job.kind, reason = %why, "Job interrupted");
                counters.skipped.fetch_add(1, Ordering::Relaxed);
                metrics::record_job("skipped");
            }
        }
    }

    tracing::debug!(worker = id, "Worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::worker::job::JobHandler;
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Default)]
    struct Counting {
        seen: AtomicU64,
    }

    #[async_trait]
    impl JobHandler for Counting {
        async fn handle(&self, _job: &Job) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn wait_for(pool: &WorkerPool, processed: u64) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while pool.stats().processed + pool.stats().skipped < processed {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("jobs should finish");
    }

    #[tokio::test]
    async fn test_dispatch_by_kind_and_unknown_is_noop() {
        let handler = Arc::new(Counting::default());
        let pool = WorkerPool::start(2, 10, JobRegistry::new().register("entry_created", handler.clone()));

        assert_eq!(pool.submit("entry_created", serde_json::json!({"id": 1})), Submission::Queued);
        assert_eq!(pool.submit("mystery", serde_json::json!(null)), Submission::Queued);
        wait_for(&pool, 2).await;

        assert_eq!(handler.seen.load(Ordering::SeqCst), 1);
        assert_eq!(pool.stats().processed, 2);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancelled_job_is_skipped() {
        let handler = Arc::new(Counting::default());
        let pool = WorkerPool::start(1, 10, JobRegistry::new().register("x", handler.clone()));

        let cancel = Shutdown::new();
        cancel.trigger();
        pool.submit_with("x", serde_json::json!(1), CallContext::none().with_cancel(cancel.subscribe()));
        wait_for(&pool, 1).await;

        assert_eq!(handler.seen.load(Ordering::SeqCst), 0);
        assert_eq!(pool.stats().skipped, 1);
        pool.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_dropped() {
        let pool = WorkerPool::start(1, 1, JobRegistry::new());
        assert_eq!(pool.shutdown().await, 0);
        assert_eq!(pool.submit("x", serde_json::json!(null)), Submission::Dropped);
        assert_eq!(pool.stats().dropped, 1);
        // second shutdown is a no-op
        assert_eq!(pool.shutdown().await, 0);
    }
}
