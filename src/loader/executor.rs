//! A bounded task pool with a phase barrier.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Notify, Semaphore};
use tracing::warn;

use crate::constants::MIN_PARALLELISM;

/// Runs submitted futures on the runtime, at most `size` at a time.
///
/// Tasks may submit further tasks; [`wait`](Self::wait) returns once every task
/// submitted so far, including those submitted by running tasks, has finished.
/// The pool can be waited on again for the next phase.
#[derive(Debug, Clone)]
pub struct TaskPool {
    permits: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    size: usize,
}

struct PendingGuard {
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

impl TaskPool {
    /// A pool running at most `size` tasks concurrently; `0` is treated as `1`.
    pub fn new(size: usize) -> Self {
        let size = size.max(MIN_PARALLELISM);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            pending: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
            size,
        }
    }

    /// Queue a task. It starts once a permit is free.
    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::AcqRel);
        let guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            idle: Arc::clone(&self.idle),
        };
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let _guard = guard;
            let Ok(_permit) = permits.acquire_owned().await else {
                warn!("task pool closed, dropping task");
                return;
            };
            task.await;
        });
    }

    /// Queue a task, first waiting for its permit, so tasks submitted this way start
    /// in submission order. Must not be called from inside a pool task.
    pub async fn submit_in_order<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::AcqRel);
        let guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            idle: Arc::clone(&self.idle),
        };
        let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
            warn!("task pool closed, dropping task");
            return;
        };
        tokio::spawn(async move {
            let _guard = guard;
            let _permit = permit;
            task.await;
        });
    }

    /// Wait until no task is pending.
    pub async fn wait(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Tasks submitted and not finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Maximum number of concurrently running tasks.
    pub fn size(&self) -> usize {
        self.size
    }
}
