//! Tracked background work.
//!
//! Tasks spawned here are counted so shutdown can wait for them to finish.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};

#[derive(Default)]
struct Inner {
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Decrements the counter even if the task panics.
struct InFlightGuard(Arc<Inner>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Handle for spawning and draining background tasks.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    inner: Arc<Inner>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the runtime and track it until it completes.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlightGuard(Arc::clone(&self.inner));
        tokio::spawn(async move {
            let _guard = guard;
            debug!(task = name, "background task started");
            task.await;
            debug!(task = name, "background task finished");
        });
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Resolve once no task is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // Register before checking, or a wake-up between the two is lost
            notified.as_mut().enable();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Wait up to `grace` for in-flight tasks. Returns false on timeout.
    pub async fn drain(&self, grace: Duration) -> bool {
        match tokio::time::timeout(grace, self.wait_idle()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    in_flight = self.in_flight(),
                    grace_ms = grace.as_millis() as u64,
                    "background tasks still running after grace period"
                );
                false
            }
        }
    }
}
