//! Cooperative run cancellation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Cloneable stop flag shared by the caller and the scheduler.
///
/// Stopping is one-way. Waiters blocked in [`StopSignal::stopped`] are woken
/// immediately.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<StopInner>,
}

#[derive(Debug, Default)]
struct StopInner {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    /// Creates an unstopped signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the run to stop.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Returns `true` once [`StopSignal::stop`] has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Resolves once the signal is stopped.
    pub async fn stopped(&self) {
        loop {
            // Register before checking so a concurrent stop() is not missed.
            let notified = self.inner.notify.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}
