//! Single-slot debounce timer.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::sleep;
use tracing::debug;

/// Runs a task after a quiet period; scheduling again re-arms the timer and
/// drops the previously scheduled task.
///
/// The scheduled future must not own work that is unsafe to drop mid-way:
/// anything long-running should be spawned from it.
pub struct Debouncer {
    delay: Duration,
    slot: Mutex<Option<AbortHandle>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            slot: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            task.await;
        });

        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.replace(handle.abort_handle()) {
            previous.abort();
            debug!(delay_ms = delay.as_millis() as u64, "debounce re-armed");
        }
    }

    /// Drop the pending task, if any.
    pub fn cancel(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = slot.take() {
            previous.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
