//! Background reconciliation loop for pending tags.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::{OfflineTagManager, PassMode};
use crate::policy::BackoffSchedule;

/// Owns a running reconciliation loop; dropping it stops the loop.
pub struct ReconcileHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ReconcileHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the loop and wait for it to exit. A pass in progress completes.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "Tag reconciliation task ended abnormally");
            }
        }
    }
}

impl Drop for ReconcileHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Clears the running flag when the loop task goes away, however it ends.
struct RunningGuard(Arc<OfflineTagManager>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.loop_running.store(false, Ordering::SeqCst);
    }
}

impl OfflineTagManager {
    /// Start the reconciliation loop.
    ///
    /// Returns `None` when a loop is already running for this manager. Each
    /// tick waits for the current delay or a focus signal, attempts every
    /// pending tag, then resets the delay to base when nothing is left or
    /// grows it otherwise.
    pub fn start_reconciliation(self: &Arc<Self>) -> Option<ReconcileHandle> {
        if self.loop_running.swap(true, Ordering::SeqCst) {
            debug!("Tag reconciliation loop already running");
            return None;
        }

        let token = CancellationToken::new();
        let guard = RunningGuard(Arc::clone(self));
        let loop_token = token.clone();
        let span = info_span!("app.tags.reconcile");

        let task = tokio::spawn(
            async move {
                let manager = Arc::clone(&guard.0);
                let mut schedule = BackoffSchedule::from_config(manager.config());
                info!(
                    base_ms = schedule.current().as_millis() as u64,
                    "Tag reconciliation started"
                );

                loop {
                    let delay = schedule.current();
                    tokio::select! {
                        _ = loop_token.cancelled() => break,
                        _ = sleep(delay) => {}
                        _ = manager.focus.notified() => {
                            debug!("Focus regained; reconciling early");
                        }
                    }

                    if manager.pending_count() == 0 {
                        schedule.reset();
                        continue;
                    }

                    if let Some(summary) = manager.run_pass(PassMode::Background).await {
                        let next = schedule.next(summary.remaining);
                        debug!(
                            synced = summary.synced,
                            remaining = summary.remaining,
                            next_ms = next.as_millis() as u64,
                            "Tag reconciliation tick"
                        );
                    }
                }

                info!("Tag reconciliation stopped");
                drop(guard);
            }
            .instrument(span),
        );

        Some(ReconcileHandle {
            token,
            task: Some(task),
        })
    }

    /// Trigger an early reconciliation tick, e.g. when the window regains focus.
    pub fn notify_focus_regained(&self) {
        self.focus.notify_one();
    }

    pub fn is_reconciling(&self) -> bool {
        self.loop_running.load(Ordering::SeqCst)
    }
}
