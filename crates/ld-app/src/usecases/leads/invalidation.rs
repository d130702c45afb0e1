//! Push-based invalidation: an external source (websocket, SSE, another
//! window) tells the controller that server data changed.

use std::sync::Arc;

use ld_core::lead::LEADS_KEY_PREFIX;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::controller::LeadsSyncController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationEvent {
    /// Any lead may have changed.
    LeadsChanged,
    /// The tag catalogue changed.
    TagsChanged,
}

impl LeadsSyncController {
    /// Listen to `events` until the sender side closes or the controller is
    /// disposed. Attaching a new source replaces the previous listener.
    pub fn attach_invalidation_source(&self, mut events: mpsc::Receiver<InvalidationEvent>) {
        let weak = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let controller = LeadsSyncController { inner };
                match event {
                    InvalidationEvent::LeadsChanged => {
                        let stale = controller.cache().invalidate_prefix(LEADS_KEY_PREFIX).await;
                        debug!(stale, "Leads invalidated by push event");
                        controller.load(false).await;
                    }
                    InvalidationEvent::TagsChanged => {
                        controller.tags().load().await;
                    }
                }
            }
            info!("Invalidation source closed");
        });

        if let Some(previous) = self.lock_listener().replace(task.abort_handle()) {
            previous.abort();
        }
    }
}
