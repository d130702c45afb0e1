//! Notification sinks.

use ld_core::ports::NotifierPort;
use ld_core::{Notification, NotificationLevel};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Writes notifications to the log.
pub struct TracingNotifier;

impl NotifierPort for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success | NotificationLevel::Info => {
                info!(target: "leaddesk::notify", "{}", notification.message)
            }
            NotificationLevel::Error => error!(target: "leaddesk::notify", "{}", notification.message),
        }
    }
}

/// Forwards notifications to a channel, e.g. for a UI loop to render.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotifierPort for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if let Err(err) = self.tx.send(notification) {
            warn!(message = %err.0.message, "Notification dropped, receiver closed");
        }
    }
}
