use crate::notification::Notification;

/// Surface for user-visible notifications (toasts).
pub trait NotifierPort: Send + Sync {
    fn notify(&self, notification: Notification);
}
