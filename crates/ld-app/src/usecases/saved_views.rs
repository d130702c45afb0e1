//! Saved filter/sort presets backed by the server.

use std::sync::{Arc, Mutex, MutexGuard};

use ld_core::ports::{LeadsApiError, LeadsApiPort, NotifierPort};
use ld_core::{LeadFilters, LeadSort, Notification, SavedView, SavedViewId};
use tracing::{info, warn};

pub struct SavedViewManager {
    api: Arc<dyn LeadsApiPort>,
    notifier: Arc<dyn NotifierPort>,
    views: Mutex<Vec<SavedView>>,
}

impl SavedViewManager {
    pub fn new(api: Arc<dyn LeadsApiPort>, notifier: Arc<dyn NotifierPort>) -> Self {
        Self {
            api,
            notifier,
            views: Mutex::new(Vec::new()),
        }
    }

    pub fn views(&self) -> Vec<SavedView> {
        self.lock_views().clone()
    }

    pub fn find(&self, id: &SavedViewId) -> Option<SavedView> {
        self.lock_views().iter().find(|v| &v.id == id).cloned()
    }

    /// Refresh the list from the server; the previous list survives a failure.
    pub async fn load(&self) -> Result<Vec<SavedView>, LeadsApiError> {
        match self.api.get_saved_views().await {
            Ok(views) => {
                *self.lock_views() = views.clone();
                Ok(views)
            }
            Err(err) => {
                warn!(error = %err, "Failed to load saved views");
                Err(err)
            }
        }
    }

    pub async fn save(
        &self,
        name: &str,
        filters: &LeadFilters,
        sort: Option<&LeadSort>,
    ) -> Result<SavedView, LeadsApiError> {
        match self.api.create_saved_view(name, filters, sort).await {
            Ok(view) => {
                {
                    let mut views = self.lock_views();
                    views.retain(|v| v.id != view.id);
                    views.push(view.clone());
                }
                info!(view_id = %view.id, "Saved view created");
                self.notifier
                    .notify(Notification::success(format!("View \"{name}\" saved")));
                Ok(view)
            }
            Err(err) => {
                warn!(error = %err, "Failed to save view");
                self.notifier
                    .notify(Notification::error("Failed to save view"));
                Err(err)
            }
        }
    }

    pub async fn delete(&self, id: &SavedViewId) -> Result<(), LeadsApiError> {
        match self.api.delete_saved_view(id).await {
            Ok(()) => {
                self.lock_views().retain(|v| &v.id != id);
                self.notifier.notify(Notification::success("View deleted"));
                Ok(())
            }
            Err(err) => {
                warn!(view_id = %id, error = %err, "Failed to delete view");
                self.notifier
                    .notify(Notification::error("Failed to delete view"));
                Err(err)
            }
        }
    }

    fn lock_views(&self) -> MutexGuard<'_, Vec<SavedView>> {
        self.views.lock().unwrap_or_else(|e| e.into_inner())
    }
}
