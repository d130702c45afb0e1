pub mod leads;
pub mod saved_views;
pub mod tags;

pub use leads::{InvalidationEvent, LeadsSyncController, LeadsSyncDeps, LeadsView};
pub use saved_views::SavedViewManager;
pub use tags::{OfflineTagManager, OfflineTagManagerDeps, ReconcileHandle, SyncSummary};
