//! Use cases of the leads client: the synchronization controller, the offline
//! tag manager and saved views, plus the cache, debounce and retry policies
//! they share.

pub mod cache;
pub mod config;
pub mod debounce;
pub mod policy;
pub mod usecases;

pub use cache::QueryCache;
pub use config::{LeadsSyncConfig, TagSyncConfig};
pub use usecases::{
    InvalidationEvent, LeadsSyncController, LeadsSyncDeps, LeadsView, OfflineTagManager,
    OfflineTagManagerDeps, ReconcileHandle, SavedViewManager, SyncSummary,
};
