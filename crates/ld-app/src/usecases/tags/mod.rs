//! Offline-capable tag management.

mod manager;

pub use manager::{OfflineTagManager, OfflineTagManagerDeps, ReconcileHandle, SyncSummary};
