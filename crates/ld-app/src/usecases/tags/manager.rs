//! Offline tag manager.
//!
//! Tags can be created while the server is failing or slow: a pending tag with
//! a `temp-` id is inserted locally and mirrored to durable storage at once,
//! then promoted when the server accepts it, either inline or from the
//! background reconciliation loop.

mod reconcile;

pub use reconcile::ReconcileHandle;

use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use ld_core::ports::{ClockPort, DurableStoragePort, LeadsApiError, LeadsApiPort, NotifierPort};
use ld_core::tag::{is_temp_tag_id, temp_tag_id};
use ld_core::{LeadId, Notification, Tag, TagId};
use tokio::sync::Notify;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::cache::QueryCache;
use crate::config::TagSyncConfig;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub synced: usize,
    pub remaining: usize,
}

/// Dependencies of [`OfflineTagManager`].
pub struct OfflineTagManagerDeps {
    pub api: Arc<dyn LeadsApiPort>,
    pub storage: Arc<dyn DurableStoragePort>,
    pub notifier: Arc<dyn NotifierPort>,
    pub clock: Arc<dyn ClockPort>,
    pub cache: Arc<QueryCache>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassMode {
    /// Loop tick: skipped when another pass runs, one notification per sync.
    Background,
    /// User-triggered: waits for a running pass, one summary notification.
    Manual,
}

#[derive(Default)]
struct TagState {
    tags: Vec<Tag>,
    /// Pending ids with a create request on the wire.
    in_flight: HashSet<TagId>,
}

pub struct OfflineTagManager {
    api: Arc<dyn LeadsApiPort>,
    storage: Arc<dyn DurableStoragePort>,
    notifier: Arc<dyn NotifierPort>,
    clock: Arc<dyn ClockPort>,
    cache: Arc<QueryCache>,
    config: TagSyncConfig,
    state: Mutex<TagState>,
    pass_lock: tokio::sync::Mutex<()>,
    focus: Notify,
    loop_running: AtomicBool,
}

impl OfflineTagManager {
    pub fn new(deps: OfflineTagManagerDeps, config: TagSyncConfig) -> Self {
        let OfflineTagManagerDeps {
            api,
            storage,
            notifier,
            clock,
            cache,
        } = deps;

        Self {
            api,
            storage,
            notifier,
            clock,
            cache,
            config,
            state: Mutex::new(TagState::default()),
            pass_lock: tokio::sync::Mutex::new(()),
            focus: Notify::new(),
            loop_running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &TagSyncConfig {
        &self.config
    }

    /// All known tags, pending ones included.
    pub fn tags(&self) -> Vec<Tag> {
        self.lock_state().tags.clone()
    }

    pub fn pending_tags(&self) -> Vec<Tag> {
        self.lock_state()
            .tags
            .iter()
            .filter(|t| t.is_pending())
            .cloned()
            .collect()
    }

    pub fn find(&self, id: &TagId) -> Option<Tag> {
        self.lock_state().tags.iter().find(|t| &t.id == id).cloned()
    }

    /// Merge server tags with pending tags recovered from durable storage.
    ///
    /// Pending entries win over same-id server entries. When the server fetch
    /// fails, the confirmed tags already in memory are kept.
    pub async fn load(&self) -> Vec<Tag> {
        let server = match self.api.get_tags().await {
            Ok(tags) => Some(tags),
            Err(err) => {
                warn!(error = %err, "Failed to fetch tags; keeping known tags");
                None
            }
        };
        let stored = self.read_stored();

        let mut state = self.lock_state();
        let confirmed = server.unwrap_or_else(|| {
            state
                .tags
                .iter()
                .filter(|t| !t.is_pending())
                .cloned()
                .collect()
        });
        let in_memory_pending: Vec<Tag> =
            state.tags.iter().filter(|t| t.is_pending()).cloned().collect();

        state.tags = merge_tags(confirmed, stored.into_iter().chain(in_memory_pending));
        debug!(
            total = state.tags.len(),
            pending = state.tags.iter().filter(|t| t.is_pending()).count(),
            "Tags loaded"
        );
        state.tags.clone()
    }

    /// Attach an existing tag to a lead.
    ///
    /// Returns `Ok(false)` without calling the server when the tag is still
    /// pending; it has to sync before it can be referenced.
    pub async fn add_tag(&self, lead_id: LeadId, tag_id: &TagId) -> Result<bool, LeadsApiError> {
        let known = self.find(tag_id);
        let pending = known
            .as_ref()
            .map(|t| t.is_pending())
            .unwrap_or_else(|| is_temp_tag_id(tag_id));
        if pending {
            debug!(lead_id = %lead_id, tag_id = %tag_id, "Skipping attach of unsynced tag");
            return Ok(false);
        }

        if let Err(err) = self.api.add_tag(lead_id, tag_id).await {
            warn!(lead_id = %lead_id, tag_id = %tag_id, error = %err, "Failed to add tag");
            self.notifier.notify(Notification::error("Failed to add tag"));
            return Err(err);
        }

        match known {
            Some(tag) => {
                let patched = self
                    .cache
                    .patch_all(|page| {
                        page.find_mut(lead_id)
                            .map(|lead| lead.attach_tag(tag.clone()))
                            .unwrap_or(false)
                    })
                    .await;
                debug!(lead_id = %lead_id, tag_id = %tag_id, patched, "Tag attached");
            }
            None => {
                // Unknown locally: let the next read bring the tag details.
                self.cache
                    .invalidate_prefix(ld_core::lead::LEADS_KEY_PREFIX)
                    .await;
            }
        }
        Ok(true)
    }

    /// Detach a tag from a lead.
    ///
    /// The cached lead loses the tag even when the server call fails; the
    /// failure is only reported.
    pub async fn remove_tag(&self, lead_id: LeadId, tag_id: &TagId) -> Result<(), LeadsApiError> {
        let result = self.api.remove_tag(lead_id, tag_id).await;
        if let Err(err) = &result {
            warn!(lead_id = %lead_id, tag_id = %tag_id, error = %err, "Failed to remove tag");
            self.notifier
                .notify(Notification::error("Failed to remove tag"));
        }

        self.cache
            .patch_all(|page| {
                page.find_mut(lead_id)
                    .map(|lead| lead.detach_tag(tag_id))
                    .unwrap_or(false)
            })
            .await;
        result
    }

    /// Create a tag optimistically.
    ///
    /// Returns the confirmed tag when the server accepts it right away, the
    /// pending placeholder otherwise.
    pub async fn create_tag(&self, name: &str, color: &str) -> Tag {
        let pending = {
            let mut state = self.lock_state();
            let id = temp_tag_id(self.clock.now_ms(), |candidate| {
                state.tags.iter().any(|t| &t.id == candidate)
            });
            let tag = Tag::pending(id, name, color);
            state.tags.push(tag.clone());
            state.in_flight.insert(tag.id.clone());
            tag
        };
        self.store_pending(&pending);

        let span = info_span!("app.tags.create", temp_id = %pending.id);
        match self.api.create_tag(name, color).instrument(span).await {
            Ok(confirmed) => {
                let confirmed = self.promote(&pending.id, confirmed);
                self.notifier
                    .notify(Notification::success(format!("Tag \"{name}\" created")));
                confirmed
            }
            Err(err) => {
                self.release(&pending.id);
                info!(temp_id = %pending.id, error = %err, "Tag creation queued for retry");
                self.notifier.notify(Notification::info(format!(
                    "Tag \"{name}\" saved offline and will sync automatically"
                )));
                pending
            }
        }
    }

    /// One manual reconciliation pass with a single summary notification.
    pub async fn sync_pending_tags(&self) -> SyncSummary {
        let summary = match self.run_pass(PassMode::Manual).await {
            Some(summary) => summary,
            None => SyncSummary {
                synced: 0,
                remaining: self.pending_count(),
            },
        };

        if summary.synced > 0 {
            self.notifier.notify(Notification::success(format!(
                "Synced {} tag(s)",
                summary.synced
            )));
        } else {
            self.notifier.notify(Notification::info("No tags synced"));
        }
        summary
    }

    pub fn pending_count(&self) -> usize {
        self.lock_state()
            .tags
            .iter()
            .filter(|t| t.is_pending())
            .count()
    }

    /// Attempt every pending tag once.
    ///
    /// Returns `None` when nothing was attempted: a background pass found
    /// another pass running, or every pending tag already has a create in
    /// flight.
    async fn run_pass(&self, mode: PassMode) -> Option<SyncSummary> {
        let _guard = match mode {
            PassMode::Background => match self.pass_lock.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    debug!("Reconciliation pass already running");
                    return None;
                }
            },
            PassMode::Manual => self.pass_lock.lock().await,
        };

        let candidates: Vec<Tag> = {
            let mut state = self.lock_state();
            let candidates: Vec<Tag> = state
                .tags
                .iter()
                .filter(|t| t.is_pending() && !state.in_flight.contains(&t.id))
                .cloned()
                .collect();
            for tag in &candidates {
                state.in_flight.insert(tag.id.clone());
            }
            candidates
        };
        if candidates.is_empty() {
            debug!(?mode, "No pending tag free to attempt");
            return None;
        }

        let mut synced = 0usize;
        for tag in candidates {
            match self.api.create_tag(&tag.name, &tag.color).await {
                Ok(confirmed) => {
                    let confirmed = self.promote(&tag.id, confirmed);
                    synced += 1;
                    if mode == PassMode::Background {
                        self.notifier.notify(Notification::success(format!(
                            "Tag \"{}\" synced",
                            confirmed.name
                        )));
                    }
                }
                Err(err) => {
                    self.release(&tag.id);
                    debug!(temp_id = %tag.id, error = %err, "Pending tag still unsynced");
                }
            }
        }

        let remaining = self.pending_count();
        debug!(synced, remaining, ?mode, "Reconciliation pass finished");
        Some(SyncSummary { synced, remaining })
    }

    /// Replace a pending entry with its server-confirmed identity.
    fn promote(&self, temp_id: &TagId, confirmed: Tag) -> Tag {
        let confirmed = Tag {
            pending: false,
            ..confirmed
        };
        {
            let mut state = self.lock_state();
            state.in_flight.remove(temp_id);
            let already_known = state.tags.iter().any(|t| t.id == confirmed.id);
            if already_known {
                state.tags.retain(|t| &t.id != temp_id);
            } else if let Some(slot) = state.tags.iter_mut().find(|t| &t.id == temp_id) {
                *slot = confirmed.clone();
            } else {
                state.tags.push(confirmed.clone());
            }
        }
        self.unstore_pending(temp_id);
        info!(temp_id = %temp_id, tag_id = %confirmed.id, "Pending tag promoted");
        confirmed
    }

    fn release(&self, temp_id: &TagId) {
        self.lock_state().in_flight.remove(temp_id);
    }

    // === Durable mirror (best effort, failures never surface) ===

    fn read_stored(&self) -> Vec<Tag> {
        let key = &self.config.storage_key;
        match self.storage.read(key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Tag>>(&raw) {
                Ok(tags) => tags
                    .into_iter()
                    .map(|t| Tag { pending: true, ..t })
                    .collect(),
                Err(err) => {
                    warn!(key = %key, error = %err, "Ignoring unreadable pending tag store");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(key = %key, error = %err, "Failed to read pending tag store");
                Vec::new()
            }
        }
    }

    fn write_stored(&self, tags: &[Tag]) {
        let key = &self.config.storage_key;
        let result = if tags.is_empty() {
            self.storage.remove(key)
        } else {
            match serde_json::to_string(tags) {
                Ok(raw) => self.storage.write(key, &raw),
                Err(err) => {
                    warn!(key = %key, error = %err, "Failed to encode pending tags");
                    return;
                }
            }
        };
        if let Err(err) = result {
            warn!(key = %key, error = %err, "Failed to write pending tag store");
        }
    }

    fn store_pending(&self, tag: &Tag) {
        let mut stored = self.read_stored();
        if !stored.iter().any(|t| t.id == tag.id) {
            stored.push(tag.clone());
        }
        self.write_stored(&stored);
    }

    fn unstore_pending(&self, temp_id: &TagId) {
        let mut stored = self.read_stored();
        let before = stored.len();
        stored.retain(|t| &t.id != temp_id);
        if stored.len() != before {
            self.write_stored(&stored);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, TagState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Pending tags first, then server tags whose id is not already present.
fn merge_tags(confirmed: Vec<Tag>, pending: impl IntoIterator<Item = Tag>) -> Vec<Tag> {
    let mut merged: Vec<Tag> = Vec::new();
    for tag in pending {
        if !merged.iter().any(|t| t.id == tag.id) {
            merged.push(Tag { pending: true, ..tag });
        }
    }
    for tag in confirmed {
        if !merged.iter().any(|t| t.id == tag.id) {
            merged.push(tag);
        }
    }
    merged
}
