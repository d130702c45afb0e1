//! Leads synchronization controller.
//!
//! Owns the filter/sort/page state of the leads list, derives the query key,
//! and keeps the page cache, the published view and (optionally) the location
//! query string consistent with each other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use ld_core::lead::LEADS_KEY_PREFIX;
use ld_core::ports::{
    ClockPort, DurableStoragePort, LeadsApiError, LeadsApiPort, LocationPort, NotifierPort,
};
use ld_core::{
    Lead, LeadFilters, LeadId, LeadPatch, LeadSort, LeadsPage, Notification, QueryKey,
    SavedView, Tag, TagId, UrlState,
};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::view::LeadsView;
use crate::cache::QueryCache;
use crate::config::{LeadsSyncConfig, TagSyncConfig};
use crate::debounce::Debouncer;
use crate::policy::{FailureClass, FetchFailure};
use crate::usecases::saved_views::SavedViewManager;
use crate::usecases::tags::{OfflineTagManager, OfflineTagManagerDeps};

/// Ports the controller and its managers are built from.
pub struct LeadsSyncDeps {
    pub api: Arc<dyn LeadsApiPort>,
    pub notifier: Arc<dyn NotifierPort>,
    /// `None` disables URL synchronization regardless of configuration.
    pub location: Option<Arc<dyn LocationPort>>,
    pub clock: Arc<dyn ClockPort>,
    pub storage: Arc<dyn DurableStoragePort>,
}

#[derive(Debug, Clone)]
struct ControllerState {
    filters: LeadFilters,
    /// Filters as of the last quiet period; these feed the query key.
    debounced_filters: LeadFilters,
    sort: Option<LeadSort>,
    page: u32,
    hydrated: bool,
}

struct InFlight {
    key: QueryKey,
    token: CancellationToken,
    generation: u64,
}

pub(super) struct Inner {
    api: Arc<dyn LeadsApiPort>,
    notifier: Arc<dyn NotifierPort>,
    location: Option<Arc<dyn LocationPort>>,
    config: LeadsSyncConfig,
    cache: Arc<QueryCache>,
    state: Mutex<ControllerState>,
    debouncer: Debouncer,
    in_flight: Mutex<Option<InFlight>>,
    generation: AtomicU64,
    view: watch::Sender<LeadsView>,
    tags: Arc<OfflineTagManager>,
    saved_views: SavedViewManager,
    listener: Mutex<Option<AbortHandle>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(slot) = self.in_flight.get_mut().ok().and_then(Option::take) {
            slot.token.cancel();
        }
        if let Some(listener) = self.listener.get_mut().ok().and_then(Option::take) {
            listener.abort();
        }
    }
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct LeadsSyncController {
    pub(super) inner: Arc<Inner>,
}

impl LeadsSyncController {
    pub fn new(deps: LeadsSyncDeps, config: LeadsSyncConfig, tag_config: TagSyncConfig) -> Self {
        let LeadsSyncDeps {
            api,
            notifier,
            location,
            clock,
            storage,
        } = deps;

        let cache = Arc::new(QueryCache::new(config.stale_time));
        let tags = Arc::new(OfflineTagManager::new(
            OfflineTagManagerDeps {
                api: Arc::clone(&api),
                storage,
                notifier: Arc::clone(&notifier),
                clock,
                cache: Arc::clone(&cache),
            },
            tag_config,
        ));
        let saved_views = SavedViewManager::new(Arc::clone(&api), Arc::clone(&notifier));

        let state = ControllerState {
            filters: LeadFilters::default(),
            debounced_filters: LeadFilters::default(),
            sort: config.default_sort.clone(),
            page: 1,
            hydrated: false,
        };
        let (view, _) = watch::channel(LeadsView {
            filters: state.filters.clone(),
            sort: state.sort.clone(),
            page: state.page,
            page_size: config.page_size,
            ..LeadsView::default()
        });

        Self {
            inner: Arc::new(Inner {
                api,
                notifier,
                location,
                debouncer: Debouncer::new(config.debounce),
                config,
                cache,
                state: Mutex::new(state),
                in_flight: Mutex::new(None),
                generation: AtomicU64::new(0),
                view,
                tags,
                saved_views,
                listener: Mutex::new(None),
            }),
        }
    }

    // === Accessors ===

    pub fn subscribe(&self) -> watch::Receiver<LeadsView> {
        self.inner.view.subscribe()
    }

    pub fn view(&self) -> LeadsView {
        self.inner.view.borrow().clone()
    }

    pub fn filters(&self) -> LeadFilters {
        self.lock_state().filters.clone()
    }

    pub fn sort(&self) -> Option<LeadSort> {
        self.lock_state().sort.clone()
    }

    pub fn page(&self) -> u32 {
        self.lock_state().page
    }

    pub fn page_size(&self) -> u32 {
        self.inner.config.page_size
    }

    /// Key of the page the current state points at.
    pub fn current_key(&self) -> QueryKey {
        let state = self.lock_state();
        QueryKey::leads(
            state.page,
            self.inner.config.page_size,
            &state.debounced_filters,
            state.sort.as_ref(),
        )
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.inner.cache
    }

    pub fn tags(&self) -> &Arc<OfflineTagManager> {
        &self.inner.tags
    }

    pub fn saved_views(&self) -> &SavedViewManager {
        &self.inner.saved_views
    }

    // === Lifecycle ===

    /// Hydrate from the location (first call only) and load the current page.
    pub async fn mount(&self) {
        self.hydrate();
        self.load(false).await;
    }

    fn hydrate(&self) {
        if self.lock_state().hydrated {
            return;
        }
        let url = self
            .url_location()
            .map(|location| UrlState::parse(&location.query_string()));
        {
            let mut state = self.lock_state();
            if state.hydrated {
                return;
            }
            state.hydrated = true;
            if let Some(url) = url {
                debug!(
                    page = ?url.page,
                    has_filters = !url.filters.is_empty(),
                    "Hydrating leads state from location"
                );
                state.debounced_filters = url.filters.clone();
                state.filters = url.filters;
                if url.sort.is_some() {
                    state.sort = url.sort;
                }
                state.page = url.page.unwrap_or(1);
            }
        }
        self.write_location();
        self.publish_state();
    }

    /// Stop timers, the in-flight fetch and the invalidation listener.
    pub fn dispose(&self) {
        self.inner.debouncer.cancel();
        self.cancel_in_flight();
        if let Some(listener) = self.lock_listener().take() {
            listener.abort();
        }
        debug!("Leads controller disposed");
    }

    // === State changes ===

    /// Replace the filters. The fetch follows after the debounce quiet period.
    pub fn set_filters(&self, filters: LeadFilters) {
        self.update_filters(move |current| *current = filters);
    }

    /// Edit the filters in place. Same timing as [`Self::set_filters`].
    pub fn update_filters<F>(&self, update: F)
    where
        F: FnOnce(&mut LeadFilters),
    {
        {
            let mut state = self.lock_state();
            update(&mut state.filters);
            state.page = 1;
        }
        self.write_location();
        self.publish_state();

        let weak = Arc::downgrade(&self.inner);
        self.inner.debouncer.schedule(async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let controller = LeadsSyncController { inner };
            {
                let mut state = controller.lock_state();
                state.debounced_filters = state.filters.clone();
            }
            // Detached so that re-arming the debouncer never aborts a fetch.
            tokio::spawn(async move { controller.load(false).await });
        });
    }

    pub fn clear_filters(&self) {
        self.set_filters(LeadFilters::default());
    }

    pub async fn set_sort(&self, sort: Option<LeadSort>) {
        {
            let mut state = self.lock_state();
            state.sort = sort;
            state.page = 1;
        }
        self.write_location();
        self.publish_state();
        self.load(false).await;
    }

    pub async fn set_page(&self, page: u32) {
        self.lock_state().page = page.max(1);
        self.write_location();
        self.publish_state();
        self.load(false).await;
    }

    /// Refetch the current key, ignoring freshness.
    pub async fn refresh(&self) {
        self.load(true).await;
    }

    /// Overwrite filters and sort with a saved view and go back to page 1.
    pub async fn apply_view(&self, view: &SavedView) {
        self.inner.debouncer.cancel();
        {
            let mut state = self.lock_state();
            state.filters = view.filters.clone();
            state.debounced_filters = view.filters.clone();
            state.sort = view.sort.clone();
            state.page = 1;
        }
        info!(view_id = %view.id, "Applying saved view");
        self.write_location();
        self.publish_state();
        self.load(false).await;
    }

    pub async fn save_current_view(&self, name: &str) -> Result<SavedView, LeadsApiError> {
        let (filters, sort) = {
            let state = self.lock_state();
            (state.filters.clone(), state.sort.clone())
        };
        self.inner.saved_views.save(name, &filters, sort.as_ref()).await
    }

    // === Fetching ===

    pub(super) async fn load(&self, force: bool) {
        let key = self.current_key();

        if !force {
            if let Some(page) = self.inner.cache.get_fresh(&key).await {
                debug!(key = %key, "Serving fresh cached page");
                self.cancel_in_flight();
                self.show_page(page);
                return;
            }
        }

        let Some((token, generation)) = self.begin_fetch(&key, force) else {
            debug!(key = %key, "Fetch for key already in flight");
            return;
        };

        let cached = self.inner.cache.get(&key).await;
        self.inner.view.send_modify(|view| {
            view.is_fetching = true;
            view.error = None;
            if let Some(page) = cached {
                view.leads = page.data;
                view.pagination = Some(page.pagination);
                view.has_data = true;
            }
        });

        let span = info_span!("app.leads.fetch", key = %key, force);
        let outcome = async {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = self.fetch_with_retry(&key) => Some(result),
            }
        }
        .instrument(span)
        .await;

        match outcome {
            None => debug!(key = %key, "Leads fetch cancelled"),
            Some(Ok(page)) => {
                if self
                    .inner
                    .cache
                    .put_unless_cancelled(key.clone(), page.clone(), &token)
                    .await
                {
                    self.finish_fetch(generation, |view| {
                        view.leads = page.data;
                        view.pagination = Some(page.pagination);
                        view.has_data = true;
                    });
                }
            }
            Some(Err(failure)) => {
                if token.is_cancelled() {
                    return;
                }
                warn!(
                    key = %key,
                    class = ?failure.class,
                    attempts = failure.attempts,
                    error = %failure.error,
                    "Leads fetch failed"
                );
                self.inner
                    .notifier
                    .notify(Notification::error(failure.class.user_message()));
                self.finish_fetch(generation, |view| view.error = Some(failure));
            }
        }
    }

    async fn fetch_with_retry(&self, key: &QueryKey) -> Result<LeadsPage, FetchFailure> {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.inner.api.get_leads(key.query()).await {
                Ok(page) => return Ok(page),
                Err(error) => {
                    let class = FailureClass::of(&error);
                    let failures = attempts - 1;
                    if failures >= class.max_retries() {
                        return Err(FetchFailure {
                            class,
                            error,
                            attempts,
                        });
                    }
                    let delay = self.inner.config.retry.delay(failures);
                    debug!(
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying leads fetch"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// Register a fetch for `key`, cancelling whatever was in flight.
    ///
    /// Returns `None` when the same key is already being fetched and `force`
    /// is not set.
    fn begin_fetch(&self, key: &QueryKey, force: bool) -> Option<(CancellationToken, u64)> {
        let mut slot = self.lock_in_flight();
        if let Some(current) = slot.as_ref() {
            if current.key == *key && !force && !current.token.is_cancelled() {
                return None;
            }
            debug!(previous = %current.key, next = %key, "Superseding in-flight fetch");
            current.token.cancel();
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        *slot = Some(InFlight {
            key: key.clone(),
            token: token.clone(),
            generation,
        });
        Some((token, generation))
    }

    /// Publish the result of fetch `generation` if it is still the current one.
    fn finish_fetch<F>(&self, generation: u64, apply: F)
    where
        F: FnOnce(&mut LeadsView),
    {
        let mut slot = self.lock_in_flight();
        if slot.as_ref().map(|f| f.generation) != Some(generation) {
            return;
        }
        *slot = None;
        self.inner.view.send_modify(|view| {
            apply(view);
            view.is_fetching = false;
        });
    }

    fn cancel_in_flight(&self) {
        let previous = self.lock_in_flight().take();
        if let Some(previous) = previous {
            previous.token.cancel();
            debug!(key = %previous.key, "Cancelled in-flight fetch");
            self.inner.view.send_modify(|view| view.is_fetching = false);
        }
    }

    fn show_page(&self, page: LeadsPage) {
        self.inner.view.send_modify(|view| {
            view.leads = page.data;
            view.pagination = Some(page.pagination);
            view.has_data = true;
            view.error = None;
        });
    }

    /// Re-publish the cached rows of the current key after a cache patch.
    ///
    /// Returns `false` when nothing is cached for the key.
    async fn publish_cached_page(&self) -> bool {
        let key = self.current_key();
        let Some(page) = self.inner.cache.get(&key).await else {
            return false;
        };
        self.inner.view.send_modify(|view| {
            view.leads = page.data;
            view.pagination = Some(page.pagination);
        });
        true
    }

    // === Mutations ===

    /// Apply `patch` locally, then on the server; roll back on failure.
    ///
    /// The view is re-published from the cache (server row or rollback) only
    /// if it still shows the same key. The key is marked stale either way.
    pub async fn update_lead_optimistic(
        &self,
        id: LeadId,
        patch: LeadPatch,
    ) -> Result<Lead, LeadsApiError> {
        self.cancel_in_flight();

        let key = self.current_key();
        let cache = &self.inner.cache;
        let snapshot = cache.get(&key).await;
        let view_row = self
            .inner
            .view
            .borrow()
            .leads
            .iter()
            .find(|l| l.id == id)
            .cloned();

        cache
            .patch(&key, |page| {
                if let Some(lead) = page.find_mut(id) {
                    patch.apply(lead);
                }
            })
            .await;
        self.inner.view.send_modify(|view| {
            if let Some(lead) = view.leads.iter_mut().find(|l| l.id == id) {
                patch.apply(lead);
            }
        });

        let span = info_span!("app.leads.update", lead_id = %id);
        let result = self.inner.api.update_lead(id, &patch).instrument(span).await;

        match &result {
            Ok(updated) => {
                cache
                    .patch(&key, |page| {
                        if let Some(lead) = page.find_mut(id) {
                            *lead = updated.clone();
                        }
                    })
                    .await;
                debug!(lead_id = %id, "Lead updated");
            }
            Err(err) => {
                warn!(lead_id = %id, error = %err, "Lead update failed; rolling back");
                cache.restore(&key, snapshot).await;
                self.inner
                    .notifier
                    .notify(Notification::error("Failed to update lead"));
            }
        }

        // The view only mirrors the cache while it still shows `key`.
        if self.current_key() == key && !self.publish_cached_page().await {
            if let (Err(_), Some(row)) = (&result, view_row) {
                self.inner.view.send_modify(|view| {
                    if let Some(lead) = view.leads.iter_mut().find(|l| l.id == id) {
                        *lead = row;
                    }
                });
            }
        }
        cache.invalidate(&key).await;
        result
    }

    pub async fn bulk_approve(&self, ids: &[LeadId]) -> Result<(), LeadsApiError> {
        let result = self.inner.api.bulk_approve(ids).await;
        match &result {
            Ok(()) => {
                info!(count = ids.len(), "Leads approved");
                self.inner
                    .notifier
                    .notify(Notification::success(format!("Approved {} lead(s)", ids.len())));
            }
            Err(err) => {
                warn!(count = ids.len(), error = %err, "Bulk approve failed");
                self.inner
                    .notifier
                    .notify(Notification::error("Failed to approve leads"));
            }
        }
        self.inner.cache.invalidate_prefix(LEADS_KEY_PREFIX).await;
        result
    }

    pub async fn bulk_reject(
        &self,
        ids: &[LeadId],
        reason: Option<&str>,
    ) -> Result<(), LeadsApiError> {
        let result = self.inner.api.bulk_reject(ids, reason).await;
        match &result {
            Ok(()) => {
                info!(count = ids.len(), "Leads rejected");
                self.inner
                    .notifier
                    .notify(Notification::success(format!("Rejected {} lead(s)", ids.len())));
            }
            Err(err) => {
                warn!(count = ids.len(), error = %err, "Bulk reject failed");
                self.inner
                    .notifier
                    .notify(Notification::error("Failed to reject leads"));
            }
        }
        self.inner.cache.invalidate_prefix(LEADS_KEY_PREFIX).await;
        result
    }

    pub async fn add_tag(&self, lead_id: LeadId, tag_id: &TagId) -> Result<bool, LeadsApiError> {
        let attached = self.inner.tags.add_tag(lead_id, tag_id).await?;
        if attached {
            self.publish_cached_page().await;
        }
        Ok(attached)
    }

    pub async fn remove_tag(&self, lead_id: LeadId, tag_id: &TagId) -> Result<(), LeadsApiError> {
        let result = self.inner.tags.remove_tag(lead_id, tag_id).await;
        self.publish_cached_page().await;
        result
    }

    pub async fn create_tag(&self, name: &str, color: &str) -> Tag {
        self.inner.tags.create_tag(name, color).await
    }

    // === Helpers ===

    fn url_location(&self) -> Option<&Arc<dyn LocationPort>> {
        if self.inner.config.url_sync {
            self.inner.location.as_ref()
        } else {
            None
        }
    }

    /// Mirror state into the location. Suppressed until hydration has run.
    fn write_location(&self) {
        let Some(location) = self.url_location() else {
            return;
        };
        let query = {
            let state = self.lock_state();
            if !state.hydrated {
                return;
            }
            UrlState::new(&state.filters, state.sort.as_ref(), state.page).to_query_string()
        };
        location.replace_query_string(&query);
    }

    fn publish_state(&self) {
        let state = self.lock_state().clone();
        self.inner.view.send_modify(|view| {
            view.filters = state.filters;
            view.sort = state.sort;
            view.page = state.page;
        });
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.inner.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(super) fn lock_listener(&self) -> MutexGuard<'_, Option<AbortHandle>> {
        self.inner.listener.lock().unwrap_or_else(|e| e.into_inner())
    }
}
