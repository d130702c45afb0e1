//! Shared fakes for the use case tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Once};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use ld_app::config::{LeadsSyncConfig, TagSyncConfig, DEFAULT_PAGE_SIZE};
use ld_app::{LeadsSyncController, LeadsSyncDeps, OfflineTagManager, OfflineTagManagerDeps, QueryCache};
use ld_core::ports::{ClockPort, LeadsApiError, LeadsApiPort, NotifierPort};
use ld_core::{
    Lead, LeadFilters, LeadId, LeadPatch, LeadSort, LeadsPage, LeadsQuery, Notification,
    NotificationLevel, Pagination, QaStatus, QueryKey, SavedView, SavedViewId, Tag, TagId,
};
use ld_infra::{InMemoryDurableStorage, MemoryLocation};
use tokio::time::{sleep, Instant};

pub const NOW_MS: i64 = 1_700_000_000_000;

static TRACE_INIT: Once = Once::new();

/// Route logs through the test writer; `RUST_LOG=debug` shows them.
pub fn init_tracing() {
    TRACE_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn lead(id: i64, name: &str) -> Lead {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Lead {
        id: LeadId::new(id),
        correlation_id: None,
        name: Some(name.to_string()),
        company: None,
        email: None,
        phone: None,
        website: None,
        source: "linkedin".to_string(),
        audit_score: None,
        lead_score: Some(50),
        qa_status: QaStatus::Pending,
        tags: Vec::new(),
        created_at: at,
        updated_at: at,
    }
}

/// Timestamp the fake server stamps on every lead it updates.
pub fn server_updated_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Page the fake server returns for `query`: two leads numbered after the page.
pub fn page_for(query: &LeadsQuery) -> LeadsPage {
    let first = i64::from(query.page) * 10 + 1;
    LeadsPage {
        data: vec![
            lead(first, &format!("Lead {first}")),
            lead(first + 1, &format!("Lead {}", first + 1)),
        ],
        pagination: Pagination {
            page: query.page,
            page_size: query.page_size,
            total: 100,
            total_pages: 4,
        },
    }
}

pub fn leads_key(page: u32, filters: &LeadFilters, sort: Option<&LeadSort>) -> QueryKey {
    QueryKey::leads(page, DEFAULT_PAGE_SIZE, filters, sort)
}

// === Fake API ===

#[derive(Default)]
struct FakeState {
    lead_queries: Vec<LeadsQuery>,
    lead_failures: HashMap<u32, VecDeque<LeadsApiError>>,
    lead_delays: HashMap<u32, Duration>,
    update_failure: Option<LeadsApiError>,
    update_delay: Option<Duration>,
    updates: Vec<(LeadId, LeadPatch)>,
    bulk_failure: Option<LeadsApiError>,
    approved: Vec<Vec<LeadId>>,
    rejected: Vec<(Vec<LeadId>, Option<String>)>,
    tags: Vec<Tag>,
    tag_fetches: usize,
    tag_create_attempts: Vec<Instant>,
    tag_create_delay: Option<Duration>,
    tag_op_failure: Option<LeadsApiError>,
    attached: Vec<(LeadId, TagId)>,
    detached: Vec<(LeadId, TagId)>,
    views: Vec<SavedView>,
    view_failure: Option<LeadsApiError>,
    next_id: u32,
}

/// In-process leads server with scriptable failures and latency.
#[derive(Default)]
pub struct FakeLeadsApi {
    state: Mutex<FakeState>,
    offline: AtomicBool,
}

impl FakeLeadsApi {
    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn fail_page(&self, page: u32, errors: Vec<LeadsApiError>) {
        self.lock().lead_failures.insert(page, errors.into());
    }

    pub fn delay_page(&self, page: u32, delay: Duration) {
        self.lock().lead_delays.insert(page, delay);
    }

    pub fn fail_updates(&self, error: LeadsApiError) {
        self.lock().update_failure = Some(error);
    }

    pub fn delay_updates(&self, delay: Duration) {
        self.lock().update_delay = Some(delay);
    }

    pub fn fail_bulk(&self, error: LeadsApiError) {
        self.lock().bulk_failure = Some(error);
    }

    pub fn fail_tag_ops(&self, error: LeadsApiError) {
        self.lock().tag_op_failure = Some(error);
    }

    pub fn fail_views(&self, error: LeadsApiError) {
        self.lock().view_failure = Some(error);
    }

    pub fn clear_view_failure(&self) {
        self.lock().view_failure = None;
    }

    /// Tag creation and listing fail with a connection error while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn seed_tags(&self, tags: Vec<Tag>) {
        self.lock().tags = tags;
    }

    pub fn lead_queries(&self) -> Vec<LeadsQuery> {
        self.lock().lead_queries.clone()
    }

    pub fn updates(&self) -> Vec<(LeadId, LeadPatch)> {
        self.lock().updates.clone()
    }

    pub fn approved(&self) -> Vec<Vec<LeadId>> {
        self.lock().approved.clone()
    }

    pub fn rejected(&self) -> Vec<(Vec<LeadId>, Option<String>)> {
        self.lock().rejected.clone()
    }

    pub fn server_tags(&self) -> Vec<Tag> {
        self.lock().tags.clone()
    }

    pub fn tag_fetches(&self) -> usize {
        self.lock().tag_fetches
    }

    pub fn tag_create_attempts(&self) -> Vec<Instant> {
        self.lock().tag_create_attempts.clone()
    }

    /// Tag creation answers only after `delay`; `None` answers at once.
    pub fn delay_tag_creates(&self, delay: Option<Duration>) {
        self.lock().tag_create_delay = delay;
    }

    pub fn clear_tag_create_attempts(&self) {
        self.lock().tag_create_attempts.clear();
    }

    pub fn attached(&self) -> Vec<(LeadId, TagId)> {
        self.lock().attached.clone()
    }

    pub fn detached(&self) -> Vec<(LeadId, TagId)> {
        self.lock().detached.clone()
    }

    fn offline_error(&self) -> Option<LeadsApiError> {
        self.offline
            .load(Ordering::SeqCst)
            .then(|| LeadsApiError::Connection("offline".to_string()))
    }
}

#[async_trait]
impl LeadsApiPort for FakeLeadsApi {
    async fn get_leads(&self, query: &LeadsQuery) -> Result<LeadsPage, LeadsApiError> {
        let (delay, failure) = {
            let mut state = self.lock();
            state.lead_queries.push(query.clone());
            let delay = state.lead_delays.get(&query.page).copied();
            let failure = state
                .lead_failures
                .get_mut(&query.page)
                .and_then(VecDeque::pop_front);
            (delay, failure)
        };
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(page_for(query)),
        }
    }

    async fn update_lead(&self, id: LeadId, patch: &LeadPatch) -> Result<Lead, LeadsApiError> {
        let (delay, failure) = {
            let mut state = self.lock();
            state.updates.push((id, patch.clone()));
            (state.update_delay, state.update_failure.clone())
        };
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        if let Some(err) = failure {
            return Err(err);
        }
        let mut updated = lead(id.get(), &format!("Lead {id}"));
        patch.apply(&mut updated);
        updated.updated_at = server_updated_at();
        Ok(updated)
    }

    async fn bulk_approve(&self, ids: &[LeadId]) -> Result<(), LeadsApiError> {
        let mut state = self.lock();
        if let Some(err) = state.bulk_failure.clone() {
            return Err(err);
        }
        state.approved.push(ids.to_vec());
        Ok(())
    }

    async fn bulk_reject(&self, ids: &[LeadId], reason: Option<&str>) -> Result<(), LeadsApiError> {
        let mut state = self.lock();
        if let Some(err) = state.bulk_failure.clone() {
            return Err(err);
        }
        state
            .rejected
            .push((ids.to_vec(), reason.map(str::to_string)));
        Ok(())
    }

    async fn get_tags(&self) -> Result<Vec<Tag>, LeadsApiError> {
        let mut state = self.lock();
        state.tag_fetches += 1;
        if let Some(err) = self.offline_error() {
            return Err(err);
        }
        Ok(state.tags.clone())
    }

    async fn create_tag(&self, name: &str, color: &str) -> Result<Tag, LeadsApiError> {
        let delay = {
            let mut state = self.lock();
            state.tag_create_attempts.push(Instant::now());
            state.tag_create_delay
        };
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        let mut state = self.lock();
        if let Some(err) = self.offline_error() {
            return Err(err);
        }
        state.next_id += 1;
        let tag = Tag::confirmed(format!("srv-{}", state.next_id), name, color);
        state.tags.push(tag.clone());
        Ok(tag)
    }

    async fn add_tag(&self, lead_id: LeadId, tag_id: &TagId) -> Result<(), LeadsApiError> {
        let mut state = self.lock();
        if let Some(err) = state.tag_op_failure.clone() {
            return Err(err);
        }
        state.attached.push((lead_id, tag_id.clone()));
        Ok(())
    }

    async fn remove_tag(&self, lead_id: LeadId, tag_id: &TagId) -> Result<(), LeadsApiError> {
        let mut state = self.lock();
        if let Some(err) = state.tag_op_failure.clone() {
            return Err(err);
        }
        state.detached.push((lead_id, tag_id.clone()));
        Ok(())
    }

    async fn get_saved_views(&self) -> Result<Vec<SavedView>, LeadsApiError> {
        let state = self.lock();
        if let Some(err) = state.view_failure.clone() {
            return Err(err);
        }
        Ok(state.views.clone())
    }

    async fn create_saved_view(
        &self,
        name: &str,
        filters: &LeadFilters,
        sort: Option<&LeadSort>,
    ) -> Result<SavedView, LeadsApiError> {
        let mut state = self.lock();
        if let Some(err) = state.view_failure.clone() {
            return Err(err);
        }
        state.next_id += 1;
        let view = SavedView {
            id: SavedViewId::new(format!("view-{}", state.next_id)),
            name: name.to_string(),
            filters: filters.clone(),
            sort: sort.cloned(),
        };
        state.views.push(view.clone());
        Ok(view)
    }

    async fn delete_saved_view(&self, id: &SavedViewId) -> Result<(), LeadsApiError> {
        let mut state = self.lock();
        if let Some(err) = state.view_failure.clone() {
            return Err(err);
        }
        state.views.retain(|v| &v.id != id);
        Ok(())
    }
}

// === Other ports ===

#[derive(Default)]
pub struct RecordingNotifier {
    items: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.items.lock().unwrap().clone()
    }

    pub fn messages(&self, level: NotificationLevel) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|n| n.level == level)
            .map(|n| n.message)
            .collect()
    }

    pub fn clear(&self) {
        self.items.lock().unwrap().clear();
    }
}

impl NotifierPort for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.items.lock().unwrap().push(notification);
    }
}

pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }
}

impl ClockPort for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// === Harnesses ===

pub struct Harness {
    pub api: Arc<FakeLeadsApi>,
    pub notifier: Arc<RecordingNotifier>,
    pub storage: Arc<InMemoryDurableStorage>,
    pub location: Arc<MemoryLocation>,
    pub clock: Arc<FixedClock>,
    pub controller: LeadsSyncController,
}

pub fn harness(initial_query: &str) -> Harness {
    harness_with(
        initial_query,
        LeadsSyncConfig::default(),
        TagSyncConfig::default(),
    )
}

pub fn harness_with(
    initial_query: &str,
    config: LeadsSyncConfig,
    tag_config: TagSyncConfig,
) -> Harness {
    init_tracing();
    let api = Arc::new(FakeLeadsApi::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let storage = Arc::new(InMemoryDurableStorage::new());
    let location = Arc::new(MemoryLocation::new(initial_query));
    let clock = Arc::new(FixedClock::new(NOW_MS));

    let controller = LeadsSyncController::new(
        LeadsSyncDeps {
            api: api.clone(),
            notifier: notifier.clone(),
            location: Some(location.clone()),
            clock: clock.clone(),
            storage: storage.clone(),
        },
        config,
        tag_config,
    );

    Harness {
        api,
        notifier,
        storage,
        location,
        clock,
        controller,
    }
}

pub struct TagHarness {
    pub api: Arc<FakeLeadsApi>,
    pub notifier: Arc<RecordingNotifier>,
    pub storage: Arc<InMemoryDurableStorage>,
    pub clock: Arc<FixedClock>,
    pub cache: Arc<QueryCache>,
    pub manager: Arc<OfflineTagManager>,
}

pub fn tag_harness(config: TagSyncConfig) -> TagHarness {
    init_tracing();
    let api = Arc::new(FakeLeadsApi::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let storage = Arc::new(InMemoryDurableStorage::new());
    let clock = Arc::new(FixedClock::new(NOW_MS));
    let cache = Arc::new(QueryCache::new(Duration::from_secs(30)));

    let manager = Arc::new(OfflineTagManager::new(
        OfflineTagManagerDeps {
            api: api.clone(),
            storage: storage.clone(),
            notifier: notifier.clone(),
            clock: clock.clone(),
            cache: cache.clone(),
        },
        config,
    ));

    TagHarness {
        api,
        notifier,
        storage,
        clock,
        cache,
        manager,
    }
}
