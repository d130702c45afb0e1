//! Runtime configuration for the sync use cases.
//!
//! The pure `AppConfig` DTO from `ld-core` leaves absent values empty; this
//! module is where defaults are decided.

use std::time::Duration;

use ld_core::config::AppConfig;
use ld_core::LeadSort;

use crate::policy::RetryPolicy;

pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);
pub const DEFAULT_PENDING_TAGS_KEY: &str = "leaddesk.pendingTags";
pub const DEFAULT_TAG_RETRY_BASE: Duration = Duration::from_secs(5);
pub const DEFAULT_TAG_RETRY_MAX: Duration = Duration::from_secs(60);
pub const DEFAULT_TAG_RETRY_GROWTH: f64 = 1.5;

/// Configuration of the leads synchronization controller.
#[derive(Debug, Clone)]
pub struct LeadsSyncConfig {
    /// Fixed for the lifetime of a controller.
    pub page_size: u32,
    /// Quiet period before filter edits reach the query key.
    pub debounce: Duration,
    /// Mirror filter/sort/page into the location query string.
    pub url_sync: bool,
    /// Age after which a cached page is refetched on read.
    pub stale_time: Duration,
    /// Sort used when neither the URL nor the user picked one.
    pub default_sort: Option<LeadSort>,
    pub retry: RetryPolicy,
}

impl Default for LeadsSyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            debounce: DEFAULT_DEBOUNCE,
            url_sync: true,
            stale_time: DEFAULT_STALE_TIME,
            default_sort: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl LeadsSyncConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        let defaults = Self::default();
        let sync = &config.sync;
        Self {
            page_size: sync.page_size.filter(|s| *s > 0).unwrap_or(defaults.page_size),
            debounce: sync
                .debounce_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.debounce),
            url_sync: sync.url_sync.unwrap_or(defaults.url_sync),
            stale_time: sync
                .stale_time_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.stale_time),
            ..defaults
        }
    }
}

/// Configuration of the offline tag manager.
#[derive(Debug, Clone)]
pub struct TagSyncConfig {
    /// Durable storage key holding the pending tag list.
    pub storage_key: String,
    /// Reconciliation interval while the queue is empty.
    pub retry_base: Duration,
    /// Ceiling of the reconciliation interval.
    pub retry_max: Duration,
    /// Interval multiplier applied after each tick that leaves tags queued.
    pub retry_growth: f64,
}

impl Default for TagSyncConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_PENDING_TAGS_KEY.to_string(),
            retry_base: DEFAULT_TAG_RETRY_BASE,
            retry_max: DEFAULT_TAG_RETRY_MAX,
            retry_growth: DEFAULT_TAG_RETRY_GROWTH,
        }
    }
}

impl TagSyncConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        let defaults = Self::default();
        let tags = &config.tags;
        Self {
            storage_key: tags
                .storage_key
                .clone()
                .filter(|k| !k.is_empty())
                .unwrap_or(defaults.storage_key),
            retry_base: tags
                .retry_base_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base),
            retry_max: tags
                .retry_max_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_max),
            retry_growth: tags
                .retry_growth
                .filter(|g| *g >= 1.0)
                .unwrap_or(defaults.retry_growth),
        }
    }
}
