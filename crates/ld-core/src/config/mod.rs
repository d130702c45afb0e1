//! # Pure Data Module - Data Transfer Objects Only
//!
//! Maps a TOML document onto [`AppConfig`]. Absent keys stay `None`; defaults
//! are chosen by the layer that consumes each section, never here.

use std::path::PathBuf;

/// Application configuration DTO (pure data, no logic)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub sync: SyncSection,
    pub tags: TagsSection,
    pub storage: StorageSection,
}

/// `[api]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiConfig {
    /// Base URL of the leads API (may be empty - this is a fact, not an error)
    pub base_url: String,
    pub timeout_secs: Option<u64>,
}

/// `[sync]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSection {
    pub page_size: Option<u32>,
    pub debounce_ms: Option<u64>,
    pub url_sync: Option<bool>,
    pub stale_time_secs: Option<u64>,
}

/// `[tags]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagsSection {
    pub storage_key: Option<String>,
    pub retry_base_ms: Option<u64>,
    pub retry_max_ms: Option<u64>,
    pub retry_growth: Option<f64>,
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageSection {
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Create AppConfig from TOML value
    ///
    /// **Prohibited**: This method must NOT contain any validation or default
    /// value logic. Negative integers are dropped because they cannot be
    /// represented, not because they are judged invalid.
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        let get = |section: &str, key: &str| -> Option<toml::Value> {
            toml_value.get(section).and_then(|s| s.get(key)).cloned()
        };
        let get_u64 = |section: &str, key: &str| -> Option<u64> {
            get(section, key)
                .and_then(|v| v.as_integer())
                .and_then(|v| u64::try_from(v).ok())
        };
        let get_str = |section: &str, key: &str| -> Option<String> {
            get(section, key).and_then(|v| v.as_str().map(str::to_string))
        };

        Ok(Self {
            api: ApiConfig {
                base_url: get_str("api", "base_url").unwrap_or_default(),
                timeout_secs: get_u64("api", "timeout_secs"),
            },
            sync: SyncSection {
                page_size: get_u64("sync", "page_size").and_then(|v| u32::try_from(v).ok()),
                debounce_ms: get_u64("sync", "debounce_ms"),
                url_sync: get("sync", "url_sync").and_then(|v| v.as_bool()),
                stale_time_secs: get_u64("sync", "stale_time_secs"),
            },
            tags: TagsSection {
                storage_key: get_str("tags", "storage_key"),
                retry_base_ms: get_u64("tags", "retry_base_ms"),
                retry_max_ms: get_u64("tags", "retry_max_ms"),
                retry_growth: get("tags", "retry_growth").and_then(|v| {
                    v.as_float().or_else(|| v.as_integer().map(|i| i as f64))
                }),
            },
            storage: StorageSection {
                data_dir: get_str("storage", "data_dir").map(PathBuf::from),
            },
        })
    }
}
