//! Builds the controller graph from configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ld_app::{LeadsSyncConfig, LeadsSyncController, LeadsSyncDeps, TagSyncConfig};
use ld_core::config::AppConfig;
use ld_core::ports::{LocationPort, NotifierPort};
use ld_infra::{FileDurableStorage, HttpLeadsApi, HttpLeadsApiConfig, SystemClock};
use tracing::info;

pub struct WiredApp {
    pub controller: LeadsSyncController,
    pub data_dir: PathBuf,
}

/// Data directory from config, or the platform default.
pub fn resolve_data_dir(config: &AppConfig) -> anyhow::Result<PathBuf> {
    match &config.storage.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => ld_infra::default_data_dir(),
    }
}

/// Wire the HTTP API, file storage and system clock into a controller.
///
/// # Errors
///
/// Fails when `api.base_url` is empty, the HTTP client cannot be built, or
/// the storage directory cannot be created.
pub fn wire_controller(
    config: &AppConfig,
    location: Option<Arc<dyn LocationPort>>,
    notifier: Arc<dyn NotifierPort>,
) -> anyhow::Result<WiredApp> {
    let base_url = config.api.base_url.trim();
    if base_url.is_empty() {
        anyhow::bail!("api.base_url must be set in the config file");
    }

    let mut api_config = HttpLeadsApiConfig::new(base_url);
    if let Some(secs) = config.api.timeout_secs {
        api_config.timeout = Duration::from_secs(secs);
    }
    let api = HttpLeadsApi::new(&api_config).context("Failed to build leads API client")?;

    let data_dir = resolve_data_dir(config)?;
    let storage = FileDurableStorage::new_in_data_root(&data_dir)?;

    let sync_config = LeadsSyncConfig::from_app_config(config);
    let tag_config = TagSyncConfig::from_app_config(config);
    info!(
        base_url,
        data_dir = %data_dir.display(),
        page_size = sync_config.page_size,
        "Wiring leads controller"
    );

    let controller = LeadsSyncController::new(
        LeadsSyncDeps {
            api: Arc::new(api),
            notifier,
            location,
            clock: Arc::new(SystemClock),
            storage: Arc::new(storage),
        },
        sync_config,
        tag_config,
    );

    Ok(WiredApp {
        controller,
        data_dir,
    })
}
