//! Adapters that implement the `ld-core` ports.

pub mod http;
pub mod location;
pub mod notify;
pub mod storage;
pub mod time;

use std::path::PathBuf;

use anyhow::Context;

pub use http::{HttpLeadsApi, HttpLeadsApiConfig};
pub use location::MemoryLocation;
pub use notify::{ChannelNotifier, TracingNotifier};
pub use storage::{FileDurableStorage, InMemoryDurableStorage};
pub use time::SystemClock;

/// Platform data directory for the client, e.g. `~/.local/share/leaddesk`.
pub fn default_data_dir() -> anyhow::Result<PathBuf> {
    let base = dirs::data_local_dir().context("no local data directory on this platform")?;
    Ok(base.join("leaddesk"))
}
