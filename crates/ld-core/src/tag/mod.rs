//! Tag domain model.
//!
//! Tags have two lifecycles: confirmed tags carry a server-issued id, pending
//! tags carry a client-generated `temp-` id until the server accepts them.

use serde::{Deserialize, Serialize};

use crate::ids::TagId;

/// Reserved id prefix for tags that have not been confirmed by the server.
pub const TEMP_TAG_PREFIX: &str = "temp-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub pending: bool,
}

impl Tag {
    pub fn confirmed(
        id: impl Into<TagId>,
        name: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            pending: false,
        }
    }

    pub fn pending(id: TagId, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
            pending: true,
        }
    }

    /// A tag is pending if flagged so or if it still carries a temporary id.
    pub fn is_pending(&self) -> bool {
        self.pending || is_temp_tag_id(&self.id)
    }
}

pub fn is_temp_tag_id(id: &TagId) -> bool {
    id.as_str().starts_with(TEMP_TAG_PREFIX)
}

/// Build a temporary id from a millisecond timestamp.
///
/// `taken` reports ids already in use; a numeric suffix is appended until the
/// id is free so two tags created within the same millisecond stay distinct.
pub fn temp_tag_id(now_ms: i64, taken: impl Fn(&TagId) -> bool) -> TagId {
    let base = TagId::new(format!("{TEMP_TAG_PREFIX}{now_ms}"));
    if !taken(&base) {
        return base;
    }
    let mut seq: u32 = 1;
    loop {
        let candidate = TagId::new(format!("{TEMP_TAG_PREFIX}{now_ms}-{seq}"));
        if !taken(&candidate) {
            return candidate;
        }
        seq = seq.saturating_add(1);
    }
}
