//! Lead domain model.
//!
//! A lead is a scraped sales record owned by the server. The client only ever
//! holds a cached copy plus optimistic edits layered on top of it.

mod filters;
mod patch;
mod query;

pub use filters::{LeadFilters, LeadSort, SortDirection};
pub use patch::LeadPatch;
pub use query::{LeadsPage, LeadsQuery, Pagination, QueryKey, LEADS_KEY_PREFIX};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{LeadId, TagId};
use crate::tag::Tag;

/// QA review state of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QaStatus {
    Pending,
    Approved,
    Rejected,
    NeedsReview,
    #[serde(other)]
    Unknown,
}

impl QaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QaStatus::Pending => "pending",
            QaStatus::Approved => "approved",
            QaStatus::Rejected => "rejected",
            QaStatus::NeedsReview => "needs_review",
            QaStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: LeadId,
    /// Identifier of the scraping run that produced the record.
    pub correlation_id: Option<String>,
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub source: String,
    pub audit_score: Option<i32>,
    pub lead_score: Option<i32>,
    pub qa_status: QaStatus,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn has_tag(&self, tag_id: &TagId) -> bool {
        self.tags.iter().any(|t| &t.id == tag_id)
    }

    /// Attach `tag` unless a tag with the same id is already present.
    pub fn attach_tag(&mut self, tag: Tag) -> bool {
        if self.has_tag(&tag.id) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    pub fn detach_tag(&mut self, tag_id: &TagId) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| &t.id != tag_id);
        self.tags.len() != before
    }
}
