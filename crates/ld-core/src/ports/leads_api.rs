//! Leads API port - the server the sync layer reconciles against.

use async_trait::async_trait;
use thiserror::Error;

use crate::ids::{LeadId, SavedViewId, TagId};
use crate::lead::{Lead, LeadFilters, LeadPatch, LeadSort, LeadsPage, LeadsQuery};
use crate::saved_view::SavedView;
use crate::tag::Tag;

/// Failure reported by the leads API.
///
/// Carries enough shape for the application layer to classify the failure
/// (status code, timeout, connection) without knowing the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeadsApiError {
    #[error("server responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("request failed: {0}")]
    Other(String),
}

impl LeadsApiError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            LeadsApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Leads API port
///
/// Cancellation is expressed by dropping the returned future; adapters must
/// not keep side effects running after the future is dropped.
#[async_trait]
pub trait LeadsApiPort: Send + Sync {
    // === Leads ===

    async fn get_leads(&self, query: &LeadsQuery) -> Result<LeadsPage, LeadsApiError>;

    async fn update_lead(&self, id: LeadId, patch: &LeadPatch) -> Result<Lead, LeadsApiError>;

    async fn bulk_approve(&self, ids: &[LeadId]) -> Result<(), LeadsApiError>;

    async fn bulk_reject(&self, ids: &[LeadId], reason: Option<&str>)
        -> Result<(), LeadsApiError>;

    // === Tags ===

    async fn get_tags(&self) -> Result<Vec<Tag>, LeadsApiError>;

    async fn create_tag(&self, name: &str, color: &str) -> Result<Tag, LeadsApiError>;

    async fn add_tag(&self, lead_id: LeadId, tag_id: &TagId) -> Result<(), LeadsApiError>;

    async fn remove_tag(&self, lead_id: LeadId, tag_id: &TagId) -> Result<(), LeadsApiError>;

    // === Saved views ===

    async fn get_saved_views(&self) -> Result<Vec<SavedView>, LeadsApiError>;

    async fn create_saved_view(
        &self,
        name: &str,
        filters: &LeadFilters,
        sort: Option<&LeadSort>,
    ) -> Result<SavedView, LeadsApiError>;

    async fn delete_saved_view(&self, id: &SavedViewId) -> Result<(), LeadsApiError>;
}
