//! # ld-core
//!
//! Core domain models and ports for the LeadDesk sync layer.
//!
//! This crate contains pure domain types and trait contracts without any
//! infrastructure dependencies.

pub mod config;
pub mod ids;
pub mod lead;
pub mod notification;
pub mod ports;
pub mod saved_view;
pub mod tag;
pub mod url_state;

// Re-export commonly used types at the crate root
pub use config::AppConfig;
pub use ids::{LeadId, SavedViewId, TagId};
pub use lead::{
    Lead, LeadFilters, LeadPatch, LeadSort, LeadsPage, LeadsQuery, Pagination, QaStatus,
    QueryKey, SortDirection,
};
pub use notification::{Notification, NotificationLevel};
pub use saved_view::SavedView;
pub use tag::Tag;
pub use url_state::UrlState;
