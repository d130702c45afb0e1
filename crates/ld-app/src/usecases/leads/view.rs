use ld_core::{Lead, LeadFilters, LeadSort, Pagination};

use crate::policy::FetchFailure;

/// Snapshot of the leads list as published to subscribers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadsView {
    /// Rows on display. While a page loads these are the previous rows.
    pub leads: Vec<Lead>,
    pub pagination: Option<Pagination>,
    pub filters: LeadFilters,
    pub sort: Option<LeadSort>,
    pub page: u32,
    pub page_size: u32,
    pub is_fetching: bool,
    /// Any page has been shown since mount.
    pub has_data: bool,
    /// Final failure of the latest fetch, cleared when a new fetch starts.
    pub error: Option<FetchFailure>,
}

impl LeadsView {
    /// First load, nothing to show yet.
    pub fn is_initial_loading(&self) -> bool {
        self.is_fetching && !self.has_data
    }

    /// A page change or refetch behind data that is already visible.
    pub fn is_loading_page(&self) -> bool {
        self.is_fetching && self.has_data
    }
}
