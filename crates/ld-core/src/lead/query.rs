use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use super::{Lead, LeadFilters, LeadSort};

/// Prefix shared by every cached leads page.
pub const LEADS_KEY_PREFIX: &str = "leads";

/// Parameters of one page request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadsQuery {
    pub page: u32,
    pub page_size: u32,
    pub filters: LeadFilters,
    pub sort: Option<LeadSort>,
}

/// Identity of one cached page of results.
///
/// Built from the page, page size, *debounced* filters and sort. Two keys are
/// equal exactly when every component is equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    prefix: &'static str,
    query: LeadsQuery,
}

impl QueryKey {
    pub fn leads(
        page: u32,
        page_size: u32,
        filters: &LeadFilters,
        sort: Option<&LeadSort>,
    ) -> Self {
        Self {
            prefix: LEADS_KEY_PREFIX,
            query: LeadsQuery {
                page,
                page_size,
                filters: filters.clone(),
                sort: sort.cloned(),
            },
        }
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    pub fn query(&self) -> &LeadsQuery {
        &self.query
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.prefix == prefix
    }
}

impl Display for QueryKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let q = &self.query;
        write!(f, "{}[page={},size={}", self.prefix, q.page, q.page_size)?;
        if !q.filters.search.is_empty() {
            write!(f, ",search={:?}", q.filters.search)?;
        }
        if !q.filters.source.is_empty() {
            write!(f, ",source={}", q.filters.source.join("|"))?;
        }
        if !q.filters.qa_status.is_empty() {
            write!(f, ",qa={}", q.filters.qa_status.join("|"))?;
        }
        if !q.filters.tags.is_empty() {
            write!(f, ",tags={}", q.filters.tags.join("|"))?;
        }
        if let Some(from) = q.filters.date_from {
            write!(f, ",from={from}")?;
        }
        if let Some(to) = q.filters.date_to {
            write!(f, ",to={to}")?;
        }
        if let Some(sort) = &q.sort {
            write!(f, ",sort={}:{}", sort.field, sort.direction.as_str())?;
        }
        write!(f, "]")
    }
}

/// Pagination metadata as reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadsPage {
    pub data: Vec<Lead>,
    pub pagination: Pagination,
}

impl LeadsPage {
    pub fn find_mut(&mut self, id: crate::ids::LeadId) -> Option<&mut Lead> {
        self.data.iter_mut().find(|l| l.id == id)
    }
}
