use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// User-selected filters for the leads list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadFilters {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub source: Vec<String>,
    #[serde(default)]
    pub qa_status: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl LeadFilters {
    pub fn is_empty(&self) -> bool {
        self.search.is_empty()
            && self.source.is_empty()
            && self.qa_status.is_empty()
            && self.tags.is_empty()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadSort {
    pub field: String,
    pub direction: SortDirection,
}

impl LeadSort {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}
