//! Saved filter/sort presets.

use serde::{Deserialize, Serialize};

use crate::ids::SavedViewId;
use crate::lead::{LeadFilters, LeadSort};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedView {
    pub id: SavedViewId,
    pub name: String,
    pub filters: LeadFilters,
    pub sort: Option<LeadSort>,
}
