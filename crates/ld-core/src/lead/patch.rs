use serde::{Deserialize, Serialize};

use super::{Lead, QaStatus};

/// Partial set of field changes for a single lead.
///
/// Only `Some` fields are sent to the server and applied locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qa_status: Option<QaStatus>,
}

impl LeadPatch {
    pub fn is_empty(&self) -> bool {
        self == &LeadPatch::default()
    }

    pub fn apply(&self, lead: &mut Lead) {
        if let Some(name) = &self.name {
            lead.name = Some(name.clone());
        }
        if let Some(company) = &self.company {
            lead.company = Some(company.clone());
        }
        if let Some(email) = &self.email {
            lead.email = Some(email.clone());
        }
        if let Some(phone) = &self.phone {
            lead.phone = Some(phone.clone());
        }
        if let Some(website) = &self.website {
            lead.website = Some(website.clone());
        }
        if let Some(source) = &self.source {
            lead.source = source.clone();
        }
        if let Some(score) = self.audit_score {
            lead.audit_score = Some(score);
        }
        if let Some(score) = self.lead_score {
            lead.lead_score = Some(score);
        }
        if let Some(status) = self.qa_status {
            lead.qa_status = status;
        }
    }
}
