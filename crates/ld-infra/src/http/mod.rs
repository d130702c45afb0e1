mod error;
mod leads_api;

pub use leads_api::{HttpLeadsApi, HttpLeadsApiConfig};
