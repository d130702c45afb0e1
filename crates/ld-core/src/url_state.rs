//! Query-string codec for the leads list state.
//!
//! Parameter names are part of the public link format and must not change:
//! `search`, `source`, `qaStatus`, `tags`, `dateFrom`, `dateTo`, `page`,
//! `sortField`, `sortDirection`. Multi-select values are comma-joined with each
//! item percent-encoded, so a literal comma inside an item survives.

use chrono::NaiveDate;
use tracing::debug;

use crate::lead::{LeadFilters, LeadSort, SortDirection};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// State recovered from (or written to) the location query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlState {
    pub filters: LeadFilters,
    pub sort: Option<LeadSort>,
    /// `None` when the query string carries no usable page.
    pub page: Option<u32>,
}

impl UrlState {
    pub fn new(filters: &LeadFilters, sort: Option<&LeadSort>, page: u32) -> Self {
        Self {
            filters: filters.clone(),
            sort: sort.cloned(),
            page: Some(page),
        }
    }

    /// Parse a query string, with or without the leading `?`.
    ///
    /// Unknown parameters and malformed values are ignored.
    pub fn parse(query: &str) -> Self {
        let mut state = UrlState::default();
        let mut sort_field: Option<String> = None;
        let mut sort_direction: Option<SortDirection> = None;

        for pair in query.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode(raw_key);
            match key.as_str() {
                "search" => state.filters.search = decode(raw_value),
                "source" => state.filters.source = decode_list(raw_value),
                "qaStatus" => state.filters.qa_status = decode_list(raw_value),
                "tags" => state.filters.tags = decode_list(raw_value),
                "dateFrom" => state.filters.date_from = decode_date(&key, raw_value),
                "dateTo" => state.filters.date_to = decode_date(&key, raw_value),
                "page" => {
                    state.page = decode(raw_value).parse::<u32>().ok().filter(|p| *p >= 1);
                }
                "sortField" => {
                    let field = decode(raw_value);
                    if !field.is_empty() {
                        sort_field = Some(field);
                    }
                }
                "sortDirection" => sort_direction = SortDirection::parse(&decode(raw_value)),
                _ => {}
            }
        }

        state.sort = sort_field.map(|field| LeadSort {
            field,
            direction: sort_direction.unwrap_or_default(),
        });
        state
    }

    /// Render as a query string without the leading `?`.
    ///
    /// Empty strings, empty lists, absent values and page 1 are omitted.
    pub fn to_query_string(&self) -> String {
        let mut params: Vec<(&str, String)> = Vec::new();
        let f = &self.filters;

        if !f.search.is_empty() {
            params.push(("search", encode(&f.search)));
        }
        push_list(&mut params, "source", &f.source);
        push_list(&mut params, "qaStatus", &f.qa_status);
        push_list(&mut params, "tags", &f.tags);
        if let Some(from) = f.date_from {
            params.push(("dateFrom", from.format(DATE_FORMAT).to_string()));
        }
        if let Some(to) = f.date_to {
            params.push(("dateTo", to.format(DATE_FORMAT).to_string()));
        }
        if let Some(page) = self.page.filter(|p| *p > 1) {
            params.push(("page", page.to_string()));
        }
        if let Some(sort) = &self.sort {
            params.push(("sortField", encode(&sort.field)));
            params.push(("sortDirection", sort.direction.as_str().to_string()));
        }

        params
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(value) => value.into_owned(),
        Err(err) => {
            debug!(raw, error = %err, "Ignoring undecodable query value");
            String::new()
        }
    }
}

fn decode_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(decode)
        .filter(|item| !item.is_empty())
        .collect()
}

fn decode_date(key: &str, raw: &str) -> Option<NaiveDate> {
    let value = decode(raw);
    match NaiveDate::parse_from_str(&value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            if !value.is_empty() {
                debug!(key, value = %value, "Ignoring malformed date in query string");
            }
            None
        }
    }
}

fn push_list(params: &mut Vec<(&'static str, String)>, key: &'static str, items: &[String]) {
    let encoded: Vec<String> = items
        .iter()
        .filter(|item| !item.is_empty())
        .map(|item| encode(item))
        .collect();
    if !encoded.is_empty() {
        params.push((key, encoded.join(",")));
    }
}
