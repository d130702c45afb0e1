//! REST adapter for [`LeadsApiPort`].
//!
//! Dropping a returned future drops the underlying request, which is how the
//! application layer cancels superseded fetches.

use std::time::Duration;

use async_trait::async_trait;
use ld_core::ports::{LeadsApiError, LeadsApiPort};
use ld_core::{
    Lead, LeadFilters, LeadId, LeadPatch, LeadSort, LeadsPage, LeadsQuery, SavedView,
    SavedViewId, Tag, TagId,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};

use super::error::{check_status, map_transport_error};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct HttpLeadsApiConfig {
    /// Root of the API, e.g. `https://crm.example.com/api`.
    pub base_url: String,
    pub timeout: Duration,
}

impl HttpLeadsApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub struct HttpLeadsApi {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct IdsBody<'a> {
    ids: &'a [LeadId],
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

#[derive(Serialize)]
struct CreateTagBody<'a> {
    name: &'a str,
    color: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AttachTagBody<'a> {
    tag_id: &'a TagId,
}

#[derive(Serialize)]
struct CreateSavedViewBody<'a> {
    name: &'a str,
    filters: &'a LeadFilters,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<&'a LeadSort>,
}

impl HttpLeadsApi {
    pub fn new(config: &HttpLeadsApiConfig) -> Result<Self, LeadsApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| LeadsApiError::Other(format!("failed to build http client: {err}")))?;
        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, LeadsApiError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let response = check_status(response).await?;
        // Body reads can time out or drop too, not only fail to parse.
        response.json::<T>().await.map_err(map_transport_error)
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), LeadsApiError> {
        let response = request.send().await.map_err(map_transport_error)?;
        check_status(response).await?;
        Ok(())
    }
}

/// Query parameters of `GET /leads`. Empty filters are left out.
fn leads_query_params(query: &LeadsQuery) -> Vec<(&'static str, String)> {
    let filters = &query.filters;
    let mut params = vec![
        ("page", query.page.to_string()),
        ("pageSize", query.page_size.to_string()),
    ];
    if !filters.search.is_empty() {
        params.push(("search", filters.search.clone()));
    }
    if !filters.source.is_empty() {
        params.push(("source", filters.source.join(",")));
    }
    if !filters.qa_status.is_empty() {
        params.push(("qaStatus", filters.qa_status.join(",")));
    }
    if !filters.tags.is_empty() {
        params.push(("tags", filters.tags.join(",")));
    }
    if let Some(from) = filters.date_from {
        params.push(("dateFrom", from.format("%Y-%m-%d").to_string()));
    }
    if let Some(to) = filters.date_to {
        params.push(("dateTo", to.format("%Y-%m-%d").to_string()));
    }
    if let Some(sort) = &query.sort {
        params.push(("sortField", sort.field.clone()));
        params.push(("sortDirection", sort.direction.as_str().to_string()));
    }
    params
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[async_trait]
impl LeadsApiPort for HttpLeadsApi {
    #[instrument(level = "debug", skip_all, fields(page = query.page))]
    async fn get_leads(&self, query: &LeadsQuery) -> Result<LeadsPage, LeadsApiError> {
        let request = self
            .client
            .get(self.url("/leads"))
            .query(&leads_query_params(query));
        let page: LeadsPage = self.send_json(request).await?;
        debug!(rows = page.data.len(), total = page.pagination.total, "Leads page received");
        Ok(page)
    }

    async fn update_lead(&self, id: LeadId, patch: &LeadPatch) -> Result<Lead, LeadsApiError> {
        let request = self
            .client
            .patch(self.url(&format!("/leads/{id}")))
            .json(patch);
        self.send_json(request).await
    }

    async fn bulk_approve(&self, ids: &[LeadId]) -> Result<(), LeadsApiError> {
        let request = self
            .client
            .post(self.url("/leads/bulk-approve"))
            .json(&IdsBody { ids, reason: None });
        self.send_empty(request).await
    }

    async fn bulk_reject(&self, ids: &[LeadId], reason: Option<&str>) -> Result<(), LeadsApiError> {
        let request = self
            .client
            .post(self.url("/leads/bulk-reject"))
            .json(&IdsBody { ids, reason });
        self.send_empty(request).await
    }

    async fn get_tags(&self) -> Result<Vec<Tag>, LeadsApiError> {
        self.send_json(self.client.get(self.url("/tags"))).await
    }

    async fn create_tag(&self, name: &str, color: &str) -> Result<Tag, LeadsApiError> {
        let request = self
            .client
            .post(self.url("/tags"))
            .json(&CreateTagBody { name, color });
        self.send_json(request).await
    }

    async fn add_tag(&self, lead_id: LeadId, tag_id: &TagId) -> Result<(), LeadsApiError> {
        let request = self
            .client
            .post(self.url(&format!("/leads/{lead_id}/tags")))
            .json(&AttachTagBody { tag_id });
        self.send_empty(request).await
    }

    async fn remove_tag(&self, lead_id: LeadId, tag_id: &TagId) -> Result<(), LeadsApiError> {
        let path = format!("/leads/{lead_id}/tags/{}", segment(tag_id.as_str()));
        self.send_empty(self.client.delete(self.url(&path))).await
    }

    async fn get_saved_views(&self) -> Result<Vec<SavedView>, LeadsApiError> {
        self.send_json(self.client.get(self.url("/saved-views"))).await
    }

    async fn create_saved_view(
        &self,
        name: &str,
        filters: &LeadFilters,
        sort: Option<&LeadSort>,
    ) -> Result<SavedView, LeadsApiError> {
        let request = self
            .client
            .post(self.url("/saved-views"))
            .json(&CreateSavedViewBody {
                name,
                filters,
                sort,
            });
        self.send_json(request).await
    }

    async fn delete_saved_view(&self, id: &SavedViewId) -> Result<(), LeadsApiError> {
        let path = format!("/saved-views/{}", segment(id.as_str()));
        self.send_empty(self.client.delete(self.url(&path))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ld_core::{QaStatus, SortDirection};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::io::Write;

    fn build_api(base_url: String) -> HttpLeadsApi {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        HttpLeadsApi::with_client(client, &base_url)
    }

    fn first_page() -> LeadsQuery {
        LeadsQuery {
            page: 1,
            page_size: 25,
            filters: LeadFilters::default(),
            sort: None,
        }
    }

    fn lead_json(id: i64, name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "correlationId": null,
            "name": name,
            "company": null,
            "email": null,
            "phone": null,
            "website": null,
            "source": "linkedin",
            "auditScore": null,
            "leadScore": 40,
            "qaStatus": "pending",
            "tags": [{"id": "7", "name": "hot", "color": "#f00"}],
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z"
        })
    }

    #[tokio::test]
    async fn get_leads_sends_filters_and_decodes_page() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/leads")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "2".into()),
                Matcher::UrlEncoded("pageSize".into(), "10".into()),
                Matcher::UrlEncoded("search".into(), "acme & sons".into()),
                Matcher::UrlEncoded("source".into(), "linkedin,google_maps".into()),
                Matcher::UrlEncoded("dateFrom".into(), "2024-01-31".into()),
                Matcher::UrlEncoded("sortField".into(), "leadScore".into()),
                Matcher::UrlEncoded("sortDirection".into(), "asc".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "data": [lead_json(1, "Acme")],
                    "pagination": {"page": 2, "pageSize": 10, "total": 11, "totalPages": 2}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let api = build_api(server.url());
        let query = LeadsQuery {
            page: 2,
            page_size: 10,
            filters: LeadFilters {
                search: "acme & sons".into(),
                source: vec!["linkedin".into(), "google_maps".into()],
                date_from: NaiveDate::from_ymd_opt(2024, 1, 31),
                ..Default::default()
            },
            sort: Some(LeadSort::new("leadScore", SortDirection::Asc)),
        };

        let page = api.get_leads(&query).await.expect("page should load");

        mock.assert_async().await;
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, LeadId::new(1));
        assert_eq!(page.data[0].tags[0].id, TagId::new("7"));
        assert!(!page.data[0].tags[0].pending);
        assert_eq!(page.pagination.total_pages, 2);
    }

    #[tokio::test]
    async fn server_error_maps_to_status_with_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/leads")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(r#"{"message":"database unavailable"}"#)
            .create_async()
            .await;

        let api = build_api(server.url());
        let query = LeadsQuery {
            page: 1,
            page_size: 25,
            filters: LeadFilters::default(),
            sort: None,
        };

        let err = api.get_leads(&query).await.expect_err("500 should fail");
        assert_eq!(err, LeadsApiError::status(500, "database unavailable"));
    }

    #[tokio::test]
    async fn update_lead_patches_only_set_fields() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/leads/1")
            .match_body(Matcher::Json(json!({"name": "Renamed", "qaStatus": "approved"})))
            .with_status(200)
            .with_body(lead_json(1, "Renamed").to_string())
            .create_async()
            .await;

        let api = build_api(server.url());
        let patch = LeadPatch {
            name: Some("Renamed".into()),
            qa_status: Some(QaStatus::Approved),
            ..Default::default()
        };

        let lead = api
            .update_lead(LeadId::new(1), &patch)
            .await
            .expect("update should succeed");

        mock.assert_async().await;
        assert_eq!(lead.name.as_deref(), Some("Renamed"));
    }

    #[tokio::test]
    async fn bulk_reject_sends_ids_and_reason() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/leads/bulk-reject")
            .match_body(Matcher::Json(json!({"ids": [1, 2], "reason": "duplicate"})))
            .with_status(204)
            .create_async()
            .await;

        let api = build_api(server.url());
        api.bulk_reject(&[LeadId::new(1), LeadId::new(2)], Some("duplicate"))
            .await
            .expect("reject should succeed");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn remove_tag_encodes_tag_segment() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/leads/5/tags/a%20b")
            .with_status(204)
            .create_async()
            .await;

        let api = build_api(server.url());
        api.remove_tag(LeadId::new(5), &TagId::new("a b"))
            .await
            .expect("remove should succeed");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn not_found_without_body_uses_reason() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/saved-views/v1")
            .with_status(404)
            .create_async()
            .await;

        let api = build_api(server.url());
        let err = api
            .delete_saved_view(&SavedViewId::new("v1"))
            .await
            .expect_err("404 should fail");

        assert_eq!(err.status_code(), Some(404));
    }

    #[tokio::test]
    async fn timeout_while_reading_body_is_a_timeout() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/leads")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_chunked_body(|w| {
                w.write_all(br#"{"data":["#)?;
                w.flush()?;
                std::thread::sleep(Duration::from_millis(600));
                w.write_all(br#"],"pagination":{"page":1,"pageSize":25,"total":0,"totalPages":0}}"#)
            })
            .create_async()
            .await;

        let client = Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let api = HttpLeadsApi::with_client(client, &server.url());

        let err = api
            .get_leads(&first_page())
            .await
            .expect_err("slow body must time out");

        assert_eq!(err, LeadsApiError::Timeout);
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/leads")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": "not a list"}"#)
            .create_async()
            .await;

        let api = build_api(server.url());
        let err = api
            .get_leads(&first_page())
            .await
            .expect_err("malformed body must fail");

        assert!(matches!(err, LeadsApiError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        let api = build_api("http://127.0.0.1:1".to_string());
        let err = api.get_tags().await.expect_err("nothing listens on port 1");
        assert!(matches!(err, LeadsApiError::Connection(_)), "{err:?}");
    }
}
