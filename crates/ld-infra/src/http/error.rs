use ld_core::ports::LeadsApiError;
use reqwest::{Response, StatusCode};
use serde::Deserialize;

/// Error body shapes the API is known to return.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

pub(crate) fn map_transport_error(error: reqwest::Error) -> LeadsApiError {
    if error.is_timeout() {
        LeadsApiError::Timeout
    } else if let Some(status) = error.status() {
        LeadsApiError::status(status.as_u16(), status_reason(status))
    } else if error.is_decode() {
        LeadsApiError::Decode(error.to_string())
    } else if error.is_connect() || error.is_request() || error.is_body() {
        // A body error that is not a parse failure means the stream broke.
        LeadsApiError::Connection(error.to_string())
    } else {
        LeadsApiError::Other(error.to_string())
    }
}

/// Pass successful responses through; turn the rest into a status error that
/// carries the server's message when it sent one.
pub(crate) async fn check_status(response: Response) -> Result<Response, LeadsApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_message(&body).unwrap_or_else(|| status_reason(status));
    Err(LeadsApiError::status(status.as_u16(), message))
}

fn extract_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed.message.or(parsed.error).filter(|m| !m.is_empty())
}

fn status_reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("unexpected status")
        .to_string()
}
