// lpad-net/src/http.rs
use std::time::Duration;

use lpad_common::error::{LpadError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, error};

const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 15;
const USER_AGENT_STRING: &str = concat!("lpad-launcher/", env!("CARGO_PKG_VERSION"));

/// Client for small documents (version file, release listing).
pub fn build_http_client() -> Result<Client> {
    build_client(Some(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
}

/// Client for archive transfers; no overall deadline since payloads are large.
pub fn build_download_client() -> Result<Client> {
    build_client(None)
}

fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| LpadError::Network(format!("Failed to build HTTP client: {e}")))
}

/// Sends a GET and maps transport failures and non-2xx statuses to
/// `LpadError::Network`.
pub(crate) async fn get_checked(client: &Client, url: &str) -> Result<Response> {
    let response = client.get(url).send().await.map_err(|e| {
        debug!("HTTP request failed for {url}: {e}");
        LpadError::Network(format!("HTTP request failed for {url}: {e}"))
    })?;
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);
    if status.is_success() {
        return Ok(response);
    }
    error!("HTTP error {} for URL {}", status, url);
    Err(match status {
        StatusCode::NOT_FOUND => LpadError::Network(format!("Resource not found (404): {url}")),
        StatusCode::FORBIDDEN => LpadError::Network(format!("Access forbidden (403): {url}")),
        _ => LpadError::Network(format!("HTTP error {status} for URL {url}")),
    })
}
