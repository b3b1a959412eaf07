//! HTTP client seam.
//!
//! Weather providers and the IP geolocator depend on [`HttpClient`] rather
//! than on `reqwest` directly, so tests can hand them a generated mock.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::error::HttpError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = concat!("treasure/", env!("CARGO_PKG_VERSION"));

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Perform a GET request. Non-2xx statuses are returned, not raised.
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError>;
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    http: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        // The builder only fails when the TLS backend cannot initialise; fall
        // back to the stock client so construction stays infallible.
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self { http }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, HttpError> {
        debug!(url = %redact(url), "GET");

        let res = self.http.get(url).send().await.map_err(|e| HttpError::Request {
            url: redact(url),
            message: e.to_string(),
        })?;

        let status = res.status().as_u16();
        let body = res.text().await.map_err(|e| HttpError::Body {
            url: redact(url),
            message: e.to_string(),
        })?;

        debug!(status, bytes = body.len(), "response received");

        Ok(HttpResponse { status, body })
    }
}

/// Build a URL with encoded query parameters.
pub fn build_url(base: &str, params: &[(&str, &str)]) -> Result<String, HttpError> {
    Url::parse_with_params(base, params)
        .map(String::from)
        .map_err(|e| HttpError::InvalidUrl { url: base.to_string(), message: e.to_string() })
}

/// GET `url` and decode a JSON body, turning non-2xx statuses into errors that
/// carry the status and a truncated body. `label` names the call in messages.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    http: &dyn HttpClient,
    url: &str,
    label: &str,
) -> anyhow::Result<T> {
    let res = http
        .get(url)
        .await
        .with_context(|| format!("Failed to send request to {label}"))?;

    if !res.is_success() {
        return Err(anyhow!(
            "{label} request failed with status {}: {}",
            res.status,
            truncate_body(&res.body),
        ));
    }

    serde_json::from_str(&res.body).with_context(|| format!("Failed to parse {label} JSON"))
}

/// Shorten a response body for use in error messages.
pub fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }

    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// Strip the query string, which carries API keys, before a URL is logged or
/// placed in an error.
fn redact(url: &str) -> String {
    match url.split_once('?') {
        Some((path, _)) => format!("{path}?..."),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_encodes_params() {
        let url = build_url("https://example.com/api", &[("q", "New York, US"), ("units", "metric")])
            .expect("valid url");

        assert_eq!(url, "https://example.com/api?q=New+York%2C+US&units=metric");
    }

    #[test]
    fn build_url_rejects_garbage() {
        let err = build_url("not a url", &[]).unwrap_err();
        assert!(matches!(err, HttpError::InvalidUrl { .. }));
    }

    #[test]
    fn truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("oops"), "oops");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(150);
        let out = truncate_body(&body);

        assert!(out.ends_with("..."));
        assert_eq!(out.len(), 200 + 3);
    }

    #[test]
    fn redact_hides_query() {
        assert_eq!(redact("https://x.test/a?key=secret"), "https://x.test/a?...");
        assert_eq!(redact("https://x.test/a"), "https://x.test/a");
    }

    #[test]
    fn success_range() {
        assert!(HttpResponse { status: 204, body: String::new() }.is_success());
        assert!(!HttpResponse { status: 404, body: String::new() }.is_success());
    }
}
