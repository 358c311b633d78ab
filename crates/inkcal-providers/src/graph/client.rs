//! Microsoft Graph `calendarView` client.
//!
//! This module provides the low-level HTTP side of the provider: request
//! building, paging over `@odata.nextLink`, and status code mapping.

use inkcal_core::TimeWindow;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::raw_event::RawEvent;

use super::config::GraphConfig;

/// Upper bound on followed `@odata.nextLink`s, against a service that never
/// stops paging.
const MAX_PAGES: usize = 50;

/// One page of a `calendarView` response.
#[derive(Debug, Deserialize)]
pub(crate) struct EventPage {
    #[serde(default)]
    pub value: Vec<RawEvent>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

/// Graph error envelope (`{"error": {"code": ..., "message": ...}}`).
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

/// Microsoft Graph API client.
#[derive(Debug)]
pub struct GraphClient {
    http_client: reqwest::Client,
    api_base: Url,
    user_id: String,
    page_size: u32,
}

impl GraphClient {
    /// Creates a client for the configured user.
    pub fn new(config: &GraphConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
            })?;
        let api_base = Url::parse(&config.api_base)
            .map_err(|e| ProviderError::configuration(format!("invalid api_base: {}", e)))?;

        Ok(Self {
            http_client,
            api_base,
            user_id: config.user_id.clone(),
            page_size: config.page_size,
        })
    }

    /// The underlying HTTP client, shared with the token request.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Fetches every event of the calendar view, following `@odata.nextLink`.
    pub async fn calendar_view(
        &self,
        access_token: &str,
        window: TimeWindow,
    ) -> ProviderResult<Vec<RawEvent>> {
        let mut all_events = Vec::new();
        let mut url = calendar_view_url(&self.api_base, &self.user_id, window, self.page_size)?;

        for page_number in 1..=MAX_PAGES {
            let page = self.fetch_page(access_token, url).await?;
            debug!(page = page_number, events = page.value.len(), "fetched calendar page");
            all_events.extend(page.value);

            match page.next_link {
                Some(link) => url = next_page_url(&self.api_base, &link)?,
                None => {
                    debug!("fetched {} events for {}", all_events.len(), self.user_id);
                    return Ok(all_events);
                }
            }
        }

        warn!(max_pages = MAX_PAGES, "calendar view paging did not terminate");
        Err(ProviderError::invalid_response(format!(
            "calendar view exceeded {} pages",
            MAX_PAGES
        )))
    }

    /// Fetches a single page.
    async fn fetch_page(&self, access_token: &str, url: Url) -> ProviderResult<EventPage> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(access_token)
            .header("Prefer", "outlook.timezone=\"UTC\"")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network("request timeout")
                } else if e.is_connect() {
                    ProviderError::network(format!("connection failed: {}", e))
                } else {
                    ProviderError::network(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(status_error(status, retry_after, &body));
        }

        parse_page(&body)
    }
}

/// Builds the first `calendarView` request URL.
pub(crate) fn calendar_view_url(
    api_base: &Url,
    user_id: &str,
    window: TimeWindow,
    page_size: u32,
) -> ProviderResult<Url> {
    let mut url = Url::parse(&format!(
        "{}/users/{}/calendarView",
        api_base.as_str().trim_end_matches('/'),
        urlencoding::encode(user_id)
    ))
    .map_err(|e| ProviderError::configuration(format!("invalid calendar URL: {}", e)))?;

    url.query_pairs_mut()
        .append_pair("startDateTime", &window.start_param())
        .append_pair("endDateTime", &window.end_param())
        .append_pair("$orderby", "start/dateTime")
        .append_pair("$top", &page_size.to_string());
    Ok(url)
}

/// Validates an `@odata.nextLink` before following it.
///
/// The bearer token is attached to every page request, so the link must
/// stay on the configured Graph host.
pub(crate) fn next_page_url(api_base: &Url, link: &str) -> ProviderResult<Url> {
    let url = Url::parse(link)
        .map_err(|e| ProviderError::invalid_response(format!("invalid nextLink: {}", e)))?;

    if url.scheme() != api_base.scheme() || url.host_str() != api_base.host_str() {
        return Err(ProviderError::invalid_response(format!(
            "nextLink points to another host: {}",
            url.host_str().unwrap_or("<none>")
        )));
    }
    Ok(url)
}

/// Parses a successful page body.
pub(crate) fn parse_page(body: &str) -> ProviderResult<EventPage> {
    serde_json::from_str(body)
        .map_err(|e| ProviderError::invalid_response(format!("failed to parse response: {}", e)))
}

/// Maps an unsuccessful response to a provider error.
pub(crate) fn status_error(
    status: reqwest::StatusCode,
    retry_after: Option<u64>,
    body: &str,
) -> ProviderError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| format!("{}: {}", e.error.code, e.error.message))
        .unwrap_or_else(|_| body.to_string());

    match status {
        reqwest::StatusCode::UNAUTHORIZED => {
            ProviderError::authentication(format!("access token rejected: {}", detail))
        }
        reqwest::StatusCode::FORBIDDEN => {
            ProviderError::authorization(format!("access denied to calendar: {}", detail))
        }
        reqwest::StatusCode::NOT_FOUND => {
            ProviderError::not_found(format!("user or calendar not found: {}", detail))
        }
        reqwest::StatusCode::BAD_REQUEST => {
            ProviderError::bad_request(format!("request rejected: {}", detail))
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )),
        _ => ProviderError::server(format!("API error ({}): {}", status, detail)),
    }
}
