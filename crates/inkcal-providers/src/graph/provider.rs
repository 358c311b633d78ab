//! Microsoft Graph provider implementation.
//!
//! This module implements the [`CalendarProvider`] trait for Microsoft Graph.

use inkcal_core::TimeWindow;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider};
use crate::raw_event::RawEvent;

use super::auth::acquire_token;
use super::client::GraphClient;
use super::config::GraphConfig;

const PROVIDER_NAME: &str = "graph";

/// Microsoft Graph calendar provider.
///
/// Reads one user's `calendarView`. Every fetch requests its own token; a
/// rejected token is reported as is.
pub struct GraphProvider {
    config: GraphConfig,
    client: GraphClient,
}

impl GraphProvider {
    /// Creates a new Graph provider with the given configuration.
    ///
    /// No request is made until the first fetch.
    pub fn new(config: GraphConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;
        let client = GraphClient::new(&config)?;
        Ok(Self { config, client })
    }

    async fn fetch(&self, window: TimeWindow) -> ProviderResult<Vec<RawEvent>> {
        let token = acquire_token(self.client.http_client(), &self.config).await?;
        self.client.calendar_view(token.value(), window).await
    }
}

impl CalendarProvider for GraphProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn fetch_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<RawEvent>>> {
        Box::pin(async move {
            debug!(
                user = %self.config.user_id,
                start = %window.start_param(),
                end = %window.end_param(),
                "fetching calendar view"
            );
            let events = self
                .fetch(window)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))?;
            info!(count = events.len(), "fetched events");
            Ok(events)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use crate::graph::GraphCredentials;
    use chrono::{TimeZone, Utc};
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    const TOKEN: &str = r#"{"token_type":"Bearer","expires_in":3599,"access_token":"eyJ0eXAi"}"#;
    const EXPIRED: &str =
        r#"{"error":{"code":"InvalidAuthenticationToken","message":"Access token has expired."}}"#;

    /// Loopback stand-in for both the token endpoint and Graph.
    ///
    /// Token requests (POST) succeed, every Graph request is answered with 401.
    struct RejectingGraph {
        base: String,
        token_requests: Arc<AtomicUsize>,
        api_requests: Arc<AtomicUsize>,
    }

    impl RejectingGraph {
        fn start() -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let token_requests = Arc::new(AtomicUsize::new(0));
            let api_requests = Arc::new(AtomicUsize::new(0));

            let (tokens, api) = (token_requests.clone(), api_requests.clone());
            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { return };
                    let (status, body) = if read_request(&stream).starts_with("POST") {
                        tokens.fetch_add(1, Ordering::SeqCst);
                        ("200 OK", TOKEN)
                    } else {
                        api.fetch_add(1, Ordering::SeqCst);
                        ("401 Unauthorized", EXPIRED)
                    };
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes());
                }
            });

            Self {
                base,
                token_requests,
                api_requests,
            }
        }
    }

    /// Reads the request head and body, returning the head.
    fn read_request(stream: &TcpStream) -> String {
        let mut reader = BufReader::new(stream);
        let mut head = String::new();
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 {
                break;
            }
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap_or(0);
            }
            let done = line == "\r\n";
            head.push_str(&line);
            if done {
                break;
            }
        }
        let mut body = vec![0; content_length];
        let _ = reader.read_exact(&mut body);
        head
    }

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2025, 9, 10, 22, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 9, 17, 22, 0, 0).unwrap(),
        )
    }

    #[test]
    fn rejects_invalid_config() {
        let config = GraphConfig::new(GraphCredentials::AccessToken("t".into()), "");
        let err = GraphProvider::new(config).err().unwrap();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    #[tokio::test]
    async fn rejected_token_fails_without_retry() {
        let server = RejectingGraph::start();
        let credentials = GraphCredentials::ClientSecret {
            tenant_id: "contoso.onmicrosoft.com".into(),
            client_id: "app".into(),
            client_secret: "secret".into(),
        };
        let config = GraphConfig::new(credentials, "someone@contoso.com")
            .with_api_base(&server.base)
            .with_login_base(&server.base);
        let provider = GraphProvider::new(config).unwrap();

        let err = provider.fetch_events(window()).await.unwrap_err();

        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.provider(), Some("graph"));
        assert!(err.message().contains("Access token has expired"));
        assert_eq!(server.token_requests.load(Ordering::SeqCst), 1);
        assert_eq!(server.api_requests.load(Ordering::SeqCst), 1);
    }
}
