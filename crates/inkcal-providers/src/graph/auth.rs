//! Client-credentials token acquisition.
//!
//! The display host runs unattended, so there is no interactive sign-in: the
//! application authenticates as itself with a client secret and reads the
//! configured user's calendar through an application permission.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::config::{GraphConfig, GraphCredentials};

/// A bearer token with its expiry.
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    /// `None` for tokens supplied by the caller.
    expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    /// Wraps a token that never expires from our point of view.
    pub fn static_token(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    /// Creates a token valid for `expires_in` seconds after `issued_at`.
    pub fn issued(value: impl Into<String>, issued_at: DateTime<Utc>, expires_in: i64) -> Self {
        Self {
            value: value.into(),
            expires_at: Some(issued_at + ChronoDuration::seconds(expires_in)),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

/// Response from the identity platform's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Error body returned by the token endpoint on failure.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Parses a successful token endpoint body.
fn parse_token_response(body: &str, issued_at: DateTime<Utc>) -> ProviderResult<AccessToken> {
    let response: TokenResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))?;

    if let Some(kind) = response.token_type.as_deref()
        && !kind.eq_ignore_ascii_case("bearer")
    {
        return Err(ProviderError::invalid_response(format!(
            "unexpected token type: {}",
            kind
        )));
    }

    Ok(match response.expires_in {
        Some(expires_in) => AccessToken::issued(response.access_token, issued_at, expires_in),
        None => AccessToken::static_token(response.access_token),
    })
}

/// Builds the authentication error for a rejected token request.
fn token_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    let detail = serde_json::from_str::<TokenErrorResponse>(body)
        .map(|e| match e.error_description {
            Some(description) => format!("{}: {}", e.error, description),
            None => e.error,
        })
        .unwrap_or_else(|_| body.to_string());
    ProviderError::authentication(format!("token request failed ({}): {}", status, detail))
}

/// Obtains a bearer token for the configured credentials.
pub async fn acquire_token(
    http_client: &reqwest::Client,
    config: &GraphConfig,
) -> ProviderResult<AccessToken> {
    let (tenant_id, client_id, client_secret) = match &config.credentials {
        GraphCredentials::AccessToken(token) => {
            debug!("using pre-issued access token");
            return Ok(AccessToken::static_token(token.clone()));
        }
        GraphCredentials::ClientSecret {
            tenant_id,
            client_id,
            client_secret,
        } => (tenant_id, client_id, client_secret),
    };
    let token_url = config
        .token_url()
        .ok_or_else(|| ProviderError::configuration("no token endpoint for credentials"))?;

    let params = [
        ("client_id", client_id.as_str()),
        ("client_secret", client_secret.as_str()),
        ("scope", GraphConfig::DEFAULT_SCOPE),
        ("grant_type", "client_credentials"),
    ];

    debug!(tenant = %tenant_id, "requesting access token");
    let issued_at = Utc::now();
    let response = http_client
        .post(&token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| ProviderError::network(format!("token request failed: {}", e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

    if !status.is_success() {
        return Err(token_error(status, &body));
    }

    let token = parse_token_response(&body, issued_at)?;
    info!(expires_at = ?token.expires_at(), "obtained access token");
    Ok(token)
}
