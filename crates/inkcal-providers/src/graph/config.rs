//! Microsoft Graph provider configuration.

use std::time::Duration;

/// How the provider obtains its bearer token.
#[derive(Clone)]
pub enum GraphCredentials {
    /// OAuth 2.0 client-credentials flow against the tenant's token endpoint.
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    /// A token issued elsewhere, used as is.
    AccessToken(String),
}

impl std::fmt::Debug for GraphCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClientSecret {
                tenant_id,
                client_id,
                ..
            } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
            Self::AccessToken(_) => f.debug_tuple("AccessToken").field(&"<redacted>").finish(),
        }
    }
}

/// Configuration for the Microsoft Graph provider.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub credentials: GraphCredentials,

    /// User whose calendar is read (object id or UPN).
    pub user_id: String,

    /// Request timeout.
    pub timeout: Duration,

    /// `$top` page size for `calendarView`.
    pub page_size: u32,

    /// Graph API root, without trailing slash.
    pub api_base: String,

    /// Identity platform root, without trailing slash.
    pub login_base: String,

    /// User agent string for API requests.
    pub user_agent: String,
}

impl GraphConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default `$top` value.
    pub const DEFAULT_PAGE_SIZE: u32 = 100;

    pub const DEFAULT_API_BASE: &'static str = "https://graph.microsoft.com/v1.0";

    pub const DEFAULT_LOGIN_BASE: &'static str = "https://login.microsoftonline.com";

    /// Scope requested in the client-credentials flow.
    pub const DEFAULT_SCOPE: &'static str = "https://graph.microsoft.com/.default";

    /// Creates a configuration reading `user_id`'s calendar.
    pub fn new(credentials: GraphCredentials, user_id: impl Into<String>) -> Self {
        Self {
            credentials,
            user_id: user_id.into(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            page_size: Self::DEFAULT_PAGE_SIZE,
            api_base: Self::DEFAULT_API_BASE.to_string(),
            login_base: Self::DEFAULT_LOGIN_BASE.to_string(),
            user_agent: format!("inkcal/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Points the provider at another Graph deployment (national clouds).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Points the token request at another identity platform.
    pub fn with_login_base(mut self, login_base: impl Into<String>) -> Self {
        self.login_base = login_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Token endpoint for the configured tenant, if client credentials are used.
    pub fn token_url(&self) -> Option<String> {
        match &self.credentials {
            GraphCredentials::ClientSecret { tenant_id, .. } => Some(format!(
                "{}/{}/oauth2/v2.0/token",
                self.login_base,
                urlencoding::encode(tenant_id)
            )),
            GraphCredentials::AccessToken(_) => None,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        match &self.credentials {
            GraphCredentials::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            } => {
                if tenant_id.is_empty() {
                    return Err("tenant_id is required");
                }
                if client_id.is_empty() {
                    return Err("client_id is required");
                }
                if client_secret.is_empty() {
                    return Err("client_secret is required");
                }
            }
            GraphCredentials::AccessToken(token) => {
                if token.is_empty() {
                    return Err("access_token must not be empty");
                }
            }
        }
        if self.user_id.is_empty() {
            return Err("user_id is required");
        }
        if self.page_size == 0 || self.page_size > 1000 {
            return Err("page_size must be between 1 and 1000");
        }
        if url::Url::parse(&self.api_base).is_err() {
            return Err("api_base is not a valid URL");
        }
        Ok(())
    }
}
