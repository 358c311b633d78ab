//! Error types for fetching raw events.
//!
//! A fetch fails as a whole: there is no partial event list and nothing is
//! retried. [`ProviderErrorCode`] says which stage of the exchange broke.

use std::fmt;
use thiserror::Error;

/// What went wrong while fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The token endpoint rejected the credentials, or the bearer token was refused.
    AuthenticationFailed,
    /// The application lacks the `Calendars.Read` permission for the user.
    AuthorizationFailed,
    /// Connection failed, timed out, or the body could not be read.
    NetworkError,
    /// HTTP 429.
    RateLimited,
    /// A 5xx or another unexpected status.
    ServerError,
    /// The body did not match the expected JSON shape.
    InvalidResponse,
    /// The user, or the events file, does not exist.
    NotFound,
    /// The query parameters were rejected (HTTP 400).
    BadRequest,
    ConfigurationError,
    /// Reading a local events file failed.
    IoError,
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AuthenticationFailed => "authentication failed",
            Self::AuthorizationFailed => "not authorized",
            Self::NetworkError => "network error",
            Self::RateLimited => "rate limited",
            Self::ServerError => "service error",
            Self::InvalidResponse => "unexpected response",
            Self::NotFound => "not found",
            Self::BadRequest => "bad request",
            Self::ConfigurationError => "invalid configuration",
            Self::IoError => "I/O error",
        })
    }
}

/// A failed fetch.
///
/// Displays as `[provider] <code>: <message>`, the provider tag only once
/// the provider has been attached with [`ProviderError::with_provider`].
#[derive(Debug, Error)]
#[error("{}{code}: {message}", tag(.provider))]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    provider: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

fn tag(provider: &Option<String>) -> String {
    provider
        .as_deref()
        .map(|p| format!("[{}] ", p))
        .unwrap_or_default()
}

/// One constructor per code.
macro_rules! constructors {
    ($($name:ident => $code:ident),* $(,)?) => {
        $(
            pub fn $name(message: impl Into<String>) -> Self {
                Self::new(ProviderErrorCode::$code, message)
            }
        )*
    };
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    constructors! {
        authentication => AuthenticationFailed,
        authorization => AuthorizationFailed,
        network => NetworkError,
        rate_limited => RateLimited,
        server => ServerError,
        invalid_response => InvalidResponse,
        not_found => NotFound,
        bad_request => BadRequest,
        configuration => ConfigurationError,
    }

    /// Wraps a failed read of `path`. A missing file is [`ProviderErrorCode::NotFound`].
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let code = match source.kind() {
            std::io::ErrorKind::NotFound => ProviderErrorCode::NotFound,
            _ => ProviderErrorCode::IoError,
        };
        Self::new(code, path).with_source(source)
    }

    /// Keeps `source` as the underlying cause.
    pub fn with_source(self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
            ..self
        }
    }

    /// Tags the error with the provider that raised it.
    pub fn with_provider(self, provider: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            ..self
        }
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_error() {
        let err = ProviderError::authentication("invalid client secret");
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.message(), "invalid client secret");
        assert!(err.provider().is_none());
        assert_eq!(err.to_string(), "authentication failed: invalid client secret");
    }

    #[test]
    fn display_includes_provider_and_code() {
        let err = ProviderError::rate_limited("retry after 30 seconds").with_provider("graph");
        assert_eq!(err.to_string(), "[graph] rate limited: retry after 30 seconds");
    }

    #[test]
    fn io_error_maps_not_found() {
        use std::error::Error;

        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        let err = ProviderError::io("events.json", missing);
        assert_eq!(err.code(), ProviderErrorCode::NotFound);
        assert!(err.source().is_some());

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert_eq!(
            ProviderError::io("events.json", denied).code(),
            ProviderErrorCode::IoError
        );
    }
}
