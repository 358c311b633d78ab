//! Microsoft Graph calendar provider.
//!
//! This module provides a [`GraphProvider`] that reads one user's
//! `calendarView` through the Microsoft Graph REST API.
//!
//! # Features
//!
//! - OAuth 2.0 client-credentials flow, or a pre-issued bearer token
//! - Token caching with renewal shortly before expiry
//! - Paging over `@odata.nextLink`, restricted to the Graph host
//! - Times requested in UTC (`Prefer: outlook.timezone="UTC"`)
//!
//! # Example
//!
//! ```ignore
//! use inkcal_providers::graph::{GraphConfig, GraphCredentials, GraphProvider};
//!
//! let credentials = GraphCredentials::ClientSecret {
//!     tenant_id: "contoso.onmicrosoft.com".into(),
//!     client_id: "11111111-2222-3333-4444-555555555555".into(),
//!     client_secret: secret,
//! };
//! let provider = GraphProvider::new(GraphConfig::new(credentials, "user@contoso.com"))?;
//! let events = provider.fetch_events(window).await?;
//! ```

mod auth;
mod client;
mod config;
mod provider;

pub use auth::AccessToken;
pub use client::GraphClient;
pub use config::{GraphConfig, GraphCredentials};
pub use provider::GraphProvider;
