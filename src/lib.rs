//! Cloudgate - a stateless OAuth2 + PKCE login gateway for the Cloudflare API
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     HTTP Layer (Axum)                        │
//! │  - /login, /oauth/cf/callback, /logout, /                   │
//! │  - /health, /metrics                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Provider Client                           │
//! │  - Authorization URL construction                           │
//! │  - Code-for-token exchange, revocation, profile fetch       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no storage layer: every piece of per-login state (the
//! anti-CSRF state token, the PKCE verifier, the issued token) lives in
//! the browser's cookies.
//!
//! # Modules
//!
//! - `auth`: login flow handlers, flow secrets, token cookie codec
//! - `provider`: immutable OAuth2 provider client
//! - `config`: configuration management
//! - `error`: error types
//! - `metrics`: Prometheus instruments and endpoint

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod provider;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request; everything inside is immutable after
/// startup.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// OAuth2 provider client
    pub oauth: Arc<provider::ProviderClient>,
}

impl AppState {
    /// Initialize application state
    ///
    /// Builds the provider client once from configuration; request
    /// handlers never reconstruct it.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid or the HTTP
    /// client cannot be constructed.
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let oauth = provider::ProviderClient::new(&config.oauth)?;

        Ok(Self {
            config: Arc::new(config),
            oauth: Arc::new(oauth),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(metrics::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
