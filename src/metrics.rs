//! Prometheus metrics registry and instruments.
//!
//! Also exposes the `/metrics` endpoint; this crate has no separate
//! API layer to host it.

use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Login flow metrics
    pub static ref LOGINS_STARTED_TOTAL: IntCounter = IntCounter::new(
        "cloudgate_logins_started_total",
        "Total number of login redirects issued"
    ).expect("metric can be created");
    pub static ref CALLBACKS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cloudgate_callbacks_total", "Total number of OAuth callbacks processed"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref TOKEN_EXCHANGES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cloudgate_token_exchanges_total", "Total number of code-for-token exchanges"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref REVOCATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cloudgate_revocations_total", "Total number of token revocation attempts"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref PROFILE_FETCHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cloudgate_profile_fetches_total", "Total number of authenticated profile fetches"),
        &["outcome"]
    ).expect("metric can be created");

    // Error metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("cloudgate_errors_total", "Total number of errors returned to clients"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Register all metrics with the global registry
///
/// Must be called once at startup, before the first request.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(LOGINS_STARTED_TOTAL.clone()))
        .expect("LOGINS_STARTED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CALLBACKS_TOTAL.clone()))
        .expect("CALLBACKS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(TOKEN_EXCHANGES_TOTAL.clone()))
        .expect("TOKEN_EXCHANGES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(REVOCATIONS_TOTAL.clone()))
        .expect("REVOCATIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(PROFILE_FETCHES_TOTAL.clone()))
        .expect("PROFILE_FETCHES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");
}

/// Metrics endpoint handler
///
/// Returns all metrics in Prometheus text format.
async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    match encoder.encode_to_string(&metric_families) {
        Ok(metrics_text) => (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, encoder.format_type())],
            metrics_text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics",
            )
                .into_response()
        }
    }
}

/// Create metrics router
///
/// Exposes the `/metrics` endpoint.
pub fn metrics_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/metrics", get(metrics_handler))
}
