//! Error types for Cloudgate
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// This enum represents all possible errors that can occur
/// in the application. It implements `IntoResponse` to
/// automatically convert errors to appropriate HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Secure randomness source could not be read (500)
    ///
    /// Never falls back to a weaker source; a login attempt whose
    /// secrets lack real entropy must not proceed.
    #[error("Secure random source unavailable: {0}")]
    EntropyUnavailable(String),

    /// Callback arrived without the browser-held flow cookies (400)
    #[error("No code_verifier or state found")]
    MissingFlowState,

    /// Callback failed validation: state mismatch, provider error,
    /// or missing authorization code (400)
    #[error("{0}")]
    InvalidCallback(String),

    /// Provider rejected the authorization code at the token endpoint (400)
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    /// Token endpoint unreachable or answered with a server error (502)
    #[error("Upstream provider error: {0}")]
    Upstream(String),

    /// Authenticated profile fetch failed (502)
    #[error("Profile fetch failed: {0}")]
    UpstreamAuth(String),

    /// Token revocation failed
    ///
    /// Logged and counted at the call site; logout proceeds regardless,
    /// so this variant never reaches `IntoResponse` in practice.
    #[error("Token revocation failed: {0}")]
    Revocation(String),

    /// Token cookie could not be decoded (400)
    #[error("Malformed token cookie: {0}")]
    TokenCookie(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client error (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = match &self {
            AppError::EntropyUnavailable(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "entropy")
            }
            AppError::MissingFlowState => (
                StatusCode::BAD_REQUEST,
                self.to_string(),
                "missing_flow_state",
            ),
            AppError::InvalidCallback(msg) => {
                // State mismatches land here; treat as a possible forged callback.
                tracing::warn!(reason = %msg, "rejected OAuth callback");
                (StatusCode::BAD_REQUEST, msg.clone(), "invalid_callback")
            }
            AppError::TokenExchange(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "token_exchange"),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone(), "upstream"),
            AppError::UpstreamAuth(msg) => (StatusCode::BAD_GATEWAY, msg.clone(), "upstream_auth"),
            AppError::Revocation(msg) => (StatusCode::BAD_GATEWAY, msg.clone(), "revocation"),
            AppError::TokenCookie(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "token_cookie"),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "config"),
            AppError::HttpClient(_) => (StatusCode::BAD_GATEWAY, self.to_string(), "http_client"),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            ),
        };

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
