//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use cloudgate::{config, AppState};
use serde_json::json;
use tokio::net::TcpListener;

/// Access token the stub provider issues
pub const STUB_ACCESS_TOKEN: &str = "test-access-token";

/// Profile body the stub provider serves for a valid bearer token
pub const STUB_PROFILE_BODY: &str =
    r#"{"result":{"id":"test-user","email":"user@example.com"},"success":true}"#;

/// Mutable knobs and counters of the stub provider
#[derive(Default)]
pub struct ProviderKnobs {
    /// Calls received by the token endpoint
    token_calls: AtomicUsize,
    fail_exchange: AtomicBool,
    fail_revoke: AtomicBool,
    fail_userinfo: AtomicBool,
}

/// In-process stand-in for the OAuth2 provider
///
/// Serves the token, revocation, and user-profile endpoints the
/// gateway's configuration points at.
pub struct StubProvider {
    pub addr: String,
    knobs: Arc<ProviderKnobs>,
}

impl StubProvider {
    /// Spawn the stub on a random port
    pub async fn spawn() -> Self {
        let knobs = Arc::new(ProviderKnobs::default());

        let app = Router::new()
            .route("/oauth2/token", post(token_endpoint))
            .route("/oauth2/revoke", post(revoke_endpoint))
            .route("/client/v4/user", get(userinfo_endpoint))
            .with_state(knobs.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, knobs }
    }

    /// How many times the token endpoint has been called
    pub fn token_calls(&self) -> usize {
        self.knobs.token_calls.load(Ordering::SeqCst)
    }

    /// Make the token endpoint reject every exchange with invalid_grant
    pub fn fail_exchange(&self) {
        self.knobs.fail_exchange.store(true, Ordering::SeqCst);
    }

    /// Make the revocation endpoint answer 503
    pub fn fail_revoke(&self) {
        self.knobs.fail_revoke.store(true, Ordering::SeqCst);
    }

    /// Make the user endpoint answer 500
    pub fn fail_userinfo(&self) {
        self.knobs.fail_userinfo.store(true, Ordering::SeqCst);
    }
}

async fn token_endpoint(
    State(knobs): State<Arc<ProviderKnobs>>,
    body: String,
) -> axum::response::Response {
    knobs.token_calls.fetch_add(1, Ordering::SeqCst);

    if knobs.fail_exchange.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "authorization code is invalid or expired",
            })),
        )
            .into_response();
    }

    // A real provider would verify the code and PKCE pair; the stub only
    // checks the request is shaped like a code exchange.
    if !body.contains("grant_type=authorization_code") || !body.contains("code_verifier=") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_request"})),
        )
            .into_response();
    }

    Json(json!({
        "access_token": STUB_ACCESS_TOKEN,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "test-refresh-token",
    }))
    .into_response()
}

async fn revoke_endpoint(State(knobs): State<Arc<ProviderKnobs>>) -> axum::response::Response {
    if knobs.fail_revoke.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "revocation backend down").into_response();
    }
    StatusCode::OK.into_response()
}

async fn userinfo_endpoint(
    State(knobs): State<Arc<ProviderKnobs>>,
    headers: HeaderMap,
) -> axum::response::Response {
    if knobs.fail_userinfo.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "user API down").into_response();
    }

    let authorized = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .is_some_and(|h| h == format!("Bearer {STUB_ACCESS_TOKEN}"));

    if !authorized {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"success": false, "errors": [{"code": 9109}]})),
        )
            .into_response();
    }

    (
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        STUB_PROFILE_BODY,
    )
        .into_response()
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub provider: StubProvider,
    /// Non-redirecting client; every route under test answers with 3xx
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance backed by a stub provider
    pub async fn new() -> Self {
        let provider = StubProvider::spawn().await;

        // Create test configuration pointing at the stub provider
        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Let OS assign port
                domain: "login.test.example.com".to_string(),
                protocol: "https".to_string(),
            },
            oauth: config::OAuthConfig {
                client_id: "test-client-id".to_string(),
                client_secret: "test-client-secret".to_string(),
                authorization_endpoint: format!("{}/oauth2/auth", provider.addr),
                token_endpoint: format!("{}/oauth2/token", provider.addr),
                revocation_endpoint: format!("{}/oauth2/revoke", provider.addr),
                userinfo_endpoint: format!("{}/client/v4/user", provider.addr),
                scopes: vec!["account:read".to_string(), "user:read".to_string()],
            },
            auth: config::AuthConfig { flow_max_age: 600 },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        // Initialize app state
        let state = AppState::new(config).unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());

        // Build router
        let app = cloudgate::build_router(state);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build no-redirect client");

        Self {
            addr,
            provider,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Build a `token` cookie header value the way the server encodes it
    pub fn token_cookie(access_token: &str) -> String {
        let token = cloudgate::provider::TokenSet {
            access_token: access_token.to_string(),
            refresh_token: None,
            expires_at: None,
        };
        format!(
            "token={}",
            cloudgate::auth::encode_token_cookie(&token).unwrap()
        )
    }
}

/// Collect all Set-Cookie header values of a response
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(ToString::to_string))
        .collect()
}

/// Find the Set-Cookie value for a named cookie, if any
pub fn set_cookie_for<'a>(cookies: &'a [String], name: &str) -> Option<&'a String> {
    let prefix = format!("{name}=");
    cookies.iter().find(|c| c.starts_with(&prefix))
}

/// Extract the value of a named cookie from Set-Cookie headers
pub fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    let header = set_cookie_for(cookies, name)?;
    let rest = &header[name.len() + 1..];
    Some(rest.split(';').next().unwrap_or("").to_string())
}
