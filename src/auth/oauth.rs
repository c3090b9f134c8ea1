//! OAuth2 login flow handlers
//!
//! Implements the OAuth 2.0 authorization code flow with PKCE against
//! the configured provider. The server keeps no per-login state: the
//! anti-CSRF state token and the PKCE verifier travel in short-lived
//! cookies, and the issued token lives in a cookie owned by the
//! browser.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use super::secrets::{generate_state, CodeVerifier, STATE_LENGTH};
use super::token::{decode_token_cookie, encode_token_cookie, TOKEN_COOKIE};
use crate::error::AppError;
use crate::metrics::{CALLBACKS_TOTAL, LOGINS_STARTED_TOTAL, REVOCATIONS_TOTAL};
use crate::AppState;

/// Cookie holding the PKCE verifier between redirect and callback
const CODE_VERIFIER_COOKIE: &str = "code_verifier";
/// Cookie holding the anti-CSRF state token
const STATE_COOKIE: &str = "state";

/// Redirect URI path registered with the provider
pub const CALLBACK_PATH: &str = "/oauth/cf/callback";

/// Create the login flow router
///
/// Routes:
/// - GET / - Profile of the authenticated user
/// - GET /login - Redirect to the provider
/// - GET /oauth/cf/callback - OAuth callback
/// - GET /logout - Revoke and clear the token
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/login", get(login))
        .route(CALLBACK_PATH, get(callback))
        .route("/logout", get(logout))
}

// =============================================================================
// Cookies
// =============================================================================

/// Build a transient flow cookie
///
/// All cookies share Path=/; Secure; HttpOnly; SameSite=Lax. The
/// transient pair additionally carries a Max-Age bounding how long a
/// pending login stays resumable.
fn flow_cookie(name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

/// Build the long-lived token cookie (session cookie, no Max-Age)
fn token_cookie(value: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, value))
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Build a Max-Age=0 removal for one of our cookies
fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

/// Plain 302 redirect (axum's `Redirect::to` answers 303)
fn found(location: &str) -> impl IntoResponse {
    (
        StatusCode::FOUND,
        [(header::LOCATION, location.to_string())],
    )
}

// =============================================================================
// Authorization redirect
// =============================================================================

/// GET /login
///
/// Starts a login attempt.
///
/// # Steps
/// 1. Generate a PKCE verifier and its S256 challenge
/// 2. Generate an anti-CSRF state token
/// 3. Build the provider authorization URL
/// 4. Park both secrets in short-lived cookies
/// 5. Redirect the browser to the provider
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let verifier = CodeVerifier::generate()?;
    let challenge = verifier.challenge();
    let csrf_state = generate_state(STATE_LENGTH)?;

    let redirect_uri = state.config.server.callback_url();
    let authorize_url = state.oauth.authorize_url(&redirect_uri, &csrf_state, &challenge);

    let max_age = state.config.auth.flow_max_age;
    let jar = jar
        .add(flow_cookie(CODE_VERIFIER_COOKIE, verifier.into_value(), max_age))
        .add(flow_cookie(STATE_COOKIE, csrf_state, max_age));

    LOGINS_STARTED_TOTAL.inc();
    tracing::debug!("redirecting browser to authorization endpoint");

    Ok((jar, found(authorize_url.as_str())).into_response())
}

// =============================================================================
// Callback
// =============================================================================

/// Query parameters on the provider's redirect back to us
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    /// Authorization code
    code: Option<String>,
    /// Anti-CSRF state token, echoed by the provider
    state: Option<String>,
    /// Error code if the provider declined
    error: Option<String>,
    /// Human-readable error detail
    error_description: Option<String>,
}

/// GET /oauth/cf/callback
///
/// Completes a login attempt.
///
/// # Steps
/// 1. Recover the flow secrets from cookies; reject the callback
///    outright if they are missing
/// 2. Validate the echoed state and extract the authorization code;
///    nothing reaches the token endpoint before this passes
/// 3. Exchange the code, presenting the PKCE verifier
/// 4. Persist the token cookie, clear the transient cookies
/// 5. Redirect to /
///
/// The transient cookies are single-use: every outcome past step 1
/// clears them in the same response, success or failure.
async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Response {
    // 1. Recover the browser-held flow secrets.
    let verifier = jar.get(CODE_VERIFIER_COOKIE).map(|c| c.value().to_owned());
    let expected_state = jar.get(STATE_COOKIE).map(|c| c.value().to_owned());
    let (Some(verifier), Some(expected_state)) = (verifier, expected_state) else {
        CALLBACKS_TOTAL.with_label_values(&["rejected"]).inc();
        return AppError::MissingFlowState.into_response();
    };

    let jar = jar
        .add(expired_cookie(CODE_VERIFIER_COOKIE))
        .add(expired_cookie(STATE_COOKIE));

    // 2. Validate the redirect before touching the token endpoint.
    if let Some(error) = &query.error {
        CALLBACKS_TOTAL.with_label_values(&["rejected"]).inc();
        let detail = match &query.error_description {
            Some(description) => format!("provider declined: {error}: {description}"),
            None => format!("provider declined: {error}"),
        };
        return (jar, AppError::InvalidCallback(detail)).into_response();
    }

    if query.state.as_deref() != Some(expected_state.as_str()) {
        CALLBACKS_TOTAL.with_label_values(&["rejected"]).inc();
        return (jar, AppError::InvalidCallback("state mismatch".to_string())).into_response();
    }

    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        CALLBACKS_TOTAL.with_label_values(&["rejected"]).inc();
        return (jar, AppError::InvalidCallback("No code found".to_string())).into_response();
    };

    // 3. Exchange the code for a token, proving possession of the verifier.
    let verifier = CodeVerifier::from_value(verifier);
    let redirect_uri = state.config.server.callback_url();
    let token = match state.oauth.exchange_code(&code, &verifier, &redirect_uri).await {
        Ok(token) => token,
        Err(error) => {
            CALLBACKS_TOTAL.with_label_values(&["failed"]).inc();
            return (jar, error).into_response();
        }
    };

    // 4. Hand the token to the browser; the server keeps nothing.
    let value = match encode_token_cookie(&token) {
        Ok(value) => value,
        Err(error) => {
            CALLBACKS_TOTAL.with_label_values(&["failed"]).inc();
            return (jar, error).into_response();
        }
    };
    let jar = jar.add(token_cookie(value));

    CALLBACKS_TOTAL.with_label_values(&["success"]).inc();
    tracing::info!("login completed");

    (jar, found("/")).into_response()
}

// =============================================================================
// Session read
// =============================================================================

/// GET /
///
/// Serves the authenticated user's profile, fetched live from the
/// provider's API. Anonymous browsers are redirected to /login; an
/// upstream failure surfaces as 502 rather than a false logout.
async fn home(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let token = match jar.get(TOKEN_COOKIE) {
        Some(cookie) => match decode_token_cookie(cookie.value()) {
            Ok(token) => token,
            Err(error) => {
                tracing::debug!(%error, "unreadable token cookie, treating as anonymous");
                return Ok(found("/login").into_response());
            }
        },
        None => return Ok(found("/login").into_response()),
    };

    let profile = state.oauth.fetch_user(&token.access_token).await?;

    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        profile,
    )
        .into_response())
}

// =============================================================================
// Logout
// =============================================================================

/// GET /logout
///
/// Revokes the token at the provider (best effort) and clears the
/// token cookie. The local session is cleared even when revocation
/// fails, so logout is idempotent from the browser's point of view.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(TOKEN_COOKIE) {
        match decode_token_cookie(cookie.value()) {
            Ok(token) => match state.oauth.revoke(&token).await {
                Ok(()) => {
                    REVOCATIONS_TOTAL.with_label_values(&["success"]).inc();
                    tracing::info!("token revoked");
                }
                Err(error) => {
                    REVOCATIONS_TOTAL.with_label_values(&["failure"]).inc();
                    tracing::warn!(%error, "revocation failed, clearing session anyway");
                }
            },
            Err(error) => {
                tracing::debug!(%error, "unreadable token cookie at logout");
            }
        }
    }

    let jar = jar.add(expired_cookie(TOKEN_COOKIE));
    (jar, found("/")).into_response()
}
