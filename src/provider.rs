//! OAuth2 provider client
//!
//! One immutable client per process, built from configuration at startup
//! and shared through `AppState`. Covers the three provider round trips
//! of the login flow (token exchange, revocation, profile fetch) plus
//! authorization URL construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::secrets::CodeVerifier;
use crate::config::OAuthConfig;
use crate::error::AppError;
use crate::metrics::{PROFILE_FETCHES_TOTAL, TOKEN_EXCHANGES_TOTAL};

/// Token material issued by the provider
///
/// Owned exclusively by the end user's browser once serialized into the
/// `token` cookie; the server never stores it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute expiry derived from the provider's `expires_in`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Wire format of a successful token endpoint response (RFC 6749 §5.1)
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenEndpointResponse {
    fn into_token_set(self) -> TokenSet {
        TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self
                .expires_in
                .map(|seconds| Utc::now() + chrono::Duration::seconds(seconds)),
        }
    }
}

/// Wire format of an OAuth2 error response (RFC 6749 §5.2)
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl OAuthErrorBody {
    fn describe(&self) -> String {
        match &self.error_description {
            Some(description) => format!("{}: {}", self.error, description),
            None => self.error.clone(),
        }
    }
}

/// Immutable OAuth2 provider client
pub struct ProviderClient {
    client_id: String,
    client_secret: String,
    authorization_endpoint: Url,
    token_endpoint: String,
    revocation_endpoint: String,
    userinfo_endpoint: String,
    /// Space-joined scope parameter, fixed for the process lifetime
    scope: String,
    http: reqwest::Client,
}

impl ProviderClient {
    /// Build the provider client from configuration
    ///
    /// # Errors
    /// Returns error if the authorization endpoint is not a valid URL or
    /// the HTTP client cannot be constructed.
    pub fn new(config: &OAuthConfig) -> Result<Self, AppError> {
        let authorization_endpoint = Url::parse(&config.authorization_endpoint)
            .map_err(|e| AppError::Config(format!("invalid authorization endpoint: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent("Cloudgate/0.1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            authorization_endpoint,
            token_endpoint: config.token_endpoint.clone(),
            revocation_endpoint: config.revocation_endpoint.clone(),
            userinfo_endpoint: config.userinfo_endpoint.clone(),
            scope: config.scopes.join(" "),
            http,
        })
    }

    /// Build the authorization URL the browser is redirected to
    ///
    /// Carries the anti-CSRF state and the S256 code challenge; the
    /// matching verifier stays behind in the browser's cookie.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str, code_challenge: &str) -> Url {
        let mut url = self.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("scope", &self.scope);
        url
    }

    /// Exchange an authorization code for a token
    ///
    /// Presents client credentials, the redirect URI used at
    /// authorization time, and the PKCE verifier.
    ///
    /// # Errors
    /// Provider rejection of the grant maps to `TokenExchange` (400);
    /// transport failures and provider 5xx map to `Upstream` (502).
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &CodeVerifier,
        redirect_uri: &str,
    ) -> Result<TokenSet, AppError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code_verifier", verifier.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                TOKEN_EXCHANGES_TOTAL.with_label_values(&["failure"]).inc();
                AppError::Upstream(format!("token endpoint unreachable: {e}"))
            })?;

        let status = response.status();
        if status.is_success() {
            let body: TokenEndpointResponse = response.json().await.map_err(|e| {
                TOKEN_EXCHANGES_TOTAL.with_label_values(&["failure"]).inc();
                AppError::Upstream(format!("malformed token response: {e}"))
            })?;
            TOKEN_EXCHANGES_TOTAL.with_label_values(&["success"]).inc();
            Ok(body.into_token_set())
        } else if status.is_client_error() {
            TOKEN_EXCHANGES_TOTAL.with_label_values(&["rejected"]).inc();
            let detail = match response.json::<OAuthErrorBody>().await {
                Ok(body) => body.describe(),
                Err(_) => format!("provider returned {status}"),
            };
            Err(AppError::TokenExchange(detail))
        } else {
            TOKEN_EXCHANGES_TOTAL.with_label_values(&["failure"]).inc();
            Err(AppError::Upstream(format!(
                "token endpoint returned {status}"
            )))
        }
    }

    /// Revoke a token at the provider
    ///
    /// # Errors
    /// Returns `Revocation` on any failure; the caller decides whether
    /// that blocks anything (logout does not).
    pub async fn revoke(&self, token: &TokenSet) -> Result<(), AppError> {
        let params = [
            ("token", token.access_token.as_str()),
            ("token_type_hint", "access_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.revocation_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Revocation(format!("revocation endpoint unreachable: {e}")))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AppError::Revocation(format!(
                "revocation endpoint returned {status}"
            )))
        }
    }

    /// Fetch the user profile with a bearer token
    ///
    /// Returns the upstream JSON body verbatim so the caller can relay
    /// it without re-serialization.
    ///
    /// # Errors
    /// Any transport failure or non-2xx status maps to `UpstreamAuth`;
    /// an upstream failure is never reported as "unauthenticated".
    pub async fn fetch_user(&self, access_token: &str) -> Result<String, AppError> {
        let response = self
            .http
            .get(&self.userinfo_endpoint)
            .bearer_auth(access_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| {
                PROFILE_FETCHES_TOTAL.with_label_values(&["failure"]).inc();
                AppError::UpstreamAuth(format!("user API unreachable: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            PROFILE_FETCHES_TOTAL.with_label_values(&["failure"]).inc();
            return Err(AppError::UpstreamAuth(format!(
                "user API returned {status}"
            )));
        }

        let body = response.text().await.map_err(|e| {
            PROFILE_FETCHES_TOTAL.with_label_values(&["failure"]).inc();
            AppError::UpstreamAuth(format!("user API body unreadable: {e}"))
        })?;
        PROFILE_FETCHES_TOTAL.with_label_values(&["success"]).inc();
        Ok(body)
    }
}
