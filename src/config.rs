//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub oauth: OAuthConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "login.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the public base URL for the service
    ///
    /// # Returns
    /// Full URL like "https://login.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }

    /// Get the OAuth redirect URI registered with the provider
    ///
    /// The same value must be presented at authorization time and
    /// again at token exchange.
    pub fn callback_url(&self) -> String {
        format!("{}{}", self.base_url(), crate::auth::CALLBACK_PATH)
    }
}

/// OAuth2 provider configuration
///
/// Endpoint defaults target the Cloudflare dashboard; client credentials
/// have no default and must come from the environment or a config file.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Authorization endpoint the browser is redirected to
    #[serde(default = "default_authorization_endpoint")]
    pub authorization_endpoint: String,
    /// Token endpoint for the code exchange
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
    /// Revocation endpoint called at logout
    #[serde(default = "default_revocation_endpoint")]
    pub revocation_endpoint: String,
    /// Authenticated API endpoint serving the user profile
    #[serde(default = "default_userinfo_endpoint")]
    pub userinfo_endpoint: String,
    /// Scopes requested at authorization time, in order
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_authorization_endpoint() -> String {
    "https://dash.cloudflare.com/oauth2/auth".to_string()
}

fn default_token_endpoint() -> String {
    "https://dash.cloudflare.com/oauth2/token".to_string()
}

fn default_revocation_endpoint() -> String {
    "https://dash.cloudflare.com/oauth2/revoke".to_string()
}

fn default_userinfo_endpoint() -> String {
    "https://api.cloudflare.com/client/v4/user".to_string()
}

/// Full Cloudflare scope set requested by default
///
/// Ordered; joined with spaces into the `scope` query parameter.
fn default_scopes() -> Vec<String> {
    [
        "account:read",
        "user:read",
        "workers:write",
        "workers_kv:write",
        "workers_routes:write",
        "workers_scripts:write",
        "workers_tail:read",
        "d1:write",
        "pages:write",
        "zone:read",
        "ssl_certs:write",
        "constellation:write",
        "ai:write",
        "queues:write",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

/// Login flow configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Max-Age in seconds for the transient `code_verifier`/`state`
    /// cookies. The login round trip must complete within this window.
    pub flow_max_age: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (CLOUDGATE_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.protocol", "http")?
            .set_default("auth.flow_max_age", 600)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (CLOUDGATE_*)
            .add_source(
                Environment::with_prefix("CLOUDGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Validate the loaded configuration
    ///
    /// # Errors
    /// Returns error on empty credentials, unparseable endpoint URLs,
    /// an empty scope list, or a non-positive flow cookie lifetime.
    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        if self.oauth.client_id.trim().is_empty() {
            return Err(AppError::Config("oauth.client_id must not be empty".to_string()));
        }
        if self.oauth.client_secret.trim().is_empty() {
            return Err(AppError::Config(
                "oauth.client_secret must not be empty".to_string(),
            ));
        }
        if !matches!(self.server.protocol.as_str(), "http" | "https") {
            return Err(AppError::Config(format!(
                "server.protocol must be \"http\" or \"https\", got \"{}\"",
                self.server.protocol
            )));
        }
        for (name, endpoint) in [
            ("oauth.authorization_endpoint", &self.oauth.authorization_endpoint),
            ("oauth.token_endpoint", &self.oauth.token_endpoint),
            ("oauth.revocation_endpoint", &self.oauth.revocation_endpoint),
            ("oauth.userinfo_endpoint", &self.oauth.userinfo_endpoint),
        ] {
            url::Url::parse(endpoint)
                .map_err(|e| AppError::Config(format!("{name} is not a valid URL: {e}")))?;
        }
        if self.oauth.scopes.is_empty() {
            return Err(AppError::Config("oauth.scopes must not be empty".to_string()));
        }
        if self.auth.flow_max_age <= 0 {
            return Err(AppError::Config(
                "auth.flow_max_age must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
