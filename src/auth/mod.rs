//! OAuth2 login flow
//!
//! Handles:
//! - Authorization redirect with PKCE and anti-CSRF state
//! - Callback validation and code-for-token exchange
//! - Cookie-carried session read
//! - Logout with best-effort revocation

mod oauth;
pub mod secrets;
pub mod token;

pub use oauth::{auth_router, CALLBACK_PATH};
pub use token::{decode_token_cookie, encode_token_cookie, TOKEN_COOKIE};
