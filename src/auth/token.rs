//! Token cookie codec
//!
//! The provider-issued token is serialized into the `token` cookie as
//! base64url(JSON). Decoding is a typed struct decode: malformed or
//! empty values fail explicitly instead of collapsing into an empty
//! token.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::AppError;
use crate::provider::TokenSet;

/// Cookie holding the serialized token
pub const TOKEN_COOKIE: &str = "token";

/// Encode a token set for cookie storage
///
/// # Errors
/// Returns error if the token cannot be serialized.
pub fn encode_token_cookie(token: &TokenSet) -> Result<String, AppError> {
    let payload =
        serde_json::to_string(token).map_err(|e| AppError::Internal(e.into()))?;
    Ok(URL_SAFE_NO_PAD.encode(payload.as_bytes()))
}

/// Decode a token set from its cookie value
///
/// A token with an empty `access_token` is rejected: its presence must
/// imply an authenticated user.
///
/// # Errors
/// Returns `TokenCookie` on bad encoding, bad JSON, or an empty access
/// token.
pub fn decode_token_cookie(value: &str) -> Result<TokenSet, AppError> {
    let payload = URL_SAFE_NO_PAD
        .decode(value.as_bytes())
        .map_err(|e| AppError::TokenCookie(format!("invalid encoding: {e}")))?;

    let token: TokenSet = serde_json::from_slice(&payload)
        .map_err(|e| AppError::TokenCookie(format!("invalid payload: {e}")))?;

    if token.access_token.is_empty() {
        return Err(AppError::TokenCookie("empty access token".to_string()));
    }

    Ok(token)
}
