//! Random secrets for the login flow
//!
//! Generates the anti-CSRF state token and the PKCE code verifier with
//! its S256 challenge (RFC 7636). All randomness is drawn from the
//! operating system's CSPRNG; there is no fallback source.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Character set for state tokens and code verifiers.
///
/// The RFC 3986 unreserved characters, which RFC 7636 §4.1 also
/// prescribes for code verifiers.
const UNRESERVED: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Recommended length for the anti-CSRF state token.
pub const STATE_LENGTH: usize = 32;

/// Length of generated code verifiers (RFC 7636 allows 43-128).
const CODE_VERIFIER_LENGTH: usize = 43;

/// Generate a random state token for anti-CSRF.
///
/// Draws one random 32-bit value per output character and maps it onto
/// the unreserved alphabet via modulo. The slight modulo bias is
/// accepted; 32 characters still leave brute-force guessing infeasible.
///
/// # Errors
/// Returns `EntropyUnavailable` if the OS randomness source cannot be read.
pub fn generate_state(length: usize) -> Result<String, AppError> {
    let mut buf = vec![0u8; length * 4];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| AppError::EntropyUnavailable(e.to_string()))?;

    let token = buf
        .chunks_exact(4)
        .map(|chunk| {
            let value = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            UNRESERVED[value as usize % UNRESERVED.len()] as char
        })
        .collect();

    Ok(token)
}

/// PKCE code verifier (RFC 7636)
///
/// Held in the browser's `code_verifier` cookie between the login
/// redirect and the callback, then presented at token exchange to prove
/// both requests came from the same party.
#[derive(Debug, Clone)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    /// Generate a new random verifier.
    ///
    /// # Errors
    /// Returns `EntropyUnavailable` if the OS randomness source cannot be read.
    pub fn generate() -> Result<Self, AppError> {
        generate_state(CODE_VERIFIER_LENGTH).map(Self)
    }

    /// Reconstruct a verifier from the cookie value.
    pub fn from_value(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the verifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the verifier, returning the raw string for cookie storage.
    pub fn into_value(self) -> String {
        self.0
    }

    /// Compute the S256 code challenge.
    ///
    /// `base64url(sha256(verifier))` without padding, per RFC 7636 §4.2.
    pub fn challenge(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }
}
