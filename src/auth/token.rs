//! Secure random tokens for session IDs and API keys.
//!
//! Tokens are raw bytes from the operating system CSPRNG, encoded as
//! URL-safe base64 so they travel in headers and URLs without escaping.
//! Uniqueness is left to entropy: 32 bytes gives 256 bits, and nothing
//! checks a store for collisions.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default entropy size for generated identifiers.
pub const DEFAULT_TOKEN_BYTES: usize = 32;

/// The OS random source could not deliver the requested bytes.
///
/// Callers must abort the operation; there is no fallback generator.
#[derive(Debug, Error)]
#[error("secure random source failed: {0}")]
pub struct TokenError(#[from] rand::Error);

/// Fill a buffer of `len` bytes from the OS CSPRNG.
fn random_bytes(len: usize) -> Result<Vec<u8>, TokenError> {
    let mut buf = vec![0u8; len];
    OsRng.try_fill_bytes(&mut buf)?;
    Ok(buf)
}

/// Generate a URL-safe base64 token carrying `byte_len` bytes of entropy.
pub fn generate_token(byte_len: usize) -> Result<String, TokenError> {
    let bytes = random_bytes(byte_len)?;
    Ok(URL_SAFE.encode(bytes))
}

/// Opaque session identifier. Equality is exact byte match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate(byte_len: usize) -> Result<Self, TokenError> {
        generate_token(byte_len).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// No Display impl: session IDs stay out of log lines.

/// Long-lived shared secret presented by machine clients.
///
/// Only its digest is ever stored; see [`super::key_hash`].
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn generate(byte_len: usize) -> Result<Self, TokenError> {
        generate_token(byte_len).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}
