//! Credential and session authority.
//!
//! Proves a caller's identity on every request and hands it to handlers.
//!
//! ## Components
//! - `token`: CSPRNG-backed session IDs and API keys
//! - `password`: Argon2id password hashing
//! - `key_hash`: SHA-256 API key digests, constant-time comparison
//! - `session`: in-memory TTL session store
//! - `identity`: request-scoped identity carrier
//! - `bearer`: shared `Authorization: Bearer` parsing
//! - `error`: failure taxonomy and its HTTP mapping
//! - `middleware`: session-bearer and API-key-bearer gates

pub mod bearer;
pub mod error;
pub mod identity;
pub mod key_hash;
pub mod middleware;
pub mod password;
pub mod session;
pub mod token;

pub use bearer::{extract_bearer_token, parse_bearer};
pub use error::AuthError;
pub use identity::{CurrentSession, MissingIdentity};
pub use key_hash::{hash_key, verify_key};
pub use middleware::{ApiKeyGate, api_key_auth_middleware, session_auth_middleware};
pub use password::{PasswordError, PasswordHasher};
pub use session::{Session, SessionAccount, SessionError, SessionStore};
pub use token::{ApiKey, DEFAULT_TOKEN_BYTES, SessionId, TokenError, generate_token};
