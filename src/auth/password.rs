//! Password hashing.
//!
//! Argon2id with a fixed, explicit work factor. The PHC string produced by
//! [`PasswordHasher::hash`] embeds salt and parameters, so verification of
//! older hashes keeps working after the configured cost is raised.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher as _, Version};
use thiserror::Error;

/// Memory cost in KiB.
pub const DEFAULT_MEMORY_KIB: u32 = 19_456;
/// Number of passes over memory.
pub const DEFAULT_ITERATIONS: u32 = 2;
/// Degree of parallelism.
pub const DEFAULT_PARALLELISM: u32 = 1;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid argon2 parameters: {0}")]
    InvalidParams(argon2::Error),

    #[error("password hashing failed: {0}")]
    HashingFailure(argon2::password_hash::Error),
}

/// Salted, slow, one-way password hashing.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Build a hasher with explicit Argon2id cost parameters.
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(PasswordError::InvalidParams)?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash a plaintext password into a PHC string.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(PasswordError::HashingFailure)?;
        Ok(hash.to_string())
    }

    /// Check a plaintext password against a stored PHC string.
    ///
    /// Digest comparison is constant-time inside `password-hash`. A digest
    /// that does not parse is treated as a mismatch.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Stored password hash is not a valid PHC string: {}", e);
                return false;
            }
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Burn roughly one verification worth of CPU.
    ///
    /// Login calls this when the email is unknown so response timing does
    /// not reveal which accounts exist.
    pub fn dummy_verify(&self, password: &str) {
        let salt = SaltString::from_b64("c2FsdHNhbHRzYWx0c2FsdA").ok();
        if let Some(salt) = salt {
            let _ = self.argon2.hash_password(password.as_bytes(), &salt);
        }
    }
}
