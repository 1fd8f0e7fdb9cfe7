//! API key digests.
//!
//! API keys already carry 256 bits of entropy, so a single SHA-256 pass is
//! enough to keep the raw secret off disk. Digests are lowercase hex, 64
//! characters, matching the `apikey.key_hash` column.

use sha2::{Digest, Sha256};

use super::token::ApiKey;

/// Length of a hex-encoded SHA-256 digest.
pub const KEY_HASH_LEN: usize = 64;

/// Deterministic hex digest of an API key.
pub fn hash_key(key: &ApiKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Recompute the digest of `key` and compare it with `digest`.
pub fn verify_key(key: &ApiKey, digest: &str) -> bool {
    let computed = hash_key(key);
    constant_time_eq(computed.as_bytes(), digest.as_bytes())
}

/// Byte comparison whose running time does not depend on where the inputs differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_hex_sha256() {
        let key = ApiKey::from("abc");
        let digest = hash_key(&key);
        assert_eq!(digest.len(), KEY_HASH_LEN);
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_is_deterministic() {
        let key = ApiKey::generate(32).unwrap();
        assert_eq!(hash_key(&key), hash_key(&key));
    }

    #[test]
    fn test_verify_key() {
        let key = ApiKey::generate(32).unwrap();
        let other = ApiKey::generate(32).unwrap();
        let digest = hash_key(&key);
        assert!(verify_key(&key, &digest));
        assert!(!verify_key(&other, &digest));
        assert!(!verify_key(&key, &digest[..63]));
        assert!(!verify_key(&key, ""));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
        assert!(constant_time_eq(b"", b""));
    }
}
