//! Password-reset token generation and hashing
//!
//! The raw token is 32 random bytes, hex-encoded. Storage only ever sees the
//! sha-256 of that string, so a leaked table cannot redeem tokens.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a fresh token; returns `(raw, hash)`.
pub fn generate() -> (String, String) {
    let mut secret = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    let raw = hex::encode(secret);
    let hash = hash_token(&raw);
    (raw, hash)
}

/// Hex sha-256 of the raw token string, the only form ever persisted.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
