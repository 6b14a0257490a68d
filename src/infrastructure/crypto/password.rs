//! Password hashing utilities

use bcrypt::{hash, verify};

/// bcrypt work factor; plaintext never survives past these two functions.
const BCRYPT_COST: u32 = 10;

/// Hash a password using bcrypt
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, BCRYPT_COST)
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}
