//! Host credential generation, hashing, and one-time key digests.
//!
//! Credentials are stored as argon2id PHC strings (salt embedded).
//! One-time registration keys are never stored; only their SHA-256 digest is.

use argon2::Argon2;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use sha2::{Digest, Sha256};

/// Generate a random 256-bit secret, hex-encoded (64 characters).
///
/// Used both for one-time registration keys and for host credentials.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Hash a credential using argon2id with a random salt.
pub fn hash_credential(credential: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(credential.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a credential against a stored argon2id hash.
pub fn verify_credential(
    credential: &str,
    hash: &str,
) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(credential.as_bytes(), &parsed_hash)
        .is_ok())
}

/// SHA-256 digest of a one-time key, hex-encoded, for at-rest storage.
pub fn key_digest(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}
