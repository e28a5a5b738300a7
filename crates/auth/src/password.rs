//! One-way secret hashing.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    #[error("failed to hash secret: {0}")]
    Hash(String),
}

/// Hashes secrets and verifies candidates against stored digests.
pub trait SecretHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, HashError>;

    /// `false` for a mismatch or an unparseable digest.
    fn verify(&self, secret: &str, digest: &str) -> bool;
}

/// Argon2id with a random per-digest salt, PHC string output.
#[derive(Debug, Default, Clone)]
pub struct Argon2Hasher;

impl SecretHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut rand::rngs::OsRng);
        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| HashError::Hash(e.to_string()))
    }

    fn verify(&self, secret: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            tracing::warn!("stored digest is not a valid PHC string");
            return false;
        };
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}
