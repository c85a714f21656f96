//! Credential hashing capability.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;

#[derive(Debug, thiserror::Error)]
#[error("credential hashing failed: {0}")]
pub struct CredentialError(pub String);

pub trait CredentialHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, CredentialError>;

    /// False on mismatch or on an unparseable stored hash.
    fn verify(&self, secret: &str, hash: &str) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| CredentialError(e.to_string()))
    }

    fn verify(&self, secret: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    }
}
