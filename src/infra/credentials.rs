//! Password hashing for stored user credentials.
//!
//! Passwords never reach the database in plaintext. The stored form is an
//! Argon2id PHC string (`$argon2id$v=19$m=..,t=..,p=..$<salt>$<hash>`), which
//! carries its own salt and cost parameters.

use argon2::password_hash::{self, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use std::fmt;
use thiserror::Error;

/// A credential could not be hashed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Password hashing failed: {0}")]
pub struct CredentialError(String);

impl From<password_hash::Error> for CredentialError {
    fn from(err: password_hash::Error) -> Self {
        Self(err.to_string())
    }
}

/// A stored credential in its encoded, hashed form.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a value read back from storage.
    pub fn from_stored(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Turns plaintext passwords into stored credentials and checks candidates
/// against them.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<PasswordHash, CredentialError>;

    /// False for a wrong password and for any stored value this hasher
    /// cannot parse.
    fn verify(&self, password: &str, stored: &PasswordHash) -> bool;
}

/// Argon2id with a random per-user salt.
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Hash new passwords with `params`. Verification always uses the
    /// parameters recorded in the stored value.
    pub fn with_params(params: Params) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<PasswordHash, CredentialError> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let hash = self.argon2().hash_password(password.as_bytes(), &salt)?;
        Ok(PasswordHash(hash.to_string()))
    }

    fn verify(&self, password: &str, stored: &PasswordHash) -> bool {
        let Ok(parsed) = password_hash::PasswordHash::new(stored.as_str()) else {
            return false;
        };
        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}
