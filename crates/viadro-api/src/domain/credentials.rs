//! Password hashing.
//!
//! bcrypt is adaptive and deliberately slow; its verify routine compares in
//! constant time, so a wrong password leaks no position information.

use std::fmt;

/// Work factor used for new password hashes.
pub const BCRYPT_COST: u32 = 12;

/// Password hashing failures. A wrong password is NOT an error.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to hash password: {0}")]
    Hashing(#[source] bcrypt::BcryptError),

    #[error("failed to verify password: {0}")]
    Verification(#[source] bcrypt::BcryptError),
}

/// One-way password hash in bcrypt modular crypt format.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a plaintext password with [`BCRYPT_COST`].
    pub fn set(plaintext: &str) -> Result<Self, CredentialError> {
        Self::set_with_cost(plaintext, BCRYPT_COST)
    }

    /// Hash a plaintext password with an explicit work factor.
    pub fn set_with_cost(plaintext: &str, cost: u32) -> Result<Self, CredentialError> {
        bcrypt::hash(plaintext, cost)
            .map(Self)
            .map_err(CredentialError::Hashing)
    }

    /// Wrap a hash loaded from storage.
    pub fn from_stored(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// `Ok(false)` when the password simply does not match.
    pub fn matches(&self, plaintext: &str) -> Result<bool, CredentialError> {
        bcrypt::verify(plaintext, &self.0).map_err(CredentialError::Verification)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Work factor encoded in the hash, if it parses.
    pub fn cost(&self) -> Option<u32> {
        self.0.split('$').nth(2).and_then(|c| c.parse().ok())
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}
