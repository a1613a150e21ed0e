//! bcrypt password hashing.

use super::AuthError;
use tracing::error;

/// Hashes and verifies passwords with bcrypt and a random per-digest salt.
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl CredentialHasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the work factor. Values outside bcrypt's 4..=31 range make
    /// [`Self::hash`] fail.
    #[must_use]
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    #[must_use]
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Produce a salted digest for storage.
    ///
    /// # Errors
    /// Returns [`AuthError::DependencyUnavailable`] if bcrypt fails, which only
    /// happens on an invalid cost or an entropy source failure.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        bcrypt::hash(plaintext, self.cost).map_err(|err| {
            error!("Failed to hash password: {}", err);
            AuthError::DependencyUnavailable
        })
    }

    /// Check a plaintext against a stored digest. Malformed digests never
    /// match.
    #[must_use]
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        bcrypt::verify(plaintext, digest).unwrap_or(false)
    }
}
