//! Credential port: password hashing is provided from outside the domain.

use std::sync::Arc;

use thiserror::Error;

use identity_core::{DomainError, ErrorKind};

use crate::error::UserError;
use crate::profile::{PasswordHash, PasswordPolicy};

/// Failure inside a hashing backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

impl CredentialError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Infrastructure
    }
}

/// Hashing/verification capability (plaintext in, hash out; hash + plaintext
/// in, boolean out). The algorithm is an infrastructure choice.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<PasswordHash, CredentialError>;

    fn verify(&self, hash: &PasswordHash, plaintext: &str) -> Result<bool, CredentialError>;
}

/// Handle to the (possibly absent) credential port.
///
/// Operations fail with [`DomainError::InfrastructureRequired`] when no hasher
/// has been wired.
#[derive(Clone, Default)]
pub struct Credentials {
    hasher: Option<Arc<dyn PasswordHasher>>,
}

impl Credentials {
    pub fn new(hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            hasher: Some(hasher),
        }
    }

    /// Credentials without a hasher; every operation fails.
    pub fn unwired() -> Self {
        Self { hasher: None }
    }

    pub fn is_wired(&self) -> bool {
        self.hasher.is_some()
    }

    fn hasher(&self) -> Result<&dyn PasswordHasher, DomainError> {
        self.hasher
            .as_deref()
            .ok_or_else(|| DomainError::infrastructure_required("password hasher"))
    }

    /// Apply the password policy, then hash.
    pub fn hash_password(&self, plaintext: &str) -> Result<PasswordHash, UserError> {
        let hasher = self.hasher()?;
        PasswordPolicy::validate(plaintext)?;
        Ok(hasher.hash(plaintext)?)
    }

    pub fn verify_password(
        &self,
        hash: &PasswordHash,
        plaintext: &str,
    ) -> Result<bool, UserError> {
        Ok(self.hasher()?.verify(hash, plaintext)?)
    }

    pub(crate) fn ensure_wired(&self) -> Result<(), DomainError> {
        self.hasher().map(|_| ())
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("wired", &self.is_wired())
            .finish()
    }
}
