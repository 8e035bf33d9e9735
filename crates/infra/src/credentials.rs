//! Argon2id implementation of the credential port.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHasher as _, PasswordVerifier, Version};

use identity_domain::{CredentialError, PasswordHash, PasswordHasher};

use crate::config::CredentialConfig;

/// Hashes passwords as Argon2id PHC strings, optionally peppered.
///
/// The pepper is prepended to the plaintext and must be the same for hashing
/// and verification.
#[derive(Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
    pepper: Option<String>,
}

impl Argon2PasswordHasher {
    /// Library-default cost, no pepper.
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
            pepper: None,
        }
    }

    pub fn from_config(config: &CredentialConfig) -> Result<Self, CredentialError> {
        let params = Params::new(
            config.memory_kib.unwrap_or(Params::DEFAULT_M_COST),
            config.iterations.unwrap_or(Params::DEFAULT_T_COST),
            Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|e| CredentialError::Hashing(format!("invalid argon2 parameters: {e}")))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            pepper: config.pepper.clone(),
        })
    }

    fn peppered(&self, plaintext: &str) -> String {
        match &self.pepper {
            Some(pepper) => format!("{pepper}{plaintext}"),
            None => plaintext.to_string(),
        }
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Argon2PasswordHasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Argon2PasswordHasher")
            .field("peppered", &self.pepper.is_some())
            .finish_non_exhaustive()
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, plaintext: &str) -> Result<PasswordHash, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let phc = self
            .argon2
            .hash_password(self.peppered(plaintext).as_bytes(), &salt)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?;
        PasswordHash::new(phc.to_string()).map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    fn verify(&self, hash: &PasswordHash, plaintext: &str) -> Result<bool, CredentialError> {
        let parsed = argon2::PasswordHash::new(hash.as_str())
            .map_err(|e| CredentialError::MalformedHash(e.to_string()))?;

        match self
            .argon2
            .verify_password(self.peppered(plaintext).as_bytes(), &parsed)
        {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(CredentialError::Hashing(e.to_string())),
        }
    }
}
