//! Environment configuration for the infrastructure adapters.

use anyhow::Context;

pub const PEPPER_ENV: &str = "IDENTITY_PASSWORD_PEPPER";
pub const ARGON2_MEMORY_ENV: &str = "IDENTITY_ARGON2_MEMORY_KIB";
pub const ARGON2_ITERATIONS_ENV: &str = "IDENTITY_ARGON2_ITERATIONS";

/// Password hashing settings.
///
/// Cost parameters left unset use the Argon2 library defaults.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialConfig {
    /// Secret prepended to every password before hashing.
    pub pepper: Option<String>,
    pub memory_kib: Option<u32>,
    pub iterations: Option<u32>,
}

impl CredentialConfig {
    /// Read the process environment.
    ///
    /// A missing pepper is tolerated with a warning; a cost parameter that is
    /// set but not a number is an error.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let pepper = lookup(PEPPER_ENV).filter(|p| !p.is_empty());
        if pepper.is_none() {
            tracing::warn!("{PEPPER_ENV} not set; hashing passwords without a pepper");
        }

        Ok(Self {
            pepper,
            memory_kib: parse_u32(&lookup, ARGON2_MEMORY_ENV)?,
            iterations: parse_u32(&lookup, ARGON2_ITERATIONS_ENV)?,
        })
    }
}

impl core::fmt::Debug for CredentialConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialConfig")
            .field("pepper", &self.pepper.as_ref().map(|_| "<redacted>"))
            .field("memory_kib", &self.memory_kib)
            .field("iterations", &self.iterations)
            .finish()
    }
}

fn parse_u32(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<u32>> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u32>()
                .with_context(|| format!("{key} must be a positive integer, got '{raw}'"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = CredentialConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CredentialConfig::default());
    }

    #[test]
    fn reads_pepper_and_costs() {
        let config = CredentialConfig::from_lookup(lookup(&[
            (PEPPER_ENV, "s3cret"),
            (ARGON2_MEMORY_ENV, "19456"),
            (ARGON2_ITERATIONS_ENV, " 2 "),
        ]))
        .unwrap();
        assert_eq!(config.pepper.as_deref(), Some("s3cret"));
        assert_eq!(config.memory_kib, Some(19456));
        assert_eq!(config.iterations, Some(2));
        assert!(!format!("{config:?}").contains("s3cret"));
    }

    #[test]
    fn rejects_non_numeric_cost() {
        let err = CredentialConfig::from_lookup(lookup(&[(ARGON2_ITERATIONS_ENV, "many")]))
            .unwrap_err();
        assert!(err.to_string().contains(ARGON2_ITERATIONS_ENV));
    }
}
