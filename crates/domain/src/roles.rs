use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use identity_core::{DomainError, DomainResult, ValueObject};

/// Longest accepted role name.
pub const MAX_ROLE_LEN: usize = 64;

/// Role identifier bound to an assignment.
///
/// Roles are opaque strings at this layer; mapping roles to permissions is the
/// caller's policy concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Build a role from a trusted name (constants, fixtures).
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Build a role from untrusted input.
    pub fn parse(name: &str) -> DomainResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("role name cannot be empty"));
        }
        if name.chars().count() > MAX_ROLE_LEN {
            return Err(DomainError::validation(format!(
                "role name exceeds {MAX_ROLE_LEN} characters"
            )));
        }
        Ok(Self(Cow::Owned(name.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Role {}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_rejects_blank() {
        assert_eq!(Role::parse("  admin ").unwrap(), Role::new("admin"));
        assert!(Role::parse("   ").is_err());
        assert!(Role::parse(&"r".repeat(MAX_ROLE_LEN + 1)).is_err());
    }
}
