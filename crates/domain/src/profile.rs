//! User profile value objects: email, username, nickname and password rules.
//!
//! These are structural checks only. Platform-wide uniqueness is answered by
//! [`UserValidationService`](crate::service::UserValidationService).

use serde::{Deserialize, Serialize};

use identity_core::{DomainError, DomainResult, ValueObject};

pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_EMAIL_LOCAL_LEN: usize = 64;
pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 50;
pub const MIN_NICKNAME_LEN: usize = 1;
pub const MAX_NICKNAME_LEN: usize = 50;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

// ─────────────────────────────────────────────────────────────────────────────
// Email
// ─────────────────────────────────────────────────────────────────────────────

/// Normalized (trimmed, lowercased) email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let email = raw.trim().to_lowercase();

        if email.is_empty() {
            return Err(DomainError::validation("email cannot be empty"));
        }
        if email.len() > MAX_EMAIL_LEN {
            return Err(DomainError::validation(format!(
                "email exceeds {MAX_EMAIL_LEN} characters"
            )));
        }
        if email.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("email cannot contain whitespace"));
        }

        let Some((local, domain)) = email.split_once('@') else {
            return Err(DomainError::validation("invalid email format"));
        };
        if local.is_empty() || local.len() > MAX_EMAIL_LOCAL_LEN || domain.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }
        if !domain.contains('.') || domain.split('.').any(str::is_empty) {
            return Err(DomainError::validation("invalid email domain"));
        }

        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn domain(&self) -> &str {
        self.0.split_once('@').map(|(_, d)| d).unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Username
// ─────────────────────────────────────────────────────────────────────────────

/// Login name: ASCII letters, digits, `_`, `-` and `.`, starting with a letter
/// or digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let username = raw.trim();
        let len = username.chars().count();

        if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
            return Err(DomainError::validation(format!(
                "username must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters"
            )));
        }
        if !username.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(DomainError::validation(
                "username must start with a letter or digit",
            ));
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(DomainError::validation(
                "username may only contain letters, digits, '_', '-' and '.'",
            ));
        }

        Ok(Self(username.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Nickname
// ─────────────────────────────────────────────────────────────────────────────

/// Display name, unique platform-wide. Defaults to the username.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Nickname(String);

impl Nickname {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let nickname = raw.trim();
        let len = nickname.chars().count();

        if !(MIN_NICKNAME_LEN..=MAX_NICKNAME_LEN).contains(&len) {
            return Err(DomainError::validation(format!(
                "nickname must be {MIN_NICKNAME_LEN}-{MAX_NICKNAME_LEN} characters"
            )));
        }
        if nickname.chars().any(char::is_control) {
            return Err(DomainError::validation(
                "nickname cannot contain control characters",
            ));
        }

        Ok(Self(nickname.to_string()))
    }

    /// Resolve an optional nickname, falling back to the username.
    pub fn or_username(raw: Option<&str>, username: &Username) -> DomainResult<Self> {
        match raw {
            Some(raw) => Self::parse(raw),
            None => Ok(Self(username.as_str().to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! impl_string_value {
    ($t:ty) => {
        impl ValueObject for $t {}

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_string_value!(Email);
impl_string_value!(Username);
impl_string_value!(Nickname);

// ─────────────────────────────────────────────────────────────────────────────
// Password
// ─────────────────────────────────────────────────────────────────────────────

/// Password strength rules applied to plaintext before hashing.
///
/// A password needs at least one uppercase letter, one lowercase letter, one
/// digit and one special character.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct PasswordPolicy;

impl PasswordPolicy {
    pub fn validate(plaintext: &str) -> DomainResult<()> {
        let len = plaintext.chars().count();
        if len < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if len > MAX_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at most {MAX_PASSWORD_LEN} characters"
            )));
        }

        let mut missing = Vec::new();
        if !plaintext.chars().any(char::is_uppercase) {
            missing.push("an uppercase letter");
        }
        if !plaintext.chars().any(char::is_lowercase) {
            missing.push("a lowercase letter");
        }
        if !plaintext.chars().any(|c| c.is_ascii_digit()) {
            missing.push("a digit");
        }
        if !plaintext
            .chars()
            .any(|c| !c.is_alphanumeric() && !c.is_whitespace())
        {
            missing.push("a special character");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation(format!(
                "password must contain {}",
                missing.join(", ")
            )))
        }
    }
}

/// Opaque password hash produced by the credential port.
///
/// The value is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(hash: impl Into<String>) -> DomainResult<Self> {
        let hash = hash.into();
        if hash.trim().is_empty() {
            return Err(DomainError::validation("password hash cannot be empty"));
        }
        Ok(Self(hash))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}
