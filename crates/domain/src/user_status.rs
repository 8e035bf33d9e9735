//! User lifecycle state machine.
//!
//! ```text
//! PENDING_ACTIVATION --activate--> ACTIVE
//! ACTIVE / PENDING_ACTIVATION / LOCKED --disable--> DISABLED
//! ACTIVE --lock--> LOCKED --unlock--> ACTIVE
//! ```
//!
//! Each transition method returns `Ok(None)` when the request is an idempotent
//! no-op, `Ok(Some(next))` when the state changes, and `InvalidTransition`
//! otherwise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use identity_core::{DomainError, DomainResult, ValueObject};

/// Raw lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatusValue {
    PendingActivation,
    Active,
    Disabled,
    Locked,
    /// Representable but not reachable through the user's own methods.
    Expired,
}

impl core::fmt::Display for UserStatusValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            UserStatusValue::PendingActivation => "PENDING_ACTIVATION",
            UserStatusValue::Active => "ACTIVE",
            UserStatusValue::Disabled => "DISABLED",
            UserStatusValue::Locked => "LOCKED",
            UserStatusValue::Expired => "EXPIRED",
        };
        f.write_str(s)
    }
}

/// Lifecycle status of a user, with lock/disable details.
///
/// A lock with an elapsed `locked_until` is still reported as `LOCKED`; only
/// [`is_lock_expired`](Self::is_lock_expired) reflects the elapsed deadline.
/// Callers must `unlock()` explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    value: UserStatusValue,
    locked_until: Option<DateTime<Utc>>,
    reason: Option<String>,
}

impl ValueObject for UserStatus {}

impl UserStatus {
    fn of(value: UserStatusValue) -> Self {
        Self {
            value,
            locked_until: None,
            reason: None,
        }
    }

    pub fn pending_activation() -> Self {
        Self::of(UserStatusValue::PendingActivation)
    }

    pub fn active() -> Self {
        Self::of(UserStatusValue::Active)
    }

    pub fn disabled(reason: Option<String>) -> Self {
        Self {
            reason,
            ..Self::of(UserStatusValue::Disabled)
        }
    }

    pub fn locked(until: Option<DateTime<Utc>>, reason: Option<String>) -> Self {
        Self {
            value: UserStatusValue::Locked,
            locked_until: until,
            reason,
        }
    }

    pub fn expired() -> Self {
        Self::of(UserStatusValue::Expired)
    }

    pub fn value(&self) -> UserStatusValue {
        self.value
    }

    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        self.locked_until
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn is(&self, value: UserStatusValue) -> bool {
        self.value == value
    }

    /// True for a lock whose deadline has passed. An open-ended lock never expires.
    pub fn is_lock_expired(&self) -> bool {
        self.is_lock_expired_at(Utc::now())
    }

    pub fn is_lock_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.value == UserStatusValue::Locked && self.locked_until.is_some_and(|until| until <= now)
    }

    pub fn can_login(&self) -> bool {
        self.value == UserStatusValue::Active
    }

    fn reject(&self, action: &str) -> DomainError {
        DomainError::invalid_transition(format!("cannot {action} a user in status {}", self.value))
    }

    pub fn on_activate(&self) -> DomainResult<Option<UserStatus>> {
        match self.value {
            UserStatusValue::PendingActivation => Ok(Some(Self::active())),
            UserStatusValue::Active => Ok(None),
            UserStatusValue::Disabled | UserStatusValue::Locked | UserStatusValue::Expired => {
                Err(self.reject("activate"))
            }
        }
    }

    pub fn on_disable(&self, reason: Option<String>) -> DomainResult<Option<UserStatus>> {
        match self.value {
            UserStatusValue::Active
            | UserStatusValue::PendingActivation
            | UserStatusValue::Locked => Ok(Some(Self::disabled(reason))),
            UserStatusValue::Disabled => Ok(None),
            UserStatusValue::Expired => Err(self.reject("disable")),
        }
    }

    pub fn on_lock(
        &self,
        until: Option<DateTime<Utc>>,
        reason: Option<String>,
    ) -> DomainResult<Option<UserStatus>> {
        match self.value {
            UserStatusValue::Active => Ok(Some(Self::locked(until, reason))),
            UserStatusValue::Locked => Ok(None),
            UserStatusValue::PendingActivation
            | UserStatusValue::Disabled
            | UserStatusValue::Expired => Err(self.reject("lock")),
        }
    }

    pub fn on_unlock(&self) -> DomainResult<Option<UserStatus>> {
        match self.value {
            UserStatusValue::Locked => Ok(Some(Self::active())),
            UserStatusValue::Active => Ok(None),
            UserStatusValue::PendingActivation
            | UserStatusValue::Disabled
            | UserStatusValue::Expired => Err(self.reject("unlock")),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn activation_rules() {
        assert_eq!(
            UserStatus::pending_activation().on_activate().unwrap(),
            Some(UserStatus::active())
        );
        assert_eq!(UserStatus::active().on_activate().unwrap(), None);

        for status in [UserStatus::disabled(None), UserStatus::expired()] {
            let err = status.on_activate().unwrap_err();
            assert!(matches!(err, DomainError::InvalidTransition(_)));
        }
    }

    #[test]
    fn disable_from_every_live_state() {
        for status in [
            UserStatus::active(),
            UserStatus::pending_activation(),
            UserStatus::locked(None, None),
        ] {
            let next = status.on_disable(Some("policy".into())).unwrap().unwrap();
            assert_eq!(next.value(), UserStatusValue::Disabled);
            assert_eq!(next.reason(), Some("policy"));
        }
        assert_eq!(UserStatus::disabled(None).on_disable(None).unwrap(), None);
        assert!(UserStatus::expired().on_disable(None).is_err());
    }

    #[test]
    fn lock_only_from_active() {
        assert!(UserStatus::active().on_lock(None, None).unwrap().is_some());
        assert_eq!(UserStatus::locked(None, None).on_lock(None, None).unwrap(), None);
        assert!(UserStatus::pending_activation().on_lock(None, None).is_err());
        assert!(UserStatus::disabled(None).on_lock(None, None).is_err());
    }

    #[test]
    fn unlock_rules() {
        assert_eq!(
            UserStatus::locked(None, None).on_unlock().unwrap(),
            Some(UserStatus::active())
        );
        assert_eq!(UserStatus::active().on_unlock().unwrap(), None);
        assert!(UserStatus::disabled(None).on_unlock().is_err());
    }

    #[test]
    fn elapsed_lock_stays_locked() {
        let status = UserStatus::locked(Some(Utc::now() - Duration::days(1)), None);
        assert!(status.is_lock_expired());
        assert_eq!(status.value(), UserStatusValue::Locked);
        assert!(!status.can_login());

        let open_ended = UserStatus::locked(None, None);
        assert!(!open_ended.is_lock_expired());

        let future = UserStatus::locked(Some(Utc::now() + Duration::hours(1)), None);
        assert!(!future.is_lock_expired());
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_value(UserStatus::pending_activation()).unwrap();
        assert_eq!(json["value"], "PENDING_ACTIVATION");
    }
}
