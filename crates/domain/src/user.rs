//! User aggregate for identity management.
//!
//! A user carries its credentials and a lifecycle status. All mutation goes
//! through intention-revealing methods that stamp the audit trail and append a
//! [`UserEvent`]; idempotent no-ops leave both untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use identity_core::{
    Actor, AggregateRoot, AuditInfo, Auditable, DomainError, DomainEvents, DomainResult, Entity,
    Identifier, TenantId, UserId,
};
use identity_events::Event;

use crate::credentials::Credentials;
use crate::error::UserError;
use crate::profile::{Email, Nickname, PasswordHash, Username};
use crate::user_status::{UserStatus, UserStatusValue};

// ─────────────────────────────────────────────────────────────────────────────
// Source
// ─────────────────────────────────────────────────────────────────────────────

/// Where a user account comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserSource {
    /// Self-registered on the platform.
    Platform,
    /// Provisioned by a tenant.
    Tenant,
    /// Internal, passwordless account used by automation.
    System,
}

impl core::fmt::Display for UserSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UserSource::Platform => write!(f, "platform"),
            UserSource::Tenant => write!(f, "tenant"),
            UserSource::System => write!(f, "system"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration input
// ─────────────────────────────────────────────────────────────────────────────

/// Raw registration input for a password-bearing user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Defaults to the username when absent.
    pub nickname: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// User Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// User aggregate.
///
/// # Invariants
/// - Email, username and nickname are structurally valid.
/// - Platform and tenant users hold a password hash; system users never do.
/// - A tenant user's id carries its tenant.
///
/// Serializes as a snapshot of its state; pending events are not part of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    username: Username,
    email: Email,
    password_hash: Option<PasswordHash>,
    nickname: Nickname,
    status: UserStatus,
    source: UserSource,
    audit: AuditInfo,
    #[serde(skip)]
    events: DomainEvents<UserEvent>,
}

identity_core::entity_identity!(User);

impl User {
    /// Register a self-service platform user. Starts in `PENDING_ACTIVATION`.
    pub fn register_platform_user(
        input: NewUser,
        credentials: &Credentials,
        actor: Actor,
    ) -> Result<Self, UserError> {
        Self::register(UserId::new(), UserSource::Platform, input, credentials, actor)
    }

    /// Register a user provisioned by `tenant_id`. Starts in `PENDING_ACTIVATION`.
    pub fn register_tenant_user(
        tenant_id: TenantId,
        input: NewUser,
        credentials: &Credentials,
        actor: Actor,
    ) -> Result<Self, UserError> {
        Self::register(
            UserId::new_in_tenant(tenant_id),
            UserSource::Tenant,
            input,
            credentials,
            actor,
        )
    }

    fn register(
        id: UserId,
        source: UserSource,
        input: NewUser,
        credentials: &Credentials,
        actor: Actor,
    ) -> Result<Self, UserError> {
        let username = Username::parse(&input.username)?;
        let email = Email::parse(&input.email)?;
        let nickname = Nickname::or_username(input.nickname.as_deref(), &username)?;
        let password_hash = credentials.hash_password(&input.password)?;

        Ok(Self::create(
            id,
            username,
            email,
            Some(password_hash),
            nickname,
            UserStatus::pending_activation(),
            source,
            actor,
        ))
    }

    /// Create a passwordless system user. Starts `ACTIVE`.
    pub fn create_system_user(
        username: &str,
        email: &str,
        nickname: Option<&str>,
    ) -> DomainResult<Self> {
        let username = Username::parse(username)?;
        let email = Email::parse(email)?;
        let nickname = Nickname::or_username(nickname, &username)?;

        Ok(Self::create(
            UserId::new(),
            username,
            email,
            None,
            nickname,
            UserStatus::active(),
            UserSource::System,
            Actor::System,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn create(
        id: UserId,
        username: Username,
        email: Email,
        password_hash: Option<PasswordHash>,
        nickname: Nickname,
        status: UserStatus,
        source: UserSource,
        actor: Actor,
    ) -> Self {
        let mut user = Self {
            id,
            username,
            email,
            password_hash,
            nickname,
            status,
            source,
            audit: AuditInfo::new(actor),
            events: DomainEvents::new(),
        };

        let event = UserEvent::Registered(UserRegistered {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            nickname: user.nickname.clone(),
            source: user.source,
            status: user.status.value(),
            occurred_at: user.audit.created_at(),
        });
        user.add_domain_event(event);
        user
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn nickname(&self) -> &Nickname {
        &self.nickname
    }

    pub fn password_hash(&self) -> Option<&PasswordHash> {
        self.password_hash.as_ref()
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn status(&self) -> &UserStatus {
        &self.status
    }

    pub fn source(&self) -> UserSource {
        self.source
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.id.tenant_id()
    }

    pub fn is_system_user(&self) -> bool {
        self.source == UserSource::System
    }

    /// Active and not soft-deleted.
    pub fn is_available(&self) -> bool {
        self.status.is(UserStatusValue::Active) && !self.is_deleted()
    }

    fn transition(&mut self, next: Option<UserStatus>, actor: Actor) -> bool {
        match next {
            Some(next) => {
                self.status = next;
                self.mark_as_updated(actor);
                true
            }
            None => false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    pub fn activate(&mut self, actor: Actor) -> DomainResult<()> {
        let next = self.status.on_activate()?;
        if self.transition(next, actor) {
            self.add_domain_event(UserEvent::Activated(UserActivated {
                user_id: self.id,
                occurred_at: self.audit.updated_at(),
            }));
        }
        Ok(())
    }

    pub fn disable(&mut self, reason: Option<String>, actor: Actor) -> DomainResult<()> {
        let next = self.status.on_disable(reason.clone())?;
        if self.transition(next, actor) {
            self.add_domain_event(UserEvent::Disabled(UserDisabled {
                user_id: self.id,
                reason,
                occurred_at: self.audit.updated_at(),
            }));
        }
        Ok(())
    }

    /// Lock the account, optionally until a deadline. The lock does not lift
    /// itself when the deadline passes.
    pub fn lock(
        &mut self,
        until: Option<DateTime<Utc>>,
        reason: Option<String>,
        actor: Actor,
    ) -> DomainResult<()> {
        let next = self.status.on_lock(until, reason.clone())?;
        if self.transition(next, actor) {
            self.add_domain_event(UserEvent::Locked(UserLocked {
                user_id: self.id,
                locked_until: until,
                reason,
                occurred_at: self.audit.updated_at(),
            }));
        }
        Ok(())
    }

    pub fn unlock(&mut self, actor: Actor) -> DomainResult<()> {
        let next = self.status.on_unlock()?;
        if self.transition(next, actor) {
            self.add_domain_event(UserEvent::Unlocked(UserUnlocked {
                user_id: self.id,
                occurred_at: self.audit.updated_at(),
            }));
        }
        Ok(())
    }

    /// Soft-delete the user. Returns `false` when it was already deleted.
    pub fn delete(&mut self, actor: Actor) -> bool {
        if !self.soft_delete(actor) {
            return false;
        }
        self.add_domain_event(UserEvent::Deleted(UserDeleted {
            user_id: self.id,
            deleted_by: actor.user(),
            occurred_at: self.audit.updated_at(),
        }));
        true
    }

    /// Undo a soft delete. Returns `false` when the user was not deleted.
    pub fn recover(&mut self, actor: Actor) -> bool {
        if !self.restore(actor) {
            return false;
        }
        self.add_domain_event(UserEvent::Recovered(UserRecovered {
            user_id: self.id,
            occurred_at: self.audit.updated_at(),
        }));
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Credentials
    // ─────────────────────────────────────────────────────────────────────────

    fn ensure_password_bearing(&self) -> DomainResult<()> {
        if self.is_system_user() {
            return Err(DomainError::invariant("system users are passwordless"));
        }
        Ok(())
    }

    /// Replace the password after checking the current one.
    pub fn change_password(
        &mut self,
        current: &str,
        new: &str,
        credentials: &Credentials,
        actor: Actor,
    ) -> Result<(), UserError> {
        self.ensure_password_bearing()?;
        if !self.verify_password(current, credentials)? {
            return Err(DomainError::validation("current password is incorrect").into());
        }

        self.password_hash = Some(credentials.hash_password(new)?);
        self.mark_as_updated(actor);
        self.add_domain_event(UserEvent::PasswordChanged(UserPasswordChanged {
            user_id: self.id,
            occurred_at: self.audit.updated_at(),
        }));
        Ok(())
    }

    /// Set a new password without knowing the current one (administrative reset).
    pub fn reset_password(
        &mut self,
        new: &str,
        credentials: &Credentials,
        actor: Actor,
    ) -> Result<(), UserError> {
        self.ensure_password_bearing()?;

        self.password_hash = Some(credentials.hash_password(new)?);
        self.mark_as_updated(actor);
        self.add_domain_event(UserEvent::PasswordReset(UserPasswordReset {
            user_id: self.id,
            reset_by: actor.user(),
            occurred_at: self.audit.updated_at(),
        }));
        Ok(())
    }

    /// A user without a password never verifies.
    pub fn verify_password(
        &self,
        plaintext: &str,
        credentials: &Credentials,
    ) -> Result<bool, UserError> {
        credentials.ensure_wired()?;
        match &self.password_hash {
            Some(hash) => credentials.verify_password(hash, plaintext),
            None => Ok(false),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Profile
    // ─────────────────────────────────────────────────────────────────────────

    pub fn change_email(&mut self, email: &str, actor: Actor) -> DomainResult<()> {
        let email = Email::parse(email)?;
        if email == self.email {
            return Ok(());
        }

        let previous = core::mem::replace(&mut self.email, email);
        self.mark_as_updated(actor);
        self.add_domain_event(UserEvent::EmailChanged(UserEmailChanged {
            user_id: self.id,
            previous,
            email: self.email.clone(),
            occurred_at: self.audit.updated_at(),
        }));
        Ok(())
    }

    pub fn change_username(&mut self, username: &str, actor: Actor) -> DomainResult<()> {
        let username = Username::parse(username)?;
        if username == self.username {
            return Ok(());
        }

        let previous = core::mem::replace(&mut self.username, username);
        self.mark_as_updated(actor);
        self.add_domain_event(UserEvent::UsernameChanged(UserUsernameChanged {
            user_id: self.id,
            previous,
            username: self.username.clone(),
            occurred_at: self.audit.updated_at(),
        }));
        Ok(())
    }

    pub fn change_nickname(&mut self, nickname: &str, actor: Actor) -> DomainResult<()> {
        let nickname = Nickname::parse(nickname)?;
        if nickname == self.nickname {
            return Ok(());
        }

        let previous = core::mem::replace(&mut self.nickname, nickname);
        self.mark_as_updated(actor);
        self.add_domain_event(UserEvent::NicknameChanged(UserNicknameChanged {
            user_id: self.id,
            previous,
            nickname: self.nickname.clone(),
            occurred_at: self.audit.updated_at(),
        }));
        Ok(())
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Auditable for User {
    fn audit(&self) -> &AuditInfo {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit
    }
}

impl AggregateRoot for User {
    type Event = UserEvent;

    const AGGREGATE_TYPE: &'static str = "identity.user";

    fn events(&self) -> &DomainEvents<Self::Event> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut DomainEvents<Self::Event> {
        &mut self.events
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Event emitted when a user account is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub user_id: UserId,
    pub username: Username,
    pub email: Email,
    pub nickname: Nickname,
    pub source: UserSource,
    pub status: UserStatusValue,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserActivated {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDisabled {
    pub user_id: UserId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLocked {
    pub user_id: UserId,
    pub locked_until: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUnlocked {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPasswordChanged {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPasswordReset {
    pub user_id: UserId,
    pub reset_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEmailChanged {
    pub user_id: UserId,
    pub previous: Email,
    pub email: Email,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUsernameChanged {
    pub user_id: UserId,
    pub previous: Username,
    pub username: Username,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNicknameChanged {
    pub user_id: UserId,
    pub previous: Nickname,
    pub nickname: Nickname,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeleted {
    pub user_id: UserId,
    pub deleted_by: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecovered {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// All user events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    Registered(UserRegistered),
    Activated(UserActivated),
    Disabled(UserDisabled),
    Locked(UserLocked),
    Unlocked(UserUnlocked),
    PasswordChanged(UserPasswordChanged),
    PasswordReset(UserPasswordReset),
    EmailChanged(UserEmailChanged),
    UsernameChanged(UserUsernameChanged),
    NicknameChanged(UserNicknameChanged),
    Deleted(UserDeleted),
    Recovered(UserRecovered),
}

impl UserEvent {
    pub fn user_id(&self) -> UserId {
        match self {
            UserEvent::Registered(e) => e.user_id,
            UserEvent::Activated(e) => e.user_id,
            UserEvent::Disabled(e) => e.user_id,
            UserEvent::Locked(e) => e.user_id,
            UserEvent::Unlocked(e) => e.user_id,
            UserEvent::PasswordChanged(e) => e.user_id,
            UserEvent::PasswordReset(e) => e.user_id,
            UserEvent::EmailChanged(e) => e.user_id,
            UserEvent::UsernameChanged(e) => e.user_id,
            UserEvent::NicknameChanged(e) => e.user_id,
            UserEvent::Deleted(e) => e.user_id,
            UserEvent::Recovered(e) => e.user_id,
        }
    }
}

impl Event for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Registered(_) => "identity.user.registered",
            UserEvent::Activated(_) => "identity.user.activated",
            UserEvent::Disabled(_) => "identity.user.disabled",
            UserEvent::Locked(_) => "identity.user.locked",
            UserEvent::Unlocked(_) => "identity.user.unlocked",
            UserEvent::PasswordChanged(_) => "identity.user.password_changed",
            UserEvent::PasswordReset(_) => "identity.user.password_reset",
            UserEvent::EmailChanged(_) => "identity.user.email_changed",
            UserEvent::UsernameChanged(_) => "identity.user.username_changed",
            UserEvent::NicknameChanged(_) => "identity.user.nickname_changed",
            UserEvent::Deleted(_) => "identity.user.deleted",
            UserEvent::Recovered(_) => "identity.user.recovered",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::Registered(e) => e.occurred_at,
            UserEvent::Activated(e) => e.occurred_at,
            UserEvent::Disabled(e) => e.occurred_at,
            UserEvent::Locked(e) => e.occurred_at,
            UserEvent::Unlocked(e) => e.occurred_at,
            UserEvent::PasswordChanged(e) => e.occurred_at,
            UserEvent::PasswordReset(e) => e.occurred_at,
            UserEvent::EmailChanged(e) => e.occurred_at,
            UserEvent::UsernameChanged(e) => e.occurred_at,
            UserEvent::NicknameChanged(e) => e.occurred_at,
            UserEvent::Deleted(e) => e.occurred_at,
            UserEvent::Recovered(e) => e.occurred_at,
        }
    }

    fn aggregate_id(&self) -> Uuid {
        self.user_id().raw()
    }

    fn tenant_id(&self) -> Option<TenantId> {
        self.user_id().tenant_id()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
