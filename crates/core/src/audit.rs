//! Audit trail, activation and soft-delete state shared by persistent entities.
//!
//! [`AuditInfo`] is a plain value embedded in each entity; [`Auditable`] exposes
//! it as a capability so the same routines serve every aggregate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Who performed a change.
///
/// `Unspecified` leaves the previous attribution untouched, so a system-triggered
/// update does not erase the last human editor. `System` is an explicit "no
/// user" and clears it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Actor {
    #[default]
    Unspecified,
    System,
    User(UserId),
}

impl Actor {
    /// The acting user, if one was named.
    pub fn user(&self) -> Option<UserId> {
        match self {
            Actor::User(id) => Some(*id),
            Actor::Unspecified | Actor::System => None,
        }
    }

    fn apply_to(self, slot: &mut Option<UserId>) {
        match self {
            Actor::Unspecified => {}
            Actor::System => *slot = None,
            Actor::User(id) => *slot = Some(id),
        }
    }
}

impl From<UserId> for Actor {
    fn from(value: UserId) -> Self {
        Actor::User(value)
    }
}

/// Audit, activation and deletion state of an entity.
///
/// # Invariants
/// - `version` starts at 1 and increases by exactly one per state change.
/// - Activation and deletion are independent axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInfo {
    created_at: DateTime<Utc>,
    created_by: Option<UserId>,
    updated_at: DateTime<Utc>,
    updated_by: Option<UserId>,
    version: u64,

    is_active: bool,
    activated_at: DateTime<Utc>,
    activated_by: Option<UserId>,
    deactivated_at: Option<DateTime<Utc>>,
    deactivated_by: Option<UserId>,

    deleted_at: Option<DateTime<Utc>>,
    deleted_by: Option<UserId>,
}

impl AuditInfo {
    pub fn new(actor: Actor) -> Self {
        let now = Utc::now();
        let by = actor.user();
        Self {
            created_at: now,
            created_by: by,
            updated_at: now,
            updated_by: by,
            version: 1,
            is_active: true,
            activated_at: now,
            activated_by: by,
            deactivated_at: None,
            deactivated_by: None,
            deleted_at: None,
            deleted_by: None,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn updated_by(&self) -> Option<UserId> {
        self.updated_by
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn activated_at(&self) -> DateTime<Utc> {
        self.activated_at
    }

    pub fn activated_by(&self) -> Option<UserId> {
        self.activated_by
    }

    pub fn deactivated_at(&self) -> Option<DateTime<Utc>> {
        self.deactivated_at
    }

    pub fn deactivated_by(&self) -> Option<UserId> {
        self.deactivated_by
    }

    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    pub fn deleted_by(&self) -> Option<UserId> {
        self.deleted_by
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Stamp an update: bumps the version and refreshes `updated_at`.
    pub fn mark_as_updated(&mut self, actor: Actor) {
        self.updated_at = Utc::now();
        self.version += 1;
        actor.apply_to(&mut self.updated_by);
    }

    /// Returns `false` (and changes nothing) when already deleted.
    pub fn soft_delete(&mut self, actor: Actor) -> bool {
        if self.is_deleted() {
            return false;
        }
        self.deleted_at = Some(Utc::now());
        self.deleted_by = actor.user();
        self.mark_as_updated(actor);
        true
    }

    /// Returns `false` (and changes nothing) when not deleted.
    pub fn restore(&mut self, actor: Actor) -> bool {
        if !self.is_deleted() {
            return false;
        }
        self.deleted_at = None;
        self.deleted_by = None;
        self.mark_as_updated(actor);
        true
    }

    pub fn activate(&mut self, actor: Actor) {
        self.is_active = true;
        self.activated_at = Utc::now();
        self.activated_by = actor.user();
        self.deactivated_at = None;
        self.deactivated_by = None;
        self.mark_as_updated(actor);
    }

    pub fn deactivate(&mut self, actor: Actor) {
        self.is_active = false;
        self.deactivated_at = Some(Utc::now());
        self.deactivated_by = actor.user();
        self.mark_as_updated(actor);
    }
}

/// Capability: an entity that carries an [`AuditInfo`].
pub trait Auditable {
    fn audit(&self) -> &AuditInfo;

    fn audit_mut(&mut self) -> &mut AuditInfo;

    /// Optimistic concurrency version.
    fn version(&self) -> u64 {
        self.audit().version()
    }

    fn is_deleted(&self) -> bool {
        self.audit().is_deleted()
    }

    fn is_active(&self) -> bool {
        self.audit().is_active()
    }

    fn mark_as_updated(&mut self, actor: Actor) {
        self.audit_mut().mark_as_updated(actor);
    }

    fn soft_delete(&mut self, actor: Actor) -> bool {
        self.audit_mut().soft_delete(actor)
    }

    fn restore(&mut self, actor: Actor) -> bool {
        self.audit_mut().restore(actor)
    }

    /// Record-level activation flag; unrelated to any business status.
    fn mark_active(&mut self, actor: Actor) {
        self.audit_mut().activate(actor);
    }

    fn mark_inactive(&mut self, actor: Actor) {
        self.audit_mut().deactivate(actor);
    }
}
