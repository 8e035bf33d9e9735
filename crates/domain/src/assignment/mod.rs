//! User ↔ scope assignments (tenant, organization, department).
//!
//! Each assignment is its own aggregate. A lower layer refers to the layer above
//! only by id; prerequisites are checked by
//! [`AssignmentService`](crate::service::AssignmentService).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use identity_core::{Actor, DomainError, DomainResult, TenantId, UserId};

pub mod department;
pub mod organization;
pub mod tenant;

pub use department::{DepartmentAssignmentEvent, DepartmentAssignmentParams, UserDepartmentAssignment};
pub use organization::{
    OrganizationAssignmentEvent, OrganizationAssignmentParams, UserOrganizationAssignment,
};
pub use tenant::{TenantAssignmentEvent, TenantAssignmentParams, UserTenantAssignment};

/// Assignment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Active,
    Revoked,
    Expired,
}

impl core::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AssignmentStatus::Active => write!(f, "ACTIVE"),
            AssignmentStatus::Revoked => write!(f, "REVOKED"),
            AssignmentStatus::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// Who revoked an assignment, when and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revocation {
    pub revoked_at: DateTime<Utc>,
    pub revoked_by: Option<UserId>,
    pub reason: Option<String>,
}

/// Time-bounded, revocable part shared by every assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentTerm {
    status: AssignmentStatus,
    assigned_at: DateTime<Utc>,
    assigned_by: Option<UserId>,
    expires_at: Option<DateTime<Utc>>,
    revocation: Option<Revocation>,
}

impl AssignmentTerm {
    pub(crate) fn start(assigned_by: Actor, expires_at: Option<DateTime<Utc>>) -> DomainResult<Self> {
        let now = Utc::now();
        if expires_at.is_some_and(|at| at <= now) {
            return Err(DomainError::validation("expiry must be in the future"));
        }
        Ok(Self {
            status: AssignmentStatus::Active,
            assigned_at: now,
            assigned_by: assigned_by.user(),
            expires_at,
            revocation: None,
        })
    }

    pub fn status(&self) -> AssignmentStatus {
        self.status
    }

    pub fn assigned_at(&self) -> DateTime<Utc> {
        self.assigned_at
    }

    pub fn assigned_by(&self) -> Option<UserId> {
        self.assigned_by
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn revocation(&self) -> Option<&Revocation> {
        self.revocation.as_ref()
    }

    pub fn is_revoked(&self) -> bool {
        self.status == AssignmentStatus::Revoked || self.revocation.is_some()
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Active, not revoked, and not past its expiry.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.status == AssignmentStatus::Active
            && self.revocation.is_none()
            && self.expires_at.is_none_or(|at| at > now)
    }

    /// Fails unless the assignment is still `ACTIVE`.
    pub(crate) fn ensure_active(&self, action: &str) -> DomainResult<()> {
        if self.status != AssignmentStatus::Active {
            return Err(DomainError::invalid_transition(format!(
                "cannot {action} an assignment in status {}",
                self.status
            )));
        }
        Ok(())
    }

    /// Returns `false` when already revoked.
    pub(crate) fn revoke(&mut self, actor: Actor, reason: Option<String>) -> bool {
        if self.is_revoked() {
            return false;
        }
        self.status = AssignmentStatus::Revoked;
        self.revocation = Some(Revocation {
            revoked_at: Utc::now(),
            revoked_by: actor.user(),
            reason,
        });
        true
    }

    /// Returns `false` when already expired.
    pub(crate) fn expire(&mut self) -> DomainResult<bool> {
        match self.status {
            AssignmentStatus::Expired => Ok(false),
            AssignmentStatus::Revoked => Err(DomainError::invalid_transition(
                "cannot expire a revoked assignment",
            )),
            AssignmentStatus::Active => {
                self.status = AssignmentStatus::Expired;
                Ok(true)
            }
        }
    }
}

/// A tenant user may only be assigned inside its own tenant.
pub(crate) fn ensure_user_in_tenant(user_id: &UserId, tenant_id: &TenantId) -> DomainResult<()> {
    match user_id.tenant_id() {
        Some(owner) if &owner != tenant_id => Err(DomainError::hierarchy(format!(
            "user {user_id} belongs to tenant {owner}, not {tenant_id}"
        ))),
        _ => Ok(()),
    }
}
