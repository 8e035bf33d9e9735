//! Department membership, nested under an organization membership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use identity_core::{
    Actor, AggregateRoot, AssignmentId, AuditInfo, Auditable, DepartmentId, DomainError,
    DomainEvents, DomainResult, Entity, OrganizationId, TenantId, UserId,
};
use identity_events::Event;

use crate::Role;

use super::{AssignmentStatus, AssignmentTerm, Revocation, UserOrganizationAssignment};

/// Input for [`UserDepartmentAssignment::assign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentAssignmentParams {
    pub department_id: DepartmentId,
    pub role: Role,
    pub assigned_by: Actor,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Binding of a user to a department.
///
/// Holds the id of the organization membership it was created from; the user
/// and organization are copied from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDepartmentAssignment {
    id: AssignmentId,
    organization_assignment_id: AssignmentId,
    user_id: UserId,
    department_id: DepartmentId,
    role: Role,
    term: AssignmentTerm,
    audit: AuditInfo,
    #[serde(skip)]
    events: DomainEvents<DepartmentAssignmentEvent>,
}

identity_core::entity_identity!(UserDepartmentAssignment);

impl UserDepartmentAssignment {
    /// The organization membership must be valid and the department must sit in
    /// its organization.
    pub fn assign(
        membership: &UserOrganizationAssignment,
        params: DepartmentAssignmentParams,
    ) -> DomainResult<Self> {
        if !membership.is_valid() {
            return Err(DomainError::invalid_transition(format!(
                "organization assignment {} is not valid",
                membership.id()
            )));
        }
        if !params.department_id.belongs_to(membership.organization_id()) {
            return Err(DomainError::hierarchy(format!(
                "department {} does not belong to organization {}",
                params.department_id.value(),
                membership.organization_id().value()
            )));
        }

        let term = AssignmentTerm::start(params.assigned_by, params.expires_at)?;
        let mut assignment = Self {
            id: AssignmentId::new(),
            organization_assignment_id: *membership.id(),
            user_id: *membership.user_id(),
            department_id: params.department_id,
            role: params.role,
            term,
            audit: AuditInfo::new(params.assigned_by),
            events: DomainEvents::new(),
        };

        let event = DepartmentAssignmentEvent::Assigned(UserAssignedToDepartment {
            assignment_id: assignment.id,
            user_id: assignment.user_id,
            department_id: assignment.department_id.clone(),
            role: assignment.role.clone(),
            expires_at: assignment.term.expires_at(),
            occurred_at: assignment.term.assigned_at(),
        });
        assignment.add_domain_event(event);
        Ok(assignment)
    }

    pub fn organization_assignment_id(&self) -> &AssignmentId {
        &self.organization_assignment_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn department_id(&self) -> &DepartmentId {
        &self.department_id
    }

    pub fn organization_id(&self) -> &OrganizationId {
        self.department_id.organization_id()
    }

    pub fn tenant_id(&self) -> TenantId {
        self.department_id.tenant_id()
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    pub fn term(&self) -> &AssignmentTerm {
        &self.term
    }

    pub fn status(&self) -> AssignmentStatus {
        self.term.status()
    }

    pub fn revocation(&self) -> Option<&Revocation> {
        self.term.revocation()
    }

    pub fn is_valid(&self) -> bool {
        self.term.is_valid()
    }

    pub fn change_role(&mut self, role: Role, actor: Actor) -> DomainResult<()> {
        self.term.ensure_active("change the role of")?;
        if self.role == role {
            return Ok(());
        }

        let previous = std::mem::replace(&mut self.role, role);
        self.mark_as_updated(actor);
        self.add_domain_event(DepartmentAssignmentEvent::RoleChanged(DepartmentRoleChanged {
            assignment_id: self.id,
            user_id: self.user_id,
            department_id: self.department_id.clone(),
            previous_role: previous,
            role: self.role.clone(),
            occurred_at: self.audit.updated_at(),
        }));
        Ok(())
    }

    /// Returns whether anything changed.
    pub fn revoke(&mut self, actor: Actor, reason: Option<String>) -> bool {
        if !self.term.revoke(actor, reason.clone()) {
            return false;
        }
        self.mark_as_updated(actor);
        self.add_domain_event(DepartmentAssignmentEvent::Unassigned(
            UserUnassignedFromDepartment {
                assignment_id: self.id,
                user_id: self.user_id,
                department_id: self.department_id.clone(),
                revoked_by: actor.user(),
                reason,
                occurred_at: self.audit.updated_at(),
            },
        ));
        true
    }

    pub fn expire(&mut self, actor: Actor) -> DomainResult<()> {
        if !self.term.expire()? {
            return Ok(());
        }
        self.mark_as_updated(actor);
        self.add_domain_event(DepartmentAssignmentEvent::Expired(DepartmentAssignmentExpired {
            assignment_id: self.id,
            user_id: self.user_id,
            department_id: self.department_id.clone(),
            occurred_at: self.audit.updated_at(),
        }));
        Ok(())
    }
}

impl Entity for UserDepartmentAssignment {
    type Id = AssignmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Auditable for UserDepartmentAssignment {
    fn audit(&self) -> &AuditInfo {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit
    }
}

impl AggregateRoot for UserDepartmentAssignment {
    type Event = DepartmentAssignmentEvent;

    const AGGREGATE_TYPE: &'static str = "identity.department_assignment";

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

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAssignedToDepartment {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub department_id: DepartmentId,
    pub role: Role,
    pub expires_at: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentRoleChanged {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub department_id: DepartmentId,
    pub previous_role: Role,
    pub role: Role,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUnassignedFromDepartment {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub department_id: DepartmentId,
    pub revoked_by: Option<UserId>,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentAssignmentExpired {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub department_id: DepartmentId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepartmentAssignmentEvent {
    Assigned(UserAssignedToDepartment),
    RoleChanged(DepartmentRoleChanged),
    Unassigned(UserUnassignedFromDepartment),
    Expired(DepartmentAssignmentExpired),
}

impl DepartmentAssignmentEvent {
    pub fn assignment_id(&self) -> AssignmentId {
        match self {
            DepartmentAssignmentEvent::Assigned(e) => e.assignment_id,
            DepartmentAssignmentEvent::RoleChanged(e) => e.assignment_id,
            DepartmentAssignmentEvent::Unassigned(e) => e.assignment_id,
            DepartmentAssignmentEvent::Expired(e) => e.assignment_id,
        }
    }

    pub fn department_id(&self) -> &DepartmentId {
        match self {
            DepartmentAssignmentEvent::Assigned(e) => &e.department_id,
            DepartmentAssignmentEvent::RoleChanged(e) => &e.department_id,
            DepartmentAssignmentEvent::Unassigned(e) => &e.department_id,
            DepartmentAssignmentEvent::Expired(e) => &e.department_id,
        }
    }
}

impl Event for DepartmentAssignmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DepartmentAssignmentEvent::Assigned(_) => "identity.department_assignment.assigned",
            DepartmentAssignmentEvent::RoleChanged(_) => {
                "identity.department_assignment.role_changed"
            }
            DepartmentAssignmentEvent::Unassigned(_) => "identity.department_assignment.unassigned",
            DepartmentAssignmentEvent::Expired(_) => "identity.department_assignment.expired",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DepartmentAssignmentEvent::Assigned(e) => e.occurred_at,
            DepartmentAssignmentEvent::RoleChanged(e) => e.occurred_at,
            DepartmentAssignmentEvent::Unassigned(e) => e.occurred_at,
            DepartmentAssignmentEvent::Expired(e) => e.occurred_at,
        }
    }

    fn aggregate_id(&self) -> Uuid {
        *self.assignment_id().as_uuid()
    }

    fn tenant_id(&self) -> Option<TenantId> {
        Some(self.department_id().tenant_id())
    }
}
