//! Organization membership with a single role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use identity_core::{
    Actor, AggregateRoot, AssignmentId, AuditInfo, Auditable, DomainEvents, DomainResult, Entity,
    OrganizationId, TenantId, UserId,
};
use identity_events::Event;

use crate::Role;

use super::{AssignmentStatus, AssignmentTerm, Revocation, ensure_user_in_tenant};

/// Input for [`UserOrganizationAssignment::assign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationAssignmentParams {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub role: Role,
    pub assigned_by: Actor,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Binding of a user to an organization. The tenant is the organization's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserOrganizationAssignment {
    id: AssignmentId,
    user_id: UserId,
    organization_id: OrganizationId,
    role: Role,
    term: AssignmentTerm,
    audit: AuditInfo,
    #[serde(skip)]
    events: DomainEvents<OrganizationAssignmentEvent>,
}

identity_core::entity_identity!(UserOrganizationAssignment);

impl UserOrganizationAssignment {
    /// Tenant membership is checked by the assignment service, not here.
    pub fn assign(params: OrganizationAssignmentParams) -> DomainResult<Self> {
        ensure_user_in_tenant(&params.user_id, &params.organization_id.tenant_id())?;

        let term = AssignmentTerm::start(params.assigned_by, params.expires_at)?;
        let mut assignment = Self {
            id: AssignmentId::new(),
            user_id: params.user_id,
            organization_id: params.organization_id,
            role: params.role,
            term,
            audit: AuditInfo::new(params.assigned_by),
            events: DomainEvents::new(),
        };

        let event = OrganizationAssignmentEvent::Assigned(UserAssignedToOrganization {
            assignment_id: assignment.id,
            user_id: assignment.user_id,
            organization_id: assignment.organization_id.clone(),
            role: assignment.role.clone(),
            expires_at: assignment.term.expires_at(),
            occurred_at: assignment.term.assigned_at(),
        });
        assignment.add_domain_event(event);
        Ok(assignment)
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn organization_id(&self) -> &OrganizationId {
        &self.organization_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.organization_id.tenant_id()
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

    /// Changing to the current role is a no-op.
    pub fn change_role(&mut self, role: Role, actor: Actor) -> DomainResult<()> {
        self.term.ensure_active("change the role of")?;
        if self.role == role {
            return Ok(());
        }

        let previous = std::mem::replace(&mut self.role, role);
        self.mark_as_updated(actor);
        self.add_domain_event(OrganizationAssignmentEvent::RoleChanged(
            OrganizationRoleChanged {
                assignment_id: self.id,
                user_id: self.user_id,
                organization_id: self.organization_id.clone(),
                previous_role: previous,
                role: self.role.clone(),
                occurred_at: self.audit.updated_at(),
            },
        ));
        Ok(())
    }

    pub fn revoke(&mut self, actor: Actor, reason: Option<String>) -> bool {
        if !self.term.revoke(actor, reason.clone()) {
            return false;
        }
        self.mark_as_updated(actor);
        self.add_domain_event(OrganizationAssignmentEvent::Unassigned(
            UserUnassignedFromOrganization {
                assignment_id: self.id,
                user_id: self.user_id,
                organization_id: self.organization_id.clone(),
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
        self.add_domain_event(OrganizationAssignmentEvent::Expired(
            OrganizationAssignmentExpired {
                assignment_id: self.id,
                user_id: self.user_id,
                organization_id: self.organization_id.clone(),
                occurred_at: self.audit.updated_at(),
            },
        ));
        Ok(())
    }
}

impl Entity for UserOrganizationAssignment {
    type Id = AssignmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Auditable for UserOrganizationAssignment {
    fn audit(&self) -> &AuditInfo {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit
    }
}

impl AggregateRoot for UserOrganizationAssignment {
    type Event = OrganizationAssignmentEvent;

    const AGGREGATE_TYPE: &'static str = "identity.organization_assignment";

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
pub struct UserAssignedToOrganization {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub role: Role,
    pub expires_at: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRoleChanged {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub previous_role: Role,
    pub role: Role,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUnassignedFromOrganization {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub revoked_by: Option<UserId>,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationAssignmentExpired {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrganizationAssignmentEvent {
    Assigned(UserAssignedToOrganization),
    RoleChanged(OrganizationRoleChanged),
    Unassigned(UserUnassignedFromOrganization),
    Expired(OrganizationAssignmentExpired),
}

impl OrganizationAssignmentEvent {
    pub fn assignment_id(&self) -> AssignmentId {
        match self {
            OrganizationAssignmentEvent::Assigned(e) => e.assignment_id,
            OrganizationAssignmentEvent::RoleChanged(e) => e.assignment_id,
            OrganizationAssignmentEvent::Unassigned(e) => e.assignment_id,
            OrganizationAssignmentEvent::Expired(e) => e.assignment_id,
        }
    }

    pub fn organization_id(&self) -> &OrganizationId {
        match self {
            OrganizationAssignmentEvent::Assigned(e) => &e.organization_id,
            OrganizationAssignmentEvent::RoleChanged(e) => &e.organization_id,
            OrganizationAssignmentEvent::Unassigned(e) => &e.organization_id,
            OrganizationAssignmentEvent::Expired(e) => &e.organization_id,
        }
    }
}

impl Event for OrganizationAssignmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrganizationAssignmentEvent::Assigned(_) => "identity.organization_assignment.assigned",
            OrganizationAssignmentEvent::RoleChanged(_) => {
                "identity.organization_assignment.role_changed"
            }
            OrganizationAssignmentEvent::Unassigned(_) => {
                "identity.organization_assignment.unassigned"
            }
            OrganizationAssignmentEvent::Expired(_) => "identity.organization_assignment.expired",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrganizationAssignmentEvent::Assigned(e) => e.occurred_at,
            OrganizationAssignmentEvent::RoleChanged(e) => e.occurred_at,
            OrganizationAssignmentEvent::Unassigned(e) => e.occurred_at,
            OrganizationAssignmentEvent::Expired(e) => e.occurred_at,
        }
    }

    fn aggregate_id(&self) -> Uuid {
        *self.assignment_id().as_uuid()
    }

    fn tenant_id(&self) -> Option<TenantId> {
        Some(self.organization_id().tenant_id())
    }
}
