//! Tenant membership with a non-empty role set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use identity_core::{
    Actor, AggregateRoot, AssignmentId, AuditInfo, Auditable, DomainError, DomainEvents,
    DomainResult, Entity, TenantId, UserId,
};
use identity_events::Event;

use crate::Role;

use super::{AssignmentStatus, AssignmentTerm, Revocation, ensure_user_in_tenant};

/// Input for [`UserTenantAssignment::assign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantAssignmentParams {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    /// At least one role; the first is the primary role.
    pub roles: Vec<Role>,
    pub assigned_by: Actor,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Binding of a user to a tenant with one or more roles.
///
/// # Invariants
/// - The role set is never empty and holds no duplicates.
/// - Insertion order is kept; the first role is the primary one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTenantAssignment {
    id: AssignmentId,
    user_id: UserId,
    tenant_id: TenantId,
    roles: Vec<Role>,
    term: AssignmentTerm,
    audit: AuditInfo,
    #[serde(skip)]
    events: DomainEvents<TenantAssignmentEvent>,
}

identity_core::entity_identity!(UserTenantAssignment);

impl UserTenantAssignment {
    pub fn assign(params: TenantAssignmentParams) -> DomainResult<Self> {
        ensure_user_in_tenant(&params.user_id, &params.tenant_id)?;

        let mut roles: Vec<Role> = Vec::with_capacity(params.roles.len());
        for role in params.roles {
            if !roles.contains(&role) {
                roles.push(role);
            }
        }
        if roles.is_empty() {
            return Err(DomainError::validation(
                "a tenant assignment needs at least one role",
            ));
        }

        let term = AssignmentTerm::start(params.assigned_by, params.expires_at)?;
        let mut assignment = Self {
            id: AssignmentId::new(),
            user_id: params.user_id,
            tenant_id: params.tenant_id,
            roles,
            term,
            audit: AuditInfo::new(params.assigned_by),
            events: DomainEvents::new(),
        };

        let event = TenantAssignmentEvent::Assigned(UserAssignedToTenant {
            assignment_id: assignment.id,
            user_id: assignment.user_id,
            tenant_id: assignment.tenant_id,
            roles: assignment.roles.clone(),
            expires_at: assignment.term.expires_at(),
            occurred_at: assignment.term.assigned_at(),
        });
        assignment.add_domain_event(event);
        Ok(assignment)
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Primary (first) role.
    pub fn role(&self) -> &Role {
        // The role set is never empty.
        &self.roles[0]
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn has_role_value(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.as_str() == role)
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

    /// Adding a role the assignment already has is a no-op.
    pub fn add_role(&mut self, role: Role, actor: Actor) -> DomainResult<()> {
        self.term.ensure_active("add a role to")?;
        if self.has_role(&role) {
            return Ok(());
        }

        self.roles.push(role.clone());
        self.mark_as_updated(actor);
        self.add_domain_event(TenantAssignmentEvent::RoleAdded(TenantRoleAdded {
            assignment_id: self.id,
            user_id: self.user_id,
            tenant_id: self.tenant_id,
            role,
            occurred_at: self.audit.updated_at(),
        }));
        Ok(())
    }

    /// Removing an absent role is a no-op; removing the last role fails.
    pub fn remove_role(&mut self, role: &Role, actor: Actor) -> DomainResult<()> {
        self.term.ensure_active("remove a role from")?;
        let Some(index) = self.roles.iter().position(|r| r == role) else {
            return Ok(());
        };
        if self.roles.len() == 1 {
            return Err(DomainError::last_role(role.as_str()));
        }

        let removed = self.roles.remove(index);
        self.mark_as_updated(actor);
        self.add_domain_event(TenantAssignmentEvent::RoleRemoved(TenantRoleRemoved {
            assignment_id: self.id,
            user_id: self.user_id,
            tenant_id: self.tenant_id,
            role: removed,
            occurred_at: self.audit.updated_at(),
        }));
        Ok(())
    }

    /// Revoke the membership. Returns whether anything changed.
    pub fn revoke(&mut self, actor: Actor, reason: Option<String>) -> bool {
        if !self.term.revoke(actor, reason.clone()) {
            return false;
        }
        self.mark_as_updated(actor);
        self.add_domain_event(TenantAssignmentEvent::Unassigned(UserUnassignedFromTenant {
            assignment_id: self.id,
            user_id: self.user_id,
            tenant_id: self.tenant_id,
            revoked_by: actor.user(),
            reason,
            occurred_at: self.audit.updated_at(),
        }));
        true
    }

    pub fn expire(&mut self, actor: Actor) -> DomainResult<()> {
        if !self.term.expire()? {
            return Ok(());
        }
        self.mark_as_updated(actor);
        self.add_domain_event(TenantAssignmentEvent::Expired(TenantAssignmentExpired {
            assignment_id: self.id,
            user_id: self.user_id,
            tenant_id: self.tenant_id,
            occurred_at: self.audit.updated_at(),
        }));
        Ok(())
    }
}

impl Entity for UserTenantAssignment {
    type Id = AssignmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Auditable for UserTenantAssignment {
    fn audit(&self) -> &AuditInfo {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit
    }
}

impl AggregateRoot for UserTenantAssignment {
    type Event = TenantAssignmentEvent;

    const AGGREGATE_TYPE: &'static str = "identity.tenant_assignment";

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
pub struct UserAssignedToTenant {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub roles: Vec<Role>,
    pub expires_at: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRoleAdded {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role: Role,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRoleRemoved {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role: Role,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUnassignedFromTenant {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub revoked_by: Option<UserId>,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantAssignmentExpired {
    pub assignment_id: AssignmentId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TenantAssignmentEvent {
    Assigned(UserAssignedToTenant),
    RoleAdded(TenantRoleAdded),
    RoleRemoved(TenantRoleRemoved),
    Unassigned(UserUnassignedFromTenant),
    Expired(TenantAssignmentExpired),
}

impl TenantAssignmentEvent {
    fn keys(&self) -> (AssignmentId, TenantId, DateTime<Utc>) {
        match self {
            TenantAssignmentEvent::Assigned(e) => (e.assignment_id, e.tenant_id, e.occurred_at),
            TenantAssignmentEvent::RoleAdded(e) => (e.assignment_id, e.tenant_id, e.occurred_at),
            TenantAssignmentEvent::RoleRemoved(e) => (e.assignment_id, e.tenant_id, e.occurred_at),
            TenantAssignmentEvent::Unassigned(e) => (e.assignment_id, e.tenant_id, e.occurred_at),
            TenantAssignmentEvent::Expired(e) => (e.assignment_id, e.tenant_id, e.occurred_at),
        }
    }
}

impl Event for TenantAssignmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TenantAssignmentEvent::Assigned(_) => "identity.tenant_assignment.assigned",
            TenantAssignmentEvent::RoleAdded(_) => "identity.tenant_assignment.role_added",
            TenantAssignmentEvent::RoleRemoved(_) => "identity.tenant_assignment.role_removed",
            TenantAssignmentEvent::Unassigned(_) => "identity.tenant_assignment.unassigned",
            TenantAssignmentEvent::Expired(_) => "identity.tenant_assignment.expired",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.keys().2
    }

    fn aggregate_id(&self) -> Uuid {
        *self.keys().0.as_uuid()
    }

    fn tenant_id(&self) -> Option<TenantId> {
        Some(self.keys().1)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn params(roles: &[&'static str]) -> TenantAssignmentParams {
        TenantAssignmentParams {
            user_id: UserId::new(),
            tenant_id: TenantId::new(),
            roles: roles.iter().map(|r| Role::new(*r)).collect(),
            assigned_by: Actor::User(UserId::new()),
            expires_at: None,
        }
    }

    #[test]
    fn primary_role_is_the_first() {
        let assignment = UserTenantAssignment::assign(params(&["admin", "member"])).unwrap();
        assert_eq!(assignment.role().as_str(), "admin");
        assert!(assignment.has_role_value("member"));
        assert!(!assignment.has_role_value("owner"));
        assert_eq!(assignment.status(), AssignmentStatus::Active);
        assert!(assignment.is_valid());
        assert_eq!(assignment.domain_event_count(), 1);
    }

    #[test]
    fn empty_role_set_is_rejected() {
        let err = UserTenantAssignment::assign(params(&[])).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn duplicate_roles_collapse() {
        let mut assignment = UserTenantAssignment::assign(params(&["member", "member"])).unwrap();
        assert_eq!(assignment.roles().len(), 1);

        assignment.add_role(Role::new("member"), Actor::System).unwrap();
        assert_eq!(assignment.version(), 1);
        assert_eq!(assignment.roles().len(), 1);
    }

    #[test]
    fn removing_the_last_role_fails() {
        let mut assignment = UserTenantAssignment::assign(params(&["member"])).unwrap();
        let err = assignment
            .remove_role(&Role::new("member"), Actor::System)
            .unwrap_err();
        assert!(matches!(err, DomainError::LastRole(_)));
        assert_eq!(assignment.roles().len(), 1);
        assert_eq!(assignment.version(), 1);
    }

    #[test]
    fn add_then_remove_role() {
        let mut assignment = UserTenantAssignment::assign(params(&["member"])).unwrap();
        assignment.add_role(Role::new("admin"), Actor::System).unwrap();
        assignment.remove_role(&Role::new("member"), Actor::System).unwrap();

        assert_eq!(assignment.role().as_str(), "admin");
        assert_eq!(assignment.version(), 3);

        let types: Vec<_> = assignment
            .domain_events()
            .iter()
            .map(|e| e.event_type())
            .collect();
        assert_eq!(
            types,
            vec![
                "identity.tenant_assignment.assigned",
                "identity.tenant_assignment.role_added",
                "identity.tenant_assignment.role_removed",
            ]
        );
    }

    #[test]
    fn revoke_twice_changes_nothing_the_second_time() {
        let mut assignment = UserTenantAssignment::assign(params(&["member"])).unwrap();
        assignment.revoke(Actor::System, Some("left company".into()));
        let revoked_at = assignment.revocation().map(|r| r.revoked_at);
        let version = assignment.version();

        assignment.revoke(Actor::System, None);
        assert_eq!(assignment.revocation().map(|r| r.revoked_at), revoked_at);
        assert_eq!(assignment.version(), version);
        assert_eq!(assignment.status(), AssignmentStatus::Revoked);
        assert_eq!(assignment.domain_event_count(), 2);
        assert!(!assignment.is_valid());
    }

    #[test]
    fn revoked_assignment_rejects_role_changes() {
        let mut assignment = UserTenantAssignment::assign(params(&["member"])).unwrap();
        assignment.revoke(Actor::System, None);
        let err = assignment.add_role(Role::new("admin"), Actor::System).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
    }

    #[test]
    fn tenant_user_cannot_join_another_tenant() {
        let mut p = params(&["member"]);
        p.user_id = UserId::new_in_tenant(TenantId::new());
        let err = UserTenantAssignment::assign(p).unwrap_err();
        assert!(matches!(err, DomainError::Hierarchy(_)));
    }

    #[derive(Debug, Clone)]
    enum RoleOp {
        Add(u8),
        Remove(u8),
    }

    fn role_op() -> impl Strategy<Value = RoleOp> {
        prop_oneof![
            (0u8..4).prop_map(RoleOp::Add),
            (0u8..4).prop_map(RoleOp::Remove),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            .. ProptestConfig::default()
        })]

        #[test]
        fn role_set_never_empties_and_version_tracks_changes(ops in prop::collection::vec(role_op(), 0..32)) {
            let mut assignment = UserTenantAssignment::assign(params(&["r0"])).unwrap();

            for op in ops {
                let before_version = assignment.version();
                let before_len = assignment.roles().len();

                let result = match op {
                    RoleOp::Add(n) => assignment.add_role(Role::new(format!("r{n}")), Actor::System),
                    RoleOp::Remove(n) => assignment.remove_role(&Role::new(format!("r{n}")), Actor::System),
                };

                prop_assert!(!assignment.roles().is_empty());
                let changed = assignment.roles().len() != before_len;
                match result {
                    Ok(()) => {
                        prop_assert_eq!(assignment.version(), before_version + u64::from(changed));
                    }
                    Err(e) => {
                        prop_assert!(matches!(e, DomainError::LastRole(_)));
                        prop_assert_eq!(assignment.version(), before_version);
                    }
                }
            }
        }
    }

    #[test]
    fn snapshot_reloads_roles_and_term() {
        let mut assignment = UserTenantAssignment::assign(params(&["member"])).unwrap();
        assignment.add_role(Role::new("admin"), Actor::System).unwrap();

        let snapshot = serde_json::to_value(&assignment).unwrap();
        let loaded: UserTenantAssignment = serde_json::from_value(snapshot).unwrap();

        assert_eq!(loaded.id(), assignment.id());
        assert_eq!(loaded.roles(), assignment.roles());
        assert_eq!(loaded.term(), assignment.term());
        assert_eq!(loaded.version(), 2);
        assert!(!loaded.has_domain_events());
    }
}
