//! In-memory persistence ports, one per aggregate type.

use chrono::{DateTime, Utc};

use identity_core::{
    AssignmentId, Auditable, DepartmentId, ExpectedVersion, OrganizationId, TenantId, UserId,
};
use identity_domain::{
    DepartmentAssignmentRepository, Email, Nickname, OrganizationAssignmentRepository,
    Repository, RepositoryResult, TenantAssignmentRepository, User, UserDepartmentAssignment,
    UserOrganizationAssignment, UserRepository, UserTenantAssignment, Username,
};

use crate::store::InMemoryAggregateStore;

macro_rules! delegate_repository {
    ($repo:ident, $aggregate:ty, $id:ty) => {
        impl Repository<$aggregate> for $repo {
            fn find_by_id(&self, id: &$id) -> RepositoryResult<Option<$aggregate>> {
                self.store.get(id)
            }

            fn save(
                &self,
                aggregate: &$aggregate,
                expected: ExpectedVersion,
            ) -> RepositoryResult<$aggregate> {
                self.store.save(aggregate, expected)
            }

            fn delete(&self, id: &$id) -> RepositoryResult<bool> {
                self.store.remove(id)
            }
        }
    };
}

/// Oldest first, so results are stable across calls.
fn by_assignment_time<A>(mut found: Vec<A>, assigned_at: impl Fn(&A) -> DateTime<Utc>) -> Vec<A> {
    found.sort_by_key(|a| assigned_at(a));
    found
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

/// Users keyed by id; profile finders skip soft-deleted users.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    store: InMemoryAggregateStore<User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

delegate_repository!(InMemoryUserRepository, User, UserId);

impl UserRepository for InMemoryUserRepository {
    fn find_by_email(&self, email: &Email) -> RepositoryResult<Option<User>> {
        self.store.find(|u| !u.is_deleted() && u.email() == email)
    }

    fn find_by_username(&self, username: &Username) -> RepositoryResult<Option<User>> {
        self.store.find(|u| !u.is_deleted() && u.username() == username)
    }

    fn find_by_nickname(&self, nickname: &Nickname) -> RepositoryResult<Option<User>> {
        self.store.find(|u| !u.is_deleted() && u.nickname() == nickname)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tenant assignments
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryTenantAssignmentRepository {
    store: InMemoryAggregateStore<UserTenantAssignment>,
}

impl InMemoryTenantAssignmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

delegate_repository!(InMemoryTenantAssignmentRepository, UserTenantAssignment, AssignmentId);

impl TenantAssignmentRepository for InMemoryTenantAssignmentRepository {
    fn find_active_by_user_and_tenant(
        &self,
        user_id: &UserId,
        tenant_id: &TenantId,
    ) -> RepositoryResult<Option<UserTenantAssignment>> {
        self.store
            .find(|a| a.user_id() == user_id && a.tenant_id() == tenant_id && a.is_valid())
    }

    fn find_by_user(&self, user_id: &UserId) -> RepositoryResult<Vec<UserTenantAssignment>> {
        let found = self.store.filter(|a| a.user_id() == user_id)?;
        Ok(by_assignment_time(found, |a| a.term().assigned_at()))
    }

    fn find_by_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> RepositoryResult<Vec<UserTenantAssignment>> {
        let found = self.store.filter(|a| a.tenant_id() == tenant_id)?;
        Ok(by_assignment_time(found, |a| a.term().assigned_at()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Organization assignments
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryOrganizationAssignmentRepository {
    store: InMemoryAggregateStore<UserOrganizationAssignment>,
}

impl InMemoryOrganizationAssignmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

delegate_repository!(
    InMemoryOrganizationAssignmentRepository,
    UserOrganizationAssignment,
    AssignmentId
);

impl OrganizationAssignmentRepository for InMemoryOrganizationAssignmentRepository {
    fn find_active_by_user_and_organization(
        &self,
        user_id: &UserId,
        organization_id: &OrganizationId,
    ) -> RepositoryResult<Option<UserOrganizationAssignment>> {
        self.store.find(|a| {
            a.user_id() == user_id && a.organization_id() == organization_id && a.is_valid()
        })
    }

    fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> RepositoryResult<Vec<UserOrganizationAssignment>> {
        let found = self.store.filter(|a| a.user_id() == user_id)?;
        Ok(by_assignment_time(found, |a| a.term().assigned_at()))
    }

    fn find_by_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> RepositoryResult<Vec<UserOrganizationAssignment>> {
        let found = self.store.filter(|a| a.organization_id() == organization_id)?;
        Ok(by_assignment_time(found, |a| a.term().assigned_at()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Department assignments
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryDepartmentAssignmentRepository {
    store: InMemoryAggregateStore<UserDepartmentAssignment>,
}

impl InMemoryDepartmentAssignmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

delegate_repository!(
    InMemoryDepartmentAssignmentRepository,
    UserDepartmentAssignment,
    AssignmentId
);

impl DepartmentAssignmentRepository for InMemoryDepartmentAssignmentRepository {
    fn find_active_by_user_in_organization(
        &self,
        user_id: &UserId,
        organization_id: &OrganizationId,
    ) -> RepositoryResult<Option<UserDepartmentAssignment>> {
        self.store.find(|a| {
            a.user_id() == user_id && a.organization_id() == organization_id && a.is_valid()
        })
    }

    fn find_current_by_user_in_organization(
        &self,
        user_id: &UserId,
        organization_id: &OrganizationId,
    ) -> RepositoryResult<Option<UserDepartmentAssignment>> {
        let found = self.store.filter(|a| {
            a.user_id() == user_id
                && a.organization_id() == organization_id
                && !a.term().is_revoked()
        })?;
        Ok(found.into_iter().max_by_key(|a| a.term().assigned_at()))
    }

    fn find_by_user(&self, user_id: &UserId) -> RepositoryResult<Vec<UserDepartmentAssignment>> {
        let found = self.store.filter(|a| a.user_id() == user_id)?;
        Ok(by_assignment_time(found, |a| a.term().assigned_at()))
    }

    fn find_by_department(
        &self,
        department_id: &DepartmentId,
    ) -> RepositoryResult<Vec<UserDepartmentAssignment>> {
        let found = self.store.filter(|a| a.department_id() == department_id)?;
        Ok(by_assignment_time(found, |a| a.term().assigned_at()))
    }
}
