//! Persistence ports for the identity aggregates.
//!
//! Storage is an infrastructure concern; the domain only describes what it
//! needs. Implementations must:
//! - compare-and-swap on the stored version (see [`ExpectedVersion`]),
//! - never keep pending domain events on stored copies,
//! - be safe to share between threads.

use thiserror::Error;

use identity_core::{
    AggregateRoot, DepartmentId, ErrorKind, ExpectedVersion, OrganizationId, TenantId, UserId,
};

use crate::assignment::{UserDepartmentAssignment, UserOrganizationAssignment, UserTenantAssignment};
use crate::profile::{Email, Nickname, Username};
use crate::user::User;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository operation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error(
        "optimistic concurrency check failed for {aggregate_type} {id} (expected: {expected:?}, actual: {actual:?})"
    )]
    ConcurrencyConflict {
        aggregate_type: &'static str,
        id: String,
        expected: ExpectedVersion,
        actual: Option<u64>,
    },

    #[error("storage failure: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::ConcurrencyConflict { .. } => ErrorKind::Concurrency,
            RepositoryError::Storage(_) => ErrorKind::Infrastructure,
        }
    }
}

/// Generic aggregate persistence.
pub trait Repository<A: AggregateRoot>: Send + Sync {
    fn find_by_id(&self, id: &A::Id) -> RepositoryResult<Option<A>>;

    /// Store `aggregate` if the stored version matches `expected`.
    ///
    /// Returns the stored copy, without pending events.
    fn save(&self, aggregate: &A, expected: ExpectedVersion) -> RepositoryResult<A>;

    /// Returns `false` when nothing was stored under `id`.
    fn delete(&self, id: &A::Id) -> RepositoryResult<bool>;
}

/// User lookups. Soft-deleted users are never returned.
pub trait UserRepository: Repository<User> {
    fn find_by_email(&self, email: &Email) -> RepositoryResult<Option<User>>;

    fn find_by_username(&self, username: &Username) -> RepositoryResult<Option<User>>;

    fn find_by_nickname(&self, nickname: &Nickname) -> RepositoryResult<Option<User>>;

    fn exists_by_email(&self, email: &Email) -> RepositoryResult<bool> {
        Ok(self.find_by_email(email)?.is_some())
    }

    fn exists_by_username(&self, username: &Username) -> RepositoryResult<bool> {
        Ok(self.find_by_username(username)?.is_some())
    }

    fn exists_by_nickname(&self, nickname: &Nickname) -> RepositoryResult<bool> {
        Ok(self.find_by_nickname(nickname)?.is_some())
    }
}

pub trait TenantAssignmentRepository: Repository<UserTenantAssignment> {
    /// The valid (active, unexpired) membership of `user_id` in `tenant_id`.
    fn find_active_by_user_and_tenant(
        &self,
        user_id: &UserId,
        tenant_id: &TenantId,
    ) -> RepositoryResult<Option<UserTenantAssignment>>;

    fn find_by_user(&self, user_id: &UserId) -> RepositoryResult<Vec<UserTenantAssignment>>;

    fn find_by_tenant(&self, tenant_id: &TenantId)
    -> RepositoryResult<Vec<UserTenantAssignment>>;
}

pub trait OrganizationAssignmentRepository: Repository<UserOrganizationAssignment> {
    fn find_active_by_user_and_organization(
        &self,
        user_id: &UserId,
        organization_id: &OrganizationId,
    ) -> RepositoryResult<Option<UserOrganizationAssignment>>;

    fn find_by_user(&self, user_id: &UserId)
    -> RepositoryResult<Vec<UserOrganizationAssignment>>;

    fn find_by_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> RepositoryResult<Vec<UserOrganizationAssignment>>;
}

pub trait DepartmentAssignmentRepository: Repository<UserDepartmentAssignment> {
    /// The valid department membership of `user_id` anywhere in `organization_id`.
    fn find_active_by_user_in_organization(
        &self,
        user_id: &UserId,
        organization_id: &OrganizationId,
    ) -> RepositoryResult<Option<UserDepartmentAssignment>>;

    /// The most recent non-revoked department membership in `organization_id`,
    /// including one that has expired.
    fn find_current_by_user_in_organization(
        &self,
        user_id: &UserId,
        organization_id: &OrganizationId,
    ) -> RepositoryResult<Option<UserDepartmentAssignment>>;

    fn find_by_user(&self, user_id: &UserId) -> RepositoryResult<Vec<UserDepartmentAssignment>>;

    fn find_by_department(
        &self,
        department_id: &DepartmentId,
    ) -> RepositoryResult<Vec<UserDepartmentAssignment>>;
}
