//! Errors raised by the identity domain beyond the kernel's [`DomainError`].

use thiserror::Error;

use identity_core::{DepartmentId, DomainError, ErrorKind, OrganizationId, TenantId, UserId};

use crate::credentials::CredentialError;
use crate::repository::RepositoryError;

/// User aggregate error for operations that touch the credential port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Credential(#[from] CredentialError),
}

impl UserError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UserError::Domain(e) => e.kind(),
            UserError::Credential(e) => e.kind(),
        }
    }
}

/// Relationship failures raised by the assignment domain service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignmentError {
    #[error("user {user_id} has no active assignment in tenant {tenant_id}")]
    NotAssignedToTenant {
        user_id: UserId,
        tenant_id: TenantId,
    },

    #[error("user {user_id} has no active assignment in organization {organization_id}")]
    NotAssignedToOrganization {
        user_id: UserId,
        organization_id: OrganizationId,
    },

    #[error("user {user_id} is already assigned to organization {organization_id}")]
    AlreadyAssignedToOrganization {
        user_id: UserId,
        organization_id: OrganizationId,
    },

    #[error(
        "user {user_id} is already assigned to department {department_id} in organization {organization_id}"
    )]
    AlreadyAssignedToDepartmentInOrganization {
        user_id: UserId,
        organization_id: OrganizationId,
        department_id: DepartmentId,
    },

    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Repository(#[from] RepositoryError),
}

impl AssignmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssignmentError::NotAssignedToTenant { .. }
            | AssignmentError::NotAssignedToOrganization { .. }
            | AssignmentError::AlreadyAssignedToOrganization { .. }
            | AssignmentError::AlreadyAssignedToDepartmentInOrganization { .. } => {
                ErrorKind::Relationship
            }
            AssignmentError::Domain(e) => e.kind(),
            AssignmentError::Repository(e) => e.kind(),
        }
    }
}

/// Profile field guarded by platform-wide uniqueness.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniqueField {
    Email,
    Username,
    Nickname,
}

impl core::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UniqueField::Email => f.write_str("email"),
            UniqueField::Username => f.write_str("username"),
            UniqueField::Nickname => f.write_str("nickname"),
        }
    }
}

/// Raised when a user's profile collides with another user's.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UniquenessError {
    #[error("{field} '{value}' is already taken")]
    Taken { field: UniqueField, value: String },

    #[error("{0}")]
    Repository(#[from] RepositoryError),
}

impl UniquenessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UniquenessError::Taken { .. } => ErrorKind::Relationship,
            UniquenessError::Repository(e) => e.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_errors_are_not_retryable() {
        let err = AssignmentError::NotAssignedToTenant {
            user_id: UserId::new(),
            tenant_id: TenantId::new(),
        };
        assert_eq!(err.kind(), ErrorKind::Relationship);
        assert!(!err.kind().is_retryable());
    }

    #[test]
    fn wrapped_errors_keep_their_kind() {
        let err = AssignmentError::from(DomainError::last_role("admin"));
        assert_eq!(err.kind(), ErrorKind::State);

        let err = UserError::from(DomainError::infrastructure_required("password hasher"));
        assert_eq!(err.kind(), ErrorKind::InfrastructureRequired);
    }
}
