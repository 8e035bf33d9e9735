use std::sync::Arc;

use chrono::{DateTime, Utc};

use identity_core::{
    Actor, Auditable, DepartmentId, DomainError, ExpectedVersion, OrganizationId, UserId,
};

use crate::Role;
use crate::assignment::{
    DepartmentAssignmentParams, OrganizationAssignmentParams, UserDepartmentAssignment,
    UserOrganizationAssignment,
};
use crate::error::AssignmentError;
use crate::repository::{
    DepartmentAssignmentRepository, OrganizationAssignmentRepository, TenantAssignmentRepository,
};

/// Reason recorded on the assignment replaced by a department change.
pub const DEPARTMENT_CHANGE_REASON: &str = "department change";

/// Request to add a user to an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignToOrganization {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub role: Role,
    pub assigned_by: Actor,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request to add a user to a department of an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignToDepartment {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub department_id: DepartmentId,
    pub role: Role,
    pub assigned_by: Actor,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request to move a user to another department of the same organization.
pub type ChangeDepartment = AssignToDepartment;

/// Outcome of [`AssignmentService::change_user_department_in_organization`].
///
/// Both aggregates still hold their pending events.
#[derive(Debug, Clone)]
pub struct DepartmentChange {
    /// The replaced assignment, when there was one.
    pub revoked: Option<UserDepartmentAssignment>,
    pub assigned: UserDepartmentAssignment,
}

/// Enforces the tenant → organization → department prerequisite chain and
/// the one-department-per-organization rule.
///
/// Every method persists what it creates and returns the aggregate with its
/// events still pending, for the caller to publish and clear.
#[derive(Clone)]
pub struct AssignmentService {
    tenants: Arc<dyn TenantAssignmentRepository>,
    organizations: Arc<dyn OrganizationAssignmentRepository>,
    departments: Arc<dyn DepartmentAssignmentRepository>,
}

impl AssignmentService {
    pub fn new(
        tenants: Arc<dyn TenantAssignmentRepository>,
        organizations: Arc<dyn OrganizationAssignmentRepository>,
        departments: Arc<dyn DepartmentAssignmentRepository>,
    ) -> Self {
        Self {
            tenants,
            organizations,
            departments,
        }
    }

    pub fn assign_user_to_organization(
        &self,
        request: AssignToOrganization,
    ) -> Result<UserOrganizationAssignment, AssignmentError> {
        let tenant_id = request.organization_id.tenant_id();
        if self
            .tenants
            .find_active_by_user_and_tenant(&request.user_id, &tenant_id)?
            .is_none()
        {
            return Err(AssignmentError::NotAssignedToTenant {
                user_id: request.user_id,
                tenant_id,
            });
        }

        if self
            .organizations
            .find_active_by_user_and_organization(&request.user_id, &request.organization_id)?
            .is_some()
        {
            return Err(AssignmentError::AlreadyAssignedToOrganization {
                user_id: request.user_id,
                organization_id: request.organization_id,
            });
        }

        let assignment = UserOrganizationAssignment::assign(OrganizationAssignmentParams {
            user_id: request.user_id,
            organization_id: request.organization_id,
            role: request.role,
            assigned_by: request.assigned_by,
            expires_at: request.expires_at,
        })?;
        self.organizations.save(&assignment, ExpectedVersion::New)?;
        Ok(assignment)
    }

    pub fn assign_user_to_department(
        &self,
        request: AssignToDepartment,
    ) -> Result<UserDepartmentAssignment, AssignmentError> {
        let membership = self.require_membership(&request)?;

        if let Some(existing) = self
            .departments
            .find_active_by_user_in_organization(&request.user_id, &request.organization_id)?
        {
            return Err(AssignmentError::AlreadyAssignedToDepartmentInOrganization {
                user_id: request.user_id,
                organization_id: request.organization_id,
                department_id: existing.department_id().clone(),
            });
        }

        let assignment = UserDepartmentAssignment::assign(&membership, department_params(request))?;
        self.departments.save(&assignment, ExpectedVersion::New)?;
        Ok(assignment)
    }

    /// Revoke the user's current department assignment in the organization (if
    /// any) and create the new one.
    ///
    /// The new assignment is validated before anything is written, so a
    /// rejected request leaves the current one in place. The two writes are
    /// separate saves; atomicity is the caller's unit of work.
    pub fn change_user_department_in_organization(
        &self,
        request: ChangeDepartment,
    ) -> Result<DepartmentChange, AssignmentError> {
        let membership = self.require_membership(&request)?;
        let user_id = request.user_id;
        let organization_id = request.organization_id.clone();
        let assigned_by = request.assigned_by;
        let assigned = UserDepartmentAssignment::assign(&membership, department_params(request))?;

        let revoked = match self
            .departments
            .find_current_by_user_in_organization(&user_id, &organization_id)?
        {
            Some(mut current) => {
                let stored_version = current.version();
                if current.revoke(assigned_by, Some(DEPARTMENT_CHANGE_REASON.to_string())) {
                    self.departments
                        .save(&current, ExpectedVersion::Exact(stored_version))?;
                }
                Some(current)
            }
            None => None,
        };

        self.departments.save(&assigned, ExpectedVersion::New)?;

        Ok(DepartmentChange { revoked, assigned })
    }

    /// Valid organization membership for a department request, after checking
    /// that the department lies inside the organization.
    fn require_membership(
        &self,
        request: &AssignToDepartment,
    ) -> Result<UserOrganizationAssignment, AssignmentError> {
        if !request.department_id.belongs_to(&request.organization_id) {
            return Err(DomainError::hierarchy(format!(
                "department {} does not belong to organization {}",
                request.department_id.value(),
                request.organization_id.value()
            ))
            .into());
        }

        self.organizations
            .find_active_by_user_and_organization(&request.user_id, &request.organization_id)?
            .ok_or_else(|| AssignmentError::NotAssignedToOrganization {
                user_id: request.user_id,
                organization_id: request.organization_id.clone(),
            })
    }
}

impl core::fmt::Debug for AssignmentService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AssignmentService").finish_non_exhaustive()
    }
}

fn department_params(request: AssignToDepartment) -> DepartmentAssignmentParams {
    DepartmentAssignmentParams {
        department_id: request.department_id,
        role: request.role,
        assigned_by: request.assigned_by,
        expires_at: request.expires_at,
    }
}
