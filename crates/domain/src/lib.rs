//! `identity-domain`: users, scope assignments and the rules between them.
//!
//! Pure domain code: no IO, no logging. Persistence and password hashing are
//! reached through the ports in [`repository`] and [`credentials`].

pub mod assignment;
pub mod credentials;
pub mod error;
pub mod profile;
pub mod repository;
pub mod roles;
pub mod service;
pub mod user;
pub mod user_status;

pub use assignment::{
    AssignmentStatus, AssignmentTerm, DepartmentAssignmentEvent, DepartmentAssignmentParams,
    OrganizationAssignmentEvent, OrganizationAssignmentParams, Revocation,
    TenantAssignmentEvent, TenantAssignmentParams, UserDepartmentAssignment,
    UserOrganizationAssignment, UserTenantAssignment,
};
pub use credentials::{CredentialError, Credentials, PasswordHasher};
pub use error::{AssignmentError, UniqueField, UniquenessError, UserError};
pub use profile::{Email, Nickname, PasswordHash, PasswordPolicy, Username};
pub use repository::{
    DepartmentAssignmentRepository, OrganizationAssignmentRepository, Repository,
    RepositoryError, RepositoryResult, TenantAssignmentRepository, UserRepository,
};
pub use roles::Role;
pub use service::{
    AssignToDepartment, AssignToOrganization, AssignmentService, ChangeDepartment,
    DepartmentChange, UserValidationService,
};
pub use user::{NewUser, User, UserEvent, UserSource};
pub use user_status::{UserStatus, UserStatusValue};
