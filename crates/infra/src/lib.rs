//! Infrastructure adapters for the identity domain: in-memory persistence,
//! Argon2 password hashing, the commit pipeline and environment configuration.

pub mod committer;
pub mod config;
pub mod credentials;
pub mod repositories;
pub mod store;

pub use committer::{AggregateCommitter, CommitError};
pub use config::CredentialConfig;
pub use credentials::Argon2PasswordHasher;
pub use repositories::{
    InMemoryDepartmentAssignmentRepository, InMemoryOrganizationAssignmentRepository,
    InMemoryTenantAssignmentRepository, InMemoryUserRepository,
};
pub use store::InMemoryAggregateStore;
