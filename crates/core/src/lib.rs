//! `identity-core`: entity and aggregate kernel.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! hierarchy-aware identifiers, the entity / auditable / aggregate-root
//! capabilities, and the domain error model.

pub mod aggregate;
pub mod audit;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{AggregateRoot, DomainEvents, ExpectedVersion};
pub use audit::{Actor, AuditInfo, Auditable};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, ErrorKind};
pub use id::{AssignmentId, DepartmentId, EntityId, Identifier, OrganizationId, TenantId, UserId};
pub use value_object::ValueObject;
