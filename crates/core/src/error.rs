//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse classification of a failure, used by the application boundary to map
/// errors onto transport responses and retry policy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; fixed by correcting the request.
    Validation,
    /// The requested transition violates a state machine.
    State,
    /// A cross-aggregate prerequisite is missing or a uniqueness rule is violated.
    Relationship,
    /// Stale version detected at the persistence boundary.
    Concurrency,
    /// A required capability (e.g. password hashing) was not wired.
    InfrastructureRequired,
    NotFound,
    /// A backing service (storage, hashing) failed.
    Infrastructure,
}

impl ErrorKind {
    /// Only concurrency failures are worth retrying, and only after re-reading
    /// the aggregate.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Concurrency)
    }
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, state transitions). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed email).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier did not have the expected shape.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// An identifier was combined with an ancestor it cannot belong to.
    #[error("invalid hierarchy: {0}")]
    Hierarchy(String),

    /// The requested transition is not allowed from the current state.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Removing the role would leave the assignment without any role.
    #[error("cannot remove last role '{0}'")]
    LastRole(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A capability the operation depends on has not been provided.
    #[error("infrastructure required: {0}")]
    InfrastructureRequired(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn hierarchy(msg: impl Into<String>) -> Self {
        Self::Hierarchy(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn last_role(role: impl Into<String>) -> Self {
        Self::LastRole(role.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn infrastructure_required(capability: impl Into<String>) -> Self {
        Self::InfrastructureRequired(capability.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_)
            | DomainError::InvalidId(_)
            | DomainError::Hierarchy(_)
            | DomainError::InvariantViolation(_) => ErrorKind::Validation,
            DomainError::InvalidTransition(_) | DomainError::LastRole(_) => ErrorKind::State,
            DomainError::NotFound => ErrorKind::NotFound,
            DomainError::Conflict(_) => ErrorKind::Concurrency,
            DomainError::InfrastructureRequired(_) => ErrorKind::InfrastructureRequired,
        }
    }
}
