//! Persist → publish → clear pipeline for aggregates.
//!
//! ```text
//! aggregate (pending events)
//!   ↓ 1. wrap events into envelopes (fails before anything is written)
//!   ↓ 2. save with version check
//!   ↓ 3. publish every envelope
//!   ↓ 4. clear pending events
//! ```
//!
//! Events are cleared only after every publish succeeded. A publish failure
//! leaves them pending so the caller can retry [`AggregateCommitter::publish_pending`].
//! A retry may deliver an event twice; it carries the same `event_id` both
//! times, so consumers key on it.

use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use identity_core::{AggregateRoot, ErrorKind, ExpectedVersion};
use identity_domain::{Repository, RepositoryError};
use identity_events::{Event, EventBus, EventEnvelope};

#[derive(Debug, Error)]
pub enum CommitError {
    /// Saving failed; nothing was published.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// An event payload could not be encoded; nothing was saved or published.
    #[error("failed to encode event payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// Publication failed after the aggregate was saved.
    #[error("failed to publish {event_type}: {message}")]
    Publish {
        event_type: String,
        message: String,
    },
}

impl CommitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommitError::Repository(e) => e.kind(),
            CommitError::Encode(_) | CommitError::Publish { .. } => ErrorKind::Infrastructure,
        }
    }
}

/// Commits aggregates through a repository and an event bus.
#[derive(Debug)]
pub struct AggregateCommitter<B> {
    bus: B,
}

impl<B> AggregateCommitter<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_inner(self) -> B {
        self.bus
    }
}

impl<B> AggregateCommitter<B>
where
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Save `aggregate` with `expected`, publish its pending events, then clear
    /// them. Returns the stored copy.
    pub fn commit<A, R>(
        &self,
        repository: &R,
        aggregate: &mut A,
        expected: ExpectedVersion,
    ) -> Result<A, CommitError>
    where
        A: AggregateRoot,
        A::Event: Event + Serialize,
        R: Repository<A> + ?Sized,
    {
        let envelopes = envelopes(aggregate)?;
        let stored = repository.save(aggregate, expected)?;

        self.publish_all(envelopes)?;
        let published = aggregate.domain_event_count();
        aggregate.clear_domain_events();

        tracing::info!(
            aggregate_type = A::AGGREGATE_TYPE,
            id = %aggregate.id(),
            version = stored.version(),
            events = published,
            "aggregate committed"
        );
        Ok(stored)
    }

    /// Publish and clear the pending events of an aggregate that is already
    /// saved. Returns the number of events published.
    pub fn publish_pending<A>(&self, aggregate: &mut A) -> Result<usize, CommitError>
    where
        A: AggregateRoot,
        A::Event: Event + Serialize,
    {
        let envelopes = envelopes(aggregate)?;
        let count = envelopes.len();
        self.publish_all(envelopes)?;
        aggregate.clear_domain_events();

        tracing::debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            id = %aggregate.id(),
            events = count,
            "pending events published"
        );
        Ok(count)
    }

    fn publish_all(&self, envelopes: Vec<EventEnvelope<JsonValue>>) -> Result<(), CommitError> {
        for envelope in envelopes {
            let event_type = envelope.event_type().to_string();
            let event_id = envelope.event_id();
            if let Err(err) = self.bus.publish(envelope) {
                tracing::error!(%event_type, %event_id, error = %err, "event publish failed");
                return Err(CommitError::Publish {
                    event_type,
                    message: err.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn envelopes<A>(aggregate: &A) -> Result<Vec<EventEnvelope<JsonValue>>, serde_json::Error>
where
    A: AggregateRoot,
    A::Event: Event + Serialize,
{
    aggregate
        .domain_events()
        .iter()
        .map(|event| EventEnvelope::from_event(A::AGGREGATE_TYPE, event))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use identity_core::{Actor, Auditable, Entity, TenantId, UserId};
    use identity_domain::{Role, TenantAssignmentParams, UserTenantAssignment};
    use identity_events::{InMemoryEventBus, Subscription};

    use crate::repositories::InMemoryTenantAssignmentRepository;

    use super::*;

    fn assignment() -> UserTenantAssignment {
        UserTenantAssignment::assign(TenantAssignmentParams {
            user_id: UserId::new(),
            tenant_id: TenantId::new(),
            roles: vec![Role::new("member")],
            assigned_by: Actor::System,
            expires_at: None,
        })
        .unwrap()
    }

    fn bus() -> InMemoryEventBus<EventEnvelope<JsonValue>> {
        InMemoryEventBus::new()
    }

    #[test]
    fn commit_saves_publishes_and_clears() {
        let committer = AggregateCommitter::new(bus());
        let sub = committer.bus().subscribe();
        let repo = InMemoryTenantAssignmentRepository::new();

        let mut a = assignment();
        a.add_role(Role::new("admin"), Actor::System).unwrap();
        let stored = committer.commit(&repo, &mut a, ExpectedVersion::New).unwrap();

        assert_eq!(stored.version(), 2);
        assert!(!a.has_domain_events());

        let published = sub.drain();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].event_type(), "identity.tenant_assignment.assigned");
        assert_eq!(published[1].event_type(), "identity.tenant_assignment.role_added");
        assert_eq!(published[0].aggregate_id(), *a.id().as_uuid());
        assert_eq!(published[0].aggregate_type(), "identity.tenant_assignment");
        assert_eq!(published[0].tenant_id(), Some(*a.tenant_id()));
    }

    #[test]
    fn failed_save_publishes_nothing() {
        let committer = AggregateCommitter::new(bus());
        let sub = committer.bus().subscribe();
        let repo = InMemoryTenantAssignmentRepository::new();

        let mut a = assignment();
        let err = committer
            .commit(&repo, &mut a, ExpectedVersion::Exact(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Concurrency);
        assert!(sub.drain().is_empty());
        assert!(a.has_domain_events());
    }

    /// Accepts `allowed` publishes, then fails until topped up.
    struct FlakyBus {
        allowed: AtomicUsize,
        inner: InMemoryEventBus<EventEnvelope<JsonValue>>,
    }

    impl FlakyBus {
        fn allowing(allowed: usize) -> Self {
            Self {
                allowed: AtomicUsize::new(allowed),
                inner: InMemoryEventBus::new(),
            }
        }

        fn recover(&self) {
            self.allowed.store(usize::MAX, Ordering::SeqCst);
        }
    }

    impl EventBus<EventEnvelope<JsonValue>> for FlakyBus {
        type Error = String;

        fn publish(&self, message: EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
            let granted = self
                .allowed
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            if granted.is_err() {
                return Err("bus unavailable".to_string());
            }
            self.inner.publish(message).map_err(|e| e.to_string())
        }

        fn subscribe(&self) -> Subscription<EventEnvelope<JsonValue>> {
            self.inner.subscribe()
        }
    }

    #[test]
    fn publish_failure_keeps_events_for_retry() {
        let committer = AggregateCommitter::new(FlakyBus::allowing(0));
        let sub = committer.bus().subscribe();
        let repo = InMemoryTenantAssignmentRepository::new();

        let mut a = assignment();
        let err = committer.commit(&repo, &mut a, ExpectedVersion::New).unwrap_err();
        assert!(matches!(err, CommitError::Publish { .. }));
        assert!(a.has_domain_events());
        assert!(repo.find_by_id(a.id()).unwrap().is_some());

        committer.bus().recover();
        assert_eq!(committer.publish_pending(&mut a).unwrap(), 1);
        assert!(!a.has_domain_events());
        assert_eq!(sub.drain().len(), 1);
    }

    #[test]
    fn redelivered_events_keep_their_event_id() {
        let committer = AggregateCommitter::new(FlakyBus::allowing(1));
        let sub = committer.bus().subscribe();
        let repo = InMemoryTenantAssignmentRepository::new();

        let mut a = assignment();
        a.add_role(Role::new("admin"), Actor::System).unwrap();
        let err = committer.commit(&repo, &mut a, ExpectedVersion::New).unwrap_err();
        assert!(matches!(err, CommitError::Publish { .. }));

        let delivered = sub.drain();
        assert_eq!(delivered.len(), 1);

        committer.bus().recover();
        assert_eq!(committer.publish_pending(&mut a).unwrap(), 2);
        let redelivered = sub.drain();
        assert_eq!(redelivered.len(), 2);
        assert_eq!(redelivered[0].event_type(), delivered[0].event_type());
        assert_eq!(redelivered[0].event_id(), delivered[0].event_id());
        assert_ne!(redelivered[0].event_id(), redelivered[1].event_id());
    }
}
