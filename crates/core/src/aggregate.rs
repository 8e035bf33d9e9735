//! Aggregate root capability: a consistency boundary that collects domain events.

use crate::audit::Auditable;
use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};

/// Pending domain events of one aggregate instance.
///
/// Events are appended during a unit of work and handed out as snapshots. They
/// are only removed by an explicit [`clear`](Self::clear) once the caller has
/// persisted the aggregate and published them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainEvents<E> {
    pending: Vec<E>,
}

impl<E> DomainEvents<E> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    pub fn record(&mut self, event: E) {
        self.pending.push(event);
    }

    pub fn as_slice(&self) -> &[E] {
        &self.pending
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

impl<E: Clone> DomainEvents<E> {
    pub fn snapshot(&self) -> Vec<E> {
        self.pending.clone()
    }
}

impl<E> Default for DomainEvents<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate root: an auditable entity that owns a queue of domain events.
///
/// Aggregates never dispatch their own events. The caller reads them with
/// [`domain_events`](Self::domain_events), persists the aggregate, publishes
/// and only then calls [`clear_domain_events`](Self::clear_domain_events).
pub trait AggregateRoot: Entity + Auditable {
    type Event: Clone + core::fmt::Debug;

    /// Stable aggregate type name (e.g. "identity.user").
    const AGGREGATE_TYPE: &'static str;

    fn events(&self) -> &DomainEvents<Self::Event>;

    fn events_mut(&mut self) -> &mut DomainEvents<Self::Event>;

    fn add_domain_event(&mut self, event: Self::Event) {
        self.events_mut().record(event);
    }

    /// Snapshot of pending events, oldest first.
    fn domain_events(&self) -> Vec<Self::Event> {
        self.events().snapshot()
    }

    fn clear_domain_events(&mut self) {
        self.events_mut().clear();
    }

    fn has_domain_events(&self) -> bool {
        !self.events().is_empty()
    }

    fn domain_event_count(&self) -> usize {
        self.events().len()
    }
}

/// Optimistic concurrency expectation for an aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (useful for migrations, repairs, etc.).
    Any,
    /// The aggregate must not be stored yet.
    New,
    /// Require the stored aggregate to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    /// `actual` is `None` when nothing is stored under the id.
    pub fn matches(self, actual: Option<u64>) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::New => actual.is_none(),
            ExpectedVersion::Exact(v) => actual == Some(v),
        }
    }

    pub fn check(self, actual: Option<u64>) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {self:?}, actual: {actual:?})"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::audit::{Actor, AuditInfo};
    use crate::id::EntityId;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum CounterEvent {
        Bumped(u32),
    }

    #[derive(Debug)]
    struct Counter {
        id: EntityId,
        audit: AuditInfo,
        events: DomainEvents<CounterEvent>,
    }

    impl Entity for Counter {
        type Id = EntityId;

        fn id(&self) -> &Self::Id {
            &self.id
        }
    }

    impl Auditable for Counter {
        fn audit(&self) -> &AuditInfo {
            &self.audit
        }

        fn audit_mut(&mut self) -> &mut AuditInfo {
            &mut self.audit
        }
    }

    impl AggregateRoot for Counter {
        type Event = CounterEvent;

        const AGGREGATE_TYPE: &'static str = "test.counter";

        fn events(&self) -> &DomainEvents<Self::Event> {
            &self.events
        }

        fn events_mut(&mut self) -> &mut DomainEvents<Self::Event> {
            &mut self.events
        }
    }

    fn counter() -> Counter {
        Counter {
            id: EntityId::new(),
            audit: AuditInfo::new(Actor::System),
            events: DomainEvents::new(),
        }
    }

    #[test]
    fn snapshot_is_detached_from_the_queue() {
        let mut c = counter();
        c.add_domain_event(CounterEvent::Bumped(1));
        c.add_domain_event(CounterEvent::Bumped(2));

        let mut snapshot = c.domain_events();
        snapshot.clear();

        assert!(c.has_domain_events());
        assert_eq!(c.domain_event_count(), 2);
        assert_eq!(
            c.domain_events(),
            vec![CounterEvent::Bumped(1), CounterEvent::Bumped(2)]
        );
    }

    #[test]
    fn clear_empties_the_queue() {
        let mut c = counter();
        c.add_domain_event(CounterEvent::Bumped(1));
        c.clear_domain_events();
        assert!(!c.has_domain_events());
        assert_eq!(c.domain_event_count(), 0);
        assert_eq!(c.version(), 1);
    }

    #[test]
    fn expected_version_matching() {
        assert!(ExpectedVersion::Any.matches(None));
        assert!(ExpectedVersion::Any.matches(Some(7)));
        assert!(ExpectedVersion::New.matches(None));
        assert!(!ExpectedVersion::New.matches(Some(1)));
        assert!(ExpectedVersion::Exact(3).matches(Some(3)));
        assert!(!ExpectedVersion::Exact(3).matches(Some(4)));
        assert!(!ExpectedVersion::Exact(3).matches(None));

        let err = ExpectedVersion::Exact(1).check(Some(2)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
