use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use identity_core::{AggregateRoot, Auditable, ExpectedVersion};
use identity_domain::{RepositoryError, RepositoryResult};

/// In-memory, version-checked aggregate store.
///
/// Intended for tests/dev. Saves compare the stored version against the
/// caller's expectation under one write lock, so concurrent saves of the same
/// aggregate cannot both succeed. Stored copies never carry pending events.
#[derive(Debug)]
pub struct InMemoryAggregateStore<A: AggregateRoot> {
    records: RwLock<HashMap<A::Id, A>>,
}

impl<A: AggregateRoot> Default for InMemoryAggregateStore<A> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<A> InMemoryAggregateStore<A>
where
    A: AggregateRoot + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, HashMap<A::Id, A>>> {
        self.records
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, HashMap<A::Id, A>>> {
        self.records
            .write()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))
    }

    pub fn get(&self, id: &A::Id) -> RepositoryResult<Option<A>> {
        Ok(self.read()?.get(id).cloned())
    }

    pub fn save(&self, aggregate: &A, expected: ExpectedVersion) -> RepositoryResult<A> {
        let mut records = self.write()?;
        let id = aggregate.id();
        let actual = records.get(id).map(Auditable::version);

        if !expected.matches(actual) {
            tracing::warn!(
                aggregate_type = A::AGGREGATE_TYPE,
                %id,
                ?expected,
                ?actual,
                "concurrency conflict on save"
            );
            return Err(RepositoryError::ConcurrencyConflict {
                aggregate_type: A::AGGREGATE_TYPE,
                id: id.to_string(),
                expected,
                actual,
            });
        }

        let mut stored = aggregate.clone();
        stored.clear_domain_events();
        records.insert(id.clone(), stored.clone());

        tracing::debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            %id,
            version = stored.version(),
            "aggregate stored"
        );
        Ok(stored)
    }

    pub fn remove(&self, id: &A::Id) -> RepositoryResult<bool> {
        let removed = self.write()?.remove(id).is_some();
        tracing::debug!(aggregate_type = A::AGGREGATE_TYPE, %id, removed, "aggregate removed");
        Ok(removed)
    }

    /// First stored aggregate matching `pred`.
    pub fn find(&self, pred: impl Fn(&A) -> bool) -> RepositoryResult<Option<A>> {
        Ok(self.read()?.values().find(|a| pred(a)).cloned())
    }

    /// Every stored aggregate matching `pred`, in arbitrary order.
    pub fn filter(&self, pred: impl Fn(&A) -> bool) -> RepositoryResult<Vec<A>> {
        Ok(self.read()?.values().filter(|a| pred(a)).cloned().collect())
    }

    pub fn len(&self) -> RepositoryResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> RepositoryResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use identity_core::{Actor, Entity, TenantId, UserId};
    use identity_domain::{Role, TenantAssignmentParams, UserTenantAssignment};
    use proptest::prelude::*;

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

    fn store() -> InMemoryAggregateStore<UserTenantAssignment> {
        InMemoryAggregateStore::new()
    }

    #[test]
    fn stored_copy_has_no_pending_events() {
        let store = store();
        let a = assignment();
        assert!(a.has_domain_events());

        let stored = store.save(&a, ExpectedVersion::New).unwrap();
        assert!(!stored.has_domain_events());
        assert!(a.has_domain_events());

        let loaded = store.get(a.id()).unwrap().unwrap();
        assert!(!loaded.has_domain_events());
        assert_eq!(loaded.version(), 1);
    }

    #[test]
    fn new_fails_when_already_stored() {
        let store = store();
        let a = assignment();
        store.save(&a, ExpectedVersion::New).unwrap();

        let err = store.save(&a, ExpectedVersion::New).unwrap_err();
        let RepositoryError::ConcurrencyConflict { actual, .. } = &err else {
            panic!("expected concurrency conflict, got {err:?}");
        };
        assert_eq!(*actual, Some(1));
        assert!(err.kind().is_retryable());
    }

    #[test]
    fn stale_writer_loses() {
        let store = store();
        let original = assignment();
        store.save(&original, ExpectedVersion::New).unwrap();

        let mut first = store.get(original.id()).unwrap().unwrap();
        let mut second = first.clone();

        first.add_role(Role::new("admin"), Actor::System).unwrap();
        store.save(&first, ExpectedVersion::Exact(1)).unwrap();

        second.add_role(Role::new("owner"), Actor::System).unwrap();
        let err = store.save(&second, ExpectedVersion::Exact(1)).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::ConcurrencyConflict {
                actual: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn concurrent_creates_admit_exactly_one() {
        let store = Arc::new(store());
        let a = assignment();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let a = a.clone();
                thread::spawn(move || store.save(&a, ExpectedVersion::New).is_ok())
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);
    }

    #[test]
    fn remove_reports_presence() {
        let store = store();
        let a = assignment();
        store.save(&a, ExpectedVersion::New).unwrap();
        assert!(store.remove(a.id()).unwrap());
        assert!(!store.remove(a.id()).unwrap());
        assert!(store.is_empty().unwrap());
    }

    proptest! {
        #[test]
        fn exact_save_succeeds_only_at_the_stored_version(
            changes in 0usize..6,
            probe in 0u64..10,
        ) {
            let store = store();
            let mut a = assignment();
            store.save(&a, ExpectedVersion::New).unwrap();
            for n in 0..changes {
                let expected = ExpectedVersion::Exact(a.version());
                a.add_role(Role::new(format!("role-{n}")), Actor::System).unwrap();
                a = store.save(&a, expected).unwrap();
            }

            let stored = a.version();
            prop_assert_eq!(stored, 1 + changes as u64);
            let result = store.save(&a, ExpectedVersion::Exact(probe));
            prop_assert_eq!(result.is_ok(), probe == stored);
        }
    }
}
