//! Entity trait: identity + continuity across state changes.

use crate::id::Identifier;

/// Entity marker + minimal interface.
///
/// Two entities are the same entity when their identifiers are equal, whatever
/// their other fields say. Use [`entity_identity!`](crate::entity_identity) to
/// derive `PartialEq`/`Eq`/`Hash` accordingly.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Identifier;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Implement `PartialEq`, `Eq` and `Hash` for an [`Entity`] from its id only.
#[macro_export]
macro_rules! entity_identity {
    ($t:ty) => {
        impl PartialEq for $t {
            fn eq(&self, other: &Self) -> bool {
                $crate::Entity::id(self) == $crate::Entity::id(other)
            }
        }

        impl Eq for $t {}

        impl core::hash::Hash for $t {
            fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
                core::hash::Hash::hash($crate::Entity::id(self), state)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::id::EntityId;

    use super::*;

    #[derive(Debug, Clone)]
    struct Widget {
        id: EntityId,
        label: String,
    }

    impl Entity for Widget {
        type Id = EntityId;

        fn id(&self) -> &Self::Id {
            &self.id
        }
    }

    crate::entity_identity!(Widget);

    #[test]
    fn equality_ignores_mutable_fields() {
        let id = EntityId::new();
        let a = Widget { id, label: "a".into() };
        let b = Widget { id, label: "b".into() };
        assert_eq!(a, b);

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);

        let other = Widget { id: EntityId::new(), label: "a".into() };
        assert!(!set.contains(&other));
        assert_eq!(other.label, "a");
    }
}
