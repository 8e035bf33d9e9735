//! Strongly-typed, hierarchy-aware identifiers used across the domain.
//!
//! The hierarchy is `tenant → organization (self-referential tree) → department`.
//! Hierarchical identifiers compare and hash on their full hierarchy key, so two
//! identifiers with the same raw value but different owners are never equal.

use core::cmp::Ordering;
use core::hash::{Hash, Hasher};
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Common surface of every identifier.
pub trait Identifier: Clone + Eq + Hash + core::fmt::Debug + core::fmt::Display {
    /// The unique raw value, without hierarchy information.
    fn raw(&self) -> Uuid;
}

/// Parse a raw identifier value. Only the canonical hyphenated form is accepted.
fn parse_raw(name: &str, raw: &str) -> DomainResult<Uuid> {
    if raw.len() != 36 {
        return Err(DomainError::invalid_id(format!(
            "{name}: expected a hyphenated UUID, got '{raw}'"
        )));
    }
    Uuid::try_parse(raw).map_err(|e| DomainError::invalid_id(format!("{name}: {e}")))
}

/// Identifier of a tenant (root of the hierarchy).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(Uuid);

/// Identifier of a generic entity that has no hierarchy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

/// Identifier of a user ↔ scope assignment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssignmentId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
            /// for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Identifier for $t {
            fn raw(&self) -> Uuid {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_raw($name, s).map(Self)
            }
        }
    };
}

impl_uuid_newtype!(TenantId, "TenantId");
impl_uuid_newtype!(EntityId, "EntityId");
impl_uuid_newtype!(AssignmentId, "AssignmentId");

// ─────────────────────────────────────────────────────────────────────────────
// UserId
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier of a user.
///
/// Platform and system users carry no tenant; tenant users carry the tenant that
/// owns them. The tenant is part of the identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId {
    tenant_id: Option<TenantId>,
    value: Uuid,
}

impl UserId {
    /// A new platform-level user id (no owning tenant).
    pub fn new() -> Self {
        Self {
            tenant_id: None,
            value: Uuid::now_v7(),
        }
    }

    /// A new tenant-scoped user id.
    pub fn new_in_tenant(tenant_id: TenantId) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            value: Uuid::now_v7(),
        }
    }

    pub fn from_parts(tenant_id: Option<TenantId>, value: Uuid) -> Self {
        Self { tenant_id, value }
    }

    pub fn parse(tenant_id: Option<TenantId>, raw: &str) -> DomainResult<Self> {
        Ok(Self {
            tenant_id,
            value: parse_raw("UserId", raw)?,
        })
    }

    pub fn value(&self) -> &Uuid {
        &self.value
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn belongs_to(&self, tenant_id: &TenantId) -> bool {
        self.tenant_id.as_ref() == Some(tenant_id)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl Identifier for UserId {
    fn raw(&self) -> Uuid {
        self.value
    }
}

impl core::fmt::Display for UserId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.value, f)
    }
}

impl FromStr for UserId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(None, s)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// OrganizationId
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier of an organization.
///
/// Organizations form a tree inside a tenant. The parent chain is carried with
/// the identifier so ancestry can be answered without a lookup.
///
/// # Invariants
/// - A parent organization belongs to the same tenant.
/// - An organization never appears in its own ancestry.
///
/// Equality, ordering and hashing use `(tenant_id, value)`; the parent chain is
/// descriptive and does not take part in identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "OrganizationIdParts")]
pub struct OrganizationId {
    tenant_id: TenantId,
    value: Uuid,
    parent: Option<Box<OrganizationId>>,
}

#[derive(Deserialize)]
struct OrganizationIdParts {
    tenant_id: TenantId,
    value: Uuid,
    parent: Option<Box<OrganizationId>>,
}

impl TryFrom<OrganizationIdParts> for OrganizationId {
    type Error = DomainError;

    fn try_from(parts: OrganizationIdParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts.tenant_id, parts.value, parts.parent.map(|p| *p))
    }
}

impl OrganizationId {
    /// Generate a new organization id under `tenant_id`, optionally nested under `parent`.
    pub fn new(tenant_id: TenantId, parent: Option<OrganizationId>) -> DomainResult<Self> {
        Self::from_parts(tenant_id, Uuid::now_v7(), parent)
    }

    /// Parse a raw value into an organization id owned by `tenant_id`.
    pub fn parse(
        tenant_id: TenantId,
        parent: Option<OrganizationId>,
        raw: &str,
    ) -> DomainResult<Self> {
        let value = parse_raw("OrganizationId", raw)?;
        Self::from_parts(tenant_id, value, parent)
    }

    pub fn from_parts(
        tenant_id: TenantId,
        value: Uuid,
        parent: Option<OrganizationId>,
    ) -> DomainResult<Self> {
        if let Some(parent) = &parent {
            if parent.tenant_id != tenant_id {
                return Err(DomainError::hierarchy(format!(
                    "parent organization {} belongs to tenant {}, not {}",
                    parent.value, parent.tenant_id, tenant_id
                )));
            }
            if core::iter::once(parent)
                .chain(parent.ancestors())
                .any(|a| a.value == value)
            {
                return Err(DomainError::hierarchy(format!(
                    "organization {value} cannot be its own ancestor"
                )));
            }
        }

        Ok(Self {
            tenant_id,
            value,
            parent: parent.map(Box::new),
        })
    }

    pub fn value(&self) -> &Uuid {
        &self.value
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn parent(&self) -> Option<&OrganizationId> {
        self.parent.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Number of ancestors (0 for a root organization).
    pub fn depth(&self) -> usize {
        self.ancestors().count()
    }

    /// Walk the parent chain, nearest ancestor first.
    pub fn ancestors(&self) -> impl Iterator<Item = &OrganizationId> {
        core::iter::successors(self.parent(), |o| o.parent())
    }

    /// The top-most organization of this branch (itself when root).
    pub fn root(&self) -> &OrganizationId {
        self.ancestors().last().unwrap_or(self)
    }

    pub fn belongs_to(&self, tenant_id: &TenantId) -> bool {
        &self.tenant_id == tenant_id
    }

    /// Whether `self` appears in the parent chain of `other`.
    pub fn is_ancestor_of(&self, other: &OrganizationId) -> bool {
        other.ancestors().any(|a| a == self)
    }

    pub fn is_descendant_of(&self, other: &OrganizationId) -> bool {
        other.is_ancestor_of(self)
    }
}

impl PartialEq for OrganizationId {
    fn eq(&self, other: &Self) -> bool {
        self.tenant_id == other.tenant_id && self.value == other.value
    }
}

impl Eq for OrganizationId {}

impl Hash for OrganizationId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tenant_id.hash(state);
        self.value.hash(state);
    }
}

impl PartialOrd for OrganizationId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrganizationId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tenant_id
            .cmp(&other.tenant_id)
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl Identifier for OrganizationId {
    fn raw(&self) -> Uuid {
        self.value
    }
}

impl core::fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.value, f)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DepartmentId
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier of a department, always owned by an organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DepartmentIdParts")]
pub struct DepartmentId {
    organization_id: OrganizationId,
    value: Uuid,
}

#[derive(Deserialize)]
struct DepartmentIdParts {
    organization_id: Option<OrganizationId>,
    value: Uuid,
}

impl TryFrom<DepartmentIdParts> for DepartmentId {
    type Error = DomainError;

    fn try_from(parts: DepartmentIdParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts.organization_id, parts.value)
    }
}

impl DepartmentId {
    pub fn new(organization_id: OrganizationId) -> Self {
        Self {
            organization_id,
            value: Uuid::now_v7(),
        }
    }

    /// Parse a raw value into a department id.
    ///
    /// Fails with a hierarchy error when no owning organization is supplied.
    pub fn parse(organization_id: Option<OrganizationId>, raw: &str) -> DomainResult<Self> {
        let value = parse_raw("DepartmentId", raw)?;
        Self::from_parts(organization_id, value)
    }

    pub fn from_parts(organization_id: Option<OrganizationId>, value: Uuid) -> DomainResult<Self> {
        let organization_id = organization_id.ok_or_else(|| {
            DomainError::hierarchy(format!("department {value} requires an owning organization"))
        })?;
        Ok(Self {
            organization_id,
            value,
        })
    }

    pub fn value(&self) -> &Uuid {
        &self.value
    }

    pub fn organization_id(&self) -> &OrganizationId {
        &self.organization_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.organization_id.tenant_id()
    }

    pub fn belongs_to(&self, organization_id: &OrganizationId) -> bool {
        &self.organization_id == organization_id
    }
}

impl PartialEq for DepartmentId {
    fn eq(&self, other: &Self) -> bool {
        self.organization_id == other.organization_id && self.value == other.value
    }
}

impl Eq for DepartmentId {}

impl Hash for DepartmentId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.organization_id.hash(state);
        self.value.hash(state);
    }
}

impl PartialOrd for DepartmentId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DepartmentId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.organization_id
            .cmp(&other.organization_id)
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl Identifier for DepartmentId {
    fn raw(&self) -> Uuid {
        self.value
    }
}

impl core::fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.value, f)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    const RAW: &str = "0190a6c4-8b7e-7a51-9f3c-2d1e4b5a6c7d";

    #[test]
    fn tenant_id_rejects_malformed_input() {
        let err = "not-a-uuid".parse::<TenantId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(_)));

        // Simple (unhyphenated) form is not the expected shape.
        let err = "0190a6c48b7e7a519f3c2d1e4b5a6c7d".parse::<TenantId>().unwrap_err();
        assert!(matches!(err, DomainError::InvalidId(_)));

        let ok: TenantId = RAW.parse().unwrap();
        assert_eq!(ok.to_string(), RAW);
    }

    #[test]
    fn same_raw_value_in_different_tenants_is_not_equal() {
        let a = OrganizationId::parse(TenantId::new(), None, RAW).unwrap();
        let b = OrganizationId::parse(TenantId::new(), None, RAW).unwrap();
        assert_eq!(a.raw(), b.raw());
        assert_ne!(a, b);

        let set: HashSet<_> = [a.clone(), b.clone(), a.clone()].into_iter().collect();
        assert_eq!(set.len(), 2);

        let ua = UserId::parse(Some(TenantId::new()), RAW).unwrap();
        let ub = UserId::parse(None, RAW).unwrap();
        assert_ne!(ua, ub);
    }

    #[test]
    fn parent_from_another_tenant_is_a_hierarchy_error() {
        let parent = OrganizationId::new(TenantId::new(), None).unwrap();
        let err = OrganizationId::new(TenantId::new(), Some(parent)).unwrap_err();
        assert!(matches!(err, DomainError::Hierarchy(_)));
    }

    #[test]
    fn organization_cannot_be_its_own_ancestor() {
        let tenant = TenantId::new();
        let root = OrganizationId::parse(tenant, None, RAW).unwrap();
        let child = OrganizationId::new(tenant, Some(root)).unwrap();
        let err = OrganizationId::parse(tenant, Some(child), RAW).unwrap_err();
        assert!(matches!(err, DomainError::Hierarchy(_)));
    }

    #[test]
    fn ancestry_queries() {
        let tenant = TenantId::new();
        let root = OrganizationId::new(tenant, None).unwrap();
        let mid = OrganizationId::new(tenant, Some(root.clone())).unwrap();
        let leaf = OrganizationId::new(tenant, Some(mid.clone())).unwrap();

        assert!(root.is_ancestor_of(&leaf));
        assert!(mid.is_ancestor_of(&leaf));
        assert!(leaf.is_descendant_of(&root));
        assert!(!leaf.is_ancestor_of(&root));
        assert!(!root.is_ancestor_of(&root));
        assert_eq!(leaf.depth(), 2);
        assert_eq!(leaf.root(), &root);
        assert_eq!(root.root(), &root);
        assert!(leaf.belongs_to(&tenant));
    }

    #[test]
    fn department_requires_an_organization() {
        let err = DepartmentId::parse(None, RAW).unwrap_err();
        assert!(matches!(err, DomainError::Hierarchy(_)));

        let org = OrganizationId::new(TenantId::new(), None).unwrap();
        let dept = DepartmentId::parse(Some(org.clone()), RAW).unwrap();
        assert!(dept.belongs_to(&org));
        assert_eq!(dept.tenant_id(), org.tenant_id());
    }

    #[test]
    fn ordering_groups_by_tenant_then_value() {
        let t1: TenantId = "00000000-0000-7000-8000-000000000001".parse().unwrap();
        let t2: TenantId = "00000000-0000-7000-8000-000000000002".parse().unwrap();
        let a = OrganizationId::parse(t1, None, "ffffffff-0000-7000-8000-000000000000").unwrap();
        let b = OrganizationId::parse(t2, None, "00000000-0000-7000-8000-00000000000a").unwrap();
        let c = OrganizationId::parse(t2, None, "00000000-0000-7000-8000-00000000000b").unwrap();

        let mut ids = vec![c.clone(), a.clone(), b.clone()];
        ids.sort();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn deserializing_a_foreign_parent_fails() {
        let parent = OrganizationId::new(TenantId::new(), None).unwrap();
        let json = serde_json_like(&parent, TenantId::new());
        let result: Result<OrganizationId, _> = serde_json::from_str(&json);
        assert!(result.is_err());
    }

    fn serde_json_like(parent: &OrganizationId, tenant: TenantId) -> String {
        format!(
            r#"{{"tenant_id":"{}","value":"{}","parent":{}}}"#,
            tenant,
            Uuid::now_v7(),
            serde_json::to_string(parent).unwrap()
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            .. ProptestConfig::default()
        })]

        #[test]
        fn child_always_shares_parent_tenant(a in any::<u128>(), b in any::<u128>(), same in any::<bool>()) {
            let tenant = TenantId::from_uuid(Uuid::from_u128(a));
            let other = if same { tenant } else { TenantId::from_uuid(Uuid::from_u128(b)) };
            let parent = OrganizationId::new(tenant, None).unwrap();

            match OrganizationId::new(other, Some(parent.clone())) {
                Ok(child) => {
                    prop_assert_eq!(child.tenant_id(), parent.tenant_id());
                    prop_assert!(parent.is_ancestor_of(&child));
                }
                Err(e) => {
                    prop_assert!(other != tenant);
                    prop_assert!(matches!(e, DomainError::Hierarchy(_)));
                }
            }
        }
    }
}
