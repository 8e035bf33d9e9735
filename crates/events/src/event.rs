use chrono::{DateTime, Utc};
use uuid::Uuid;

use identity_core::TenantId;

/// A domain event.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **versioned** (schema evolution)
/// - keyed by the aggregate that raised them
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "identity.user.activated").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Raw identifier of the aggregate that raised the event.
    fn aggregate_id(&self) -> Uuid;

    /// Owning tenant, when the aggregate is tenant-scoped.
    fn tenant_id(&self) -> Option<TenantId> {
        None
    }
}
