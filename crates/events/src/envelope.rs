use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use identity_core::TenantId;

use crate::Event;

/// Namespace for event ids derived from event content.
const EVENT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x5d2c_9e41_7a3b_4f08_b6e1_0c94_d37a_12f5);

/// Envelope for an event, carrying the metadata consumers key on.
///
/// This is the unit handed to the event channel. A batch of envelopes is
/// identified per event by `event_type`, `aggregate_id`, `occurred_at` and
/// `event_version`; `event_id` lets idempotent consumers drop redeliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    tenant_id: Option<TenantId>,

    aggregate_id: Uuid,
    aggregate_type: String,

    event_type: String,
    event_version: u32,
    occurred_at: DateTime<Utc>,

    payload: E,
}

impl<E> EventEnvelope<E> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_id: Uuid,
        tenant_id: Option<TenantId>,
        aggregate_id: Uuid,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        event_version: u32,
        occurred_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            tenant_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event_type.into(),
            event_version,
            occurred_at,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn aggregate_id(&self) -> Uuid {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

impl EventEnvelope<serde_json::Value> {
    /// Wrap a typed event, serializing its payload to JSON.
    ///
    /// The `event_id` is a name-based UUID over the aggregate and the encoded
    /// payload, so wrapping the same event again yields the same id.
    pub fn from_event<E>(aggregate_type: &str, event: &E) -> Result<Self, serde_json::Error>
    where
        E: Event + Serialize,
    {
        let payload = serde_json::to_value(event)?;
        Ok(Self::new(
            event_id(aggregate_type, event, &payload)?,
            event.tenant_id(),
            event.aggregate_id(),
            aggregate_type,
            event.event_type(),
            event.version(),
            event.occurred_at(),
            payload,
        ))
    }
}

fn event_id<E: Event>(
    aggregate_type: &str,
    event: &E,
    payload: &serde_json::Value,
) -> Result<Uuid, serde_json::Error> {
    let mut name = Vec::with_capacity(128);
    name.extend_from_slice(aggregate_type.as_bytes());
    name.push(b'/');
    name.extend_from_slice(event.aggregate_id().as_bytes());
    name.extend_from_slice(event.event_type().as_bytes());
    name.push(b'/');
    serde_json::to_writer(&mut name, payload)?;
    Ok(Uuid::new_v5(&EVENT_ID_NAMESPACE, &name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Pinged {
        id: Uuid,
        at: DateTime<Utc>,
    }

    impl Event for Pinged {
        fn event_type(&self) -> &'static str {
            "test.pinged"
        }

        fn version(&self) -> u32 {
            2
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.at
        }

        fn aggregate_id(&self) -> Uuid {
            self.id
        }
    }

    #[test]
    fn envelope_copies_event_metadata() {
        let event = Pinged {
            id: Uuid::now_v7(),
            at: Utc::now(),
        };
        let envelope = EventEnvelope::from_event("test.pinger", &event).unwrap();

        assert_eq!(envelope.event_type(), "test.pinged");
        assert_eq!(envelope.event_version(), 2);
        assert_eq!(envelope.aggregate_id(), event.id);
        assert_eq!(envelope.aggregate_type(), "test.pinger");
        assert_eq!(envelope.occurred_at(), event.at);
        assert_eq!(envelope.tenant_id(), None);
        assert_eq!(envelope.payload()["id"], serde_json::json!(event.id));
    }

    #[test]
    fn wrapping_the_same_event_twice_keeps_its_id() {
        let event = Pinged {
            id: Uuid::now_v7(),
            at: Utc::now(),
        };
        let first = EventEnvelope::from_event("test.pinger", &event).unwrap();
        let again = EventEnvelope::from_event("test.pinger", &event).unwrap();
        assert_eq!(first.event_id(), again.event_id());

        let later = Pinged {
            id: event.id,
            at: event.at + chrono::Duration::milliseconds(1),
        };
        let other = EventEnvelope::from_event("test.pinger", &later).unwrap();
        assert_ne!(first.event_id(), other.event_id());
    }
}
