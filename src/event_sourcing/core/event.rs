use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use anyhow::Result;

// ============================================================================
// Event Envelope - Event Metadata
// ============================================================================
//
// Wraps domain events with the metadata journaled next to them.
//
// ============================================================================

/// Generic Event Envelope - wraps any domain event with metadata
///
/// Type Parameter:
/// - `E`: The domain event type; `new` requires `DomainEvent`
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EventEnvelope<E> {
    // Event Identity
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    pub sequence_number: i64,

    // Event Type Information
    pub event_type: String,
    pub event_version: i32,

    // Event Payload
    pub event_data: E,

    // Groups the events produced by one service call
    pub correlation_id: Uuid,

    // Who triggered this event
    pub user_id: Option<Uuid>,

    pub timestamp: DateTime<Utc>,

    pub metadata: HashMap<String, String>,
}

impl<E: DomainEvent> EventEnvelope<E> {
    /// Wrap `event_data`; type and version are taken from the event.
    pub fn new(aggregate_id: Uuid, sequence_number: i64, event_data: E, correlation_id: Uuid) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            aggregate_id,
            sequence_number,
            event_type: event_data.event_type().to_string(),
            event_version: E::EVENT_VERSION,
            event_data,
            correlation_id,
            user_id: None,
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }
}

impl<E> EventEnvelope<E> {
    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_metadata(mut self, key: String, value: String) -> Self {
        self.metadata.insert(key, value);
        self
    }
}

// ============================================================================
// Domain Event Trait
// ============================================================================

/// Implemented by every journaled event.
///
/// `event_type` names the concrete change and is stored beside the payload,
/// so the journal can be filtered without decoding it. Bump `EVENT_VERSION`
/// when the payload shape changes.
pub trait DomainEvent: Serialize + for<'de> Deserialize<'de> + Clone + Send + Sync {
    const EVENT_VERSION: i32 = 1;

    fn event_type(&self) -> &'static str;
}

// ============================================================================
// Event Serialization Helpers
// ============================================================================

pub fn serialize_event<E: Serialize>(event: &E) -> Result<String> {
    Ok(serde_json::to_string(event)?)
}

pub fn deserialize_event<E: for<'de> Deserialize<'de>>(json: &str) -> Result<E> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
    enum TestEvent {
        Opened { data: String },
        Closed,
    }

    impl DomainEvent for TestEvent {
        const EVENT_VERSION: i32 = 2;

        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Opened { .. } => "Opened",
                TestEvent::Closed => "Closed",
            }
        }
    }

    #[test]
    fn test_envelope_takes_type_and_version_from_event() {
        let aggregate_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let envelope = EventEnvelope::new(aggregate_id, 1, TestEvent::Opened { data: "test".to_string() }, correlation_id)
            .with_user(user_id)
            .with_metadata("command".to_string(), "open".to_string());

        assert_eq!(envelope.aggregate_id, aggregate_id);
        assert_eq!(envelope.sequence_number, 1);
        assert_eq!(envelope.event_type, "Opened");
        assert_eq!(envelope.event_version, 2);
        assert_eq!(envelope.correlation_id, correlation_id);
        assert_eq!(envelope.user_id, Some(user_id));
        assert_eq!(envelope.metadata.get("command").map(String::as_str), Some("open"));

        let closed = EventEnvelope::new(aggregate_id, 2, TestEvent::Closed, correlation_id);
        assert_eq!(closed.event_type, "Closed");
        assert_ne!(closed.event_id, envelope.event_id);
    }

    #[test]
    fn test_event_serialization() {
        let event = TestEvent::Opened { data: "test data".to_string() };

        let json = serialize_event(&event).unwrap();
        let deserialized: TestEvent = deserialize_event(&json).unwrap();

        assert_eq!(deserialized, event);
    }
}
