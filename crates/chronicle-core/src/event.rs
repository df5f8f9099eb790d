// Timeline event entity and wire page format
//
// Events are opaque beyond their type and timestamp: type-specific payload
// fields ride along as JSON for the rendering layer. Identity for dedup is
// the (created_on microseconds, type) pair; a unique event id is not
// guaranteed to be present on all event kinds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One timestamped occurrence in a contact's interaction history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event type discriminator (e.g. "msg_created", "ticket_opened")
    #[serde(rename = "type")]
    pub event_type: String,

    /// Creation timestamp, microsecond resolution
    pub created_on: DateTime<Utc>,

    /// Type-specific payload fields, opaque to the engine
    #[serde(flatten)]
    pub payload: serde_json::Map<String, Value>,
}

impl Event {
    /// Create an event with an empty payload
    pub fn new(event_type: impl Into<String>, created_on: DateTime<Utc>) -> Self {
        Self {
            event_type: event_type.into(),
            created_on,
            payload: serde_json::Map::new(),
        }
    }

    /// Create an event with a JSON object payload
    pub fn with_payload(
        event_type: impl Into<String>,
        created_on: DateTime<Utc>,
        payload: Value,
    ) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            event_type: event_type.into(),
            created_on,
            payload,
        }
    }

    /// Dedup identity for this event
    pub fn key(&self) -> EventKey {
        EventKey {
            created_on_us: self.created_on.timestamp_micros(),
            event_type: self.event_type.clone(),
        }
    }

    /// Creation time as a microsecond epoch, the cursor resolution
    pub fn created_on_us(&self) -> i64 {
        self.created_on.timestamp_micros()
    }

    /// Whether this event marks a ticket lifecycle change
    pub fn is_ticket_event(&self) -> bool {
        matches!(self.event_type.as_str(), "ticket_opened" | "ticket_closed")
    }

    /// Ticket uuid carried in the payload, for ticket lifecycle events
    pub fn ticket_uuid(&self) -> Option<Uuid> {
        let ticket = self.payload.get("ticket")?;
        let uuid = ticket.get("uuid")?.as_str()?;
        Uuid::parse_str(uuid).ok()
    }
}

/// Dedup identity: (created_on microseconds, type)
///
/// Two distinct same-microsecond same-type events collide under this key;
/// that is observed server behavior, preserved because unique ids are not
/// present on all event kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub created_on_us: i64,
    pub event_type: String,
}

/// One page of events as returned by the history endpoint
///
/// Events arrive newest-first; the engine reverses to chronological order
/// before merging. A response missing `events` entirely deserializes to an
/// empty page, which makes the merge a no-op.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPage {
    #[serde(default)]
    pub events: Vec<Event>,

    /// Cursor bounding the next backward fetch window (microsecond epoch)
    #[serde(default)]
    pub next_before: Option<i64>,

    /// Cursor bounding the next forward fetch window (microsecond epoch)
    #[serde(default)]
    pub next_after: Option<i64>,
}

impl EventPage {
    /// Events in chronological order (oldest first)
    pub fn into_chronological(self) -> Vec<Event> {
        let mut events = self.events;
        events.reverse();
        events
    }
}
