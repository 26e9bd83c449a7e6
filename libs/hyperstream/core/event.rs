use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default event type when a frame carries no `event:` field
pub const MESSAGE_EVENT: &str = "message";

/// Protocol-level liveness event type
pub const PING_EVENT: &str = "ping";

/// One complete server-pushed event
///
/// Only produced from a fully terminated frame; a partial frame never
/// becomes an `Event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event type (`"message"`, `"ping"`, or a custom type)
    #[serde(rename = "type")]
    pub event_type: String,
    /// Payload, multi-line data joined by line-feeds
    pub data: String,
    /// Last `id:` seen in the frame
    pub id: Option<String>,
}

impl Event {
    pub fn new(event_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: data.into(),
            id: None,
        }
    }

    /// Event on the default `message` channel
    pub fn message(data: impl Into<String>) -> Self {
        Self::new(MESSAGE_EVENT, data)
    }

    /// Liveness event
    pub fn ping(data: impl Into<String>) -> Self {
        Self::new(PING_EVENT, data)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[inline]
    pub fn is_ping(&self) -> bool {
        self.event_type == PING_EVENT
    }
}

/// Decoded message payload handed to `on_message`
///
/// Structured decoding is attempted first; anything that is not a JSON
/// object or array falls back to the raw string. The fallback is not an
/// error.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// JSON object or array
    Structured(Value),
    /// Raw event data
    Raw(String),
}

impl Payload {
    pub fn decode(data: &str) -> Self {
        match serde_json::from_str::<Value>(data) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => Payload::Structured(value),
            _ => Payload::Raw(data.to_string()),
        }
    }

    pub fn as_structured(&self) -> Option<&Value> {
        match self {
            Payload::Structured(value) => Some(value),
            Payload::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Payload::Structured(_) => None,
            Payload::Raw(raw) => Some(raw),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Payload::Structured(_))
    }
}
