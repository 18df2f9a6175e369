//! Message Envelope
//!
//! One decoded inbound frame. Bodies are decoded optimistically as JSON;
//! anything that does not parse is kept as text. The result is tagged so
//! that adapters pattern-match on the payload instead of guessing its shape.

use serde_json::Value;

/// Event type used when a frame carries no explicit type label.
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// Decoded body of a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Body parsed as JSON (including a literal `null`).
    Json(Value),
    /// Body that is not valid JSON, passed through verbatim.
    Text(String),
}

impl Payload {
    /// Decode a raw frame body.
    #[must_use]
    pub fn decode(raw: &str) -> Self {
        serde_json::from_str(raw).map_or_else(|_| Self::Text(raw.to_string()), Self::Json)
    }

    /// Borrow the JSON value, if the body was JSON.
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Whether the body is JSON `null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Json(Value::Null))
    }
}

/// A single inbound event, created fresh per frame and never retained
/// after dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEnvelope {
    /// Event type label used for routing.
    pub event_type: String,
    /// Decoded body.
    pub payload: Payload,
    /// Event identifier, when the server sent one.
    pub id: Option<String>,
    /// Raw body text as received.
    pub raw: String,
}

impl MessageEnvelope {
    /// Build an envelope from a raw frame, decoding the body.
    ///
    /// An empty or missing event type falls back to [`DEFAULT_EVENT_TYPE`].
    #[must_use]
    pub fn from_frame(event_type: Option<&str>, raw: impl Into<String>, id: Option<String>) -> Self {
        let raw = raw.into();
        let event_type = event_type
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_EVENT_TYPE)
            .to_string();

        Self {
            event_type,
            payload: Payload::decode(&raw),
            id,
            raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_body_is_decoded() {
        let envelope =
            MessageEnvelope::from_frame(Some("price"), r#"{"asset":"BTC","price":65000}"#, None);

        assert_eq!(envelope.event_type, "price");
        assert_eq!(
            envelope.payload,
            Payload::Json(json!({"asset": "BTC", "price": 65000}))
        );
        assert_eq!(envelope.raw, r#"{"asset":"BTC","price":65000}"#);
    }

    #[test]
    fn non_json_body_is_text() {
        let envelope = MessageEnvelope::from_frame(Some("status"), "system ready", None);
        assert_eq!(envelope.payload, Payload::Text("system ready".to_string()));
        assert!(envelope.payload.as_json().is_none());
    }

    #[test]
    fn null_body_is_json_null() {
        let envelope = MessageEnvelope::from_frame(Some("price"), "null", None);
        assert!(envelope.payload.is_null());
    }

    #[test]
    fn missing_event_type_defaults_to_message() {
        let envelope = MessageEnvelope::from_frame(None, "1", Some("42".to_string()));
        assert_eq!(envelope.event_type, DEFAULT_EVENT_TYPE);
        assert_eq!(envelope.id.as_deref(), Some("42"));

        let envelope = MessageEnvelope::from_frame(Some(""), "1", None);
        assert_eq!(envelope.event_type, DEFAULT_EVENT_TYPE);
    }
}
