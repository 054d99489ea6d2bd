//! Inbound envelope (JSON).
//!
//! The payload is kept as a `serde_json::Value` and read lazily by handlers,
//! since each message type carries different fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::coerce::stamp_text;

/// Sender name used when the envelope has no `fromUuid`.
pub const UNKNOWN_SENDER: &str = "UNKNOWN";

/// Inbound message: sender plus application payload.
///
/// Unknown envelope fields are ignored; the hub may add its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    /// Sender uuid (field name is `fromUuid` in JSON).
    #[serde(rename = "fromUuid", default, skip_serializing_if = "Option::is_none")]
    pub from_uuid: Option<String>,
    /// Application payload, expected to be an object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Envelope {
    pub fn new(from_uuid: impl Into<String>, payload: Value) -> Self {
        Self {
            from_uuid: Some(from_uuid.into()),
            payload: Some(payload),
        }
    }

    /// Sender uuid, or `UNKNOWN`.
    pub fn sender(&self) -> &str {
        self.from_uuid.as_deref().unwrap_or(UNKNOWN_SENDER)
    }

    /// Payload as an object. A non-object payload counts as missing.
    pub fn payload_object(&self) -> Option<&Map<String, Value>> {
        self.payload.as_ref().and_then(Value::as_object)
    }

    /// Raw `message_type`, if the payload carries one.
    pub fn message_type(&self) -> Option<&Value> {
        self.payload_object()?.get("message_type")
    }

    /// Lowercased message type used for routing; `""` when absent.
    pub fn requested_command(&self) -> String {
        match self.message_type() {
            Some(Value::String(s)) => s.to_lowercase(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string().to_lowercase(),
        }
    }

    /// `time_stamp` as text (strings and numbers accepted).
    pub fn time_stamp(&self) -> Option<String> {
        self.payload_object()?.get("time_stamp").and_then(stamp_text)
    }
}
