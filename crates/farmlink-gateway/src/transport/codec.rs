//! Inbound frame codec.
//!
//! Text frames carry one JSON envelope. The hub owns sender identity: any
//! `fromUuid` in the frame is replaced by the authenticated session uuid.

use serde_json::Value;

use farmlink_core::error::{FarmlinkError, Result};
use farmlink_core::protocol::Envelope;

pub fn decode_envelope(text: &str, session_uuid: &str) -> Result<Envelope> {
    let mut v: Value = serde_json::from_str(text)
        .map_err(|e| FarmlinkError::BadRequest(format!("invalid envelope json: {e}")))?;

    let obj = v
        .as_object_mut()
        .ok_or_else(|| FarmlinkError::BadRequest("envelope must be a json object".into()))?;
    obj.insert("fromUuid".into(), Value::String(session_uuid.to_string()));

    serde_json::from_value(v)
        .map_err(|e| FarmlinkError::BadRequest(format!("invalid envelope: {e}")))
}
