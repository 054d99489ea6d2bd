//! Outbound replies sent back to the originating device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coerce::epoch_float;

/// Confirmation / error reply (field `message_type` selects the variant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Confirmation {
        /// Send time, Unix seconds as a float string.
        time_stamp: String,
        /// Echo of the inbound `time_stamp`; `null` when the inbound had none.
        confirm_id: Option<String>,
    },
    Error {
        time_stamp: String,
        confirm_id: Option<String>,
        error: String,
    },
}

impl OutboundMessage {
    pub fn confirmation(now: DateTime<Utc>, confirm_id: Option<&str>) -> Self {
        OutboundMessage::Confirmation {
            time_stamp: epoch_float(now),
            confirm_id: confirm_id.map(str::to_string),
        }
    }

    pub fn error(now: DateTime<Utc>, confirm_id: Option<&str>, error: impl Into<String>) -> Self {
        OutboundMessage::Error {
            time_stamp: epoch_float(now),
            confirm_id: confirm_id.map(str::to_string),
            error: error.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Confirmation { .. } => "confirmation",
            OutboundMessage::Error { .. } => "error",
        }
    }

    pub fn confirm_id(&self) -> Option<&str> {
        match self {
            OutboundMessage::Confirmation { confirm_id, .. }
            | OutboundMessage::Error { confirm_id, .. } => confirm_id.as_deref(),
        }
    }
}

/// Result of the unauthorized path: `{"error": ""}`.
///
/// The empty text is a fixed placeholder; callers must not read meaning into
/// it. It is returned to the caller only, never sent to the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResult {
    pub error: String,
}
