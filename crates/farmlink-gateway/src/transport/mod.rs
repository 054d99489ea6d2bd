//! Transport layer (pub/sub hub over WebSocket).
//!
//! - `Transport`: the send capability injected into the dispatcher.
//! - `hub`: uuid -> session registry implementing `Transport`.
//! - `codec`: turns an inbound text frame into an `Envelope`.
//! - `ws`: axum upgrade handler and per-session loop.

pub mod codec;
pub mod hub;
pub mod ws;

pub use hub::Hub;

use farmlink_core::protocol::OutboundMessage;
use farmlink_core::Result;

/// Outbound half of the pub/sub transport.
///
/// `send_message` is fire-and-forget from the dispatcher's point of view:
/// `Ok` means the message was handed to the transport, not that the device
/// received it.
pub trait Transport: Send + Sync {
    fn send_message(&self, destination: &str, msg: &OutboundMessage) -> Result<()>;
}
