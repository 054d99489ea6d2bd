//! farmlink gateway library entry.
//!
//! Wires the WebSocket transport, the device hub, the dispatcher pump, and
//! the command queue stores into one gateway. Consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod obs;
pub mod ops;
pub mod queue;
pub mod router;
pub mod transport;
