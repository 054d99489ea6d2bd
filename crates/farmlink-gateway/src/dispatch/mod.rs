//! Dispatcher module exports.
//!
//! - `whitelist`: the closed set of routable message types.
//! - `dispatcher`: routing, dedup, translation into queued commands, replies.
//! - `pump`: single consumer thread that feeds the dispatcher in order.

pub mod dispatcher;
pub mod pump;
pub mod whitelist;

pub use dispatcher::{DispatchOutcome, Dispatcher, AUDIT_TARGET, NO_COMMAND_IN_MESSAGE};
pub use whitelist::{MessageKind, WHITELIST};
