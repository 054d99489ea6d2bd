//! farmlink core: wire types, queued-command model, coercion, and errors.
//!
//! This crate defines the JSON contracts exchanged with devices over the
//! pub/sub hub and the in-memory shape of a queued actuation command. It
//! carries no transport, runtime, or storage dependencies so the dispatcher,
//! the queue backends, and test tooling can all share it.
//!
//! Panics, `unwrap`, and `expect` are compile-denied here. Malformed input
//! surfaces as `FarmlinkError` or degrades to a documented default.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod coerce;
pub mod error;
pub mod model;
pub mod protocol;

/// Shared result type.
pub use error::{FarmlinkError, Result};
pub use model::{CommandLine, QueuedCommand, SINGLE_COMMAND_ORIGIN};
