//! Top-level facade crate for farmlink.
//!
//! Re-exports the wire types and the dispatcher/gateway library so users can
//! depend on a single crate.

pub mod core {
    pub use farmlink_core::*;
}

pub mod gateway {
    pub use farmlink_gateway::*;
}
