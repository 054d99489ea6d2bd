//! Wire protocol modules.
//!
//! - `envelope`: inbound `{fromUuid, payload}` frames, read leniently.
//! - `command`: typed views of the two handled payload shapes.
//! - `reply`: outbound confirmation / error messages.
//!
//! Missing keys in an envelope never fail parsing; they degrade to defaults
//! so the dispatcher can route the message to its unauthorized path.

pub mod command;
pub mod envelope;
pub mod reply;

pub use command::{CropSchedule, ScheduleEntry, SingleCommand};
pub use envelope::{Envelope, UNKNOWN_SENDER};
pub use reply::{ErrorResult, OutboundMessage};
