//! Command queue stores.
//!
//! The dispatcher builds a complete `QueuedCommand` in memory and hands it to
//! a store in one call, so a store only ever persists whole commands.
//! Backends:
//! - `memory`: process-local, cloneable handle (tests, dry runs).
//! - `sqlite`: durable queue read by the actuation controller.

mod memory;
mod sqlite;

pub use memory::MemoryQueue;
pub use sqlite::SqliteQueue;

use farmlink_core::{QueuedCommand, Result};

use crate::config::schema::{QueueBackend, QueueSection};

/// Persistent command queue consumed by the actuation system.
pub trait CommandQueueStore: Send {
    /// Commit one fully built command.
    fn save_new_command(&mut self, cmd: QueuedCommand) -> Result<()>;

    /// Delete every pending command whose origin is `crop_id`.
    /// Returns the number of commands removed.
    fn clear_crop_schedule(&mut self, crop_id: &str) -> Result<usize>;

    /// Pending commands in insertion order.
    fn pending_commands(&self) -> Result<Vec<QueuedCommand>>;
}

/// Open the backend selected in config.
pub fn open(cfg: &QueueSection) -> Result<Box<dyn CommandQueueStore>> {
    match cfg.backend {
        QueueBackend::Memory => Ok(Box::new(MemoryQueue::new())),
        QueueBackend::Sqlite => {
            let path = cfg.sqlite_path.as_deref().unwrap_or(QueueSection::DEFAULT_SQLITE_PATH);
            Ok(Box::new(SqliteQueue::open(path)?))
        }
    }
}
