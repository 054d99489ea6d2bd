use std::sync::{Arc, Mutex, MutexGuard};

use farmlink_core::{FarmlinkError, QueuedCommand, Result};

use super::CommandQueueStore;

/// In-memory queue. Clones share the same storage, so a test can keep a
/// handle while the dispatcher owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryQueue {
    inner: Arc<Mutex<Vec<QueuedCommand>>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<QueuedCommand>>> {
        // Poisoned mutex means a writer panicked mid-update; report, don't panic.
        self.inner
            .lock()
            .map_err(|_| FarmlinkError::Storage("memory queue poisoned".into()))
    }
}

impl CommandQueueStore for MemoryQueue {
    fn save_new_command(&mut self, cmd: QueuedCommand) -> Result<()> {
        self.lock()?.push(cmd);
        Ok(())
    }

    fn clear_crop_schedule(&mut self, crop_id: &str) -> Result<usize> {
        let mut q = self.lock()?;
        let before = q.len();
        q.retain(|c| c.origin != crop_id);
        Ok(before - q.len())
    }

    fn pending_commands(&self) -> Result<Vec<QueuedCommand>> {
        Ok(self.lock()?.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn clear_only_touches_matching_origin() {
        let mut q = MemoryQueue::new();
        q.save_new_command(QueuedCommand::create_new(Utc::now(), "C1")).unwrap();
        q.save_new_command(QueuedCommand::create_new(Utc::now(), "single_command")).unwrap();
        q.save_new_command(QueuedCommand::create_new(Utc::now(), "C1")).unwrap();

        assert_eq!(q.clear_crop_schedule("C1").unwrap(), 2);
        let left = q.pending_commands().unwrap();
        assert_eq!(left.len(), 1);
        assert!(left[0].is_single_command());
    }

    #[test]
    fn clones_share_storage() {
        let handle = MemoryQueue::new();
        let mut owned = handle.clone();
        owned.save_new_command(QueuedCommand::create_new(Utc::now(), "C2")).unwrap();
        assert_eq!(handle.pending_commands().unwrap().len(), 1);
    }
}
