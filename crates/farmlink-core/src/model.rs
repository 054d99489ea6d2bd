//! Queued-command model shared by the dispatcher and the queue stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Origin tag for commands that came from a `single_command` message.
pub const SINGLE_COMMAND_ORIGIN: &str = "single_command";

/// One atomic actuation instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLine {
    pub action: String,
    pub x: i64,
    pub y: i64,
    pub z: i64,
    pub speed: String,
    pub amount: i64,
}

/// A scheduled group of command lines with an origin tag.
///
/// Built in memory with [`QueuedCommand::create_new`] and
/// [`QueuedCommand::add_command_line`], then handed to a store as a whole.
/// Stores never see a half-built command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedCommand {
    pub scheduled_at: DateTime<Utc>,
    /// `single_command` or the crop id.
    pub origin: String,
    pub command_lines: Vec<CommandLine>,
}

impl QueuedCommand {
    pub fn create_new(scheduled_at: DateTime<Utc>, origin: impl Into<String>) -> Self {
        Self {
            scheduled_at,
            origin: origin.into(),
            command_lines: Vec::new(),
        }
    }

    /// Append a line; order of calls is execution order.
    pub fn add_command_line(&mut self, line: CommandLine) {
        self.command_lines.push(line);
    }

    pub fn is_single_command(&self) -> bool {
        self.origin == SINGLE_COMMAND_ORIGIN
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn line(action: &str, x: i64) -> CommandLine {
        CommandLine {
            action: action.into(),
            x,
            y: 0,
            z: 0,
            speed: "100".into(),
            amount: 0,
        }
    }

    #[test]
    fn lines_keep_insertion_order() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut cmd = QueuedCommand::create_new(at, "crop-7");
        cmd.add_command_line(line("move", 1));
        cmd.add_command_line(line("dose_water", 2));

        let actions: Vec<&str> = cmd.command_lines.iter().map(|l| l.action.as_str()).collect();
        assert_eq!(actions, ["move", "dose_water"]);
        assert!(!cmd.is_single_command());
    }
}
