use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use farmlink_core::{CommandLine, FarmlinkError, QueuedCommand, Result};

use super::CommandQueueStore;

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS command_queue (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    scheduled_at INTEGER NOT NULL,
    origin       TEXT NOT NULL,
    created_at   INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_command_queue_origin ON command_queue (origin);

CREATE TABLE IF NOT EXISTS command_lines (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    command_id INTEGER NOT NULL REFERENCES command_queue (id) ON DELETE CASCADE,
    position   INTEGER NOT NULL,
    action     TEXT NOT NULL,
    x          INTEGER NOT NULL,
    y          INTEGER NOT NULL,
    z          INTEGER NOT NULL,
    speed      TEXT NOT NULL,
    amount     INTEGER NOT NULL
);
";

fn storage_err(e: rusqlite::Error) -> FarmlinkError {
    FarmlinkError::Storage(e.to_string())
}

/// Times are stored as Unix microseconds, which covers chrono's whole range.
fn to_db_time(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn from_db_time(id: i64, micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| FarmlinkError::Storage(format!("bad scheduled_at {micros} in row {id}")))
}

/// Durable queue in a SQLite file.
///
/// Each command and its lines are written in one transaction; clearing a crop
/// schedule is one transaction as well.
pub struct SqliteQueue {
    conn: Connection,
}

impl SqliteQueue {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(storage_err)?;
        conn.execute_batch(SCHEMA).map_err(storage_err)?;
        tracing::info!(path = %path.as_ref().display(), "sqlite command queue ready");
        Ok(Self { conn })
    }
}

impl CommandQueueStore for SqliteQueue {
    fn save_new_command(&mut self, cmd: QueuedCommand) -> Result<()> {
        let tx = self.conn.transaction().map_err(storage_err)?;

        tx.execute(
            "INSERT INTO command_queue (scheduled_at, origin, created_at) VALUES (?1, ?2, ?3)",
            params![to_db_time(cmd.scheduled_at), cmd.origin, to_db_time(Utc::now())],
        )
        .map_err(storage_err)?;
        let command_id = tx.last_insert_rowid();

        for (position, line) in cmd.command_lines.iter().enumerate() {
            tx.execute(
                "INSERT INTO command_lines (command_id, position, action, x, y, z, speed, amount)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    command_id,
                    position as i64,
                    line.action,
                    line.x,
                    line.y,
                    line.z,
                    line.speed,
                    line.amount
                ],
            )
            .map_err(storage_err)?;
        }

        tx.commit().map_err(storage_err)
    }

    fn clear_crop_schedule(&mut self, crop_id: &str) -> Result<usize> {
        let tx = self.conn.transaction().map_err(storage_err)?;
        tx.execute(
            "DELETE FROM command_lines
             WHERE command_id IN (SELECT id FROM command_queue WHERE origin = ?1)",
            [crop_id],
        )
        .map_err(storage_err)?;
        let removed = tx
            .execute("DELETE FROM command_queue WHERE origin = ?1", [crop_id])
            .map_err(storage_err)?;
        tx.commit().map_err(storage_err)?;
        Ok(removed)
    }

    fn pending_commands(&self) -> Result<Vec<QueuedCommand>> {
        let mut heads_stmt = self
            .conn
            .prepare("SELECT id, scheduled_at, origin FROM command_queue ORDER BY id")
            .map_err(storage_err)?;
        let heads = heads_stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, String>(2)?))
            })
            .map_err(storage_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage_err)?;

        let mut lines_stmt = self
            .conn
            .prepare(
                "SELECT action, x, y, z, speed, amount FROM command_lines
                 WHERE command_id = ?1 ORDER BY position",
            )
            .map_err(storage_err)?;

        let mut out = Vec::with_capacity(heads.len());
        for (id, at, origin) in heads {
            let scheduled_at = from_db_time(id, at)?;

            let mut cmd = QueuedCommand::create_new(scheduled_at, origin);
            let lines = lines_stmt
                .query_map([id], |row| {
                    Ok(CommandLine {
                        action: row.get(0)?,
                        x: row.get(1)?,
                        y: row.get(2)?,
                        z: row.get(3)?,
                        speed: row.get(4)?,
                        amount: row.get(5)?,
                    })
                })
                .map_err(storage_err)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_err)?;
            for line in lines {
                cmd.add_command_line(line);
            }
            out.push(cmd);
        }
        Ok(out)
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
            y: 2,
            z: -3,
            speed: "fast".into(),
            amount: 40,
        }
    }

    fn cmd(origin: &str, lines: &[(&str, i64)]) -> QueuedCommand {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut c = QueuedCommand::create_new(at, origin);
        for (a, x) in lines {
            c.add_command_line(line(a, *x));
        }
        c
    }

    #[test]
    fn save_and_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut q = SqliteQueue::open(dir.path().join("queue.db")).unwrap();

        q.save_new_command(cmd("C1", &[("move", 1), ("water", 2), ("move", 3)])).unwrap();
        q.save_new_command(cmd("single_command", &[("home", 0)])).unwrap();

        let pending = q.pending_commands().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0], cmd("C1", &[("move", 1), ("water", 2), ("move", 3)]));
        assert!(pending[1].is_single_command());
    }

    #[test]
    fn clear_removes_only_that_crop() {
        let dir = tempfile::tempdir().unwrap();
        let mut q = SqliteQueue::open(dir.path().join("queue.db")).unwrap();

        q.save_new_command(cmd("C1", &[("move", 1)])).unwrap();
        q.save_new_command(cmd("C2", &[("move", 2)])).unwrap();
        q.save_new_command(cmd("C1", &[("water", 3)])).unwrap();

        assert_eq!(q.clear_crop_schedule("C1").unwrap(), 2);
        let pending = q.pending_commands().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].origin, "C2");
        assert_eq!(q.clear_crop_schedule("C1").unwrap(), 0);
    }

    #[test]
    fn far_future_schedule_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut q = SqliteQueue::open(dir.path().join("queue.db")).unwrap();

        let far = Utc::now() + chrono::TimeDelta::seconds(400_000_000_000);
        let mut c = QueuedCommand::create_new(far, "single_command");
        c.add_command_line(line("home", 0));
        q.save_new_command(c).unwrap();
        q.save_new_command(cmd("C1", &[("move", 1)])).unwrap();

        let pending = q.pending_commands().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].scheduled_at.timestamp_micros(), far.timestamp_micros());
    }

    #[test]
    fn reopen_keeps_queue() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.db");
        {
            let mut q = SqliteQueue::open(&path).unwrap();
            q.save_new_command(cmd("C1", &[("move", 1)])).unwrap();
        }
        let q = SqliteQueue::open(&path).unwrap();
        assert_eq!(q.pending_commands().unwrap().len(), 1);
    }
}
