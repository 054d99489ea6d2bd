//! Typed views of the handled payload shapes.
//!
//! Field values are loosely typed on the wire, so the raw structs hold
//! `serde_json::Value` and conversion goes through [`crate::coerce`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::coerce::{coerce_int, coerce_text, parse_scheduled_time};
use crate::error::{FarmlinkError, Result};
use crate::model::{CommandLine, SINGLE_COMMAND_ORIGIN};

#[derive(Debug, Default, Deserialize)]
struct RawCommandLine {
    #[serde(default)]
    action: Value,
    #[serde(default)]
    x: Value,
    #[serde(default)]
    y: Value,
    #[serde(default)]
    z: Value,
    #[serde(default)]
    speed: Value,
    #[serde(default)]
    amount: Value,
}

impl From<RawCommandLine> for CommandLine {
    fn from(raw: RawCommandLine) -> Self {
        CommandLine {
            action: coerce_text(&raw.action),
            x: coerce_int(&raw.x),
            y: coerce_int(&raw.y),
            z: coerce_int(&raw.z),
            speed: coerce_text(&raw.speed),
            amount: coerce_int(&raw.amount),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSingleCommand {
    #[serde(default)]
    delay: Value,
    #[serde(flatten)]
    line: RawCommandLine,
}

/// `payload.command` of a `single_command` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleCommand {
    /// Seconds from now until execution.
    pub delay: i64,
    pub line: CommandLine,
}

impl SingleCommand {
    /// Read `payload.command`. `None` when the key is absent or not an object.
    pub fn from_payload(payload: &Map<String, Value>) -> Option<Self> {
        let raw = payload.get("command").filter(|v| v.is_object())?;
        let raw = RawSingleCommand::deserialize(raw).ok()?;
        Some(Self {
            delay: coerce_int(&raw.delay),
            line: raw.line.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawScheduleEntry {
    scheduled_time: String,
    command_lines: Vec<RawCommandLine>,
}

#[derive(Debug, Deserialize)]
struct RawCropSchedule {
    crop_id: Value,
    commands: Vec<RawScheduleEntry>,
}

/// One schedule entry with its parsed execution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub scheduled_at: DateTime<Utc>,
    pub command_lines: Vec<CommandLine>,
}

/// Body of a `crop_schedule_update` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropSchedule {
    pub crop_id: String,
    /// In message order.
    pub entries: Vec<ScheduleEntry>,
}

impl CropSchedule {
    /// Read and validate the whole schedule.
    ///
    /// Missing `crop_id`/`commands`/`command_lines`, or a `crop_id` equal to
    /// the single-command origin, is `MalformedPayload`;
    /// an unreadable `scheduled_time` is `InvalidTime`. Either way nothing
    /// of the schedule is returned.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        let raw = RawCropSchedule::deserialize(payload)
            .map_err(|e| FarmlinkError::MalformedPayload(format!("crop_schedule_update: {e}")))?;

        let crop_id = match raw.crop_id {
            Value::Null => {
                return Err(FarmlinkError::MalformedPayload(
                    "crop_schedule_update: crop_id is null".into(),
                ))
            }
            other => coerce_text(&other),
        };
        // Crop ids share the origin column with single commands.
        if crop_id == SINGLE_COMMAND_ORIGIN {
            return Err(FarmlinkError::MalformedPayload(format!(
                "crop_schedule_update: crop_id {SINGLE_COMMAND_ORIGIN:?} is reserved"
            )));
        }

        let entries = raw
            .commands
            .into_iter()
            .map(|e| {
                Ok(ScheduleEntry {
                    scheduled_at: parse_scheduled_time(&e.scheduled_time)?,
                    command_lines: e.command_lines.into_iter().map(CommandLine::from).collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { crop_id, entries })
    }
}
