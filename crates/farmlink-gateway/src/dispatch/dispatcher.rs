use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use farmlink_core::error::{FarmlinkError, Result};
use farmlink_core::protocol::{CropSchedule, Envelope, ErrorResult, OutboundMessage, SingleCommand};
use farmlink_core::{QueuedCommand, SINGLE_COMMAND_ORIGIN};

use crate::dispatch::whitelist::MessageKind;
use crate::obs::metrics::GatewayMetrics;
use crate::queue::CommandQueueStore;
use crate::transport::Transport;

/// `tracing` target of the audit trail (every inbound envelope, every step).
pub const AUDIT_TARGET: &str = "farmlink::audit";

/// Error text sent when a `single_command` carries no `command`.
pub const NO_COMMAND_IN_MESSAGE: &str = "no command in message";

/// What `handle_message` did with an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Queue updated and a confirmation sent.
    Confirmed,
    /// Error reply sent; queue untouched.
    ErrorSent,
    /// Same `time_stamp` as the last processed message; nothing done.
    Duplicate,
    /// Message type absent or not whitelisted; nothing sent.
    Unauthorized(ErrorResult),
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Confirmed => "confirmed",
            DispatchOutcome::ErrorSent => "error_sent",
            DispatchOutcome::Duplicate => "duplicate",
            DispatchOutcome::Unauthorized(_) => "unauthorized",
        }
    }
}

/// Routes inbound envelopes and turns accepted ones into queued commands.
///
/// One instance owns the dedup state, so envelopes must be fed to it one at
/// a time (see `dispatch::pump`). The dedup state is advanced before any
/// queue or transport call: if a later step fails, a retry carrying the same
/// `time_stamp` is still treated as a duplicate.
///
/// The held value is `Some("")` at start. A `single_command` without a
/// `time_stamp` is held as `None`, so it is processed once and a directly
/// following stamp-less one is a duplicate.
pub struct Dispatcher {
    store: Box<dyn CommandQueueStore>,
    transport: Arc<dyn Transport>,
    metrics: Arc<GatewayMetrics>,
    last_time_stamp: Option<String>,
}

impl Dispatcher {
    pub fn new(store: Box<dyn CommandQueueStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            store,
            transport,
            metrics: Arc::new(GatewayMetrics::default()),
            last_time_stamp: Some(String::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<GatewayMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn last_time_stamp(&self) -> Option<&str> {
        self.last_time_stamp.as_deref()
    }

    pub fn store(&self) -> &dyn CommandQueueStore {
        self.store.as_ref()
    }

    /// Entry point for every inbound envelope.
    ///
    /// Missing payload or message type never fails here; it routes to the
    /// unauthorized path. `Err` only comes from a whitelisted handler.
    pub fn handle_message(&mut self, env: &Envelope) -> Result<DispatchOutcome> {
        let raw = serde_json::to_string(env).unwrap_or_else(|_| format!("{env:?}"));
        tracing::info!(target: AUDIT_TARGET, envelope = %raw, "inbound envelope");

        let requested = match env.payload_object() {
            None => {
                tracing::info!(target: AUDIT_TARGET, "message has no payload");
                String::new()
            }
            Some(p) if !p.contains_key("message_type") => {
                tracing::info!(target: AUDIT_TARGET, "message has no message type");
                String::new()
            }
            Some(_) => {
                let requested = env.requested_command();
                tracing::info!(target: AUDIT_TARGET, command = %requested, "requested command");
                requested
            }
        };

        match MessageKind::from_requested(&requested) {
            Some(MessageKind::SingleCommand) => self.single_command(env),
            Some(MessageKind::CropScheduleUpdate) => self.crop_schedule_update(env),
            None => Ok(DispatchOutcome::Unauthorized(self.error(env))),
        }
    }

    /// Unauthorized / unknown message type. No reply, no queue change.
    pub fn error(&self, env: &Envelope) -> ErrorResult {
        tracing::debug!(
            sender = env.sender(),
            requested = %env.requested_command(),
            "message type not whitelisted"
        );
        ErrorResult::default()
    }

    pub fn single_command(&mut self, env: &Envelope) -> Result<DispatchOutcome> {
        tracing::info!(target: AUDIT_TARGET, "handle single command");

        let sender = env.sender();
        let time_stamp = env.time_stamp();
        tracing::info!(target: AUDIT_TARGET, %sender, time_stamp = ?time_stamp, "sender");

        if !self.advance_dedup(time_stamp.as_deref()) {
            tracing::debug!(%sender, time_stamp = ?time_stamp, "duplicate time_stamp, ignored");
            return Ok(DispatchOutcome::Duplicate);
        }

        let Some(cmd) = env.payload_object().and_then(SingleCommand::from_payload) else {
            tracing::info!(target: AUDIT_TARGET, "no command in message, sending error");
            self.send_error(sender, time_stamp.as_deref(), NO_COMMAND_IN_MESSAGE)?;
            return Ok(DispatchOutcome::ErrorSent);
        };

        let line = &cmd.line;
        tracing::info!(
            target: AUDIT_TARGET,
            action = %line.action,
            x = line.x,
            y = line.y,
            z = line.z,
            speed = %line.speed,
            amount = line.amount,
            delay = cmd.delay,
            "single command"
        );

        let mut queued = QueuedCommand::create_new(delayed(Utc::now(), cmd.delay)?, SINGLE_COMMAND_ORIGIN);
        queued.add_command_line(cmd.line);
        self.store.save_new_command(queued)?;
        self.metrics.queue_writes.inc(&[("origin", SINGLE_COMMAND_ORIGIN)]);

        tracing::info!(target: AUDIT_TARGET, "sending confirmation");
        self.send_confirmation(sender, time_stamp.as_deref())?;
        Ok(DispatchOutcome::Confirmed)
    }

    /// Replace the whole queued schedule of one crop.
    ///
    /// The schedule is read and validated in full before the old one is
    /// cleared, so a bad `scheduled_time` leaves the queue as it was.
    pub fn crop_schedule_update(&mut self, env: &Envelope) -> Result<DispatchOutcome> {
        tracing::info!(target: AUDIT_TARGET, "handling crop schedule update");

        let sender = env.sender();
        let time_stamp = required_time_stamp(env)?;
        tracing::info!(target: AUDIT_TARGET, %sender, %time_stamp, "sender");

        if !self.advance_dedup(Some(&time_stamp)) {
            tracing::debug!(%sender, %time_stamp, "duplicate time_stamp, ignored");
            return Ok(DispatchOutcome::Duplicate);
        }

        let payload = env
            .payload
            .as_ref()
            .ok_or_else(|| FarmlinkError::MalformedPayload("missing payload".into()))?;
        let schedule = CropSchedule::from_payload(payload)?;
        let crop_id = schedule.crop_id;
        tracing::info!(target: AUDIT_TARGET, %crop_id, entries = schedule.entries.len(), "crop schedule");

        let removed = self.store.clear_crop_schedule(&crop_id)?;
        tracing::debug!(%crop_id, removed, "cleared previous crop schedule");

        for entry in schedule.entries {
            tracing::info!(target: AUDIT_TARGET, scheduled_at = %entry.scheduled_at, "crop command");
            let mut queued = QueuedCommand::create_new(entry.scheduled_at, crop_id.as_str());
            for line in entry.command_lines {
                tracing::info!(
                    target: AUDIT_TARGET,
                    action = %line.action,
                    x = line.x,
                    y = line.y,
                    z = line.z,
                    speed = %line.speed,
                    amount = line.amount,
                    "command line"
                );
                queued.add_command_line(line);
            }
            self.store.save_new_command(queued)?;
            self.metrics.queue_writes.inc(&[("origin", "crop")]);
        }

        tracing::info!(target: AUDIT_TARGET, "sending confirmation");
        self.send_confirmation(sender, Some(&time_stamp))?;
        Ok(DispatchOutcome::Confirmed)
    }

    pub fn send_confirmation(&self, destination: &str, time_stamp: Option<&str>) -> Result<()> {
        let msg = OutboundMessage::confirmation(Utc::now(), time_stamp);
        self.send(destination, &msg)
    }

    pub fn send_error(&self, destination: &str, time_stamp: Option<&str>, error: &str) -> Result<()> {
        let msg = OutboundMessage::error(Utc::now(), time_stamp, error);
        self.send(destination, &msg)
    }

    fn send(&self, destination: &str, msg: &OutboundMessage) -> Result<()> {
        self.transport.send_message(destination, msg)?;
        self.metrics.replies.inc(&[("kind", msg.kind())]);
        Ok(())
    }

    /// Returns false for a repeat of the held `time_stamp`.
    fn advance_dedup(&mut self, time_stamp: Option<&str>) -> bool {
        if time_stamp == self.last_time_stamp.as_deref() {
            return false;
        }
        self.last_time_stamp = time_stamp.map(str::to_string);
        true
    }
}

fn required_time_stamp(env: &Envelope) -> Result<String> {
    env.time_stamp()
        .ok_or_else(|| FarmlinkError::MalformedPayload("missing time_stamp".into()))
}

fn delayed(now: DateTime<Utc>, delay_secs: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_seconds(delay_secs)
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| FarmlinkError::MalformedPayload(format!("delay out of range: {delay_secs}")))
}
