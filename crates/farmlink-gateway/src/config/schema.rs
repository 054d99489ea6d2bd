use std::collections::HashSet;
use std::net::SocketAddr;

use serde::Deserialize;

use farmlink_core::error::{FarmlinkError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub dispatcher: DispatcherSection,

    #[serde(default)]
    pub queue: QueueSection,

    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(FarmlinkError::UnsupportedVersion);
        }
        if self.devices.is_empty() {
            return Err(FarmlinkError::BadRequest("devices must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for d in &self.devices {
            d.validate()?;
            if !seen.insert(d.uuid.as_str()) {
                return Err(FarmlinkError::BadRequest(format!("duplicate device uuid: {}", d.uuid)));
            }
        }

        self.gateway.validate()?;
        self.dispatcher.validate()?;
        self.queue.validate()?;
        Ok(())
    }

    /// Token check for a connecting device.
    pub fn authenticate(&self, uuid: &str, token: &str) -> bool {
        self.devices.iter().any(|d| d.uuid == uuid && d.token == token)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    /// Per-session outbound queue length.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            ping_interval_ms: default_ping_interval_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
            outbound_queue: default_outbound_queue(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !(5000..=120000).contains(&self.ping_interval_ms) {
            return Err(FarmlinkError::BadRequest(
                "gateway.ping_interval_ms must be between 5000 and 120000".into(),
            ));
        }
        if !(10000..=600000).contains(&self.idle_timeout_ms) {
            return Err(FarmlinkError::BadRequest(
                "gateway.idle_timeout_ms must be between 10000 and 600000".into(),
            ));
        }
        if self.idle_timeout_ms <= self.ping_interval_ms {
            return Err(FarmlinkError::BadRequest(
                "gateway.idle_timeout_ms must be greater than ping_interval_ms".into(),
            ));
        }
        if !(1..=65536).contains(&self.outbound_queue) {
            return Err(FarmlinkError::BadRequest(
                "gateway.outbound_queue must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|_| FarmlinkError::BadRequest(format!("gateway.listen is not a socket address: {}", self.listen)))
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_ping_interval_ms() -> u64 {
    20000
}
fn default_idle_timeout_ms() -> u64 {
    60000
}
fn default_outbound_queue() -> usize {
    256
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatcherSection {
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,
}

impl Default for DispatcherSection {
    fn default() -> Self {
        Self {
            inbox_capacity: default_inbox_capacity(),
        }
    }
}

impl DispatcherSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=65536).contains(&self.inbox_capacity) {
            return Err(FarmlinkError::BadRequest(
                "dispatcher.inbox_capacity must be between 1 and 65536".into(),
            ));
        }
        Ok(())
    }
}

fn default_inbox_capacity() -> usize {
    1024
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueSection {
    #[serde(default)]
    pub backend: QueueBackend,

    #[serde(default)]
    pub sqlite_path: Option<String>,
}

impl QueueSection {
    pub const DEFAULT_SQLITE_PATH: &'static str = "farmlink.db";

    pub fn validate(&self) -> Result<()> {
        if let Some(p) = &self.sqlite_path {
            if p.trim().is_empty() {
                return Err(FarmlinkError::BadRequest("queue.sqlite_path must not be empty".into()));
            }
            if self.backend != QueueBackend::Sqlite {
                tracing::warn!(path = %p, "queue.sqlite_path set but backend is not sqlite");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    pub uuid: String,
    pub token: String,
}

impl DeviceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.uuid.trim().is_empty() {
            return Err(FarmlinkError::BadRequest("device uuid must not be empty".into()));
        }
        if self.token.is_empty() {
            return Err(FarmlinkError::BadRequest(format!("device {} has an empty token", self.uuid)));
        }
        Ok(())
    }
}
