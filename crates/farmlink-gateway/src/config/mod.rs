//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use farmlink_core::error::{FarmlinkError, Result};

pub use schema::{DeviceConfig, DispatcherSection, GatewayConfig, GatewaySection, QueueBackend, QueueSection};

/// Default config path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "farmlink.yaml";

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| FarmlinkError::Internal(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| FarmlinkError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
