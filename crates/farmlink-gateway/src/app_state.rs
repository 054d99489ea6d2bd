//! Shared application state for the farmlink gateway.
//!
//! Wires config, the device hub, the dispatcher inbox, and metrics. The
//! dispatcher itself is not part of the state: it lives on the pump thread
//! and is reached only through the inbox.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use farmlink_core::error::{FarmlinkError, Result};
use farmlink_core::protocol::Envelope;

use crate::config::GatewayConfig;
use crate::dispatch::{pump, Dispatcher};
use crate::obs::GatewayMetrics;
use crate::queue;
use crate::transport::Hub;

#[derive(Clone)]
pub struct AppState {
    cfg: Arc<GatewayConfig>,
    hub: Arc<Hub>,
    inbox: mpsc::Sender<Envelope>,
    metrics: Arc<GatewayMetrics>,
}

impl AppState {
    pub fn new(
        cfg: GatewayConfig,
        hub: Arc<Hub>,
        inbox: mpsc::Sender<Envelope>,
        metrics: Arc<GatewayMetrics>,
    ) -> Self {
        Self {
            cfg: Arc::new(cfg),
            hub,
            inbox,
            metrics,
        }
    }

    /// Open the queue store, start the dispatcher pump, and build state.
    /// Must be called inside a tokio runtime.
    pub fn start(cfg: GatewayConfig) -> Result<(Self, JoinHandle<()>)> {
        let metrics = Arc::new(GatewayMetrics::default());
        let hub = Arc::new(Hub::new());

        let store = queue::open(&cfg.queue)?;
        let dispatcher = Dispatcher::new(store, hub.clone()).with_metrics(metrics.clone());

        let (tx, rx) = mpsc::channel(cfg.dispatcher.inbox_capacity);
        let pump = pump::spawn(dispatcher, rx, metrics.clone());

        tracing::info!(
            backend = ?cfg.queue.backend,
            devices = cfg.devices.len(),
            "dispatcher started"
        );
        Ok((Self::new(cfg, hub, tx, metrics), pump))
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.cfg
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    pub fn is_draining(&self) -> bool {
        self.metrics.is_draining()
    }

    pub fn set_draining(&self) {
        self.metrics.set_draining();
    }

    /// Queue an envelope for the dispatcher without waiting.
    pub fn submit(&self, env: Envelope) -> Result<()> {
        self.inbox.try_send(env).map_err(|e| {
            self.metrics.inbox_rejections.inc(&[]);
            match e {
                TrySendError::Full(_) => FarmlinkError::Transport("dispatcher busy".into()),
                TrySendError::Closed(_) => FarmlinkError::Internal("dispatcher stopped".into()),
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(capacity: usize) -> (AppState, mpsc::Receiver<Envelope>) {
        let cfg = crate::config::load_from_str("version: 1\ndevices:\n  - { uuid: bot1, token: t }\n").unwrap();
        let (tx, rx) = mpsc::channel(capacity);
        let st = AppState::new(cfg, Arc::new(Hub::new()), tx, Arc::new(GatewayMetrics::default()));
        (st, rx)
    }

    #[test]
    fn full_inbox_is_rejected_not_awaited() {
        let (st, _rx) = state(1);
        let env = Envelope::new("bot1", json!({ "message_type": "single_command" }));
        st.submit(env.clone()).unwrap();

        let err = st.submit(env).unwrap_err();
        assert!(matches!(err, FarmlinkError::Transport(_)));
        assert_eq!(st.metrics().inbox_rejections.get(&[]), 1);
    }

    #[test]
    fn stopped_dispatcher_is_internal() {
        let (st, rx) = state(1);
        drop(rx);
        let err = st.submit(Envelope::default()).unwrap_err();
        assert!(matches!(err, FarmlinkError::Internal(_)));
    }

    #[test]
    fn draining_flag_is_shared() {
        let (st, _rx) = state(1);
        let other = st.clone();
        assert!(!other.is_draining());
        st.set_draining();
        assert!(other.is_draining());
    }
}
