//! Device hub: uuid -> connected sessions.
//!
//! A device may hold several sessions at once (e.g. controller and web UI
//! sharing one uuid). Replies go to every session of the destination.

use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::Message;
use dashmap::{DashMap, DashSet};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use farmlink_core::error::{FarmlinkError, Result};
use farmlink_core::protocol::OutboundMessage;

use super::Transport;

/// One session's outbound queue sender.
#[derive(Clone)]
pub struct Connection {
    pub tx: mpsc::Sender<Message>,
}

struct SessionEntry {
    uuid: String,
    conn: Connection,
}

/// Session registry:
/// - `session_id -> (uuid, Connection)`
/// - `uuid -> {session_id...}`
#[derive(Default)]
pub struct Hub {
    sessions: DashMap<u64, SessionEntry>,
    device_index: DashMap<String, DashSet<u64>>,
    seq: AtomicU64,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            device_index: DashMap::new(),
            seq: AtomicU64::new(1),
        }
    }

    /// Register a session and return its id.
    pub fn register(&self, uuid: &str, conn: Connection) -> u64 {
        let session_id = self.seq.fetch_add(1, Ordering::Relaxed);
        self.device_index
            .entry(uuid.to_string())
            .or_insert_with(DashSet::new)
            .insert(session_id);
        self.sessions.insert(
            session_id,
            SessionEntry {
                uuid: uuid.to_string(),
                conn,
            },
        );
        session_id
    }

    pub fn remove(&self, session_id: u64) -> Option<Connection> {
        let (_, entry) = self.sessions.remove(&session_id)?;
        if let Some(set) = self.device_index.get(&entry.uuid) {
            set.remove(&session_id);
        }
        // Emptiness is re-checked under the shard lock; a concurrent
        // `register` for the same uuid keeps its set.
        self.device_index.remove_if(&entry.uuid, |_, set| set.is_empty());
        Some(entry.conn)
    }

    pub fn connections(&self, uuid: &str) -> Vec<Connection> {
        let Some(set) = self.device_index.get(uuid) else { return vec![]; };
        set.iter()
            .filter_map(|sid| self.sessions.get(sid.key()).map(|e| e.conn.clone()))
            .collect()
    }

    pub fn is_connected(&self, uuid: &str) -> bool {
        self.device_index.contains_key(uuid)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Transport for Hub {
    fn send_message(&self, destination: &str, msg: &OutboundMessage) -> Result<()> {
        let conns = self.connections(destination);
        if conns.is_empty() {
            tracing::warn!(%destination, kind = msg.kind(), "destination not connected, reply dropped");
            return Ok(());
        }

        // serialize once, send N times
        let text = serde_json::to_string(msg)
            .map_err(|e| FarmlinkError::Internal(format!("json encode failed: {e}")))?;

        for conn in conns {
            match conn.tx.try_send(Message::Text(text.clone())) {
                Ok(()) => {}
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(%destination, "session closing, reply skipped");
                }
                Err(TrySendError::Full(_)) => {
                    return Err(FarmlinkError::Transport(format!(
                        "outbound queue full for {destination}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn text(m: Message) -> String {
        match m {
            Message::Text(s) => s,
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn reply_reaches_every_session_of_destination() {
        let hub = Hub::new();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        let (tx3, mut rx3) = mpsc::channel(4);
        hub.register("bot1", Connection { tx: tx1 });
        hub.register("bot1", Connection { tx: tx2 });
        hub.register("bot2", Connection { tx: tx3 });

        hub.send_message("bot1", &OutboundMessage::confirmation(Utc::now(), Some("T1"))).unwrap();

        assert!(text(rx1.try_recv().unwrap()).contains("\"confirm_id\":\"T1\""));
        assert!(text(rx2.try_recv().unwrap()).contains("\"confirmation\""));
        assert!(rx3.try_recv().is_err());
    }

    #[test]
    fn unconnected_destination_is_not_an_error() {
        let hub = Hub::new();
        hub.send_message("UNKNOWN", &OutboundMessage::confirmation(Utc::now(), Some("T1"))).unwrap();
    }

    #[test]
    fn full_queue_is_a_transport_error() {
        let hub = Hub::new();
        let (tx, _rx) = mpsc::channel(1);
        hub.register("bot1", Connection { tx });
        let msg = OutboundMessage::confirmation(Utc::now(), Some("T1"));
        hub.send_message("bot1", &msg).unwrap();
        let err = hub.send_message("bot1", &msg).unwrap_err();
        assert!(matches!(err, FarmlinkError::Transport(_)));
    }

    #[test]
    fn reconnect_before_old_session_closes_stays_reachable() {
        let hub = Hub::new();
        let (old_tx, _old_rx) = mpsc::channel(4);
        let (new_tx, mut new_rx) = mpsc::channel(4);
        let old = hub.register("bot1", Connection { tx: old_tx });
        hub.register("bot1", Connection { tx: new_tx });

        hub.remove(old);
        assert!(hub.is_connected("bot1"));
        hub.send_message("bot1", &OutboundMessage::confirmation(Utc::now(), Some("T9"))).unwrap();
        assert!(text(new_rx.try_recv().unwrap()).contains("\"confirm_id\":\"T9\""));
    }

    #[test]
    fn register_after_last_remove_recreates_index() {
        let hub = Hub::new();
        let (tx1, _rx1) = mpsc::channel(1);
        let (tx2, _rx2) = mpsc::channel(1);
        let s1 = hub.register("bot1", Connection { tx: tx1 });
        hub.remove(s1);
        hub.register("bot1", Connection { tx: tx2 });
        assert_eq!(hub.connections("bot1").len(), 1);
    }

    #[test]
    fn remove_cleans_device_index() {
        let hub = Hub::new();
        let (tx, _rx) = mpsc::channel(1);
        let sid = hub.register("bot1", Connection { tx });
        assert!(hub.is_connected("bot1"));
        assert!(hub.remove(sid).is_some());
        assert!(!hub.is_connected("bot1"));
        assert_eq!(hub.session_count(), 0);
    }
}
